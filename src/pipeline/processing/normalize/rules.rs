use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::NormalizeRule;

/// Wraps every list literal in the quote char: `[` → `<q>[`, `]` → `]<q>`.
pub struct BracketWrap {
    pub quote: char,
}

impl NormalizeRule for BracketWrap {
    fn name(&self) -> &'static str {
        "bracket-wrap"
    }

    fn apply(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + text.len() / 8);
        for c in text.chars() {
            match c {
                '[' => {
                    out.push(self.quote);
                    out.push('[');
                }
                ']' => {
                    out.push(']');
                    out.push(self.quote);
                }
                other => out.push(other),
            }
        }
        out
    }
}

/// Plain substring substitution under a stable rule name.
pub struct PhraseReplace {
    pub name: &'static str,
    pub pattern: String,
    pub replacement: String,
}

impl PhraseReplace {
    pub fn new(name: &'static str, pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            name,
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }

    /// `days,` → `days`, so a duration does not split into two fields.
    pub fn duration_comma_strip() -> Self {
        Self::new("duration-comma-strip", "days,", "days")
    }

    /// `defaultdict(<class 'int'>,` → quote: reopens the counter as a quoted field.
    pub fn counter_open(quote: char) -> Self {
        Self::new("counter-open", "defaultdict(<class 'int'>,", quote.to_string())
    }

    /// `})` → `}` + quote: closes the counter field.
    pub fn counter_close(quote: char) -> Self {
        Self::new("counter-close", "})", format!("}}{}", quote))
    }
}

impl NormalizeRule for PhraseReplace {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, text: &str) -> String {
        text.replace(&self.pattern, &self.replacement)
    }
}

static BYTE_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(^|[^A-Za-z0-9_])b(['"])"#).expect("valid byte-string pattern"));

static COUNTER_MAP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"defaultdict\(<class '[^']*'>,\s*(\{[^{}]*\})\)").expect("valid counter pattern")
});

static DURATION_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-?\d+ days?, \d{1,2}:\d{2}:\d{2}(?:\.\d+)?").expect("valid duration pattern")
});

/// `b'...'` → `'...'`; the marker is only dropped when it is not part of a name.
pub struct ByteStringUnwrap;

impl NormalizeRule for ByteStringUnwrap {
    fn name(&self) -> &'static str {
        "byte-string-unwrap"
    }

    fn apply(&self, text: &str) -> String {
        BYTE_STRING.replace_all(text, "${1}${2}").into_owned()
    }
}

/// `defaultdict(<class 'int'>, {...})` → `{...}`
pub struct CounterToMapping;

impl NormalizeRule for CounterToMapping {
    fn name(&self) -> &'static str {
        "counter-to-mapping"
    }

    fn apply(&self, text: &str) -> String {
        COUNTER_MAP.replace_all(text, "${1}").into_owned()
    }
}

/// A field holding only `nan` → `''`. Text inside other fields is left alone.
pub struct NanToEmpty;

impl NormalizeRule for NanToEmpty {
    fn name(&self) -> &'static str {
        "nan-to-empty"
    }

    fn apply(&self, text: &str) -> String {
        text.split('\n')
            .map(|line| {
                line.split(',')
                    .map(|field| {
                        if field.trim() == "nan" {
                            field.replacen("nan", "''", 1)
                        } else {
                            field.to_string()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// `<int> days, HH:MM:SS` → `'<int> days, HH:MM:SS'` unless already quoted.
pub struct DurationQuote;

impl NormalizeRule for DurationQuote {
    fn name(&self) -> &'static str {
        "duration-quote"
    }

    fn apply(&self, text: &str) -> String {
        DURATION_PHRASE
            .replace_all(text, |caps: &Captures| {
                let m = caps.get(0).map(|m| (m.start(), m.end(), m.as_str()));
                match m {
                    Some((start, end, phrase)) => {
                        let before = text[..start].chars().next_back();
                        let after = text[end..].chars().next();
                        if before == Some('\'') && after == Some('\'') {
                            phrase.to_string()
                        } else {
                            format!("'{}'", phrase)
                        }
                    }
                    None => String::new(),
                }
            })
            .into_owned()
    }
}
