//! Text normalization: rewrites embedded python-repr literals so a single
//! quote character can carry each literal through CSV field splitting.

pub mod registry;
pub mod rules;

use tracing::debug;

use crate::observability::metrics;

pub use registry::NormalizationRegistry;
pub use rules::{
    BracketWrap, ByteStringUnwrap, CounterToMapping, DurationQuote, NanToEmpty, PhraseReplace,
};

/// A single named text → text rewrite
pub trait NormalizeRule: Send + Sync {
    /// Stable rule name used in logs and tests
    fn name(&self) -> &'static str;

    /// Rewrite the whole text; rules never fail
    fn apply(&self, text: &str) -> String;
}

/// Quoting conventions the reader must use for a normalized text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub quote: u8,
    pub escape: Option<u8>,
}

impl Dialect {
    /// `;` never appears inside the literals of the malware/phishing/spam feeds
    pub const STANDARD: Dialect = Dialect {
        quote: b';',
        escape: None,
    };

    pub const BENIGN: Dialect = Dialect {
        quote: b'\'',
        escape: Some(b'\\'),
    };

    pub fn quote_char(&self) -> char {
        self.quote as char
    }
}

/// Normalized file text together with the dialect it was prepared for
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedText {
    pub text: String,
    pub dialect: Dialect,
}

/// Ordered rule pipeline for one family of feeds
pub struct RuleSet {
    name: &'static str,
    dialect: Dialect,
    rules: Vec<Box<dyn NormalizeRule>>,
}

impl RuleSet {
    pub fn new(name: &'static str, dialect: Dialect, rules: Vec<Box<dyn NormalizeRule>>) -> Self {
        Self {
            name,
            dialect,
            rules,
        }
    }

    /// Rules for the malware, phishing and spam feeds
    pub fn standard() -> Self {
        let quote = Dialect::STANDARD.quote_char();
        Self::new(
            "standard",
            Dialect::STANDARD,
            vec![
                Box::new(BracketWrap { quote }),
                Box::new(PhraseReplace::duration_comma_strip()),
                Box::new(PhraseReplace::counter_open(quote)),
                Box::new(PhraseReplace::counter_close(quote)),
            ],
        )
    }

    /// Rules for the benign feed, whose fields are later evaluated as literals
    pub fn benign() -> Self {
        Self::new(
            "benign",
            Dialect::BENIGN,
            vec![
                Box::new(ByteStringUnwrap),
                Box::new(CounterToMapping),
                Box::new(NanToEmpty),
                Box::new(DurationQuote),
            ],
        )
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Apply every rule in order over the whole text.
    pub fn normalize(&self, raw: &str) -> NormalizedText {
        let mut text = raw.to_string();
        for rule in &self.rules {
            let next = rule.apply(&text);
            if next != text {
                debug!(rule_set = self.name, rule = rule.name(), "rule rewrote text");
                metrics::normalize::rule_applied(rule.name());
            }
            text = next;
        }
        NormalizedText {
            text,
            dialect: self.dialect,
        }
    }
}
