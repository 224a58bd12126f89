//! Safe evaluation of python-style value literals found in benign-feed cells.
//!
//! Evaluation never fails: text that is not a complete literal comes back as
//! [`LiteralOutcome::Verbatim`] with the original text untouched.

use std::fmt;

use tracing::debug;

use crate::types::{ColumnType, Table, Value};

/// A parsed value literal
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    Map(Vec<(Literal, Literal)>),
}

impl Literal {
    /// Lists, tuples and mappings are structured; everything else is scalar.
    pub fn is_structured(&self) -> bool {
        matches!(self, Literal::List(_) | Literal::Tuple(_) | Literal::Map(_))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::None => f.write_str("None"),
            Literal::Bool(true) => f.write_str("True"),
            Literal::Bool(false) => f.write_str("False"),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
            Literal::Str(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Literal::List(items) => {
                f.write_str("[")?;
                write_items(f, items)?;
                f.write_str("]")
            }
            Literal::Tuple(items) => {
                f.write_str("(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Literal::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Literal]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Result of a safe literal evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralOutcome {
    Parsed(Literal),
    Verbatim(String),
}

/// Evaluates `text` as a literal, or hands it back unchanged.
pub fn evaluate(text: &str) -> LiteralOutcome {
    let mut parser = LiteralParser::new(text);
    match parser.parse_complete() {
        Some(lit) => LiteralOutcome::Parsed(lit),
        None => LiteralOutcome::Verbatim(text.to_string()),
    }
}

/// Evaluates every text cell of the table in place. Columns that end up
/// holding a list, tuple or mapping are marked [`ColumnType::Structured`].
/// Returns the number of structured columns.
pub fn evaluate_table(table: &mut Table) -> usize {
    let mut structured = 0;
    for col in table.columns_mut() {
        if col.kind != ColumnType::Text {
            continue;
        }
        let mut has_structure = false;
        for value in col.values.iter_mut() {
            let text = match value {
                Value::Text(s) => s,
                _ => continue,
            };
            match evaluate(text) {
                LiteralOutcome::Parsed(lit) if lit.is_structured() => {
                    *value = Value::Literal(lit);
                    has_structure = true;
                }
                LiteralOutcome::Parsed(Literal::Str(inner)) => {
                    *value = Value::from_field(&inner);
                }
                LiteralOutcome::Parsed(Literal::None) => *value = Value::Missing,
                // numbers and booleans stay as text for the coercer
                LiteralOutcome::Parsed(_) | LiteralOutcome::Verbatim(_) => {}
            }
        }
        if has_structure {
            col.kind = ColumnType::Structured;
            structured += 1;
            debug!(column = %col.name, "column holds structured literals");
        }
    }
    structured
}

// Guards against pathological nesting in malformed cells.
const MAX_DEPTH: usize = 64;

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl LiteralParser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn parse_complete(&mut self) -> Option<Literal> {
        self.skip_ws();
        let lit = self.parse_value()?;
        self.skip_ws();
        if self.pos == self.chars.len() {
            Some(lit)
        } else {
            None
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_value(&mut self) -> Option<Literal> {
        self.skip_ws();
        match self.peek()? {
            '[' => self.nested(|p| p.parse_sequence(']').map(Literal::List)),
            '(' => self.nested(|p| p.parse_tuple()),
            '{' => self.nested(|p| p.parse_map()),
            '\'' | '"' => self.parse_string().map(Literal::Str),
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.parse_number(),
            c if c.is_alphabetic() || c == '_' => self.parse_name(),
            _ => None,
        }
    }

    fn nested<F>(&mut self, inner: F) -> Option<Literal>
    where
        F: FnOnce(&mut Self) -> Option<Literal>,
    {
        if self.depth >= MAX_DEPTH {
            return None;
        }
        self.depth += 1;
        let out = inner(self);
        self.depth -= 1;
        out
    }

    /// Parses `<open> item, item, ... <close>`; the opening char is consumed here.
    fn parse_sequence(&mut self, close: char) -> Option<Vec<Literal>> {
        self.bump()?;
        self.parse_items(close, Vec::new())
    }

    /// Continues a sequence after its opening char or after a separator.
    fn parse_items(&mut self, close: char, mut items: Vec<Literal>) -> Option<Vec<Literal>> {
        loop {
            self.skip_ws();
            if self.eat(close) {
                return Some(items);
            }
            items.push(self.parse_value()?);
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            if self.eat(close) {
                return Some(items);
            }
            return None;
        }
    }

    fn parse_tuple(&mut self) -> Option<Literal> {
        self.bump()?;
        self.skip_ws();
        if self.eat(')') {
            return Some(Literal::Tuple(Vec::new()));
        }
        let first = self.parse_value()?;
        self.skip_ws();
        if self.eat(')') {
            // `(x)` is just a parenthesized value
            return Some(first);
        }
        if !self.eat(',') {
            return None;
        }
        self.parse_items(')', vec![first]).map(Literal::Tuple)
    }

    fn parse_map(&mut self) -> Option<Literal> {
        self.bump()?;
        let mut entries = Vec::new();
        loop {
            self.skip_ws();
            if self.eat('}') {
                return Some(Literal::Map(entries));
            }
            let key = self.parse_value()?;
            if key.is_structured() && !matches!(key, Literal::Tuple(_)) {
                return None;
            }
            self.skip_ws();
            if !self.eat(':') {
                return None;
            }
            let value = self.parse_value()?;
            entries.push((key, value));
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            if self.eat('}') {
                return Some(Literal::Map(entries));
            }
            return None;
        }
    }

    fn parse_string(&mut self) -> Option<String> {
        let quote = self.bump()?;
        let mut out = String::new();
        loop {
            match self.bump()? {
                c if c == quote => break,
                '\\' => match self.bump()? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    '0' => out.push('\0'),
                    '\\' => out.push('\\'),
                    '\'' => out.push('\''),
                    '"' => out.push('"'),
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                },
                c => out.push(c),
            }
        }
        // Adjacent string literals concatenate: 'a' 'b' == 'ab'
        let save = self.pos;
        self.skip_ws();
        if matches!(self.peek(), Some('\'') | Some('"')) {
            if let Some(rest) = self.parse_string() {
                out.push_str(&rest);
                return Some(out);
            }
        }
        self.pos = save;
        Some(out)
    }

    fn parse_number(&mut self) -> Option<Literal> {
        let start = self.pos;
        let negative = match self.peek() {
            Some('-') => {
                self.pos += 1;
                true
            }
            Some('+') => {
                self.pos += 1;
                false
            }
            _ => false,
        };
        self.skip_ws();
        let body_start = self.pos;
        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                self.pos += 1;
            } else if c == '.' {
                is_float = true;
                self.pos += 1;
            } else if c == 'e' || c == 'E' {
                is_float = true;
                self.pos += 1;
                if matches!(self.peek(), Some('+') | Some('-')) {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
        if self.pos == body_start {
            self.pos = start;
            return None;
        }
        let body: String = self.chars[body_start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        if !body.chars().next().map(|c| c.is_ascii_digit() || c == '.').unwrap_or(false) {
            return None;
        }
        if !is_float {
            // Python rejects leading zeros on non-zero integers
            if body.len() > 1 && body.starts_with('0') && body.chars().any(|c| c != '0') {
                return None;
            }
            if let Ok(i) = body.parse::<i64>() {
                return Some(Literal::Int(if negative { -i } else { i }));
            }
        }
        let f: f64 = body.parse().ok()?;
        Some(Literal::Float(if negative { -f } else { f }))
    }

    fn parse_name(&mut self) -> Option<Literal> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        match name.as_str() {
            "None" => Some(Literal::None),
            "True" => Some(Literal::Bool(true)),
            "False" => Some(Literal::Bool(false)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(text: &str) -> Literal {
        match evaluate(text) {
            LiteralOutcome::Parsed(lit) => lit,
            LiteralOutcome::Verbatim(v) => panic!("expected literal, got verbatim {v:?}"),
        }
    }

    #[test]
    fn test_scalars() {
        assert_eq!(parsed("42"), Literal::Int(42));
        assert_eq!(parsed("-3.5"), Literal::Float(-3.5));
        assert_eq!(parsed("1e3"), Literal::Float(1000.0));
        assert_eq!(parsed("'abc'"), Literal::Str("abc".into()));
        assert_eq!(parsed("None"), Literal::None);
        assert_eq!(parsed(" True "), Literal::Bool(true));
    }

    #[test]
    fn test_structures() {
        assert_eq!(
            parsed("['a', 'b']"),
            Literal::List(vec![Literal::Str("a".into()), Literal::Str("b".into())])
        );
        assert_eq!(
            parsed("{'x': 1, 'y': [2, 3],}"),
            Literal::Map(vec![
                (Literal::Str("x".into()), Literal::Int(1)),
                (
                    Literal::Str("y".into()),
                    Literal::List(vec![Literal::Int(2), Literal::Int(3)])
                ),
            ])
        );
        assert_eq!(parsed("(1,)"), Literal::Tuple(vec![Literal::Int(1)]));
        assert_eq!(parsed("(1)"), Literal::Int(1));
        assert_eq!(parsed("[]"), Literal::List(vec![]));
    }

    #[test]
    fn test_non_literals_are_verbatim() {
        for text in ["example.com", "nan", "1 days 02:00:00", "[1, 2", "{'a' 1}", "007", "os.system('x')"] {
            assert_eq!(evaluate(text), LiteralOutcome::Verbatim(text.to_string()), "{text}");
        }
    }

    #[test]
    fn test_repr_round_trip_shape() {
        let lit = parsed("{'a': [1, 2.0], 'b': None}");
        assert_eq!(lit.to_string(), "{'a': [1, 2.0], 'b': None}");
        assert!(lit.is_structured());
    }

    #[test]
    fn test_evaluate_table_marks_structured_columns() {
        use crate::types::Column;

        let mut table = Table::with_columns(vec![
            Column::from_fields("grams", &["['ab', 'bc']", "[]"]),
            Column::from_fields("len", &["12", "7"]),
            Column::from_fields("name", &["\"quoted\"", "None"]),
            Column::from_fields("host", &["example.com", ""]),
        ])
        .unwrap();
        assert_eq!(evaluate_table(&mut table), 1);

        let grams = table.column("grams").unwrap();
        assert_eq!(grams.kind, ColumnType::Structured);
        assert_eq!(
            grams.values[0],
            Value::Literal(Literal::List(vec![Literal::Str("ab".into()), Literal::Str("bc".into())]))
        );
        assert_eq!(table.column("len").unwrap().values[0], Value::Text("12".into()));
        assert_eq!(table.column("len").unwrap().kind, ColumnType::Text);
        assert_eq!(
            table.column("name").unwrap().values,
            vec![Value::Text("quoted".into()), Value::Missing]
        );
        assert_eq!(
            table.column("host").unwrap().values,
            vec![Value::Text("example.com".into()), Value::Missing]
        );
    }

    #[test]
    fn test_deep_nesting_is_rejected_not_overflowed() {
        let text = format!("{}{}", "[".repeat(500), "]".repeat(500));
        assert!(matches!(evaluate(&text), LiteralOutcome::Verbatim(_)));
    }

    #[test]
    fn test_nested_tuples_parse_in_linear_time() {
        let depth = 40;
        let text = format!("{}1{}", "(".repeat(depth), ",)".repeat(depth));
        let started = std::time::Instant::now();
        let mut lit = parsed(&text);
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        for _ in 0..depth {
            lit = match lit {
                Literal::Tuple(mut items) if items.len() == 1 => items.remove(0),
                other => panic!("expected a one-element tuple, got {other:?}"),
            };
        }
        assert_eq!(lit, Literal::Int(1));

        assert_eq!(
            parsed("(1, (2, 3), )"),
            Literal::Tuple(vec![
                Literal::Int(1),
                Literal::Tuple(vec![Literal::Int(2), Literal::Int(3)])
            ])
        );
        assert!(matches!(evaluate("(1 2)"), LiteralOutcome::Verbatim(_)));
    }
}
