use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::constants::{self, TIMESTAMP_FORMAT};
use crate::error::{PrepError, Result};
use crate::pipeline::processing::literal::Literal;

/// The four domain-intelligence feeds the pipeline knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feed {
    Malware,
    Phishing,
    Spam,
    Benign,
}

impl Feed {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feed::Malware => constants::MALWARE_FEED,
            Feed::Phishing => constants::PHISHING_FEED,
            Feed::Spam => constants::SPAM_FEED,
            Feed::Benign => constants::BENIGN_FEED,
        }
    }

    pub fn all() -> [Feed; 4] {
        [Feed::Malware, Feed::Phishing, Feed::Spam, Feed::Benign]
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feed {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            constants::MALWARE_FEED => Ok(Feed::Malware),
            constants::PHISHING_FEED => Ok(Feed::Phishing),
            constants::SPAM_FEED => Ok(Feed::Spam),
            constants::BENIGN_FEED => Ok(Feed::Benign),
            other => Err(PrepError::UnknownFeed(other.to_string())),
        }
    }
}

/// Raw bytes of one feed file as fetched from object storage
#[derive(Debug, Clone)]
pub struct RawFeed {
    pub feed: Feed,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl RawFeed {
    pub fn new(feed: Feed, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            feed,
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Decode the payload as UTF-8, replacing invalid sequences.
    pub fn into_text(self) -> String {
        match String::from_utf8(self.bytes) {
            Ok(text) => text,
            Err(e) => {
                let text = String::from_utf8_lossy(e.as_bytes()).into_owned();
                warn!(
                    feed = %self.feed,
                    file = %self.file_name,
                    "raw feed is not valid UTF-8; invalid sequences were replaced"
                );
                text
            }
        }
    }
}

/// A single typed cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Duration(Duration),
    Literal(Literal),
}

impl Value {
    /// Empty fields are missing values; anything else is kept as text.
    pub fn from_field(field: &str) -> Self {
        if field.is_empty() {
            Value::Missing
        } else {
            Value::Text(field.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the cell; booleans count as 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Value::Missing => String::new(),
            Value::Text(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => render_float(*f),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
            Value::Duration(d) => render_duration(d),
            Value::Literal(lit) => lit.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn render_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        let s = if f > 0.0 { "inf" } else { "-inf" };
        s.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

/// Renders durations the way the feeds write them: `N days HH:MM:SS[.ffffff]`.
/// Negative durations keep a negative day count and a positive clock part.
pub fn render_duration(d: &Duration) -> String {
    const DAY_MICROS: i64 = 86_400_000_000;
    let micros = d
        .num_microseconds()
        .unwrap_or_else(|| d.num_milliseconds().saturating_mul(1_000));
    let days = micros.div_euclid(DAY_MICROS);
    let rem = micros.rem_euclid(DAY_MICROS);
    let hours = rem / 3_600_000_000;
    let minutes = (rem / 60_000_000) % 60;
    let seconds = (rem / 1_000_000) % 60;
    let frac = rem % 1_000_000;

    let sign = if micros < 0 { "+" } else { "" };
    let mut out = format!(
        "{} days {}{:02}:{:02}:{:02}",
        days, sign, hours, minutes, seconds
    );
    if frac != 0 {
        out.push_str(&format!(".{:06}", frac));
    }
    out
}

/// The type assigned to a column after coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Duration,
    /// Holds evaluated list/tuple/mapping literals; never numerically coerced.
    Structured,
}

/// Coarse type decision reported per column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnTypeDecision {
    Numeric,
    Datetime,
    Duration,
    Boolean,
    Text,
}

impl ColumnType {
    pub fn decision(&self) -> ColumnTypeDecision {
        match self {
            ColumnType::Integer | ColumnType::Float => ColumnTypeDecision::Numeric,
            ColumnType::Timestamp => ColumnTypeDecision::Datetime,
            ColumnType::Duration => ColumnTypeDecision::Duration,
            ColumnType::Boolean => ColumnTypeDecision::Boolean,
            ColumnType::Text | ColumnType::Structured => ColumnTypeDecision::Text,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Duration => "duration",
            ColumnType::Structured => "structured",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    /// Text column built from raw fields; empty fields become missing.
    pub fn from_fields<S: AsRef<str>>(name: impl Into<String>, fields: &[S]) -> Self {
        let values = fields.iter().map(|f| Value::from_field(f.as_ref())).collect();
        Self::new(name, ColumnType::Text, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn non_missing(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().filter(|v| !v.is_missing())
    }

    /// Numeric values of the column, skipping missing and non-numeric cells.
    pub fn numbers(&self) -> Vec<f64> {
        self.values
            .iter()
            .filter_map(Value::as_f64)
            .filter(|f| !f.is_nan())
            .collect()
    }
}

/// Column-oriented table; every column holds exactly `row_count` values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Builds a text table from a header and rows that already match its width.
    pub fn from_rows(header: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let width = header.len();
        let mut values: Vec<Vec<Value>> = (0..width).map(|_| Vec::with_capacity(rows.len())).collect();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(PrepError::ReadMisalignment {
                    line: i as u64 + 2,
                    expected: width,
                    found: row.len(),
                });
            }
            for (slot, field) in values.iter_mut().zip(row) {
                slot.push(Value::from_field(field));
            }
        }
        let columns = header
            .into_iter()
            .zip(values)
            .map(|(name, values)| Column::new(name, ColumnType::Text, values))
            .collect();
        Ok(Self {
            columns,
            row_count: rows.len(),
        })
    }

    pub fn with_columns(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map(Column::len).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != row_count) {
            return Err(PrepError::ColumnLength {
                column: bad.name.clone(),
                expected: row_count,
                found: bad.len(),
            });
        }
        Ok(Self { columns, row_count })
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_types(&self) -> Vec<(String, ColumnType)> {
        self.columns.iter().map(|c| (c.name.clone(), c.kind)).collect()
    }

    /// Copies the values and type of the column at `source` into the column
    /// named `destination`. The destination keeps its name and position.
    pub fn assign(&mut self, destination: &str, source: usize) -> Result<()> {
        let dest = self
            .position(destination)
            .ok_or_else(|| PrepError::UnknownColumn(destination.to_string()))?;
        let (kind, values) = match self.columns.get(source) {
            Some(col) => (col.kind, col.values.clone()),
            None => return Err(PrepError::UnknownColumn(format!("#{}", source))),
        };
        let target = &mut self.columns[dest];
        target.kind = kind;
        target.values = values;
        Ok(())
    }

    /// Removes the last `n` columns by position.
    pub fn drop_trailing(&mut self, n: usize) {
        let keep = self.columns.len().saturating_sub(n);
        self.columns.truncate(keep);
    }

    pub fn drop_columns(&mut self, names: &[String]) {
        self.columns.retain(|c| !names.contains(&c.name));
    }

    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if !self.columns.is_empty() && column.len() != self.row_count {
            let found = column.len();
            return Err(PrepError::ColumnLength {
                column: column.name,
                expected: self.row_count,
                found,
            });
        }
        if self.columns.is_empty() {
            self.row_count = column.len();
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index >= self.row_count {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }

    /// Rows rendered as text, in column order.
    pub fn rendered_rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        (0..self.row_count).map(move |i| self.columns.iter().map(|c| c.values[i].render()).collect())
    }

    /// Keeps the rows whose index satisfies `keep`.
    pub fn filter_rows<F: Fn(usize) -> bool>(&self, keep: F) -> Table {
        let indices: Vec<usize> = (0..self.row_count).filter(|&i| keep(i)).collect();
        let columns = self
            .columns
            .iter()
            .map(|c| {
                Column::new(
                    c.name.clone(),
                    c.kind,
                    indices.iter().map(|&i| c.values[i].clone()).collect(),
                )
            })
            .collect();
        Table {
            columns,
            row_count: indices.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_feed_round_trips_through_names() {
        for feed in Feed::all() {
            assert_eq!(feed.as_str().parse::<Feed>().unwrap(), feed);
        }
        assert!(matches!("dns".parse::<Feed>(), Err(PrepError::UnknownFeed(_))));
    }

    #[test]
    fn test_from_rows_marks_empty_fields_missing() {
        let table = Table::from_rows(
            strings(&["a", "b"]),
            vec![strings(&["1", ""]), strings(&["", "x"])],
        )
        .unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("a").unwrap().values[1], Value::Missing);
        assert_eq!(table.column("b").unwrap().values[1], Value::Text("x".into()));
    }

    #[test]
    fn test_column_length_mismatch_is_reported() {
        let err = Table::with_columns(vec![
            Column::from_fields("a", &["1", "2"]),
            Column::from_fields("b", &["x"]),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            PrepError::ColumnLength { ref column, expected: 2, found: 1 } if column == "b"
        ));

        let mut table = Table::with_columns(vec![Column::from_fields("a", &["1"])]).unwrap();
        let err = table.push_column(Column::from_fields("c", &["x", "y"])).unwrap_err();
        assert!(matches!(err, PrepError::ColumnLength { expected: 1, found: 2, .. }));
    }

    #[test]
    fn test_from_rows_rejects_ragged_rows() {
        let err = Table::from_rows(strings(&["a", "b"]), vec![strings(&["1"])]).unwrap_err();
        assert!(matches!(err, PrepError::ReadMisalignment { expected: 2, found: 1, .. }));
    }

    #[test]
    fn test_assign_copies_values_and_type() {
        let mut table = Table::with_columns(vec![
            Column::new("n", ColumnType::Integer, vec![Value::Int(1)]),
            Column::from_fields("t", &["x"]),
        ])
        .unwrap();
        table.assign("t", 0).unwrap();
        let t = table.column("t").unwrap();
        assert_eq!(t.kind, ColumnType::Integer);
        assert_eq!(t.values, vec![Value::Int(1)]);
        assert_eq!(table.column_names(), vec!["n", "t"]);
    }

    #[test]
    fn test_render_duration_matches_feed_format() {
        let d = Duration::days(3) + Duration::seconds(3_725);
        assert_eq!(render_duration(&d), "3 days 01:02:05");
        let neg = Duration::hours(-1);
        assert_eq!(render_duration(&neg), "-1 days +23:00:00");
    }

    #[test]
    fn test_render_values() {
        assert_eq!(Value::Float(2.0).render(), "2.0");
        assert_eq!(Value::Float(0.25).render(), "0.25");
        assert_eq!(Value::Bool(true).render(), "True");
        assert_eq!(Value::Missing.render(), "");
    }

    #[test]
    fn test_column_type_decisions() {
        assert_eq!(ColumnType::Integer.decision(), ColumnTypeDecision::Numeric);
        assert_eq!(ColumnType::Structured.decision(), ColumnTypeDecision::Text);
        assert!(!ColumnType::Structured.is_numeric());
    }
}
