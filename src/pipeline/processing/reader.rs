use std::collections::HashSet;

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::normalize::NormalizedText;
use crate::error::{PrepError, Result};
use crate::observability::metrics;
use crate::types::Table;

/// What to do with a data row whose width differs from the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowPolicy {
    /// Abort the feed on the first mismatched row
    #[default]
    Strict,
    /// Pad or truncate mismatched rows, warning for each one
    Legacy,
    /// Pad or truncate silently; used for the benign feed
    PadOrTruncate,
}

/// Splits normalized text into a header and text-typed rows
pub struct RecordReader {
    policy: RowPolicy,
}

impl RecordReader {
    pub fn new(policy: RowPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RowPolicy {
        self.policy
    }

    pub fn read(&self, input: &NormalizedText) -> Result<Table> {
        let mut builder = ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .delimiter(b',')
            .quote(input.dialect.quote);
        if let Some(escape) = input.dialect.escape {
            builder.escape(Some(escape)).double_quote(false);
        }
        let mut reader = builder.from_reader(input.text.as_bytes());
        let mut records = reader.records();

        let header_record = match records.next() {
            Some(record) => record?,
            None => return Err(PrepError::EmptyInput),
        };
        let header = validate_header(header_record.iter())?;
        let width = header.len();
        debug!(columns = width, "header recovered");

        let mut rows = Vec::new();
        let mut adjusted = 0usize;
        for record in records {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let mut fields: Vec<String> = record.iter().map(str::to_string).collect();

            if fields.len() != width {
                match self.policy {
                    RowPolicy::Strict => {
                        metrics::read::misaligned_row();
                        return Err(PrepError::ReadMisalignment {
                            line,
                            expected: width,
                            found: fields.len(),
                        });
                    }
                    RowPolicy::Legacy => {
                        warn!(line, expected = width, found = fields.len(), "row width mismatch; padding/truncating");
                    }
                    RowPolicy::PadOrTruncate => {
                        debug!(line, expected = width, found = fields.len(), "row width adjusted");
                    }
                }
                fields.resize(width, String::new());
                adjusted += 1;
            }
            rows.push(fields);
        }

        metrics::read::rows_read(rows.len() as u64);
        if adjusted > 0 {
            metrics::read::rows_adjusted(adjusted as u64);
            info!(adjusted, total = rows.len(), "rows were padded or truncated to header width");
        }

        Table::from_rows(header, rows)
    }
}

/// Header names are trimmed; blank or duplicate names are defects.
fn validate_header<'a>(fields: impl Iterator<Item = &'a str>) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut header = Vec::new();
    for (index, raw) in fields.enumerate() {
        let name = raw.trim().trim_start_matches('\u{feff}').to_string();
        if name.is_empty() {
            return Err(PrepError::HeaderDefect {
                index,
                reason: "blank column name".to_string(),
            });
        }
        if !seen.insert(name.clone()) {
            return Err(PrepError::HeaderDefect {
                index,
                reason: format!("duplicate column name '{}'", name),
            });
        }
        header.push(name);
    }
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::{Dialect, RuleSet};
    use crate::types::Value;

    fn standard(raw: &str) -> NormalizedText {
        RuleSet::standard().normalize(raw)
    }

    #[test]
    fn test_list_literal_reads_as_one_field() {
        let table = RecordReader::new(RowPolicy::Strict)
            .read(&standard("domain,grams,len\nexample.com,[1, 2, 3],11\n"))
            .unwrap();
        assert_eq!(table.column_count(), 3);
        assert_eq!(
            table.column("grams").unwrap().values,
            vec![Value::Text("[1, 2, 3]".into())]
        );
        assert_eq!(table.column("len").unwrap().values, vec![Value::Text("11".into())]);
    }

    #[test]
    fn test_counter_map_reads_as_one_field() {
        let raw = "a,dist,b\n1,defaultdict(<class 'int'>, {'x': 1, 'y': 2}),2\n";
        let table = RecordReader::new(RowPolicy::Strict).read(&standard(raw)).unwrap();
        assert_eq!(
            table.column("dist").unwrap().values,
            vec![Value::Text(" {'x': 1, 'y': 2}".into())]
        );
        assert_eq!(table.column("b").unwrap().values, vec![Value::Text("2".into())]);
    }

    #[test]
    fn test_strict_policy_surfaces_width_mismatch() {
        let err = RecordReader::new(RowPolicy::Strict)
            .read(&standard("a,b,c\n1,2,3\n1,2\n"))
            .unwrap_err();
        match err {
            PrepError::ReadMisalignment { line, expected, found } => {
                assert_eq!(line, 3);
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_legacy_policy_pads_and_truncates() {
        let table = RecordReader::new(RowPolicy::Legacy)
            .read(&standard("a,b\n1\n1,2,3\n"))
            .unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("b").unwrap().values, vec![Value::Missing, Value::Text("2".into())]);
    }

    #[test]
    fn test_benign_rows_match_header_width() {
        let text = NormalizedText {
            text: "a,b,c\n'x'\n1,2,3,4\n'p\\'q',,'5 days, 01:00:00'\n".to_string(),
            dialect: Dialect::BENIGN,
        };
        let table = RecordReader::new(RowPolicy::PadOrTruncate).read(&text).unwrap();
        assert_eq!(table.row_count(), 3);
        for i in 0..table.row_count() {
            assert_eq!(table.row(i).unwrap().len(), 3);
        }
        let b = &table.column("b").unwrap().values;
        assert_eq!(b[0].render(), "");
        assert_eq!(table.column("a").unwrap().values[2], Value::Text("p'q".into()));
        assert_eq!(
            table.column("c").unwrap().values[2],
            Value::Text("5 days, 01:00:00".into())
        );
    }

    #[test]
    fn test_header_defects() {
        let reader = RecordReader::new(RowPolicy::Strict);
        assert!(matches!(
            reader.read(&standard("a,a\n1,2\n")),
            Err(PrepError::HeaderDefect { index: 1, .. })
        ));
        assert!(matches!(
            reader.read(&standard("a, ,c\n1,2,3\n")),
            Err(PrepError::HeaderDefect { index: 1, .. })
        ));
    }

    #[test]
    fn test_empty_input() {
        let reader = RecordReader::new(RowPolicy::Strict);
        assert!(matches!(reader.read(&standard("")), Err(PrepError::EmptyInput)));
    }
}
