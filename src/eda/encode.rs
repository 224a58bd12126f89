use std::collections::HashMap;

use tracing::debug;

use super::frame;
use crate::error::Result;
use crate::types::{Column, ColumnType, Table, Value};

/// Appends `<col>_encoded` with the frequency of each value for every text
/// column not in `exclude`, optionally dropping the encoded originals.
pub fn frequency_encode(mut table: Table, exclude: &[&str], drop_original: bool) -> Result<Table> {
    let targets: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| c.kind == ColumnType::Text && !exclude.contains(&c.name.as_str()))
        .map(|c| c.name.clone())
        .collect();

    for name in &targets {
        let Some(col) = table.column(name) else {
            continue;
        };
        let encoded = encode_column(col)?;
        match table.column_mut(&encoded.name) {
            Some(existing) => *existing = encoded,
            None => table.push_column(encoded)?,
        }
    }

    if drop_original {
        table.drop_columns(&targets);
    }
    debug!(encoded = targets.len(), drop_original, "frequency encoded text columns");
    Ok(table)
}

fn encode_column(col: &Column) -> Result<Column> {
    let counts: HashMap<String, usize> = frame::value_counts(&frame::label_series(col))?
        .into_iter()
        .collect();
    let values = col
        .values
        .iter()
        .map(|v| match v {
            Value::Text(s) => counts
                .get(s.as_str())
                .map_or(Value::Missing, |n| Value::Int(*n as i64)),
            _ => Value::Missing,
        })
        .collect();
    Ok(Column::new(format!("{}_encoded", col.name), ColumnType::Integer, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::with_columns(vec![
            Column::from_fields("tld", &["com", "net", "com", ""]),
            Column::from_fields("class", &["spam", "spam", "benign", "benign"]),
            Column::new(
                "len",
                ColumnType::Integer,
                vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_counts_replace_values_and_originals_drop() {
        let encoded = frequency_encode(table(), &["class"], true).unwrap();
        assert_eq!(encoded.column_names(), vec!["class", "len", "tld_encoded"]);
        assert_eq!(
            encoded.column("tld_encoded").unwrap().values,
            vec![Value::Int(2), Value::Int(1), Value::Int(2), Value::Missing]
        );
    }

    #[test]
    fn test_originals_kept_on_request() {
        let encoded = frequency_encode(table(), &[], false).unwrap();
        assert_eq!(
            encoded.column_names(),
            vec!["tld", "class", "len", "tld_encoded", "class_encoded"]
        );
    }
}
