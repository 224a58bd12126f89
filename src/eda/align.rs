use tracing::debug;

use crate::pipeline::processing::coerce::parse_timestamp;
use crate::types::{Column, ColumnType, Table, Value};

/// Authoritative type of every column shared across the feeds
const SCHEMA: &[(&str, ColumnType)] = &[
    ("tld", ColumnType::Text),
    ("oc_8", ColumnType::Integer),
    ("char_distribution", ColumnType::Text),
    ("Emails", ColumnType::Text),
    ("subdomain", ColumnType::Boolean),
    ("State", ColumnType::Text),
    ("1gram", ColumnType::Text),
    ("obfuscate_at_sign", ColumnType::Integer),
    ("longest_word", ColumnType::Text),
    ("puny_coded", ColumnType::Boolean),
    ("2gram", ColumnType::Text),
    ("Country", ColumnType::Text),
    ("Organization", ColumnType::Text),
    ("numeric_percentage", ColumnType::Float),
    ("hex_8", ColumnType::Float),
    ("Creation_Date_Time", ColumnType::Timestamp),
    ("Domain", ColumnType::Text),
    ("len", ColumnType::Integer),
    ("Domain_Name", ColumnType::Text),
    ("Page_Rank", ColumnType::Integer),
    ("Alexa_Rank", ColumnType::Float),
    ("ASN", ColumnType::Text),
    ("dec_8", ColumnType::Integer),
    ("3gram", ColumnType::Text),
    ("shortened", ColumnType::Boolean),
    ("entropy", ColumnType::Float),
    ("Domain_Age", ColumnType::Text),
    ("dec_32", ColumnType::Boolean),
    ("Name_Server_Count", ColumnType::Integer),
    ("typos", ColumnType::Text),
    ("TTL", ColumnType::Integer),
    ("sld", ColumnType::Text),
    ("Registrar", ColumnType::Text),
    ("hex_32", ColumnType::Float),
    ("oc_32", ColumnType::Float),
    ("IP", ColumnType::Text),
];

pub fn aligned_type(column: &str) -> Option<ColumnType> {
    SCHEMA
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, kind)| *kind)
}

/// Casts every known column of every table to its shared type. Columns the
/// schema does not list are left untouched.
pub fn align_data_types(tables: &mut [Table]) {
    for table in tables.iter_mut() {
        for col in table.columns_mut() {
            let Some(kind) = aligned_type(&col.name) else {
                continue;
            };
            match kind {
                ColumnType::Boolean => cast_with(col, kind, |v| Value::Bool(truthy(v))),
                // Lossy: anything non-numeric becomes 0
                ColumnType::Integer => cast_with(col, kind, |v| Value::Int(to_int(v).unwrap_or(0))),
                ColumnType::Float => cast_with(col, kind, |v| to_float(v).map_or(Value::Missing, Value::Float)),
                ColumnType::Timestamp => cast_with(col, kind, to_timestamp),
                _ if col.kind == ColumnType::Structured => {}
                _ => cast_with(col, ColumnType::Text, |v| match v {
                    Value::Missing => Value::Missing,
                    other => Value::from_field(&other.render()),
                }),
            }
            debug!(column = %col.name, kind = %col.kind, "aligned column type");
        }
    }
}

fn cast_with<F: Fn(&Value) -> Value>(col: &mut Column, kind: ColumnType, f: F) {
    col.values = col.values.iter().map(f).collect();
    col.kind = kind;
}

/// Python truthiness as a pandas bool cast applies it; a missing value is NaN
/// there, and NaN is truthy.
fn truthy(v: &Value) -> bool {
    match v {
        Value::Missing => true,
        Value::Text(s) => !s.is_empty(),
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Bool(b) => *b,
        Value::Timestamp(_) | Value::Literal(_) => true,
        Value::Duration(d) => *d != chrono::Duration::zero(),
    }
}

fn to_float(v: &Value) -> Option<f64> {
    let f = match v {
        Value::Text(s) => s.trim().parse::<f64>().ok()?,
        other => other.as_f64()?,
    };
    (!f.is_nan()).then_some(f)
}

fn to_int(v: &Value) -> Option<i64> {
    match v {
        Value::Int(i) => Some(*i),
        Value::Text(s) => match s.trim().parse::<i64>() {
            Ok(i) => Some(i),
            Err(_) => to_float(v).filter(|f| f.is_finite()).map(|f| f.trunc() as i64),
        },
        other => to_float(other).filter(|f| f.is_finite()).map(|f| f.trunc() as i64),
    }
}

fn to_timestamp(v: &Value) -> Value {
    match v {
        Value::Timestamp(ts) => Value::Timestamp(*ts),
        Value::Text(s) => parse_timestamp(s).map_or(Value::Missing, Value::Timestamp),
        _ => Value::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::literal::Literal;

    fn table(columns: Vec<Column>) -> Table {
        Table::with_columns(columns).unwrap()
    }

    #[test]
    fn test_integer_fill_default_is_zero() {
        let mut tables = vec![table(vec![Column::from_fields("len", &["12", "abc", "", "3.9"])])];
        align_data_types(&mut tables);
        let len = tables[0].column("len").unwrap();
        assert_eq!(len.kind, ColumnType::Integer);
        assert_eq!(
            len.values,
            vec![Value::Int(12), Value::Int(0), Value::Int(0), Value::Int(3)]
        );
    }

    #[test]
    fn test_boolean_and_float_casts() {
        let mut tables = vec![table(vec![
            Column::new(
                "subdomain",
                ColumnType::Integer,
                vec![Value::Int(0), Value::Int(1), Value::Missing],
            ),
            Column::from_fields("entropy", &["2.5", "x", ""]),
        ])];
        align_data_types(&mut tables);
        let t = &tables[0];
        assert_eq!(
            t.column("subdomain").unwrap().values,
            vec![Value::Bool(false), Value::Bool(true), Value::Bool(true)]
        );
        let entropy = t.column("entropy").unwrap();
        assert_eq!(entropy.kind, ColumnType::Float);
        assert_eq!(entropy.values, vec![Value::Float(2.5), Value::Missing, Value::Missing]);
    }

    #[test]
    fn test_text_columns_render_and_structured_survive() {
        let grams = Column::new(
            "2gram",
            ColumnType::Structured,
            vec![Value::Literal(Literal::List(vec![Literal::Str("ab".into())]))],
        );
        let registrar = Column::new("Registrar", ColumnType::Integer, vec![Value::Int(42)]);
        let other = Column::new("class", ColumnType::Integer, vec![Value::Int(1)]);
        let mut tables = vec![table(vec![grams.clone(), registrar, other.clone()])];
        align_data_types(&mut tables);

        let t = &tables[0];
        assert_eq!(t.column("2gram").unwrap(), &grams);
        assert_eq!(t.column("Registrar").unwrap().kind, ColumnType::Text);
        assert_eq!(t.column("Registrar").unwrap().values, vec![Value::Text("42".into())]);
        assert_eq!(t.column("class").unwrap(), &other);
    }

    #[test]
    fn test_timestamp_alignment_tolerates_bad_values() {
        let mut tables = vec![table(vec![Column::from_fields(
            "Creation_Date_Time",
            &["2020-01-02 03:04:05", "soon"],
        )])];
        align_data_types(&mut tables);
        let col = tables[0].column("Creation_Date_Time").unwrap();
        assert_eq!(col.kind, ColumnType::Timestamp);
        assert!(matches!(col.values[0], Value::Timestamp(_)));
        assert_eq!(col.values[1], Value::Missing);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(aligned_type("dec_32"), Some(ColumnType::Boolean));
        assert_eq!(aligned_type("TTL"), Some(ColumnType::Integer));
        assert_eq!(aligned_type("class"), None);
    }
}
