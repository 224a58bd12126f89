use serde::Serialize;
use tracing::info;

use super::{frame, require_numeric};
use crate::error::Result;
use crate::types::Table;

pub const DEFAULT_LOWER_QUANTILE: f64 = 0.01;
pub const DEFAULT_UPPER_QUANTILE: f64 = 0.99;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierReport {
    pub feature: String,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    pub rows_before: usize,
    pub rows_after: usize,
    pub rows_removed: usize,
}

/// Keeps the rows whose `feature` lies within the given quantiles
/// (inclusive). Rows with a missing value are dropped, and so is every row
/// when the column holds no numbers at all.
pub fn remove_outliers(
    table: &Table,
    feature: &str,
    lower_quantile: f64,
    upper_quantile: f64,
) -> Result<(Table, OutlierReport)> {
    let col = require_numeric(table, feature)?;
    let numbers = frame::numeric_series(col);
    let lower = frame::quantile(&numbers, lower_quantile)?;
    let upper = frame::quantile(&numbers, upper_quantile)?;

    let filtered = match (lower, upper) {
        (Some(lo), Some(hi)) => table.filter_rows(|i| {
            col.values[i]
                .as_f64()
                .map_or(false, |v| v >= lo && v <= hi)
        }),
        _ => table.filter_rows(|_| false),
    };

    let report = OutlierReport {
        feature: feature.to_string(),
        lower_bound: lower,
        upper_bound: upper,
        rows_before: table.row_count(),
        rows_after: filtered.row_count(),
        rows_removed: table.row_count() - filtered.row_count(),
    };
    info!(
        feature,
        before = report.rows_before,
        after = report.rows_after,
        removed = report.rows_removed,
        "removed outliers"
    );
    Ok((filtered, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrepError;
    use crate::types::{Column, ColumnType, Value};

    fn table() -> Table {
        let mut values: Vec<Value> = (1..=100).map(Value::Int).collect();
        values.push(Value::Missing);
        let domains: Vec<String> = (0..values.len()).map(|i| format!("d{i}.com")).collect();
        Table::with_columns(vec![
            Column::from_fields("Domain", &domains[..]),
            Column::new("len", ColumnType::Integer, values),
        ])
        .unwrap()
    }

    #[test]
    fn test_trims_both_tails_and_missing() {
        let (filtered, report) =
            remove_outliers(&table(), "len", DEFAULT_LOWER_QUANTILE, DEFAULT_UPPER_QUANTILE).unwrap();
        // bounds are 1.99 and 99.01
        assert_eq!(report.rows_before, 101);
        assert_eq!(report.rows_after, 98);
        assert_eq!(report.rows_removed, 3);
        assert_eq!(filtered.row_count(), 98);
        assert_eq!(filtered.column("len").unwrap().values[0], Value::Int(2));
        assert_eq!(filtered.column("Domain").unwrap().values[0], Value::Text("d1.com".into()));
    }

    #[test]
    fn test_non_numeric_feature_is_rejected() {
        assert!(matches!(
            remove_outliers(&table(), "Domain", 0.01, 0.99),
            Err(PrepError::NotNumeric(_))
        ));
        assert!(matches!(
            remove_outliers(&table(), "TTL", 0.01, 0.99),
            Err(PrepError::UnknownColumn(_))
        ));
    }
}
