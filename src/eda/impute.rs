use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use super::frame;
use crate::error::{PrepError, Result};
use crate::types::{Column, ColumnType, Table, Value};

/// Skew above this magnitude switches the fill statistic to the median
const SKEW_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMethod {
    Mean,
    Median,
}

/// Picks a fill statistic per column from the skew of its values. When a
/// column appears in several tables the last table decides.
pub fn decide_fill_methods(tables: &[Table], columns: &[&str]) -> Result<BTreeMap<String, FillMethod>> {
    let mut methods = BTreeMap::new();
    for table in tables {
        for name in columns {
            let Some(col) = table.column(name) else {
                continue;
            };
            let skew = frame::skew(&frame::numeric_series(col))?;
            let method = match skew {
                Some(s) if s.abs() > SKEW_THRESHOLD => FillMethod::Median,
                _ => FillMethod::Mean,
            };
            debug!(column = *name, ?skew, ?method, "fill method decided");
            methods.insert(name.to_string(), method);
        }
    }
    Ok(methods)
}

/// Replaces missing cells of numeric columns with that table's mean or
/// median. Returns the number of cells filled.
pub fn fill_numeric_columns(
    tables: &mut [Table],
    columns: &[&str],
    methods: &BTreeMap<String, FillMethod>,
) -> Result<usize> {
    let mut filled = 0;
    for table in tables.iter_mut() {
        for name in columns {
            let Some(col) = table.column_mut(name) else {
                continue;
            };
            let method = methods
                .get(*name)
                .ok_or_else(|| PrepError::UnknownColumn(name.to_string()))?;
            if !col.kind.is_numeric() {
                return Err(PrepError::NotNumeric(name.to_string()));
            }
            let numbers = frame::numeric_series(col);
            let fill = match method {
                FillMethod::Mean => numbers.mean(),
                FillMethod::Median => numbers.median(),
            };
            if let Some(fill) = fill {
                filled += fill_column(col, fill);
            }
        }
    }
    info!(filled, "filled missing numeric values");
    Ok(filled)
}

fn fill_column(col: &mut Column, fill: f64) -> usize {
    let gaps = col.values.iter().filter(|v| v.is_missing()).count();
    if gaps == 0 {
        return 0;
    }
    let value = if col.kind == ColumnType::Integer && fill.fract() == 0.0 {
        Value::Int(fill as i64)
    } else {
        if col.kind == ColumnType::Integer {
            widen_to_float(col);
        }
        Value::Float(fill)
    };
    for v in col.values.iter_mut().filter(|v| v.is_missing()) {
        *v = value.clone();
    }
    gaps
}

fn widen_to_float(col: &mut Column) {
    for v in col.values.iter_mut() {
        if let Value::Int(i) = v {
            *v = Value::Float(*i as f64);
        }
    }
    col.kind = ColumnType::Float;
}
