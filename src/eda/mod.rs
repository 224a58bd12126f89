//! Exploratory-analysis helpers over processed feed tables.
//!
//! These return the numbers a chart or report would be built from; nothing
//! here renders plots.

pub mod align;
pub mod categorical;
pub mod distribution;
pub mod encode;
pub mod frame;
pub mod impute;
pub mod outliers;

pub use align::{align_data_types, aligned_type};
pub use categorical::{analyze_categorical_feature, CategoricalSummary, CategoryCount, ClassBreakdown};
pub use distribution::{feature_distribution, Bin, ClassDistribution, FeatureDistribution, DEFAULT_BINS};
pub use encode::frequency_encode;
pub use impute::{decide_fill_methods, fill_numeric_columns, FillMethod};
pub use outliers::{remove_outliers, OutlierReport};

use crate::error::{PrepError, Result};
use crate::types::{Column, Table};

/// Column lookup shared by the helpers that take a feature name.
fn require_column<'a>(table: &'a Table, name: &str) -> Result<&'a Column> {
    table
        .column(name)
        .ok_or_else(|| PrepError::UnknownColumn(name.to_string()))
}

fn require_numeric<'a>(table: &'a Table, name: &str) -> Result<&'a Column> {
    let col = require_column(table, name)?;
    if !col.kind.is_numeric() {
        return Err(PrepError::NotNumeric(name.to_string()));
    }
    Ok(col)
}
