use std::collections::BTreeMap;
use std::fmt;

use polars::prelude::DataFrame;
use serde::Serialize;

use super::{frame, require_column, require_numeric};
use crate::error::{PrepError, Result};
use crate::types::Table;

pub const DEFAULT_BINS: usize = 10;

// Keeps the class column distinct from the feature in the frame
const CLASS_FIELD: &str = "__class";

/// Right-closed interval `(lower, upper]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
}

impl fmt::Display for Bin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}]", self.lower, self.upper)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassDistribution {
    pub class: String,
    /// Share of the class's rows in each bin, in percent, aligned with `bins`
    pub percentages: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureDistribution {
    pub feature: String,
    /// Only bins holding at least one row
    pub bins: Vec<Bin>,
    /// Sorted by class name
    pub classes: Vec<ClassDistribution>,
}

/// Equal-width bins over the feature's range, then the percentage of each
/// class's rows falling in each bin. Rows with a missing feature or class
/// are ignored.
pub fn feature_distribution(
    table: &Table,
    feature: &str,
    bins: usize,
    class_column: &str,
) -> Result<FeatureDistribution> {
    if bins == 0 {
        return Err(PrepError::Config("bin count must be positive".to_string()));
    }
    let data = DataFrame::new(vec![
        frame::numeric_series(require_numeric(table, feature)?).into(),
        frame::label_series(require_column(table, class_column)?)
            .with_name(CLASS_FIELD.into())
            .into(),
    ])?;
    let values = frame::series(&data, feature)?;
    let classes = frame::series(&data, CLASS_FIELD)?;

    let range = (values.min::<f64>()?, values.max::<f64>()?);
    let Some(edges) = bin_edges(range, bins) else {
        return Ok(FeatureDistribution {
            feature: feature.to_string(),
            bins: Vec::new(),
            classes: Vec::new(),
        });
    };

    let mut counts: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let located = frame::bin_indices(values, &edges)?;
    for (bin, class) in located.into_iter().zip(classes.str()?.into_iter()) {
        let (Some(bin), Some(class)) = (bin, class) else {
            continue;
        };
        counts.entry(class.to_string()).or_insert_with(|| vec![0; bins])[bin] += 1;
    }

    let observed: Vec<usize> = (0..bins)
        .filter(|&b| counts.values().any(|c| c[b] > 0))
        .collect();

    let classes = counts
        .into_iter()
        .map(|(class, per_bin)| {
            let total: usize = per_bin.iter().sum();
            let percentages = observed
                .iter()
                .map(|&b| per_bin[b] as f64 / total as f64 * 100.0)
                .collect();
            ClassDistribution { class, percentages }
        })
        .collect();

    Ok(FeatureDistribution {
        feature: feature.to_string(),
        bins: observed
            .iter()
            .map(|&b| Bin {
                lower: edges[b],
                upper: edges[b + 1],
            })
            .collect(),
        classes,
    })
}

/// `bins + 1` edges; the lowest edge is pushed down by 0.1% of the range so
/// the minimum falls inside the first bin. A constant sample is widened by
/// 0.1% on both sides.
fn bin_edges(range: (Option<f64>, Option<f64>), bins: usize) -> Option<Vec<f64>> {
    let (Some(min), Some(max)) = range else {
        return None;
    };
    if !min.is_finite() || !max.is_finite() {
        return None;
    }

    let (lo, hi) = if min == max {
        let pad = if min == 0.0 { 0.001 } else { min.abs() * 0.001 };
        (min - pad, max + pad)
    } else {
        (min, max)
    };
    let step = (hi - lo) / bins as f64;
    let mut edges: Vec<f64> = (0..=bins).map(|i| lo + step * i as f64).collect();
    edges[bins] = hi;
    if min != max {
        edges[0] -= (hi - lo) * 0.001;
    }
    Some(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Column, ColumnType, Value};

    fn table() -> Table {
        Table::with_columns(vec![
            Column::new(
                "len",
                ColumnType::Integer,
                [0, 10, 10, 20, 20, 0, 5, 20].into_iter().map(Value::Int).collect(),
            ),
            Column::from_fields(
                "class",
                &["spam", "spam", "spam", "spam", "benign", "benign", "", "benign"],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_percentages_per_class() {
        let dist = feature_distribution(&table(), "len", 2, "class").unwrap();
        assert_eq!(dist.bins.len(), 2);
        assert!((dist.bins[0].lower - (-0.02)).abs() < 1e-9);
        assert_eq!(dist.bins[0].upper, 10.0);
        assert_eq!(dist.bins[1].upper, 20.0);

        assert_eq!(dist.classes[0].class, "benign");
        let benign = &dist.classes[0].percentages;
        assert!((benign[0] - 100.0 / 3.0).abs() < 1e-9);
        assert!((benign[1] - 200.0 / 3.0).abs() < 1e-9);

        let spam = &dist.classes[1].percentages;
        assert_eq!(spam, &vec![75.0, 25.0]);
    }

    #[test]
    fn test_empty_bins_are_dropped() {
        let dist = feature_distribution(&table(), "len", 4, "class").unwrap();
        // (-0.02, 5], (5, 10], (10, 15], (15, 20]; nothing lands in (10, 15]
        assert_eq!(dist.bins.len(), 3);
        for class in &dist.classes {
            assert_eq!(class.percentages.len(), 3);
            let sum: f64 = class.percentages.iter().sum();
            assert!((sum - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_constant_feature_uses_one_widened_bin() {
        let t = Table::with_columns(vec![
            Column::new("ttl", ColumnType::Float, vec![Value::Float(3.0), Value::Float(3.0)]),
            Column::from_fields("class", &["a", "b"]),
        ])
        .unwrap();
        let dist = feature_distribution(&t, "ttl", 3, "class").unwrap();
        assert_eq!(dist.bins.len(), 1);
        assert_eq!(dist.classes[0].percentages, vec![100.0]);
    }

    #[test]
    fn test_zero_bins_rejected() {
        assert!(feature_distribution(&table(), "len", 0, "class").is_err());
    }
}
