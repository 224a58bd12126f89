//! Bridge from typed feed tables into polars, plus the statistics the
//! helpers share. Conventions follow pandas: linear quantiles, adjusted
//! sample skew, right-closed bins.

use std::collections::{HashMap, HashSet};

use polars::prelude::*;

use crate::error::Result;
use crate::types::Column as FeedColumn;

/// Float64 series of a column; missing, non-numeric and NaN cells are nulls.
pub fn numeric_series(col: &FeedColumn) -> Series {
    let values: Vec<Option<f64>> = col
        .values
        .iter()
        .map(|v| v.as_f64().filter(|f| !f.is_nan()))
        .collect();
    Series::new(col.name.as_str().into(), values)
}

/// String series of the rendered cells; missing cells are nulls.
pub fn label_series(col: &FeedColumn) -> Series {
    let values: Vec<Option<String>> = col
        .values
        .iter()
        .map(|v| (!v.is_missing()).then(|| v.render()))
        .collect();
    Series::new(col.name.as_str().into(), values)
}

/// Series of the frame column called `name`.
pub fn series<'a>(frame: &'a DataFrame, name: &str) -> Result<&'a Series> {
    Ok(frame.column(name)?.as_materialized_series())
}

/// Linear interpolation between the closest ranks; `None` without numbers.
pub fn quantile(values: &Series, q: f64) -> Result<Option<f64>> {
    Ok(values.f64()?.quantile(q, QuantileMethod::Linear)?)
}

/// Adjusted Fisher-Pearson sample skewness. Needs at least three values;
/// a constant sample has zero skew.
pub fn skew(values: &Series) -> Result<Option<f64>> {
    let values = values.drop_nulls();
    if values.len() < 3 {
        return Ok(None);
    }
    let numbers = values.f64()?;
    let center = numbers.mean().unwrap_or(0.0);
    let spread = numbers.std(0).unwrap_or(0.0);
    if spread * spread <= f64::EPSILON * center.abs().max(1.0) {
        return Ok(Some(0.0));
    }
    Ok(values.skew(false)?)
}

/// Occurrences of each distinct non-null value, most frequent first. Ties
/// keep first-appearance order.
pub fn value_counts(values: &Series) -> Result<Vec<(String, usize)>> {
    let labels = values.cast(&DataType::String)?.drop_nulls();
    let counted = labels.value_counts(false, false, "count".into(), false)?;
    let columns = counted.get_columns();
    let (Some(distinct), Some(totals)) = (columns.first(), columns.get(1)) else {
        return Ok(Vec::new());
    };
    let totals = totals.as_materialized_series().cast(&DataType::UInt64)?;
    let lookup: HashMap<&str, usize> = distinct
        .as_materialized_series()
        .str()?
        .into_iter()
        .zip(totals.u64()?.into_iter())
        .filter_map(|(value, total)| Some((value?, total? as usize)))
        .collect();

    let mut counts: Vec<(String, usize)> = Vec::with_capacity(lookup.len());
    let mut seen: HashSet<&str> = HashSet::with_capacity(lookup.len());
    for value in labels.str()?.into_iter().flatten() {
        if seen.insert(value) {
            counts.push((value.to_string(), lookup.get(value).copied().unwrap_or(0)));
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(counts)
}

/// Position of the right-closed interval `(edges[i], edges[i + 1]]` each
/// value falls in; nulls and values outside the edges map to `None`.
pub fn bin_indices(values: &Series, edges: &[f64]) -> Result<Vec<Option<usize>>> {
    // cut adds an open-ended interval on each side of the given edges
    let labels: Vec<PlSmallStr> = (0..=edges.len())
        .map(|i| PlSmallStr::from(i.to_string()))
        .collect();
    let binned = cut(values, edges.to_vec(), Some(labels), false, false)?;
    let binned = binned.cast(&DataType::String)?;
    let indices = binned
        .str()?
        .into_iter()
        .map(|label| {
            label
                .and_then(|l| l.parse::<usize>().ok())
                .filter(|&i| i >= 1 && i < edges.len())
                .map(|i| i - 1)
        })
        .collect();
    Ok(indices)
}
