use std::collections::HashMap;
use std::fmt::Write;

use serde::Serialize;

use super::{frame, require_column};
use crate::error::Result;
use crate::types::{Column, ColumnType, Table, Value};

/// Placeholder values left out of categorical summaries (compared lowercase)
const PLACEHOLDERS: &[&str] = &["unknown", "unk", "n/a", "none", "0", "1"];
const TOP_CATEGORIES: usize = 10;
const SUMMARY_CATEGORIES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub value: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassBreakdown {
    pub class: String,
    /// Rows of this class left after removing placeholders
    pub total: usize,
    pub unique: usize,
    /// Most frequent categories first
    pub top: Vec<CategoryCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalSummary {
    pub feature: String,
    pub classes: Vec<ClassBreakdown>,
}

impl CategoricalSummary {
    pub fn summary_text(&self) -> String {
        let mut out = format!("Analysis for {} (Excluding Unknown):\n\n", self.feature);
        for class in &self.classes {
            let _ = writeln!(out, "Class: {}", class.class);
            let _ = writeln!(out, "Total unique values: {}", class.unique);
            let _ = writeln!(out, "Total samples after removing unknown: {}", class.total);
            out.push_str("Top 5 categories:\n");
            for cat in class.top.iter().take(SUMMARY_CATEGORIES) {
                let _ = writeln!(out, "{}: {} ({:.1}%)", cat.value, cat.count, cat.percentage);
            }
            out.push('\n');
        }
        out
    }
}

/// Per-class frequency of `feature` values, classes in order of first
/// appearance. Rows with a missing feature still count toward the class
/// total; rows with a missing class are skipped.
pub fn analyze_categorical_feature(table: &Table, feature: &str, class_column: &str) -> Result<CategoricalSummary> {
    let values = &require_column(table, feature)?.values;
    let classes = &require_column(table, class_column)?.values;

    let mut order: Vec<String> = Vec::new();
    let mut per_class: HashMap<String, (usize, Vec<String>)> = HashMap::new();
    for (value, class) in values.iter().zip(classes) {
        if class.is_missing() {
            continue;
        }
        let rendered = value.render();
        if !value.is_missing() && PLACEHOLDERS.contains(&rendered.to_lowercase().as_str()) {
            continue;
        }
        let class = class.render();
        let entry = per_class.entry(class.clone()).or_insert_with(|| {
            order.push(class);
            (0, Vec::new())
        });
        entry.0 += 1;
        if !value.is_missing() {
            entry.1.push(rendered);
        }
    }

    let mut classes = Vec::with_capacity(order.len());
    for class in order {
        if let Some((total, seen)) = per_class.remove(&class) {
            classes.push(breakdown(class, total, seen)?);
        }
    }

    Ok(CategoricalSummary {
        feature: feature.to_string(),
        classes,
    })
}

fn breakdown(class: String, total: usize, seen: Vec<String>) -> Result<ClassBreakdown> {
    let kept = Column::new(
        class.as_str(),
        ColumnType::Text,
        seen.into_iter().map(Value::Text).collect(),
    );
    let counts = frame::value_counts(&frame::label_series(&kept))?;
    let unique = counts.len();

    let top = counts
        .into_iter()
        .take(TOP_CATEGORIES)
        .map(|(value, count)| CategoryCount {
            value,
            count,
            percentage: count as f64 / total as f64 * 100.0,
        })
        .collect();
    Ok(ClassBreakdown {
        class,
        total,
        unique,
        top,
    })
}
