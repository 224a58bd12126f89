//! Column type inference and value-tolerant timestamp/duration parsing.

use chrono::{Duration, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::constants::{CREATION_DATE_TIME, DOMAIN_AGE, TIMESTAMP_FORMAT};
use crate::observability::metrics;
use crate::types::{Column, ColumnType, Table, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoercionOptions {
    /// Parse `Domain_Age` as a duration (benign feed only)
    pub parse_domain_age: bool,
    /// Leave `Creation_Date_Time` untouched; spam fills it during realignment
    pub defer_timestamps: bool,
}

/// What coercion decided for a table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoercionSummary {
    pub decisions: Vec<(String, ColumnType)>,
    pub timestamp_gaps: usize,
    pub duration_gaps: usize,
}

/// Assigns every text column its most specific type. Already-typed and
/// structured columns are left alone, so running this twice is a no-op.
pub fn coerce_table(table: &mut Table, options: CoercionOptions) -> CoercionSummary {
    let mut summary = CoercionSummary::default();

    let timestamps = table
        .column_mut(CREATION_DATE_TIME)
        .filter(|_| !options.defer_timestamps);
    if let Some(col) = timestamps {
        if col.kind == ColumnType::Text {
            summary.timestamp_gaps = coerce_timestamps(col);
            metrics::coerce::value_gaps(CREATION_DATE_TIME, summary.timestamp_gaps as u64);
        }
    }

    if options.parse_domain_age {
        if let Some(col) = table.column_mut(DOMAIN_AGE) {
            if col.kind == ColumnType::Text {
                summary.duration_gaps = coerce_durations(col);
                metrics::coerce::value_gaps(DOMAIN_AGE, summary.duration_gaps as u64);
            }
        }
    }

    for col in table.columns_mut() {
        if options.defer_timestamps && col.name == CREATION_DATE_TIME {
            continue;
        }
        if col.kind == ColumnType::Text {
            let kind = infer_column_type(col);
            if kind != ColumnType::Text {
                convert_column(col, kind);
            }
        }
        metrics::coerce::column_typed(col.kind.as_str());
        summary.decisions.push((col.name.clone(), col.kind));
    }

    debug!(columns = summary.decisions.len(), "coercion finished");
    summary
}

/// The most specific type every non-missing value of a text column parses as.
pub fn infer_column_type(col: &Column) -> ColumnType {
    // Any non-text cell means the column is not plain text
    let texts: Option<Vec<&str>> = col
        .values
        .iter()
        .filter_map(|v| match v {
            Value::Missing => None,
            Value::Text(s) => Some(Some(s.trim())),
            _ => Some(None),
        })
        .collect();
    let texts = match texts {
        Some(t) if !t.is_empty() => t,
        _ => return ColumnType::Text,
    };

    if texts.iter().all(|s| s.parse::<i64>().is_ok()) {
        ColumnType::Integer
    } else if texts.iter().all(|s| s.parse::<f64>().is_ok()) {
        ColumnType::Float
    } else if texts.iter().all(|s| parse_bool(s).is_some()) {
        ColumnType::Boolean
    } else {
        ColumnType::Text
    }
}

fn convert_column(col: &mut Column, kind: ColumnType) {
    for value in col.values.iter_mut() {
        let converted = match (&*value, kind) {
            (Value::Text(s), ColumnType::Integer) => s.trim().parse::<i64>().ok().map(Value::Int),
            (Value::Text(s), ColumnType::Float) => s
                .trim()
                .parse::<f64>()
                .ok()
                .map(|f| if f.is_nan() { Value::Missing } else { Value::Float(f) }),
            (Value::Text(s), ColumnType::Boolean) => parse_bool(s.trim()).map(Value::Bool),
            _ => None,
        };
        if let Some(v) = converted {
            *value = v;
        }
    }
    col.kind = kind;
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "True" | "true" | "TRUE" => Some(true),
        "False" | "false" | "FALSE" => Some(false),
        _ => None,
    }
}

/// Parses the fixed `YYYY-MM-DD HH:MM:SS` pattern; anything else is `None`.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT).ok()
}

/// Converts a column to timestamps; returns how many values became missing.
pub fn coerce_timestamps(col: &mut Column) -> usize {
    let mut gaps = 0;
    for value in col.values.iter_mut() {
        let parsed = match &*value {
            Value::Missing => None,
            Value::Timestamp(ts) => Some(*ts),
            Value::Text(s) => parse_timestamp(s),
            _ => None,
        };
        *value = match parsed {
            Some(ts) => Value::Timestamp(ts),
            None => {
                if !value.is_missing() {
                    gaps += 1;
                }
                Value::Missing
            }
        };
    }
    col.kind = ColumnType::Timestamp;
    if gaps > 0 {
        debug!(column = %col.name, gaps, "unparsable timestamps set to missing");
    }
    gaps
}

static DURATION_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<sign>[-+])?\s*(?:(?P<days>\d+)\s*days?,?\s*)?(?:(?P<csign>[-+])?(?P<h>\d{1,2}):(?P<m>\d{2}):(?P<s>\d{2})(?:\.(?P<f>\d{1,9}))?)?$",
    )
    .expect("valid duration pattern")
});

/// Parses `N days HH:MM:SS[.f]`, `N days, HH:MM:SS`, `N days` or `HH:MM:SS`.
/// A leading `-` applies to the day count when present, else to the clock.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let caps = DURATION_TEXT.captures(s)?;
    let days = caps.name("days");
    let hours = caps.name("h");
    if days.is_none() && hours.is_none() {
        return None;
    }

    let negative = caps.name("sign").map(|m| m.as_str() == "-").unwrap_or(false);
    let clock = match hours {
        Some(h) => {
            let h: i64 = h.as_str().parse().ok()?;
            let m: i64 = caps.name("m")?.as_str().parse().ok()?;
            let sec: i64 = caps.name("s")?.as_str().parse().ok()?;
            if m >= 60 || sec >= 60 {
                return None;
            }
            let nanos = match caps.name("f") {
                Some(f) => format!("{:0<9}", f.as_str()).parse::<i64>().ok()?,
                None => 0,
            };
            let clock = Duration::hours(h) + Duration::minutes(m) + Duration::seconds(sec) + Duration::nanoseconds(nanos);
            if caps.name("csign").map(|c| c.as_str() == "-").unwrap_or(false) {
                -clock
            } else {
                clock
            }
        }
        None => Duration::zero(),
    };

    match days {
        Some(d) => {
            let d: i64 = d.as_str().parse().ok()?;
            let days = Duration::try_days(d)?;
            Some(if negative { -days + clock } else { days + clock })
        }
        None => Some(if negative { -clock } else { clock }),
    }
}

/// Converts a column to durations; returns how many values became missing.
pub fn coerce_durations(col: &mut Column) -> usize {
    let mut gaps = 0;
    for value in col.values.iter_mut() {
        let parsed = match &*value {
            Value::Missing => None,
            Value::Duration(d) => Some(*d),
            Value::Text(s) => parse_duration(s),
            _ => None,
        };
        *value = match parsed {
            Some(d) => Value::Duration(d),
            None => {
                if !value.is_missing() {
                    gaps += 1;
                }
                Value::Missing
            }
        };
    }
    col.kind = ColumnType::Duration;
    if gaps > 0 {
        debug!(column = %col.name, gaps, "unparsable durations set to missing");
    }
    gaps
}
