//! Metrics for the feed preparation pipeline
//!
//! Every pipeline phase records through the `metrics` facade. Nothing is
//! exported unless the embedding binary installs a recorder.

use std::fmt;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Fetch metrics
    FetchSuccess,
    FetchError,
    FetchBytes,
    FetchDuration,

    // Normalize metrics
    NormalizeRulesApplied,

    // Read metrics
    ReadRows,
    ReadRowsAdjusted,
    ReadMisalignedRows,

    // Coerce metrics
    CoerceColumns,
    CoerceValueGaps,

    // Realign metrics
    RealignApplied,
    RealignPreconditionFailed,

    // Sink metrics
    SinkTablesWritten,
    SinkWriteError,

    // Feed-level metrics
    FeedSucceeded,
    FeedFailed,
    FeedDuration,
}

impl MetricName {
    /// Get the metric name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::FetchSuccess => "feedprep_fetch_success_total",
            MetricName::FetchError => "feedprep_fetch_error_total",
            MetricName::FetchBytes => "feedprep_fetch_bytes",
            MetricName::FetchDuration => "feedprep_fetch_duration_seconds",

            MetricName::NormalizeRulesApplied => "feedprep_normalize_rules_applied_total",

            MetricName::ReadRows => "feedprep_read_rows_total",
            MetricName::ReadRowsAdjusted => "feedprep_read_rows_adjusted_total",
            MetricName::ReadMisalignedRows => "feedprep_read_misaligned_rows_total",

            MetricName::CoerceColumns => "feedprep_coerce_columns_total",
            MetricName::CoerceValueGaps => "feedprep_coerce_value_gaps_total",

            MetricName::RealignApplied => "feedprep_realign_applied_total",
            MetricName::RealignPreconditionFailed => "feedprep_realign_precondition_failed_total",

            MetricName::SinkTablesWritten => "feedprep_sink_tables_written_total",
            MetricName::SinkWriteError => "feedprep_sink_write_error_total",

            MetricName::FeedSucceeded => "feedprep_feed_succeeded_total",
            MetricName::FeedFailed => "feedprep_feed_failed_total",
            MetricName::FeedDuration => "feedprep_feed_duration_seconds",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Fetch Metrics
// ============================================================================

pub mod fetch {
    use super::MetricName;

    pub fn success(feed: &str, bytes: usize, secs: f64) {
        ::metrics::counter!(MetricName::FetchSuccess.as_str(), "feed" => feed.to_string()).increment(1);
        ::metrics::histogram!(MetricName::FetchBytes.as_str(), "feed" => feed.to_string()).record(bytes as f64);
        ::metrics::histogram!(MetricName::FetchDuration.as_str(), "feed" => feed.to_string()).record(secs);
    }

    pub fn error(feed: &str) {
        ::metrics::counter!(MetricName::FetchError.as_str(), "feed" => feed.to_string()).increment(1);
    }
}

// ============================================================================
// Normalize Metrics
// ============================================================================

pub mod normalize {
    use super::MetricName;

    /// A rule changed the text it was applied to
    pub fn rule_applied(rule: &'static str) {
        ::metrics::counter!(MetricName::NormalizeRulesApplied.as_str(), "rule" => rule).increment(1);
    }
}

// ============================================================================
// Read Metrics
// ============================================================================

pub mod read {
    use super::MetricName;

    pub fn rows_read(count: u64) {
        ::metrics::counter!(MetricName::ReadRows.as_str()).increment(count);
    }

    pub fn rows_adjusted(count: u64) {
        ::metrics::counter!(MetricName::ReadRowsAdjusted.as_str()).increment(count);
    }

    pub fn misaligned_row() {
        ::metrics::counter!(MetricName::ReadMisalignedRows.as_str()).increment(1);
    }
}

// ============================================================================
// Coerce Metrics
// ============================================================================

pub mod coerce {
    use super::MetricName;

    /// One column received its final type
    pub fn column_typed(kind: &'static str) {
        ::metrics::counter!(MetricName::CoerceColumns.as_str(), "type" => kind).increment(1);
    }

    /// Timestamp or duration cells that could not be parsed
    pub fn value_gaps(column: &str, count: u64) {
        ::metrics::counter!(MetricName::CoerceValueGaps.as_str(), "column" => column.to_string()).increment(count);
    }
}

// ============================================================================
// Realign Metrics
// ============================================================================

pub mod realign {
    use super::MetricName;

    pub fn applied() {
        ::metrics::counter!(MetricName::RealignApplied.as_str()).increment(1);
    }

    pub fn precondition_failed() {
        ::metrics::counter!(MetricName::RealignPreconditionFailed.as_str()).increment(1);
    }
}

// ============================================================================
// Sink Metrics
// ============================================================================

pub mod sink {
    use super::MetricName;

    pub fn table_written(destination: &str) {
        ::metrics::counter!(MetricName::SinkTablesWritten.as_str(), "destination" => destination.to_string()).increment(1);
    }

    pub fn write_error() {
        ::metrics::counter!(MetricName::SinkWriteError.as_str()).increment(1);
    }
}

// ============================================================================
// Feed Metrics
// ============================================================================

pub mod feed {
    use super::MetricName;

    pub fn succeeded(feed: &str, secs: f64) {
        ::metrics::counter!(MetricName::FeedSucceeded.as_str(), "feed" => feed.to_string()).increment(1);
        ::metrics::histogram!(MetricName::FeedDuration.as_str(), "feed" => feed.to_string()).record(secs);
    }

    pub fn failed(feed: &str, stage: &'static str) {
        ::metrics::counter!(MetricName::FeedFailed.as_str(), "feed" => feed.to_string(), "stage" => stage).increment(1);
    }
}
