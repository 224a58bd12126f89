//! Runs every registered feed through fetch, repair, typing and persistence.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::app::ports::{ObjectStore, TableSink};
use crate::config::{FeedSpec, PipelineConfig};
use crate::constants::processed_name;
use crate::error::PrepError;
use crate::observability::metrics;
use crate::pipeline::processing::{
    coerce_table, literal, CoercionOptions, NormalizationRegistry, RealignmentMap, RecordReader,
};
use crate::types::{ColumnType, Feed, RawFeed, Table};

/// Pipeline step a feed failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Read,
    Realign,
    Persist,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Read => "read",
            Stage::Realign => "realign",
            Stage::Persist => "persist",
        }
    }
}

/// Error raised by one stage of a feed
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: PrepError,
}

fn at(stage: Stage) -> impl FnOnce(PrepError) -> StageFailure {
    move |error| StageFailure { stage, error }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FeedStatus {
    Written {
        destination: String,
        rows: usize,
        columns: usize,
        column_types: Vec<(String, ColumnType)>,
    },
    Failed {
        stage: Stage,
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedOutcome {
    pub feed: Feed,
    pub file_name: String,
    pub status: FeedStatus,
}

impl FeedOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, FeedStatus::Written { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<FeedOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn outcome(&self, feed: Feed) -> Option<&FeedOutcome> {
        self.outcomes.iter().find(|o| o.feed == feed)
    }
}

pub struct FeedOrchestrator {
    config: PipelineConfig,
    store: Arc<dyn ObjectStore>,
    sink: Arc<dyn TableSink>,
    normalizers: NormalizationRegistry,
}

impl FeedOrchestrator {
    pub fn new(config: PipelineConfig, store: Arc<dyn ObjectStore>, sink: Arc<dyn TableSink>) -> Self {
        Self {
            config,
            store,
            sink,
            normalizers: NormalizationRegistry::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Processes every registered feed in registry order. A failing feed is
    /// recorded and the run moves on to the next one.
    pub async fn run(&self) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, feeds = self.config.feeds.len(), "🚀 Starting feed preparation run");

        let mut outcomes = Vec::with_capacity(self.config.feeds.len());
        for spec in &self.config.feeds {
            outcomes.push(self.run_feed(spec).await);
        }

        let report = RunReport {
            run_id,
            started_at,
            outcomes,
        };
        info!(
            %run_id,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "✅ Run finished"
        );
        report
    }

    #[instrument(skip(self, spec), fields(feed = %spec.feed, file = %spec.file_name))]
    pub async fn run_feed(&self, spec: &FeedSpec) -> FeedOutcome {
        let started = Instant::now();
        let status = match self.prepare(spec).await {
            Ok(status) => {
                metrics::feed::succeeded(spec.feed.as_str(), started.elapsed().as_secs_f64());
                status
            }
            Err(failure) => {
                metrics::feed::failed(spec.feed.as_str(), failure.stage.as_str());
                error!(
                    stage = failure.stage.as_str(),
                    bucket = %self.config.storage.bucket,
                    error = %failure.error,
                    "feed abandoned"
                );
                FeedStatus::Failed {
                    stage: failure.stage,
                    error: failure.error.to_string(),
                }
            }
        };
        FeedOutcome {
            feed: spec.feed,
            file_name: spec.file_name.clone(),
            status,
        }
    }

    async fn prepare(&self, spec: &FeedSpec) -> Result<FeedStatus, StageFailure> {
        let raw = self.fetch(spec).await?;
        if self.config.cache_raw {
            self.cache_raw(&raw).await;
        }

        let table = self.process(raw, spec)?;

        let destination = processed_name(&spec.file_name);
        let written = self
            .sink
            .write_table(&table, &destination)
            .await
            .map_err(at(Stage::Persist))?;
        info!(destination = %written, rows = table.row_count(), columns = table.column_count(), "💾 Saved processed feed");

        Ok(FeedStatus::Written {
            destination: written,
            rows: table.row_count(),
            columns: table.column_count(),
            column_types: table.column_types(),
        })
    }

    async fn fetch(&self, spec: &FeedSpec) -> Result<RawFeed, StageFailure> {
        let started = Instant::now();
        match self.store.fetch(&self.config.storage.bucket, &spec.file_name).await {
            Ok(bytes) => {
                metrics::fetch::success(spec.feed.as_str(), bytes.len(), started.elapsed().as_secs_f64());
                info!(bytes = bytes.len(), "📡 Fetched raw feed");
                Ok(RawFeed::new(spec.feed, spec.file_name.clone(), bytes))
            }
            Err(e) => {
                metrics::fetch::error(spec.feed.as_str());
                Err(StageFailure {
                    stage: Stage::Fetch,
                    error: e.into(),
                })
            }
        }
    }

    /// Best effort; a failed cache write never fails the feed.
    async fn cache_raw(&self, raw: &RawFeed) {
        let path = self.config.raw_dir.join(&raw.file_name);
        let result = async {
            tokio::fs::create_dir_all(&self.config.raw_dir).await?;
            tokio::fs::write(&path, &raw.bytes).await
        }
        .await;
        match result {
            Ok(()) => debug!(path = %path.display(), "cached raw feed"),
            Err(e) => warn!(path = %path.display(), error = %e, "could not cache raw feed"),
        }
    }

    /// Normalize, read, evaluate, coerce and (for spam) realign one raw feed.
    pub fn process(&self, raw: RawFeed, spec: &FeedSpec) -> Result<Table, StageFailure> {
        let feed = raw.feed;
        let rules = self.normalizers.rules_for(feed);
        let normalized = rules.normalize(&raw.into_text());
        debug!(rule_set = rules.name(), "normalized raw text");

        let reader = RecordReader::new(spec.row_policy(self.config.row_policy));
        let mut table = reader.read(&normalized).map_err(at(Stage::Read))?;
        info!(rows = table.row_count(), columns = table.column_count(), "🔧 Read feed table");

        if feed == Feed::Benign {
            let structured = literal::evaluate_table(&mut table);
            debug!(structured, "evaluated literal cells");
        }

        let options = CoercionOptions {
            parse_domain_age: feed == Feed::Benign,
            defer_timestamps: feed == Feed::Spam,
        };
        let mut summary = coerce_table(&mut table, options);

        if feed == Feed::Spam {
            RealignmentMap::spam()
                .with_expected_columns(self.config.spam_expected_columns)
                .apply(&mut table)
                .map_err(at(Stage::Realign))?;
            summary = coerce_table(
                &mut table,
                CoercionOptions {
                    defer_timestamps: false,
                    ..options
                },
            );
        }

        if summary.timestamp_gaps > 0 || summary.duration_gaps > 0 {
            warn!(
                timestamp_gaps = summary.timestamp_gaps,
                duration_gaps = summary.duration_gaps,
                "unparsable temporal values were set to missing"
            );
        }

        Ok(table)
    }
}
