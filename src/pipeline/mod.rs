// Feed preparation pipeline: processing stages, table sinks and the orchestrator

pub mod orchestrator;
pub mod processing;
pub mod storage;

pub use orchestrator::{FeedOrchestrator, FeedOutcome, FeedStatus, RunReport, Stage};
