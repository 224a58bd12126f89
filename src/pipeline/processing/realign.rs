//! Declarative column realignment for the spam feed's known column shift.

use serde::Serialize;
use tracing::{info, warn};

use crate::constants::{BIGRAM, CREATION_DATE_TIME, DOMAIN_AGE, DOMAIN_NAME, EMAILS, ENTROPY, NUMERIC_PERCENTAGE};
use crate::error::{PrepError, Result};
use crate::observability::metrics;
use crate::types::Table;

/// Where a move reads its values from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    Named(String),
    /// 1-based position counted from the last column
    FromEnd(usize),
}

/// Copy the values of `source` into the existing column `destination`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub destination: String,
    pub source: ColumnRef,
}

impl Move {
    pub fn named(destination: &str, source: &str) -> Self {
        Self {
            destination: destination.to_string(),
            source: ColumnRef::Named(source.to_string()),
        }
    }

    pub fn from_end(destination: &str, offset: usize) -> Self {
        Self {
            destination: destination.to_string(),
            source: ColumnRef::FromEnd(offset),
        }
    }
}

/// Ordered moves, then a fixed number of trailing columns to drop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealignmentMap {
    pub moves: Vec<Move>,
    pub drop_trailing: usize,
    pub expected_columns: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RealignmentReport {
    pub moves_applied: usize,
    pub dropped: Vec<String>,
}

impl RealignmentMap {
    /// The spam feed's correction. Each step overwrites a column before the
    /// next step reads from it, so the order is significant.
    pub fn spam() -> Self {
        Self {
            moves: vec![
                Move::named(CREATION_DATE_TIME, NUMERIC_PERCENTAGE),
                Move::named(NUMERIC_PERCENTAGE, EMAILS),
                Move::named(EMAILS, BIGRAM),
                Move::named(BIGRAM, ENTROPY),
                Move::named(ENTROPY, DOMAIN_AGE),
                Move::named(DOMAIN_AGE, DOMAIN_NAME),
                Move::from_end(DOMAIN_NAME, 3),
            ],
            drop_trailing: 3,
            expected_columns: None,
        }
    }

    pub fn with_expected_columns(mut self, expected: Option<usize>) -> Self {
        self.expected_columns = expected;
        self
    }

    /// Verifies the table has the shape this map was written for.
    pub fn check(&self, table: &Table) -> Result<()> {
        let width = table.column_count();
        if let Some(expected) = self.expected_columns {
            if width != expected {
                return Err(precondition(format!(
                    "expected {} columns, table has {}",
                    expected, width
                )));
            }
        }
        if width <= self.drop_trailing {
            return Err(precondition(format!(
                "table has {} columns, cannot drop {} trailing columns",
                width, self.drop_trailing
            )));
        }
        let trailing_start = width - self.drop_trailing;

        for mv in &self.moves {
            let dest = table
                .position(&mv.destination)
                .ok_or_else(|| precondition(format!("missing column '{}'", mv.destination)))?;
            if dest >= trailing_start {
                return Err(precondition(format!(
                    "column '{}' is inside the trailing block that gets dropped",
                    mv.destination
                )));
            }
            match &mv.source {
                ColumnRef::Named(name) => {
                    let src = table
                        .position(name)
                        .ok_or_else(|| precondition(format!("missing column '{}'", name)))?;
                    if src >= trailing_start {
                        return Err(precondition(format!(
                            "column '{}' is inside the trailing block that gets dropped",
                            name
                        )));
                    }
                }
                ColumnRef::FromEnd(offset) => {
                    if *offset == 0 || *offset > width {
                        return Err(precondition(format!(
                            "position {} from the end is outside a {}-column table",
                            offset, width
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Checks the preconditions, then applies every move and the trailing drop.
    /// Nothing is mutated when a precondition fails.
    pub fn apply(&self, table: &mut Table) -> Result<RealignmentReport> {
        if let Err(e) = self.check(table) {
            metrics::realign::precondition_failed();
            warn!(error = %e, "realignment preconditions not met");
            return Err(e);
        }

        for mv in &self.moves {
            let source = match &mv.source {
                ColumnRef::Named(name) => table
                    .position(name)
                    .ok_or_else(|| PrepError::UnknownColumn(name.clone()))?,
                ColumnRef::FromEnd(offset) => table.column_count() - offset,
            };
            table.assign(&mv.destination, source)?;
        }

        let width = table.column_count();
        let dropped: Vec<String> = table.column_names()[width - self.drop_trailing..]
            .iter()
            .map(|s| s.to_string())
            .collect();
        table.drop_trailing(self.drop_trailing);

        metrics::realign::applied();
        info!(moves = self.moves.len(), dropped = ?dropped, "realigned shifted columns");
        Ok(RealignmentReport {
            moves_applied: self.moves.len(),
            dropped,
        })
    }
}

fn precondition(msg: String) -> PrepError {
    PrepError::RealignmentPrecondition(msg)
}
