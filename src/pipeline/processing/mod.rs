// Pipeline processing: normalization, reading, literal evaluation, coercion and realignment

pub mod coerce;
pub mod literal;
pub mod normalize;
pub mod reader;
pub mod realign;

pub use coerce::{coerce_table, CoercionOptions, CoercionSummary};
pub use normalize::{Dialect, NormalizationRegistry, NormalizedText, RuleSet};
pub use reader::{RecordReader, RowPolicy};
pub use realign::{RealignmentMap, RealignmentReport};
