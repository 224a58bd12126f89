// Observability: metrics recorded by each pipeline phase

pub mod metrics;
