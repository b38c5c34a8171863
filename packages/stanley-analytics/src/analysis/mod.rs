//! Analysis orchestration.
//!
//! Drives a request through fetching, alignment, blending and statistics,
//! producing `ComputedMetrics` for a portfolio or `InstrumentMetrics` for one
//! symbol.

mod orchestrator;
mod parallel;
mod source;

pub use orchestrator::{AnalysisStage, AnalyticsOrchestrator};
pub use source::{InMemoryPriceSource, PriceColumns, PriceHistorySource};
