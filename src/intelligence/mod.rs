/// Intelligence module
///
/// Turns the event log into insights and the task snapshot into suggestions.

pub mod analyzer;
pub mod context_detector;
pub mod extractors;
pub mod generators;
pub mod pattern_detector;
pub mod scorer;
pub mod suggestion_engine;

pub use analyzer::{AnalysisReport, Analyzer};
pub use context_detector::{Context, ContextDetector};
pub use extractors::{Extraction, WindowedEvents};
pub use pattern_detector::{DetectionOutcome, PatternDetector};
pub use scorer::Scorer;
pub use suggestion_engine::SuggestionEngine;
