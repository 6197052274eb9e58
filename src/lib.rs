/// focus-insights library
///
/// Learns work habits from a task event log and turns them into
/// time-boxed suggestions.

pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod intelligence;
pub mod logging;

// Re-exports for convenience
pub use config::Config;
pub use db::Database;
pub use error::{InsightError, Result};
