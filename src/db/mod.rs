/// Database module for focus-insights
///
/// Handles all database operations using SQLite and sqlx:
/// the event log, the insight store, the suggestion store and preferences.

pub mod connection;
pub mod models;
pub mod queries;

pub use connection::{Database, DatabaseStats};
pub use models::*;
