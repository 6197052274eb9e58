/// Database connection management with connection pooling
///
/// Provides a thread-safe connection pool to the SQLite database.

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Maximum number of database connections in the pool
const MAX_CONNECTIONS: u32 = 5;

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

impl Database {
    /// Create a new database instance
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    ///
    /// # Returns
    /// * `Ok(Database)` - Successfully created database instance
    /// * `Err(InsightError)` - If connection fails
    ///
    /// # Examples
    /// ```no_run
    /// use focus_insights_lib::db::Database;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = Database::new("/tmp/focus-insights/insights.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .foreign_keys(true)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        let db = Self {
            pool: Arc::new(pool),
            db_path,
        };

        db.initialize_schema().await?;

        tracing::debug!(path = %db.db_path.display(), "database ready");

        Ok(db)
    }

    /// Create a test database in memory
    ///
    /// Every connection to `:memory:` is its own database, so the pool is pinned
    /// to a single connection that never gets recycled.
    #[cfg(test)]
    pub async fn new_test() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self {
            pool: Arc::new(pool),
            db_path: PathBuf::from(":memory:"),
        };

        db.initialize_schema().await?;

        Ok(db)
    }

    /// Initialize database schema
    ///
    /// Creates all required tables and indexes if they don't exist.
    async fn initialize_schema(&self) -> Result<()> {
        let schema = include_str!("../../database/schema.sql");

        // SQLite won't run several statements in one execute
        for statement in schema.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed).execute(self.pool.as_ref()).await?;
            }
        }

        Ok(())
    }

    /// Get reference to the connection pool
    ///
    /// Used internally by query modules.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Close all connections in the pool
    ///
    /// Should be called on application shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Get database statistics
    ///
    /// Returns information about the database for the status screen.
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let event_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM task_events")
            .fetch_one(self.pool.as_ref())
            .await?;

        let insight_count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM user_insights WHERE is_active = 1")
                .fetch_one(self.pool.as_ref())
                .await?;

        let suggestion_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM suggestions")
            .fetch_one(self.pool.as_ref())
            .await?;

        let user_count: (i64,) = sqlx::query_as("SELECT COUNT(DISTINCT user_id) FROM task_events")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(DatabaseStats {
            total_events: event_count.0,
            total_insights: insight_count.0,
            total_suggestions: suggestion_count.0,
            total_users: user_count.0,
            pool_size: self.pool.size(),
            idle_connections: self.pool.num_idle(),
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub total_events: i64,
    pub total_insights: i64,
    pub total_suggestions: i64,
    pub total_users: i64,
    pub pool_size: u32,
    pub idle_connections: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_creation() {
        let db = Database::new_test().await;
        assert!(db.is_ok());
    }

    #[tokio::test]
    async fn test_database_stats() {
        let db = Database::new_test().await.unwrap();
        let stats = db.stats().await.unwrap();

        assert_eq!(stats.total_events, 0);
        assert_eq!(stats.total_insights, 0);
        assert_eq!(stats.total_suggestions, 0);
        assert_eq!(stats.total_users, 0);
    }

    #[tokio::test]
    async fn test_file_database_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("insights.db");

        let db = Database::new(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(db.path(), path.as_path());
        db.close().await;
    }

    #[tokio::test]
    async fn test_schema_initialization() {
        let db = Database::new_test().await.unwrap();

        for table in ["task_events", "user_insights", "suggestions", "user_preferences"] {
            let result: std::result::Result<(i64,), sqlx::Error> =
                sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
                    .fetch_one(db.pool())
                    .await;
            assert!(result.is_ok(), "missing table {}", table);
        }
    }
}
