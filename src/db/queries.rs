/// SQL query functions for database operations
///
/// Event log primitives, the insight upsert, the suggestion store and
/// per-user preferences. Every write here is a single statement.

use crate::db::models::*;
use crate::db::Database;
use crate::error::{InsightError, Result};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite};

impl Database {
    /// Append an event to the log
    ///
    /// Expects a resolved input (hour, day and timestamp filled in);
    /// `EventRecorder` takes care of that.
    ///
    /// # Returns
    /// * `Ok(i64)` - The event ID
    pub async fn append_event(&self, input: &TaskEventInput) -> Result<i64> {
        let (hour, day, created_at) = match (input.hour_of_day, input.day_of_week, input.created_at) {
            (Some(h), Some(d), Some(at)) => (h, d, at),
            _ => {
                return Err(InsightError::InvalidEvent(
                    "event must be resolved before it is appended".to_string(),
                ))
            }
        };

        let metadata = if input.metadata.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&input.metadata)?)
        };
        let previous_value = input.previous_value.as_ref().map(serde_json::to_string).transpose()?;
        let new_value = input.new_value.as_ref().map(serde_json::to_string).transpose()?;

        let result = sqlx::query(
            r#"
            INSERT INTO task_events (
                user_id, task_id, event_type, hour_of_day, day_of_week, time_block,
                project_id, priority, energy_level, previous_value, new_value, metadata, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&input.user_id)
        .bind(&input.task_id)
        .bind(input.event_type.as_str())
        .bind(i64::from(hour))
        .bind(i64::from(day))
        .bind(input.time_block.map(|b| b.as_str()))
        .bind(&input.project_id)
        .bind(input.priority.map(|p| p.as_str()))
        .bind(input.energy_level.map(|e| e.as_str()))
        .bind(previous_value)
        .bind(new_value)
        .bind(metadata)
        .bind(to_db_time(created_at))
        .fetch_one(self.pool())
        .await?;

        Ok(result.get(0))
    }

    /// Completions per time block since a point in time
    ///
    /// Events without a time block are not counted. The extractors work from
    /// `raw_events`; these tallies back the CLI's raw count view.
    pub async fn count_by_time_block(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<(TimeBlock, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT time_block, COUNT(*) FROM task_events
            WHERE user_id = ? AND event_type = 'completed' AND created_at >= ? AND time_block IS NOT NULL
            GROUP BY time_block
            ORDER BY time_block
            "#,
        )
        .bind(user_id)
        .bind(to_db_time(since))
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(block, count)| block.parse().ok().map(|b| (b, count)))
            .collect())
    }

    /// Completions per hour of day since a point in time
    pub async fn count_by_hour(&self, user_id: &str, since: DateTime<Utc>) -> Result<[i64; 24]> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT hour_of_day, COUNT(*) FROM task_events
            WHERE user_id = ? AND event_type = 'completed' AND created_at >= ?
            GROUP BY hour_of_day
            "#,
        )
        .bind(user_id)
        .bind(to_db_time(since))
        .fetch_all(self.pool())
        .await?;

        let mut hours = [0i64; 24];
        for (hour, count) in rows {
            if let Some(slot) = usize::try_from(hour).ok().and_then(|h| hours.get_mut(h)) {
                *slot = count;
            }
        }

        Ok(hours)
    }

    /// Completions per (project, time block) since a point in time
    pub async fn count_by_project_and_time_block(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<(String, TimeBlock, i64)>> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            r#"
            SELECT project_id, time_block, COUNT(*) FROM task_events
            WHERE user_id = ? AND event_type = 'completed' AND created_at >= ?
              AND project_id IS NOT NULL AND time_block IS NOT NULL
            GROUP BY project_id, time_block
            ORDER BY project_id, time_block
            "#,
        )
        .bind(user_id)
        .bind(to_db_time(since))
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(project, block, count)| block.parse().ok().map(|b| (project, b, count)))
            .collect())
    }

    /// Raw events of the given types, oldest first
    ///
    /// # Arguments
    /// * `types` - Event types to include (empty means all)
    /// * `since` - Inclusive lower bound on `created_at`
    /// * `limit` - Keeps the most recent `limit` events
    pub async fn raw_events(
        &self,
        user_id: &str,
        types: &[EventType],
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<TaskEvent>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM task_events WHERE user_id = ");
        builder.push_bind(user_id);
        builder.push(" AND created_at >= ");
        builder.push_bind(to_db_time(since));

        if !types.is_empty() {
            builder.push(" AND event_type IN (");
            let mut separated = builder.separated(", ");
            for event_type in types {
                separated.push_bind(event_type.as_str());
            }
            separated.push_unseparated(")");
        }

        builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        builder.push_bind(limit);

        let rows = builder
            .build_query_as::<EventRow>()
            .fetch_all(self.pool())
            .await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows.into_iter().rev() {
            match TaskEvent::try_from(row) {
                Ok(event) => events.push(event),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable event"),
            }
        }

        Ok(events)
    }

    /// Every user that has at least one event
    pub async fn list_event_users(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT user_id FROM task_events ORDER BY user_id")
                .fetch_all(self.pool())
                .await?;

        Ok(rows.into_iter().map(|(u,)| u).collect())
    }

    /// Insert or replace the insight for `(user, type, category)`
    ///
    /// One conditional statement: an existing row is only overwritten by a write
    /// whose `last_updated` is not older than its own.
    ///
    /// # Returns
    /// * `Ok(true)` - The row now holds this insight
    /// * `Ok(false)` - A newer write already owns the row
    pub async fn upsert_insight(&self, insight: &InsightUpsert) -> Result<bool> {
        let pattern_json = serde_json::to_string(&insight.pattern)?;

        let result = sqlx::query(
            r#"
            INSERT INTO user_insights (
                user_id, insight_type, category, pattern, confidence, sample_size,
                is_active, last_updated, expires_at
            )
            VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
            ON CONFLICT(user_id, insight_type, category) DO UPDATE SET
                pattern = excluded.pattern,
                confidence = excluded.confidence,
                sample_size = excluded.sample_size,
                is_active = 1,
                last_updated = excluded.last_updated,
                expires_at = excluded.expires_at
            WHERE excluded.last_updated >= user_insights.last_updated
            "#,
        )
        .bind(&insight.user_id)
        .bind(insight.pattern.insight_type().as_str())
        .bind(insight.pattern.category())
        .bind(pattern_json)
        .bind(insight.confidence)
        .bind(i64::from(insight.sample_size))
        .bind(to_db_time(insight.last_updated))
        .bind(to_db_time(insight.expires_at))
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Active insights that have not expired yet, most confident first
    pub async fn get_active_insights(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<UserInsight>> {
        let rows = sqlx::query_as::<_, InsightRow>(
            r#"
            SELECT * FROM user_insights
            WHERE user_id = ? AND is_active = 1 AND expires_at > ?
            ORDER BY confidence DESC, insight_type, category
            "#,
        )
        .bind(user_id)
        .bind(to_db_time(now))
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(UserInsight::try_from).collect()
    }

    /// Look up one insight row regardless of expiry
    pub async fn get_insight(
        &self,
        user_id: &str,
        insight_type: InsightType,
        category: &str,
    ) -> Result<Option<UserInsight>> {
        let row = sqlx::query_as::<_, InsightRow>(
            "SELECT * FROM user_insights WHERE user_id = ? AND insight_type = ? AND category = ?",
        )
        .bind(user_id)
        .bind(insight_type.as_str())
        .bind(category)
        .fetch_optional(self.pool())
        .await?;

        row.map(UserInsight::try_from).transpose()
    }

    /// Store a suggestion unless an open one with the same key exists
    ///
    /// The key is `(user, task, type)`; the task comparison is null-safe so
    /// task-agnostic suggestions dedupe too. Open means pending and unexpired.
    ///
    /// # Returns
    /// * `Ok(Some(Suggestion))` - Newly stored suggestion
    /// * `Ok(None)` - An open duplicate already exists
    pub async fn store_suggestion_if_absent(
        &self,
        suggestion: &NewSuggestion,
        now: DateTime<Utc>,
    ) -> Result<Option<Suggestion>> {
        let action_json = serde_json::to_string(&suggestion.action)?;
        let now_text = to_db_time(now);

        let row = sqlx::query_as::<_, SuggestionRow>(
            r#"
            INSERT INTO suggestions (
                user_id, task_id, suggestion_type, title, description, action,
                reasoning, confidence, source, status, expires_at, created_at
            )
            SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM suggestions
                WHERE user_id = ? AND task_id IS ? AND suggestion_type = ?
                  AND status = 'pending' AND expires_at > ?
            )
            RETURNING *
            "#,
        )
        .bind(&suggestion.user_id)
        .bind(&suggestion.task_id)
        .bind(suggestion.suggestion_type.as_str())
        .bind(&suggestion.title)
        .bind(&suggestion.description)
        .bind(action_json)
        .bind(&suggestion.reasoning)
        .bind(suggestion.confidence)
        .bind(suggestion.source.as_str())
        .bind(to_db_time(suggestion.expires_at))
        .bind(&now_text)
        .bind(&suggestion.user_id)
        .bind(&suggestion.task_id)
        .bind(suggestion.suggestion_type.as_str())
        .bind(&now_text)
        .fetch_optional(self.pool())
        .await?;

        row.map(Suggestion::try_from).transpose()
    }

    /// Read suggestions for a user, newest first
    ///
    /// Pending suggestions past their expiry are left out unless
    /// `query.include_expired` is set.
    pub async fn get_suggestions(
        &self,
        user_id: &str,
        query: SuggestionQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<Suggestion>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM suggestions WHERE user_id = ");
        builder.push_bind(user_id);

        if let Some(status) = query.status {
            builder.push(" AND status = ");
            builder.push_bind(status.as_str());
        }

        if !query.include_expired {
            builder.push(" AND NOT (status = 'pending' AND expires_at <= ");
            builder.push_bind(to_db_time(now));
            builder.push(")");
        }

        builder.push(" ORDER BY created_at DESC, id DESC");

        let rows = builder
            .build_query_as::<SuggestionRow>()
            .fetch_all(self.pool())
            .await?;

        rows.into_iter().map(Suggestion::try_from).collect()
    }

    /// Get suggestion by ID
    pub async fn get_suggestion_by_id(&self, id: i64) -> Result<Option<Suggestion>> {
        let row = sqlx::query_as::<_, SuggestionRow>("SELECT * FROM suggestions WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        row.map(Suggestion::try_from).transpose()
    }

    /// Move a pending, unexpired suggestion into a terminal state
    ///
    /// # Returns
    /// * `Ok(true)` - The suggestion changed state
    /// * `Ok(false)` - It was already terminal, expired, or never existed
    pub async fn respond_to_suggestion(
        &self,
        id: i64,
        status: SuggestionStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let now_text = to_db_time(now);

        let result = sqlx::query(
            r#"
            UPDATE suggestions SET status = ?, responded_at = ?
            WHERE id = ? AND status = 'pending' AND expires_at > ?
            "#,
        )
        .bind(status.as_str())
        .bind(&now_text)
        .bind(id)
        .bind(&now_text)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get a user's feature flags, falling back to defaults
    pub async fn get_preferences(&self, user_id: &str) -> Result<UserPreferences> {
        let row = sqlx::query_as::<_, PreferenceRow>(
            "SELECT * FROM user_preferences WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(UserPreferences::from).unwrap_or_default())
    }

    /// Set a user's feature flags
    pub async fn set_preferences(&self, user_id: &str, prefs: UserPreferences) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_preferences (user_id, smart_suggestions_enabled, suggestion_frequency, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                smart_suggestions_enabled = excluded.smart_suggestions_enabled,
                suggestion_frequency = excluded.suggestion_frequency,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(prefs.smart_suggestions_enabled)
        .bind(prefs.suggestion_frequency.as_str())
        .bind(to_db_time(Utc::now()))
        .execute(self.pool())
        .await?;

        Ok(())
    }
}
