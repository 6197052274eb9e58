// Records task events to the log
//
// Everything gets checked here before it touches the database. The analyzer
// trusts the log, so junk has to be stopped at the door.

use crate::db::{Database, TaskEventInput};
use crate::error::{InsightError, Result};
use chrono::{Datelike, Local, Timelike, Utc};
use regex::Regex;
use std::sync::{Arc, OnceLock};

// Ids come from an upstream auth layer. Anything else is a bug or an attack.
const USER_ID_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9_.@-]{0,127}$";

const MAX_ID_LENGTH: usize = 128;

/// Check a user id before it enters the pipeline
pub fn validate_user_id(user_id: &str) -> Result<()> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();

    let regex = RE
        .get_or_init(|| Regex::new(USER_ID_PATTERN).ok())
        .as_ref()
        .ok_or_else(|| InsightError::Generic("user id pattern failed to compile".to_string()))?;

    if regex.is_match(user_id) {
        Ok(())
    } else {
        Err(InsightError::InvalidInput(format!("malformed user id '{}'", user_id)))
    }
}

pub struct EventRecorder {
    db: Arc<Database>,
}

impl EventRecorder {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    // Main recording function. Checks the event, fills in the clock fields, saves it.
    pub async fn record(&self, input: TaskEventInput) -> Result<i64> {
        let resolved = self.resolve(input)?;
        let id = self.db.append_event(&resolved).await?;

        tracing::debug!(
            event_id = id,
            user_id = %resolved.user_id,
            event_type = %resolved.event_type,
            "event recorded"
        );

        Ok(id)
    }

    /// Validate an event and fill in whatever can be derived
    ///
    /// - `created_at` defaults to now
    /// - hour and day come from `created_at` in local time (Monday = 0)
    fn resolve(&self, mut input: TaskEventInput) -> Result<TaskEventInput> {
        validate_user_id(&input.user_id).map_err(|e| InsightError::InvalidEvent(e.to_string()))?;

        match input.task_id.as_deref() {
            Some(id) if id.trim().is_empty() || id.len() > MAX_ID_LENGTH => {
                return Err(InsightError::InvalidEvent("task id is empty or too long".to_string()));
            }
            None if input.event_type.is_task_scoped() => {
                return Err(InsightError::InvalidEvent(format!(
                    "'{}' events need a task id",
                    input.event_type
                )));
            }
            _ => {}
        }

        if let Some(hour) = input.hour_of_day {
            if hour > 23 {
                return Err(InsightError::InvalidEvent(format!("hour_of_day {} out of range", hour)));
            }
        }

        if let Some(day) = input.day_of_week {
            if day > 6 {
                return Err(InsightError::InvalidEvent(format!("day_of_week {} out of range", day)));
            }
        }

        let created_at = *input.created_at.get_or_insert_with(Utc::now);
        let local = created_at.with_timezone(&Local);

        // Both values are bounded (0..24, 0..7) so the casts can't truncate
        input.hour_of_day.get_or_insert(local.hour() as u8);
        input.day_of_week.get_or_insert(local.weekday().num_days_from_monday() as u8);

        Ok(input)
    }

    /// Batch record multiple events
    ///
    /// Useful for importing history. Bad events are logged and skipped.
    pub async fn record_batch(&self, inputs: Vec<TaskEventInput>) -> Result<Vec<i64>> {
        let mut ids = Vec::new();

        for input in inputs {
            let user_id = input.user_id.clone();
            match self.record(input).await {
                Ok(id) => ids.push(id),
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "skipping event during import");
                }
            }
        }

        Ok(ids)
    }
}
