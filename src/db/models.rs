/// Data models for database entities
///
/// Row types map 1:1 to tables and use sqlx `FromRow`. Domain types are what the
/// rest of the crate works with; every row converts into one through `TryFrom`.

use crate::error::{InsightError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

/// Format a timestamp the way every table stores it.
///
/// Fixed width with a `Z` suffix, so string order is time order in SQL.
pub fn to_db_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
pub fn from_db_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| InsightError::CorruptRecord(format!("bad timestamp '{}': {}", raw, e)))
}

// Enums that live in TEXT columns. Generates as_str, Display and FromStr.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = InsightError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(InsightError::InvalidInput(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

/// Kinds of user actions recorded in the event log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Created,
    Started,
    Completed,
    Moved,
    Updated,
    Deleted,
    SessionStart,
}

text_enum!(EventType {
    Created => "created",
    Started => "started",
    Completed => "completed",
    Moved => "moved",
    Updated => "updated",
    Deleted => "deleted",
    SessionStart => "session_start",
});

impl EventType {
    /// Everything except session markers is about one specific task.
    pub fn is_task_scoped(&self) -> bool {
        !matches!(self, EventType::SessionStart)
    }
}

/// Coarse scheduling bucket for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBlock {
    Morning,
    Afternoon,
    Evening,
    Anytime,
}

text_enum!(TimeBlock {
    Morning => "morning",
    Afternoon => "afternoon",
    Evening => "evening",
    Anytime => "anytime",
});

impl TimeBlock {
    /// The blocks that are an actual part of the day.
    pub const CONCRETE: [TimeBlock; 3] = [TimeBlock::Morning, TimeBlock::Afternoon, TimeBlock::Evening];

    pub fn is_concrete(&self) -> bool {
        !matches!(self, TimeBlock::Anytime)
    }

    /// Block a wall-clock hour falls into: before 12 morning, before 17 afternoon.
    pub fn for_hour(hour: u32) -> TimeBlock {
        match hour {
            0..=11 => TimeBlock::Morning,
            12..=16 => TimeBlock::Afternoon,
            _ => TimeBlock::Evening,
        }
    }
}

/// Task priority. Declaration order is focus order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
}

text_enum!(Priority {
    Urgent => "urgent",
    High => "high",
    Medium => "medium",
    Low => "low",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

text_enum!(EnergyLevel {
    Low => "low",
    Medium => "medium",
    High => "high",
});

/// Extra facts attached to an event
///
/// The known keys are typed; anything else rides along in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollover_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtask_count: Option<u32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl EventMetadata {
    pub fn is_empty(&self) -> bool {
        self.estimated_minutes.is_none()
            && self.actual_minutes.is_none()
            && self.rollover_count.is_none()
            && self.subtask_count.is_none()
            && self.extra.is_empty()
    }
}

/// Input for appending an event to the log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEventInput {
    pub user_id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    pub event_type: EventType,
    /// Derived from `created_at` when absent
    #[serde(default)]
    pub hour_of_day: Option<u8>,
    /// Monday = 0. Derived from `created_at` when absent
    #[serde(default)]
    pub day_of_week: Option<u8>,
    #[serde(default)]
    pub time_block: Option<TimeBlock>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub energy_level: Option<EnergyLevel>,
    #[serde(default)]
    pub previous_value: Option<serde_json::Value>,
    #[serde(default)]
    pub new_value: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: EventMetadata,
    /// Defaults to now
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl TaskEventInput {
    /// Bare event of a given type; fill in the rest with struct update syntax.
    pub fn new(user_id: impl Into<String>, event_type: EventType) -> Self {
        Self {
            user_id: user_id.into(),
            task_id: None,
            event_type,
            hour_of_day: None,
            day_of_week: None,
            time_block: None,
            project_id: None,
            priority: None,
            energy_level: None,
            previous_value: None,
            new_value: None,
            metadata: EventMetadata::default(),
            created_at: None,
        }
    }
}

/// Immutable fact from the event log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskEvent {
    pub id: i64,
    pub user_id: String,
    pub task_id: Option<String>,
    pub event_type: EventType,
    pub hour_of_day: u8,
    pub day_of_week: u8,
    pub time_block: Option<TimeBlock>,
    pub project_id: Option<String>,
    pub priority: Option<Priority>,
    pub energy_level: Option<EnergyLevel>,
    pub previous_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub metadata: EventMetadata,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: i64,
    pub user_id: String,
    pub task_id: Option<String>,
    pub event_type: String,
    pub hour_of_day: i64,
    pub day_of_week: i64,
    pub time_block: Option<String>,
    pub project_id: Option<String>,
    pub priority: Option<String>,
    pub energy_level: Option<String>,
    pub previous_value: Option<String>, // JSON
    pub new_value: Option<String>,      // JSON
    pub metadata: Option<String>,       // JSON
    pub created_at: String,
}

// Optional columns degrade to None instead of failing the whole row.
fn lenient<T: FromStr>(raw: Option<String>) -> Option<T> {
    raw.and_then(|s| s.parse().ok())
}

fn lenient_json<T: serde::de::DeserializeOwned>(raw: Option<String>) -> Option<T> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
}

impl TryFrom<EventRow> for TaskEvent {
    type Error = InsightError;

    fn try_from(row: EventRow) -> Result<Self> {
        Ok(TaskEvent {
            id: row.id,
            event_type: row.event_type.parse()?,
            hour_of_day: u8::try_from(row.hour_of_day)
                .map_err(|_| InsightError::CorruptRecord(format!("hour {}", row.hour_of_day)))?,
            day_of_week: u8::try_from(row.day_of_week)
                .map_err(|_| InsightError::CorruptRecord(format!("day {}", row.day_of_week)))?,
            time_block: lenient(row.time_block),
            priority: lenient(row.priority),
            energy_level: lenient(row.energy_level),
            previous_value: lenient_json(row.previous_value),
            new_value: lenient_json(row.new_value),
            metadata: lenient_json(row.metadata).unwrap_or_default(),
            created_at: from_db_time(&row.created_at)?,
            user_id: row.user_id,
            task_id: row.task_id,
            project_id: row.project_id,
        })
    }
}

/// The five things the analyzer knows how to learn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    TimePreference,
    ProductivityWindow,
    ProjectTiming,
    EstimationAccuracy,
    CompletionVelocity,
}

text_enum!(InsightType {
    TimePreference => "time_preference",
    ProductivityWindow => "productivity_window",
    ProjectTiming => "project_timing",
    EstimationAccuracy => "estimation_accuracy",
    CompletionVelocity => "completion_velocity",
});

/// Category used by insights that are not scoped to a project
pub const GENERAL_CATEGORY: &str = "general";

/// Completion counts per concrete time block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCounts {
    pub morning: u32,
    pub afternoon: u32,
    pub evening: u32,
}

impl BlockCounts {
    pub fn add(&mut self, block: TimeBlock) {
        match block {
            TimeBlock::Morning => self.morning += 1,
            TimeBlock::Afternoon => self.afternoon += 1,
            TimeBlock::Evening => self.evening += 1,
            TimeBlock::Anytime => {}
        }
    }

    pub fn get(&self, block: TimeBlock) -> u32 {
        match block {
            TimeBlock::Morning => self.morning,
            TimeBlock::Afternoon => self.afternoon,
            TimeBlock::Evening => self.evening,
            TimeBlock::Anytime => 0,
        }
    }

    pub fn total(&self) -> u32 {
        self.morning + self.afternoon + self.evening
    }

    /// Busiest block. Ties go to the earlier block.
    pub fn busiest(&self) -> Option<(TimeBlock, u32)> {
        TimeBlock::CONCRETE
            .iter()
            .map(|b| (*b, self.get(*b)))
            .filter(|(_, n)| *n > 0)
            .fold(None, |best, cur| match best {
                Some((_, n)) if n >= cur.1 => best,
                _ => Some(cur),
            })
    }
}

/// What an insight actually says, one variant per insight type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pattern {
    TimePreference {
        preferred_time_block: TimeBlock,
        block_counts: BlockCounts,
    },
    ProductivityWindow {
        peak_hours: Vec<u8>,
        average_per_hour: f64,
    },
    ProjectTiming {
        project_id: String,
        preferred_time_block: TimeBlock,
        block_counts: BlockCounts,
    },
    EstimationAccuracy {
        estimation_accuracy: f64,
        total_estimated_minutes: u64,
        total_actual_minutes: u64,
    },
    CompletionVelocity {
        tasks_per_day: f64,
        active_days: u32,
    },
}

impl Pattern {
    pub fn insight_type(&self) -> InsightType {
        match self {
            Pattern::TimePreference { .. } => InsightType::TimePreference,
            Pattern::ProductivityWindow { .. } => InsightType::ProductivityWindow,
            Pattern::ProjectTiming { .. } => InsightType::ProjectTiming,
            Pattern::EstimationAccuracy { .. } => InsightType::EstimationAccuracy,
            Pattern::CompletionVelocity { .. } => InsightType::CompletionVelocity,
        }
    }

    /// Insight row category: the project for project-scoped patterns.
    pub fn category(&self) -> &str {
        match self {
            Pattern::ProjectTiming { project_id, .. } => project_id,
            _ => GENERAL_CATEGORY,
        }
    }

    /// One-line human summary, used by the CLI.
    pub fn describe(&self) -> String {
        match self {
            Pattern::TimePreference { preferred_time_block, .. } => {
                format!("You finish most tasks in the {}", preferred_time_block)
            }
            Pattern::ProductivityWindow { peak_hours, .. } => {
                let hours: Vec<String> = peak_hours.iter().map(|h| format!("{:02}:00", h)).collect();
                format!("Peak hours: {}", hours.join(", "))
            }
            Pattern::ProjectTiming { project_id, preferred_time_block, .. } => {
                format!("'{}' work gets done in the {}", project_id, preferred_time_block)
            }
            Pattern::EstimationAccuracy { estimation_accuracy, .. } => {
                format!("Tasks take {:.0}% of the estimated time", estimation_accuracy * 100.0)
            }
            Pattern::CompletionVelocity { tasks_per_day, active_days } => {
                format!("{:.1} tasks per active day over {} days", tasks_per_day, active_days)
            }
        }
    }
}

/// Persisted, confidence-scored conclusion about a user's habits
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserInsight {
    pub id: i64,
    pub user_id: String,
    pub insight_type: InsightType,
    pub category: String,
    pub pattern: Pattern,
    pub confidence: f64,
    pub sample_size: u32,
    pub is_active: bool,
    pub last_updated: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl UserInsight {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at > now
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct InsightRow {
    pub id: i64,
    pub user_id: String,
    pub insight_type: String,
    pub category: String,
    pub pattern: String, // JSON
    pub confidence: f64,
    pub sample_size: i64,
    pub is_active: bool,
    pub last_updated: String,
    pub expires_at: String,
}

impl TryFrom<InsightRow> for UserInsight {
    type Error = InsightError;

    fn try_from(row: InsightRow) -> Result<Self> {
        Ok(UserInsight {
            id: row.id,
            insight_type: row.insight_type.parse()?,
            pattern: serde_json::from_str(&row.pattern)?,
            sample_size: u32::try_from(row.sample_size)
                .map_err(|_| InsightError::CorruptRecord(format!("sample size {}", row.sample_size)))?,
            last_updated: from_db_time(&row.last_updated)?,
            expires_at: from_db_time(&row.expires_at)?,
            user_id: row.user_id,
            category: row.category,
            confidence: row.confidence,
            is_active: row.is_active,
        })
    }
}

/// Everything needed to write one insight row
#[derive(Debug, Clone)]
pub struct InsightUpsert {
    pub user_id: String,
    pub pattern: Pattern,
    pub confidence: f64,
    pub sample_size: u32,
    pub last_updated: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    TimeBlock,
    OverloadWarning,
    StaleTask,
    DependencyReady,
    FocusRecommendation,
}

text_enum!(SuggestionType {
    TimeBlock => "time_block",
    OverloadWarning => "overload_warning",
    StaleTask => "stale_task",
    DependencyReady => "dependency_ready",
    FocusRecommendation => "focus_recommendation",
});

/// What accepting a suggestion would do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuggestionAction {
    MoveTimeBlock { time_block: TimeBlock },
    Focus { task_ids: Vec<String> },
    Breakdown,
    Dismiss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    Rule,
    Pattern,
    Ai,
}

text_enum!(SuggestionSource {
    Rule => "rule",
    Pattern => "pattern",
    Ai => "ai",
});

/// Stored suggestion state. Expiry is never stored; see `Suggestion::is_expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    Pending,
    Accepted,
    Dismissed,
}

text_enum!(SuggestionStatus {
    Pending => "pending",
    Accepted => "accepted",
    Dismissed => "dismissed",
});

impl SuggestionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SuggestionStatus::Pending)
    }

    pub fn from_response(accepted: bool) -> Self {
        if accepted {
            SuggestionStatus::Accepted
        } else {
            SuggestionStatus::Dismissed
        }
    }
}

/// Actionable, time-boxed recommendation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub id: i64,
    pub user_id: String,
    pub task_id: Option<String>,
    pub suggestion_type: SuggestionType,
    pub title: String,
    pub description: String,
    pub action: SuggestionAction,
    pub reasoning: String,
    pub confidence: f64,
    pub source: SuggestionSource,
    pub status: SuggestionStatus,
    pub responded_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Suggestion {
    /// Pending but past its expiry: inert, hidden from active queries.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == SuggestionStatus::Pending && self.expires_at <= now
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SuggestionRow {
    pub id: i64,
    pub user_id: String,
    pub task_id: Option<String>,
    pub suggestion_type: String,
    pub title: String,
    pub description: String,
    pub action: String, // JSON
    pub reasoning: String,
    pub confidence: f64,
    pub source: String,
    pub status: String,
    pub responded_at: Option<String>,
    pub expires_at: String,
    pub created_at: String,
}

impl TryFrom<SuggestionRow> for Suggestion {
    type Error = InsightError;

    fn try_from(row: SuggestionRow) -> Result<Self> {
        Ok(Suggestion {
            id: row.id,
            suggestion_type: row.suggestion_type.parse()?,
            action: serde_json::from_str(&row.action)?,
            source: row.source.parse()?,
            status: row.status.parse()?,
            responded_at: row.responded_at.as_deref().map(from_db_time).transpose()?,
            expires_at: from_db_time(&row.expires_at)?,
            created_at: from_db_time(&row.created_at)?,
            user_id: row.user_id,
            task_id: row.task_id,
            title: row.title,
            description: row.description,
            reasoning: row.reasoning,
            confidence: row.confidence,
        })
    }
}

/// Candidate produced by a generator, not yet stored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSuggestion {
    pub user_id: String,
    pub task_id: Option<String>,
    pub suggestion_type: SuggestionType,
    pub title: String,
    pub description: String,
    pub action: SuggestionAction,
    pub reasoning: String,
    pub confidence: f64,
    pub source: SuggestionSource,
    pub expires_at: DateTime<Utc>,
}

/// Filter for reading suggestions back
#[derive(Debug, Clone, Copy, Default)]
pub struct SuggestionQuery {
    pub status: Option<SuggestionStatus>,
    /// Also return pending suggestions that are past `expires_at`
    pub include_expired: bool,
}

/// How much the suggestion engine is allowed to say
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionFrequency {
    Minimal,
    #[default]
    Balanced,
    Proactive,
}

text_enum!(SuggestionFrequency {
    Minimal => "minimal",
    Balanced => "balanced",
    Proactive => "proactive",
});

/// Per-user feature flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub smart_suggestions_enabled: bool,
    pub suggestion_frequency: SuggestionFrequency,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            smart_suggestions_enabled: true,
            suggestion_frequency: SuggestionFrequency::Balanced,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PreferenceRow {
    pub user_id: String,
    pub smart_suggestions_enabled: bool,
    pub suggestion_frequency: String,
    pub updated_at: String,
}

impl From<PreferenceRow> for UserPreferences {
    fn from(row: PreferenceRow) -> Self {
        Self {
            smart_suggestions_enabled: row.smart_suggestions_enabled,
            // Unknown values fall back to the default breadth.
            suggestion_frequency: row.suggestion_frequency.parse().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_db_time_round_trip_and_ordering() {
        let early = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let late = early + chrono::Duration::milliseconds(1500);

        let (a, b) = (to_db_time(early), to_db_time(late));
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(from_db_time(&a).unwrap(), early);
        assert!(from_db_time("yesterday").is_err());
    }

    #[test]
    fn test_time_block_for_hour() {
        assert_eq!(TimeBlock::for_hour(0), TimeBlock::Morning);
        assert_eq!(TimeBlock::for_hour(11), TimeBlock::Morning);
        assert_eq!(TimeBlock::for_hour(12), TimeBlock::Afternoon);
        assert_eq!(TimeBlock::for_hour(16), TimeBlock::Afternoon);
        assert_eq!(TimeBlock::for_hour(17), TimeBlock::Evening);
        assert_eq!(TimeBlock::for_hour(23), TimeBlock::Evening);
    }

    #[test]
    fn test_priority_focus_order() {
        let mut priorities = vec![Priority::Low, Priority::Urgent, Priority::Medium, Priority::High];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![Priority::Urgent, Priority::High, Priority::Medium, Priority::Low]
        );
    }

    #[test]
    fn test_text_enum_parsing() {
        assert_eq!("session_start".parse::<EventType>().unwrap(), EventType::SessionStart);
        assert_eq!(SuggestionType::OverloadWarning.to_string(), "overload_warning");
        assert!("sometime".parse::<TimeBlock>().is_err());
    }

    #[test]
    fn test_busiest_block_prefers_earlier_on_tie() {
        let counts = BlockCounts { morning: 3, afternoon: 3, evening: 1 };
        assert_eq!(counts.busiest(), Some((TimeBlock::Morning, 3)));
        assert_eq!(BlockCounts::default().busiest(), None);
    }

    #[test]
    fn test_pattern_is_tagged_by_kind() {
        let pattern = Pattern::CompletionVelocity { tasks_per_day: 2.5, active_days: 4 };
        let json = serde_json::to_value(&pattern).unwrap();
        assert_eq!(json["kind"], "completion_velocity");
        assert_eq!(pattern.category(), GENERAL_CATEGORY);

        let project = Pattern::ProjectTiming {
            project_id: "work".to_string(),
            preferred_time_block: TimeBlock::Morning,
            block_counts: BlockCounts::default(),
        };
        assert_eq!(project.category(), "work");
        assert_eq!(project.insight_type(), InsightType::ProjectTiming);
    }

    #[test]
    fn test_metadata_keeps_unknown_keys() {
        let raw = r#"{"estimated_minutes": 30, "source": "mobile"}"#;
        let meta: EventMetadata = serde_json::from_str(raw).unwrap();
        assert_eq!(meta.estimated_minutes, Some(30));
        assert_eq!(meta.actual_minutes, None);
        assert_eq!(meta.extra["source"], "mobile");
    }

    #[test]
    fn test_action_serialization() {
        let action = SuggestionAction::MoveTimeBlock { time_block: TimeBlock::Evening };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"type":"move_time_block","time_block":"evening"}"#);
    }
}
