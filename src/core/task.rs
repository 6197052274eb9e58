/// Read-only task snapshot
///
/// Tasks are owned by the surrounding application. The engine only ever sees
/// a snapshot handed to it at call time and treats it as the truth for that run.

use crate::db::{EnergyLevel, Priority, TimeBlock};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Skipped,
    CarriedOver,
}

impl TaskStatus {
    /// Waiting to be worked on. Rolled-over tasks still count.
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::CarriedOver)
    }

    /// Not finished and not given up on
    pub fn is_open(&self) -> bool {
        !matches!(self, TaskStatus::Completed | TaskStatus::Skipped)
    }
}

fn default_priority() -> Priority {
    Priority::Medium
}

fn default_time_block() -> TimeBlock {
    TimeBlock::Anytime
}

/// One task as the task store reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    /// None means unscheduled (inbox)
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default = "default_time_block")]
    pub time_block: TimeBlock,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default, alias = "depends_on")]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub rollover_count: u32,
    /// How demanding the task is, when the planner knows
    #[serde(default)]
    pub energy_level: Option<EnergyLevel>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Pending, medium priority, unscheduled task
    pub fn new(id: impl Into<String>, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            date: None,
            time_block: TimeBlock::Anytime,
            project_id: None,
            dependencies: Vec::new(),
            rollover_count: 0,
            energy_level: None,
            created_at,
        }
    }

    pub fn is_scheduled_on(&self, day: NaiveDate) -> bool {
        self.date == Some(day)
    }
}
