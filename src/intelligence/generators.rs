// Suggestion generators
//
// Pure functions from (task snapshot, active insights, clock) to candidate
// suggestions. Nothing here touches the store; the engine decides which
// generators run and persists what they return.

use crate::config::SuggestionConfig;
use crate::core::{Task, TaskStatus};
use crate::db::{
    EnergyLevel, NewSuggestion, Pattern, Priority, SuggestionAction, SuggestionSource,
    SuggestionType, TimeBlock, UserInsight,
};
use crate::intelligence::Context;
use chrono::Duration;
use std::collections::{BTreeMap, HashMap};

const OVERLOAD_CONFIDENCE: f64 = 0.8;
const STALE_CONFIDENCE: f64 = 0.7;
const FOCUS_CONFIDENCE: f64 = 0.8;
const ENERGY_CONFIDENCE: f64 = 0.6;

/// Everything a generator is allowed to look at
pub struct GenerationInput<'a> {
    pub user_id: &'a str,
    pub context: &'a Context,
    pub tasks: &'a [Task],
    pub insights: &'a [UserInsight],
    pub config: &'a SuggestionConfig,
}

impl<'a> GenerationInput<'a> {
    fn todays_tasks(&self) -> impl Iterator<Item = &'a Task> + '_ {
        let today = self.context.today;
        self.tasks.iter().filter(move |t| t.is_scheduled_on(today))
    }

    #[allow(clippy::too_many_arguments)]
    fn suggestion(
        &self,
        task_id: Option<&str>,
        suggestion_type: SuggestionType,
        title: String,
        description: String,
        action: SuggestionAction,
        reasoning: String,
        confidence: f64,
        source: SuggestionSource,
    ) -> NewSuggestion {
        NewSuggestion {
            user_id: self.user_id.to_string(),
            task_id: task_id.map(str::to_string),
            suggestion_type,
            title,
            description,
            action,
            reasoning,
            confidence,
            source,
            expires_at: self.context.now + Duration::hours(self.config.default_ttl_hours),
        }
    }
}

/// Pending tasks today sitting in a block their project usually isn't done in
pub fn time_block_mismatch(input: &GenerationInput) -> Vec<NewSuggestion> {
    let mut preferred: HashMap<&str, (TimeBlock, f64)> = HashMap::new();
    for insight in input.insights {
        if let Pattern::ProjectTiming { project_id, preferred_time_block, .. } = &insight.pattern {
            if insight.confidence > input.config.mismatch_confidence {
                preferred.insert(project_id.as_str(), (*preferred_time_block, insight.confidence));
            }
        }
    }

    if preferred.is_empty() {
        return Vec::new();
    }

    input
        .todays_tasks()
        .filter(|t| t.status.is_pending() && t.time_block.is_concrete())
        .filter_map(|task| {
            let project = task.project_id.as_deref()?;
            let (block, confidence) = *preferred.get(project)?;
            if block == task.time_block {
                return None;
            }

            Some(input.suggestion(
                Some(&task.id),
                SuggestionType::TimeBlock,
                format!("Move \"{}\" to the {}", task.title, block),
                format!("\"{}\" is planned for the {}.", task.title, task.time_block),
                SuggestionAction::MoveTimeBlock { time_block: block },
                format!(
                    "You usually finish {} tasks in the {} ({:.0}% confidence)",
                    project,
                    block,
                    confidence * 100.0
                ),
                confidence,
                SuggestionSource::Pattern,
            ))
        })
        .collect()
}

/// One warning naming every block with too many open tasks today
pub fn overload_warning(input: &GenerationInput) -> Option<NewSuggestion> {
    let mut per_block: BTreeMap<TimeBlock, usize> = BTreeMap::new();
    for task in input.todays_tasks() {
        if task.status.is_open() && task.time_block.is_concrete() {
            *per_block.entry(task.time_block).or_insert(0) += 1;
        }
    }

    let overloaded: Vec<(TimeBlock, usize)> = per_block
        .into_iter()
        .filter(|(_, n)| *n > input.config.overload_threshold)
        .collect();

    if overloaded.is_empty() {
        return None;
    }

    let details: Vec<String> = overloaded
        .iter()
        .map(|(block, n)| format!("{} tasks in the {}", n, block))
        .collect();

    let title = match overloaded.as_slice() {
        [(block, _)] => format!("Your {} is overloaded", block),
        _ => "Several time blocks are overloaded".to_string(),
    };

    Some(input.suggestion(
        None,
        SuggestionType::OverloadWarning,
        title,
        format!("Today you have {}.", details.join(" and ")),
        SuggestionAction::Dismiss,
        format!(
            "More than {} open tasks in one block rarely all get done",
            input.config.overload_threshold
        ),
        OVERLOAD_CONFIDENCE,
        SuggestionSource::Rule,
    ))
}

/// Open tasks that have been around too long or keep rolling over
pub fn stale_tasks(input: &GenerationInput) -> Vec<NewSuggestion> {
    let cutoff = input.context.now - Duration::days(input.config.stale_after_days);

    input
        .tasks
        .iter()
        .filter(|t| t.status.is_open())
        .filter_map(|task| {
            let old = task.created_at < cutoff;
            let rolled = task.rollover_count >= input.config.stale_rollover_threshold;
            if !old && !rolled {
                return None;
            }

            let reasoning = if rolled {
                format!("Rolled over {} times", task.rollover_count)
            } else {
                format!(
                    "Open for {} days",
                    (input.context.now - task.created_at).num_days()
                )
            };

            Some(input.suggestion(
                Some(&task.id),
                SuggestionType::StaleTask,
                format!("Break down \"{}\"", task.title),
                "Smaller steps are easier to start.".to_string(),
                SuggestionAction::Breakdown,
                reasoning,
                STALE_CONFIDENCE,
                SuggestionSource::Rule,
            ))
        })
        .collect()
}

/// Pending tasks whose dependencies are all completed
///
/// A dependency missing from the snapshot counts as not done.
pub fn dependency_ready(input: &GenerationInput) -> Vec<NewSuggestion> {
    let by_id: HashMap<&str, &Task> = input.tasks.iter().map(|t| (t.id.as_str(), t)).collect();

    input
        .tasks
        .iter()
        .filter(|t| t.status.is_pending() && !t.dependencies.is_empty())
        .filter(|t| {
            t.dependencies.iter().all(|dep| {
                by_id
                    .get(dep.as_str())
                    .is_some_and(|d| d.status == TaskStatus::Completed)
            })
        })
        .map(|task| {
            input.suggestion(
                Some(&task.id),
                SuggestionType::DependencyReady,
                format!("\"{}\" is ready to start", task.title),
                format!("All {} of its dependencies are done.", task.dependencies.len()),
                SuggestionAction::Focus { task_ids: vec![task.id.clone()] },
                "Every task it was waiting on is completed".to_string(),
                1.0,
                SuggestionSource::Rule,
            )
        })
        .collect()
}

/// The block a task's energy or priority calls for
///
/// Demanding or important work goes to the morning, medium work to the
/// afternoon, light work to the evening. High energy and high/urgent priority
/// win over a lower energy label.
pub fn energy_block(task: &Task) -> Option<TimeBlock> {
    let important = matches!(task.priority, Priority::High | Priority::Urgent);
    match task.energy_level {
        Some(EnergyLevel::High) => Some(TimeBlock::Morning),
        _ if important => Some(TimeBlock::Morning),
        Some(EnergyLevel::Medium) => Some(TimeBlock::Afternoon),
        Some(EnergyLevel::Low) => Some(TimeBlock::Evening),
        None => None,
    }
}

/// Pending tasks today planned outside the block their energy calls for
///
/// Needs no insight. Shares the time_block type with the mismatch generator,
/// so an open move for the same task blocks this one.
pub fn energy_schedule(input: &GenerationInput) -> Vec<NewSuggestion> {
    input
        .todays_tasks()
        .filter(|t| t.status.is_pending())
        .filter_map(|task| {
            let block = energy_block(task)?;
            if block == task.time_block {
                return None;
            }

            let reasoning = match block {
                TimeBlock::Morning => "High-energy or important work fits peak morning focus",
                TimeBlock::Afternoon => "Medium-energy work fits the afternoon",
                _ => "Low-energy work suits the evening wind-down",
            };

            Some(input.suggestion(
                Some(&task.id),
                SuggestionType::TimeBlock,
                format!("Move \"{}\" to the {}", task.title, block),
                format!("\"{}\" is planned for {}.", task.title, describe_block(task.time_block)),
                SuggestionAction::MoveTimeBlock { time_block: block },
                reasoning.to_string(),
                ENERGY_CONFIDENCE,
                SuggestionSource::Ai,
            ))
        })
        .collect()
}

fn describe_block(block: TimeBlock) -> String {
    match block {
        TimeBlock::Anytime => "anytime".to_string(),
        other => format!("the {}", other),
    }
}

/// The single task to do next in the current block
pub fn daily_focus(input: &GenerationInput) -> Option<NewSuggestion> {
    let current = input.context.time_block;

    let mut candidates: Vec<&Task> = input
        .todays_tasks()
        .filter(|t| t.status.is_pending())
        .filter(|t| t.time_block == current || t.time_block == TimeBlock::Anytime)
        .collect();

    candidates.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });

    let (top, rest) = candidates.split_first()?;

    let mut description = format!("Start with \"{}\" ({} priority).", top.title, top.priority);
    let runners_up: Vec<String> = rest
        .iter()
        .take(input.config.max_runners_up)
        .map(|t| format!("\"{}\"", t.title))
        .collect();
    if !runners_up.is_empty() {
        description.push_str(&format!(" Then: {}.", runners_up.join(", ")));
    }

    let mut suggestion = input.suggestion(
        Some(&top.id),
        SuggestionType::FocusRecommendation,
        format!("Focus on \"{}\" this {}", top.title, current),
        description,
        SuggestionAction::Focus { task_ids: vec![top.id.clone()] },
        format!("Highest priority task planned for the {}", current),
        FOCUS_CONFIDENCE,
        SuggestionSource::Rule,
    );
    suggestion.expires_at = input.context.now + Duration::hours(input.config.focus_ttl_hours);

    Some(suggestion)
}
