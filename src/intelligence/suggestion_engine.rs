/// Suggestion engine
///
/// Runs the generators a user's preferences allow, stores what they produce
/// and handles accept/dismiss responses.

use crate::config::SuggestionConfig;
use crate::core::Task;
use crate::db::{
    Database, NewSuggestion, Suggestion, SuggestionFrequency, SuggestionQuery, SuggestionStatus,
    SuggestionType, UserInsight, UserPreferences,
};
use crate::error::{InsightError, Result};
use crate::intelligence::generators::{self, GenerationInput};
use crate::intelligence::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// One suggestion producer the engine can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generator {
    DependencyReady,
    TimeBlockMismatch,
    OverloadWarning,
    StaleTasks,
    EnergySchedule,
    DailyFocus,
}

impl Generator {
    pub fn suggestion_type(self) -> SuggestionType {
        match self {
            Generator::DependencyReady => SuggestionType::DependencyReady,
            Generator::TimeBlockMismatch | Generator::EnergySchedule => SuggestionType::TimeBlock,
            Generator::OverloadWarning => SuggestionType::OverloadWarning,
            Generator::StaleTasks => SuggestionType::StaleTask,
            Generator::DailyFocus => SuggestionType::FocusRecommendation,
        }
    }

    fn run(self, input: &GenerationInput) -> Vec<NewSuggestion> {
        match self {
            Generator::DependencyReady => generators::dependency_ready(input),
            Generator::TimeBlockMismatch => generators::time_block_mismatch(input),
            Generator::OverloadWarning => generators::overload_warning(input).into_iter().collect(),
            Generator::StaleTasks => generators::stale_tasks(input),
            Generator::EnergySchedule => generators::energy_schedule(input),
            Generator::DailyFocus => generators::daily_focus(input).into_iter().collect(),
        }
    }
}

/// Which generators a frequency setting turns on, in run order
///
/// Insight-backed moves run before energy-based ones so they win the
/// shared time_block dedup slot.
pub fn enabled_generators(frequency: SuggestionFrequency) -> &'static [Generator] {
    match frequency {
        SuggestionFrequency::Minimal => &[Generator::DependencyReady],
        SuggestionFrequency::Balanced => &[
            Generator::DependencyReady,
            Generator::TimeBlockMismatch,
            Generator::OverloadWarning,
        ],
        SuggestionFrequency::Proactive => &[
            Generator::DependencyReady,
            Generator::TimeBlockMismatch,
            Generator::OverloadWarning,
            Generator::StaleTasks,
            Generator::EnergySchedule,
            Generator::DailyFocus,
        ],
    }
}

/// Suggestion engine
#[derive(Clone)]
pub struct SuggestionEngine {
    db: Arc<Database>,
    config: SuggestionConfig,
}

impl SuggestionEngine {
    /// Create a new suggestion engine
    pub fn new(db: Arc<Database>, config: SuggestionConfig) -> Self {
        Self { db, config }
    }

    /// Run the allowed generators against a snapshot without storing anything
    pub fn candidates(
        &self,
        user_id: &str,
        context: &Context,
        tasks: &[Task],
        prefs: UserPreferences,
        insights: &[UserInsight],
    ) -> Vec<NewSuggestion> {
        if !prefs.smart_suggestions_enabled {
            return Vec::new();
        }

        let input = GenerationInput {
            user_id,
            context,
            tasks,
            insights,
            config: &self.config,
        };

        enabled_generators(prefs.suggestion_frequency)
            .iter()
            .flat_map(|generator| generator.run(&input))
            .collect()
    }

    /// Generate and store suggestions for a task snapshot
    ///
    /// Candidates that already have an open twin are skipped. A failed save
    /// is logged and skipped; the rest still go through.
    ///
    /// # Returns
    /// * `Ok(Vec<Suggestion>)` - Suggestions stored by this run
    pub async fn generate_suggestions(
        &self,
        user_id: &str,
        tasks: &[Task],
        context: &Context,
    ) -> Result<Vec<Suggestion>> {
        self.config.validate()?;
        let prefs = self.db.get_preferences(user_id).await?;
        if !prefs.smart_suggestions_enabled {
            tracing::debug!(user_id, "smart suggestions disabled");
            return Ok(Vec::new());
        }

        let insights = self.db.get_active_insights(user_id, context.now).await?;
        let candidates = self.candidates(user_id, context, tasks, prefs, &insights);

        let mut stored = Vec::new();
        let mut duplicates = 0usize;

        for candidate in &candidates {
            match self.db.store_suggestion_if_absent(candidate, context.now).await {
                Ok(Some(suggestion)) => stored.push(suggestion),
                Ok(None) => duplicates += 1,
                Err(e) => {
                    tracing::warn!(
                        user_id,
                        suggestion_type = %candidate.suggestion_type,
                        task_id = candidate.task_id.as_deref().unwrap_or("-"),
                        error = %e,
                        "failed to store suggestion"
                    );
                }
            }
        }

        tracing::info!(
            user_id,
            frequency = %prefs.suggestion_frequency,
            candidates = candidates.len(),
            stored = stored.len(),
            duplicates,
            "suggestions generated"
        );

        Ok(stored)
    }

    /// Get existing suggestions from database
    pub async fn get_suggestions(
        &self,
        user_id: &str,
        query: SuggestionQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<Suggestion>> {
        self.db.get_suggestions(user_id, query, now).await
    }

    /// Accept or dismiss a suggestion
    ///
    /// Responding to something already answered or expired changes nothing
    /// and still succeeds. Only an unknown id is an error.
    pub async fn respond(&self, suggestion_id: i64, accepted: bool, now: DateTime<Utc>) -> Result<()> {
        let status = SuggestionStatus::from_response(accepted);

        if self.db.respond_to_suggestion(suggestion_id, status, now).await? {
            tracing::info!(suggestion_id, %status, "suggestion answered");
            return Ok(());
        }

        match self.db.get_suggestion_by_id(suggestion_id).await? {
            Some(existing) => {
                tracing::debug!(
                    suggestion_id,
                    current = %existing.status,
                    expired = existing.is_expired(now),
                    "response ignored"
                );
                Ok(())
            }
            None => Err(InsightError::SuggestionNotFound(suggestion_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskStatus;
    use crate::db::{
        BlockCounts, EnergyLevel, InsightUpsert, Pattern, SuggestionAction, SuggestionSource, TimeBlock,
    };
    use crate::intelligence::ContextDetector;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap()
    }

    fn task(id: &str, block: TimeBlock) -> Task {
        let mut t = Task::new(id, format!("Task {}", id), now() - Duration::hours(1));
        t.date = Some(now().date_naive());
        t.time_block = block;
        t
    }

    /// a, b done; t waits on both; six evening tasks; one task rolled over a lot
    fn snapshot() -> Vec<Task> {
        let mut a = task("a", TimeBlock::Morning);
        a.status = TaskStatus::Completed;
        let mut b = task("b", TimeBlock::Morning);
        b.status = TaskStatus::Completed;
        let mut t = task("t", TimeBlock::Morning);
        t.dependencies = vec!["a".to_string(), "b".to_string()];

        let mut tasks = vec![a, b, t];
        tasks.extend((0..6).map(|i| task(&format!("e{}", i), TimeBlock::Evening)));

        let mut stuck = task("stuck", TimeBlock::Afternoon);
        stuck.rollover_count = 4;
        tasks.push(stuck);
        tasks
    }

    async fn set_frequency(db: &Database, user_id: &str, frequency: SuggestionFrequency) {
        db.set_preferences(
            user_id,
            UserPreferences { smart_suggestions_enabled: true, suggestion_frequency: frequency },
        )
        .await
        .unwrap();
    }

    async fn setup() -> (SuggestionEngine, Arc<Database>) {
        let db = Arc::new(Database::new_test().await.unwrap());
        (SuggestionEngine::new(Arc::clone(&db), SuggestionConfig::default()), db)
    }

    fn types(suggestions: &[Suggestion]) -> Vec<SuggestionType> {
        let mut found: Vec<_> = suggestions.iter().map(|s| s.suggestion_type).collect();
        found.sort_by_key(|t| t.as_str());
        found
    }

    #[tokio::test]
    async fn test_balanced_by_default() {
        let (engine, _db) = setup().await;
        let ctx = ContextDetector::at(now());

        let stored = engine.generate_suggestions("alice", &snapshot(), &ctx).await.unwrap();
        assert_eq!(
            types(&stored),
            vec![SuggestionType::DependencyReady, SuggestionType::OverloadWarning]
        );
    }

    #[tokio::test]
    async fn test_frequency_gating() {
        let (engine, db) = setup().await;
        let ctx = ContextDetector::at(now());

        db.set_preferences(
            "alice",
            UserPreferences { smart_suggestions_enabled: true, suggestion_frequency: SuggestionFrequency::Minimal },
        )
        .await
        .unwrap();
        let stored = engine.generate_suggestions("alice", &snapshot(), &ctx).await.unwrap();
        assert_eq!(types(&stored), vec![SuggestionType::DependencyReady]);

        db.set_preferences(
            "bob",
            UserPreferences { smart_suggestions_enabled: true, suggestion_frequency: SuggestionFrequency::Proactive },
        )
        .await
        .unwrap();
        let stored = engine.generate_suggestions("bob", &snapshot(), &ctx).await.unwrap();
        let found = types(&stored);
        assert!(found.contains(&SuggestionType::StaleTask));
        assert!(found.contains(&SuggestionType::FocusRecommendation));
    }

    #[tokio::test]
    async fn test_disabled_user_gets_nothing() {
        let (engine, db) = setup().await;
        db.set_preferences(
            "alice",
            UserPreferences { smart_suggestions_enabled: false, suggestion_frequency: SuggestionFrequency::Proactive },
        )
        .await
        .unwrap();

        let stored = engine
            .generate_suggestions("alice", &snapshot(), &ContextDetector::at(now()))
            .await
            .unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_no_duplicate_while_open() {
        let (engine, db) = setup().await;
        let ctx = ContextDetector::at(now());

        let first = engine.generate_suggestions("alice", &snapshot(), &ctx).await.unwrap();
        assert_eq!(first.len(), 2);

        let later = ContextDetector::at(now() + Duration::hours(1));
        let second = engine.generate_suggestions("alice", &snapshot(), &later).await.unwrap();
        assert!(second.is_empty());

        let all = db
            .get_suggestions("alice", SuggestionQuery { include_expired: true, ..Default::default() }, later.now)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        // Once the first batch expires a fresh one is allowed. The evening
        // tasks were dated yesterday by then, so only the dependency one returns.
        let next_day = ContextDetector::at(now() + Duration::hours(25));
        let third = engine.generate_suggestions("alice", &snapshot(), &next_day).await.unwrap();
        assert_eq!(types(&third), vec![SuggestionType::DependencyReady]);
    }

    #[tokio::test]
    async fn test_dismissed_suggestion_can_come_back() {
        let (engine, _db) = setup().await;
        let ctx = ContextDetector::at(now());

        let first = engine.generate_suggestions("alice", &snapshot(), &ctx).await.unwrap();
        let ready = first
            .iter()
            .find(|s| s.suggestion_type == SuggestionType::DependencyReady)
            .unwrap();
        assert_eq!(ready.action, SuggestionAction::Focus { task_ids: vec!["t".to_string()] });

        engine.respond(ready.id, false, now()).await.unwrap();

        let again = engine.generate_suggestions("alice", &snapshot(), &ctx).await.unwrap();
        assert_eq!(types(&again), vec![SuggestionType::DependencyReady]);
    }

    #[tokio::test]
    async fn test_respond_is_idempotent() {
        let (engine, db) = setup().await;
        let stored = engine
            .generate_suggestions("alice", &snapshot(), &ContextDetector::at(now()))
            .await
            .unwrap();
        let id = stored[0].id;

        let answered_at = now() + Duration::minutes(5);
        engine.respond(id, true, answered_at).await.unwrap();
        engine.respond(id, true, answered_at + Duration::minutes(5)).await.unwrap();
        engine.respond(id, false, answered_at + Duration::minutes(10)).await.unwrap();

        let s = db.get_suggestion_by_id(id).await.unwrap().unwrap();
        assert_eq!(s.status, SuggestionStatus::Accepted);
        assert_eq!(s.responded_at, Some(answered_at));
    }

    #[tokio::test]
    async fn test_respond_to_expired_is_noop() {
        let (engine, db) = setup().await;
        let stored = engine
            .generate_suggestions("alice", &snapshot(), &ContextDetector::at(now()))
            .await
            .unwrap();
        let id = stored[0].id;

        engine.respond(id, true, now() + Duration::days(2)).await.unwrap();

        let s = db.get_suggestion_by_id(id).await.unwrap().unwrap();
        assert_eq!(s.status, SuggestionStatus::Pending);
        assert_eq!(s.responded_at, None);
    }

    #[tokio::test]
    async fn test_respond_unknown_id() {
        let (engine, _db) = setup().await;
        let err = engine.respond(999, true, now()).await.unwrap_err();
        assert!(matches!(err, InsightError::SuggestionNotFound(999)));
    }

    #[test]
    fn test_frequency_levels_nest() {
        let minimal = enabled_generators(SuggestionFrequency::Minimal);
        let balanced = enabled_generators(SuggestionFrequency::Balanced);
        let proactive = enabled_generators(SuggestionFrequency::Proactive);

        assert!(minimal.iter().all(|g| balanced.contains(g)));
        assert!(balanced.iter().all(|g| proactive.contains(g)));
        assert!(!balanced.contains(&Generator::EnergySchedule));

        let mismatch = proactive.iter().position(|g| *g == Generator::TimeBlockMismatch);
        let energy = proactive.iter().position(|g| *g == Generator::EnergySchedule);
        assert!(mismatch < energy);

        let mut covered: Vec<_> = proactive.iter().map(|g| g.suggestion_type()).collect();
        covered.sort_by_key(|t| t.as_str());
        covered.dedup();
        assert_eq!(covered.len(), 5);
    }

    #[tokio::test]
    async fn test_energy_moves_are_proactive_only() {
        let (engine, db) = setup().await;
        let ctx = ContextDetector::at(now());

        let mut deep = task("deep", TimeBlock::Evening);
        deep.energy_level = Some(EnergyLevel::High);
        let tasks = vec![deep];

        let stored = engine.generate_suggestions("alice", &tasks, &ctx).await.unwrap();
        assert!(stored.is_empty());

        set_frequency(&db, "bob", SuggestionFrequency::Proactive).await;
        let stored = engine.generate_suggestions("bob", &tasks, &ctx).await.unwrap();
        let moves: Vec<_> = stored
            .iter()
            .filter(|s| s.suggestion_type == SuggestionType::TimeBlock)
            .collect();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].source, SuggestionSource::Ai);
        assert_eq!(moves[0].action, SuggestionAction::MoveTimeBlock { time_block: TimeBlock::Morning });

        // Open move for the same task blocks a repeat
        let again = engine.generate_suggestions("bob", &tasks, &ctx).await.unwrap();
        assert!(again.iter().all(|s| s.suggestion_type != SuggestionType::TimeBlock));
    }

    #[tokio::test]
    async fn test_insight_move_wins_over_energy_move() {
        let (engine, db) = setup().await;
        set_frequency(&db, "alice", SuggestionFrequency::Proactive).await;
        db.upsert_insight(&InsightUpsert {
            user_id: "alice".to_string(),
            pattern: Pattern::ProjectTiming {
                project_id: "learning".to_string(),
                preferred_time_block: TimeBlock::Afternoon,
                block_counts: BlockCounts::default(),
            },
            confidence: 0.8,
            sample_size: 10,
            last_updated: now(),
            expires_at: now() + Duration::days(30),
        })
        .await
        .unwrap();

        let mut study = task("study", TimeBlock::Evening);
        study.project_id = Some("learning".to_string());
        study.energy_level = Some(EnergyLevel::High);

        let stored = engine
            .generate_suggestions("alice", &[study], &ContextDetector::at(now()))
            .await
            .unwrap();
        let moves: Vec<_> = stored
            .iter()
            .filter(|s| s.suggestion_type == SuggestionType::TimeBlock)
            .collect();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].source, SuggestionSource::Pattern);
        assert_eq!(moves[0].action, SuggestionAction::MoveTimeBlock { time_block: TimeBlock::Afternoon });
    }

    #[tokio::test]
    async fn test_expiry_is_fixed_at_creation() {
        let (engine, db) = setup().await;
        let ctx = ContextDetector::at(now());

        let first = engine.generate_suggestions("alice", &snapshot(), &ctx).await.unwrap();
        assert!(!first.is_empty());

        // A deduplicated rerun leaves the open rows alone
        let later = ContextDetector::at(now() + Duration::hours(2));
        let second = engine.generate_suggestions("alice", &snapshot(), &later).await.unwrap();
        assert!(second.is_empty());

        engine.respond(first[0].id, true, later.now).await.unwrap();

        for original in &first {
            let current = db.get_suggestion_by_id(original.id).await.unwrap().unwrap();
            assert_eq!(current.expires_at, original.expires_at);
            assert_eq!(current.expires_at, now() + Duration::hours(24));
        }
    }
}
