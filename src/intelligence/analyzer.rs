/// Main analyzer orchestrator
///
/// The one entry point callers use. Coordinates pattern detection and
/// suggestion generation, and checks user ids before anything runs.

use crate::config::Config;
use crate::core::{validate_user_id, Task};
use crate::db::{Database, Suggestion, SuggestionQuery, SuggestionStatus, UserInsight};
use crate::error::Result;
use crate::intelligence::{Context, ContextDetector, DetectionOutcome, PatternDetector, SuggestionEngine};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Main analyzer
#[derive(Clone)]
pub struct Analyzer {
    db: Arc<Database>,
    pattern_detector: PatternDetector,
    suggestion_engine: SuggestionEngine,
}

impl Analyzer {
    /// Create a new analyzer
    pub fn new(db: Arc<Database>, config: &Config) -> Self {
        let pattern_detector = PatternDetector::new(Arc::clone(&db), config.analysis.clone());
        let suggestion_engine = SuggestionEngine::new(Arc::clone(&db), config.suggestions.clone());

        Self {
            db,
            pattern_detector,
            suggestion_engine,
        }
    }

    /// Re-analyze a user and return their active insights
    pub async fn analyze_patterns(&self, user_id: &str) -> Result<Vec<UserInsight>> {
        self.analyze_patterns_at(user_id, Utc::now()).await
    }

    pub async fn analyze_patterns_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<UserInsight>> {
        Ok(self.run_analysis(user_id, now).await?.insights)
    }

    /// Full analysis with the detector's bookkeeping attached
    pub async fn run_analysis(&self, user_id: &str, now: DateTime<Utc>) -> Result<AnalysisReport> {
        validate_user_id(user_id)?;

        let outcome = self.pattern_detector.detect_patterns(user_id, now).await?;
        let insights = self.db.get_active_insights(user_id, now).await?;

        Ok(AnalysisReport {
            user_id: user_id.to_string(),
            outcome,
            insights,
        })
    }

    /// Current active, unexpired insights
    pub async fn get_insights(&self, user_id: &str) -> Result<Vec<UserInsight>> {
        self.get_insights_at(user_id, Utc::now()).await
    }

    pub async fn get_insights_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<UserInsight>> {
        validate_user_id(user_id)?;
        self.db.get_active_insights(user_id, now).await
    }

    /// Generate suggestions for a task snapshot using the local clock
    pub async fn generate_suggestions(&self, user_id: &str, tasks: &[Task]) -> Result<Vec<Suggestion>> {
        self.generate_suggestions_with(user_id, tasks, &ContextDetector::detect()).await
    }

    pub async fn generate_suggestions_with(
        &self,
        user_id: &str,
        tasks: &[Task],
        context: &Context,
    ) -> Result<Vec<Suggestion>> {
        validate_user_id(user_id)?;
        self.suggestion_engine.generate_suggestions(user_id, tasks, context).await
    }

    /// Read suggestions, optionally by status. Expired pending ones are left out.
    pub async fn get_suggestions(&self, user_id: &str, status: Option<SuggestionStatus>) -> Result<Vec<Suggestion>> {
        let query = SuggestionQuery {
            status,
            include_expired: false,
        };
        self.get_suggestions_at(user_id, query, Utc::now()).await
    }

    pub async fn get_suggestions_at(
        &self,
        user_id: &str,
        query: SuggestionQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<Suggestion>> {
        validate_user_id(user_id)?;
        self.suggestion_engine.get_suggestions(user_id, query, now).await
    }

    pub async fn respond_to_suggestion(&self, suggestion_id: i64, accepted: bool) -> Result<()> {
        self.respond_to_suggestion_at(suggestion_id, accepted, Utc::now()).await
    }

    pub async fn respond_to_suggestion_at(
        &self,
        suggestion_id: i64,
        accepted: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.suggestion_engine.respond(suggestion_id, accepted, now).await
    }

    /// Analyze every user in the event log at once
    ///
    /// Users only ever write their own rows, so the runs don't coordinate.
    /// One user failing is logged and left out of the result.
    pub async fn analyze_all(&self, now: DateTime<Utc>) -> Result<Vec<(String, DetectionOutcome)>> {
        let users = self.db.list_event_users().await?;
        let mut set = JoinSet::new();

        for user_id in users {
            if let Err(e) = validate_user_id(&user_id) {
                tracing::warn!(user_id = %user_id, error = %e, "skipping user with malformed id");
                continue;
            }

            let detector = self.pattern_detector.clone();
            set.spawn(async move {
                let result = detector.detect_patterns(&user_id, now).await;
                (user_id, result)
            });
        }

        let mut finished = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((user_id, Ok(outcome))) => finished.push((user_id, outcome)),
                Ok((user_id, Err(e))) => {
                    tracing::warn!(user_id = %user_id, error = %e, "analysis failed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "analysis task panicked");
                }
            }
        }

        finished.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(finished)
    }
}

/// Analysis report
#[derive(Debug)]
pub struct AnalysisReport {
    pub user_id: String,
    pub outcome: DetectionOutcome,
    /// Active insights after the run, including ones this run didn't touch
    pub insights: Vec<UserInsight>,
}
