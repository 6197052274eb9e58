// Turns a user's recent completions into stored insights
//
// Pull the trailing window, run every extractor, drop the weak results, upsert
// the rest. A save that fails only loses that one insight. An insight that
// doesn't show up this time is left alone and decays through expires_at.

use crate::config::AnalysisConfig;
use crate::db::{Database, EventType, InsightUpsert};
use crate::error::Result;
use crate::intelligence::extractors::{self, Extraction, WindowedEvents};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// What one analysis run did
#[derive(Debug, Clone, Default)]
pub struct DetectionOutcome {
    /// Everything the extractors produced, accepted or not
    pub extractions: Vec<Extraction>,
    pub saved: usize,
    /// Below the confidence threshold
    pub rejected: usize,
    /// Store refused the write (or a newer write won)
    pub failed: usize,
    pub events_analyzed: usize,
}

#[derive(Clone)]
pub struct PatternDetector {
    db: Arc<Database>,
    config: AnalysisConfig,
}

impl PatternDetector {
    pub fn new(db: Arc<Database>, config: AnalysisConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    // Main function - learns whatever it can from the window and saves it
    pub async fn detect_patterns(&self, user_id: &str, now: DateTime<Utc>) -> Result<DetectionOutcome> {
        self.config.validate()?;
        let window = self.load_window(user_id, now).await?;

        let mut outcome = DetectionOutcome {
            events_analyzed: window.len(),
            ..DetectionOutcome::default()
        };

        let expires_at = now + Duration::days(self.config.insight_ttl_days);

        for extraction in extractors::extract_all(&window, &self.config) {
            let insight_type = extraction.pattern.insight_type();

            if extraction.confidence < self.config.confidence_threshold {
                tracing::debug!(
                    user_id,
                    %insight_type,
                    confidence = extraction.confidence,
                    "below confidence threshold"
                );
                outcome.rejected += 1;
                outcome.extractions.push(extraction);
                continue;
            }

            let upsert = InsightUpsert {
                user_id: user_id.to_string(),
                pattern: extraction.pattern.clone(),
                confidence: extraction.confidence,
                sample_size: extraction.sample_size,
                last_updated: now,
                expires_at,
            };

            match self.db.upsert_insight(&upsert).await {
                Ok(true) => outcome.saved += 1,
                Ok(false) => {
                    tracing::debug!(user_id, %insight_type, "newer insight already stored");
                    outcome.failed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        user_id,
                        %insight_type,
                        category = upsert.pattern.category(),
                        error = %e,
                        "failed to save insight"
                    );
                    outcome.failed += 1;
                }
            }

            outcome.extractions.push(extraction);
        }

        tracing::info!(
            user_id,
            events = outcome.events_analyzed,
            saved = outcome.saved,
            rejected = outcome.rejected,
            failed = outcome.failed,
            "pattern analysis finished"
        );

        Ok(outcome)
    }

    /// Completions inside the trailing window
    async fn load_window(&self, user_id: &str, now: DateTime<Utc>) -> Result<WindowedEvents> {
        let since = now - Duration::days(self.config.window_days);
        let events = self
            .db
            .raw_events(user_id, &[EventType::Completed], since, self.config.max_events)
            .await?;

        Ok(WindowedEvents::new(events))
    }
}
