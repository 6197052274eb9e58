// Metric extractors
//
// Each one looks at the completions in the analysis window and either finds a
// pattern or stays quiet. They're pure: same events in, same answer out.
// Events missing the field an extractor needs are skipped, never an error.

use crate::config::AnalysisConfig;
use crate::db::{BlockCounts, EventType, Pattern, TaskEvent};
use crate::intelligence::scorer::{Scorer, CONFIDENCE_CAP};
use chrono::{Local, NaiveDate, TimeZone};
use std::collections::BTreeMap;

// An hour is "peak" when it beats the hourly average by this factor
const PEAK_HOUR_FACTOR: f64 = 1.5;

// Estimation confidence tops out (at the cap) around this many samples
const ESTIMATION_FULL_SAMPLE: u32 = 20;

/// Completion events for one user inside the trailing window
#[derive(Debug, Clone, Default)]
pub struct WindowedEvents {
    events: Vec<TaskEvent>,
}

impl WindowedEvents {
    /// Keeps only completions; anything else handed in is dropped.
    pub fn new(events: Vec<TaskEvent>) -> Self {
        Self {
            events: events
                .into_iter()
                .filter(|e| e.event_type == EventType::Completed)
                .collect(),
        }
    }

    pub fn events(&self) -> &[TaskEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// A candidate insight: what was found and how much backs it
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub pattern: Pattern,
    pub confidence: f64,
    pub sample_size: u32,
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn block_counts<'a>(events: impl Iterator<Item = &'a TaskEvent>) -> BlockCounts {
    let mut counts = BlockCounts::default();
    for block in events.filter_map(|e| e.time_block) {
        counts.add(block);
    }
    counts
}

/// Which time block most completions land in
///
/// `anytime` and untagged completions don't count toward anything.
pub fn time_block_preference(window: &WindowedEvents, config: &AnalysisConfig) -> Option<Extraction> {
    let counts = block_counts(window.events().iter());
    let total = counts.total();
    if total < config.min_sample_size {
        return None;
    }

    let (preferred, top) = counts.busiest()?;

    Some(Extraction {
        pattern: Pattern::TimePreference {
            preferred_time_block: preferred,
            block_counts: counts,
        },
        confidence: Scorer::share_of_total(top, total),
        sample_size: total,
    })
}

/// Hours of the day with well above average completions
pub fn peak_productivity_hours(window: &WindowedEvents, config: &AnalysisConfig) -> Option<Extraction> {
    let mut hours = [0u32; 24];
    for event in window.events() {
        if let Some(slot) = hours.get_mut(event.hour_of_day as usize) {
            *slot += 1;
        }
    }

    let total: u32 = hours.iter().sum();
    if total < config.min_sample_size {
        return None;
    }

    let average_per_hour = total as f64 / 24.0;
    let threshold = average_per_hour * PEAK_HOUR_FACTOR;

    let peak_hours: Vec<u8> = (0u8..24)
        .filter(|h| hours[*h as usize] as f64 > threshold)
        .collect();
    if peak_hours.is_empty() {
        return None;
    }

    let peak_total: u32 = peak_hours.iter().map(|h| hours[*h as usize]).sum();

    Some(Extraction {
        confidence: Scorer::share_of_total(peak_total, total),
        pattern: Pattern::ProductivityWindow {
            peak_hours,
            average_per_hour,
        },
        sample_size: total,
    })
}

/// Preferred time block per project, one extraction per qualifying project
pub fn project_timing(window: &WindowedEvents, config: &AnalysisConfig) -> Vec<Extraction> {
    let mut per_project: BTreeMap<&str, Vec<&TaskEvent>> = BTreeMap::new();
    for event in window.events() {
        if let Some(project) = event.project_id.as_deref() {
            per_project.entry(project).or_default().push(event);
        }
    }

    per_project
        .into_iter()
        .filter_map(|(project, events)| {
            let counts = block_counts(events.into_iter());
            let total = counts.total();
            if total < config.min_sample_size {
                return None;
            }

            let (preferred, top) = counts.busiest()?;

            Some(Extraction {
                pattern: Pattern::ProjectTiming {
                    project_id: project.to_string(),
                    preferred_time_block: preferred,
                    block_counts: counts,
                },
                confidence: Scorer::share_of_total(top, total),
                sample_size: total,
            })
        })
        .collect()
}

/// How long tasks take compared to their estimates
///
/// Only completions carrying both an estimate and an actual count.
pub fn estimation_accuracy(window: &WindowedEvents, config: &AnalysisConfig) -> Option<Extraction> {
    let (mut estimated, mut actual, mut samples) = (0u64, 0u64, 0usize);

    for event in window.events() {
        match (event.metadata.estimated_minutes, event.metadata.actual_minutes) {
            // A zero estimate says nothing about accuracy
            (Some(e), Some(a)) if e > 0 => {
                estimated += u64::from(e);
                actual += u64::from(a);
                samples += 1;
            }
            _ => {}
        }
    }

    let sample_size = count(samples);
    if sample_size < config.min_sample_size {
        return None;
    }

    Some(Extraction {
        pattern: Pattern::EstimationAccuracy {
            estimation_accuracy: actual as f64 / estimated as f64,
            total_estimated_minutes: estimated,
            total_actual_minutes: actual,
        },
        confidence: Scorer::sample_capped(sample_size, ESTIMATION_FULL_SAMPLE, CONFIDENCE_CAP),
        sample_size,
    })
}

/// Completions per active day, trusted less when days vary a lot
///
/// Days are the user's local calendar days, same as event hours.
pub fn completion_velocity(window: &WindowedEvents, config: &AnalysisConfig) -> Option<Extraction> {
    completion_velocity_in(window, config, &Local)
}

/// [`completion_velocity`] with days cut in an explicit timezone
pub fn completion_velocity_in<Tz: TimeZone>(
    window: &WindowedEvents,
    config: &AnalysisConfig,
    tz: &Tz,
) -> Option<Extraction> {
    let sample_size = count(window.len());
    if sample_size < config.min_sample_size {
        return None;
    }

    let mut per_day: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for event in window.events() {
        *per_day.entry(event.created_at.with_timezone(tz).date_naive()).or_insert(0) += 1;
    }

    let daily: Vec<f64> = per_day.values().map(|n| *n as f64).collect();
    let (mean, variance) = Scorer::mean_and_variance(&daily);

    Some(Extraction {
        pattern: Pattern::CompletionVelocity {
            tasks_per_day: mean,
            active_days: count(per_day.len()),
        },
        confidence: Scorer::variance_damped(mean, variance, CONFIDENCE_CAP),
        sample_size,
    })
}

/// Run every extractor over the same window
pub fn extract_all(window: &WindowedEvents, config: &AnalysisConfig) -> Vec<Extraction> {
    let mut found = Vec::new();

    found.extend(time_block_preference(window, config));
    found.extend(peak_productivity_hours(window, config));
    found.extend(project_timing(window, config));
    found.extend(estimation_accuracy(window, config));
    found.extend(completion_velocity(window, config));

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{EventMetadata, TimeBlock};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap()
    }

    fn event(id: i64, block: Option<TimeBlock>, hour: u8, at: DateTime<Utc>) -> TaskEvent {
        TaskEvent {
            id,
            user_id: "alice".to_string(),
            task_id: Some(format!("t{}", id)),
            event_type: EventType::Completed,
            hour_of_day: hour,
            day_of_week: 0,
            time_block: block,
            project_id: None,
            priority: None,
            energy_level: None,
            previous_value: None,
            new_value: None,
            metadata: EventMetadata::default(),
            created_at: at,
        }
    }

    fn window(events: Vec<TaskEvent>) -> WindowedEvents {
        WindowedEvents::new(events)
    }

    #[test]
    fn test_window_keeps_only_completions() {
        let mut started = event(1, None, 9, base());
        started.event_type = EventType::Started;

        let w = window(vec![started, event(2, None, 9, base())]);
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn test_time_block_preference_scenario() {
        // 7 morning, 3 afternoon
        let events = (0..10)
            .map(|i| {
                let block = if i < 7 { TimeBlock::Morning } else { TimeBlock::Afternoon };
                event(i, Some(block), 9, base())
            })
            .collect();

        let found = time_block_preference(&window(events), &AnalysisConfig::default()).unwrap();
        assert_eq!(found.confidence, 0.7);
        assert_eq!(found.sample_size, 10);
        match found.pattern {
            Pattern::TimePreference { preferred_time_block, block_counts } => {
                assert_eq!(preferred_time_block, TimeBlock::Morning);
                assert_eq!(block_counts.afternoon, 3);
            }
            other => panic!("unexpected pattern {:?}", other),
        }
    }

    #[test]
    fn test_time_block_ignores_anytime_and_untagged() {
        let mut events: Vec<TaskEvent> =
            (0..4).map(|i| event(i, Some(TimeBlock::Evening), 20, base())).collect();
        events.extend((4..10).map(|i| event(i, Some(TimeBlock::Anytime), 20, base())));
        events.extend((10..15).map(|i| event(i, None, 20, base())));

        // Only 4 countable completions, below the minimum of 5
        assert!(time_block_preference(&window(events), &AnalysisConfig::default()).is_none());
    }

    #[test]
    fn test_min_sample_size_is_configurable() {
        let events = (0..3).map(|i| event(i, Some(TimeBlock::Morning), 9, base())).collect();
        let config = AnalysisConfig { min_sample_size: 3, ..AnalysisConfig::default() };

        let found = time_block_preference(&window(events), &config).unwrap();
        assert_eq!(found.confidence, 1.0);
    }

    #[test]
    fn test_peak_productivity_hours() {
        // 24 completions: 8 at 9h, 6 at 14h, the rest spread one per hour
        let mut events: Vec<TaskEvent> = (0..8).map(|i| event(i, None, 9, base())).collect();
        events.extend((8..14).map(|i| event(i, None, 14, base())));
        let spread = [0u8, 1, 2, 3, 4, 5, 6, 7, 8, 10];
        events.extend(spread.iter().zip(14..).map(|(h, i)| event(i, None, *h, base())));

        let found = peak_productivity_hours(&window(events), &AnalysisConfig::default()).unwrap();
        // average is 1.0/hour, so anything above 1.5 is a peak
        match &found.pattern {
            Pattern::ProductivityWindow { peak_hours, average_per_hour } => {
                assert_eq!(peak_hours, &vec![9, 14]);
                assert_eq!(*average_per_hour, 1.0);
            }
            other => panic!("unexpected pattern {:?}", other),
        }
        assert_eq!(found.confidence, 14.0 / 24.0);
        assert_eq!(found.sample_size, 24);
    }

    #[test]
    fn test_peak_hours_needs_a_peak() {
        // Perfectly flat day: nobody beats 1.5x the average
        let events = (0..24).map(|i| event(i, None, i as u8, base())).collect();
        assert!(peak_productivity_hours(&window(events), &AnalysisConfig::default()).is_none());
    }

    #[test]
    fn test_project_timing_per_project() {
        let mut events = Vec::new();
        for i in 0..6 {
            let mut e = event(i, Some(TimeBlock::Evening), 20, base());
            e.project_id = Some("learning".to_string());
            events.push(e);
        }
        for i in 6..9 {
            let mut e = event(i, Some(TimeBlock::Morning), 9, base());
            e.project_id = Some("work".to_string());
            events.push(e);
        }

        let found = project_timing(&window(events), &AnalysisConfig::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pattern.category(), "learning");
        assert_eq!(found[0].confidence, 1.0);
        assert_eq!(found[0].sample_size, 6);
    }

    #[test]
    fn test_estimation_accuracy_scenario() {
        // 15 samples, 600 estimated, 780 actual
        let events = (0..15)
            .map(|i| {
                let mut e = event(i, None, 10, base());
                e.metadata.estimated_minutes = Some(40);
                e.metadata.actual_minutes = Some(52);
                e
            })
            .collect();

        let found = estimation_accuracy(&window(events), &AnalysisConfig::default()).unwrap();
        assert_eq!(found.sample_size, 15);
        assert_eq!(found.confidence, 0.75);
        match found.pattern {
            Pattern::EstimationAccuracy { estimation_accuracy, total_estimated_minutes, total_actual_minutes } => {
                assert_eq!(total_estimated_minutes, 600);
                assert_eq!(total_actual_minutes, 780);
                assert!((estimation_accuracy - 1.3).abs() < 1e-9);
            }
            other => panic!("unexpected pattern {:?}", other),
        }
    }

    #[test]
    fn test_estimation_skips_partial_metadata() {
        let mut events: Vec<TaskEvent> = (0..10)
            .map(|i| {
                let mut e = event(i, None, 10, base());
                e.metadata.estimated_minutes = Some(30);
                e
            })
            .collect();
        for e in events.iter_mut().take(4) {
            e.metadata.actual_minutes = Some(30);
        }

        // Only 4 events have both fields
        assert!(estimation_accuracy(&window(events), &AnalysisConfig::default()).is_none());
    }

    #[test]
    fn test_estimation_confidence_is_capped() {
        let events = (0..50)
            .map(|i| {
                let mut e = event(i, None, 10, base());
                e.metadata.estimated_minutes = Some(30);
                e.metadata.actual_minutes = Some(30);
                e
            })
            .collect();

        let found = estimation_accuracy(&window(events), &AnalysisConfig::default()).unwrap();
        assert_eq!(found.confidence, CONFIDENCE_CAP);
    }

    #[test]
    fn test_completion_velocity_steady() {
        // 3 per day for 4 days
        let events = (0..12)
            .map(|i| event(i, None, 10, base() + Duration::days(i / 3)))
            .collect();

        let found = completion_velocity(&window(events), &AnalysisConfig::default()).unwrap();
        assert_eq!(found.confidence, CONFIDENCE_CAP);
        assert_eq!(
            found.pattern,
            Pattern::CompletionVelocity { tasks_per_day: 3.0, active_days: 4 }
        );
    }

    #[test]
    fn test_completion_velocity_bursty() {
        // 1 and 5 per day: mean 3, variance 4
        let mut events: Vec<TaskEvent> = vec![event(0, None, 10, base())];
        events.extend((1..6).map(|i| event(i, None, 10, base() + Duration::days(1))));

        let found = completion_velocity(&window(events), &AnalysisConfig::default()).unwrap();
        assert!((found.confidence - 1.0 / (1.0 + 4.0 / 3.0)).abs() < 1e-12);
        assert_eq!(found.sample_size, 6);
    }

    #[test]
    fn test_completion_velocity_uses_local_days() {
        // Evening work in UTC-5 crosses midnight UTC but stays one local day
        let tz = chrono::FixedOffset::west_opt(5 * 3600).unwrap();
        let day = tz.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap().with_timezone(&Utc);
        let events: Vec<TaskEvent> = [0, 4, 8, 11, 14]
            .iter()
            .enumerate()
            .map(|(i, offset)| event(i as i64, None, 9, day + Duration::hours(*offset)))
            .collect();

        let found = completion_velocity_in(&window(events.clone()), &AnalysisConfig::default(), &tz).unwrap();
        assert_eq!(
            found.pattern,
            Pattern::CompletionVelocity { tasks_per_day: 5.0, active_days: 1 }
        );

        let in_utc = completion_velocity_in(&window(events), &AnalysisConfig::default(), &Utc).unwrap();
        assert_eq!(
            in_utc.pattern,
            Pattern::CompletionVelocity { tasks_per_day: 2.5, active_days: 2 }
        );
    }

    #[test]
    fn test_every_extractor_respects_min_sample() {
        let events: Vec<TaskEvent> = (0..4)
            .map(|i| {
                let mut e = event(i, Some(TimeBlock::Morning), 9, base());
                e.project_id = Some("work".to_string());
                e.metadata.estimated_minutes = Some(30);
                e.metadata.actual_minutes = Some(45);
                e
            })
            .collect();

        assert!(extract_all(&window(events), &AnalysisConfig::default()).is_empty());
    }
}
