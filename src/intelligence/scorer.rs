/// Confidence scoring heuristics
///
/// These are not statistical estimators. Downstream thresholds were tuned
/// against exactly these formulas, so keep them as they are.

/// Confidence never reaches certainty just from counting
pub const CONFIDENCE_CAP: f64 = 0.9;

/// Scorer for calculating confidence scores
pub struct Scorer;

impl Scorer {
    /// Share of the total that went to one bucket (0.0-1.0)
    ///
    /// # Arguments
    /// * `part` - Count in the winning bucket(s)
    /// * `total` - Count across all buckets
    pub fn share_of_total(part: u32, total: u32) -> f64 {
        if total == 0 {
            return 0.0;
        }

        (part as f64 / total as f64).clamp(0.0, 1.0)
    }

    /// Confidence that grows with sample size until `full_at`, capped at `cap`
    pub fn sample_capped(sample_size: u32, full_at: u32, cap: f64) -> f64 {
        if full_at == 0 {
            return cap;
        }

        (sample_size as f64 / full_at as f64).min(cap)
    }

    /// Confidence damped by the variance-to-mean ratio, capped at `cap`
    ///
    /// Even throughput → close to the cap. Bursty throughput → lower.
    pub fn variance_damped(mean: f64, variance: f64, cap: f64) -> f64 {
        if mean <= 0.0 {
            return 0.0;
        }

        (1.0 / (1.0 + variance / mean)).min(cap)
    }

    /// Population mean and variance
    pub fn mean_and_variance(values: &[f64]) -> (f64, f64) {
        if values.is_empty() {
            return (0.0, 0.0);
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        (mean, variance)
    }
}
