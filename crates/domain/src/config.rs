use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Engine config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Tuning knobs for the metering engine.
///
/// Thresholds are percentages of the effective allowance; each fires at most
/// once per billing period.  The retry fields bound the optimistic-commit
/// loop in the admission controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterConfig {
    /// Alert thresholds as percentages, evaluated in ascending order.
    #[serde(default = "d_thresholds")]
    pub alert_thresholds: Vec<u8>,
    /// Maximum commit attempts per call before giving up with a
    /// transient failure.
    #[serde(default = "d_5")]
    pub max_commit_retries: u32,
    /// Base sleep between conflicting commit attempts.
    #[serde(default = "d_25")]
    pub retry_backoff_ms: u64,
    /// Upper bound of the random jitter added to each backoff sleep.
    #[serde(default = "d_25")]
    pub retry_jitter_ms: u64,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            alert_thresholds: d_thresholds(),
            max_commit_retries: 5,
            retry_backoff_ms: 25,
            retry_jitter_ms: 25,
        }
    }
}

impl MeterConfig {
    /// Thresholds sorted ascending with duplicates removed; the evaluator
    /// relies on this ordering so a single large spend emits 80 before 100.
    pub fn sorted_thresholds(&self) -> Vec<u8> {
        let mut t = self.alert_thresholds.clone();
        t.sort_unstable();
        t.dedup();
        t
    }
}

fn d_thresholds() -> Vec<u8> {
    vec![80, 100]
}

fn d_5() -> u32 {
    5
}

fn d_25() -> u64 {
    25
}
