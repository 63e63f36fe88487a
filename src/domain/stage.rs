use serde::{Deserialize, Serialize};

use super::BatchReport;

/// Fraction reported when a stage has nothing left to do.
pub const COMPLETE: f64 = 1.0;

/// Reported instead of [`COMPLETE`] whenever arithmetic lands on 1.0 while
/// work is still outstanding. Callers rely on this never equalling COMPLETE.
pub const ALMOST_COMPLETE: f64 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetch,
    Parse,
    Process,
    Clear,
    Expire,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Parse => "parse",
            Stage::Process => "process",
            Stage::Clear => "clear",
            Stage::Expire => "expire",
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fetch" => Ok(Stage::Fetch),
            "parse" => Ok(Stage::Parse),
            "process" => Ok(Stage::Process),
            "clear" => Ok(Stage::Clear),
            "expire" => Ok(Stage::Expire),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress and resume cursor of one stage of one feed.
///
/// A fresh state has nothing to wait for: `total == 0` and the fraction is
/// [`COMPLETE`]. Stages that know their amount of work set `total` on their
/// first run and advance `processed`/`pointer` on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageState {
    pub total: u64,
    pub processed: u64,
    pub pointer: Option<String>,
    pub fraction: f64,
    pub message: Option<String>,
    #[serde(default)]
    pub report: BatchReport,
}

impl Default for StageState {
    fn default() -> Self {
        Self {
            total: 0,
            processed: 0,
            pointer: None,
            fraction: COMPLETE,
            message: None,
            report: BatchReport::default(),
        }
    }
}

impl StageState {
    /// Record `processed` out of `total` units and recompute the fraction.
    pub fn progress(&mut self, total: u64, processed: u64) {
        self.total = total;
        self.processed = processed;
        self.fraction = fraction_of(total, processed);
    }

    pub fn is_complete(&self) -> bool {
        self.fraction >= COMPLETE
    }

    pub fn pointer_u64(&self) -> Option<u64> {
        self.pointer.as_deref().and_then(|p| p.parse().ok())
    }
}

fn fraction_of(total: u64, processed: u64) -> f64 {
    if processed >= total {
        return COMPLETE;
    }

    let fraction = processed as f64 / total as f64;
    if fraction >= COMPLETE {
        ALMOST_COMPLETE
    } else {
        fraction
    }
}

/// Overall import progress: fetching envelops parsing, one fetch unit may
/// span many parse batches.
pub fn compose_progress(fetch: &StageState, parse: &StageState) -> f64 {
    if fetch.is_complete() && parse.is_complete() {
        return COMPLETE;
    }

    let unit = if fetch.total > 0 {
        1.0 / fetch.total as f64
    } else {
        1.0
    };
    let overall = fetch.fraction - unit + parse.fraction * unit;

    if overall >= COMPLETE {
        ALMOST_COMPLETE
    } else {
        overall.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(total: u64, processed: u64) -> StageState {
        let mut s = StageState::default();
        s.progress(total, processed);
        s
    }

    #[test]
    fn test_fresh_state_is_complete() {
        let s = StageState::default();
        assert!(s.is_complete());
        assert_eq!(s.total, 0);
    }

    #[test]
    fn test_zero_total_is_complete() {
        assert_eq!(state(0, 0).fraction, COMPLETE);
    }

    #[test]
    fn test_overshoot_is_capped() {
        assert_eq!(state(10, 25).fraction, COMPLETE);
    }

    #[test]
    fn test_progress_is_monotonic_until_total() {
        let total = 7;
        let mut last = 0.0;
        for processed in 0..total {
            let fraction = state(total, processed).fraction;
            assert!(fraction >= last);
            assert!(fraction < COMPLETE, "{} of {} reported complete", processed, total);
            last = fraction;
        }
        assert_eq!(state(total, total).fraction, COMPLETE);
    }

    #[test]
    fn test_rounding_to_one_reports_sentinel() {
        let s = state(u64::MAX, u64::MAX - 1);
        assert_eq!(s.fraction, ALMOST_COMPLETE);
    }

    #[test]
    fn test_compose_one_of_four_files() {
        let fetch = state(4, 1);
        let parse = state(100, 100);
        assert_eq!(compose_progress(&fetch, &parse), 0.25);
    }

    #[test]
    fn test_compose_without_fetch_total_follows_parse() {
        let fetch = StageState::default();
        let parse = state(200, 50);
        assert_eq!(compose_progress(&fetch, &parse), 0.25);
    }

    #[test]
    fn test_compose_complete_only_when_both_complete() {
        let fetch = state(4, 4);
        let parse = state(10, 10);
        assert_eq!(compose_progress(&fetch, &parse), COMPLETE);
    }

    #[test]
    fn test_compose_never_reports_complete_by_arithmetic() {
        // 0.5 + (1 - 2^-53) * 0.5 rounds to exactly 1.0 in f64.
        let fetch = state(2, 2);
        let mut parse = state(10, 9);
        parse.fraction = COMPLETE - f64::EPSILON / 2.0;
        assert!(!parse.is_complete());
        assert_eq!(compose_progress(&fetch, &parse), ALMOST_COMPLETE);
    }

    #[test]
    fn test_compose_is_not_negative() {
        let fetch = state(4, 0);
        let parse = state(10, 1);
        assert_eq!(compose_progress(&fetch, &parse), 0.0);
    }

    #[test]
    fn test_state_roundtrips_through_json() {
        let mut s = state(120, 40);
        s.pointer = Some("40".to_string());
        let json = serde_json::to_string(&s).unwrap();
        let back: StageState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        assert_eq!(back.pointer_u64(), Some(40));
    }
}
