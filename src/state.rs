use crate::execution::ev::ValueSignal;
use crate::models::pool::PoolInfo;
use crate::models::{CrowdDistribution, EvRecord, OddsQuote};
use portable_atomic::{AtomicU64, Ordering};
use serde::Serialize;

// ── Per-cycle resolution counters (updated from concurrent lookups) ──

#[derive(Debug, Default)]
pub struct ResolutionCounters {
    pub resolved: AtomicU64,
    pub not_found: AtomicU64,
    pub unavailable: AtomicU64,
    pub failed: AtomicU64,
    pub cancelled: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountersSnapshot {
    pub resolved: u64,
    pub not_found: u64,
    pub unavailable: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl ResolutionCounters {
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            resolved: self.resolved.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            unavailable: self.unavailable.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

// ── Cycle output ──

/// Everything one polling cycle produced. `odds`, `distributions` and `ev`
/// have one entry per coupon fixture, in coupon order.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: uuid::Uuid,
    pub pool: Option<PoolInfo>,
    pub odds: Vec<OddsRecord>,
    pub distributions: Vec<DistributionRecord>,
    pub ev: Vec<EvRecord>,
    pub value: Vec<ValueSignal>,
    pub resolution: Option<CountersSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OddsRecord {
    #[serde(rename = "match")]
    pub fixture: String,
    #[serde(flatten)]
    pub quote: OddsQuote,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionRecord {
    #[serde(rename = "match")]
    pub fixture: String,
    #[serde(flatten)]
    pub distribution: CrowdDistribution,
}

impl CycleReport {
    pub fn usable_fixtures(&self) -> usize {
        self.ev.iter().filter(|r| !r.is_sentinel()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_snapshot() {
        let c = ResolutionCounters::default();
        c.resolved.fetch_add(11, Ordering::Relaxed);
        c.not_found.fetch_add(2, Ordering::Relaxed);
        let snap = c.snapshot();
        assert_eq!(snap.resolved, 11);
        assert_eq!(snap.not_found, 2);
        assert_eq!(snap.failed, 0);
    }
}
