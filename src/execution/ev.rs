//! Pool value ratio per outcome.
//!
//! EV_i = ((1 / o_i) * rtp) / d_i
//!
//! where:
//!   o_i = decimal odds for outcome i
//!   rtp = fair return of the odds triple (overround removed)
//!   d_i = crowd share of stakes on outcome i
//!
//! EV_i > 1 means the outcome is underbacked relative to its fair
//! probability, which raises its pari-mutuel dividend.
//! All functions are pure: same inputs always produce the same output.

use crate::errors::{EngineError, EngineResult};
use crate::models::quote::fair_probabilities;
use crate::models::{CrowdDistribution, EvRecord, Fixture, OddsQuote, Outcome, Triple, SENTINEL};
use serde::Serialize;
use smallvec::SmallVec;

/// Ratios are reported to four decimals.
#[inline]
fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// EV triple for one fixture. Sentinel odds, sentinel distribution or a zero
/// crowd share all yield the sentinel.
#[inline]
pub fn compute_ev(odds: &OddsQuote, distribution: &CrowdDistribution) -> Triple {
    if !distribution.is_available() || distribution.shares.iter().any(|d| *d <= 0.0) {
        return SENTINEL;
    }
    let Some(fair) = fair_probabilities(&odds.odds) else {
        return SENTINEL;
    };

    let mut ev = SENTINEL;
    for outcome in Outcome::ALL {
        let i = outcome.index();
        ev[i] = round4(fair[i] / distribution.shares[i]);
    }
    if ev.iter().any(|v| !v.is_finite()) {
        return SENTINEL;
    }
    ev
}

/// EV for a whole coupon. The three sequences are aligned by position and
/// must have equal length; a mismatch aborts the batch.
pub fn compute_batch(
    fixtures: &[Fixture],
    odds: &[OddsQuote],
    distributions: &[CrowdDistribution],
) -> EngineResult<Vec<EvRecord>> {
    if fixtures.len() != odds.len() || odds.len() != distributions.len() {
        return Err(EngineError::AlignmentMismatch {
            fixtures: fixtures.len(),
            odds: odds.len(),
            distributions: distributions.len(),
        });
    }

    let records = fixtures
        .iter()
        .zip(odds)
        .zip(distributions)
        .map(|((fixture, quote), dist)| {
            let ev = compute_ev(quote, dist);
            if ev == SENTINEL {
                tracing::debug!(
                    fixture = %fixture.label(),
                    odds_available = quote.is_available(),
                    distribution_available = dist.is_available(),
                    "ev sentinel"
                );
            }
            EvRecord { fixture: fixture.label(), index: fixture.index, ev }
        })
        .collect();

    Ok(records)
}

/// One underbacked outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueSignal {
    pub fixture: String,
    pub index: usize,
    pub outcome: Outcome,
    pub ev: f64,
}

/// Outcomes of one fixture with EV above 1, best first.
pub fn value_signals(record: &EvRecord) -> SmallVec<[ValueSignal; 3]> {
    let mut signals: SmallVec<[ValueSignal; 3]> = Outcome::ALL
        .iter()
        .filter(|o| record.ev[o.index()] > 1.0)
        .map(|o| ValueSignal {
            fixture: record.fixture.clone(),
            index: record.index,
            outcome: *o,
            ev: record.ev[o.index()],
        })
        .collect();
    signals.sort_by(|a, b| b.ev.total_cmp(&a.ev));
    signals
}

/// Every value signal on the coupon, best first. Ties keep coupon order.
pub fn rank_value(records: &[EvRecord]) -> Vec<ValueSignal> {
    let mut all: Vec<ValueSignal> = records.iter().flat_map(value_signals).collect();
    all.sort_by(|a, b| b.ev.total_cmp(&a.ev));
    all
}
