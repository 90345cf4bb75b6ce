//! Overround removal for three-way decimal odds.
//!
//! rtp = 1 / (1/o_home + 1/o_draw + 1/o_away)
//!
//! `rtp` is the share of stake a margin-free book would pay back.
//! `(1/o_i) * rtp` is the fair probability of outcome i.
//! All functions are pure and return `None` instead of dividing by zero.

use super::Triple;

#[inline]
fn implied_sum(odds: &Triple) -> Option<f64> {
    if odds.iter().any(|o| !o.is_finite() || *o <= 0.0) {
        return None;
    }
    Some(odds.iter().map(|o| 1.0 / o).sum())
}

/// Fair return (RTP) implied by the odds. `None` for the sentinel.
#[inline]
pub fn fair_return(odds: &Triple) -> Option<f64> {
    implied_sum(odds).map(|s| 1.0 / s)
}

/// Bookmaker margin: how far the implied probabilities sum past 1.
#[inline]
pub fn overround(odds: &Triple) -> Option<f64> {
    implied_sum(odds).map(|s| s - 1.0)
}

/// Margin-free probability per outcome. Sums to 1.
#[inline]
pub fn fair_probabilities(odds: &Triple) -> Option<Triple> {
    let rtp = fair_return(odds)?;
    Some(odds.map(|o| (1.0 / o) * rtp))
}
