use crate::errors::{EngineError, EngineResult};
use serde::Serialize;

/// Payout share of turnover on an ordinary round.
pub const ORDINARY_RTP: f64 = 0.65;

/// (correct picks, share of the prize fund). Top tier first.
pub const TIER_SHARES: [(u8, f64); 4] = [(13, 0.40), (12, 0.15), (11, 0.12), (10, 0.25)];

/// One prize tier of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PoolTier {
    pub correct: u8,
    pub share: f64,
    pub estimated: f64,
    /// Only the top tier carries a guaranteed floor.
    pub guaranteed: Option<f64>,
    pub realized: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolEstimate {
    pub turnover: f64,
    pub tiers: [PoolTier; 4],
    pub true_rtp: f64,
}

impl PoolEstimate {
    pub fn tier(&self, correct: u8) -> Option<&PoolTier> {
        self.tiers.iter().find(|t| t.correct == correct)
    }

    /// Guaranteed floor or added money lifts the payout above an ordinary round.
    pub fn has_extra_value(&self) -> bool {
        self.true_rtp > ORDINARY_RTP
    }
}

/// Pool sizes from turnover, added money and the top-tier guarantee.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolEstimator {
    pub added_money: f64,
    pub guaranteed_win: f64,
}

impl PoolEstimator {
    pub fn new(added_money: f64, guaranteed_win: f64) -> Self {
        Self { added_money, guaranteed_win }
    }

    /// Zero turnover has no defined RTP and is rejected.
    pub fn estimate(&self, turnover: f64) -> EngineResult<PoolEstimate> {
        if !(turnover.is_finite() && turnover > 0.0) {
            return Err(EngineError::ArithmeticDegenerate(format!(
                "pool turnover must be positive, got {turnover}"
            )));
        }

        let tiers = TIER_SHARES.map(|(correct, share)| {
            let base = turnover * share * ORDINARY_RTP;
            if correct == 13 {
                let estimated = base + self.added_money;
                PoolTier {
                    correct,
                    share,
                    estimated,
                    guaranteed: Some(self.guaranteed_win),
                    realized: estimated.max(self.guaranteed_win),
                }
            } else {
                PoolTier { correct, share, estimated: base, guaranteed: None, realized: base }
            }
        });

        let true_rtp = tiers.iter().map(|t| t.realized).sum::<f64>() / turnover;

        Ok(PoolEstimate { turnover, tiers, true_rtp })
    }
}

/// Pool-information record handed to the caller each cycle.
#[derive(Debug, Clone, Serialize)]
pub struct PoolInfo {
    pub description: String,
    pub closing_time: String,
    pub turnover: u64,
    pub round_id: String,
    pub added_money: f64,
    pub guaranteed_win: f64,
    pub pool_13: u64,
    pub pool_12: u64,
    pub pool_11: u64,
    pub pool_10: u64,
    pub true_rtp: f64,
}

impl PoolInfo {
    pub fn from_estimate(
        description: &str,
        closing_time: &str,
        round_id: &str,
        estimator: &PoolEstimator,
        estimate: &PoolEstimate,
    ) -> Self {
        // Whole currency units, truncated.
        let size = |correct| estimate.tier(correct).map(|t| t.realized as u64).unwrap_or(0);
        Self {
            description: description.to_string(),
            closing_time: closing_time.to_string(),
            turnover: estimate.turnover as u64,
            round_id: round_id.to_string(),
            added_money: estimator.added_money,
            guaranteed_win: estimator.guaranteed_win,
            pool_13: size(13),
            pool_12: size(12),
            pool_11: size(11),
            pool_10: size(10),
            true_rtp: estimate.true_rtp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_ordinary_round() {
        let est = PoolEstimator::new(0.0, 0.0).estimate(100_000_000.0).unwrap();
        assert!(approx(est.tier(10).unwrap().realized, 16_250_000.0));
        assert!(approx(est.tier(11).unwrap().realized, 7_800_000.0));
        assert!(approx(est.tier(12).unwrap().realized, 9_750_000.0));
        assert!(approx(est.tier(13).unwrap().realized, 26_000_000.0));
        assert!(approx(est.true_rtp, 0.598), "true_rtp = {}", est.true_rtp);
        assert!(!est.has_extra_value());
    }

    #[test]
    fn test_guarantee_floor_raises_rtp() {
        let base = PoolEstimator::new(0.0, 0.0).estimate(100_000_000.0).unwrap();
        let est = PoolEstimator::new(0.0, 40_000_000.0).estimate(100_000_000.0).unwrap();
        let top = est.tier(13).unwrap();
        assert!(approx(top.estimated, 26_000_000.0));
        assert!(approx(top.realized, 40_000_000.0));
        assert!(approx(est.true_rtp, 0.738), "true_rtp = {}", est.true_rtp);
        assert!(est.true_rtp > base.true_rtp);
        assert!(est.has_extra_value());
    }

    #[test]
    fn test_guarantee_below_estimate_is_inactive() {
        let est = PoolEstimator::new(0.0, 10_000_000.0).estimate(100_000_000.0).unwrap();
        assert!(approx(est.tier(13).unwrap().realized, 26_000_000.0));
        assert_eq!(est.tier(12).unwrap().guaranteed, None);
    }

    #[test]
    fn test_added_money_goes_to_top_tier() {
        let est = PoolEstimator::new(5_000_000.0, 0.0).estimate(100_000_000.0).unwrap();
        assert!(approx(est.tier(13).unwrap().realized, 31_000_000.0));
        assert!(approx(est.tier(10).unwrap().realized, 16_250_000.0));
    }

    #[test]
    fn test_zero_turnover_rejected() {
        let err = PoolEstimator::default().estimate(0.0).unwrap_err();
        assert!(matches!(err, EngineError::ArithmeticDegenerate(_)));
    }

    #[test]
    fn test_pool_info_truncates() {
        let estimator = PoolEstimator::new(0.0, 0.0);
        let est = estimator.estimate(12_345_679.0).unwrap();
        let info = PoolInfo::from_estimate("Stryktipset", "2024-03-16T15:59:00+01:00", "4711", &estimator, &est);
        assert_eq!(info.turnover, 12_345_679);
        assert_eq!(info.pool_10, (12_345_679.0 * 0.25 * ORDINARY_RTP) as u64);
        assert_eq!(info.round_id, "4711");
    }
}
