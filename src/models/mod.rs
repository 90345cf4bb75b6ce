pub mod pool;
pub mod quote;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;

/// Outcome-indexed triple, always ordered `[home, draw, away]`.
pub type Triple = [f64; 3];

/// The all-zero triple that marks "no usable data".
pub const SENTINEL: Triple = [0.0, 0.0, 0.0];

/// 1X2 outcome. The discriminant is the index into a `Triple`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Home = 0,
    Draw = 1,
    Away = 2,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Coupon sign as printed on the pool ticket.
    pub fn sign(self) -> &'static str {
        match self {
            Outcome::Home => "1",
            Outcome::Draw => "X",
            Outcome::Away => "2",
        }
    }
}

#[inline]
pub fn is_sentinel(t: &Triple) -> bool {
    t.iter().all(|v| *v == 0.0)
}

/// One match on the coupon. Built once per cycle from the primary feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fixture {
    /// Position on the coupon (0-based). All per-fixture sequences align on it.
    pub index: usize,
    pub home: String,
    pub away: String,
    pub closing_time: String,
    pub round_id: String,
}

impl Fixture {
    pub fn label(&self) -> String {
        format!("{} v {}", self.home, self.away)
    }

    /// Calendar date of the closing time in its own offset.
    pub fn date(&self) -> Option<NaiveDate> {
        DateTime::<FixedOffset>::parse_from_rfc3339(&self.closing_time)
            .map(|dt| dt.date_naive())
            .ok()
            .or_else(|| {
                let day = self.closing_time.split('T').next()?;
                NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OddsSource {
    Primary,
    Exchange,
}

/// Decimal odds for one fixture, `[home, draw, away]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OddsQuote {
    pub source: OddsSource,
    pub odds: Triple,
}

impl OddsQuote {
    pub fn new(source: OddsSource, odds: Triple) -> Self {
        Self { source, odds }
    }

    pub fn unavailable(source: OddsSource) -> Self {
        Self { source, odds: SENTINEL }
    }

    /// False for the sentinel and for any non-positive or non-finite price.
    #[inline]
    pub fn is_available(&self) -> bool {
        self.odds.iter().all(|o| o.is_finite() && *o > 0.0)
    }
}

/// Tolerance on the sum of crowd shares (feed rounds each share to whole percent).
pub const DISTRIBUTION_SUM_TOLERANCE: f64 = 0.02;

/// Share of stakes on each outcome, as fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrowdDistribution {
    pub shares: Triple,
}

impl CrowdDistribution {
    pub fn new(shares: Triple) -> Self {
        Self { shares }
    }

    pub fn unavailable() -> Self {
        Self { shares: SENTINEL }
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        !is_sentinel(&self.shares)
    }

    pub fn is_consistent(&self) -> bool {
        let sum: f64 = self.shares.iter().sum();
        self.shares.iter().all(|s| (0.0..=1.0).contains(s))
            && (sum - 1.0).abs() <= DISTRIBUTION_SUM_TOLERANCE
    }
}

/// Per-fixture EV ratios. `ev == SENTINEL` when inputs were unusable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvRecord {
    pub fixture: String,
    pub index: usize,
    pub ev: Triple,
}

impl EvRecord {
    #[inline]
    pub fn is_sentinel(&self) -> bool {
        is_sentinel(&self.ev)
    }
}
