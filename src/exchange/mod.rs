pub mod auth;
pub mod client;
pub mod resolver;
pub mod scanner;
pub mod types;

use crate::errors::EngineResult;
use chrono::{NaiveDate, TimeDelta};
use types::{BestPrices, MarketCatalogue, RunnerCatalog};

/// Market start-time window for a search, inclusive calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Longest search window accepted from config.
pub const MAX_WINDOW_DAYS: i64 = 365;

impl SearchWindow {
    /// `days` past `from`. Collapses to `from` when out of range; never panics.
    pub fn starting(from: NaiveDate, days: i64) -> Self {
        let to = TimeDelta::try_days(days)
            .and_then(|d| from.checked_add_signed(d))
            .unwrap_or(from);
        Self { from, to }
    }
}

/// Read-only view of the exchange used by fixture resolution.
/// Implemented by a live session and by in-memory fakes in tests.
#[allow(async_fn_in_trait)]
pub trait MarketFeed {
    /// Head-to-head markets matching `query` that start inside `window`,
    /// in feed order.
    async fn search_markets(
        &self,
        query: &str,
        window: &SearchWindow,
    ) -> EngineResult<Vec<MarketCatalogue>>;

    /// Runner catalogue for one market.
    async fn market_runners(&self, market_id: &str) -> EngineResult<Vec<RunnerCatalog>>;

    /// Best back/lay for one runner.
    async fn best_prices(&self, market_id: &str, selection_id: u64) -> EngineResult<BestPrices>;
}

/// An authenticated exchange session, scoped to one polling cycle.
#[allow(async_fn_in_trait)]
pub trait ExchangeSession: MarketFeed + Sized {
    /// Ends the session. Consumes it so it cannot be used afterwards.
    async fn logout(self) -> EngineResult<()>;
}

/// Opens exchange sessions. The live client and test fakes implement it.
#[allow(async_fn_in_trait)]
pub trait SessionProvider {
    type Session: ExchangeSession;

    async fn login(&self) -> EngineResult<Self::Session>;
}
