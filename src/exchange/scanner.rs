use super::resolver::FixtureResolver;
use super::MarketFeed;
use crate::errors::EngineError;
use crate::models::{Fixture, OddsQuote, OddsSource};
use crate::state::ResolutionCounters;
use futures_util::stream::{self, StreamExt};
use futures_util::FutureExt;
use portable_atomic::Ordering;
use std::panic::AssertUnwindSafe;
use tokio::sync::watch;

/// Prices every fixture on the exchange.
///
/// At most `max_concurrency` fixtures are in flight. Results are placed by
/// fixture index, so the output always has `fixtures.len()` entries in coupon
/// order. Failures and fixtures left unfinished when `shutdown` flips to
/// `true` keep the unavailable sentinel. Each external call is tried once.
pub async fn resolve_all<F: MarketFeed>(
    feed: &F,
    resolver: &FixtureResolver,
    fixtures: &[Fixture],
    max_concurrency: usize,
    mut shutdown: watch::Receiver<bool>,
    counters: &ResolutionCounters,
) -> Vec<OddsQuote> {
    let mut quotes = vec![OddsQuote::unavailable(OddsSource::Exchange); fixtures.len()];
    if *shutdown.borrow() {
        counters.cancelled.fetch_add(fixtures.len() as u64, Ordering::Relaxed);
        return quotes;
    }

    let mut pending = stream::iter(fixtures.iter().enumerate())
        .map(|(slot, fixture)| async move {
            let result = AssertUnwindSafe(resolver.resolve_quote(feed, fixture))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(EngineError::Unknown(panic_message(panic.as_ref()))));
            (slot, fixture, result)
        })
        .buffer_unordered(max_concurrency.max(1));

    let mut completed = 0usize;
    let mut watching = true;
    loop {
        tokio::select! {
            next = pending.next() => {
                let Some((slot, fixture, result)) = next else { break };
                completed += 1;
                match result {
                    Ok(quote) => {
                        counters.resolved.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(fixture = %fixture.label(), odds = ?quote.odds, "exchange quote");
                        quotes[slot] = quote;
                    }
                    Err(e) => record_failure(fixture, &e, counters),
                }
            }
            changed = shutdown.changed(), if watching => {
                match changed {
                    Ok(()) if *shutdown.borrow() => {
                        let left = fixtures.len() - completed;
                        counters.cancelled.fetch_add(left as u64, Ordering::Relaxed);
                        tracing::warn!(completed, left, "resolution cancelled, keeping partial quotes");
                        break;
                    }
                    Ok(()) => {}
                    // Sender dropped: nobody can cancel any more.
                    Err(_) => watching = false,
                }
            }
        }
    }

    quotes
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "resolution task panicked".into())
}

fn record_failure(fixture: &Fixture, e: &EngineError, counters: &ResolutionCounters) {
    match e {
        EngineError::NotFound { .. } => {
            counters.not_found.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(fixture = %fixture.label(), error = %e, "no exchange market");
        }
        e if e.kind() == "source_unavailable" => {
            counters.unavailable.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(fixture = %fixture.label(), error = %e, "exchange quote unavailable");
        }
        _ => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!(fixture = %fixture.label(), kind = e.kind(), error = %e, "exchange quote failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EngineResult;
    use crate::exchange::resolver::FirstReturned;
    use crate::exchange::types::{BestPrices, EventInfo, MarketCatalogue, MarketDescription, RunnerCatalog};
    use crate::exchange::SearchWindow;
    use std::time::Duration;

    fn fixture(index: usize, home: &str, away: &str) -> Fixture {
        Fixture {
            index,
            home: home.into(),
            away: away.into(),
            closing_time: "2024-03-16T15:59:00+01:00".into(),
            round_id: "4711".into(),
        }
    }

    /// Exchange that lists only the queries it knows; "Slow" fixtures never answer.
    struct ScriptedFeed {
        known: Vec<&'static str>,
    }

    impl MarketFeed for ScriptedFeed {
        async fn search_markets(&self, query: &str, _w: &SearchWindow) -> EngineResult<Vec<MarketCatalogue>> {
            if query.starts_with("Slow") {
                std::future::pending::<()>().await;
            }
            if query.starts_with("Panic") {
                panic!("corrupt catalogue");
            }
            if query.starts_with("Broken") {
                return Err(EngineError::Api { status: 500, body: "boom".into() });
            }
            if !self.known.iter().any(|k| *k == query) {
                return Ok(Vec::new());
            }
            Ok(vec![MarketCatalogue {
                market_id: format!("1.{}", query.len()),
                market_name: Some("Match Odds".into()),
                market_start_time: None,
                description: Some(MarketDescription { market_type: Some("MATCH_ODDS".into()) }),
                event: Some(EventInfo { id: None, name: Some(query.into()) }),
                runners: None,
            }])
        }

        async fn market_runners(&self, _id: &str) -> EngineResult<Vec<RunnerCatalog>> {
            Ok(vec![
                RunnerCatalog { selection_id: 1, runner_name: Some("H".into()), sort_priority: Some(1) },
                RunnerCatalog { selection_id: 2, runner_name: Some("A".into()), sort_priority: Some(2) },
                RunnerCatalog { selection_id: 3, runner_name: Some("The Draw".into()), sort_priority: Some(3) },
            ])
        }

        async fn best_prices(&self, _id: &str, selection_id: u64) -> EngineResult<BestPrices> {
            let p = selection_id as f64 + 1.0;
            Ok(BestPrices { back: Some(p), lay: Some(p + 0.02) })
        }
    }

    fn resolver() -> FixtureResolver {
        FixtureResolver::new(1, 0.0, Box::new(FirstReturned))
    }

    #[tokio::test]
    async fn test_results_follow_fixture_order() {
        let feed = ScriptedFeed { known: vec!["A v B", "E v F"] };
        let fixtures = vec![fixture(0, "A", "B"), fixture(1, "C", "D"), fixture(2, "E", "F")];
        let (_tx, rx) = watch::channel(false);
        let counters = ResolutionCounters::default();

        let quotes = resolve_all(&feed, &resolver(), &fixtures, 2, rx, &counters).await;

        assert_eq!(quotes.len(), 3);
        assert_eq!(quotes[0].odds, [2.01, 4.01, 3.01]);
        assert!(!quotes[1].is_available());
        assert_eq!(quotes[2].odds, [2.01, 4.01, 3.01]);
        let snap = counters.snapshot();
        assert_eq!(snap.resolved, 2);
        assert_eq!(snap.not_found, 1);
    }

    #[tokio::test]
    async fn test_api_failure_is_isolated() {
        let feed = ScriptedFeed { known: vec!["A v B"] };
        let fixtures = vec![fixture(0, "Broken", "X"), fixture(1, "A", "B")];
        let (_tx, rx) = watch::channel(false);
        let counters = ResolutionCounters::default();

        let quotes = resolve_all(&feed, &resolver(), &fixtures, 4, rx, &counters).await;

        assert!(!quotes[0].is_available());
        assert!(quotes[1].is_available());
        assert_eq!(counters.snapshot().unavailable, 1);
    }

    #[tokio::test]
    async fn test_panic_becomes_unknown_failure() {
        let feed = ScriptedFeed { known: vec!["A v B"] };
        let fixtures = vec![fixture(0, "A", "B"), fixture(1, "Panic", "X")];
        let (_tx, rx) = watch::channel(false);
        let counters = ResolutionCounters::default();

        let quotes = resolve_all(&feed, &resolver(), &fixtures, 2, rx, &counters).await;

        assert!(quotes[0].is_available());
        assert!(!quotes[1].is_available());
        assert_eq!(counters.snapshot().failed, 1);
    }

    #[tokio::test]
    async fn test_cancellation_keeps_partial_results() {
        let feed = ScriptedFeed { known: vec!["A v B"] };
        let fixtures = vec![fixture(0, "A", "B"), fixture(1, "Slow", "Y"), fixture(2, "Slow", "Z")];
        let (tx, rx) = watch::channel(false);
        let counters = ResolutionCounters::default();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = tx.send(true);
        });
        let quotes = resolve_all(&feed, &resolver(), &fixtures, 3, rx, &counters).await;

        assert_eq!(quotes.len(), 3);
        assert!(quotes[0].is_available());
        assert!(!quotes[1].is_available());
        assert!(!quotes[2].is_available());
        assert_eq!(counters.snapshot().cancelled, 2);
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let feed = ScriptedFeed { known: vec!["A v B"] };
        let fixtures = vec![fixture(0, "A", "B")];
        let (_tx, rx) = watch::channel(true);
        let counters = ResolutionCounters::default();

        let quotes = resolve_all(&feed, &resolver(), &fixtures, 1, rx, &counters).await;
        assert!(!quotes[0].is_available());
        assert_eq!(counters.snapshot().cancelled, 1);
    }
}
