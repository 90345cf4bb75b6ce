use crate::config::{AppConfig, OddsSourceKind};
use crate::errors::{EngineError, EngineResult};
use crate::exchange::client::ExchangeClient;
use crate::exchange::resolver::FixtureResolver;
use crate::exchange::scanner;
use crate::exchange::{ExchangeSession, SessionProvider};
use crate::execution::ev;
use crate::feeds::svenska_spel::{DrawSnapshot, PrimaryFeedClient};
use crate::models::pool::{PoolEstimator, PoolInfo};
use crate::models::{Fixture, OddsQuote, OddsSource};
use crate::state::{CountersSnapshot, CycleReport, DistributionRecord, OddsRecord, ResolutionCounters};
use portable_atomic::Ordering;
use tokio::sync::watch;
use uuid::Uuid;

/// Long-lived collaborators for the polling loop. Nothing here carries state
/// from one cycle to the next.
pub struct CycleContext {
    pub primary: PrimaryFeedClient,
    pub estimator: PoolEstimator,
    pub exchange: Option<ExchangeClient>,
    pub resolver: FixtureResolver,
    pub max_concurrency: usize,
}

impl CycleContext {
    pub fn from_config(config: &AppConfig) -> EngineResult<Self> {
        let exchange = match config.odds_source {
            OddsSourceKind::Primary => None,
            OddsSourceKind::Exchange => {
                let creds = config
                    .exchange
                    .clone()
                    .ok_or_else(|| EngineError::Config("exchange odds need exchange credentials".into()))?;
                Some(ExchangeClient::new(
                    &config.exchange_identity_url,
                    &config.exchange_betting_url,
                    creds,
                    config.request_timeout_secs,
                ))
            }
        };

        Ok(Self {
            primary: PrimaryFeedClient::new(&config.primary_feed_url, config.request_timeout_secs),
            estimator: PoolEstimator::new(config.added_money, config.guaranteed_win),
            exchange,
            resolver: FixtureResolver::from_config(config),
            max_concurrency: config.max_concurrent_resolutions,
        })
    }
}

/// One polling cycle: fetch, estimate, resolve, score.
/// Only a missing primary snapshot or misaligned sequences fail the cycle.
pub async fn run_cycle(ctx: &CycleContext, shutdown: watch::Receiver<bool>) -> EngineResult<CycleReport> {
    let cycle_id = Uuid::new_v4();
    let snapshot = ctx.primary.fetch_draw().await?;

    tracing::info!(
        cycle = %cycle_id,
        round = %snapshot.round_id,
        fixtures = snapshot.fixtures.len(),
        turnover = snapshot.turnover,
        closes = %snapshot.closing_time,
        "primary snapshot fetched"
    );

    let pool = estimate_pool(&ctx.estimator, &snapshot);

    let (odds, resolution) = match &ctx.exchange {
        Some(exchange) => {
            let (quotes, counters) = exchange_quotes(
                exchange,
                &ctx.resolver,
                &snapshot.fixtures,
                ctx.max_concurrency,
                shutdown,
            )
            .await;
            (quotes, Some(counters))
        }
        None => (snapshot.odds.clone(), None),
    };

    assemble_report(cycle_id, &snapshot, pool, odds, resolution)
}

/// Pool branch. A zero turnover only loses the pool record.
fn estimate_pool(estimator: &PoolEstimator, snapshot: &DrawSnapshot) -> Option<PoolInfo> {
    match estimator.estimate(snapshot.turnover) {
        Ok(estimate) => {
            let info = PoolInfo::from_estimate(
                &snapshot.description,
                &snapshot.closing_time,
                &snapshot.round_id,
                estimator,
                &estimate,
            );
            if estimate.has_extra_value() {
                tracing::info!(round = %info.round_id, true_rtp = info.true_rtp, "pool pays above an ordinary round");
            }
            Some(info)
        }
        Err(e) => {
            tracing::warn!(round = %snapshot.round_id, error = %e, "pool estimate skipped");
            None
        }
    }
}

/// Session scope: login, resolve every fixture, logout whatever happened.
async fn exchange_quotes<P: SessionProvider>(
    exchange: &P,
    resolver: &FixtureResolver,
    fixtures: &[Fixture],
    max_concurrency: usize,
    shutdown: watch::Receiver<bool>,
) -> (Vec<OddsQuote>, CountersSnapshot) {
    let counters = ResolutionCounters::default();

    let session = match exchange.login().await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "exchange login failed, all exchange quotes unavailable");
            counters.unavailable.fetch_add(fixtures.len() as u64, Ordering::Relaxed);
            return (
                vec![OddsQuote::unavailable(OddsSource::Exchange); fixtures.len()],
                counters.snapshot(),
            );
        }
    };

    tracing::debug!(scorer = resolver.scorer_name(), max_concurrency, "resolving fixtures on exchange");
    let quotes = scanner::resolve_all(&session, resolver, fixtures, max_concurrency, shutdown, &counters).await;

    if let Err(e) = session.logout().await {
        tracing::warn!(error = %e, "exchange logout failed");
    }

    let snap = counters.snapshot();
    tracing::info!(
        resolved = snap.resolved,
        not_found = snap.not_found,
        unavailable = snap.unavailable,
        failed = snap.failed,
        cancelled = snap.cancelled,
        "exchange resolution finished"
    );
    (quotes, snap)
}

/// Pure tail of the cycle: align, score, rank.
pub fn assemble_report(
    cycle_id: Uuid,
    snapshot: &DrawSnapshot,
    pool: Option<PoolInfo>,
    odds: Vec<OddsQuote>,
    resolution: Option<CountersSnapshot>,
) -> EngineResult<CycleReport> {
    let ev = ev::compute_batch(&snapshot.fixtures, &odds, &snapshot.distributions)?;
    let value = ev::rank_value(&ev);

    let odds = snapshot
        .fixtures
        .iter()
        .zip(odds)
        .map(|(f, quote)| OddsRecord { fixture: f.label(), quote })
        .collect();
    let distributions = snapshot
        .fixtures
        .iter()
        .zip(&snapshot.distributions)
        .map(|(f, d)| DistributionRecord { fixture: f.label(), distribution: *d })
        .collect();

    Ok(CycleReport {
        cycle_id,
        pool,
        odds,
        distributions,
        ev,
        value,
        resolution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::resolver::FirstReturned;
    use crate::exchange::types::{BestPrices, EventInfo, MarketCatalogue, MarketDescription, RunnerCatalog};
    use crate::exchange::{MarketFeed, SearchWindow};
    use crate::models::CrowdDistribution;
    use portable_atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    /// Exchange double. Counts logouts; "Slow" fixtures never answer.
    struct FakeExchange {
        accept_login: bool,
        logouts: Arc<AtomicUsize>,
    }

    struct FakeSession {
        logouts: Arc<AtomicUsize>,
    }

    impl FakeExchange {
        fn new(accept_login: bool) -> Self {
            Self { accept_login, logouts: Arc::new(AtomicUsize::new(0)) }
        }

        fn logouts(&self) -> usize {
            self.logouts.load(Ordering::SeqCst)
        }
    }

    impl SessionProvider for FakeExchange {
        type Session = FakeSession;

        async fn login(&self) -> EngineResult<FakeSession> {
            if !self.accept_login {
                return Err(EngineError::Auth("INVALID_USERNAME_OR_PASSWORD".into()));
            }
            Ok(FakeSession { logouts: self.logouts.clone() })
        }
    }

    impl ExchangeSession for FakeSession {
        async fn logout(self) -> EngineResult<()> {
            self.logouts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl MarketFeed for FakeSession {
        async fn search_markets(&self, query: &str, _w: &SearchWindow) -> EngineResult<Vec<MarketCatalogue>> {
            if query.starts_with("Slow") {
                std::future::pending::<()>().await;
            }
            Ok(vec![MarketCatalogue {
                market_id: "1.100".into(),
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

        async fn best_prices(&self, _id: &str, _selection_id: u64) -> EngineResult<BestPrices> {
            Ok(BestPrices { back: Some(2.0), lay: Some(2.04) })
        }
    }

    fn resolver() -> FixtureResolver {
        FixtureResolver::new(1, 0.0, Box::new(FirstReturned))
    }

    fn snapshot() -> DrawSnapshot {
        let fixtures: Vec<Fixture> = ["A", "C", "E"]
            .iter()
            .enumerate()
            .map(|(index, home)| Fixture {
                index,
                home: home.to_string(),
                away: format!("{home}2"),
                closing_time: "2024-03-16T15:59:00+01:00".into(),
                round_id: "4711".into(),
            })
            .collect();
        DrawSnapshot {
            description: "Stryktipset v.11".into(),
            closing_time: "2024-03-16T15:59:00+01:00".into(),
            turnover: 100_000_000.0,
            round_id: "4711".into(),
            odds: vec![
                OddsQuote::new(OddsSource::Primary, [2.0, 3.0, 4.5]),
                OddsQuote::unavailable(OddsSource::Primary),
                OddsQuote::new(OddsSource::Primary, [2.0, 4.0, 4.0]),
            ],
            distributions: vec![
                CrowdDistribution::new([0.5, 0.3, 0.2]),
                CrowdDistribution::new([0.4, 0.3, 0.3]),
                CrowdDistribution::new([0.5, 0.25, 0.25]),
            ],
            fixtures,
        }
    }

    #[test]
    fn test_report_is_full_length() {
        let snap = snapshot();
        let pool = estimate_pool(&PoolEstimator::new(0.0, 40_000_000.0), &snap);
        let report = assemble_report(Uuid::nil(), &snap, pool, snap.odds.clone(), None).unwrap();

        assert_eq!(report.odds.len(), 3);
        assert_eq!(report.distributions.len(), 3);
        assert_eq!(report.ev.len(), 3);
        assert_eq!(report.usable_fixtures(), 2);
        assert_eq!(report.odds[1].fixture, "C v C2");
        assert_eq!(report.value.len(), 2);
        let pool = report.pool.unwrap();
        assert_eq!(pool.pool_13, 40_000_000);
        assert!((pool.true_rtp - 0.738).abs() < 1e-9);
    }

    #[test]
    fn test_short_odds_abort_the_batch() {
        let snap = snapshot();
        let odds = snap.odds[..2].to_vec();
        let err = assemble_report(Uuid::nil(), &snap, None, odds, None).unwrap_err();
        assert!(matches!(err, EngineError::AlignmentMismatch { fixtures: 3, odds: 2, .. }));
    }

    #[test]
    fn test_zero_turnover_drops_only_pool() {
        let mut snap = snapshot();
        snap.turnover = 0.0;
        assert!(estimate_pool(&PoolEstimator::default(), &snap).is_none());
        let report = assemble_report(Uuid::nil(), &snap, None, snap.odds.clone(), None).unwrap();
        assert_eq!(report.ev.len(), 3);
    }

    #[test]
    fn test_report_serializes() {
        let snap = snapshot();
        let report = assemble_report(Uuid::nil(), &snap, None, snap.odds.clone(), None).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["odds"][0]["match"], "A v A2");
        assert_eq!(json["odds"][0]["source"], "primary");
        assert_eq!(json["ev"][1]["ev"], serde_json::json!([0.0, 0.0, 0.0]));
    }

    #[tokio::test]
    async fn test_login_failure_degrades_every_fixture() {
        let exchange = FakeExchange::new(false);
        let fixtures = snapshot().fixtures;
        let (_tx, rx) = watch::channel(false);

        let (quotes, counters) = exchange_quotes(&exchange, &resolver(), &fixtures, 2, rx).await;

        assert_eq!(quotes.len(), fixtures.len());
        assert!(quotes.iter().all(|q| !q.is_available() && q.source == OddsSource::Exchange));
        assert_eq!(counters.unavailable, fixtures.len() as u64);
        assert_eq!(exchange.logouts(), 0);
    }

    #[tokio::test]
    async fn test_session_closed_after_scan() {
        let exchange = FakeExchange::new(true);
        let fixtures = snapshot().fixtures;
        let (_tx, rx) = watch::channel(false);

        let (quotes, counters) = exchange_quotes(&exchange, &resolver(), &fixtures, 2, rx).await;

        assert!(quotes.iter().all(|q| q.odds == [2.02, 2.02, 2.02]));
        assert_eq!(counters.resolved, 3);
        assert_eq!(exchange.logouts(), 1);
    }

    #[tokio::test]
    async fn test_session_closed_after_cancel() {
        let exchange = FakeExchange::new(true);
        let mut fixtures = snapshot().fixtures;
        fixtures[1].home = "Slow".into();
        fixtures[2].home = "Slow".into();
        let (tx, rx) = watch::channel(false);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = tx.send(true);
        });
        let (quotes, counters) = exchange_quotes(&exchange, &resolver(), &fixtures, 3, rx).await;

        assert_eq!(quotes.len(), 3);
        assert!(quotes[0].is_available());
        assert!(!quotes[1].is_available());
        assert!(!quotes[2].is_available());
        assert_eq!(counters.cancelled, 2);
        assert_eq!(exchange.logouts(), 1);
    }
}
