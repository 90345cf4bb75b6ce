mod config;
mod errors;
mod exchange;
mod execution;
mod feeds;
mod models;
mod state;

use crate::execution::cycle::{self, CycleContext};
use crate::models::quote::overround;
use crate::state::CycleReport;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("tipset_value starting");

    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    let ctx = match CycleContext::from_config(&cfg) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("startup error: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        odds_source = ?cfg.odds_source,
        scorer = ctx.resolver.scorer_name(),
        added_money = cfg.added_money,
        guaranteed_win = cfg.guaranteed_win,
        poll_secs = cfg.poll_interval_secs,
        "engine configured"
    );

    // Ctrl-C cancels the running cycle and stops the loop.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown requested");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                // Keep the sender alive so the loop never sees a closed channel.
                let _keep = shutdown_tx;
                tracing::warn!(error = %e, "ctrl-c handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    });

    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(cfg.poll_interval_secs));
    // A slow cycle pushes the next one back instead of bunching them up.
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stop = shutdown_rx.clone();

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = stop.changed() => {}
        }
        if *stop.borrow() {
            break;
        }

        match cycle::run_cycle(&ctx, shutdown_rx.clone()).await {
            Ok(report) => log_report(&report),
            Err(e) => tracing::error!(kind = e.kind(), structural = !e.is_per_fixture(), error = %e, "cycle failed"),
        }

        if cfg.run_once || *stop.borrow() {
            break;
        }
    }

    tracing::info!("tipset_value shutting down");
}

fn log_report(report: &CycleReport) {
    if let Some(pool) = &report.pool {
        tracing::info!(
            round = %pool.round_id,
            info = %pool.description,
            turnover = pool.turnover,
            pool_13 = pool.pool_13,
            pool_12 = pool.pool_12,
            pool_11 = pool.pool_11,
            pool_10 = pool.pool_10,
            true_rtp = pool.true_rtp,
            "pool"
        );
    }

    for (odds, ev) in report.odds.iter().zip(&report.ev) {
        tracing::info!(
            fixture = %ev.fixture,
            odds = ?odds.quote.odds,
            margin = ?overround(&odds.quote.odds),
            ev = ?ev.ev,
            "fixture"
        );
    }

    for signal in &report.value {
        tracing::info!(
            fixture = %signal.fixture,
            sign = signal.outcome.sign(),
            ev = signal.ev,
            "value"
        );
    }

    tracing::info!(
        cycle = %report.cycle_id,
        fixtures = report.ev.len(),
        usable = report.usable_fixtures(),
        value_signals = report.value.len(),
        "cycle complete"
    );
}
