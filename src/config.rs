use crate::errors::{EngineError, EngineResult};
use crate::exchange::auth::ExchangeCredentials;
use crate::exchange::MAX_WINDOW_DAYS;

/// Where the per-fixture odds come from each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OddsSourceKind {
    Primary,
    Exchange,
}

/// Which market scorer the fixture resolver uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerKind {
    FirstReturned,
    NameSimilarity,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub primary_feed_url: String,
    pub added_money: f64,
    pub guaranteed_win: f64,
    pub odds_source: OddsSourceKind,
    pub exchange: Option<ExchangeCredentials>,
    pub exchange_identity_url: String,
    pub exchange_betting_url: String,
    pub resolution_window_days: i64,
    pub max_concurrent_resolutions: usize,
    pub match_scorer: ScorerKind,
    pub match_threshold: f64,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub run_once: bool,
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let added_money: f64 = parse_var("ADDED_MONEY", "0")?;
        let guaranteed_win: f64 = parse_var("GUARANTEED_WIN", "0")?;
        let resolution_window_days: i64 = parse_var("RESOLUTION_WINDOW_DAYS", "1")?;
        let max_concurrent_resolutions: usize = parse_var("MAX_CONCURRENT_RESOLUTIONS", "4")?;
        let match_threshold: f64 = parse_var("MATCH_THRESHOLD", "0.0")?;
        let poll_interval_secs: u64 = parse_var("POLL_INTERVAL_SECS", "300")?;
        let request_timeout_secs: u64 = parse_var("REQUEST_TIMEOUT_SECS", "10")?;
        let run_once: bool = parse_var("RUN_ONCE", "false")?;

        let odds_source = parse_odds_source(&env_var_or("ODDS_SOURCE", "primary"))?;
        let match_scorer = parse_scorer(&env_var_or("MATCH_SCORER", "first"))?;

        // Credentials are only needed when the exchange is queried.
        let exchange = match odds_source {
            OddsSourceKind::Exchange => Some(ExchangeCredentials {
                username: env_var("EXCHANGE_USERNAME")?,
                password: env_var("EXCHANGE_PASSWORD")?,
                app_key: env_var("EXCHANGE_APP_KEY")?,
                locale: env_var_or("EXCHANGE_LOCALE", "sweden"),
            }),
            OddsSourceKind::Primary => None,
        };

        let cfg = Self {
            primary_feed_url: env_var_or(
                "PRIMARY_FEED_URL",
                "https://api.spela.svenskaspel.se/search/1/query/?ctx=draw&type=stryktipset&rangefilter=payload.draw.regCloseTime;gt;now-1d&offset=0&count=100",
            ),
            added_money,
            guaranteed_win,
            odds_source,
            exchange,
            exchange_identity_url: env_var_or(
                "EXCHANGE_IDENTITY_URL",
                "https://identitysso.betfair.se/api",
            ),
            exchange_betting_url: env_var_or(
                "EXCHANGE_BETTING_URL",
                "https://api.betfair.com/exchange/betting/rest/v1.0",
            ),
            resolution_window_days,
            max_concurrent_resolutions,
            match_scorer,
            match_threshold,
            poll_interval_secs,
            request_timeout_secs,
            run_once,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> EngineResult<()> {
        if self.added_money < 0.0 || self.guaranteed_win < 0.0 {
            return Err(EngineError::Config("ADDED_MONEY and GUARANTEED_WIN must be >= 0".into()));
        }
        if !(0..=MAX_WINDOW_DAYS).contains(&self.resolution_window_days) {
            return Err(EngineError::Config(format!(
                "RESOLUTION_WINDOW_DAYS must be within [0, {MAX_WINDOW_DAYS}]"
            )));
        }
        if self.max_concurrent_resolutions == 0 {
            return Err(EngineError::Config("MAX_CONCURRENT_RESOLUTIONS must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(EngineError::Config("MATCH_THRESHOLD must be within [0, 1]".into()));
        }
        if self.poll_interval_secs == 0 {
            return Err(EngineError::Config("POLL_INTERVAL_SECS must be >= 1".into()));
        }
        Ok(())
    }
}

fn parse_odds_source(s: &str) -> EngineResult<OddsSourceKind> {
    match s.trim().to_ascii_lowercase().as_str() {
        "primary" => Ok(OddsSourceKind::Primary),
        "exchange" => Ok(OddsSourceKind::Exchange),
        other => Err(EngineError::Config(format!("ODDS_SOURCE: unknown source '{other}'"))),
    }
}

fn parse_scorer(s: &str) -> EngineResult<ScorerKind> {
    match s.trim().to_ascii_lowercase().as_str() {
        "first" => Ok(ScorerKind::FirstReturned),
        "similarity" => Ok(ScorerKind::NameSimilarity),
        other => Err(EngineError::Config(format!("MATCH_SCORER: unknown scorer '{other}'"))),
    }
}

fn parse_var<T>(key: &str, default: &str) -> EngineResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_var_or(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| EngineError::Config(format!("{key}: {e}")))
}

fn env_var(key: &str) -> EngineResult<String> {
    std::env::var(key).map_err(|_| EngineError::Config(format!("missing env var: {key}")))
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
