use super::types::{BestPrices, MarketCatalogue, RunnerCatalog};
use super::{MarketFeed, SearchWindow};
use crate::config::{AppConfig, ScorerKind};
use crate::errors::{EngineError, EngineResult};
use crate::models::{Fixture, OddsQuote, OddsSource, Triple, SENTINEL};

/// Scores how well an exchange market matches a coupon fixture.
/// Must be deterministic: same fixture and candidate, same score.
pub trait MatchScorer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Similarity in [0, 1].
    fn score(&self, fixture: &Fixture, candidate: &MarketCatalogue) -> f64;
}

/// Accepts every candidate equally, so selection falls back to feed order.
pub struct FirstReturned;

impl MatchScorer for FirstReturned {
    fn name(&self) -> &'static str {
        "first-returned"
    }

    fn score(&self, _fixture: &Fixture, _candidate: &MarketCatalogue) -> f64 {
        1.0
    }
}

/// Jaro-Winkler similarity between coupon team names and the exchange event name.
pub struct NameSimilarity;

/// Tokens that differ between feeds without changing the club.
const NOISE_TOKENS: &[&str] = &["fc", "afc", "cf", "sc", "if", "bk", "ff", "fk", "the"];

fn normalize_team(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !NOISE_TOKENS.contains(t))
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_event(name: &str) -> Option<(&str, &str)> {
    name.split_once(" v ").or_else(|| name.split_once(" vs "))
}

impl MatchScorer for NameSimilarity {
    fn name(&self) -> &'static str {
        "name-similarity"
    }

    fn score(&self, fixture: &Fixture, candidate: &MarketCatalogue) -> f64 {
        let event = candidate.event_name();
        match split_event(event) {
            Some((home, away)) => {
                let h = strsim::jaro_winkler(&normalize_team(&fixture.home), &normalize_team(home));
                let a = strsim::jaro_winkler(&normalize_team(&fixture.away), &normalize_team(away));
                (h + a) / 2.0
            }
            None => strsim::jaro_winkler(
                &normalize_team(&fixture.label()),
                &normalize_team(event),
            ),
        }
    }
}

/// Maps a coupon fixture to an exchange 1X2 market and prices it.
pub struct FixtureResolver {
    window_days: i64,
    threshold: f64,
    scorer: Box<dyn MatchScorer>,
}

impl FixtureResolver {
    pub fn new(window_days: i64, threshold: f64, scorer: Box<dyn MatchScorer>) -> Self {
        Self { window_days, threshold, scorer }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let scorer: Box<dyn MatchScorer> = match config.match_scorer {
            ScorerKind::FirstReturned => Box::new(FirstReturned),
            ScorerKind::NameSimilarity => Box::new(NameSimilarity),
        };
        Self::new(config.resolution_window_days, config.match_threshold, scorer)
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    /// Best-scoring match-odds candidate at or above the threshold.
    /// Equal scores keep feed order, so the first returned wins.
    pub fn select_market<'a>(
        &self,
        fixture: &Fixture,
        candidates: &'a [MarketCatalogue],
    ) -> Option<&'a MarketCatalogue> {
        let mut best: Option<(&MarketCatalogue, f64)> = None;
        for candidate in candidates.iter().filter(|c| c.is_match_odds()) {
            let score = self.scorer.score(fixture, candidate);
            if !score.is_finite() || score < self.threshold {
                continue;
            }
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((candidate, score));
            }
        }
        best.map(|(c, score)| {
            tracing::debug!(
                fixture = %fixture.label(),
                market = %c.market_id,
                event = %c.event_name(),
                starts = c.market_start_time.as_deref().unwrap_or("?"),
                score,
                "market selected"
            );
            c
        })
    }

    /// Mid-market odds for the fixture, `[home, draw, away]`.
    pub async fn resolve_quote<F: MarketFeed>(
        &self,
        feed: &F,
        fixture: &Fixture,
    ) -> EngineResult<OddsQuote> {
        let query = fixture.label();
        let date = fixture.date().ok_or_else(|| {
            EngineError::SourceUnavailable(format!("unparseable closing time '{}'", fixture.closing_time))
        })?;
        let window = SearchWindow::starting(date, self.window_days);

        let candidates = feed.search_markets(&query, &window).await?;
        if candidates.is_empty() {
            return Err(EngineError::NotFound { query });
        }
        let market = self
            .select_market(fixture, &candidates)
            .ok_or_else(|| EngineError::NotFound { query: query.clone() })?;

        let runners = feed.market_runners(&market.market_id).await?;
        let selections = order_runners(&runners)?;

        let mut odds: Triple = SENTINEL;
        for (slot, selection_id) in selections.iter().enumerate() {
            let best = feed.best_prices(&market.market_id, *selection_id).await?;
            odds[slot] = mid_price(&best).ok_or_else(|| {
                EngineError::SourceUnavailable(format!(
                    "empty ladder for runner {selection_id} in market {}",
                    market.market_id
                ))
            })?;
        }

        Ok(OddsQuote::new(OddsSource::Exchange, odds))
    }
}

/// Selection ids in `[home, draw, away]` order. The exchange lists home and
/// away by sort priority and the draw last.
pub fn order_runners(runners: &[RunnerCatalog]) -> EngineResult<[u64; 3]> {
    if runners.len() != 3 {
        return Err(EngineError::SourceUnavailable(format!(
            "expected 3 runners, got {}",
            runners.len()
        )));
    }

    let draw = runners
        .iter()
        .find(|r| r.is_draw())
        .or_else(|| runners.iter().find(|r| r.sort_priority == Some(3)))
        .ok_or_else(|| EngineError::SourceUnavailable("no draw runner".into()))?;

    let mut teams: Vec<&RunnerCatalog> = runners
        .iter()
        .filter(|r| r.selection_id != draw.selection_id)
        .collect();
    teams.sort_by_key(|r| r.sort_priority.unwrap_or(u32::MAX));

    match teams.as_slice() {
        [home, away] => Ok([home.selection_id, draw.selection_id, away.selection_id]),
        _ => Err(EngineError::SourceUnavailable("duplicate draw selection".into())),
    }
}

/// Midpoint of best back and best lay, three decimals.
pub fn mid_price(best: &BestPrices) -> Option<f64> {
    let (back, lay) = (best.back?, best.lay?);
    if back <= 0.0 || lay <= 0.0 {
        return None;
    }
    Some(((lay + back) / 2.0 * 1000.0).round() / 1000.0)
}
