use super::types::{Draw, DrawEvent, SearchResponse};
use crate::errors::{EngineError, EngineResult};
use crate::models::{CrowdDistribution, Fixture, OddsQuote, OddsSource, Triple};
use reqwest::Client;

/// One coupon as published by the pool operator.
/// `fixtures`, `odds` and `distributions` are index-aligned.
#[derive(Debug, Clone)]
pub struct DrawSnapshot {
    pub description: String,
    pub closing_time: String,
    pub turnover: f64,
    pub round_id: String,
    pub fixtures: Vec<Fixture>,
    pub odds: Vec<OddsQuote>,
    pub distributions: Vec<CrowdDistribution>,
}

/// Pool operator REST client. One GET per cycle, shared read-only afterwards.
#[derive(Clone)]
pub struct PrimaryFeedClient {
    client: Client,
    url: String,
}

impl PrimaryFeedClient {
    pub fn new(url: &str, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            url: url.to_string(),
        }
    }

    pub async fn fetch_draw(&self) -> EngineResult<DrawSnapshot> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| EngineError::SourceUnavailable(format!("primary feed request: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::SourceUnavailable(format!("primary feed HTTP {status}: {body}")));
        }

        let data: SearchResponse = resp
            .json()
            .await
            .map_err(|e| EngineError::SourceUnavailable(format!("primary feed parse: {e}")))?;

        parse_draw(data)
    }
}

/// Turn the raw search response into a snapshot. Per-event gaps become
/// sentinels; a missing draw is fatal.
pub fn parse_draw(data: SearchResponse) -> EngineResult<DrawSnapshot> {
    let first = data
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| EngineError::SourceUnavailable("primary feed returned no draw".into()))?;

    let round_id = first
        .id
        .as_deref()
        .and_then(|id| id.split('_').nth(1))
        .unwrap_or_default()
        .to_string();

    let draw: Draw = first
        .payload
        .and_then(|p| p.draw)
        .ok_or_else(|| EngineError::SourceUnavailable("primary feed result has no draw payload".into()))?;

    let description = draw.reg_close_description.unwrap_or_default();
    let closing_time = draw.reg_close_time.unwrap_or_default();
    let turnover = draw
        .current_net_sale
        .as_deref()
        .and_then(parse_turnover)
        .ok_or_else(|| EngineError::SourceUnavailable("primary feed has no turnover".into()))?;

    let events = draw.draw_events.unwrap_or_default();
    let mut fixtures = Vec::with_capacity(events.len());
    let mut odds = Vec::with_capacity(events.len());
    let mut distributions = Vec::with_capacity(events.len());

    for (index, event) in events.iter().enumerate() {
        let fixture = Fixture {
            index,
            home: event.participant(0).unwrap_or_default().to_string(),
            away: event.participant(1).unwrap_or_default().to_string(),
            closing_time: closing_time.clone(),
            round_id: round_id.clone(),
        };

        let quote = match event_odds(event) {
            Some(triple) => OddsQuote::new(OddsSource::Primary, triple),
            None => {
                tracing::warn!(fixture = %fixture.label(), "primary odds unavailable");
                OddsQuote::unavailable(OddsSource::Primary)
            }
        };

        let dist = match event_distribution(event) {
            Some(shares) => {
                let d = CrowdDistribution::new(shares);
                if !d.is_consistent() {
                    tracing::warn!(fixture = %fixture.label(), shares = ?shares, "crowd shares do not sum to 1");
                }
                d
            }
            None => {
                tracing::warn!(fixture = %fixture.label(), "crowd distribution unavailable");
                CrowdDistribution::unavailable()
            }
        };

        fixtures.push(fixture);
        odds.push(quote);
        distributions.push(dist);
    }

    Ok(DrawSnapshot {
        description,
        closing_time,
        turnover,
        round_id,
        fixtures,
        odds,
        distributions,
    })
}

fn event_odds(event: &DrawEvent) -> Option<Triple> {
    let o = event.odds.as_ref()?;
    Some([
        parse_decimal_comma(o.one.as_deref()?)?,
        parse_decimal_comma(o.x.as_deref()?)?,
        parse_decimal_comma(o.two.as_deref()?)?,
    ])
}

fn event_distribution(event: &DrawEvent) -> Option<Triple> {
    let pct = |i| parse_decimal_comma(event.distribution(i)?).map(|p| p / 100.0);
    Some([pct(0)?, pct(1)?, pct(2)?])
}

/// "3,60" -> 3.6
pub fn parse_decimal_comma(s: &str) -> Option<f64> {
    let v: f64 = s.trim().replace(',', ".").parse().ok()?;
    v.is_finite().then_some(v)
}

/// Net sale is published with a decimal comma ("31245678,00", sometimes
/// with space grouping). Whole currency units only.
pub fn parse_turnover(s: &str) -> Option<f64> {
    let integer: String = s
        .split(',')
        .next()?
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    integer.parse::<u64>().ok().map(|v| v as f64)
}
