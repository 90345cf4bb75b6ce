use serde::{Deserialize, Serialize};

// ── Identity ──

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: Option<String>,
    #[allow(dead_code)]
    pub product: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
}

impl LoginResponse {
    #[inline]
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("SUCCESS")
    }
}

// ── Requests ──

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_start_time: Option<TimeRange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMarketCatalogueRequest {
    pub filter: MarketFilter,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub market_projection: Vec<&'static str>,
    pub max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceProjection {
    pub price_data: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRunnerBookRequest {
    pub market_id: String,
    pub selection_id: u64,
    pub price_projection: PriceProjection,
}

// ── Catalogue ──

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketCatalogue {
    pub market_id: String,
    pub market_name: Option<String>,
    pub market_start_time: Option<String>,
    pub description: Option<MarketDescription>,
    pub event: Option<EventInfo>,
    pub runners: Option<Vec<RunnerCatalog>>,
}

impl MarketCatalogue {
    /// Full-time 1X2 market.
    pub fn is_match_odds(&self) -> bool {
        let by_type = self
            .description
            .as_ref()
            .and_then(|d| d.market_type.as_deref())
            .is_some_and(|t| t == "MATCH_ODDS");
        by_type || self.market_name.as_deref() == Some("Match Odds")
    }

    #[inline]
    pub fn event_name(&self) -> &str {
        self.event.as_ref().and_then(|e| e.name.as_deref()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDescription {
    pub market_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInfo {
    #[allow(dead_code)]
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerCatalog {
    pub selection_id: u64,
    pub runner_name: Option<String>,
    pub sort_priority: Option<u32>,
}

impl RunnerCatalog {
    #[inline]
    pub fn is_draw(&self) -> bool {
        self.runner_name.as_deref() == Some("The Draw")
    }
}

// ── Prices ──

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketBook {
    #[allow(dead_code)]
    pub market_id: Option<String>,
    pub runners: Option<Vec<RunnerBook>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerBook {
    pub selection_id: u64,
    #[allow(dead_code)]
    pub status: Option<String>,
    pub ex: Option<ExchangePrices>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangePrices {
    pub available_to_back: Option<Vec<PriceSize>>,
    pub available_to_lay: Option<Vec<PriceSize>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PriceSize {
    pub price: f64,
    #[allow(dead_code)]
    pub size: f64,
}

/// Top of the ladder for one runner.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BestPrices {
    pub back: Option<f64>,
    pub lay: Option<f64>,
}

impl BestPrices {
    /// Ladders arrive best-first.
    pub fn from_runner(runner: &RunnerBook) -> Self {
        let ex = runner.ex.as_ref();
        let first = |ladder: Option<&Vec<PriceSize>>| ladder.and_then(|l| l.first()).map(|p| p.price);
        Self {
            back: first(ex.and_then(|e| e.available_to_back.as_ref())),
            lay: first(ex.and_then(|e| e.available_to_lay.as_ref())),
        }
    }
}
