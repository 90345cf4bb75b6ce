use super::auth::{self, ExchangeCredentials, SessionToken};
use super::types::*;
use super::{ExchangeSession, MarketFeed, SearchWindow, SessionProvider};
use crate::errors::{EngineError, EngineResult};
use reqwest::Client;

/// Exchange REST client. Holds credentials; opens one session per cycle.
#[derive(Clone)]
pub struct ExchangeClient {
    client: Client,
    identity_url: String,
    betting_url: String,
    credentials: ExchangeCredentials,
}

impl ExchangeClient {
    pub fn new(
        identity_url: &str,
        betting_url: &str,
        credentials: ExchangeCredentials,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .pool_max_idle_per_host(4)
                .build()
                .unwrap_or_default(),
            identity_url: identity_url.trim_end_matches('/').to_string(),
            betting_url: betting_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }
}

impl SessionProvider for ExchangeClient {
    type Session = BettingSession;

    async fn login(&self) -> EngineResult<BettingSession> {
        let token = auth::login(&self.client, &self.identity_url, &self.credentials).await?;
        tracing::info!(user = %self.credentials.username, "exchange session opened");
        Ok(BettingSession {
            client: self.client.clone(),
            identity_url: self.identity_url.clone(),
            betting_url: self.betting_url.clone(),
            locale: self.credentials.locale.clone(),
            token,
        })
    }
}

/// Authenticated betting-API session. Shared read-only by resolution tasks,
/// closed with `logout` at cycle end.
pub struct BettingSession {
    client: Client,
    identity_url: String,
    betting_url: String,
    locale: String,
    token: SessionToken,
}

impl BettingSession {
    async fn post<B, T>(&self, operation: &str, body: &B) -> EngineResult<T>
    where
        B: serde::Serialize,
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}/{}/", self.betting_url, operation);
        let resp = self
            .token
            .apply(self.client.post(&url))
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::Api {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| EngineError::Parse(format!("POST {operation}: {e}")))
    }
}

impl ExchangeSession for BettingSession {
    async fn logout(self) -> EngineResult<()> {
        auth::logout(&self.client, &self.identity_url, &self.token).await?;
        tracing::info!("exchange session closed");
        Ok(())
    }
}

impl MarketFeed for BettingSession {
    async fn search_markets(
        &self,
        query: &str,
        window: &SearchWindow,
    ) -> EngineResult<Vec<MarketCatalogue>> {
        let req = ListMarketCatalogueRequest {
            filter: MarketFilter {
                text_query: Some(query.to_string()),
                market_start_time: Some(TimeRange {
                    from: window.from.format("%Y-%m-%dT00:00:00Z").to_string(),
                    to: window.to.format("%Y-%m-%dT00:00:00Z").to_string(),
                }),
                ..Default::default()
            },
            market_projection: vec!["EVENT", "MARKET_DESCRIPTION"],
            max_results: 1000,
            locale: Some(self.locale.clone()),
        };
        self.post("listMarketCatalogue", &req).await
    }

    async fn market_runners(&self, market_id: &str) -> EngineResult<Vec<RunnerCatalog>> {
        let req = ListMarketCatalogueRequest {
            filter: MarketFilter {
                market_ids: Some(vec![market_id.to_string()]),
                ..Default::default()
            },
            market_projection: vec!["RUNNER_DESCRIPTION", "RUNNER_METADATA"],
            max_results: 1,
            locale: Some(self.locale.clone()),
        };
        let catalogues: Vec<MarketCatalogue> = self.post("listMarketCatalogue", &req).await?;
        catalogues
            .into_iter()
            .next()
            .and_then(|c| c.runners)
            .ok_or_else(|| EngineError::SourceUnavailable(format!("no runners for market {market_id}")))
    }

    async fn best_prices(&self, market_id: &str, selection_id: u64) -> EngineResult<BestPrices> {
        let req = ListRunnerBookRequest {
            market_id: market_id.to_string(),
            selection_id,
            price_projection: PriceProjection { price_data: vec!["EX_BEST_OFFERS"] },
        };
        let books: Vec<MarketBook> = self.post("listRunnerBook", &req).await?;
        books
            .iter()
            .flat_map(|b| b.runners.iter().flatten())
            .find(|r| r.selection_id == selection_id)
            .map(BestPrices::from_runner)
            .ok_or_else(|| {
                EngineError::SourceUnavailable(format!(
                    "no book for runner {selection_id} in market {market_id}"
                ))
            })
    }
}
