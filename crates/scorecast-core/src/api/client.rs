// HTTP implementation of `GameApi` over reqwest.
//
// Plain request/response JSON. No retries: the poller and the user's own
// refetch are the retry mechanism.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::{GameApi, GameQuery, OddsQuery};
use crate::error::FetchError;
use crate::model::flow::FlowResponse;
use crate::model::game::{GameDetail, GameId, GameList};
use crate::model::odds::{OddsPage, ParlayEvaluation, ParlayLeg};
use crate::model::play::PlayByPlay;

const API_KEY_HEADER: &str = "X-API-Key";

/// Upper bound on how much of an error body is kept for diagnostics.
const MAX_ERROR_BODY: usize = 512;

pub struct HttpApi {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpApi {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.header(API_KEY_HEADER, key),
            None => req,
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.http.get(self.url(path)))
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, FetchError> {
        let response = req.send().await?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "api response");

        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl GameApi for HttpApi {
    async fn list_games(&self, query: &GameQuery) -> Result<GameList, FetchError> {
        self.send_json(self.get("/games").query(&query.params())).await
    }

    async fn game_detail(&self, id: GameId) -> Result<GameDetail, FetchError> {
        self.send_json(self.get(&format!("/games/{id}"))).await
    }

    async fn game_flow(&self, id: GameId) -> Result<FlowResponse, FetchError> {
        self.send_json(self.get(&format!("/games/{id}/flow"))).await
    }

    async fn game_pbp(&self, id: GameId) -> Result<PlayByPlay, FetchError> {
        self.send_json(self.get(&format!("/games/{id}/pbp"))).await
    }

    async fn odds_page(&self, query: &OddsQuery) -> Result<OddsPage, FetchError> {
        self.send_json(self.get("/fairbet/odds").query(&query.params()))
            .await
    }

    async fn evaluate_parlay(&self, legs: &[ParlayLeg]) -> Result<ParlayEvaluation, FetchError> {
        let req = self
            .authorize(self.http.post(self.url("/fairbet/parlay/evaluate")))
            .json(&json!({ "legs": legs }));
        self.send_json(req).await
    }
}
