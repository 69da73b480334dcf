// Upstream data API surface.
//
// `GameApi` is the seam between the sync layer and the network: the
// production implementation is `HttpApi`, tests substitute in-memory fakes.
// The fetcher adapters below plug a `GameApi` into the three resource
// stores.

pub mod client;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};

pub use client::HttpApi;

use crate::error::FetchError;
use crate::model::flow::FlowResponse;
use crate::model::game::{GameDetail, GameId, GameList};
use crate::model::odds::{OddsPage, ParlayEvaluation, ParlayLeg};
use crate::model::play::PlayByPlay;
use crate::sections::SectionKey;
use crate::sync::cache::CachePolicy;
use crate::sync::store::{Fetcher, ResourceKind, ResourceStore};

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Parameters of `GET /games`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GameQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub league: Option<String>,
    pub limit: Option<u32>,
}

impl GameQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("startDate", self.start_date.format("%Y-%m-%d").to_string()),
            ("endDate", self.end_date.format("%Y-%m-%d").to_string()),
        ];
        if let Some(league) = &self.league {
            params.push(("league", league.clone()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

/// Parameters of `GET /fairbet/odds`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OddsQuery {
    pub has_fair: bool,
    pub league: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl OddsQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("has_fair", self.has_fair.to_string()),
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
        ];
        if let Some(league) = &self.league {
            params.push(("league", league.clone()));
        }
        params
    }
}

// ---------------------------------------------------------------------------
// GameApi
// ---------------------------------------------------------------------------

#[async_trait]
pub trait GameApi: Send + Sync {
    async fn list_games(&self, query: &GameQuery) -> Result<GameList, FetchError>;

    async fn game_detail(&self, id: GameId) -> Result<GameDetail, FetchError>;

    async fn game_flow(&self, id: GameId) -> Result<FlowResponse, FetchError>;

    async fn game_pbp(&self, id: GameId) -> Result<PlayByPlay, FetchError>;

    async fn odds_page(&self, query: &OddsQuery) -> Result<OddsPage, FetchError>;

    async fn evaluate_parlay(&self, legs: &[ParlayLeg]) -> Result<ParlayEvaluation, FetchError>;
}

// ---------------------------------------------------------------------------
// Store adapters
// ---------------------------------------------------------------------------

pub struct GameDetailFetcher {
    api: Arc<dyn GameApi>,
}

#[async_trait]
impl Fetcher<GameId, GameDetail> for GameDetailFetcher {
    async fn fetch(&self, key: &GameId) -> Result<GameDetail, FetchError> {
        self.api.game_detail(*key).await
    }
}

pub struct FlowFetcher {
    api: Arc<dyn GameApi>,
}

#[async_trait]
impl Fetcher<GameId, FlowResponse> for FlowFetcher {
    async fn fetch(&self, key: &GameId) -> Result<FlowResponse, FetchError> {
        self.api.game_flow(*key).await
    }
}

/// Resolves a section key against the current local date at fetch time,
/// unless pinned to a fixed date.
pub struct GameListFetcher {
    api: Arc<dyn GameApi>,
    today: Option<NaiveDate>,
}

impl GameListFetcher {
    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[async_trait]
impl Fetcher<SectionKey, GameList> for GameListFetcher {
    async fn fetch(&self, key: &SectionKey) -> Result<GameList, FetchError> {
        self.api.list_games(&key.query(self.today())).await
    }
}

/// Cache policies for the three stores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorePolicies {
    pub game_detail: CachePolicy,
    pub flow: CachePolicy,
    pub game_list: CachePolicy,
}

impl Default for StorePolicies {
    fn default() -> Self {
        Self {
            game_detail: CachePolicy::game_detail(),
            flow: CachePolicy::flow(),
            game_list: CachePolicy::game_list(),
        }
    }
}

/// The process-wide resource stores, all backed by one `GameApi`.
#[derive(Clone)]
pub struct Stores {
    pub game_detail: Arc<ResourceStore<GameId, GameDetail>>,
    pub flow: Arc<ResourceStore<GameId, FlowResponse>>,
    pub game_list: Arc<ResourceStore<SectionKey, GameList>>,
}

impl Stores {
    pub fn new(api: Arc<dyn GameApi>, policies: StorePolicies) -> Self {
        Self::build(api, policies, None)
    }

    /// Like [`Stores::new`] but with game-list sections resolved against a
    /// fixed date.
    pub fn with_today(api: Arc<dyn GameApi>, policies: StorePolicies, today: NaiveDate) -> Self {
        Self::build(api, policies, Some(today))
    }

    fn build(api: Arc<dyn GameApi>, policies: StorePolicies, today: Option<NaiveDate>) -> Self {
        Self {
            game_detail: ResourceStore::new(
                ResourceKind::GameDetail,
                policies.game_detail,
                Arc::new(GameDetailFetcher {
                    api: Arc::clone(&api),
                }),
            ),
            flow: ResourceStore::new(
                ResourceKind::Flow,
                policies.flow,
                Arc::new(FlowFetcher {
                    api: Arc::clone(&api),
                }),
            ),
            game_list: ResourceStore::new(
                ResourceKind::GameList,
                policies.game_list,
                Arc::new(GameListFetcher { api, today }),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_query_params_skip_absent_filters() {
        let query = GameQuery {
            start_date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(),
            league: None,
            limit: Some(200),
        };
        assert_eq!(
            query.params(),
            vec![
                ("startDate", "2025-01-02".to_string()),
                ("endDate", "2025-01-03".to_string()),
                ("limit", "200".to_string()),
            ]
        );
    }

    #[test]
    fn odds_query_params() {
        let query = OddsQuery {
            has_fair: true,
            league: Some("NHL".into()),
            limit: 50,
            offset: 100,
        };
        let params = query.params();
        assert!(params.contains(&("has_fair", "true".to_string())));
        assert!(params.contains(&("offset", "100".to_string())));
        assert!(params.contains(&("league", "NHL".to_string())));
    }
}
