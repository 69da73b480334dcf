// Odds payloads: per-game odds entries and the fairbet comparison feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::game::GameId;

/// A single book line attached to a game detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsEntry {
    pub book: String,
    pub market_type: String,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub line: Option<f64>,
    #[serde(default)]
    pub price: Option<i32>,
    #[serde(default)]
    pub is_closing_line: bool,
}

/// A book's American price for one bet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookPrice {
    pub book: String,
    pub price: i32,
    #[serde(default)]
    pub ev_percent: Option<f64>,
}

/// One comparable bet across books. Fair values are computed upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub game_id: GameId,
    pub league_code: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub game_date: Option<DateTime<Utc>>,
    pub market_key: String,
    pub selection_key: String,
    #[serde(default)]
    pub line_value: Option<f64>,
    #[serde(default)]
    pub books: Vec<BookPrice>,
    #[serde(default)]
    pub true_prob: Option<f64>,
    #[serde(default)]
    pub fair_american_odds: Option<i32>,
    #[serde(default)]
    pub ev_percent: Option<f64>,
}

/// One page of `GET /fairbet/odds`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OddsPage {
    #[serde(default)]
    pub bets: Vec<Bet>,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub books_available: Vec<String>,
}

/// A leg submitted to `POST /fairbet/parlay/evaluate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParlayLeg {
    pub game_id: GameId,
    pub market_key: String,
    pub selection_key: String,
    #[serde(default)]
    pub line_value: Option<f64>,
    #[serde(default)]
    pub true_prob: Option<f64>,
}

impl From<&Bet> for ParlayLeg {
    fn from(bet: &Bet) -> Self {
        ParlayLeg {
            game_id: bet.game_id,
            market_key: bet.market_key.clone(),
            selection_key: bet.selection_key.clone(),
            line_value: bet.line_value,
            true_prob: bet.true_prob,
        }
    }
}

/// Upstream evaluation of a parlay. Not recomputed client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParlayEvaluation {
    pub fair_probability: f64,
    #[serde(default)]
    pub fair_american_odds: Option<i32>,
}
