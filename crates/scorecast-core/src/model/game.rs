// Game listing and game detail payloads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::odds::OddsEntry;
use super::play::Play;

/// Upstream game identifier.
pub type GameId = i64;

// ---------------------------------------------------------------------------
// GameStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a game as reported upstream.
///
/// Unrecognized strings are preserved in `Other` so they round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GameStatus {
    Scheduled,
    Pregame,
    InProgress,
    Final,
    Completed,
    Archived,
    Postponed,
    Canceled,
    Other(String),
}

impl GameStatus {
    /// True only while the game is being played. Drives live polling.
    pub fn is_live(&self) -> bool {
        matches!(self, GameStatus::InProgress)
    }

    /// True once no further updates are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GameStatus::Final | GameStatus::Completed | GameStatus::Archived
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            GameStatus::Scheduled => "scheduled",
            GameStatus::Pregame => "pregame",
            GameStatus::InProgress => "in_progress",
            GameStatus::Final => "final",
            GameStatus::Completed => "completed",
            GameStatus::Archived => "archived",
            GameStatus::Postponed => "postponed",
            GameStatus::Canceled => "canceled",
            GameStatus::Other(s) => s,
        }
    }
}

impl From<String> for GameStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "scheduled" => GameStatus::Scheduled,
            "pregame" => GameStatus::Pregame,
            "in_progress" | "inprogress" | "live" => GameStatus::InProgress,
            "final" => GameStatus::Final,
            "completed" => GameStatus::Completed,
            "archived" => GameStatus::Archived,
            "postponed" => GameStatus::Postponed,
            "canceled" | "cancelled" => GameStatus::Canceled,
            _ => GameStatus::Other(raw),
        }
    }
}

impl From<GameStatus> for String {
    fn from(status: GameStatus) -> Self {
        match status {
            GameStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Listing & detail
// ---------------------------------------------------------------------------

/// One row of `GET /games`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub id: GameId,
    pub league_code: String,
    pub game_date: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,
    pub status: GameStatus,
    #[serde(default)]
    pub has_pbp: bool,
    #[serde(default)]
    pub has_flow: bool,
}

/// Envelope of `GET /games`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameList {
    #[serde(default)]
    pub games: Vec<GameSummary>,
}

/// Team box-score line. `stats` is loosely shaped and read through the
/// alias table in [`super::stats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStats {
    pub team: String,
    #[serde(default)]
    pub is_home: bool,
    #[serde(default)]
    pub stats: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStat {
    pub team: String,
    pub player_name: String,
    #[serde(default)]
    pub stats: serde_json::Value,
}

/// A social post that flow blocks may embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialPost {
    pub id: i64,
    pub post_url: String,
    #[serde(default)]
    pub team_abbreviation: Option<String>,
    #[serde(default)]
    pub tweet_text: Option<String>,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
}

/// Response of `GET /games/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDetail {
    pub game: GameSummary,
    #[serde(default)]
    pub team_stats: Vec<TeamStats>,
    #[serde(default)]
    pub player_stats: Vec<PlayerStat>,
    #[serde(default)]
    pub odds: Vec<OddsEntry>,
    #[serde(default)]
    pub social_posts: Vec<SocialPost>,
    #[serde(default)]
    pub plays: Vec<Play>,
}
