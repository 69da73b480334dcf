// Flow (narrative) payloads produced upstream.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A play as referenced by flow blocks. Carries a numeric period rather
/// than a display label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowPlay {
    pub play_id: i64,
    pub play_index: i64,
    pub period: u32,
    #[serde(default)]
    pub clock: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,
}

/// Dramatic role of a block within the game narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockRole {
    Setup,
    MomentumShift,
    Response,
    DecisionPoint,
    Resolution,
    Unknown,
}

impl BlockRole {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockRole::Setup => "setup",
            BlockRole::MomentumShift => "momentum_shift",
            BlockRole::Response => "response",
            BlockRole::DecisionPoint => "decision_point",
            BlockRole::Resolution => "resolution",
            BlockRole::Unknown => "unknown",
        }
    }

    /// Short heading used by renderers.
    pub fn label(self) -> &'static str {
        match self {
            BlockRole::Setup => "Setup",
            BlockRole::MomentumShift => "Momentum Shift",
            BlockRole::Response => "Response",
            BlockRole::DecisionPoint => "Decision Point",
            BlockRole::Resolution => "Resolution",
            BlockRole::Unknown => "",
        }
    }
}

impl From<String> for BlockRole {
    fn from(raw: String) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "setup" => BlockRole::Setup,
            "momentum_shift" => BlockRole::MomentumShift,
            "response" => BlockRole::Response,
            "decision_point" => BlockRole::DecisionPoint,
            "resolution" => BlockRole::Resolution,
            _ => BlockRole::Unknown,
        }
    }
}

impl From<BlockRole> for String {
    fn from(role: BlockRole) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for BlockRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorePair {
    pub home: u32,
    pub away: u32,
}

/// A narrative paragraph covering a contiguous range of plays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowBlock {
    pub block_index: u32,
    #[serde(default = "unknown_role")]
    pub role: BlockRole,
    #[serde(default)]
    pub narrative: String,
    #[serde(default)]
    pub play_ids: Vec<i64>,
    #[serde(default)]
    pub score_before: ScorePair,
    #[serde(default)]
    pub score_after: ScorePair,
    #[serde(default)]
    pub embedded_social_post_id: Option<i64>,
}

fn unknown_role() -> BlockRole {
    BlockRole::Unknown
}

/// Response of `GET /games/{id}/flow`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowResponse {
    #[serde(default)]
    pub plays: Vec<FlowPlay>,
    #[serde(default)]
    pub blocks: Vec<FlowBlock>,
}
