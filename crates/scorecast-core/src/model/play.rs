// Play-by-play events.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Importance classification assigned upstream to every play.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    /// High-impact: scores, lead changes, ejections.
    Primary,
    /// Contextual: fouls, timeouts, substitutions of note. Plays that
    /// arrive without a tier land here.
    #[default]
    Secondary,
    /// Low-signal filler that gets collapsed in the timeline.
    Minor,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Primary, Tier::Secondary, Tier::Minor];

    pub fn number(self) -> u8 {
        match self {
            Tier::Primary => 1,
            Tier::Secondary => 2,
            Tier::Minor => 3,
        }
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Tier::Primary),
            2 => Ok(Tier::Secondary),
            3 => Ok(Tier::Minor),
            other => Err(format!("invalid tier {other}, expected 1, 2 or 3")),
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.number()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// An atomic game event. Never mutated after it is received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Play {
    /// Source-assigned sequence number. Not reliable for ordering when the
    /// upstream ingested the same game more than once.
    pub play_index: i64,
    #[serde(default, alias = "quarter")]
    pub period_label: Option<String>,
    #[serde(default)]
    pub game_clock: Option<String>,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub play_type: Option<String>,
    #[serde(default)]
    pub team_abbreviation: Option<String>,
}

impl Play {
    /// Home plus away score; missing scores count as zero. Saturates on
    /// absurd upstream values.
    pub fn combined_score(&self) -> u32 {
        self.home_score
            .unwrap_or(0)
            .saturating_add(self.away_score.unwrap_or(0))
    }
}

/// Envelope of `GET /games/{id}/pbp`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayByPlay {
    #[serde(default)]
    pub plays: Vec<Play>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_rejects_out_of_range() {
        let err = serde_json::from_str::<Tier>("4").unwrap_err();
        assert!(err.to_string().contains("invalid tier 4"));
    }

    #[test]
    fn play_defaults_missing_fields() {
        let play: Play = serde_json::from_str(r#"{ "playIndex": 7, "tier": 3 }"#).unwrap();
        assert_eq!(play.play_index, 7);
        assert_eq!(play.tier, Tier::Minor);
        assert!(play.period_label.is_none());
        assert_eq!(play.combined_score(), 0);
    }

    #[test]
    fn quarter_is_accepted_as_period_label() {
        let play: Play =
            serde_json::from_str(r#"{ "playIndex": 1, "quarter": "Q2", "homeScore": 10, "awayScore": 8 }"#)
                .unwrap();
        assert_eq!(play.period_label.as_deref(), Some("Q2"));
        assert_eq!(play.combined_score(), 18);
        assert_eq!(play.tier, Tier::Secondary);
    }

    #[test]
    fn combined_score_saturates() {
        let play: Play = serde_json::from_str(&format!(
            r#"{{ "playIndex": 2, "homeScore": {}, "awayScore": 5 }}"#,
            u32::MAX - 1
        ))
        .unwrap();
        assert_eq!(play.combined_score(), u32::MAX);
    }
}
