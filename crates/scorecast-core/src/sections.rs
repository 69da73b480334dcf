// Date-windowed game-list sections.

use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::api::GameQuery;

/// How far back the "Earlier" section reaches.
pub const EARLIER_LOOKBACK_DAYS: u64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameSection {
    Earlier,
    Yesterday,
    Today,
    Tomorrow,
}

impl GameSection {
    pub const ALL: [GameSection; 4] = [
        GameSection::Earlier,
        GameSection::Yesterday,
        GameSection::Today,
        GameSection::Tomorrow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GameSection::Earlier => "earlier",
            GameSection::Yesterday => "yesterday",
            GameSection::Today => "today",
            GameSection::Tomorrow => "tomorrow",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            GameSection::Earlier => "Earlier",
            GameSection::Yesterday => "Yesterday",
            GameSection::Today => "Today",
            GameSection::Tomorrow => "Tomorrow",
        }
    }

    /// Inclusive `(start, end)` dates covered by this section.
    pub fn date_window(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            GameSection::Earlier => (
                today - Days::new(EARLIER_LOOKBACK_DAYS),
                today - Days::new(2),
            ),
            GameSection::Yesterday => {
                let day = today - Days::new(1);
                (day, day)
            }
            GameSection::Today => (today, today),
            GameSection::Tomorrow => {
                let day = today + Days::new(1);
                (day, day)
            }
        }
    }

    /// Section a game date falls into, if any.
    pub fn classify(date: NaiveDate, today: NaiveDate) -> Option<GameSection> {
        GameSection::ALL.into_iter().find(|section| {
            let (start, end) = section.date_window(today);
            start <= date && date <= end
        })
    }
}

impl fmt::Display for GameSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameSection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameSection::ALL
            .into_iter()
            .find(|section| section.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown section `{s}`, expected earlier, yesterday, today or tomorrow")
            })
    }
}

/// Game-list cache key: a section, optionally narrowed to one league.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SectionKey {
    pub section: GameSection,
    pub league: Option<String>,
}

impl SectionKey {
    pub fn new(section: GameSection, league: Option<String>) -> Self {
        Self {
            section,
            league: league.map(|l| l.to_ascii_uppercase()),
        }
    }

    pub fn query(&self, today: NaiveDate) -> GameQuery {
        let (start_date, end_date) = self.section.date_window(today);
        GameQuery {
            start_date,
            end_date,
            league: self.league.clone(),
            limit: None,
        }
    }
}
