// Odds presentation and the paged fairbet feed.
//
// Fair probabilities and EV are computed upstream. The only arithmetic
// done here is converting a probability into American odds when upstream
// sent a probability without a precomputed price, and converting between
// display formats.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::api::{GameApi, OddsQuery};
use crate::error::FetchError;
use crate::model::odds::{Bet, BookPrice};
use crate::sync::generation::GenerationCounter;
use crate::sync::paginate::{Collection, Completion, Page, Paginator, Progress};

/// Shown when no fair price can be derived.
pub const NO_FAIR_ODDS: &str = "--";

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OddsFormat {
    #[default]
    American,
    Decimal,
}

impl FromStr for OddsFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "american" => Ok(OddsFormat::American),
            "decimal" => Ok(OddsFormat::Decimal),
            other => Err(format!("unknown odds format `{other}`")),
        }
    }
}

impl fmt::Display for OddsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OddsFormat::American => f.write_str("american"),
            OddsFormat::Decimal => f.write_str("decimal"),
        }
    }
}

/// `150` → `"+150"`, `-120` → `"-120"`.
pub fn format_american(price: i32) -> String {
    if price > 0 {
        format!("+{price}")
    } else {
        price.to_string()
    }
}

/// Decimal odds for an American price. `None` for the meaningless `0`.
pub fn american_to_decimal(price: i32) -> Option<f64> {
    match price {
        0 => None,
        p if p > 0 => Some(1.0 + f64::from(p) / 100.0),
        p => Some(1.0 + 100.0 / f64::from(p).abs()),
    }
}

pub fn format_price(price: i32, format: OddsFormat) -> String {
    match format {
        OddsFormat::American => format_american(price),
        OddsFormat::Decimal => american_to_decimal(price)
            .map(|d| format!("{d:.2}"))
            .unwrap_or_else(|| NO_FAIR_ODDS.to_string()),
    }
}

/// American odds for a win probability strictly between 0 and 1.
pub fn probability_to_american(p: f64) -> Option<i32> {
    if !(p > 0.0 && p < 1.0) {
        return None;
    }
    let odds = if p >= 0.5 {
        -(100.0 * p / (1.0 - p)).round()
    } else {
        (100.0 * (1.0 - p) / p).round()
    };
    Some(odds as i32)
}

/// Precomputed fair odds, else the converted true probability, else
/// [`NO_FAIR_ODDS`].
pub fn fair_odds_display(bet: &Bet) -> String {
    bet.fair_american_odds
        .or_else(|| bet.true_prob.and_then(probability_to_american))
        .map(format_american)
        .unwrap_or_else(|| NO_FAIR_ODDS.to_string())
}

/// `3.21` → `"+3.2%"`.
pub fn format_ev(ev_percent: f64) -> String {
    format!("{ev_percent:+.1}%")
}

/// The book offering the highest American price.
pub fn best_price(bet: &Bet) -> Option<&BookPrice> {
    bet.books.iter().max_by_key(|b| b.price)
}

// ---------------------------------------------------------------------------
// OddsFeed
// ---------------------------------------------------------------------------

/// Snapshot of the feed for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct OddsCollection {
    pub bets: Vec<Bet>,
    pub progress: Progress,
    pub books_available: Vec<String>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Paged `/fairbet/odds` loader. Starting a new load cancels the previous
/// one.
pub struct OddsFeed {
    api: Arc<dyn GameApi>,
    paginator: Paginator,
    generation: GenerationCounter,
    state: watch::Sender<Collection<Bet>>,
    books: Mutex<Vec<String>>,
}

impl OddsFeed {
    pub fn new(api: Arc<dyn GameApi>, paginator: Paginator) -> Self {
        let (state, _rx) = watch::channel(Collection::default());
        Self {
            api,
            paginator,
            generation: GenerationCounter::new(),
            state,
            books: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Collection<Bet>> {
        self.state.subscribe()
    }

    pub fn books_available(&self) -> Vec<String> {
        self.books.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn snapshot(&self) -> OddsCollection {
        let state = self.state.borrow();
        OddsCollection {
            bets: state.items.clone(),
            progress: state.progress(),
            books_available: self.books_available(),
            loading: state.loading,
            error: state.error.clone(),
        }
    }

    /// Load every bet with a fair price, optionally narrowed to one league
    /// and capped at `limit` bets.
    pub async fn load(
        &self,
        league: Option<String>,
        limit: Option<usize>,
    ) -> Result<Completion, FetchError> {
        let token = self.generation.advance();
        let cap = limit.unwrap_or(usize::MAX);
        let first_books: Mutex<Option<Vec<String>>> = Mutex::new(None);
        info!(generation = token.value(), ?league, ?limit, "loading odds feed");

        let completion = self
            .paginator
            .fetch_all(&token, &self.state, |req| {
                let api = Arc::clone(&self.api);
                let query = OddsQuery {
                    has_fair: true,
                    league: league.clone(),
                    limit: req.limit,
                    offset: req.offset,
                };
                let first_books = &first_books;
                async move {
                    let page = api.odds_page(&query).await?;
                    if query.offset == 0 {
                        *first_books.lock().unwrap_or_else(|e| e.into_inner()) =
                            Some(page.books_available);
                    }
                    Ok::<_, FetchError>(Page {
                        items: page.bets,
                        total: page.total.min(cap),
                    })
                }
            })
            .await;

        if token.is_current() {
            if let Some(books) = first_books.into_inner().unwrap_or_else(|e| e.into_inner()) {
                *self.books.lock().unwrap_or_else(|e| e.into_inner()) = books;
            }
            if limit.is_some() {
                self.state.send_if_modified(|c| {
                    let over = c.items.len() > cap;
                    c.items.truncate(cap);
                    over
                });
            }
        }

        let completion = completion?;
        debug!(?completion, loaded = self.state.borrow().items.len(), "odds feed finished");
        Ok(completion)
    }

    /// Abandon the in-flight load, if any. Bets already loaded stay.
    pub fn cancel(&self) {
        self.generation.invalidate();
        let settled = self.state.send_if_modified(|c| {
            let was_loading = c.loading;
            c.loading = false;
            was_loading
        });
        if settled {
            debug!("odds feed load cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bet(fair: Option<i32>, prob: Option<f64>, prices: &[i32]) -> Bet {
        Bet {
            game_id: 1,
            league_code: "NBA".into(),
            home_team: "Celtics".into(),
            away_team: "Knicks".into(),
            game_date: None,
            market_key: "h2h".into(),
            selection_key: "home".into(),
            line_value: None,
            books: prices
                .iter()
                .enumerate()
                .map(|(i, p)| BookPrice {
                    book: format!("book{i}"),
                    price: *p,
                    ev_percent: None,
                })
                .collect(),
            true_prob: prob,
            fair_american_odds: fair,
            ev_percent: None,
        }
    }

    #[test]
    fn american_formatting_has_explicit_sign() {
        assert_eq!(format_american(150), "+150");
        assert_eq!(format_american(-120), "-120");
    }

    #[test]
    fn probability_conversion() {
        assert_eq!(probability_to_american(0.5), Some(-100));
        assert_eq!(probability_to_american(0.75), Some(-300));
        assert_eq!(probability_to_american(0.25), Some(300));
        assert_eq!(probability_to_american(0.0), None);
        assert_eq!(probability_to_american(1.0), None);
        assert_eq!(probability_to_american(f64::NAN), None);
    }

    #[test]
    fn fair_odds_prefers_precomputed_value() {
        assert_eq!(fair_odds_display(&bet(Some(-110), Some(0.25), &[])), "-110");
        assert_eq!(fair_odds_display(&bet(None, Some(0.25), &[])), "+300");
        assert_eq!(fair_odds_display(&bet(None, None, &[])), NO_FAIR_ODDS);
    }

    #[test]
    fn best_price_is_highest_american_number() {
        let b = bet(None, None, &[-115, -105, -110]);
        assert_eq!(best_price(&b).map(|p| p.price), Some(-105));
        assert!(best_price(&bet(None, None, &[])).is_none());
    }

    #[test]
    fn decimal_conversion() {
        assert_eq!(format_price(150, OddsFormat::Decimal), "2.50");
        assert_eq!(format_price(-200, OddsFormat::Decimal), "1.50");
        assert_eq!(format_price(0, OddsFormat::Decimal), NO_FAIR_ODDS);
        assert_eq!(format_ev(3.21), "+3.2%");
        assert_eq!(format_ev(-0.5), "-0.5%");
    }
}
