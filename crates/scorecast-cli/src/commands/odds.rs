// `scorecast odds`: fair-odds comparison feed, optionally evaluating a
// parlay built from rows of the listing.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::json;

use scorecast_core::model::odds::{Bet, ParlayLeg};
use scorecast_core::odds::{
    format_price, probability_to_american, OddsFeed, OddsFormat, NO_FAIR_ODDS,
};
use scorecast_core::sync::paginate::Completion;

use crate::render;
use crate::{App, OutputFormat};

#[derive(Debug, Args)]
pub struct OddsArgs {
    /// Only bets for this league code, e.g. NBA.
    #[arg(long, short = 'l')]
    pub league: Option<String>,

    /// Stop after this many bets.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Evaluate a parlay from 1-based rows of the listing, e.g. "1,4".
    #[arg(long)]
    pub parlay: Option<String>,

    /// Price format. Defaults to the saved display settings.
    #[arg(long, value_parser = parse_odds_format)]
    pub odds_format: Option<OddsFormat>,
}

fn parse_odds_format(s: &str) -> Result<OddsFormat, String> {
    s.parse()
}

/// Parse "1,4" into zero-based row indices, rejecting rows outside
/// `1..=rows`.
pub fn parse_rows(list: &str, rows: usize) -> Result<Vec<usize>> {
    let mut out = Vec::new();
    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let row: usize = part
            .parse()
            .with_context(|| format!("invalid parlay row '{part}'"))?;
        if row == 0 || row > rows {
            bail!("parlay row {row} is out of range (1-{rows})");
        }
        if !out.contains(&(row - 1)) {
            out.push(row - 1);
        }
    }
    if out.len() < 2 {
        bail!("a parlay needs at least two distinct rows");
    }
    Ok(out)
}

pub fn parlay_legs(bets: &[Bet], rows: &[usize]) -> Vec<ParlayLeg> {
    rows.iter()
        .filter_map(|&row| bets.get(row))
        .map(ParlayLeg::from)
        .collect()
}

pub async fn execute(args: OddsArgs, app: &App) -> Result<()> {
    let settings = app.prefs.display_settings()?;
    let format = args.odds_format.unwrap_or(settings.odds_format);

    let feed = OddsFeed::new(app.api.clone(), app.config.paginator());
    let league = args.league.as_ref().map(|l| l.to_uppercase());
    // A failed batch leaves the pages that did load in the snapshot.
    let completion = feed.load(league, args.limit).await;
    let snapshot = feed.snapshot();
    if let Err(err) = &completion {
        if snapshot.bets.is_empty() {
            bail!(err.display_message());
        }
    }
    if matches!(completion, Ok(Completion::Cancelled)) {
        bail!("odds load was cancelled");
    }

    let evaluation = match &args.parlay {
        Some(list) => {
            let rows = parse_rows(list, snapshot.bets.len())?;
            let legs = parlay_legs(&snapshot.bets, &rows);
            let eval = app
                .api
                .evaluate_parlay(&legs)
                .await
                .map_err(|e| anyhow::anyhow!(e.display_message()))?;
            Some((rows, eval))
        }
        None => None,
    };

    match app.format {
        OutputFormat::Json => {
            let mut value = json!({
                "bets": snapshot.bets,
                "loaded": snapshot.progress.loaded,
                "total": snapshot.progress.total,
                "booksAvailable": snapshot.books_available,
                "error": snapshot.error,
            });
            if let Some((rows, eval)) = &evaluation {
                value["parlay"] = json!({
                    "rows": rows.iter().map(|r| r + 1).collect::<Vec<_>>(),
                    "evaluation": eval,
                });
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            print!("{}", render::render_odds(&snapshot, format));
            if let Some((rows, eval)) = &evaluation {
                let odds = eval
                    .fair_american_odds
                    .or_else(|| probability_to_american(eval.fair_probability))
                    .map(|price| format_price(price, format))
                    .unwrap_or_else(|| NO_FAIR_ODDS.to_string());
                println!(
                    "\nParlay ({} legs): fair probability {:.1}%, fair odds {odds}",
                    rows.len(),
                    eval.fair_probability * 100.0
                );
            }
        }
    }
    Ok(())
}
