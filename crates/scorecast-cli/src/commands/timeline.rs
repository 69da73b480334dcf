// `scorecast timeline`: reconstructed play-by-play for one game.

use anyhow::{anyhow, Result};
use clap::Args;
use tracing::warn;

use scorecast_core::model::game::{GameDetail, GameId};
use scorecast_core::model::play::Play;
use scorecast_core::timeline::{TierSet, Timeline};

use crate::render;
use crate::{App, OutputFormat};

#[derive(Debug, Args)]
pub struct TimelineArgs {
    /// Game id.
    pub game_id: GameId,

    /// Tiers to show, e.g. "1,2". Defaults to the saved display settings.
    #[arg(long, short = 't')]
    pub tiers: Option<TierSet>,

    /// Save --tiers as the default for future runs.
    #[arg(long, requires = "tiers")]
    pub remember: bool,

    /// Append team and player box scores.
    #[arg(long)]
    pub stats: bool,
}

/// Load game detail through the cache, surfacing the user-facing error
/// message when nothing could be loaded.
pub async fn load_detail(app: &App, id: GameId) -> Result<GameDetail> {
    let state = app.stores.game_detail.open(id).load().await;
    state
        .data
        .ok_or_else(|| anyhow!(state.error.unwrap_or_else(|| format!("Game {id} not found."))))
}

/// Plays embedded in the detail, or the separate play-by-play feed when the
/// detail carries none.
pub async fn plays_for(app: &App, detail: &GameDetail) -> Vec<Play> {
    if !detail.plays.is_empty() {
        return detail.plays.clone();
    }
    match app.api.game_pbp(detail.game.id).await {
        Ok(pbp) => pbp.plays,
        Err(err) => {
            warn!(game = detail.game.id, "play-by-play fetch failed: {err}");
            Vec::new()
        }
    }
}

pub async fn execute(args: TimelineArgs, app: &App) -> Result<()> {
    let detail = load_detail(app, args.game_id).await?;
    let plays = plays_for(app, &detail).await;

    let mut settings = app.prefs.display_settings()?;
    let tiers = args.tiers.unwrap_or(settings.visible_tiers);
    if args.remember {
        settings.visible_tiers = tiers;
        app.prefs.save_display_settings(&settings)?;
    }

    let timeline = Timeline::reconstruct(&plays);
    match app.format {
        OutputFormat::Json => {
            let mut value = render::timeline_json(&timeline, &tiers);
            if args.stats {
                value["boxScore"] = render::box_score_json(&detail);
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            print!(
                "{}",
                render::render_timeline(&detail.game, &timeline, &tiers, settings.hide_scores)
            );
            if args.stats {
                print!("{}", render::render_box_score(&detail));
            }
        }
    }
    Ok(())
}
