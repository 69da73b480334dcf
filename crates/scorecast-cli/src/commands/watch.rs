// `scorecast watch`: follow a live game, re-rendering the timeline after
// every poll until the game reaches a terminal status or the user presses
// Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Args;
use tracing::{info, warn};

use scorecast_core::model::game::{GameDetail, GameId};
use scorecast_core::prefs::DisplaySettings;
use scorecast_core::sync::poll::{LivePollController, PollState};
use scorecast_core::timeline::{TierSet, Timeline};

use super::timeline::plays_for;
use crate::render;
use crate::{App, OutputFormat};

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Game id.
    pub game_id: GameId,

    /// Poll interval in seconds. Defaults to [poll] interval_secs.
    #[arg(long)]
    pub interval_secs: Option<u64>,

    /// Tiers to show. Defaults to the saved display settings.
    #[arg(long, short = 't')]
    pub tiers: Option<TierSet>,
}

impl WatchArgs {
    fn period(&self, fallback: Duration) -> Duration {
        match self.interval_secs {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => fallback,
        }
    }
}

async fn show(
    app: &App,
    detail: &GameDetail,
    tiers: &TierSet,
    settings: &DisplaySettings,
) -> Result<()> {
    let plays = plays_for(app, detail).await;
    let timeline = Timeline::reconstruct(&plays);
    match app.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&render::timeline_json(&timeline, tiers))?
            );
        }
        OutputFormat::Text => {
            println!(
                "{}",
                render::render_timeline(&detail.game, &timeline, tiers, settings.hide_scores)
            );
        }
    }
    Ok(())
}

pub async fn execute(args: WatchArgs, app: &App) -> Result<()> {
    let settings = app.prefs.display_settings()?;
    let tiers = args.tiers.unwrap_or(settings.visible_tiers);
    let period = args.period(app.config.poll_interval());

    let handle = app.stores.game_detail.open(args.game_id);
    let state = handle.load().await;
    let detail = state.data.ok_or_else(|| {
        anyhow!(state
            .error
            .unwrap_or_else(|| format!("Game {} not found.", args.game_id)))
    })?;
    show(app, &detail, &tiers, &settings).await?;

    let status = detail.game.status.clone();
    if !status.is_live() {
        println!("Game {} is {}; nothing to watch.", args.game_id, status);
        return Ok(());
    }

    let mut updates = handle.subscribe();
    updates.mark_unchanged();
    let controller = LivePollController::new(period);
    controller.start(args.game_id, status, Arc::new(handle));
    let Some(mut poll_state) = controller.watch_state(args.game_id) else {
        return Ok(());
    };
    info!(game = args.game_id, ?period, "watching live game");

    let mut last_shown = detail;
    loop {
        tokio::select! {
            biased;

            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if let Some(error) = snapshot.error.as_deref() {
                    warn!(game = args.game_id, "refresh failed: {error}");
                }
                let Some(detail) = snapshot.data else { continue };
                if detail == last_shown {
                    continue;
                }
                show(app, &detail, &tiers, &settings).await?;
                let finished = detail.game.status.is_terminal();
                last_shown = detail;
                if finished {
                    println!("Final.");
                    break;
                }
            }

            stopped = poll_state.wait_for(|s| *s == PollState::Stopped) => {
                if stopped.is_ok() {
                    info!(game = args.game_id, "poll session ended");
                }
                break;
            }

            _ = tokio::signal::ctrl_c() => {
                info!(game = args.game_id, "interrupted");
                break;
            }
        }
    }

    controller.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: WatchArgs,
    }

    #[test]
    fn interval_override() {
        let cli = TestCli::parse_from(["test", "7", "--interval-secs", "10"]);
        assert_eq!(cli.args.game_id, 7);
        assert_eq!(cli.args.period(Duration::from_secs(45)), Duration::from_secs(10));
    }

    #[test]
    fn zero_interval_falls_back_to_config() {
        let cli = TestCli::parse_from(["test", "7", "--interval-secs", "0"]);
        assert_eq!(cli.args.period(Duration::from_secs(45)), Duration::from_secs(45));

        let cli = TestCli::parse_from(["test", "7"]);
        assert_eq!(cli.args.period(Duration::from_secs(30)), Duration::from_secs(30));
    }
}
