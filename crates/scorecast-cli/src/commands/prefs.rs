// `scorecast pin|unpin|read|settings`: local preferences.

use anyhow::Result;
use clap::Args;

use scorecast_core::model::game::GameId;
use scorecast_core::odds::OddsFormat;
use scorecast_core::prefs::{DisplaySettings, MAX_PINNED};
use scorecast_core::timeline::TierSet;

use crate::{App, OutputFormat};

#[derive(Debug, Args)]
pub struct GameArg {
    /// Game id.
    pub game_id: GameId,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Game id.
    pub game_id: GameId,

    /// Mark the game unread instead.
    #[arg(long)]
    pub unread: bool,
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    /// Tiers shown in timelines, e.g. "1,2".
    #[arg(long)]
    pub tiers: Option<TierSet>,

    /// "american" or "decimal".
    #[arg(long, value_parser = parse_odds_format)]
    pub odds_format: Option<OddsFormat>,

    /// Hide scores everywhere.
    #[arg(long)]
    pub hide_scores: Option<bool>,
}

fn parse_odds_format(s: &str) -> Result<OddsFormat, String> {
    s.parse()
}

impl SettingsArgs {
    fn is_empty(&self) -> bool {
        self.tiers.is_none() && self.odds_format.is_none() && self.hide_scores.is_none()
    }

    /// Overlay the given flags onto `settings`.
    fn apply(&self, settings: &mut DisplaySettings) {
        if let Some(tiers) = self.tiers {
            settings.visible_tiers = tiers;
        }
        if let Some(format) = self.odds_format {
            settings.odds_format = format;
        }
        if let Some(hide) = self.hide_scores {
            settings.hide_scores = hide;
        }
    }
}

pub fn pin(args: &GameArg, app: &App) -> Result<()> {
    if app.prefs.pin(args.game_id)? {
        println!("Pinned game {}.", args.game_id);
    } else {
        println!("Game {} is already pinned.", args.game_id);
    }
    let pinned = app.prefs.pinned()?;
    println!("{} of {MAX_PINNED} pins used.", pinned.len());
    Ok(())
}

pub fn unpin(args: &GameArg, app: &App) -> Result<()> {
    if app.prefs.unpin(args.game_id)? {
        println!("Unpinned game {}.", args.game_id);
    } else {
        println!("Game {} was not pinned.", args.game_id);
    }
    Ok(())
}

pub fn read(args: &ReadArgs, app: &App) -> Result<()> {
    if args.unread {
        app.prefs.mark_unread(args.game_id)?;
        println!("Marked game {} unread.", args.game_id);
    } else {
        app.prefs.mark_read(args.game_id)?;
        println!("Marked game {} read.", args.game_id);
    }
    Ok(())
}

pub fn settings(args: &SettingsArgs, app: &App) -> Result<()> {
    let mut settings = app.prefs.display_settings()?;
    if !args.is_empty() {
        args.apply(&mut settings);
        app.prefs.save_display_settings(&settings)?;
    }

    match app.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&settings)?),
        OutputFormat::Text => {
            println!("tiers:        {}", settings.visible_tiers);
            println!("odds format:  {}", settings.odds_format);
            println!("hide scores:  {}", settings.hide_scores);
        }
    }
    Ok(())
}
