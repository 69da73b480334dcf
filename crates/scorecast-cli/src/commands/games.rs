// `scorecast games`: game lists by date section.

use anyhow::Result;
use clap::Args;
use serde_json::json;

use scorecast_core::sections::{GameSection, SectionKey};

use crate::render;
use crate::{App, OutputFormat};

#[derive(Debug, Args)]
pub struct GamesArgs {
    /// Section to show (earlier, yesterday, today, tomorrow). All when omitted.
    #[arg(long, short = 's')]
    pub section: Option<GameSection>,

    /// Only show one league, e.g. NBA.
    #[arg(long, short = 'l')]
    pub league: Option<String>,
}

pub async fn execute(args: GamesArgs, app: &App) -> Result<()> {
    let sections = match args.section {
        Some(section) => vec![section],
        None => GameSection::ALL.to_vec(),
    };

    let mut loaded = Vec::with_capacity(sections.len());
    for section in sections {
        let handle = app
            .stores
            .game_list
            .open(SectionKey::new(section, args.league.clone()));
        let state = handle.load().await;
        if let Some(error) = &state.error {
            eprintln!("{}: {error}", section.title());
        }
        let games = state.data.map(|list| list.games).unwrap_or_default();
        loaded.push((section, games));
    }

    match app.format {
        OutputFormat::Json => {
            let value: serde_json::Map<String, serde_json::Value> = loaded
                .iter()
                .map(|(section, games)| (section.to_string(), json!(games)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            let pinned = app.prefs.pinned()?;
            let read = app.prefs.read_games()?;
            let settings = app.prefs.display_settings()?;
            print!(
                "{}",
                render::render_games(&loaded, &pinned, &read, settings.hide_scores)
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn games_args_parsing() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            args: GamesArgs,
        }

        let cli = TestCli::parse_from(["test", "--section", "Yesterday", "-l", "nhl"]);
        assert_eq!(cli.args.section, Some(GameSection::Yesterday));
        assert_eq!(cli.args.league.as_deref(), Some("nhl"));

        assert!(TestCli::try_parse_from(["test", "--section", "someday"]).is_err());
    }
}
