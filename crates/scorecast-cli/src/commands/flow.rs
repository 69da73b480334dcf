// `scorecast flow`: narrative blocks for one game.

use anyhow::{anyhow, Result};
use clap::Args;
use serde_json::json;

use scorecast_core::flow_index::FlowIndex;
use scorecast_core::model::game::GameId;

use super::timeline::load_detail;
use crate::render;
use crate::{App, OutputFormat};

#[derive(Debug, Args)]
pub struct FlowArgs {
    /// Game id.
    pub game_id: GameId,
}

pub async fn execute(args: FlowArgs, app: &App) -> Result<()> {
    let detail = load_detail(app, args.game_id).await?;
    let state = app.stores.flow.open(args.game_id).load().await;
    let flow = state.data.ok_or_else(|| {
        anyhow!(state
            .error
            .unwrap_or_else(|| "No narrative available for this game.".to_string()))
    })?;

    let index = FlowIndex::new(&flow, &detail.social_posts);
    let blocks = index.decorate();

    match app.format {
        OutputFormat::Json => {
            let value: Vec<serde_json::Value> = blocks
                .iter()
                .map(|b| {
                    json!({
                        "block": b.block,
                        "periodRange": b.period_range,
                        "embeddedPost": b.embedded_post,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            let settings = app.prefs.display_settings()?;
            print!(
                "{}",
                render::render_flow(&detail.game, &blocks, settings.hide_scores)
            );
        }
    }
    Ok(())
}
