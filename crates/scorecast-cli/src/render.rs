// Plain-text and JSON rendering for command output.
//
// Everything here is a pure function from core types to a `String` or a
// `serde_json::Value` so output can be checked in tests without a terminal.

use std::collections::BTreeSet;
use std::fmt::Write;

use serde_json::{json, Value};

use scorecast_core::flow_index::DecoratedBlock;
use scorecast_core::model::game::{GameDetail, GameId, GameSummary};
use scorecast_core::model::play::Play;
use scorecast_core::model::stats::{self, StatField};
use scorecast_core::odds::{
    best_price, fair_odds_display, format_ev, format_price, OddsCollection, OddsFormat,
};
use scorecast_core::sections::GameSection;
use scorecast_core::timeline::{PeriodItem, TierSet, Timeline};

const HIDDEN_SCORE: &str = "--";

fn score(game: &GameSummary, hide_scores: bool) -> String {
    if hide_scores {
        return HIDDEN_SCORE.to_string();
    }
    match (game.away_score, game.home_score) {
        (Some(away), Some(home)) => format!("{away}-{home}"),
        _ => HIDDEN_SCORE.to_string(),
    }
}

/// Away team first, as in "Knicks @ Celtics".
pub fn matchup(game: &GameSummary) -> String {
    format!("{} @ {}", game.away_team, game.home_team)
}

pub fn game_line(game: &GameSummary, pinned: bool, read: bool, hide_scores: bool) -> String {
    let marker = match (pinned, read) {
        (true, _) => '*',
        (false, false) => '+',
        (false, true) => ' ',
    };
    format!(
        "{marker} {:>8}  {:<4} {:<44} {:>7}  {}",
        game.id,
        game.league_code,
        matchup(game),
        score(game, hide_scores),
        game.status
    )
}

/// Game lists grouped by section. Pinned games sort to the top of their
/// section in pin order; `+` marks unread games.
pub fn render_games(
    sections: &[(GameSection, Vec<GameSummary>)],
    pinned: &[GameId],
    read: &BTreeSet<GameId>,
    hide_scores: bool,
) -> String {
    let mut out = String::new();
    for (section, games) in sections {
        let _ = writeln!(out, "{}", section.title());
        if games.is_empty() {
            let _ = writeln!(out, "  (no games)");
            continue;
        }
        let mut ordered: Vec<&GameSummary> = games.iter().collect();
        ordered.sort_by_key(|g| {
            let pin_rank = pinned.iter().position(|p| *p == g.id).unwrap_or(usize::MAX);
            (pin_rank, g.game_date)
        });
        for game in ordered {
            let is_pinned = pinned.contains(&game.id);
            let _ = writeln!(
                out,
                "{}",
                game_line(game, is_pinned, read.contains(&game.id), hide_scores)
            );
        }
        out.push('\n');
    }
    out
}

fn play_line(play: &Play, hide_scores: bool) -> String {
    let clock = play.game_clock.as_deref().unwrap_or("");
    let score = if hide_scores {
        String::new()
    } else {
        format!(
            "{}-{}",
            play.away_score.unwrap_or(0),
            play.home_score.unwrap_or(0)
        )
    };
    let team = play
        .team_abbreviation
        .as_deref()
        .map(|t| format!("{t} "))
        .unwrap_or_default();
    format!("  [{}] {clock:>6}  {score:>7}  {team}{}", play.tier, play.description)
}

pub fn render_timeline(
    game: &GameSummary,
    timeline: &Timeline<'_>,
    tiers: &TierSet,
    hide_scores: bool,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}  {}  ({})",
        matchup(game),
        score(game, hide_scores),
        game.status
    );
    let _ = writeln!(out, "{} plays, showing tiers {tiers}", timeline.play_count());

    let periods = timeline.visible(tiers);
    if periods.is_empty() {
        let _ = writeln!(out, "\nNo plays to show.");
        return out;
    }
    for period in periods {
        let _ = writeln!(out, "\n-- {} --", period.label);
        for item in period.items {
            match item {
                PeriodItem::Play(play) => {
                    let _ = writeln!(out, "{}", play_line(play, hide_scores));
                }
                PeriodItem::Minor(group) => {
                    let _ = writeln!(out, "  ...  {}", group.summary());
                }
            }
        }
    }
    out
}

pub fn timeline_json(timeline: &Timeline<'_>, tiers: &TierSet) -> Value {
    let periods: Vec<Value> = timeline
        .visible(tiers)
        .into_iter()
        .map(|period| {
            let items: Vec<Value> = period
                .items
                .iter()
                .map(|item| match item {
                    PeriodItem::Play(play) => json!({ "type": "play", "play": play }),
                    PeriodItem::Minor(group) => json!({
                        "type": "minor_group",
                        "summary": group.summary(),
                        "plays": group.plays(),
                    }),
                })
                .collect();
            json!({ "period": period.label, "items": items })
        })
        .collect();
    json!({ "playCount": timeline.play_count(), "periods": periods })
}

fn stat_line(out: &mut String, name: &str, stats: &Value, columns: &[&StatField]) {
    let _ = write!(out, "  {name:<24}");
    for (field, cell) in columns.iter().zip(stats::row(stats, columns)) {
        let width = field.label.len().max(5);
        let _ = write!(out, " {:>width$}", cell.as_deref().unwrap_or("-"));
    }
    out.push('\n');
}

fn stat_header(out: &mut String, title: &str, columns: &[&StatField]) {
    let _ = write!(out, "\n  {title:<24}");
    for field in columns {
        let width = field.label.len().max(5);
        let _ = write!(out, " {:>width$}", field.label);
    }
    out.push('\n');
}

/// Team and player box scores. Only columns with a value somewhere in the
/// section are shown.
pub fn render_box_score(detail: &GameDetail) -> String {
    let mut out = String::new();
    if detail.team_stats.is_empty() && detail.player_stats.is_empty() {
        let _ = writeln!(out, "\nNo box score available.");
        return out;
    }

    let team_columns = stats::present_fields(detail.team_stats.iter().map(|t| &t.stats));
    if !team_columns.is_empty() {
        stat_header(&mut out, "Team", &team_columns);
        for team in &detail.team_stats {
            stat_line(&mut out, &team.team, &team.stats, &team_columns);
        }
    }

    let player_columns = stats::present_fields(detail.player_stats.iter().map(|p| &p.stats));
    if !player_columns.is_empty() {
        stat_header(&mut out, "Player", &player_columns);
        for player in &detail.player_stats {
            let name = format!("{} ({})", player.player_name, player.team);
            stat_line(&mut out, &name, &player.stats, &player_columns);
        }
    }
    out
}

/// Box scores keyed by logical stat name, so consumers never see upstream
/// aliases.
pub fn box_score_json(detail: &GameDetail) -> Value {
    let normalized = |values: &Value| -> Value {
        let map: serde_json::Map<String, Value> = stats::STAT_FIELDS
            .iter()
            .filter_map(|field| {
                stats::resolve_display(values, field.key).map(|v| (field.key.to_string(), json!(v)))
            })
            .collect();
        Value::Object(map)
    };
    let teams: Vec<Value> = detail
        .team_stats
        .iter()
        .map(|t| json!({ "team": t.team, "isHome": t.is_home, "stats": normalized(&t.stats) }))
        .collect();
    let players: Vec<Value> = detail
        .player_stats
        .iter()
        .map(|p| json!({ "team": p.team, "player": p.player_name, "stats": normalized(&p.stats) }))
        .collect();
    json!({ "teams": teams, "players": players })
}

pub fn render_flow(game: &GameSummary, blocks: &[DecoratedBlock<'_>], hide_scores: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", matchup(game));
    if blocks.is_empty() {
        let _ = writeln!(out, "\nNo narrative available yet.");
        return out;
    }
    for decorated in blocks {
        let block = decorated.block;
        let heading = match (block.role.label(), decorated.period_range.as_deref()) {
            ("", Some(range)) => range.to_string(),
            ("", None) => format!("Block {}", block.block_index + 1),
            (role, Some(range)) => format!("{role} \u{b7} {range}"),
            (role, None) => role.to_string(),
        };
        let _ = writeln!(out, "\n{heading}");
        if !hide_scores {
            let _ = writeln!(
                out,
                "  {}-{} -> {}-{}",
                block.score_before.away,
                block.score_before.home,
                block.score_after.away,
                block.score_after.home
            );
        }
        let _ = writeln!(out, "  {}", block.narrative);
        if let Some(post) = decorated.embedded_post {
            let who = post.team_abbreviation.as_deref().unwrap_or("post");
            if let Some(text) = post.tweet_text.as_deref() {
                let _ = writeln!(out, "  > [{who}] {text}");
            }
            let _ = writeln!(out, "  > {}", post.post_url);
        }
    }
    out
}

pub fn render_odds(collection: &OddsCollection, format: OddsFormat) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} bets loaded ({}), books: {}",
        collection.bets.len(),
        collection.progress,
        if collection.books_available.is_empty() {
            "-".to_string()
        } else {
            collection.books_available.join(", ")
        }
    );
    if let Some(error) = &collection.error {
        let _ = writeln!(out, "error: {error}");
    }
    for (row, bet) in collection.bets.iter().enumerate() {
        let best = best_price(bet)
            .map(|b| format!("{} {}", format_price(b.price, format), b.book))
            .unwrap_or_else(|| "-".to_string());
        let ev = bet.ev_percent.map(format_ev).unwrap_or_default();
        let line = bet
            .line_value
            .map(|l| format!(" {l:+}"))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{:>4}  {:<4} {:<36} {:<10} {}{line:<7} fair {:>6}  best {:<16} {ev}",
            row + 1,
            bet.league_code,
            format!("{} @ {}", bet.away_team, bet.home_team),
            bet.market_key,
            bet.selection_key,
            fair_odds_display(bet),
            best,
        );
    }
    out
}
