// Stat field resolution over loosely-shaped box-score payloads.
//
// Upstream stat blobs differ by league and by ingestion source, so the same
// logical stat can appear under several keys. Each field lists its aliases
// in priority order; the first key present wins.

use serde_json::Value;

/// A logical stat and the keys it may appear under, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatField {
    pub key: &'static str,
    pub label: &'static str,
    pub aliases: &'static [&'static str],
}

/// Every stat the client knows how to display.
pub const STAT_FIELDS: &[StatField] = &[
    StatField {
        key: "points",
        label: "PTS",
        aliases: &["points", "pts", "PTS"],
    },
    StatField {
        key: "rebounds",
        label: "REB",
        aliases: &["rebounds", "reb", "totalRebounds", "trb"],
    },
    StatField {
        key: "assists",
        label: "AST",
        aliases: &["assists", "ast"],
    },
    StatField {
        key: "steals",
        label: "STL",
        aliases: &["steals", "stl"],
    },
    StatField {
        key: "blocks",
        label: "BLK",
        aliases: &["blocks", "blk"],
    },
    StatField {
        key: "turnovers",
        label: "TO",
        aliases: &["turnovers", "tov", "to"],
    },
    StatField {
        key: "minutes",
        label: "MIN",
        aliases: &["minutes", "min", "mp"],
    },
    StatField {
        key: "field_goals",
        label: "FG",
        aliases: &["fieldGoals", "fg", "fgMadeAttempted"],
    },
    StatField {
        key: "three_pointers",
        label: "3PT",
        aliases: &["threePointers", "fg3", "threePointFieldGoals"],
    },
    StatField {
        key: "goals",
        label: "G",
        aliases: &["goals", "g"],
    },
    StatField {
        key: "shots",
        label: "SOG",
        aliases: &["shots", "shotsOnGoal", "sog"],
    },
    StatField {
        key: "plus_minus",
        label: "+/-",
        aliases: &["plusMinus", "plus_minus", "pm"],
    },
];

/// Look up a field definition by its logical key.
pub fn field(key: &str) -> Option<&'static StatField> {
    STAT_FIELDS.iter().find(|f| f.key == key)
}

/// Return the value of the first alias present (and not null) in `stats`.
pub fn resolve<'a>(stats: &'a Value, field: &StatField) -> Option<&'a Value> {
    let obj = stats.as_object()?;
    field
        .aliases
        .iter()
        .filter_map(|alias| obj.get(*alias))
        .find(|v| !v.is_null())
}

/// Resolve a field by key and coerce it to a number. Numeric strings
/// ("12", "3.5") are accepted; anything else yields `None`.
pub fn resolve_f64(stats: &Value, key: &str) -> Option<f64> {
    let field = field(key)?;
    match resolve(stats, field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Resolve a field by key and render it for display. Strings pass through
/// unchanged so values like "7-15" survive.
pub fn resolve_display(stats: &Value, key: &str) -> Option<String> {
    display(stats, field(key)?)
}

fn display(stats: &Value, field: &StatField) -> Option<String> {
    match resolve(stats, field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Fields that resolve to a displayable value in at least one of `rows`,
/// in table order. Box scores only show these columns, so a hockey game
/// gets goals and shots and a basketball game gets points and rebounds.
pub fn present_fields<'a, I>(rows: I) -> Vec<&'static StatField>
where
    I: IntoIterator<Item = &'a Value>,
{
    let rows: Vec<&Value> = rows.into_iter().collect();
    STAT_FIELDS
        .iter()
        .filter(|field| rows.iter().any(|stats| display(stats, field).is_some()))
        .collect()
}

/// One display cell per column; missing values become `None`.
pub fn row(stats: &Value, columns: &[&StatField]) -> Vec<Option<String>> {
    columns.iter().map(|field| display(stats, field)).collect()
}
