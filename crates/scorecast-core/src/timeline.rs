// Play-by-play timeline reconstruction.
//
// Turns a raw, possibly duplicated, possibly out-of-order list of plays
// into period groups. Within a period, plays are ordered by combined score
// and then by `play_index`: the combined score never decreases in real
// play order, while `play_index` is unreliable when upstream ingested the
// same game more than once. Consecutive tier-3 plays collapse into a single
// group. Tier filtering is a separate pass over the finished structure.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::play::{Play, Tier};

/// Bucket for plays that arrive without a period label.
pub const UNKNOWN_PERIOD: &str = "Unknown";

// ---------------------------------------------------------------------------
// TierSet
// ---------------------------------------------------------------------------

/// Set of tiers the caller wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Tier>", into = "Vec<Tier>")]
pub struct TierSet {
    primary: bool,
    secondary: bool,
    minor: bool,
}

impl TierSet {
    pub fn all() -> Self {
        Self {
            primary: true,
            secondary: true,
            minor: true,
        }
    }

    pub fn none() -> Self {
        Self {
            primary: false,
            secondary: false,
            minor: false,
        }
    }

    pub fn contains(&self, tier: Tier) -> bool {
        match tier {
            Tier::Primary => self.primary,
            Tier::Secondary => self.secondary,
            Tier::Minor => self.minor,
        }
    }

    pub fn insert(&mut self, tier: Tier) {
        *self.slot(tier) = true;
    }

    pub fn remove(&mut self, tier: Tier) {
        *self.slot(tier) = false;
    }

    /// Flip a tier on or off, as a toggle button would.
    pub fn toggle(&mut self, tier: Tier) {
        let slot = self.slot(tier);
        *slot = !*slot;
    }

    pub fn tiers(&self) -> Vec<Tier> {
        Tier::ALL.into_iter().filter(|t| self.contains(*t)).collect()
    }

    fn slot(&mut self, tier: Tier) -> &mut bool {
        match tier {
            Tier::Primary => &mut self.primary,
            Tier::Secondary => &mut self.secondary,
            Tier::Minor => &mut self.minor,
        }
    }
}

impl Default for TierSet {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<Tier> for TierSet {
    fn from_iter<I: IntoIterator<Item = Tier>>(iter: I) -> Self {
        let mut set = TierSet::none();
        for tier in iter {
            set.insert(tier);
        }
        set
    }
}

impl From<Vec<Tier>> for TierSet {
    fn from(tiers: Vec<Tier>) -> Self {
        tiers.into_iter().collect()
    }
}

impl From<TierSet> for Vec<Tier> {
    fn from(set: TierSet) -> Self {
        set.tiers()
    }
}

impl FromStr for TierSet {
    type Err = String;

    /// Parse a comma-separated list such as `"1,2"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                let n: u8 = part
                    .parse()
                    .map_err(|_| format!("invalid tier `{part}`"))?;
                Tier::try_from(n)
            })
            .collect()
    }
}

impl fmt::Display for TierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.tiers().iter().map(|t| t.to_string()).collect();
        f.write_str(&parts.join(","))
    }
}

// ---------------------------------------------------------------------------
// Deduplication
// ---------------------------------------------------------------------------

fn content_key(play: &Play) -> (&str, &str, &str) {
    (
        play.period_label.as_deref().unwrap_or(""),
        play.game_clock.as_deref().unwrap_or(""),
        play.description.as_str(),
    )
}

/// Drop plays whose `(period, clock, description)` was already seen,
/// keeping the first occurrence and the input order.
pub fn dedupe(plays: &[Play]) -> Vec<&Play> {
    let mut seen = HashSet::with_capacity(plays.len());
    plays
        .iter()
        .filter(|play| seen.insert(content_key(play)))
        .collect()
}

// ---------------------------------------------------------------------------
// Timeline structure
// ---------------------------------------------------------------------------

/// A maximal run of consecutive tier-3 plays within a period.
#[derive(Debug, Clone, PartialEq)]
pub struct MinorGroup<'a> {
    plays: Vec<&'a Play>,
}

impl<'a> MinorGroup<'a> {
    pub fn plays(&self) -> &[&'a Play] {
        &self.plays
    }

    pub fn len(&self) -> usize {
        self.plays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plays.is_empty()
    }

    /// Clock of the first and last play in the group, when both are known.
    pub fn clock_span(&self) -> Option<(&'a str, &'a str)> {
        let first = self.plays.first()?.game_clock.as_deref()?;
        let last = self.plays.last()?.game_clock.as_deref()?;
        Some((first, last))
    }

    /// One-line description for the collapsed state.
    pub fn summary(&self) -> String {
        let noun = if self.len() == 1 { "play" } else { "plays" };
        match self.clock_span() {
            Some((first, last)) if first != last => {
                format!("{} minor {noun} ({first}\u{2013}{last})", self.len())
            }
            Some((first, _)) => format!("{} minor {noun} ({first})", self.len()),
            None => format!("{} minor {noun}", self.len()),
        }
    }
}

/// A renderable unit within a period.
#[derive(Debug, Clone, PartialEq)]
pub enum PeriodItem<'a> {
    /// A tier-1 or tier-2 play.
    Play(&'a Play),
    /// Collapsed tier-3 plays.
    Minor(MinorGroup<'a>),
}

impl<'a> PeriodItem<'a> {
    pub fn is_visible(&self, tiers: &TierSet) -> bool {
        match self {
            PeriodItem::Play(play) => tiers.contains(play.tier),
            PeriodItem::Minor(_) => tiers.contains(Tier::Minor),
        }
    }

    /// Every play covered by this item, in order.
    pub fn plays(&self) -> Vec<&'a Play> {
        match self {
            PeriodItem::Play(play) => vec![*play],
            PeriodItem::Minor(group) => group.plays.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodGroup<'a> {
    label: &'a str,
    items: Vec<PeriodItem<'a>>,
}

impl<'a> PeriodGroup<'a> {
    pub fn label(&self) -> &'a str {
        self.label
    }

    pub fn items(&self) -> &[PeriodItem<'a>] {
        &self.items
    }

    /// Plays in display order, with minor groups expanded.
    pub fn plays(&self) -> Vec<&'a Play> {
        self.items.iter().flat_map(|item| item.plays()).collect()
    }
}

/// A filtered view of one period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodView<'t, 'a> {
    pub label: &'a str,
    pub items: Vec<&'t PeriodItem<'a>>,
}

/// Deduplicated, ordered, tier-collapsed plays grouped by period.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Timeline<'a> {
    periods: Vec<PeriodGroup<'a>>,
    play_count: usize,
}

impl<'a> Timeline<'a> {
    /// Build the timeline. Only depends on `plays`; re-filter with
    /// [`Timeline::visible`] instead of rebuilding when tiers change.
    pub fn reconstruct(plays: &'a [Play]) -> Self {
        let unique = dedupe(plays);
        let play_count = unique.len();

        let mut buckets: HashMap<&'a str, Vec<&'a Play>> = HashMap::new();
        for play in unique {
            let label = play.period_label.as_deref().unwrap_or(UNKNOWN_PERIOD);
            buckets.entry(label).or_default().push(play);
        }

        let mut periods: Vec<(&'a str, Vec<&'a Play>)> = buckets.into_iter().collect();
        // Periods in game order: earliest play_index first, unlabeled last.
        periods.sort_by_key(|(label, bucket)| {
            let first_index = bucket.iter().map(|p| p.play_index).min().unwrap_or(i64::MAX);
            (*label == UNKNOWN_PERIOD, first_index, *label)
        });

        let periods = periods
            .into_iter()
            .map(|(label, mut bucket)| {
                // Stable: plays tied on both keys keep their input order.
                bucket.sort_by(|a, b| {
                    a.combined_score()
                        .cmp(&b.combined_score())
                        .then(a.play_index.cmp(&b.play_index))
                });
                PeriodGroup {
                    label,
                    items: collapse_minor_runs(bucket),
                }
            })
            .collect();

        Self {
            periods,
            play_count,
        }
    }

    pub fn periods(&self) -> &[PeriodGroup<'a>] {
        &self.periods
    }

    /// Number of plays after deduplication.
    pub fn play_count(&self) -> usize {
        self.play_count
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Items visible under `tiers`. Periods with nothing visible are
    /// omitted.
    pub fn visible<'t>(&'t self, tiers: &TierSet) -> Vec<PeriodView<'t, 'a>> {
        self.periods
            .iter()
            .filter_map(|period| {
                let items: Vec<&'t PeriodItem<'a>> = period
                    .items
                    .iter()
                    .filter(|item| item.is_visible(tiers))
                    .collect();
                (!items.is_empty()).then_some(PeriodView {
                    label: period.label,
                    items,
                })
            })
            .collect()
    }
}

fn collapse_minor_runs<'a>(ordered: Vec<&'a Play>) -> Vec<PeriodItem<'a>> {
    let mut items = Vec::new();
    let mut run: Vec<&'a Play> = Vec::new();
    for play in ordered {
        if play.tier == Tier::Minor {
            run.push(play);
            continue;
        }
        if !run.is_empty() {
            items.push(PeriodItem::Minor(MinorGroup {
                plays: std::mem::take(&mut run),
            }));
        }
        items.push(PeriodItem::Play(play));
    }
    if !run.is_empty() {
        items.push(PeriodItem::Minor(MinorGroup { plays: run }));
    }
    items
}
