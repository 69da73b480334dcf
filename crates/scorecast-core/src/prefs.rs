// SQLite persistence for user preferences.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::model::game::GameId;
use crate::odds::OddsFormat;
use crate::timeline::TierSet;

/// Most games that can be pinned at once.
pub const MAX_PINNED: usize = 10;

const READ_KEY: &str = "read_games";
const PINNED_KEY: &str = "pinned_games";
const DISPLAY_KEY: &str = "display_settings";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub visible_tiers: TierSet,
    pub odds_format: OddsFormat,
    pub hide_scores: bool,
}

/// Key-value preference store. Values are JSON; a missing key reads as the
/// type's default.
pub struct PrefsStore {
    conn: Mutex<Connection>,
}

impl PrefsStore {
    /// Open (or create) the store at `path`. Pass `":memory:"` for an
    /// ephemeral store.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open preferences database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS prefs (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .context("failed to create preferences schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn load<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        let raw: Option<String> = self
            .conn()
            .query_row("SELECT value FROM prefs WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .with_context(|| format!("failed to read preference {key}"))?;

        match raw {
            Some(json) => serde_json::from_str(&json)
                .with_context(|| format!("failed to deserialize preference {key}")),
            None => Ok(T::default()),
        }
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)
            .with_context(|| format!("failed to serialize preference {key}"))?;
        self.conn()
            .execute(
                "INSERT INTO prefs (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, json],
            )
            .with_context(|| format!("failed to save preference {key}"))?;
        Ok(())
    }

    // -- Read flags ---------------------------------------------------------

    pub fn read_games(&self) -> Result<BTreeSet<GameId>> {
        self.load(READ_KEY)
    }

    pub fn is_read(&self, id: GameId) -> Result<bool> {
        Ok(self.read_games()?.contains(&id))
    }

    pub fn mark_read(&self, id: GameId) -> Result<()> {
        let mut read = self.read_games()?;
        if read.insert(id) {
            self.save(READ_KEY, &read)?;
        }
        Ok(())
    }

    pub fn mark_unread(&self, id: GameId) -> Result<()> {
        let mut read = self.read_games()?;
        if read.remove(&id) {
            self.save(READ_KEY, &read)?;
        }
        Ok(())
    }

    // -- Pins ---------------------------------------------------------------

    /// Pinned games, oldest first.
    pub fn pinned(&self) -> Result<Vec<GameId>> {
        self.load(PINNED_KEY)
    }

    /// Pin a game. Returns `false` if it was already pinned. When the list is
    /// full the oldest pin is dropped.
    pub fn pin(&self, id: GameId) -> Result<bool> {
        let mut pinned = self.pinned()?;
        if pinned.contains(&id) {
            return Ok(false);
        }
        pinned.push(id);
        if pinned.len() > MAX_PINNED {
            let excess = pinned.len() - MAX_PINNED;
            pinned.drain(..excess);
        }
        self.save(PINNED_KEY, &pinned)?;
        Ok(true)
    }

    /// Returns `false` if the game was not pinned.
    pub fn unpin(&self, id: GameId) -> Result<bool> {
        let mut pinned = self.pinned()?;
        let before = pinned.len();
        pinned.retain(|p| *p != id);
        if pinned.len() == before {
            return Ok(false);
        }
        self.save(PINNED_KEY, &pinned)?;
        Ok(true)
    }

    // -- Display settings ---------------------------------------------------

    pub fn display_settings(&self) -> Result<DisplaySettings> {
        self.load(DISPLAY_KEY)
    }

    pub fn save_display_settings(&self, settings: &DisplaySettings) -> Result<()> {
        self.save(DISPLAY_KEY, settings)
    }
}
