//! Quick-access queue
//!
//! A short self-expiring list of songs the user wants at hand during a
//! service. Persisted as a JSON snapshot in the preference store, not a
//! table: the queue is tiny, ordered, and rewritten wholesale.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::db::models::Song;
use crate::db::{preferences, songs};
use crate::{Error, Result};

/// Preference key the queue snapshot lives under
const QUICK_ACCESS_KEY: &str = "quick_access_queue";
/// Live entries the queue holds at most
const MAX_ENTRIES: usize = 10;
/// Entries older than this are dropped on load (24 hours)
const ENTRY_TTL_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickAccessEntry {
    #[serde(rename = "songId")]
    pub song_id: i64,
    /// Unix millis at insertion
    #[serde(rename = "addedAt")]
    pub added_at: i64,
}

/// Stored snapshot, or empty when missing or unreadable. A snapshot that
/// fails to decode is discarded, never an error.
async fn read_entries(pool: &SqlitePool) -> Result<Vec<QuickAccessEntry>> {
    match preferences::get_preference_json(pool, QUICK_ACCESS_KEY).await {
        Ok(Some(entries)) => Ok(entries),
        Ok(None) => Ok(Vec::new()),
        Err(Error::Serialization(e)) => {
            warn!("Discarding unreadable quick-access snapshot: {}", e);
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

async fn persist(pool: &SqlitePool, entries: &[QuickAccessEntry]) -> Result<()> {
    preferences::set_preference_json(pool, QUICK_ACCESS_KEY, entries).await
}

/// Read the snapshot and drop expired entries; when pruning changed
/// anything the cleaned list is written back before returning.
async fn load_and_prune(pool: &SqlitePool, now: i64) -> Result<Vec<QuickAccessEntry>> {
    let entries = read_entries(pool).await?;

    let fresh: Vec<QuickAccessEntry> = entries
        .iter()
        .filter(|entry| now - entry.added_at < ENTRY_TTL_MS)
        .cloned()
        .collect();

    if fresh.len() != entries.len() {
        debug!(
            "Pruned {} expired quick-access entries",
            entries.len() - fresh.len()
        );
        persist(pool, &fresh).await?;
    }

    Ok(fresh)
}

/// Current queue in insertion order, expired entries dropped
pub async fn load_quick_access(pool: &SqlitePool) -> Result<Vec<QuickAccessEntry>> {
    let now = chrono::Utc::now().timestamp_millis();
    load_and_prune(pool, now).await
}

/// Queue a song. Already queued or at capacity: silent no-op.
pub async fn add_to_quick_access(pool: &SqlitePool, song_id: i64) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    let mut entries = load_and_prune(pool, now).await?;

    if entries.iter().any(|entry| entry.song_id == song_id) {
        return Ok(());
    }
    if entries.len() >= MAX_ENTRIES {
        debug!("Quick-access queue full, not adding song {}", song_id);
        return Ok(());
    }

    entries.push(QuickAccessEntry {
        song_id,
        added_at: now,
    });
    persist(pool, &entries).await
}

/// Drop a song from the queue if present
pub async fn remove_from_quick_access(pool: &SqlitePool, song_id: i64) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    let entries = load_and_prune(pool, now).await?;

    let kept: Vec<QuickAccessEntry> = entries
        .iter()
        .filter(|entry| entry.song_id != song_id)
        .cloned()
        .collect();

    if kept.len() != entries.len() {
        persist(pool, &kept).await?;
    }
    Ok(())
}

/// The queued songs that still exist, in queue order. Ids pointing at
/// deleted songs are skipped, not errors.
pub async fn quick_access_songs(pool: &SqlitePool) -> Result<Vec<Song>> {
    let entries = load_quick_access(pool).await?;
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let all = songs::get_all_songs(pool).await?;
    let mut by_id: HashMap<i64, Song> = all.into_iter().map(|song| (song.id, song)).collect();

    Ok(entries
        .iter()
        .filter_map(|entry| by_id.remove(&entry.song_id))
        .collect())
}
