//! Database models

use serde::{Deserialize, Serialize};

use crate::lyrics::LyricLine;

/// Sync state of a locally stored row
///
/// Every local write flips a row back to `Pending`; the sync pass marks it
/// `Synced` (storing the backend id) or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Synced,
    #[default]
    Pending,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::Pending => "pending",
            SyncStatus::Error => "error",
        }
    }

    /// Parse the stored column value; unknown text counts as pending so a
    /// row with a mangled status gets pushed again rather than lost.
    pub fn from_db(value: &str) -> SyncStatus {
        match value {
            "synced" => SyncStatus::Synced,
            "error" => SyncStatus::Error,
            _ => SyncStatus::Pending,
        }
    }
}

/// A song with its derived category associations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: Option<String>,
    /// Short reference code ("C102", "P3"), unique when present
    pub code: Option<String>,
    /// Plain lyric text
    pub letra: Option<String>,
    /// Chord-sheet text
    pub cifra: Option<String>,
    /// Sheet material reference (PDF path or URI)
    pub file_path: Option<String>,
    pub has_cifra: bool,
    pub has_partitura: bool,
    /// Unix millis of the last playback
    pub last_played: Option<i64>,
    pub is_karaoke: bool,
    /// Karaoke audio reference
    pub audio_uri: Option<String>,
    pub bpm: Option<f64>,
    /// Parsed timed lyrics; None when absent or unparseable
    pub lyrics_karaoke: Option<Vec<LyricLine>>,
    /// Backend id once synced
    pub remote_id: Option<String>,
    pub status: SyncStatus,
    /// Derived from the song_categories join table, never a column
    pub category_ids: Vec<i64>,
}

/// Insert payload for a new song
#[derive(Debug, Clone, Default)]
pub struct NewSong {
    pub title: String,
    pub artist: Option<String>,
    pub code: Option<String>,
    pub letra: Option<String>,
    pub cifra: Option<String>,
    pub file_path: Option<String>,
    pub has_cifra: bool,
    pub has_partitura: bool,
    pub is_karaoke: bool,
    pub audio_uri: Option<String>,
    pub bpm: Option<f64>,
    pub lyrics_karaoke: Option<Vec<LyricLine>>,
    pub category_ids: Vec<i64>,
}

/// Partial update for a song.
///
/// `None` leaves a column untouched. Nullable columns use a nested Option
/// so a patch can distinguish "set to this value" from "clear the value".
/// `category_ids: Some(_)` replaces the whole association set.
#[derive(Debug, Clone, Default)]
pub struct SongPatch {
    pub title: Option<String>,
    pub artist: Option<Option<String>>,
    pub code: Option<Option<String>>,
    pub letra: Option<Option<String>>,
    pub cifra: Option<Option<String>>,
    pub file_path: Option<Option<String>>,
    pub has_cifra: Option<bool>,
    pub has_partitura: Option<bool>,
    pub last_played: Option<Option<i64>>,
    pub is_karaoke: Option<bool>,
    pub audio_uri: Option<Option<String>>,
    pub bpm: Option<Option<f64>>,
    pub lyrics_karaoke: Option<Option<Vec<LyricLine>>>,
    pub category_ids: Option<Vec<i64>>,
}

impl SongPatch {
    /// True when the patch changes neither columns nor associations
    pub fn is_empty(&self) -> bool {
        // Destructured so adding a field here cannot be forgotten
        let SongPatch {
            title,
            artist,
            code,
            letra,
            cifra,
            file_path,
            has_cifra,
            has_partitura,
            last_played,
            is_karaoke,
            audio_uri,
            bpm,
            lyrics_karaoke,
            category_ids,
        } = self;

        title.is_none()
            && artist.is_none()
            && code.is_none()
            && letra.is_none()
            && cifra.is_none()
            && file_path.is_none()
            && has_cifra.is_none()
            && has_partitura.is_none()
            && last_played.is_none()
            && is_karaoke.is_none()
            && audio_uri.is_none()
            && bpm.is_none()
            && lyrics_karaoke.is_none()
            && category_ids.is_none()
    }
}

/// A category row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    /// Display name, unique across the library
    pub name: String,
    /// Display color (hex string, chosen by the user)
    pub color: String,
    /// Backend id once synced
    pub remote_id: Option<String>,
    pub status: SyncStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_status_round_trip() {
        for status in [SyncStatus::Synced, SyncStatus::Pending, SyncStatus::Error] {
            assert_eq!(SyncStatus::from_db(status.as_str()), status);
        }
    }

    #[test]
    fn test_unknown_status_is_pending() {
        assert_eq!(SyncStatus::from_db("garbage"), SyncStatus::Pending);
        assert_eq!(SyncStatus::from_db(""), SyncStatus::Pending);
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(SongPatch::default().is_empty());

        let patch = SongPatch {
            artist: Some(None),
            ..Default::default()
        };
        assert!(!patch.is_empty());

        let patch = SongPatch {
            category_ids: Some(vec![]),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
