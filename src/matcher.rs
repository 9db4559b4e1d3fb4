//! Duplicate detection by normalized lyric signature
//!
//! Imported material (PDF extraction, karaoke transcription) frequently
//! re-delivers songs that already exist with different punctuation,
//! accents or casing. The matcher compares a normalized signature of the
//! candidate's lyric text against every stored song and reports the first
//! exact match. It is advisory: callers decide whether to overwrite or
//! save as new, and no fuzzy matching is attempted.

use sqlx::SqlitePool;
use tracing::debug;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::db::models::Song;
use crate::db::songs;
use crate::lyrics::{self, LyricLine};
use crate::Result;

/// Lyric content to match against the library
#[derive(Debug, Clone, Copy)]
pub enum LyricContent<'a> {
    /// Plain lyric text (letra)
    Plain(&'a str),
    /// Time-aligned karaoke lines; only the line text is compared
    Timed(&'a [LyricLine]),
}

impl LyricContent<'_> {
    /// Normalized signature of this content
    pub fn signature(&self) -> String {
        match self {
            LyricContent::Plain(text) => normalize_lyrics(text),
            LyricContent::Timed(lines) => normalize_lyrics(&lyrics::plain_text(lines)),
        }
    }
}

/// Normalize lyric text into its comparable signature.
///
/// Lowercases, strips accents (NFD decomposition with combining marks
/// dropped), maps everything outside `[a-z0-9 ]` to a space, then
/// collapses whitespace runs and trims. "Olá, Mundo!" and "ola mundo"
/// normalize to the same signature.
pub fn normalize_lyrics(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered.nfd().filter(|c| !is_combining_mark(*c)).collect();

    let mapped: String = stripped
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' ' {
                c
            } else {
                ' '
            }
        })
        .collect();

    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Find the first stored song whose lyric signature equals the candidate's.
///
/// Karaoke songs compare through their timed lyrics, falling back to letra
/// when the stored blob was unparseable; everything else compares through
/// letra. Songs without comparable text never match, and a candidate whose
/// signature is empty matches nothing (an overwrite prompt on an empty
/// signature would be a false positive, not a save).
pub async fn find_song_by_lyrics_signature(
    pool: &SqlitePool,
    candidate: LyricContent<'_>,
) -> Result<Option<Song>> {
    let signature = candidate.signature();
    if signature.is_empty() {
        return Ok(None);
    }

    let all_songs = songs::get_all_songs(pool).await?;
    for song in all_songs {
        if song_signature(&song).as_deref() == Some(signature.as_str()) {
            debug!("Lyric signature matched song {} ('{}')", song.id, song.title);
            return Ok(Some(song));
        }
    }

    Ok(None)
}

/// Comparable signature of a stored song, if it has lyric content
fn song_signature(song: &Song) -> Option<String> {
    let signature = match (&song.lyrics_karaoke, song.is_karaoke) {
        (Some(lines), true) => normalize_lyrics(&lyrics::plain_text(lines)),
        _ => song
            .letra
            .as_deref()
            .map(normalize_lyrics)
            .unwrap_or_default(),
    };

    if signature.is_empty() {
        None
    } else {
        Some(signature)
    }
}
