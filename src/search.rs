//! Accent and case insensitive in-memory song filtering
//!
//! Shares the matcher's normalization so the search box and the duplicate
//! matcher agree about what "the same text" means.

use crate::db::models::Song;
use crate::matcher::normalize_lyrics;

/// Filter songs by a free-text query against title, artist, letra and code.
///
/// A blank query returns nothing (the caller shows the unfiltered library
/// instead). Matching is normalized substring containment and input order
/// is preserved.
pub fn filter_songs<'a>(songs: &'a [Song], query: &str) -> Vec<&'a Song> {
    let needle = normalize_lyrics(query);
    if needle.is_empty() {
        return Vec::new();
    }

    songs
        .iter()
        .filter(|song| {
            normalize_lyrics(&song.title).contains(&needle)
                || field_contains(song.artist.as_deref(), &needle)
                || field_contains(song.letra.as_deref(), &needle)
                || field_contains(song.code.as_deref(), &needle)
        })
        .collect()
}

fn field_contains(field: Option<&str>, needle: &str) -> bool {
    field.map_or(false, |value| normalize_lyrics(value).contains(needle))
}
