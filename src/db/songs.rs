//! Song repository
//!
//! All writes that touch more than one row run inside a transaction;
//! association rows live and die with their song. Reads decode the
//! karaoke lyric blob leniently so one corrupt row cannot break listing.

use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::db::models::{NewSong, Song, SongPatch, SyncStatus};
use crate::lyrics;
use crate::{Error, Result};

/// Column list shared by every song SELECT so row mapping stays uniform
const SONG_COLUMNS: &str = "id, title, artist, code, letra, cifra, file_path, has_cifra, \
     has_partitura, last_played, is_karaoke, audio_uri, bpm, lyrics_karaoke, remote_id, status";

// Personalized codes are "P" followed by digits only ("P1", "P12")
static PERSONALIZED_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^P(\d+)$").unwrap());

fn song_from_row(row: &SqliteRow) -> Song {
    let lyrics_karaoke = row
        .get::<Option<String>, _>("lyrics_karaoke")
        .as_deref()
        .and_then(lyrics::parse_lyrics_blob);

    Song {
        id: row.get("id"),
        title: row.get("title"),
        artist: row.get("artist"),
        code: row.get("code"),
        letra: row.get("letra"),
        cifra: row.get("cifra"),
        file_path: row.get("file_path"),
        has_cifra: row.get("has_cifra"),
        has_partitura: row.get("has_partitura"),
        last_played: row.get("last_played"),
        is_karaoke: row.get("is_karaoke"),
        audio_uri: row.get("audio_uri"),
        bpm: row.get("bpm"),
        lyrics_karaoke,
        remote_id: row.get("remote_id"),
        status: SyncStatus::from_db(row.get::<String, _>("status").as_str()),
        category_ids: Vec::new(),
    }
}

/// Merge join-table rows into the songs' category_ids
fn attach_categories(songs: &mut [Song], links: &[(i64, i64)]) {
    let mut by_song: HashMap<i64, Vec<i64>> = HashMap::new();
    for (song_id, category_id) in links {
        by_song.entry(*song_id).or_default().push(*category_id);
    }

    for song in songs.iter_mut() {
        if let Some(ids) = by_song.remove(&song.id) {
            song.category_ids = ids;
        }
    }
}

/// Fetch join rows scoped to exactly these songs and merge them in
async fn load_categories_for(pool: &SqlitePool, songs: &mut [Song]) -> Result<()> {
    if songs.is_empty() {
        return Ok(());
    }

    let placeholders = vec!["?"; songs.len()].join(", ");
    let sql = format!(
        "SELECT song_id, category_id FROM song_categories WHERE song_id IN ({})",
        placeholders
    );

    let mut query = sqlx::query_as::<_, (i64, i64)>(&sql);
    for song in songs.iter() {
        query = query.bind(song.id);
    }
    let links = query.fetch_all(pool).await?;

    attach_categories(songs, &links);
    Ok(())
}

/// Fetch the whole library ordered by title, with category associations.
///
/// Two fixed queries (songs, then the whole join table) merged in memory;
/// per-song association lookups would be N+1.
pub async fn get_all_songs(pool: &SqlitePool) -> Result<Vec<Song>> {
    let rows = sqlx::query(&format!("SELECT {} FROM songs ORDER BY title ASC", SONG_COLUMNS))
        .fetch_all(pool)
        .await?;

    let mut songs: Vec<Song> = rows.iter().map(song_from_row).collect();

    let links: Vec<(i64, i64)> =
        sqlx::query_as("SELECT song_id, category_id FROM song_categories")
            .fetch_all(pool)
            .await?;

    attach_categories(&mut songs, &links);
    Ok(songs)
}

/// Fetch the karaoke subset of the library ordered by title.
///
/// The association query is scoped to the returned ids and skipped
/// entirely when there are none.
pub async fn get_all_karaoke_songs(pool: &SqlitePool) -> Result<Vec<Song>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM songs WHERE is_karaoke = 1 ORDER BY title ASC",
        SONG_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    let mut songs: Vec<Song> = rows.iter().map(song_from_row).collect();
    load_categories_for(pool, &mut songs).await?;
    Ok(songs)
}

/// Fetch one song with its category associations
pub async fn get_song(pool: &SqlitePool, id: i64) -> Result<Option<Song>> {
    let row = sqlx::query(&format!("SELECT {} FROM songs WHERE id = ?", SONG_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let mut song = match row {
        Some(row) => song_from_row(&row),
        None => return Ok(None),
    };

    let ids: Vec<(i64,)> =
        sqlx::query_as("SELECT category_id FROM song_categories WHERE song_id = ?")
            .bind(id)
            .fetch_all(pool)
            .await?;
    song.category_ids = ids.into_iter().map(|(category_id,)| category_id).collect();

    Ok(Some(song))
}

/// Insert a song and its category associations in one transaction.
///
/// A failure on any association (a bogus category id trips the foreign
/// key) rolls the song row back too. A taken reference code surfaces as
/// [`Error::Duplicate`].
pub async fn add_song(pool: &SqlitePool, song: NewSong) -> Result<i64> {
    if song.title.trim().is_empty() {
        return Err(Error::InvalidInput(
            "Song title must not be empty".to_string(),
        ));
    }

    let lyrics_blob = match &song.lyrics_karaoke {
        Some(lines) => Some(lyrics::serialize_lyrics(lines)?),
        None => None,
    };

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO songs (title, artist, code, letra, cifra, file_path,
                           has_cifra, has_partitura, is_karaoke, audio_uri,
                           bpm, lyrics_karaoke, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(&song.title)
    .bind(&song.artist)
    .bind(&song.code)
    .bind(&song.letra)
    .bind(&song.cifra)
    .bind(&song.file_path)
    .bind(song.has_cifra)
    .bind(song.has_partitura)
    .bind(song.is_karaoke)
    .bind(&song.audio_uri)
    .bind(song.bpm)
    .bind(&lyrics_blob)
    .execute(&mut *tx)
    .await
    .map_err(|e| Error::from_write("song code", e))?;

    let song_id = result.last_insert_rowid();

    for category_id in &song.category_ids {
        sqlx::query("INSERT INTO song_categories (song_id, category_id) VALUES (?, ?)")
            .bind(song_id)
            .bind(category_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    debug!("Added song {} ('{}')", song_id, song.title);
    Ok(song_id)
}

/// Apply a partial update; absent patch fields stay untouched.
///
/// When `category_ids` is present the whole association set is replaced
/// in the same transaction. Any column change flips the row back to
/// pending. Returns [`Error::NotFound`] for unknown ids.
pub async fn update_song(pool: &SqlitePool, id: i64, patch: SongPatch) -> Result<()> {
    if patch.is_empty() {
        // Nothing to write, but the not-found contract still holds
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM songs WHERE id = ?)")
            .bind(id)
            .fetch_one(pool)
            .await?;
        if !exists {
            return Err(Error::NotFound(format!("song {}", id)));
        }
        return Ok(());
    }

    if let Some(title) = &patch.title {
        if title.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Song title must not be empty".to_string(),
            ));
        }
    }

    // Destructured so a new column cannot be silently skipped here
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
    } = patch;

    let lyrics_blob = match &lyrics_karaoke {
        Some(Some(lines)) => Some(Some(lyrics::serialize_lyrics(lines)?)),
        Some(None) => Some(None),
        None => None,
    };

    let mut tx = pool.begin().await?;

    let mut sets: Vec<&'static str> = Vec::new();
    if title.is_some() {
        sets.push("title = ?");
    }
    if artist.is_some() {
        sets.push("artist = ?");
    }
    if code.is_some() {
        sets.push("code = ?");
    }
    if letra.is_some() {
        sets.push("letra = ?");
    }
    if cifra.is_some() {
        sets.push("cifra = ?");
    }
    if file_path.is_some() {
        sets.push("file_path = ?");
    }
    if has_cifra.is_some() {
        sets.push("has_cifra = ?");
    }
    if has_partitura.is_some() {
        sets.push("has_partitura = ?");
    }
    if last_played.is_some() {
        sets.push("last_played = ?");
    }
    if is_karaoke.is_some() {
        sets.push("is_karaoke = ?");
    }
    if audio_uri.is_some() {
        sets.push("audio_uri = ?");
    }
    if bpm.is_some() {
        sets.push("bpm = ?");
    }
    if lyrics_blob.is_some() {
        sets.push("lyrics_karaoke = ?");
    }
    sets.push("status = 'pending'");
    sets.push("updated_at = CURRENT_TIMESTAMP");

    let sql = format!("UPDATE songs SET {} WHERE id = ?", sets.join(", "));

    // Binds in the same order the fragments were pushed
    let mut query = sqlx::query(&sql);
    if let Some(value) = title {
        query = query.bind(value);
    }
    if let Some(value) = artist {
        query = query.bind(value);
    }
    if let Some(value) = code {
        query = query.bind(value);
    }
    if let Some(value) = letra {
        query = query.bind(value);
    }
    if let Some(value) = cifra {
        query = query.bind(value);
    }
    if let Some(value) = file_path {
        query = query.bind(value);
    }
    if let Some(value) = has_cifra {
        query = query.bind(value);
    }
    if let Some(value) = has_partitura {
        query = query.bind(value);
    }
    if let Some(value) = last_played {
        query = query.bind(value);
    }
    if let Some(value) = is_karaoke {
        query = query.bind(value);
    }
    if let Some(value) = audio_uri {
        query = query.bind(value);
    }
    if let Some(value) = bpm {
        query = query.bind(value);
    }
    if let Some(value) = lyrics_blob {
        query = query.bind(value);
    }
    query = query.bind(id);

    let result = query
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::from_write("song code", e))?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("song {}", id)));
    }

    if let Some(ids) = category_ids {
        sqlx::query("DELETE FROM song_categories WHERE song_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for category_id in ids {
            sqlx::query("INSERT INTO song_categories (song_id, category_id) VALUES (?, ?)")
                .bind(id)
                .bind(category_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;
    debug!("Updated song {}", id);
    Ok(())
}

/// Delete a song and its associations. Returns [`Error::NotFound`] for
/// unknown ids.
pub async fn delete_song(pool: &SqlitePool, id: i64) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM song_categories WHERE song_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM songs WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("song {}", id)));
    }

    tx.commit().await?;
    debug!("Deleted song {}", id);
    Ok(())
}

/// Record a playback: sets last_played to now (unix millis).
///
/// Play history is device-local, so the sync status is left alone.
pub async fn mark_song_played(pool: &SqlitePool, id: i64) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    let result = sqlx::query("UPDATE songs SET last_played = ? WHERE id = ?")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("song {}", id)));
    }
    Ok(())
}

/// Next free personalized code: P{max+1} over existing "P<digits>" codes,
/// or P1 when none exist. Codes like "P12B" or "Q7" are ignored.
pub async fn generate_next_personalized_code(pool: &SqlitePool) -> Result<String> {
    let codes: Vec<(String,)> = sqlx::query_as("SELECT code FROM songs WHERE code LIKE 'P%'")
        .fetch_all(pool)
        .await?;

    let max = codes
        .iter()
        .filter_map(|(code,)| {
            PERSONALIZED_CODE
                .captures(code)
                .and_then(|caps| caps[1].parse::<i64>().ok())
        })
        .max()
        .unwrap_or(0);

    Ok(format!("P{}", max + 1))
}

/// Songs whose local changes have not been pushed yet
pub async fn pending_songs(pool: &SqlitePool) -> Result<Vec<Song>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM songs WHERE status = 'pending' ORDER BY id ASC",
        SONG_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    let mut songs: Vec<Song> = rows.iter().map(song_from_row).collect();
    load_categories_for(pool, &mut songs).await?;
    Ok(songs)
}

/// Record a successful push: store the backend id and clear the dirty flag
pub async fn mark_song_synced(pool: &SqlitePool, id: i64, remote_id: &str) -> Result<()> {
    let result = sqlx::query(
        "UPDATE songs SET remote_id = ?, status = 'synced', updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(remote_id)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("song {}", id)));
    }
    Ok(())
}

/// Flag a failed push so the next sync pass can retry or surface it
pub async fn mark_song_sync_error(pool: &SqlitePool, id: i64) -> Result<()> {
    let result =
        sqlx::query("UPDATE songs SET status = 'error', updated_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("song {}", id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::categories;
    use crate::lyrics::LyricLine;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init::initialize(&pool).await.unwrap();
        pool
    }

    fn new_song(title: &str) -> NewSong {
        NewSong {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_and_get_round_trip() {
        let pool = setup_test_db().await;

        let song = NewSong {
            title: "Grande é o Senhor".to_string(),
            artist: Some("Adhemar de Campos".to_string()),
            code: Some("C102".to_string()),
            letra: Some("Grande é o Senhor e mui digno de louvor".to_string()),
            has_cifra: true,
            cifra: Some("[D]Grande é o [G]Senhor".to_string()),
            bpm: Some(72.5),
            ..Default::default()
        };

        let id = add_song(&pool, song).await.unwrap();
        let loaded = get_song(&pool, id).await.unwrap().unwrap();

        assert_eq!(loaded.title, "Grande é o Senhor");
        assert_eq!(loaded.artist.as_deref(), Some("Adhemar de Campos"));
        assert_eq!(loaded.code.as_deref(), Some("C102"));
        assert!(loaded.has_cifra);
        assert!(!loaded.has_partitura);
        assert_eq!(loaded.bpm, Some(72.5));
        assert_eq!(loaded.status, SyncStatus::Pending);
        assert!(loaded.category_ids.is_empty());
        assert!(loaded.last_played.is_none());
    }

    #[tokio::test]
    async fn test_get_missing_song_is_none() {
        let pool = setup_test_db().await;
        assert!(get_song(&pool, 41).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_rejects_blank_title() {
        let pool = setup_test_db().await;
        let result = add_song(&pool, new_song("   ")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_add_duplicate_code_is_distinguishable() {
        let pool = setup_test_db().await;

        let mut song = new_song("Primeiro");
        song.code = Some("C7".to_string());
        add_song(&pool, song).await.unwrap();

        let mut song = new_song("Segundo");
        song.code = Some("C7".to_string());
        let result = add_song(&pool, song).await;

        assert!(matches!(result, Err(Error::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_add_song_with_categories() {
        let pool = setup_test_db().await;

        let louvor = categories::add_category(&pool, "Louvor", "#ff0000").await.unwrap();
        let adoracao = categories::add_category(&pool, "Adoração", "#00ff00").await.unwrap();

        let song = NewSong {
            title: "Hino".to_string(),
            category_ids: vec![louvor, adoracao],
            ..Default::default()
        };
        let id = add_song(&pool, song).await.unwrap();

        let loaded = get_song(&pool, id).await.unwrap().unwrap();
        let mut got = loaded.category_ids.clone();
        got.sort();
        assert_eq!(got, vec![louvor, adoracao]);
    }

    #[tokio::test]
    async fn test_add_song_rolls_back_on_bad_category() {
        let pool = setup_test_db().await;

        let song = NewSong {
            title: "Orfão".to_string(),
            category_ids: vec![9999],
            ..Default::default()
        };
        let result = add_song(&pool, song).await;
        assert!(result.is_err());

        // The whole transaction rolled back: no orphan song row
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_get_all_songs_ordered_with_categories() {
        let pool = setup_test_db().await;

        let cat = categories::add_category(&pool, "Louvor", "#fff").await.unwrap();
        add_song(&pool, new_song("Zulu")).await.unwrap();
        let beta = NewSong {
            title: "Beta".to_string(),
            category_ids: vec![cat],
            ..Default::default()
        };
        add_song(&pool, beta).await.unwrap();
        add_song(&pool, new_song("Alfa")).await.unwrap();

        let songs = get_all_songs(&pool).await.unwrap();
        let titles: Vec<&str> = songs.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Alfa", "Beta", "Zulu"]);

        assert_eq!(songs[1].category_ids, vec![cat]);
        assert!(songs[0].category_ids.is_empty());
    }

    #[tokio::test]
    async fn test_karaoke_listing_and_blob_round_trip() {
        let pool = setup_test_db().await;

        add_song(&pool, new_song("Comum")).await.unwrap();

        let lines = vec![LyricLine {
            time: 1.5,
            text: "Aleluia".to_string(),
            words: None,
        }];
        let karaoke = NewSong {
            title: "Karaokê".to_string(),
            is_karaoke: true,
            audio_uri: Some("file:///music/karaoke.mp3".to_string()),
            lyrics_karaoke: Some(lines.clone()),
            ..Default::default()
        };
        add_song(&pool, karaoke).await.unwrap();

        let karaoke_songs = get_all_karaoke_songs(&pool).await.unwrap();
        assert_eq!(karaoke_songs.len(), 1);
        assert_eq!(karaoke_songs[0].title, "Karaokê");
        assert_eq!(karaoke_songs[0].lyrics_karaoke.as_deref(), Some(lines.as_slice()));
    }

    #[tokio::test]
    async fn test_karaoke_listing_empty_library() {
        let pool = setup_test_db().await;
        assert!(get_all_karaoke_songs(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_lyric_blob_reads_as_none() {
        let pool = setup_test_db().await;

        sqlx::query(
            "INSERT INTO songs (title, is_karaoke, lyrics_karaoke) VALUES ('Corrompido', 1, 'not-json')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let songs = get_all_songs(&pool).await.unwrap();
        assert_eq!(songs.len(), 1);
        assert!(songs[0].is_karaoke);
        assert!(songs[0].lyrics_karaoke.is_none());
    }

    #[tokio::test]
    async fn test_update_patch_field_semantics() {
        let pool = setup_test_db().await;

        let song = NewSong {
            title: "Original".to_string(),
            artist: Some("Fulano".to_string()),
            letra: Some("letra original".to_string()),
            ..Default::default()
        };
        let id = add_song(&pool, song).await.unwrap();

        // Absent fields stay untouched, present ones change
        let patch = SongPatch {
            title: Some("Renomeado".to_string()),
            ..Default::default()
        };
        update_song(&pool, id, patch).await.unwrap();

        let loaded = get_song(&pool, id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Renomeado");
        assert_eq!(loaded.artist.as_deref(), Some("Fulano"));
        assert_eq!(loaded.letra.as_deref(), Some("letra original"));

        // An explicit null clears a nullable column
        let patch = SongPatch {
            artist: Some(None),
            ..Default::default()
        };
        update_song(&pool, id, patch).await.unwrap();

        let loaded = get_song(&pool, id).await.unwrap().unwrap();
        assert!(loaded.artist.is_none());
        assert_eq!(loaded.letra.as_deref(), Some("letra original"));
    }

    #[tokio::test]
    async fn test_update_rejects_blank_title() {
        let pool = setup_test_db().await;
        let id = add_song(&pool, new_song("Válido")).await.unwrap();

        let patch = SongPatch {
            title: Some("".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            update_song(&pool, id, patch).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_update_replaces_association_set() {
        let pool = setup_test_db().await;

        let a = categories::add_category(&pool, "A", "#111").await.unwrap();
        let b = categories::add_category(&pool, "B", "#222").await.unwrap();
        let c = categories::add_category(&pool, "C", "#333").await.unwrap();

        let song = NewSong {
            title: "Hino".to_string(),
            category_ids: vec![a, b, c],
            ..Default::default()
        };
        let id = add_song(&pool, song).await.unwrap();

        let patch = SongPatch {
            category_ids: Some(vec![a]),
            ..Default::default()
        };
        update_song(&pool, id, patch).await.unwrap();

        let loaded = get_song(&pool, id).await.unwrap().unwrap();
        assert_eq!(loaded.category_ids, vec![a]);
    }

    #[tokio::test]
    async fn test_update_missing_song_is_not_found() {
        let pool = setup_test_db().await;

        let patch = SongPatch {
            title: Some("Fantasma".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            update_song(&pool, 123, patch).await,
            Err(Error::NotFound(_))
        ));

        // The empty patch honors the same contract
        assert!(matches!(
            update_song(&pool, 123, SongPatch::default()).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_patch_does_not_dirty_row() {
        let pool = setup_test_db().await;
        let id = add_song(&pool, new_song("Quieto")).await.unwrap();
        mark_song_synced(&pool, id, "remote-1").await.unwrap();

        update_song(&pool, id, SongPatch::default()).await.unwrap();

        let loaded = get_song(&pool, id).await.unwrap().unwrap();
        assert_eq!(loaded.status, SyncStatus::Synced);
    }

    #[tokio::test]
    async fn test_update_to_taken_code_is_duplicate() {
        let pool = setup_test_db().await;

        let mut first = new_song("Primeiro");
        first.code = Some("C1".to_string());
        add_song(&pool, first).await.unwrap();

        let second = add_song(&pool, new_song("Segundo")).await.unwrap();

        let patch = SongPatch {
            code: Some(Some("C1".to_string())),
            ..Default::default()
        };
        assert!(matches!(
            update_song(&pool, second, patch).await,
            Err(Error::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_song() {
        let pool = setup_test_db().await;

        let cat = categories::add_category(&pool, "Louvor", "#fff").await.unwrap();
        let song = NewSong {
            title: "Efêmero".to_string(),
            category_ids: vec![cat],
            ..Default::default()
        };
        let id = add_song(&pool, song).await.unwrap();

        delete_song(&pool, id).await.unwrap();

        assert!(get_song(&pool, id).await.unwrap().is_none());
        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM song_categories")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(links, 0);

        assert!(matches!(
            delete_song(&pool, id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_mark_song_played() {
        let pool = setup_test_db().await;
        let id = add_song(&pool, new_song("Tocada")).await.unwrap();

        let before = chrono::Utc::now().timestamp_millis();
        mark_song_played(&pool, id).await.unwrap();

        let loaded = get_song(&pool, id).await.unwrap().unwrap();
        assert!(loaded.last_played.unwrap() >= before);

        assert!(matches!(
            mark_song_played(&pool, 999).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_personalized_code_generation() {
        let pool = setup_test_db().await;

        assert_eq!(generate_next_personalized_code(&pool).await.unwrap(), "P1");

        for code in ["P1", "P2", "P7"] {
            let mut song = new_song(code);
            song.code = Some(code.to_string());
            add_song(&pool, song).await.unwrap();
        }
        assert_eq!(generate_next_personalized_code(&pool).await.unwrap(), "P8");

        // Non-matching codes never contribute
        for code in ["P12B", "Pasta"] {
            let mut song = new_song(code);
            song.code = Some(code.to_string());
            add_song(&pool, song).await.unwrap();
        }
        assert_eq!(generate_next_personalized_code(&pool).await.unwrap(), "P8");
    }

    #[tokio::test]
    async fn test_sync_status_lifecycle() {
        let pool = setup_test_db().await;
        let id = add_song(&pool, new_song("Sincronizável")).await.unwrap();

        let pending = pending_songs(&pool).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);

        mark_song_synced(&pool, id, "srv-42").await.unwrap();
        assert!(pending_songs(&pool).await.unwrap().is_empty());

        let loaded = get_song(&pool, id).await.unwrap().unwrap();
        assert_eq!(loaded.status, SyncStatus::Synced);
        assert_eq!(loaded.remote_id.as_deref(), Some("srv-42"));

        // Any local edit flips the row back to pending
        let patch = SongPatch {
            letra: Some(Some("nova letra".to_string())),
            ..Default::default()
        };
        update_song(&pool, id, patch).await.unwrap();
        assert_eq!(pending_songs(&pool).await.unwrap().len(), 1);

        mark_song_sync_error(&pool, id).await.unwrap();
        let loaded = get_song(&pool, id).await.unwrap().unwrap();
        assert_eq!(loaded.status, SyncStatus::Error);
    }
}
