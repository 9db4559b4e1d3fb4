//! Category repository and song/category association ops

use sqlx::SqlitePool;
use tracing::debug;

use crate::db::models::{Category, SyncStatus};
use crate::{Error, Result};

fn category_from_row(row: (i64, String, String, Option<String>, String)) -> Category {
    let (id, name, color, remote_id, status) = row;
    Category {
        id,
        name,
        color,
        remote_id,
        status: SyncStatus::from_db(&status),
    }
}

/// Fetch all categories ordered by name
pub async fn get_all_categories(pool: &SqlitePool) -> Result<Vec<Category>> {
    let rows: Vec<(i64, String, String, Option<String>, String)> = sqlx::query_as(
        "SELECT id, name, color, remote_id, status FROM categories ORDER BY name ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(category_from_row).collect())
}

/// Insert a category. A taken name surfaces as [`Error::Duplicate`].
pub async fn add_category(pool: &SqlitePool, name: &str, color: &str) -> Result<i64> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput(
            "Category name must not be empty".to_string(),
        ));
    }

    let result = sqlx::query("INSERT INTO categories (name, color, status) VALUES (?, ?, 'pending')")
        .bind(name)
        .bind(color)
        .execute(pool)
        .await
        .map_err(|e| Error::from_write("category name", e))?;

    let id = result.last_insert_rowid();
    debug!("Added category {} ('{}')", id, name);
    Ok(id)
}

/// Replace a category's name and color. Returns [`Error::NotFound`] for
/// unknown ids, [`Error::Duplicate`] when the new name is taken.
pub async fn update_category(pool: &SqlitePool, id: i64, name: &str, color: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput(
            "Category name must not be empty".to_string(),
        ));
    }

    let result = sqlx::query(
        "UPDATE categories SET name = ?, color = ?, status = 'pending', \
         updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(name)
    .bind(color)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| Error::from_write("category name", e))?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("category {}", id)));
    }
    Ok(())
}

/// Delete a category. Join rows go with it (ON DELETE CASCADE); songs stay.
pub async fn delete_category(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("category {}", id)));
    }

    debug!("Deleted category {}", id);
    Ok(())
}

/// Associate a song with a category. Re-adding an existing pair is a
/// no-op; a missing song or category still trips the foreign key.
pub async fn add_song_to_category(pool: &SqlitePool, song_id: i64, category_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO song_categories (song_id, category_id) VALUES (?, ?)")
        .bind(song_id)
        .bind(category_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove one association. No-op when the pair does not exist.
pub async fn remove_song_from_category(
    pool: &SqlitePool,
    song_id: i64,
    category_id: i64,
) -> Result<()> {
    sqlx::query("DELETE FROM song_categories WHERE song_id = ? AND category_id = ?")
        .bind(song_id)
        .bind(category_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Categories whose local changes have not been pushed yet
pub async fn pending_categories(pool: &SqlitePool) -> Result<Vec<Category>> {
    let rows: Vec<(i64, String, String, Option<String>, String)> = sqlx::query_as(
        "SELECT id, name, color, remote_id, status FROM categories \
         WHERE status = 'pending' ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(category_from_row).collect())
}

/// Record a successful push: store the backend id and clear the dirty flag
pub async fn mark_category_synced(pool: &SqlitePool, id: i64, remote_id: &str) -> Result<()> {
    let result = sqlx::query(
        "UPDATE categories SET remote_id = ?, status = 'synced', \
         updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(remote_id)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("category {}", id)));
    }
    Ok(())
}
