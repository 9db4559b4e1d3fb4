//! Key/value preference store
//!
//! One row per key. Non-string values go through the JSON accessors so
//! callers never hand-serialize.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::Result;

/// Read a raw preference value
pub async fn get_preference(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM preferences WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

/// Write a preference value, inserting or replacing as needed
pub async fn set_preference(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO preferences (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete a preference. No-op when the key is absent.
pub async fn remove_preference(pool: &SqlitePool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM preferences WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;
    Ok(())
}

/// Read a JSON-encoded preference. Undecodable stored values surface as
/// [`crate::Error::Serialization`] so callers choose their own fallback.
pub async fn get_preference_json<T: DeserializeOwned>(
    pool: &SqlitePool,
    key: &str,
) -> Result<Option<T>> {
    let raw = get_preference(pool, key).await?;
    match raw {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Write a value as JSON
pub async fn set_preference_json<T: Serialize + ?Sized>(
    pool: &SqlitePool,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    set_preference(pool, key, &raw).await
}
