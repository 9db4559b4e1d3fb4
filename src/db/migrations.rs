//! Database schema migrations
//!
//! Versioned, additive migrations so existing libraries survive app
//! upgrades without manual deletion or data loss.
//!
//! Each migration is a declarative descriptor: the columns it adds double
//! as its "already applied?" check, so the runner is idempotent and also
//! a no-op against databases created fresh with the full modern schema.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - They must remain stable for users upgrading from older versions
//! 2. **Always add new descriptors** - One per schema change, at the end of the list
//! 3. **Keep them additive** - ALTER TABLE ADD COLUMN plus IF NOT EXISTS statements only
//! 4. **Test against old schemas** - Verify data written by the previous shape stays readable

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 4;

/// One additive schema change
struct Migration {
    version: i32,
    name: &'static str,
    /// Columns this migration adds: (table, column, definition)
    columns: &'static [(&'static str, &'static str, &'static str)],
    /// Statements run after the columns exist (`IF NOT EXISTS` forms only)
    post_sql: &'static [&'static str],
}

/// Ordered migration list; versions are contiguous and ascending
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "add song reference codes",
        columns: &[("songs", "code", "TEXT")],
        post_sql: &["CREATE UNIQUE INDEX IF NOT EXISTS idx_songs_code ON songs(code)"],
    },
    Migration {
        version: 2,
        name: "add play history",
        columns: &[("songs", "last_played", "INTEGER")],
        post_sql: &[],
    },
    Migration {
        version: 3,
        name: "add karaoke support",
        columns: &[
            ("songs", "is_karaoke", "INTEGER NOT NULL DEFAULT 0"),
            ("songs", "audio_uri", "TEXT"),
            ("songs", "bpm", "REAL"),
            ("songs", "lyrics_karaoke", "TEXT"),
        ],
        post_sql: &[],
    },
    Migration {
        version: 4,
        name: "add sync tracking",
        columns: &[
            ("songs", "remote_id", "TEXT"),
            ("songs", "status", "TEXT NOT NULL DEFAULT 'pending'"),
            ("categories", "remote_id", "TEXT"),
            ("categories", "status", "TEXT NOT NULL DEFAULT 'pending'"),
        ],
        post_sql: &[],
    },
];

/// Get current schema version from database
///
/// Returns 0 if the schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

/// Record a schema version as applied
async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    // OR IGNORE: concurrent initializers may record the same version
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all migrations against the connected database.
///
/// Every step is checked independently through its own column predicates;
/// the recorded version is bookkeeping, not a gate, so a database whose
/// version row got ahead of its actual shape still gets repaired.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        warn!("This may indicate a downgrade. Leaving the schema untouched.");
        return Ok(());
    }

    for migration in MIGRATIONS {
        apply_migration(pool, migration).await.map_err(|e| {
            Error::Migration(format!(
                "v{} ({}): {}",
                migration.version, migration.name, e
            ))
        })?;

        if migration.version > current_version {
            set_schema_version(pool, migration.version).await?;
            info!("✓ Migration v{} ({}) completed", migration.version, migration.name);
        }
    }

    debug!("Database schema at v{}", CURRENT_SCHEMA_VERSION);
    Ok(())
}

/// Apply one migration wherever its column checks find work to do
async fn apply_migration(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    for (table, column, definition) in migration.columns {
        if column_exists(pool, table, column).await? {
            continue;
        }

        let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition);
        match sqlx::query(&sql).execute(pool).await {
            Ok(_) => {
                info!("  Added column {}.{}", table, column);
            }
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
                // Another initializer beat us between the check and the ALTER
                info!("  Column {}.{} added by concurrent initializer - skipping", table, column);
            }
            Err(e) => return Err(e.into()),
        }
    }

    for sql in migration.post_sql {
        sqlx::query(sql).execute(pool).await?;
    }

    Ok(())
}

/// Check whether a column exists via pragma_table_info
async fn column_exists(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM pragma_table_info('{}') WHERE name = ?",
        table
    ))
    .bind(column)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}
