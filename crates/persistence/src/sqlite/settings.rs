//! Key-value settings CRUD operations

use sqlx::SqlitePool;
use taskboard_core::{Error, Result};

/// Read a single setting
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    sqlx::query_scalar::<sqlx::Sqlite, String>("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))
}

/// Insert or replace a setting
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

/// Remove a setting. Returns whether a row was deleted.
pub async fn delete_setting(pool: &SqlitePool, key: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(result.rows_affected() > 0)
}

/// All settings, ordered by key
pub async fn list_settings(pool: &SqlitePool) -> Result<Vec<(String, String)>> {
    sqlx::query_as::<_, (String, String)>("SELECT key, value FROM settings ORDER BY key")
        .fetch_all(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))
}
