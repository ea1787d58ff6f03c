//! Category storage.
//!
//! Categories are name-only rows with protect-on-delete semantics: a
//! category referenced by any article cannot be removed. The check is
//! made explicit here so the server can answer with a conflict instead
//! of surfacing a bare foreign-key violation; the `ON DELETE RESTRICT`
//! constraint remains as the backstop.

use anyhow::{bail, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    pub id: i64,
    pub name: String,
}

pub async fn list_categories(pool: &SqlitePool) -> Result<Vec<CategoryView>> {
    let rows = sqlx::query("SELECT id, name FROM categories ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .map(|row| CategoryView {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect())
}

pub async fn create_category(pool: &SqlitePool, name: &str) -> Result<i64> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        bail!("category '{}' already exists", name);
    }

    let result = sqlx::query("INSERT INTO categories (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn category_exists(pool: &SqlitePool, id: i64) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

pub async fn delete_category(pool: &SqlitePool, id: i64) -> Result<()> {
    if !category_exists(pool, id).await? {
        bail!("category not found: {}", id);
    }

    let referencing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE category_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if referencing > 0 {
        bail!(
            "category is referenced by {} article{}",
            referencing,
            if referencing == 1 { "" } else { "s" }
        );
    }

    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
