//! Comment storage and retrieval.
//!
//! Comments always belong to one article and disappear with it. The
//! archived-article guard lives in the HTTP handlers, not here: these
//! functions read and write whatever they are told to.

use anyhow::Result;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::forms::ValidComment;
use crate::pagination::{PageMeta, Paginator};

/// Comment representation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub article_id: i64,
    pub body: String,
    pub author: String,
    pub created_at: String,
    pub updated_at: String,
}

impl CommentView {
    fn from_row(row: &SqliteRow) -> Self {
        Self {
            id: row.get("id"),
            article_id: row.get("article_id"),
            body: row.get("body"),
            author: row.get("author"),
            created_at: format_ts_iso(row.get("created_at")),
            updated_at: format_ts_iso(row.get("updated_at")),
        }
    }
}

/// One page of comments.
#[derive(Debug, Clone, Serialize)]
pub struct CommentList {
    pub comments: Vec<CommentView>,
    pub page: PageMeta,
}

pub async fn create_comment(
    pool: &SqlitePool,
    article_id: i64,
    comment: &ValidComment,
) -> Result<i64> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query(
        "INSERT INTO comments (article_id, body, author, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(article_id)
    .bind(&comment.body)
    .bind(&comment.author)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Returns `false` when the comment does not exist.
pub async fn update_comment(pool: &SqlitePool, id: i64, comment: &ValidComment) -> Result<bool> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query("UPDATE comments SET body = ?, author = ?, updated_at = ? WHERE id = ?")
        .bind(&comment.body)
        .bind(&comment.author)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Returns `false` when the comment does not exist.
pub async fn delete_comment(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get_comment(pool: &SqlitePool, id: i64) -> Result<Option<CommentView>> {
    let row = sqlx::query(
        "SELECT id, article_id, body, author, created_at, updated_at \
         FROM comments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.as_ref().map(CommentView::from_row))
}

/// Paginated comments for one article, newest first.
pub async fn list_for_article(
    pool: &SqlitePool,
    article_id: i64,
    page: Option<u32>,
    per_page: u32,
    orphans: u32,
) -> Result<CommentList> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE article_id = ?")
        .bind(article_id)
        .fetch_one(pool)
        .await?;

    let paginator = Paginator::new(count, per_page, orphans);
    let page = paginator.clamp_page(page);
    let (limit, offset) = paginator.limits(page);

    let rows = sqlx::query(
        "SELECT id, article_id, body, author, created_at, updated_at \
         FROM comments WHERE article_id = ? \
         ORDER BY created_at DESC, id DESC \
         LIMIT ? OFFSET ?",
    )
    .bind(article_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(CommentList {
        comments: rows.iter().map(CommentView::from_row).collect(),
        page: paginator.meta(page),
    })
}

/// Paginated list of all comments, newest first.
pub async fn list_all(
    pool: &SqlitePool,
    page: Option<u32>,
    per_page: u32,
    orphans: u32,
) -> Result<CommentList> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
        .fetch_one(pool)
        .await?;

    let paginator = Paginator::new(count, per_page, orphans);
    let page = paginator.clamp_page(page);
    let (limit, offset) = paginator.limits(page);

    let rows = sqlx::query(
        "SELECT id, article_id, body, author, created_at, updated_at \
         FROM comments \
         ORDER BY created_at DESC, id DESC \
         LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(CommentList {
        comments: rows.iter().map(CommentView::from_row).collect(),
        page: paginator.meta(page),
    })
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
