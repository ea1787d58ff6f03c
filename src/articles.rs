//! Article storage and retrieval.
//!
//! Owns article CRUD plus everything that hangs off an article save:
//! tag get-or-create and attachment, archival, and the filtered list
//! queries behind the index and tag views.
//!
//! Archival is a status flip. The row, its tags, and its comments all
//! survive; the article just leaves the active listings.

use anyhow::Result;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::forms::ValidArticle;
use crate::models::ArticleStatus;
use crate::pagination::{PageMeta, Paginator};
use crate::search;

/// Compact article representation for list responses.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleSummary {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub status: String,
    pub created_at: String,
}

impl ArticleSummary {
    pub(crate) fn from_row(row: &SqliteRow) -> Self {
        Self {
            id: row.get("id"),
            title: row.get("title"),
            author: row.get("author"),
            status: row.get("status"),
            created_at: format_ts_iso(row.get("created_at")),
        }
    }
}

/// Referenced category, embedded in the detail response.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryRef {
    pub id: i64,
    pub name: String,
}

/// Full article representation for the detail response.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleDetail {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub status: String,
    pub category: Option<CategoryRef>,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One page of article summaries.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleList {
    pub articles: Vec<ArticleSummary>,
    pub page: PageMeta,
}

pub async fn create_article(pool: &SqlitePool, article: &ValidArticle) -> Result<i64> {
    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO articles (title, body, author, status, category_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&article.title)
    .bind(&article.body)
    .bind(&article.author)
    .bind(ArticleStatus::Active.as_str())
    .bind(article.category_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let article_id = result.last_insert_rowid();
    attach_tags(&mut tx, article_id, &article.tags, now).await?;

    tx.commit().await?;
    Ok(article_id)
}

/// Update fields and attach any new tags. Returns `false` when the
/// article does not exist.
pub async fn update_article(pool: &SqlitePool, id: i64, article: &ValidArticle) -> Result<bool> {
    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE articles SET title = ?, body = ?, author = ?, category_id = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(&article.title)
    .bind(&article.body)
    .bind(&article.author)
    .bind(article.category_id)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    attach_tags(&mut tx, id, &article.tags, now).await?;

    tx.commit().await?;
    Ok(true)
}

/// Get-or-create each tag by exact name, then attach it. Attachment is
/// additive: tags already on the article stay attached.
async fn attach_tags(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    article_id: i64,
    tags: &[String],
    now: i64,
) -> Result<()> {
    for name in tags {
        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut **tx)
            .await?;

        let tag_id = match existing {
            Some(id) => id,
            None => {
                let result = sqlx::query("INSERT INTO tags (name, created_at) VALUES (?, ?)")
                    .bind(name)
                    .bind(now)
                    .execute(&mut **tx)
                    .await?;
                result.last_insert_rowid()
            }
        };

        sqlx::query("INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

/// Soft-delete: flip status to archived. Returns `false` when the
/// article does not exist.
pub async fn archive_article(pool: &SqlitePool, id: i64) -> Result<bool> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query("UPDATE articles SET status = ?, updated_at = ? WHERE id = ?")
        .bind(ArticleStatus::Archived.as_str())
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get_status(pool: &SqlitePool, id: i64) -> Result<Option<ArticleStatus>> {
    let status: Option<String> = sqlx::query_scalar("SELECT status FROM articles WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(status.as_deref().and_then(ArticleStatus::parse))
}

/// Fetch one article with its category and tag names. Archived articles
/// remain retrievable here.
pub async fn get_article(pool: &SqlitePool, id: i64) -> Result<Option<ArticleDetail>> {
    let row = sqlx::query(
        "SELECT a.id, a.title, a.body, a.author, a.status, a.created_at, a.updated_at, \
                c.id AS category_id, c.name AS category_name \
         FROM articles a \
         LEFT JOIN categories c ON c.id = a.category_id \
         WHERE a.id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let row = match row {
        Some(row) => row,
        None => return Ok(None),
    };

    let tag_rows = sqlx::query(
        "SELECT t.name FROM tags t \
         JOIN article_tags at ON at.tag_id = t.id \
         WHERE at.article_id = ? \
         ORDER BY t.name",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let tags: Vec<String> = tag_rows.iter().map(|r| r.get("name")).collect();

    let category = row
        .get::<Option<i64>, _>("category_id")
        .map(|category_id| CategoryRef {
            id: category_id,
            name: row.get("category_name"),
        });

    Ok(Some(ArticleDetail {
        id: row.get("id"),
        title: row.get("title"),
        body: row.get("body"),
        author: row.get("author"),
        status: row.get("status"),
        category,
        tags,
        created_at: format_ts_iso(row.get("created_at")),
        updated_at: format_ts_iso(row.get("updated_at")),
    }))
}

/// Paginated active articles, newest first, optionally filtered by a
/// simple-search term.
pub async fn list_active(
    pool: &SqlitePool,
    search_term: Option<&str>,
    page: Option<u32>,
    per_page: u32,
    orphans: u32,
) -> Result<ArticleList> {
    let (where_sql, binds) = match search_term {
        Some(term) => {
            let filter = search::simple_filter(term);
            (format!("a.status = 'active' AND {}", filter.sql), filter.binds)
        }
        None => ("a.status = 'active'".to_string(), Vec::new()),
    };
    paged_list(pool, &where_sql, &binds, page, per_page, orphans).await
}

/// Paginated active articles carrying the given tag (case-insensitive
/// exact name match), newest first.
pub async fn list_by_tag(
    pool: &SqlitePool,
    tag: &str,
    page: Option<u32>,
    per_page: u32,
    orphans: u32,
) -> Result<ArticleList> {
    let filter = search::tag_filter(tag);
    let where_sql = format!("a.status = 'active' AND {}", filter.sql);
    paged_list(pool, &where_sql, &filter.binds, page, per_page, orphans).await
}

/// Archived side-list for the index view, newest first, unpaginated.
pub async fn list_archived(pool: &SqlitePool) -> Result<Vec<ArticleSummary>> {
    let rows = sqlx::query(
        "SELECT a.id, a.title, a.author, a.status, a.created_at \
         FROM articles a WHERE a.status = 'archived' \
         ORDER BY a.created_at DESC, a.id DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(ArticleSummary::from_row).collect())
}

/// Unpaginated simple search over active articles (the CLI path).
pub async fn search_active(pool: &SqlitePool, term: &str) -> Result<Vec<ArticleSummary>> {
    let filter = search::simple_filter(term);
    let sql = format!(
        "SELECT a.id, a.title, a.author, a.status, a.created_at \
         FROM articles a WHERE a.status = 'active' AND {} \
         ORDER BY a.created_at DESC, a.id DESC",
        filter.sql
    );

    let mut query = sqlx::query(&sql);
    for bind in &filter.binds {
        query = query.bind(bind);
    }
    let rows = query.fetch_all(pool).await?;
    Ok(rows.iter().map(ArticleSummary::from_row).collect())
}

async fn paged_list(
    pool: &SqlitePool,
    where_sql: &str,
    binds: &[String],
    page: Option<u32>,
    per_page: u32,
    orphans: u32,
) -> Result<ArticleList> {
    let count_sql = format!("SELECT COUNT(*) FROM articles a WHERE {}", where_sql);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for bind in binds {
        count_query = count_query.bind(bind);
    }
    let count = count_query.fetch_one(pool).await?;

    let paginator = Paginator::new(count, per_page, orphans);
    let page = paginator.clamp_page(page);
    let (limit, offset) = paginator.limits(page);

    let list_sql = format!(
        "SELECT a.id, a.title, a.author, a.status, a.created_at \
         FROM articles a WHERE {} \
         ORDER BY a.created_at DESC, a.id DESC \
         LIMIT ? OFFSET ?",
        where_sql
    );
    let mut query = sqlx::query(&list_sql);
    for bind in binds {
        query = query.bind(bind);
    }
    let rows = query.bind(limit).bind(offset).fetch_all(pool).await?;

    Ok(ArticleList {
        articles: rows.iter().map(ArticleSummary::from_row).collect(),
        page: paginator.meta(page),
    })
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
