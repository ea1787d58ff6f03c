//! Database statistics overview.
//!
//! A quick summary of what the site holds: article counts by status,
//! comments, categories, tags, and the most-used tags. Used by
//! `quill stats` to sanity-check a deployment at a glance.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_articles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
        .fetch_one(&pool)
        .await?;
    let active_articles: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE status = 'active'")
            .fetch_one(&pool)
            .await?;
    let total_comments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
        .fetch_one(&pool)
        .await?;
    let total_categories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(&pool)
        .await?;
    let total_tags: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Quillpress — Database Stats");
    println!("===========================");
    println!();
    println!("  Database:   {}", config.db.path.display());
    println!("  Size:       {}", format_bytes(db_size));
    println!();
    println!(
        "  Articles:   {} ({} active, {} archived)",
        total_articles,
        active_articles,
        total_articles - active_articles
    );
    println!("  Comments:   {}", total_comments);
    println!("  Categories: {}", total_categories);
    println!("  Tags:       {}", total_tags);

    // Most-used tags
    let tag_rows = sqlx::query(
        r#"
        SELECT t.name, COUNT(at.article_id) AS article_count
        FROM tags t
        LEFT JOIN article_tags at ON at.tag_id = t.id
        GROUP BY t.id
        ORDER BY article_count DESC, t.name ASC
        LIMIT 10
        "#,
    )
    .fetch_all(&pool)
    .await?;

    if !tag_rows.is_empty() {
        println!();
        println!("  Top tags:");
        println!("  {:<24} {:>8}", "TAG", "ARTICLES");
        println!("  {}", "-".repeat(33));
        for row in &tag_rows {
            let name: String = row.get("name");
            let count: i64 = row.get("article_count");
            println!("  {:<24} {:>8}", name, count);
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
