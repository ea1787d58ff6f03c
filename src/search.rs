//! Search query construction.
//!
//! Two search paths share this module:
//!
//! - **Simple search** (list views, `quill search`): one free-text term
//!   ORed across title contains / author contains / tag name equals.
//! - **Advanced search** (`POST /articles/search`): a checkbox-gated OR
//!   group over the text destinations, ANDed with a checkbox-gated OR
//!   group over the author destinations.
//!
//! Substring matches are case-insensitive `LIKE` with escaped wildcards;
//! tag and author equality matches are case-insensitive exact. Tag names
//! are stored with their original case: reads compare through `lower()`,
//! the write side stays exact.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::articles::ArticleSummary;
use crate::config::Config;
use crate::db;
use crate::forms::SearchTerms;

/// A WHERE fragment plus its bind values, in placeholder order.
#[derive(Debug, Clone)]
pub(crate) struct SqlFilter {
    pub sql: String,
    pub binds: Vec<String>,
}

/// Escape `%`, `_`, and the escape character itself, then wrap the term
/// for a contains match.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    format!("%{}%", escaped)
}

const TITLE_CONTAINS: &str = r"lower(a.title) LIKE lower(?) ESCAPE '\'";
const BODY_CONTAINS: &str = r"lower(a.body) LIKE lower(?) ESCAPE '\'";
const AUTHOR_CONTAINS: &str = r"lower(a.author) LIKE lower(?) ESCAPE '\'";
const AUTHOR_EQUALS: &str = "lower(a.author) = lower(?)";
const TAG_EQUALS: &str = "EXISTS (SELECT 1 FROM article_tags at \
     JOIN tags t ON t.id = at.tag_id \
     WHERE at.article_id = a.id AND lower(t.name) = lower(?))";
const COMMENT_BODY_CONTAINS: &str = "EXISTS (SELECT 1 FROM comments c \
     WHERE c.article_id = a.id AND lower(c.body) LIKE lower(?) ESCAPE '\\')";
const COMMENT_AUTHOR_EQUALS: &str = "EXISTS (SELECT 1 FROM comments c \
     WHERE c.article_id = a.id AND lower(c.author) = lower(?))";

/// Tag-view filter: any attached tag name equals the term.
pub(crate) fn tag_filter(tag: &str) -> SqlFilter {
    SqlFilter {
        sql: TAG_EQUALS.to_string(),
        binds: vec![tag.to_string()],
    }
}

/// Simple-search filter: title contains OR author contains OR tag equals.
pub(crate) fn simple_filter(term: &str) -> SqlFilter {
    let pattern = like_pattern(term);
    SqlFilter {
        sql: format!("({TITLE_CONTAINS} OR {AUTHOR_CONTAINS} OR {TAG_EQUALS})"),
        binds: vec![pattern.clone(), pattern, term.to_string()],
    }
}

/// Advanced-search filter from validated terms.
///
/// Each filled field contributes an OR group over its checked
/// destinations; the groups are ANDed. Validation guarantees a filled
/// field has at least one destination, so a group is never empty.
pub(crate) fn advanced_filter(terms: &SearchTerms) -> SqlFilter {
    let mut groups: Vec<String> = Vec::new();
    let mut binds: Vec<String> = Vec::new();

    if let Some(ref text) = terms.text {
        let pattern = like_pattern(text);
        let mut conditions: Vec<&str> = Vec::new();
        if terms.in_title {
            conditions.push(TITLE_CONTAINS);
            binds.push(pattern.clone());
        }
        if terms.in_text {
            conditions.push(BODY_CONTAINS);
            binds.push(pattern.clone());
        }
        if terms.in_tags {
            conditions.push(TAG_EQUALS);
            binds.push(text.clone());
        }
        if terms.in_comment_text {
            conditions.push(COMMENT_BODY_CONTAINS);
            binds.push(pattern.clone());
        }
        if !conditions.is_empty() {
            groups.push(format!("({})", conditions.join(" OR ")));
        }
    }

    if let Some(ref author) = terms.author {
        let mut conditions: Vec<&str> = Vec::new();
        if terms.author_in_articles {
            conditions.push(AUTHOR_EQUALS);
            binds.push(author.clone());
        }
        if terms.author_in_comments {
            conditions.push(COMMENT_AUTHOR_EQUALS);
            binds.push(author.clone());
        }
        if !conditions.is_empty() {
            groups.push(format!("({})", conditions.join(" OR ")));
        }
    }

    let sql = if groups.is_empty() {
        // Unreachable after validation; matches nothing rather than everything.
        "0".to_string()
    } else {
        groups.join(" AND ")
    };

    SqlFilter { sql, binds }
}

/// Execute an advanced search. Spans articles of every status and
/// returns distinct articles, newest first.
pub async fn run_advanced_search(
    pool: &SqlitePool,
    terms: &SearchTerms,
) -> Result<Vec<ArticleSummary>> {
    let filter = advanced_filter(terms);
    let sql = format!(
        "SELECT a.id, a.title, a.author, a.status, a.created_at \
         FROM articles a WHERE {} \
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

/// CLI entry point: simple search over active articles, printed to stdout.
pub async fn run_search(config: &Config, term: &str) -> Result<()> {
    let term = term.trim();
    if term.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let pool = db::connect(config).await?;
    let results = crate::articles::search_active(&pool, term).await?;

    if results.is_empty() {
        println!("No results.");
        pool.close().await;
        return Ok(());
    }

    for (i, article) in results.iter().enumerate() {
        println!("{}. {} — {}", i + 1, article.title, article.author);
        println!("    created: {}", article.created_at);
        println!("    id: {}", article.id);
        println!();
    }

    pool.close().await;
    Ok(())
}
