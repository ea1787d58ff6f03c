//! Core data models used throughout Quillpress.
//!
//! These types mirror the relational schema: articles with a visibility
//! status, the comments attached to them, categories, and tags.

use std::fmt;

/// Visibility state of an article.
///
/// `Archived` is a soft-delete: the row stays in place and keeps its
/// comments, it just drops out of the default listings and stops
/// accepting comment writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleStatus {
    Active,
    Archived,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Active => "active",
            ArticleStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ArticleStatus::Active),
            "archived" => Some(ArticleStatus::Archived),
            _ => None,
        }
    }

    pub fn is_archived(&self) -> bool {
        matches!(self, ArticleStatus::Archived)
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An article row. Timestamps are Unix seconds.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub status: ArticleStatus,
    pub category_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A comment row. Belongs to exactly one article and is removed with it.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Comment {
    pub id: i64,
    pub article_id: i64,
    pub body: String,
    pub author: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A category row. Deletion is blocked while any article references it.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A tag row. Created on demand while saving articles.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}
