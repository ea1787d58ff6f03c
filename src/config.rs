use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8643".to_string()
}

/// Page sizes and orphan counts for the list views.
///
/// `*_orphans` is the minimum item count folded into the last page
/// rather than spilling onto a new one.
#[derive(Debug, Deserialize, Clone)]
pub struct PaginationConfig {
    #[serde(default = "default_articles_per_page")]
    pub articles_per_page: u32,
    #[serde(default = "default_article_orphans")]
    pub article_orphans: u32,
    #[serde(default = "default_tag_per_page")]
    pub tag_per_page: u32,
    #[serde(default = "default_article_orphans")]
    pub tag_orphans: u32,
    #[serde(default = "default_comments_per_page")]
    pub comments_per_page: u32,
    #[serde(default = "default_comment_list_per_page")]
    pub comment_list_per_page: u32,
    #[serde(default = "default_comment_list_orphans")]
    pub comment_list_orphans: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            articles_per_page: default_articles_per_page(),
            article_orphans: default_article_orphans(),
            tag_per_page: default_tag_per_page(),
            tag_orphans: default_article_orphans(),
            comments_per_page: default_comments_per_page(),
            comment_list_per_page: default_comment_list_per_page(),
            comment_list_orphans: default_comment_list_orphans(),
        }
    }
}

fn default_articles_per_page() -> u32 {
    3
}
fn default_article_orphans() -> u32 {
    1
}
fn default_tag_per_page() -> u32 {
    5
}
fn default_comments_per_page() -> u32 {
    5
}
fn default_comment_list_per_page() -> u32 {
    10
}
fn default_comment_list_orphans() -> u32 {
    3
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate pagination
    let p = &config.pagination;
    for (name, per_page) in [
        ("pagination.articles_per_page", p.articles_per_page),
        ("pagination.tag_per_page", p.tag_per_page),
        ("pagination.comments_per_page", p.comments_per_page),
        ("pagination.comment_list_per_page", p.comment_list_per_page),
    ] {
        if per_page == 0 {
            anyhow::bail!("{} must be >= 1", name);
        }
    }

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    Ok(config)
}
