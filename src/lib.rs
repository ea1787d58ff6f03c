//! # Quillpress
//!
//! A lightweight article and comment CMS: articles with tags and
//! categories, comments, soft-delete archival, simple and advanced
//! search, and orphan-aware pagination.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐    ┌─────────────────────┐    ┌──────────┐
//! │   CLI    │───▶│   Domain modules     │───▶│  SQLite   │
//! │ (quill)  │    │ articles / comments │    │  (sqlx)   │
//! └──────────┘    │ categories / search │    └──────────┘
//! ┌──────────┐    └─────────────────────┘
//! │   HTTP   │───────────▲
//! │  (axum)  │
//! └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! quill init                    # create database
//! quill serve                   # start the HTTP server
//! quill search "deployment"     # simple search from the shell
//! quill stats                   # what the site holds
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`forms`] | Request payloads and validation |
//! | [`pagination`] | Orphan-aware paginator |
//! | [`articles`] | Article CRUD, archival, tag attachment |
//! | [`comments`] | Comment CRUD |
//! | [`categories`] | Categories with protect-on-delete |
//! | [`search`] | Simple and advanced search |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod articles;
pub mod categories;
pub mod comments;
pub mod config;
pub mod db;
pub mod forms;
pub mod migrate;
pub mod models;
pub mod pagination;
pub mod search;
pub mod server;
pub mod stats;
