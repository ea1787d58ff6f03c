//! HTTP server for the article site.
//!
//! Exposes the CRUD surface, search, and listings as a JSON API.
//! Create/update routes accept either an HTML-form-encoded body or JSON
//! with the same field names, so plain form posts and API clients share
//! one handler.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/articles` | Paginated active articles + archived side-list (`page`, `search`) |
//! | `POST`   | `/articles` | Create an article |
//! | `GET`    | `/articles/{id}` | Article detail with paginated comments (`page`) |
//! | `PUT`    | `/articles/{id}` | Update an article |
//! | `DELETE` | `/articles/{id}` | Archive an article (soft-delete) |
//! | `GET`    | `/articles/tag/{tag}` | Paginated active articles carrying the tag |
//! | `POST`   | `/articles/search` | Advanced search |
//! | `GET`    | `/articles/{id}/comments` | Paginated comments for one article |
//! | `POST`   | `/articles/{id}/comments` | Comment on an active article |
//! | `GET`    | `/comments` | Paginated list of all comments |
//! | `POST`   | `/comments` | Create a comment naming an active article |
//! | `PUT`    | `/comments/{id}` | Edit a comment |
//! | `DELETE` | `/comments/{id}` | Delete a comment |
//! | `GET`    | `/categories` | List categories |
//! | `POST`   | `/categories` | Create a category |
//! | `DELETE` | `/categories/{id}` | Delete an unreferenced category |
//! | `GET`    | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one envelope:
//!
//! ```json
//! { "error": { "code": "validation", "message": "...", "fields": { "title": ["..."] } } }
//! ```
//!
//! Error codes: `bad_request` (400), `validation` (400, with a `fields`
//! map), `not_found` (404), `conflict` (409, protected category delete
//! or duplicate name), `internal` (500).
//!
//! Mutating a comment under an archived article answers `not_found`:
//! archived articles and their comment threads are read-only.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support
//! browser-based clients.

use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::articles::{self, ArticleDetail, ArticleSummary};
use crate::categories::{self, CategoryView};
use crate::comments::{self, CommentView};
use crate::config::Config;
use crate::db;
use crate::forms::{
    ArticleForm, CategoryForm, CommentForm, FormErrors, FullSearchForm, SimpleSearchForm,
    StandaloneCommentForm,
};
use crate::models::ArticleStatus;
use crate::pagination::PageMeta;
use crate::search;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pool: sqlx::SqlitePool,
}

/// Starts the HTTP server.
///
/// Binds to the address configured in `[server].bind` and serves until
/// the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let pool = db::connect(config).await?;

    let state = AppState {
        config: Arc::new(config.clone()),
        pool,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route(
            "/articles",
            get(handle_list_articles).post(handle_create_article),
        )
        .route("/articles/search", post(handle_search))
        .route("/articles/tag/{tag}", get(handle_tag_list))
        .route(
            "/articles/{id}",
            get(handle_get_article)
                .put(handle_update_article)
                .delete(handle_archive_article),
        )
        .route(
            "/articles/{id}/comments",
            get(handle_article_comments).post(handle_create_article_comment),
        )
        .route(
            "/comments",
            get(handle_list_comments).post(handle_create_comment),
        )
        .route(
            "/comments/{id}",
            put(handle_update_comment).delete(handle_delete_comment),
        )
        .route(
            "/categories",
            get(handle_list_categories).post(handle_create_category),
        )
        .route("/categories/{id}", delete(handle_delete_category))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    tracing::info!(addr = %bind_addr, "listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error envelope.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"validation"`, `"not_found"`).
    code: String,
    /// Human-readable error message.
    message: String,
    /// Per-field validation messages, present for `validation` errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, Vec<String>>>,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    fields: Option<BTreeMap<String, Vec<String>>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                fields: self.fields,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
        fields: None,
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
        fields: None,
    }
}

fn conflict(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::CONFLICT,
        code: "conflict".to_string(),
        message: message.into(),
        fields: None,
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::warn!(error = %err, "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: err.to_string(),
        fields: None,
    }
}

/// 400 with the full per-field error map from form validation.
fn validation_error(errors: FormErrors) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "validation".to_string(),
        message: "Form validation failed.".to_string(),
        fields: Some(errors.into_fields()),
    }
}

/// Maps category-store errors onto the error contract: missing rows are
/// 404, duplicates and protected deletes are 409, the rest is 500.
fn classify_category_error(err: anyhow::Error) -> AppError {
    let msg = err.to_string();
    if msg.contains("not found") {
        not_found(msg)
    } else if msg.contains("already exists") || msg.contains("referenced") {
        conflict(msg)
    } else {
        internal(err)
    }
}

// ============ Body extraction ============

/// Accepts `application/json` or form-encoded bodies with identical
/// field names, so the CRUD forms and API clients share handlers.
struct FormOrJson<T>(T);

impl<S, T> FromRequest<S> for FormOrJson<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|ct| ct.trim_start().starts_with("application/json"))
            .unwrap_or(false);

        if is_json {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| bad_request(e.to_string()))?;
            Ok(FormOrJson(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| bad_request(e.to_string()))?;
            Ok(FormOrJson(value))
        }
    }
}

// ============ Query params ============

#[derive(Deserialize)]
struct ListParams {
    page: Option<u32>,
    search: Option<String>,
}

#[derive(Deserialize)]
struct PageParams {
    page: Option<u32>,
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Articles ============

#[derive(Serialize)]
struct IndexResponse {
    articles: Vec<ArticleSummary>,
    page: PageMeta,
    /// Soft-deleted articles, shown alongside the active list.
    archived_articles: Vec<ArticleSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<String>,
}

async fn handle_list_articles(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<IndexResponse>, AppError> {
    let form = SimpleSearchForm {
        search: params.search.unwrap_or_default(),
    };
    let term = form.term();

    let p = &state.config.pagination;
    let list = articles::list_active(
        &state.pool,
        term,
        params.page,
        p.articles_per_page,
        p.article_orphans,
    )
    .await
    .map_err(internal)?;
    let archived = articles::list_archived(&state.pool).await.map_err(internal)?;

    Ok(Json(IndexResponse {
        articles: list.articles,
        page: list.page,
        archived_articles: archived,
        search: term.map(str::to_string),
    }))
}

async fn handle_create_article(
    State(state): State<AppState>,
    FormOrJson(form): FormOrJson<ArticleForm>,
) -> Result<(StatusCode, Json<ArticleDetail>), AppError> {
    let valid = form.validate().map_err(validation_error)?;
    check_category_choice(&state, valid.category_id).await?;

    let id = articles::create_article(&state.pool, &valid)
        .await
        .map_err(internal)?;
    let detail = articles::get_article(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| internal(anyhow::anyhow!("article {} vanished after insert", id)))?;

    Ok((StatusCode::CREATED, Json(detail)))
}

/// An unknown category id is a form error, not a 404: it arrives in the
/// article form's select field.
async fn check_category_choice(state: &AppState, category_id: Option<i64>) -> Result<(), AppError> {
    if let Some(category_id) = category_id {
        let exists = categories::category_exists(&state.pool, category_id)
            .await
            .map_err(internal)?;
        if !exists {
            let mut errors = FormErrors::default();
            errors.add("category_id", "Select a valid choice.");
            return Err(validation_error(errors));
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ArticleResponse {
    article: ArticleDetail,
    comments: Vec<CommentView>,
    page: PageMeta,
}

async fn handle_get_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Json<ArticleResponse>, AppError> {
    let article = articles::get_article(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("article not found: {}", id)))?;

    // Detail-page comments never spill orphans.
    let list = comments::list_for_article(
        &state.pool,
        id,
        params.page,
        state.config.pagination.comments_per_page,
        0,
    )
    .await
    .map_err(internal)?;

    Ok(Json(ArticleResponse {
        article,
        comments: list.comments,
        page: list.page,
    }))
}

async fn handle_update_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    FormOrJson(form): FormOrJson<ArticleForm>,
) -> Result<Json<ArticleDetail>, AppError> {
    let valid = form.validate().map_err(validation_error)?;
    check_category_choice(&state, valid.category_id).await?;

    let updated = articles::update_article(&state.pool, id, &valid)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(not_found(format!("article not found: {}", id)));
    }

    let detail = articles::get_article(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("article not found: {}", id)))?;
    Ok(Json(detail))
}

async fn handle_archive_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let archived = articles::archive_article(&state.pool, id)
        .await
        .map_err(internal)?;
    if !archived {
        return Err(not_found(format!("article not found: {}", id)));
    }
    Ok(Json(serde_json::json!({ "id": id, "status": "archived" })))
}

#[derive(Serialize)]
struct TagListResponse {
    tag: String,
    articles: Vec<ArticleSummary>,
    page: PageMeta,
}

async fn handle_tag_list(
    State(state): State<AppState>,
    Path(tag): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<TagListResponse>, AppError> {
    let p = &state.config.pagination;
    let list = articles::list_by_tag(&state.pool, &tag, params.page, p.tag_per_page, p.tag_orphans)
        .await
        .map_err(internal)?;

    Ok(Json(TagListResponse {
        tag,
        articles: list.articles,
        page: list.page,
    }))
}

// ============ Advanced search ============

#[derive(Serialize)]
struct SearchResponse {
    articles: Vec<ArticleSummary>,
}

async fn handle_search(
    State(state): State<AppState>,
    FormOrJson(form): FormOrJson<FullSearchForm>,
) -> Result<Json<SearchResponse>, AppError> {
    let terms = form.validate().map_err(validation_error)?;
    let results = search::run_advanced_search(&state.pool, &terms)
        .await
        .map_err(internal)?;
    Ok(Json(SearchResponse { articles: results }))
}

// ============ Comments ============

#[derive(Serialize)]
struct CommentListResponse {
    comments: Vec<CommentView>,
    page: PageMeta,
}

async fn handle_article_comments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Json<CommentListResponse>, AppError> {
    if articles::get_status(&state.pool, id)
        .await
        .map_err(internal)?
        .is_none()
    {
        return Err(not_found(format!("article not found: {}", id)));
    }

    let list = comments::list_for_article(
        &state.pool,
        id,
        params.page,
        state.config.pagination.comments_per_page,
        0,
    )
    .await
    .map_err(internal)?;

    Ok(Json(CommentListResponse {
        comments: list.comments,
        page: list.page,
    }))
}

/// Archived articles accept no new comments; the guard answers as if
/// the article were gone.
async fn require_active_article(state: &AppState, article_id: i64) -> Result<(), AppError> {
    match articles::get_status(&state.pool, article_id)
        .await
        .map_err(internal)?
    {
        Some(status) if !status.is_archived() => Ok(()),
        _ => Err(not_found(format!("article not found: {}", article_id))),
    }
}

async fn handle_create_article_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    FormOrJson(form): FormOrJson<CommentForm>,
) -> Result<(StatusCode, Json<CommentView>), AppError> {
    require_active_article(&state, id).await?;

    let valid = form.validate().map_err(validation_error)?;
    let comment_id = comments::create_comment(&state.pool, id, &valid)
        .await
        .map_err(internal)?;
    let view = comments::get_comment(&state.pool, comment_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| internal(anyhow::anyhow!("comment {} vanished after insert", comment_id)))?;

    Ok((StatusCode::CREATED, Json(view)))
}

async fn handle_list_comments(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<CommentListResponse>, AppError> {
    let p = &state.config.pagination;
    let list = comments::list_all(
        &state.pool,
        params.page,
        p.comment_list_per_page,
        p.comment_list_orphans,
    )
    .await
    .map_err(internal)?;

    Ok(Json(CommentListResponse {
        comments: list.comments,
        page: list.page,
    }))
}

async fn handle_create_comment(
    State(state): State<AppState>,
    FormOrJson(form): FormOrJson<StandaloneCommentForm>,
) -> Result<(StatusCode, Json<CommentView>), AppError> {
    let valid = form.validate().map_err(validation_error)?;

    // The standalone form picks the article itself, and only active
    // articles are valid choices; a bad pick is a form error here, not
    // a missing resource.
    let status = articles::get_status(&state.pool, form.article_id)
        .await
        .map_err(internal)?;
    if !matches!(status, Some(ArticleStatus::Active)) {
        let mut errors = FormErrors::default();
        errors.add("article_id", "Select a valid choice.");
        return Err(validation_error(errors));
    }

    let comment_id = comments::create_comment(&state.pool, form.article_id, &valid)
        .await
        .map_err(internal)?;
    let view = comments::get_comment(&state.pool, comment_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| internal(anyhow::anyhow!("comment {} vanished after insert", comment_id)))?;

    Ok((StatusCode::CREATED, Json(view)))
}

async fn handle_update_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    FormOrJson(form): FormOrJson<CommentForm>,
) -> Result<Json<CommentView>, AppError> {
    let existing = comments::get_comment(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("comment not found: {}", id)))?;
    require_active_article(&state, existing.article_id).await?;

    let valid = form.validate().map_err(validation_error)?;
    comments::update_comment(&state.pool, id, &valid)
        .await
        .map_err(internal)?;

    let view = comments::get_comment(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("comment not found: {}", id)))?;
    Ok(Json(view))
}

async fn handle_delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let existing = comments::get_comment(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("comment not found: {}", id)))?;
    require_active_article(&state, existing.article_id).await?;

    comments::delete_comment(&state.pool, id)
        .await
        .map_err(internal)?;
    Ok(Json(serde_json::json!({ "id": id, "deleted": true })))
}

// ============ Categories ============

#[derive(Serialize)]
struct CategoriesResponse {
    categories: Vec<CategoryView>,
}

async fn handle_list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoriesResponse>, AppError> {
    let categories = categories::list_categories(&state.pool)
        .await
        .map_err(internal)?;
    Ok(Json(CategoriesResponse { categories }))
}

async fn handle_create_category(
    State(state): State<AppState>,
    FormOrJson(form): FormOrJson<CategoryForm>,
) -> Result<(StatusCode, Json<CategoryView>), AppError> {
    let name = form.validate().map_err(validation_error)?;
    let id = categories::create_category(&state.pool, &name)
        .await
        .map_err(classify_category_error)?;
    Ok((StatusCode::CREATED, Json(CategoryView { id, name })))
}

async fn handle_delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    categories::delete_category(&state.pool, id)
        .await
        .map_err(classify_category_error)?;
    Ok(Json(serde_json::json!({ "id": id, "deleted": true })))
}
