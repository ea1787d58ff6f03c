//! End-to-end tests for the article API.
//!
//! These tests drive the real axum server over HTTP (bound to an
//! OS-assigned port) and, where it is more direct, the library
//! functions against the same database.

use quillpress::articles;
use quillpress::comments;
use quillpress::config::{load_config, Config};
use quillpress::db;
use quillpress::forms::ArticleForm;
use quillpress::migrate;
use quillpress::server::run_server;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ─── Harness ────────────────────────────────────────────────────────

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn write_config(root: &Path, port: u16) -> Config {
    let config_path = root.join("quill.toml");
    fs::write(
        &config_path,
        format!(
            r#"[db]
path = "{}/quill.sqlite"

[server]
bind = "127.0.0.1:{}"
"#,
            root.display(),
            port
        ),
    )
    .unwrap();
    load_config(&config_path).unwrap()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..100 {
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("server did not come up on port {}", port);
}

struct TestServer {
    _tmp: TempDir,
    port: u16,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        let tmp = TempDir::new().unwrap();
        let port = free_port();
        let config = write_config(tmp.path(), port);
        migrate::run_migrations(&config).await.unwrap();

        let cfg_clone = config.clone();
        let handle = tokio::spawn(async move {
            run_server(&cfg_clone).await.expect("server failed");
        });
        wait_for_server(port).await;

        Self {
            _tmp: tmp,
            port,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    async fn create_article(&self, title: &str, author: &str, body: &str, tag: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/articles"))
            .json(&json!({ "title": title, "author": author, "body": body, "tag": tag }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201, "create article failed");
        resp.json().await.unwrap()
    }
}

// ─── Article CRUD ───────────────────────────────────────────────────

#[tokio::test]
async fn test_article_crud_round_trip() {
    let srv = TestServer::start().await;

    let created = srv
        .create_article("Hello world", "ada", "First post.", "rust, web")
        .await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["status"], "active");
    assert_eq!(created["tags"], json!(["rust", "web"]));

    // Detail view
    let detail: Value = srv
        .client
        .get(srv.url(&format!("/articles/{}", id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["article"]["title"], "Hello world");
    assert_eq!(detail["article"]["author"], "ada");

    // Update: new title, one more tag. Tags are additive.
    let resp = srv
        .client
        .put(srv.url(&format!("/articles/{}", id)))
        .json(&json!({ "title": "Hello again", "body": "First post.", "author": "ada", "tag": "sqlite" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["title"], "Hello again");
    assert_eq!(updated["tags"], json!(["rust", "sqlite", "web"]));

    // Missing article is a 404.
    let resp = srv
        .client
        .get(srv.url("/articles/424242"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");

    srv.handle.abort();
}

#[tokio::test]
async fn test_article_validation_errors() {
    let srv = TestServer::start().await;

    let resp = srv
        .client
        .post(srv.url("/articles"))
        .json(&json!({ "title": "", "body": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "validation");
    assert!(body["error"]["fields"]["title"].is_array());
    assert!(body["error"]["fields"]["body"].is_array());

    // Unknown category is a form error, not a 404.
    let resp = srv
        .client
        .post(srv.url("/articles"))
        .json(&json!({ "title": "t", "body": "b", "category_id": 999 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"]["fields"]["category_id"].is_array());

    srv.handle.abort();
}

#[tokio::test]
async fn test_form_encoded_create() {
    let srv = TestServer::start().await;

    // The same handler accepts a plain HTML form post.
    let resp = srv
        .client
        .post(srv.url("/articles"))
        .form(&[
            ("title", "Form post"),
            ("body", "Posted as a form."),
            ("tag", "forms"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    // Blank author falls back to the default.
    assert_eq!(created["author"], "Unknown");
    assert_eq!(created["tags"], json!(["forms"]));

    srv.handle.abort();
}

// ─── Archival ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_archive_is_soft_delete() {
    let srv = TestServer::start().await;

    let created = srv.create_article("Keep me", "ada", "Body.", "").await;
    let id = created["id"].as_i64().unwrap();

    // Comment while still active.
    let resp = srv
        .client
        .post(srv.url(&format!("/articles/{}/comments", id)))
        .json(&json!({ "body": "nice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let comment: Value = resp.json().await.unwrap();
    assert_eq!(comment["author"], "anonymous");
    let comment_id = comment["id"].as_i64().unwrap();

    // Archive (the delete action).
    let resp = srv
        .client
        .delete(srv.url(&format!("/articles/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Row stays retrievable, comments stay in place.
    let detail: Value = srv
        .client
        .get(srv.url(&format!("/articles/{}", id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["article"]["status"], "archived");
    assert_eq!(detail["comments"].as_array().unwrap().len(), 1);

    // Gone from the active list, present in the archived side-list.
    let index: Value = srv
        .client
        .get(srv.url("/articles"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(index["articles"].as_array().unwrap().is_empty());
    assert_eq!(index["archived_articles"][0]["id"].as_i64().unwrap(), id);

    // Archived articles accept no comment writes: create, edit, and
    // delete all answer 404.
    let resp = srv
        .client
        .post(srv.url(&format!("/articles/{}/comments", id)))
        .json(&json!({ "body": "too late" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = srv
        .client
        .put(srv.url(&format!("/comments/{}", comment_id)))
        .json(&json!({ "body": "edited" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = srv
        .client
        .delete(srv.url(&format!("/comments/{}", comment_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    srv.handle.abort();
}

// ─── Tags ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_tag_rows_reused_not_recreated() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), free_port());
    migrate::run_migrations(&config).await.unwrap();
    let pool = db::connect(&config).await.unwrap();

    let first = ArticleForm {
        title: "One".into(),
        body: "b".into(),
        author: None,
        category_id: None,
        tag: "rust, rust , web,".into(),
    }
    .validate()
    .unwrap();
    articles::create_article(&pool, &first).await.unwrap();

    // Second article reuses "rust" and adds "sqlite".
    let second = ArticleForm {
        title: "Two".into(),
        body: "b".into(),
        author: None,
        category_id: None,
        tag: "rust, sqlite".into(),
    }
    .validate()
    .unwrap();
    articles::create_article(&pool, &second).await.unwrap();

    let tag_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(tag_count, 3, "expected rust/web/sqlite only");

    let rust_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE name = 'rust'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rust_count, 1);

    pool.close().await;
}

#[tokio::test]
async fn test_tag_view_matches_case_insensitively() {
    let srv = TestServer::start().await;

    let tagged = srv.create_article("Tagged", "ada", "Body.", "Rust").await;
    srv.create_article("Untagged", "ada", "Body.", "").await;
    let tagged_id = tagged["id"].as_i64().unwrap();

    let listing: Value = srv
        .client
        .get(srv.url("/articles/tag/rust"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let items = listing["articles"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"].as_i64().unwrap(), tagged_id);

    // Archived articles drop out of the tag view.
    srv.client
        .delete(srv.url(&format!("/articles/{}", tagged_id)))
        .send()
        .await
        .unwrap();
    let listing: Value = srv
        .client
        .get(srv.url("/articles/tag/rust"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listing["articles"].as_array().unwrap().is_empty());

    srv.handle.abort();
}

// ─── Index listing, simple search, pagination ───────────────────────

#[tokio::test]
async fn test_index_pagination_folds_orphans() {
    let srv = TestServer::start().await;

    // Default page size is 3 with 1 orphan: 4 articles fit on one page.
    for i in 0..4 {
        srv.create_article(&format!("Article {}", i), "ada", "Body.", "")
            .await;
    }

    let index: Value = srv
        .client
        .get(srv.url("/articles"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(index["articles"].as_array().unwrap().len(), 4);
    assert_eq!(index["page"]["num_pages"], 1);

    // A fifth spills: page 1 holds 3, page 2 holds 2.
    srv.create_article("Article 4", "ada", "Body.", "").await;
    let page1: Value = srv
        .client
        .get(srv.url("/articles"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page1["articles"].as_array().unwrap().len(), 3);
    assert_eq!(page1["page"]["num_pages"], 2);
    assert_eq!(page1["page"]["has_next"], true);

    let page2: Value = srv
        .client
        .get(srv.url("/articles?page=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page2["articles"].as_array().unwrap().len(), 2);

    // Out-of-range pages clamp to the last page.
    let clamped: Value = srv
        .client
        .get(srv.url("/articles?page=99"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(clamped["page"]["page"], 2);

    // Newest first.
    let ids: Vec<i64> = page1["articles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_i64().unwrap())
        .collect();
    let mut sorted = ids.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(ids, sorted);

    srv.handle.abort();
}

#[tokio::test]
async fn test_simple_search_filters_index() {
    let srv = TestServer::start().await;

    let by_title = srv
        .create_article("Learning Rust", "bob", "Body.", "")
        .await;
    let by_author = srv
        .create_article("Unrelated", "rustacean", "Body.", "")
        .await;
    let by_tag = srv
        .create_article("Also unrelated", "bob", "Body.", "rust")
        .await;
    srv.create_article("Nothing here", "bob", "Body.", "").await;

    let index: Value = srv
        .client
        .get(srv.url("/articles?search=rust"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<i64> = index["articles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids.len(), 3);
    for value in [&by_title, &by_author, &by_tag] {
        assert!(ids.contains(&value["id"].as_i64().unwrap()));
    }
    assert_eq!(index["search"], "rust");

    // Tag matching is exact: a prefix does not match through the tag
    // path, and nothing else carries "rus".
    let index: Value = srv
        .client
        .get(srv.url("/articles?search=rus"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let titles: Vec<&str> = index["articles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["title"].as_str().unwrap())
        .collect();
    assert!(!titles.contains(&"Also unrelated"));

    srv.handle.abort();
}

// ─── Advanced search ────────────────────────────────────────────────

#[tokio::test]
async fn test_advanced_search_validation() {
    let srv = TestServer::start().await;

    // Nothing filled.
    let resp = srv
        .client
        .post(srv.url("/articles/search"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "validation");

    // Text filled, no destination checked.
    let resp = srv
        .client
        .post(srv.url("/articles/search"))
        .json(&json!({ "text": "rust" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Author filled, no destination checked.
    let resp = srv
        .client
        .post(srv.url("/articles/search"))
        .json(&json!({ "author": "ada", "text": "rust", "in_title": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    srv.handle.abort();
}

#[tokio::test]
async fn test_advanced_search_destinations() {
    let srv = TestServer::start().await;

    let in_title = srv
        .create_article("Ownership explained", "ada", "Borrowing too.", "")
        .await;
    let in_body = srv
        .create_article("Memory", "bob", "All about ownership.", "")
        .await;
    let in_tag = srv
        .create_article("Tagged", "carol", "Body.", "ownership")
        .await;
    let commented = srv.create_article("Plain", "dave", "Body.", "").await;
    srv.client
        .post(srv.url(&format!(
            "/articles/{}/comments",
            commented["id"].as_i64().unwrap()
        )))
        .json(&json!({ "body": "ownership question", "author": "eve" }))
        .send()
        .await
        .unwrap();

    let search = |body: Value| {
        let client = srv.client.clone();
        let url = srv.url("/articles/search");
        async move {
            let resp = client.post(url).json(&body).send().await.unwrap();
            assert_eq!(resp.status(), 200);
            let out: Value = resp.json().await.unwrap();
            out["articles"]
                .as_array()
                .unwrap()
                .iter()
                .map(|a| a["id"].as_i64().unwrap())
                .collect::<Vec<i64>>()
        }
    };

    // Title only.
    let ids = search(json!({ "text": "ownership", "in_title": true })).await;
    assert_eq!(ids, vec![in_title["id"].as_i64().unwrap()]);

    // Title OR body OR tag OR comment text.
    let ids = search(json!({
        "text": "ownership",
        "in_title": true, "in_text": true, "in_tags": true, "in_comment_text": true
    }))
    .await;
    assert_eq!(ids.len(), 4);
    for value in [&in_title, &in_body, &in_tag, &commented] {
        assert!(ids.contains(&value["id"].as_i64().unwrap()));
    }

    // Author group ANDs with the text group: only bob's article both
    // mentions ownership and is authored by bob.
    let ids = search(json!({
        "text": "ownership",
        "in_title": true, "in_text": true, "in_tags": true,
        "author": "BOB", "author_in_articles": true
    }))
    .await;
    assert_eq!(ids, vec![in_body["id"].as_i64().unwrap()]);

    // Comment author destination.
    let ids = search(json!({ "author": "eve", "author_in_comments": true })).await;
    assert_eq!(ids, vec![commented["id"].as_i64().unwrap()]);

    srv.handle.abort();
}

#[tokio::test]
async fn test_advanced_search_spans_archived() {
    let srv = TestServer::start().await;

    let created = srv
        .create_article("Archived ownership", "ada", "Body.", "")
        .await;
    let id = created["id"].as_i64().unwrap();
    srv.client
        .delete(srv.url(&format!("/articles/{}", id)))
        .send()
        .await
        .unwrap();

    let resp = srv
        .client
        .post(srv.url("/articles/search"))
        .json(&json!({ "text": "ownership", "in_title": true }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let ids: Vec<i64> = body["articles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![id]);

    srv.handle.abort();
}

// ─── Comments ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_standalone_comment_form_rejects_archived_choice() {
    let srv = TestServer::start().await;

    let active = srv.create_article("Active", "ada", "Body.", "").await;
    let archived = srv.create_article("Archived", "ada", "Body.", "").await;
    let archived_id = archived["id"].as_i64().unwrap();
    srv.client
        .delete(srv.url(&format!("/articles/{}", archived_id)))
        .send()
        .await
        .unwrap();

    // Active article is a valid choice.
    let resp = srv
        .client
        .post(srv.url("/comments"))
        .json(&json!({ "article_id": active["id"], "body": "hi", "author": "eve" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    // Archived article is an invalid form choice, not a missing page.
    let resp = srv
        .client
        .post(srv.url("/comments"))
        .json(&json!({ "article_id": archived_id, "body": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "validation");
    assert!(body["error"]["fields"]["article_id"].is_array());

    srv.handle.abort();
}

#[tokio::test]
async fn test_comment_edit_and_list() {
    let srv = TestServer::start().await;

    let article = srv.create_article("Post", "ada", "Body.", "").await;
    let article_id = article["id"].as_i64().unwrap();

    let resp = srv
        .client
        .post(srv.url(&format!("/articles/{}/comments", article_id)))
        .json(&json!({ "body": "first", "author": "eve" }))
        .send()
        .await
        .unwrap();
    let comment: Value = resp.json().await.unwrap();
    let comment_id = comment["id"].as_i64().unwrap();

    let resp = srv
        .client
        .put(srv.url(&format!("/comments/{}", comment_id)))
        .json(&json!({ "body": "first, edited", "author": "eve" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let edited: Value = resp.json().await.unwrap();
    assert_eq!(edited["body"], "first, edited");

    // Global comment list sees it too.
    let listing: Value = srv
        .client
        .get(srv.url("/comments"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["comments"].as_array().unwrap().len(), 1);

    // Delete it.
    let resp = srv
        .client
        .delete(srv.url(&format!("/comments/{}", comment_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let listing: Value = srv
        .client
        .get(srv.url(&format!("/articles/{}/comments", article_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listing["comments"].as_array().unwrap().is_empty());

    srv.handle.abort();
}

#[tokio::test]
async fn test_archive_keeps_comment_rows() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), free_port());
    migrate::run_migrations(&config).await.unwrap();
    let pool = db::connect(&config).await.unwrap();

    let article = ArticleForm {
        title: "t".into(),
        body: "b".into(),
        author: None,
        category_id: None,
        tag: String::new(),
    }
    .validate()
    .unwrap();
    let article_id = articles::create_article(&pool, &article).await.unwrap();

    let comment = quillpress::forms::CommentForm {
        body: "hello".into(),
        author: None,
    }
    .validate()
    .unwrap();
    comments::create_comment(&pool, article_id, &comment)
        .await
        .unwrap();

    assert!(articles::archive_article(&pool, article_id).await.unwrap());

    let detail = articles::get_article(&pool, article_id).await.unwrap();
    assert_eq!(detail.unwrap().status, "archived");

    let list = comments::list_for_article(&pool, article_id, None, 5, 0)
        .await
        .unwrap();
    assert_eq!(list.comments.len(), 1);

    pool.close().await;
}

// ─── Categories ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_category_protect_semantics() {
    let srv = TestServer::start().await;

    let resp = srv
        .client
        .post(srv.url("/categories"))
        .json(&json!({ "name": "news" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let category: Value = resp.json().await.unwrap();
    let category_id = category["id"].as_i64().unwrap();

    // Duplicate name conflicts.
    let resp = srv
        .client
        .post(srv.url("/categories"))
        .json(&json!({ "name": "news" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // Reference it from an article, then try to delete.
    let resp = srv
        .client
        .post(srv.url("/articles"))
        .json(&json!({ "title": "t", "body": "b", "category_id": category_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let article: Value = resp.json().await.unwrap();
    let article_id = article["id"].as_i64().unwrap();
    assert_eq!(article["category"]["name"], "news");

    let resp = srv
        .client
        .delete(srv.url(&format!("/categories/{}", category_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "conflict");

    // Clear the reference; delete then goes through.
    let resp = srv
        .client
        .put(srv.url(&format!("/articles/{}", article_id)))
        .json(&json!({ "title": "t", "body": "b" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = srv
        .client
        .delete(srv.url(&format!("/categories/{}", category_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Missing category delete is a 404.
    let resp = srv
        .client
        .delete(srv.url(&format!("/categories/{}", category_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    srv.handle.abort();
}

// ─── Health ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health() {
    let srv = TestServer::start().await;

    let body: Value = srv
        .client
        .get(srv.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());

    srv.handle.abort();
}
