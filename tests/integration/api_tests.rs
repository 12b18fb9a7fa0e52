//! API integration tests against the router over an in-memory catalog

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Datelike, Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use bookshelf_server::{
    api,
    config::{AppConfig, StoreBackend},
    models::{IdentityClaims, NewAuthor, NewBook},
    repository::{CatalogStore, MemoryCatalogStore},
    AppState,
};

struct TestApp {
    router: Router,
    store: Arc<MemoryCatalogStore>,
    token: String,
    author_id: i32,
    book_ids: [i32; 2],
}

/// Catalog seeded with "Test Author" and two of their books
async fn spawn_app() -> TestApp {
    let mut config = AppConfig::default();
    config.database.backend = StoreBackend::Memory;
    config.auth.jwt_secret = "integration-secret".to_string();

    let store = Arc::new(MemoryCatalogStore::new());
    let author = store
        .authors_create(&NewAuthor::new("Test Author"))
        .await
        .expect("seed author");
    let mut book_ids = [0; 2];
    for (slot, (title, year)) in [("Test Book 1", 2020), ("Test Book 2", 2021)].into_iter().enumerate() {
        let book = store
            .books_create(&NewBook {
                title: title.to_string(),
                publication_year: year,
                author: author.id,
            })
            .await
            .expect("seed book");
        book_ids[slot] = book.id;
    }

    let token = IdentityClaims::new("tester", Duration::hours(1))
        .create_token(&config.auth.jwt_secret)
        .expect("token");

    let state = AppState::new(config, store.clone());
    TestApp {
        router: api::create_router(state),
        store,
        token,
        author_id: author.id,
        book_ids,
    }
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, None).await
    }

    async fn write(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, Some(&self.token), body).await
    }

    async fn book_count(&self) -> i64 {
        self.store.books_count().await.unwrap()
    }
}

fn titles(page: &Value) -> Vec<String> {
    page["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;

    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.get("/api/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_writes_require_authentication() {
    let app = spawn_app().await;
    let book = format!("/api/books/{}", app.book_ids[0]);
    let payload = json!({"title": "Nope", "publication_year": 2000, "author": app.author_id});

    let attempts = [
        (Method::POST, "/api/books".to_string(), Some(payload.clone())),
        (Method::PUT, book.clone(), Some(payload.clone())),
        (Method::PATCH, book.clone(), Some(json!({"title": "Nope"}))),
        (Method::DELETE, book.clone(), None),
    ];
    for (method, uri, body) in attempts {
        let (status, _) = app.send(method.clone(), &uri, None, body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
    }

    assert_eq!(app.book_count().await, 2);
    let (_, book) = app.get(&book).await;
    assert_eq!(book["title"], "Test Book 1");
}

#[tokio::test]
async fn test_unauthenticated_write_to_missing_book_is_401() {
    let app = spawn_app().await;
    let (status, _) = app.send(Method::DELETE, "/api/books/9999", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_token_is_rejected_everywhere() {
    let app = spawn_app().await;

    let (status, _) = app.send(Method::GET, "/api/books", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = IdentityClaims::new("intruder", Duration::hours(1))
        .create_token("some-other-secret")
        .unwrap();
    let (status, _) = app
        .send(
            Method::POST,
            "/api/books",
            Some(&forged),
            Some(json!({"title": "Forged", "publication_year": 2000, "author": app.author_id})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.book_count().await, 2);
}

#[tokio::test]
async fn test_reads_are_open() {
    let app = spawn_app().await;

    let (status, page) = app.get("/api/books").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 2);

    let (status, _) = app.get(&format!("/api/authors/{}", app.author_id)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_round_trip() {
    let app = spawn_app().await;

    let (status, created) = app
        .write(
            Method::POST,
            "/api/books",
            Some(json!({"title": "New Book", "publication_year": 1999, "author": app.author_id})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "New Book");
    assert_eq!(created["publication_year"], 1999);
    assert_eq!(created["author"], app.author_id);

    let (status, fetched) = app.get(&format!("/api/books/{}", created["id"])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
    assert_eq!(app.book_count().await, 3);
}

#[tokio::test]
async fn test_future_publication_year_is_rejected() {
    let app = spawn_app().await;
    let next_year = Utc::now().year() + 1;

    let (status, errors) = app
        .write(
            Method::POST,
            "/api/books",
            Some(json!({"title": "Future", "publication_year": next_year, "author": app.author_id})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(errors["publication_year"].is_array());
    assert_eq!(app.book_count().await, 2);
}

#[tokio::test]
async fn test_ancient_publication_year_is_rejected() {
    let app = spawn_app().await;

    let (status, errors) = app
        .write(
            Method::POST,
            "/api/books",
            Some(json!({"title": "Ancient", "publication_year": 999, "author": app.author_id})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors["publication_year"][0], "must be 1000 or later");
    assert_eq!(app.book_count().await, 2);
}

#[tokio::test]
async fn test_invalid_body_reports_every_field() {
    let app = spawn_app().await;

    let (status, errors) = app
        .write(
            Method::POST,
            "/api/books",
            Some(json!({"title": "   ", "publication_year": 500, "author": 9999})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors["title"][0], "This field may not be blank.");
    assert!(errors["publication_year"].is_array());
    assert_eq!(errors["author"][0], "Invalid pk \"9999\" - object does not exist.");
}

#[tokio::test]
async fn test_put_requires_every_field() {
    let app = spawn_app().await;

    let (status, errors) = app
        .write(
            Method::PUT,
            &format!("/api/books/{}", app.book_ids[0]),
            Some(json!({"title": "Only a title"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors["publication_year"][0], "This field is required.");
    assert_eq!(errors["author"][0], "This field is required.");

    let (_, book) = app.get(&format!("/api/books/{}", app.book_ids[0])).await;
    assert_eq!(book["title"], "Test Book 1");
}

#[tokio::test]
async fn test_put_replaces_book() {
    let app = spawn_app().await;
    let uri = format!("/api/books/{}", app.book_ids[0]);

    let (status, book) = app
        .write(
            Method::PUT,
            &uri,
            Some(json!({"title": "Replaced", "publication_year": 1984, "author": app.author_id})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["id"], app.book_ids[0]);
    assert_eq!(book["title"], "Replaced");
    assert_eq!(book["publication_year"], 1984);
}

#[tokio::test]
async fn test_delete_book() {
    let app = spawn_app().await;
    let uri = format!("/api/books/{}", app.book_ids[1]);

    let (status, _) = app.write(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.book_count().await, 1);

    let (status, _) = app.get(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_missing_book_is_404() {
    let app = spawn_app().await;

    let (status, body) = app.write(Method::DELETE, "/api/books/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchResource");
    assert_eq!(app.book_count().await, 2);
}

#[tokio::test]
async fn test_non_numeric_id_is_404() {
    let app = spawn_app().await;

    let (status, _) = app.get("/api/books/abc").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get("/api/authors/abc").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_author_cascades_to_books() {
    let app = spawn_app().await;

    let removed = app.store.authors_delete(app.author_id).await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(app.book_count().await, 0);

    let (status, _) = app.get(&format!("/api/books/{}", app.book_ids[0])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/api/authors/{}", app.author_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ordering_by_publication_year_descending() {
    let app = spawn_app().await;

    let (status, page) = app.get("/api/books?ordering=-publication_year").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&page), vec!["Test Book 2", "Test Book 1"]);

    let (status, _) = app.get("/api/books?ordering=isbn").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_filter_by_author() {
    let app = spawn_app().await;
    let other = app.store.authors_create(&NewAuthor::new("Other Author")).await.unwrap();
    app.store
        .books_create(&NewBook {
            title: "Elsewhere".to_string(),
            publication_year: 2001,
            author: other.id,
        })
        .await
        .unwrap();

    let (status, page) = app.get(&format!("/api/books?author={}", app.author_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 2);
    assert!(page["results"]
        .as_array()
        .unwrap()
        .iter()
        .all(|b| b["author"] == app.author_id));

    let (status, _) = app.get("/api/books?author=someone").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_matches_title_and_author_name() {
    let app = spawn_app().await;

    let (_, page) = app.get("/api/books?search=book%202").await;
    assert_eq!(titles(&page), vec!["Test Book 2"]);

    let (_, page) = app.get("/api/books?search=TEST%20AUTHOR").await;
    assert_eq!(page["count"], 2);

    let (_, page) = app.get("/api/books?search=nothing-like-this").await;
    assert_eq!(page["count"], 0);
}

#[tokio::test]
async fn test_pagination() {
    let app = spawn_app().await;

    let (status, page) = app.get("/api/books?page_size=1&page=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 2);
    assert_eq!(page["previous"], 1);
    assert_eq!(page["next"], Value::Null);
    assert_eq!(titles(&page), vec!["Test Book 2"]);

    let (status, body) = app.get("/api/books?page=5").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Invalid page.");
}

#[tokio::test]
async fn test_largest_page_number_is_invalid_page() {
    let app = spawn_app().await;

    let (status, body) = app.get(&format!("/api/books?page={}", i64::MAX)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Invalid page.");

    let (status, body) = app
        .get(&format!("/api/books?page={}&page_size=100", i64::MAX))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Invalid page.");
}

#[tokio::test]
async fn test_example_scenario() {
    let app = spawn_app().await;

    let (status, page) = app.get("/api/books?publication_year=2020").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 1);
    assert_eq!(titles(&page), vec!["Test Book 1"]);

    let (status, author) = app.get(&format!("/api/authors/{}", app.author_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(author["name"], "Test Author");
    let books = author["books"].as_array().unwrap();
    assert_eq!(books.len(), 2);
    assert_eq!(books[0]["title"], "Test Book 2");
    assert_eq!(books[0]["publication_year"], 2021);
    assert_eq!(books[1]["title"], "Test Book 1");
    assert_eq!(books[1]["publication_year"], 2020);

    let (status, patched) = app
        .write(
            Method::PATCH,
            &format!("/api/books/{}", app.book_ids[0]),
            Some(json!({"title": "Partially Updated"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["title"], "Partially Updated");
    assert_eq!(patched["publication_year"], 2020);
}

#[tokio::test]
async fn test_author_list_nests_books() {
    let app = spawn_app().await;
    app.store.authors_create(&NewAuthor::new("Bookless Author")).await.unwrap();

    let (status, authors) = app.get("/api/authors").await;
    assert_eq!(status, StatusCode::OK);
    let authors = authors.as_array().unwrap();
    assert_eq!(authors.len(), 2);

    let bookless = authors.iter().find(|a| a["name"] == "Bookless Author").unwrap();
    assert_eq!(bookless["books"], json!([]));
    let seeded = authors.iter().find(|a| a["name"] == "Test Author").unwrap();
    assert_eq!(seeded["books"][0]["publication_year"], 2021);
}

#[tokio::test]
async fn test_authors_have_no_http_writes() {
    let app = spawn_app().await;

    let (status, _) = app
        .write(Method::POST, "/api/authors", Some(json!({"name": "Sneaky"})))
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
