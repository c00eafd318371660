//! API integration tests against a running server
//!
//! Start the server with a fresh database, then run with:
//! cargo test --test api_tests -- --ignored

use reqwest::{header, Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Create a genre, tolerating one left over from an earlier run
async fn ensure_genre(client: &Client, name: &str) {
    let response = client
        .post(format!("{}/genres", BASE_URL))
        .json(&json!({ "name": name }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(matches!(response.status(), StatusCode::CREATED | StatusCode::CONFLICT));
}

async fn create_author(client: &Client, name: &str) -> i64 {
    let response = client
        .post(format!("{}/authors", BASE_URL))
        .json(&json!({ "name": name, "bio": "Integration test author" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["author_number"].as_i64().expect("No author number in response")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_author_lost_update() {
    let client = Client::new();
    let number = create_author(&client, "Lost Update Author").await;
    let uri = format!("{}/authors/{}", BASE_URL, number);

    let response = client.get(&uri).send().await.expect("Failed to send request");
    let etag = response
        .headers()
        .get(header::ETAG)
        .and_then(|v| v.to_str().ok())
        .expect("No ETag")
        .to_string();

    let first = client
        .patch(&uri)
        .header(header::IF_MATCH, &etag)
        .json(&json!({ "bio": "First writer" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(first.status(), StatusCode::OK);

    let second = client
        .patch(&uri)
        .header(header::IF_MATCH, &etag)
        .json(&json!({ "bio": "Second writer" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let body: Value = client
        .get(&uri)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(body["bio"], "First writer");
}

#[tokio::test]
#[ignore]
async fn test_book_lifecycle() {
    let client = Client::new();
    ensure_genre(&client, "Integration").await;
    let author = create_author(&client, "Book Lifecycle Author").await;

    // ISBN-13 built from the author number so reruns don't collide
    let isbn = isbn13(&format!("978{:09}", author));
    let uri = format!("{}/books/{}", BASE_URL, isbn);

    let created = client
        .put(&uri)
        .json(&json!({
            "title": "Lifecycle",
            "genre": "Integration",
            "authors": [author],
            "photo_uri": "cover.jpg"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(created.status(), StatusCode::CREATED);

    let duplicate = client
        .put(&uri)
        .json(&json!({ "title": "Again", "genre": "Integration", "authors": [author] }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let missing_version = client
        .patch(&uri)
        .json(&json!({ "title": "No version" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(missing_version.status(), StatusCode::BAD_REQUEST);

    let updated = client
        .patch(&uri)
        .header(header::IF_MATCH, "\"1\"")
        .json(&json!({ "title": "Lifecycle, revised" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(
        updated.headers().get(header::ETAG).and_then(|v| v.to_str().ok()),
        Some("\"2\"")
    );

    let removed = client
        .delete(format!("{}/photo", uri))
        .header(header::IF_MATCH, "\"2\"")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(removed.status(), StatusCode::OK);

    let body: Value = removed.json().await.expect("Failed to parse response");
    assert!(body["photo"].is_null());
    assert_eq!(body["title"], "Lifecycle, revised");
}

#[tokio::test]
#[ignore]
async fn test_search_books() {
    let client = Client::new();

    let response = client
        .post(format!("{}/books/search", BASE_URL))
        .json(&json!({ "page": { "number": 1, "limit": 5 }, "query": { "title": "e" } }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["books"].as_array().map(|b| b.len() <= 5).unwrap_or(false));
}

/// Complete a 12-digit ISBN-13 prefix with its check digit
fn isbn13(prefix: &str) -> String {
    let sum: u32 = prefix
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d } else { d * 3 })
        .sum();
    format!("{}{}", prefix, (10 - sum % 10) % 10)
}
