mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::*;
use ingenialists_api::testing::{TestContext, WRITER_ID};

#[tokio::test]
async fn categories_are_publicly_readable() -> Result<()> {
    let ctx = TestContext::new();
    ctx.seed_category(1, "Rust");
    ctx.seed_category(2, "Go");
    let router = ctx.router();

    let all = get(&router, "/v1/categories").await?;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body.as_array().map(Vec::len), Some(2));

    let one = get(&router, "/v1/categories/1").await?;
    assert_eq!(one.status, StatusCode::OK);
    assert_eq!(one.body["name"], "Rust");
    Ok(())
}

#[tokio::test]
async fn get_missing_category_is_not_found() -> Result<()> {
    let ctx = TestContext::new();
    let res = get(&ctx.router(), "/v1/categories/42").await?;

    assert_error(&res, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn non_numeric_id_is_invalid_input() -> Result<()> {
    let ctx = TestContext::new();
    let res = get(&ctx.router(), "/v1/categories/abc").await?;

    assert_error(&res, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn administrator_creates_category_and_reader_cannot() -> Result<()> {
    let ctx = TestContext::new();
    let router = ctx.router();
    let body = json!({ "name": "Tech", "imageUrl": "https://img.test/tech.png" });

    let res = send(
        &router,
        "POST",
        "/v1/categories",
        Some("Administrator"),
        Some(body.clone()),
    )
    .await?;
    assert_eq!(res.status, StatusCode::OK, "body: {}", res.body);
    assert_eq!(res.body["name"], "Tech");
    assert!(res.body["id"].as_i64().is_some());

    let by_reader = send(&router, "POST", "/v1/categories", Some("Reader"), Some(body)).await?;
    assert_error(&by_reader, StatusCode::FORBIDDEN);

    let all = get(&router, "/v1/categories").await?;
    assert_eq!(all.body.as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn non_administrators_cannot_create_categories() -> Result<()> {
    let ctx = TestContext::new();
    let router = ctx.router();

    for token in ["Reader", "Writer"] {
        let res = send(
            &router,
            "POST",
            "/v1/categories",
            Some(token),
            Some(json!({ "name": "Tech" })),
        )
        .await?;
        assert_error(&res, StatusCode::FORBIDDEN);
    }

    let all = get(&router, "/v1/categories").await?;
    assert_eq!(all.body.as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn unauthenticated_create_is_forbidden() -> Result<()> {
    let ctx = TestContext::new();
    let res = send(
        &ctx.router(),
        "POST",
        "/v1/categories",
        None,
        Some(json!({ "name": "Tech" })),
    )
    .await?;

    assert_error(&res, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_invalid_input() -> Result<()> {
    let ctx = TestContext::new();
    let router = ctx.router();

    let missing_name = send(
        &router,
        "POST",
        "/v1/categories",
        Some("Administrator"),
        Some(json!({ "imageUrl": "x" })),
    )
    .await?;
    assert_error(&missing_name, StatusCode::BAD_REQUEST);

    let blank_name = send(
        &router,
        "POST",
        "/v1/categories",
        Some("Administrator"),
        Some(json!({ "name": "  " })),
    )
    .await?;
    assert_error(&blank_name, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn create_get_delete_round_trip() -> Result<()> {
    let ctx = TestContext::new();
    let router = ctx.router();

    let created = send(
        &router,
        "POST",
        "/v1/categories",
        Some("Administrator"),
        Some(json!({ "name": "Tech", "imageUrl": "http://x/y.png" })),
    )
    .await?;
    assert_eq!(created.status, StatusCode::OK);
    let uri = format!("/v1/categories/{}", created.body["id"]);

    let fetched = get(&router, &uri).await?;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["name"], "Tech");
    assert_eq!(fetched.body["imageUrl"], "http://x/y.png");

    let deleted = send(&router, "DELETE", &uri, Some("Administrator"), None).await?;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = get(&router, &uri).await?;
    assert_error(&gone, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn administrator_updates_category() -> Result<()> {
    let ctx = TestContext::new();
    ctx.seed_category(1, "Rust");
    let res = send(
        &ctx.router(),
        "PUT",
        "/v1/categories/1",
        Some("Administrator"),
        Some(json!({ "name": "Rust Lang", "imageUrl": "https://img.test/ferris.png" })),
    )
    .await?;

    assert_eq!(res.status, StatusCode::OK, "body: {}", res.body);
    assert_eq!(res.body["name"], "Rust Lang");
    assert_eq!(res.body["id"], 1);
    Ok(())
}

#[tokio::test]
async fn writer_cannot_update_or_delete_category() -> Result<()> {
    let ctx = TestContext::new();
    ctx.seed_category(1, "Rust");
    let router = ctx.router();

    let update = send(
        &router,
        "PUT",
        "/v1/categories/1",
        Some("Writer"),
        Some(json!({ "name": "Hijacked" })),
    )
    .await?;
    assert_error(&update, StatusCode::FORBIDDEN);

    let delete = send(&router, "DELETE", "/v1/categories/1", Some("Writer"), None).await?;
    assert_error(&delete, StatusCode::FORBIDDEN);

    let still = get(&router, "/v1/categories/1").await?;
    assert_eq!(still.body["name"], "Rust");
    Ok(())
}

#[tokio::test]
async fn update_missing_category_is_not_found() -> Result<()> {
    let ctx = TestContext::new();
    let res = send(
        &ctx.router(),
        "PUT",
        "/v1/categories/9",
        Some("Administrator"),
        Some(json!({ "name": "Nothing" })),
    )
    .await?;

    assert_error(&res, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn category_in_use_cannot_be_deleted() -> Result<()> {
    let ctx = TestContext::new();
    ctx.seed_category(1, "Rust");
    ctx.seed_article(10, WRITER_ID, 1, "Ownership");
    let router = ctx.router();

    let refused = send(
        &router,
        "DELETE",
        "/v1/categories/1",
        Some("Administrator"),
        None,
    )
    .await?;
    assert_error(&refused, StatusCode::BAD_REQUEST);

    let category = get(&router, "/v1/categories/1").await?;
    assert_eq!(category.status, StatusCode::OK);

    let article = get(&router, "/v1/articles/10").await?;
    assert_eq!(article.body["categoryId"], 1);
    assert_eq!(article.body["category"]["name"], "Rust");

    // Once the last article is gone the category can go too
    let removed = send(&router, "DELETE", "/v1/articles/10", Some("Writer"), None).await?;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);

    let deleted = send(
        &router,
        "DELETE",
        "/v1/categories/1",
        Some("Administrator"),
        None,
    )
    .await?;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    Ok(())
}
