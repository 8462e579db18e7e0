/// Integration tests for the BookRelay API
///
/// These tests verify the full system works end-to-end:
/// - Registration, activation, and login
/// - The lending lifecycle (borrow → return → approve → borrow again)
/// - Eligibility rules (own book, double borrow, archived mid-loan)
/// - Feedback submission and on-read rating
///
/// All tests require PostgreSQL (`TEST_DATABASE_URL` or `DATABASE_URL`)
/// and are `#[ignore]`d in the default run:
///
/// ```bash
/// cargo test -p bookrelay-api -- --ignored
/// ```

mod common;

use axum::http::StatusCode;
use common::{json_request, send_json, TestContext};
use serde_json::json;

async fn create_book(
    ctx: &TestContext,
    auth: &str,
    title: &str,
    shareable: bool,
) -> anyhow::Result<String> {
    let (status, body) = send_json(
        &ctx.app,
        json_request(
            "POST",
            "/v1/books",
            auth,
            Some(json!({
                "title": title,
                "author_name": "Ursula K. Le Guin",
                "isbn": "9780441478125",
                "synopsis": "An envoy alone on a frozen world",
                "shareable": shareable
            })),
        ),
    )
    .await?;

    anyhow::ensure!(status == StatusCode::CREATED, "create book failed: {}", body);
    Ok(body["id"].as_str().expect("book id").to_string())
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let ctx = TestContext::new().await.unwrap();

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, body) = send_json(&ctx.app, request).await.unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
#[ignore]
async fn test_registration_activation_and_login() {
    let ctx = TestContext::new().await.unwrap();
    let email = format!("reg-{}@example.com", uuid::Uuid::new_v4());

    // Register
    let (status, body) = send_json(
        &ctx.app,
        axum::http::Request::builder()
            .method("POST")
            .uri("/v1/auth/register")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(
                json!({
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "email": email,
                    "password": "SecurePass123"
                })
                .to_string(),
            ))
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::ACCEPTED, "register failed: {}", body);
    let user_id = body["user_id"].as_str().unwrap().to_string();

    // Login before activation is rejected
    let login = || {
        axum::http::Request::builder()
            .method("POST")
            .uri("/v1/auth/login")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(
                json!({ "email": email, "password": "SecurePass123" }).to_string(),
            ))
            .unwrap()
    };
    let (status, body) = send_json(&ctx.app, login()).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "account_not_activated");

    // Fetch the mailed code straight from the database
    let (code,): (String,) = sqlx::query_as(
        "SELECT code FROM activation_tokens WHERE user_id = $1::uuid ORDER BY created_at DESC LIMIT 1",
    )
    .bind(&user_id)
    .fetch_one(&ctx.db)
    .await
    .unwrap();

    // A bogus code is rejected
    let (status, body) = send_json(
        &ctx.app,
        axum::http::Request::builder()
            .method("POST")
            .uri("/v1/auth/activate")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(json!({ "code": "000000" }).to_string()))
            .unwrap(),
    )
    .await
    .unwrap();
    // 000000 could collide with a real code, but six CSPRNG digits
    // colliding with this run's token is not a practical concern
    assert_eq!(status, StatusCode::BAD_REQUEST, "unexpected: {}", body);

    // The real code activates the account
    let (status, _) = send_json(
        &ctx.app,
        axum::http::Request::builder()
            .method("POST")
            .uri("/v1/auth/activate")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(json!({ "code": code }).to_string()))
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);

    // Replaying the consumed code reads as unknown, not expired
    let (status, body) = send_json(
        &ctx.app,
        axum::http::Request::builder()
            .method("POST")
            .uri("/v1/auth/activate")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(json!({ "code": code }).to_string()))
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "activation_token_invalid");

    // Login now succeeds and returns both tokens
    let (status, body) = send_json(&ctx.app, login()).await.unwrap();
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());

    // The refresh token mints a fresh access token
    let refresh_token = body["refresh_token"].as_str().unwrap();
    let (status, body) = send_json(
        &ctx.app,
        axum::http::Request::builder()
            .method("POST")
            .uri("/v1/auth/refresh")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(
                json!({ "refresh_token": refresh_token }).to_string(),
            ))
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());
}

#[tokio::test]
#[ignore]
async fn test_expired_activation_code_is_reissued() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.create_activated_user().await.unwrap();

    // Plant an expired, unconsumed token
    sqlx::query(
        "INSERT INTO activation_tokens (user_id, code, created_at, expires_at)
         VALUES ($1, '424242', NOW() - INTERVAL '20 minutes', NOW() - INTERVAL '5 minutes')",
    )
    .bind(user.id)
    .execute(&ctx.db)
    .await
    .unwrap();

    let (status, body) = send_json(
        &ctx.app,
        axum::http::Request::builder()
            .method("POST")
            .uri("/v1/auth/activate")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(json!({ "code": "424242" }).to_string()))
            .unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "activation_token_expired");

    // A fresh, unexpired token exists for the same user
    let (fresh,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM activation_tokens
         WHERE user_id = $1 AND validated_at IS NULL AND expires_at > NOW()",
    )
    .bind(user.id)
    .fetch_one(&ctx.db)
    .await
    .unwrap();
    assert_eq!(fresh, 1);
}

#[tokio::test]
#[ignore]
async fn test_full_lending_cycle() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.create_activated_user().await.unwrap();
    let borrower = ctx.create_activated_user().await.unwrap();
    let owner_auth = ctx.auth_header(&owner).unwrap();
    let borrower_auth = ctx.auth_header(&borrower).unwrap();

    let book_id = create_book(&ctx, &owner_auth, "The Dispossessed", true)
        .await
        .unwrap();

    // Borrow
    let uri = format!("/v1/books/{}/borrow", book_id);
    let (status, body) = send_json(&ctx.app, json_request("POST", &uri, &borrower_auth, None))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED, "borrow failed: {}", body);

    // Second borrow of the same book is rejected, whoever asks
    let (status, body) = send_json(&ctx.app, json_request("POST", &uri, &borrower_auth, None))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "operation_not_permitted");

    // The book shows up in the borrower's loan listing
    let (status, body) = send_json(
        &ctx.app,
        json_request("GET", "/v1/books/borrowed", &borrower_auth, None),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_elements"], 1);
    assert_eq!(body["content"][0]["returned"], false);

    // Owner cannot approve before the return is reported
    let approve_uri = format!("/v1/books/{}/return/approve", book_id);
    let (status, _) = send_json(
        &ctx.app,
        json_request("PATCH", &approve_uri, &owner_auth, None),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Borrower reports the return
    let return_uri = format!("/v1/books/{}/return", book_id);
    let (status, _) = send_json(
        &ctx.app,
        json_request("PATCH", &return_uri, &borrower_auth, None),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);

    // A second return finds no Borrowed loan
    let (status, _) = send_json(
        &ctx.app,
        json_request("PATCH", &return_uri, &borrower_auth, None),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The pending return shows up for the owner
    let (status, body) = send_json(
        &ctx.app,
        json_request("GET", "/v1/books/returned", &owner_auth, None),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_elements"], 1);

    // Owner approves; the loan closes
    let (status, _) = send_json(
        &ctx.app,
        json_request("PATCH", &approve_uri, &owner_auth, None),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);

    // A second approval finds nothing pending
    let (status, _) = send_json(
        &ctx.app,
        json_request("PATCH", &approve_uri, &owner_auth, None),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The closed loan frees the book for the next cycle
    let (status, _) = send_json(&ctx.app, json_request("POST", &uri, &borrower_auth, None))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
#[ignore]
async fn test_borrow_eligibility_rules() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.create_activated_user().await.unwrap();
    let borrower = ctx.create_activated_user().await.unwrap();
    let owner_auth = ctx.auth_header(&owner).unwrap();
    let borrower_auth = ctx.auth_header(&borrower).unwrap();

    // Owner cannot borrow their own book
    let shared = create_book(&ctx, &owner_auth, "Own Book", true).await.unwrap();
    let (status, body) = send_json(
        &ctx.app,
        json_request(
            "POST",
            &format!("/v1/books/{}/borrow", shared),
            &owner_auth,
            None,
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "operation_not_permitted");

    // Non-shareable books cannot be borrowed
    let private = create_book(&ctx, &owner_auth, "Private Book", false)
        .await
        .unwrap();
    let (status, _) = send_json(
        &ctx.app,
        json_request(
            "POST",
            &format!("/v1/books/{}/borrow", private),
            &borrower_auth,
            None,
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown books are a 404, not a rule violation
    let (status, _) = send_json(
        &ctx.app,
        json_request(
            "POST",
            &format!("/v1/books/{}/borrow", uuid::Uuid::new_v4()),
            &borrower_auth,
            None,
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_archiving_mid_loan_blocks_return() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.create_activated_user().await.unwrap();
    let borrower = ctx.create_activated_user().await.unwrap();
    let owner_auth = ctx.auth_header(&owner).unwrap();
    let borrower_auth = ctx.auth_header(&borrower).unwrap();

    let book_id = create_book(&ctx, &owner_auth, "Soon Archived", true)
        .await
        .unwrap();

    let (status, _) = send_json(
        &ctx.app,
        json_request(
            "POST",
            &format!("/v1/books/{}/borrow", book_id),
            &borrower_auth,
            None,
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    // Owner archives the book while it is out
    let (status, _) = send_json(
        &ctx.app,
        json_request(
            "PATCH",
            &format!("/v1/books/{}/archived", book_id),
            &owner_auth,
            Some(json!({ "value": true })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);

    // The in-flight loan is stuck until the owner restores the book
    let (status, body) = send_json(
        &ctx.app,
        json_request(
            "PATCH",
            &format!("/v1/books/{}/return", book_id),
            &borrower_auth,
            None,
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "operation_not_permitted");

    // Restoring the book unblocks the return
    let (status, _) = send_json(
        &ctx.app,
        json_request(
            "PATCH",
            &format!("/v1/books/{}/archived", book_id),
            &owner_auth,
            Some(json!({ "value": false })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(
        &ctx.app,
        json_request(
            "PATCH",
            &format!("/v1/books/{}/return", book_id),
            &borrower_auth,
            None,
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_only_owner_flips_visibility_flags() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.create_activated_user().await.unwrap();
    let other = ctx.create_activated_user().await.unwrap();
    let owner_auth = ctx.auth_header(&owner).unwrap();
    let other_auth = ctx.auth_header(&other).unwrap();

    let book_id = create_book(&ctx, &owner_auth, "Flag Book", true).await.unwrap();

    let (status, body) = send_json(
        &ctx.app,
        json_request(
            "PATCH",
            &format!("/v1/books/{}/shareable", book_id),
            &other_auth,
            Some(json!({ "value": false })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "operation_not_permitted");

    let (status, body) = send_json(
        &ctx.app,
        json_request(
            "PATCH",
            &format!("/v1/books/{}/shareable", book_id),
            &owner_auth,
            Some(json!({ "value": false })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["shareable"], false);
}

#[tokio::test]
#[ignore]
async fn test_feedback_and_rating() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.create_activated_user().await.unwrap();
    let reader_a = ctx.create_activated_user().await.unwrap();
    let reader_b = ctx.create_activated_user().await.unwrap();
    let owner_auth = ctx.auth_header(&owner).unwrap();
    let a_auth = ctx.auth_header(&reader_a).unwrap();
    let b_auth = ctx.auth_header(&reader_b).unwrap();

    let book_id = create_book(&ctx, &owner_auth, "Rated Book", true).await.unwrap();

    // A fresh book reads as 0.0
    let (status, body) = send_json(
        &ctx.app,
        json_request("GET", &format!("/v1/books/{}", book_id), &owner_auth, None),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rate"], 0.0);

    // Owner feedback on their own book is rejected
    let (status, _) = send_json(
        &ctx.app,
        json_request(
            "POST",
            "/v1/feedbacks",
            &owner_auth,
            Some(json!({ "book_id": book_id, "note": 5.0, "comment": "mine" })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // An out-of-range note is a validation error
    let (status, _) = send_json(
        &ctx.app,
        json_request(
            "POST",
            "/v1/feedbacks",
            &a_auth,
            Some(json!({ "book_id": book_id, "note": 6.5, "comment": "too high" })),
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Two readers leave notes 3.0 and 4.5
    for (auth, note, comment) in [(&a_auth, 3.0, "decent"), (&b_auth, 4.5, "great copy")] {
        let (status, body) = send_json(
            &ctx.app,
            json_request(
                "POST",
                "/v1/feedbacks",
                auth,
                Some(json!({ "book_id": book_id, "note": note, "comment": comment })),
            ),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED, "feedback failed: {}", body);
    }

    // Mean of [3.0, 4.5] = 3.75, displayed as 3.8
    let (status, body) = send_json(
        &ctx.app,
        json_request("GET", &format!("/v1/books/{}", book_id), &owner_auth, None),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rate"], 3.8);

    // Listing marks the caller's own entry
    let (status, body) = send_json(
        &ctx.app,
        json_request(
            "GET",
            &format!("/v1/feedbacks/book/{}", book_id),
            &a_auth,
            None,
        ),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_elements"], 2);
    let own_flags: Vec<bool> = body["content"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["own_feedback"].as_bool().unwrap())
        .collect();
    assert!(own_flags.contains(&true));
    assert!(own_flags.contains(&false));
}

#[tokio::test]
#[ignore]
async fn test_cover_upload_and_read() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.create_activated_user().await.unwrap();
    let other = ctx.create_activated_user().await.unwrap();
    let owner_auth = ctx.auth_header(&owner).unwrap();
    let other_auth = ctx.auth_header(&other).unwrap();

    let book_id = create_book(&ctx, &owner_auth, "Covered Book", true)
        .await
        .unwrap();

    // No cover yet
    let cover_uri = format!("/v1/books/{}/cover", book_id);
    let (status, _) = send_json(&ctx.app, json_request("GET", &cover_uri, &owner_auth, None))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Any authenticated member may upload, not only the owner
    use tower::ServiceExt;
    let upload = axum::http::Request::builder()
        .method("POST")
        .uri(&cover_uri)
        .header("authorization", &other_auth)
        .header("content-type", "application/octet-stream")
        .body(axum::body::Body::from(&b"fake image bytes"[..]))
        .unwrap();
    let response = ctx.app.clone().oneshot(upload).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Read it back
    let read = axum::http::Request::builder()
        .method("GET")
        .uri(&cover_uri)
        .header("authorization", &owner_auth)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = ctx.app.clone().oneshot(read).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"fake image bytes");
}

#[tokio::test]
#[ignore]
async fn test_listings_exclude_own_and_withdrawn_books() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.create_activated_user().await.unwrap();
    let viewer = ctx.create_activated_user().await.unwrap();
    let owner_auth = ctx.auth_header(&owner).unwrap();
    let viewer_auth = ctx.auth_header(&viewer).unwrap();

    let visible = create_book(&ctx, &owner_auth, "Visible", true).await.unwrap();
    create_book(&ctx, &owner_auth, "Private", false).await.unwrap();

    // The viewer sees only the shareable book
    let (status, body) = send_json(
        &ctx.app,
        json_request("GET", "/v1/books?page=0&size=50", &viewer_auth, None),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["content"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert!(titles.contains(&"Visible"));
    assert!(!titles.contains(&"Private"));

    // The owner sees none of their own books in the displayable feed
    let (_, body) = send_json(
        &ctx.app,
        json_request("GET", "/v1/books?page=0&size=50", &owner_auth, None),
    )
    .await
    .unwrap();
    let ids: Vec<&str> = body["content"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap())
        .collect();
    assert!(!ids.contains(&visible.as_str()));

    // But both appear in the owner's own listing
    let (_, body) = send_json(
        &ctx.app,
        json_request("GET", "/v1/books/owned?page=0&size=50", &owner_auth, None),
    )
    .await
    .unwrap();
    assert!(body["total_elements"].as_i64().unwrap() >= 2);

    // Unauthenticated requests are rejected
    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/v1/books")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = send_json(&ctx.app, request).await.unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
