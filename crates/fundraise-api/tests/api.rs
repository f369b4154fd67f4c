use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use fundraise_api::AppStateInner;
use fundraise_api::auth::TokenIssuer;
use fundraise_api::payments::CheckoutLinks;
use fundraise_api::storage::Storage;
use fundraise_db::Database;
use fundraise_db::models::NewTransaction;
use fundraise_types::api::MAX_AMOUNT;

const BOUNDARY: &str = "fundraise-test-boundary";

const UPLOAD_LIMIT: usize = 1024 * 1024;

struct TestApp {
    router: Router,
    /// Upload storage root
    dir: TempDir,
    db_dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_dir = tempfile::tempdir().unwrap();
        let db = Database::open(&db_dir.path().join("fundraise.db")).unwrap();
        let storage = Storage::new(dir.path().to_path_buf()).await.unwrap();
        let state = AppStateInner::new(
            db,
            storage,
            TokenIssuer::new("test-secret", chrono::Duration::hours(1)),
            Arc::new(CheckoutLinks::new("https://pay.example.test/checkout".parse().unwrap()).unwrap()),
            UPLOAD_LIMIT,
        );
        Self {
            router: fundraise_api::router(state),
            dir,
            db_dir,
        }
    }

    /// A second connection to the app's database, for seeding rows directly.
    fn db(&self) -> Database {
        Database::open(&self.db_dir.path().join("fundraise.db")).unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn json(&self, method: &str, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn upload(&self, uri: &str, token: &str, field: &str, file_name: &str, bytes: &[u8]) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(field, file_name, bytes)))
            .unwrap();
        self.send(request).await
    }

    /// Register and return `(user_id, token)`.
    async fn register(&self, name: &str, email: &str) -> (i64, String) {
        let (status, body) = self
            .json(
                "POST",
                "/users",
                None,
                json!({
                    "name": name,
                    "occupation": "tester",
                    "email": email,
                    "password": "password123",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        (
            body["data"]["user"]["id"].as_i64().unwrap(),
            body["data"]["token"].as_str().unwrap().to_string(),
        )
    }

    async fn create_campaign(&self, token: &str, name: &str, goal: i64) -> i64 {
        let (status, body) = self
            .json(
                "POST",
                "/campaigns",
                Some(token),
                json!({
                    "name": name,
                    "short_description": "short",
                    "description": "long description",
                    "perks": "sticker, t-shirt",
                    "goal_amount": goal,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_i64().unwrap()
    }

    fn stored_files(&self) -> usize {
        walk(self.dir.path())
    }
}

fn walk(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let path = entry.unwrap().path();
            if path.is_dir() { walk(&path) } else { 1 }
        })
        .sum()
}

fn multipart_body(field: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

#[tokio::test]
async fn register_login_and_create_campaign() {
    let app = TestApp::new().await;
    let (user_id, _) = app.register("Ann", "a@x.com").await;

    let (status, body) = app
        .json("POST", "/sessions", None, json!({"email": "A@X.com", "password": "password123"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["status"], "success");
    assert_eq!(body["data"]["user"]["email"], "a@x.com");
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let campaign_id = app.create_campaign(&token, "Help", 1000).await;

    let (status, body) = app.get(&format!("/campaigns/{}", campaign_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let campaign = &body["data"];
    assert_eq!(campaign["name"], "Help");
    assert_eq!(campaign["user_id"], user_id);
    assert_eq!(campaign["owner"]["name"], "Ann");
    assert_eq!(campaign["perks"], json!(["sticker", "t-shirt"]));
    assert_eq!(campaign["current_amount"], 0);
    assert_eq!(campaign["backer_count"], 0);

    let (_, body) = app.get(&format!("/campaigns?user_id={}", user_id), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (_, body) = app.get("/campaigns?user_id=999", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn registration_rejects_duplicates_and_bad_input() {
    let app = TestApp::new().await;
    app.register("Ann", "a@x.com").await;

    let (status, body) = app
        .json(
            "POST",
            "/users",
            None,
            json!({"name": "Other", "occupation": "x", "email": "a@x.com", "password": "password123"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["meta"]["status"], "failed");

    let (status, body) = app
        .json("POST", "/users", None, json!({"name": "", "email": "nope", "password": "short"}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let errors = body["data"]["errors"].as_array().unwrap();
    assert!(errors.iter().any(|e| e == "name is required"));
    assert!(errors.iter().any(|e| e == "email must be a valid email address"));

    let (status, _) = app
        .json("POST", "/users", None, json!({"name": "x", "nickname": "y"}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn responses_never_expose_password_hashes() {
    let app = TestApp::new().await;
    let (status, body) = app
        .json(
            "POST",
            "/users",
            None,
            json!({"name": "Ann", "occupation": "dev", "email": "a@x.com", "password": "password123"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let text = body.to_string();
    assert!(!text.contains("password"));
    assert!(!text.contains("argon2"));
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let app = TestApp::new().await;
    app.register("Ann", "a@x.com").await;

    let (status, body) = app
        .json("POST", "/sessions", None, json!({"email": "a@x.com", "password": "wrong-password"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["meta"]["message"], "Login failed");

    let (status, _) = app
        .json("POST", "/sessions", None, json!({"email": "ghost@x.com", "password": "password123"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn email_availability_tracks_registration() {
    let app = TestApp::new().await;
    let check = json!({"email": "a@x.com"});

    let (status, body) = app.json("POST", "/email-checkers", None, check.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_available"], true);

    app.register("Ann", "a@x.com").await;
    let (_, body) = app.json("POST", "/email-checkers", None, check).await;
    assert_eq!(body["data"]["is_available"], false);
    assert_eq!(body["meta"]["message"], "Email is already registered");
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/users/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["meta"]["code"], 401);

    let (status, _) = app.get("/users/me", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, token) = app.register("Ann", "a@x.com").await;
    let (status, body) = app.get("/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Ann");
    assert_eq!(body["data"]["role"], "user");
}

#[tokio::test]
async fn profile_update_changes_name_only() {
    let app = TestApp::new().await;
    let (_, token) = app.register("Ann", "a@x.com").await;

    let (status, body) = app
        .json("PUT", "/users/me", Some(&token), json!({"name": "Annie", "occupation": "writer"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Annie");
    assert_eq!(body["data"]["occupation"], "writer");
    assert_eq!(body["data"]["email"], "a@x.com");

    let (_, body) = app.get("/users", Some(&token)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn campaign_update_keeps_original_owner() {
    let app = TestApp::new().await;
    let (owner_id, owner_token) = app.register("Ann", "a@x.com").await;
    let (_, editor_token) = app.register("Bob", "b@x.com").await;
    let campaign_id = app.create_campaign(&owner_token, "Help", 1000).await;

    let (status, body) = app
        .json(
            "PUT",
            &format!("/campaigns/{}", campaign_id),
            Some(&editor_token),
            json!({
                "name": "Help more",
                "short_description": "s",
                "description": "d",
                "perks": "mug",
                "goal_amount": 2000,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Help more");
    assert_eq!(body["data"]["goal_amount"], 2000);
    assert_eq!(body["data"]["user_id"], owner_id);
    assert_eq!(body["data"]["owner"]["name"], "Ann");

    let (status, _) = app
        .json(
            "PUT",
            "/campaigns/999",
            Some(&editor_token),
            json!({"name": "n", "short_description": "s", "description": "d", "perks": "p", "goal_amount": 1}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_or_malformed_campaign_ids() {
    let app = TestApp::new().await;
    let (status, _) = app.get("/campaigns/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/campaigns/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["meta"]["status"], "failed");
}

#[tokio::test]
async fn image_upload_for_missing_campaign_writes_nothing() {
    let app = TestApp::new().await;
    let (_, token) = app.register("Ann", "a@x.com").await;

    let (status, _) = app
        .upload("/campaigns/77/images", &token, "file", "cover.png", b"\x89PNG data")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stored_files(), 0);
}

#[tokio::test]
async fn image_upload_becomes_primary() {
    let app = TestApp::new().await;
    let (_, token) = app.register("Ann", "a@x.com").await;
    let campaign_id = app.create_campaign(&token, "Help", 1000).await;
    let uri = format!("/campaigns/{}/images", campaign_id);

    let (status, first) = app.upload(&uri, &token, "file", "one.png", b"first image").await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, second) = app.upload(&uri, &token, "file", "two.png", b"second image").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["data"]["is_primary"], true);

    let (_, body) = app.get(&format!("/campaigns/{}", campaign_id), None).await;
    let images = body["data"]["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    let primaries: Vec<&Value> = images.iter().filter(|i| i["is_primary"] == true).collect();
    assert_eq!(primaries.len(), 1);
    assert_eq!(primaries[0]["id"], second["data"]["id"]);
    assert_ne!(first["data"]["image_url"], second["data"]["image_url"]);
    assert_eq!(body["data"]["image_url"], second["data"]["image_url"]);
    assert_eq!(app.stored_files(), 2);

    let (status, _) = app.upload(&uri, &token, "other", "x.png", b"bytes").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn uploads_over_the_body_limit_are_rejected() {
    let app = TestApp::new().await;
    let (_, token) = app.register("Ann", "a@x.com").await;
    let campaign_id = app.create_campaign(&token, "Help", 1000).await;

    let oversized = vec![7u8; UPLOAD_LIMIT + 1];
    let (status, body) = app
        .upload(&format!("/campaigns/{}/images", campaign_id), &token, "file", "big.png", &oversized)
        .await;
    assert!(status.is_client_error(), "{} {}", status, body);
    assert_eq!(app.stored_files(), 0);

    let (status, _) = app
        .upload("/users/avatars", &token, "avatar", "big.png", &oversized)
        .await;
    assert!(status.is_client_error());
    assert_eq!(app.stored_files(), 0);
}

#[tokio::test]
async fn avatar_upload_sets_profile_image() {
    let app = TestApp::new().await;
    let (_, token) = app.register("Ann", "a@x.com").await;

    let (status, body) = app
        .upload("/users/avatars", &token, "avatar", "me.jpg", b"jpeg bytes")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_uploaded"], true);

    let (_, body) = app.get("/users/me", Some(&token)).await;
    let image_url = body["data"]["image_url"].as_str().unwrap();
    assert!(image_url.ends_with(".jpg"));
    assert!(app.dir.path().join(image_url).exists());

    let (status, body) = app
        .upload("/users/avatars", &token, "wrong", "me.jpg", b"jpeg bytes")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["is_uploaded"], false);
}

#[tokio::test]
async fn paid_notification_updates_campaign_totals_once() {
    let app = TestApp::new().await;
    let (_, owner_token) = app.register("Ann", "a@x.com").await;
    let (backer_id, backer_token) = app.register("Bob", "b@x.com").await;
    let campaign_id = app.create_campaign(&owner_token, "Help", 1000).await;

    let (status, body) = app
        .json(
            "POST",
            "/transactions",
            Some(&backer_token),
            json!({"campaign_id": campaign_id, "amount": 250}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let transaction = &body["data"];
    assert_eq!(transaction["status"], "pending");
    assert_eq!(transaction["user_id"], backer_id);
    let code = transaction["code"].as_str().unwrap().to_string();
    assert!(
        transaction["payment_url"]
            .as_str()
            .unwrap()
            .starts_with("https://pay.example.test/checkout/")
    );

    let (status, body) = app
        .json("POST", "/transactions/notifications", None, json!({"code": code, "status": "paid"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "paid");

    let (_, body) = app.get(&format!("/campaigns/{}", campaign_id), None).await;
    assert_eq!(body["data"]["current_amount"], 250);
    assert_eq!(body["data"]["backer_count"], 1);

    let (status, _) = app
        .json("POST", "/transactions/notifications", None, json!({"code": code, "status": "paid"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app.get(&format!("/campaigns/{}", campaign_id), None).await;
    assert_eq!(body["data"]["current_amount"], 250);

    let (_, body) = app.get(&format!("/campaigns/{}/transactions", campaign_id), None).await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Bob");

    let (_, body) = app.get("/transactions", Some(&backer_token)).await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["campaign"]["name"], "Help");
}

#[tokio::test]
async fn failed_notification_leaves_totals_untouched() {
    let app = TestApp::new().await;
    let (_, token) = app.register("Ann", "a@x.com").await;
    let campaign_id = app.create_campaign(&token, "Help", 1000).await;

    let (_, body) = app
        .json("POST", "/transactions", Some(&token), json!({"campaign_id": campaign_id, "amount": 90}))
        .await;
    let code = body["data"]["code"].as_str().unwrap().to_string();

    let (status, body) = app
        .json("POST", "/transactions/notifications", None, json!({"code": code, "status": "failed"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "failed");

    let (_, body) = app.get(&format!("/campaigns/{}", campaign_id), None).await;
    assert_eq!(body["data"]["current_amount"], 0);
    assert_eq!(body["data"]["backer_count"], 0);

    let (status, _) = app
        .json("POST", "/transactions/notifications", None, json!({"code": "TRX-NOPE", "status": "paid"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .json("POST", "/transactions/notifications", None, json!({"code": code, "status": "pending"}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn oversized_amounts_are_rejected() {
    let app = TestApp::new().await;
    let (_, token) = app.register("Ann", "a@x.com").await;
    let campaign_id = app.create_campaign(&token, "Help", 1000).await;

    let (status, body) = app
        .json(
            "POST",
            "/transactions",
            Some(&token),
            json!({"campaign_id": campaign_id, "amount": MAX_AMOUNT + 1}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["data"]["errors"][0],
        format!("amount must be at most {}", MAX_AMOUNT)
    );

    let (status, _) = app
        .json(
            "POST",
            "/campaigns",
            Some(&token),
            json!({
                "name": "Huge",
                "short_description": "s",
                "description": "d",
                "perks": "p",
                "goal_amount": i64::MAX,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn settlement_overflow_keeps_campaigns_readable() {
    let app = TestApp::new().await;
    let (_, owner_token) = app.register("Ann", "a@x.com").await;
    let (backer_id, _) = app.register("Bob", "b@x.com").await;
    let campaign_id = app.create_campaign(&owner_token, "Help", 1000).await;

    let db = app.db();
    for code in ["TRX-BIG-1", "TRX-BIG-2"] {
        db.create_transaction(&NewTransaction {
            campaign_id,
            user_id: backer_id,
            amount: i64::MAX,
            code,
            payment_url: "https://pay.example.test/checkout/x",
        })
        .unwrap();
    }

    let (status, _) = app
        .json("POST", "/transactions/notifications", None, json!({"code": "TRX-BIG-1", "status": "paid"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .json("POST", "/transactions/notifications", None, json!({"code": "TRX-BIG-2", "status": "paid"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.get(&format!("/campaigns/{}", campaign_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current_amount"], i64::MAX);
    assert_eq!(body["data"]["backer_count"], 1);

    let (status, _) = app.get("/campaigns", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get(&format!("/campaigns/{}/transactions", campaign_id), None).await;
    let rows = body["data"].as_array().unwrap();
    let second = rows.iter().find(|r| r["amount"] == i64::MAX && r["status"] == "pending");
    assert!(second.is_some());
}

#[tokio::test]
async fn pledges_to_unknown_campaigns_are_rejected() {
    let app = TestApp::new().await;
    let (_, token) = app.register("Ann", "a@x.com").await;

    let (status, _) = app
        .json("POST", "/transactions", Some(&token), json!({"campaign_id": 55, "amount": 10}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/campaigns/55/transactions", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_object());
}
