//! End-to-end HTTP tests against the in-process ledger store.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use ledgerline_api::{AppState, create_router};
use ledgerline_core::ledger::{LedgerService, LedgerStore, MemoryLedgerStore, UserProfile};
use ledgerline_shared::types::UserId;
use ledgerline_shared::{JwtConfig, JwtService, LedgerConfig};

struct TestApp {
    router: Router,
    store: MemoryLedgerStore,
    jwt: Arc<JwtService>,
}

impl TestApp {
    fn new() -> Self {
        let store = MemoryLedgerStore::new();
        let jwt = Arc::new(JwtService::new(JwtConfig {
            secret: "api-test-secret".to_string(),
            access_token_expires_minutes: 5,
        }));
        let state = AppState {
            ledger: LedgerService::new(Arc::new(store.clone()), &LedgerConfig::default()),
            jwt_service: Arc::clone(&jwt),
        };
        Self {
            router: create_router(state),
            store,
            jwt,
        }
    }

    fn token(&self, user: UserId) -> String {
        self.jwt.generate_access_token(user).unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn get(&self, user: UserId, uri: &str) -> (StatusCode, Value) {
        let request = Request::get(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn post(
        &self,
        user: UserId,
        uri: &str,
        body: &Value,
        idempotency_key: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::post(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)))
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(key) = idempotency_key {
            builder = builder.header("Idempotency-Key", key);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn account_ids(&self, user: UserId) -> (String, String) {
        let (status, body) = self.get(user, "/api/v1/accounts").await;
        assert_eq!(status, StatusCode::OK);
        (
            body[0]["id"].as_str().unwrap().to_string(),
            body[1]["id"].as_str().unwrap().to_string(),
        )
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let request = Request::get("/api/v1/health").body(Body::empty()).unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "reachable");
}

#[tokio::test]
async fn test_health_reports_closed_store() {
    let app = TestApp::new();
    app.store.close().await.unwrap();
    let request = Request::get("/api/v1/health").body(Body::empty()).unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["store"], "unreachable");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::new();
    let request = Request::get("/api/v1/accounts").body(Body::empty()).unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "MISSING_TOKEN");

    let request = Request::get("/api/v1/accounts")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_list_accounts_bootstraps_defaults() {
    let app = TestApp::new();
    let user = UserId::new();
    let (status, body) = app.get(user, "/api/v1/accounts").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["type"], "checking");
    assert_eq!(body[0]["balance"], "1000.00");
    assert_eq!(body[1]["type"], "savings");
    assert_eq!(body[1]["balance"], "5000.00");
}

#[tokio::test]
async fn test_transfer_then_statement() {
    let app = TestApp::new();
    let user = UserId::new();
    let (checking, savings) = app.account_ids(user).await;

    let (status, body) = app
        .post(
            user,
            "/api/v1/transfers",
            &json!({
                "source_account_id": checking,
                "destination_account_id": savings,
                "amount": "250.00",
                "description": "move"
            }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["kind"], "transfer");
    assert_eq!(body["status"], "completed");
    let transaction_id = body["transaction_id"].clone();

    let (_, accounts) = app.get(user, "/api/v1/accounts").await;
    assert_eq!(accounts[0]["balance"], "750.00");
    assert_eq!(accounts[1]["balance"], "5250.00");

    let (status, page) = app.get(user, "/api/v1/transactions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["meta"]["total"], 1);
    assert_eq!(page["data"][0]["id"], transaction_id);
    assert_eq!(page["data"][0]["direction"], "internal");
    assert_eq!(page["data"][0]["description"], "move");

    let (status, body) = app
        .post(
            user,
            "/api/v1/transfers",
            &json!({
                "source_account_id": checking,
                "destination_account_id": savings,
                "amount": "1000.00"
            }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "INSUFFICIENT_FUNDS");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_transfer_idempotency_key_replays() {
    let app = TestApp::new();
    let user = UserId::new();
    let (checking, savings) = app.account_ids(user).await;
    let body = json!({
        "source_account_id": checking,
        "destination_account_id": savings,
        "amount": "10.00"
    });

    let (first_status, first) = app
        .post(user, "/api/v1/transfers", &body, Some("retry-me"))
        .await;
    let (second_status, second) = app
        .post(user, "/api/v1/transfers", &body, Some("retry-me"))
        .await;

    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first["transaction_id"], second["transaction_id"]);
    assert_eq!(second["replayed"], true);

    let (_, accounts) = app.get(user, "/api/v1/accounts").await;
    assert_eq!(accounts[0]["balance"], "990.00");
}

#[tokio::test]
async fn test_rejects_numeric_amount_and_unknown_fields() {
    let app = TestApp::new();
    let user = UserId::new();
    let (checking, savings) = app.account_ids(user).await;

    let (status, _) = app
        .post(
            user,
            "/api/v1/transfers",
            &json!({
                "source_account_id": checking,
                "destination_account_id": savings,
                "amount": 10.5
            }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .post(
            user,
            "/api/v1/transfers",
            &json!({
                "source_account_id": checking,
                "destination_account_id": savings,
                "amount": "1.00",
                "memo": "extra"
            }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_transfer_from_foreign_account_is_forbidden() {
    let app = TestApp::new();
    let (alice, mallory) = (UserId::new(), UserId::new());
    let (alice_checking, _) = app.account_ids(alice).await;
    let (_, mallory_savings) = app.account_ids(mallory).await;

    let (status, body) = app
        .post(
            mallory,
            "/api/v1/transfers",
            &json!({
                "source_account_id": alice_checking,
                "destination_account_id": mallory_savings,
                "amount": "1.00"
            }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "INVALID_ACCOUNT_ACCESS");
}

#[tokio::test]
async fn test_payment_and_recipient_lookup() {
    let app = TestApp::new();
    let (alice, bob) = (UserId::new(), UserId::new());
    app.store
        .insert_user(UserProfile {
            id: bob,
            email: "bob@example.com".into(),
            username: "bob".into(),
            display_name: "Bob B.".into(),
        })
        .await;
    let (alice_checking, _) = app.account_ids(alice).await;
    let (bob_checking, _) = app.account_ids(bob).await;

    let (status, recipient) = app
        .get(alice, "/api/v1/recipients?identifier=BOB@example.com")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recipient["display_name"], "Bob B.");
    assert_eq!(recipient["account"]["id"], bob_checking.as_str());

    let (status, body) = app
        .post(
            alice,
            "/api/v1/payments",
            &json!({
                "source_account_id": alice_checking,
                "recipient": "bob",
                "amount": "42.50",
                "description": "dinner"
            }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["kind"], "payment");

    let (_, bob_page) = app.get(bob, "/api/v1/transactions").await;
    assert_eq!(bob_page["data"][0]["direction"], "incoming");
    assert_eq!(bob_page["data"][0]["amount"], "42.50");

    let (status, body) = app
        .get(alice, "/api/v1/recipients?identifier=nobody")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "RECIPIENT_NOT_FOUND");
}

#[tokio::test]
async fn test_deposit_and_withdrawal() {
    let app = TestApp::new();
    let user = UserId::new();
    let (checking, _) = app.account_ids(user).await;

    let (status, _) = app
        .post(
            user,
            &format!("/api/v1/accounts/{checking}/deposits"),
            &json!({ "amount": "100.00" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post(
            user,
            &format!("/api/v1/accounts/{checking}/withdrawals"),
            &json!({ "amount": "2000.00" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "INSUFFICIENT_FUNDS");

    let (status, body) = app
        .post(
            user,
            &format!("/api/v1/accounts/{checking}/withdrawals"),
            &json!({ "amount": "0" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ZERO_AMOUNT");

    let (_, accounts) = app.get(user, "/api/v1/accounts").await;
    assert_eq!(accounts[0]["balance"], "1100.00");
}

#[tokio::test]
async fn test_statement_cursor_and_invalid_cursor() {
    let app = TestApp::new();
    let user = UserId::new();
    let (checking, savings) = app.account_ids(user).await;
    for amount in ["1.00", "2.00", "3.00"] {
        let (status, _) = app
            .post(
                user,
                "/api/v1/transfers",
                &json!({
                    "source_account_id": checking,
                    "destination_account_id": savings,
                    "amount": amount
                }),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, first) = app.get(user, "/api/v1/transactions?limit=2").await;
    assert_eq!(first["data"].as_array().unwrap().len(), 2);
    let cursor = first["meta"]["next_cursor"].as_str().unwrap().to_string();

    let (status, second) = app
        .get(user, &format!("/api/v1/transactions?limit=2&before={cursor}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"].as_array().unwrap().len(), 1);
    assert_eq!(second["data"][0]["amount"], "1.00");

    let (status, body) = app
        .get(user, "/api/v1/transactions?before=garbage")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_CURSOR");
}
