use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use eventledger_core::export::RendererRegistry;
use eventledger_core::store::InMemoryStore;
use eventledger_core::{Ledger, LedgerSettings, LedgerStores};
use eventledger_shared::types::{EventId, UserId};
use eventledger_shared::{JwtConfig, JwtService};

use crate::{AppState, create_router};

struct TestApp {
    router: Router,
    jwt: Arc<JwtService>,
    store: Arc<InMemoryStore>,
    event_id: EventId,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let event_id = EventId::new();
        store.add_event(event_id, "Spring Hackathon", Some("workshop"));
        let ledger = Ledger::new(
            &LedgerStores::in_memory(store.clone()),
            LedgerSettings::default(),
            RendererRegistry::default(),
        );
        let jwt = Arc::new(JwtService::new(&JwtConfig {
            secret: "router-test-secret".to_string(),
            access_token_expiry_secs: 900,
        }));
        let state = AppState {
            ledger: Arc::new(ledger),
            jwt_service: jwt.clone(),
        };
        Self {
            router: create_router(state, Duration::from_secs(5)),
            jwt,
            store,
            event_id,
        }
    }

    fn token(&self, user: UserId, role: &str) -> String {
        self.jwt.generate_access_token(user.into_inner(), role).unwrap()
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
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
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        };
        (status, json)
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/api/v1/budgets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, _) = app
        .call(Method::GET, "/api/v1/budgets", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_budget_expense_lifecycle() {
    let app = TestApp::new();
    let committee = app.token(UserId::new(), "committee_member");
    let admin = app.token(UserId::new(), "admin");

    let (status, budget) = app
        .call(
            Method::POST,
            "/api/v1/budgets",
            Some(&committee),
            Some(json!({ "eventId": app.event_id.to_string(), "totalAmount": 1000 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = budget["id"].as_str().unwrap().to_string();
    assert_eq!(budget["spent_amount"], "0");
    assert_eq!(budget["remaining_amount"], "1000");

    let (status, budget) = app
        .call(
            Method::POST,
            &format!("/api/v1/budgets/{id}/expenses"),
            Some(&committee),
            Some(json!({
                "category": "food",
                "amount": "300",
                "description": "Pizza",
                "receipt": "receipts/pizza.jpg",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(budget["expenses"][0]["status"], "pending");
    let expense_id = budget["expenses"][0]["id"].as_str().unwrap().to_string();

    let status_uri = format!("/api/v1/budgets/{id}/expenses/{expense_id}/status");
    let (status, body) = app
        .call(Method::PUT, &status_uri, Some(&committee), Some(json!({ "status": "approved" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");

    let (status, budget) = app
        .call(Method::PUT, &status_uri, Some(&admin), Some(json!({ "status": "approved" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(budget["spent_amount"], "300");
    assert_eq!(budget["remaining_amount"], "700");

    let (status, page) = app
        .call(Method::GET, "/api/v1/budgets?search=hack", Some(&committee), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["meta"]["total"], 1);

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/v1/budgets/{id}"), Some(&committee), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.store.event(app.event_id).unwrap().budget_id, None);

    let (status, body) = app
        .call(Method::GET, &format!("/api/v1/budgets/{id}"), Some(&committee), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_second_active_budget_conflicts() {
    let app = TestApp::new();
    let committee = app.token(UserId::new(), "committee_member");
    let payload = json!({ "event_id": app.event_id.to_string(), "total_amount": "500" });

    let (status, _) = app
        .call(Method::POST, "/api/v1/budgets", Some(&committee), Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app
        .call(Method::POST, "/api/v1/budgets", Some(&committee), Some(payload))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");
}

#[tokio::test]
async fn test_invalid_payload_lists_fields() {
    let app = TestApp::new();
    let committee = app.token(UserId::new(), "committee_member");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/budgets",
            Some(&committee),
            Some(json!({ "total_amount": -1, "spent_amount": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"event_id"));
    assert!(fields.contains(&"total_amount"));
    assert!(fields.contains(&"spent_amount"));
}

#[tokio::test]
async fn test_malformed_json_and_path_are_validation_errors() {
    let app = TestApp::new();
    let committee = app.token(UserId::new(), "committee_member");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/budgets")
        .header(header::AUTHORIZATION, format!("Bearer {committee}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(Method::GET, "/api/v1/budgets/not-a-uuid", Some(&committee), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "path");
}

#[tokio::test]
async fn test_analytics_and_reconcile_permissions() {
    let app = TestApp::new();
    let member = app.token(UserId::new(), "member");
    let committee = app.token(UserId::new(), "committee_member");
    let admin = app.token(UserId::new(), "admin");

    let (status, _) = app
        .call(Method::GET, "/api/v1/budgets/analytics", Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::GET, "/api/v1/budgets/analytics", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totals"]["budget_count"], 0);

    let (status, _) = app
        .call(Method::POST, "/api/v1/budgets/reconcile", Some(&committee), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::POST, "/api/v1/budgets/reconcile", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "cleared": 0, "restored": 0 }));
}

#[tokio::test]
async fn test_export_csv_and_unsupported_format() {
    let app = TestApp::new();
    let admin_id = UserId::new();
    app.store.add_user(admin_id, "Ada Admin");
    let admin = app.token(admin_id, "admin");

    let (_, budget) = app
        .call(
            Method::POST,
            "/api/v1/budgets",
            Some(&admin),
            Some(json!({ "event_id": app.event_id.to_string(), "total_amount": 100 })),
        )
        .await;
    let id = budget["id"].as_str().unwrap().to_string();

    let request = Request::builder()
        .uri(format!("/api/v1/budgets/{id}/export?format=csv"))
        .header(header::AUTHORIZATION, format!("Bearer {admin}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains(".csv")
    );

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/budgets/{id}/export?format=pdf"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "format");
}

#[tokio::test]
async fn test_unknown_role_is_forbidden() {
    let app = TestApp::new();
    let token = app.token(UserId::from_uuid(Uuid::new_v4()), "treasurer");
    let (status, _) = app.call(Method::GET, "/api/v1/budgets", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
