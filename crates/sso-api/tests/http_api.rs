use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sso_api::{router, AppState};
use sso_core::IdentityCore;
use sso_infrastructure::{LogNotifier, MemoryStore};
use sso_shared::config::{AppConfig, PasswordSettings};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let mut config = AppConfig::local("http-test-secret-0123456789abcdefghij");
    config.password = PasswordSettings { memory_kib: 1024, iterations: 1, parallelism: 1, ..Default::default() };
    let store = MemoryStore::new();
    let core = IdentityCore::new(&config, store.stores(), Arc::new(LogNotifier)).unwrap();
    router(AppState::new(core, config))
}

struct Call<'a> {
    method: Method,
    uri: &'a str,
    body: Option<Value>,
    bearer: Option<&'a str>,
    headers: Vec<(&'a str, &'a str)>,
}

impl<'a> Call<'a> {
    fn new(method: Method, uri: &'a str) -> Self {
        Self { method, uri, body: None, bearer: None, headers: Vec::new() }
    }

    fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    fn bearer(mut self, token: &'a str) -> Self {
        self.bearer = Some(token);
        self
    }

    fn header(mut self, name: &'a str, value: &'a str) -> Self {
        self.headers.push((name, value));
        self
    }

    async fn send(self, app: &Router) -> (StatusCode, Value) {
        let mut request = Request::builder().method(self.method).uri(self.uri);
        if let Some(token) = self.bearer {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in self.headers {
            request = request.header(name, value);
        }
        let body = match self.body {
            Some(body) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

async fn register(app: &Router, slug: &str, email: &str) -> Value {
    let (status, body) = Call::new(Method::POST, "/api/v1/auth/register")
        .json(json!({
            "tenant_name": "Acme Corp",
            "tenant_slug": slug,
            "email": email,
            "password": "password123",
            "name": "Alice"
        }))
        .send(app)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

fn access_token(data: &Value) -> String {
    data["tokens"]["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();
    let (status, body) = Call::new(Method::GET, "/health").send(&app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn register_then_login_three_ways() {
    let app = app();
    let data = register(&app, "acme", "alice@acme.test").await;
    assert_eq!(data["tenant"]["slug"], "acme");
    assert_eq!(data["user"]["role"], "admin");
    assert!(data["user"].get("password_hash").is_none());
    let tenant_id = data["tenant"]["id"].as_str().unwrap().to_string();

    let credentials = json!({ "email": "alice@acme.test", "password": "password123" });

    let mut by_slug = credentials.clone();
    by_slug["tenant_slug"] = json!("acme");
    let (status, _) = Call::new(Method::POST, "/api/v1/auth/login").json(by_slug).send(&app).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = Call::new(Method::POST, "/api/v1/auth/login")
        .json(credentials.clone())
        .header("X-Tenant-ID", &tenant_id)
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = Call::new(Method::POST, "/api/v1/auth/login")
        .json(credentials.clone())
        .header("Host", "acme.sso.example.com")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tokens"]["token_type"], "Bearer");

    let (status, body) = Call::new(Method::POST, "/api/v1/auth/login").json(credentials).send(&app).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "TENANT_REQUIRED");
}

#[tokio::test]
async fn wrong_password_and_unknown_tenant_look_alike() {
    let app = app();
    register(&app, "acme", "alice@acme.test").await;

    let (s1, b1) = Call::new(Method::POST, "/api/v1/auth/login")
        .json(json!({ "email": "alice@acme.test", "password": "nope-nope", "tenant_slug": "acme" }))
        .send(&app)
        .await;
    let (s2, b2) = Call::new(Method::POST, "/api/v1/auth/login")
        .json(json!({ "email": "alice@acme.test", "password": "password123", "tenant_slug": "globex" }))
        .send(&app)
        .await;

    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(b1["error"], b2["error"]);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = app();
    let (status, body) = Call::new(Method::GET, "/api/v1/profile").send(&app).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");

    let (status, _) = Call::new(Method::GET, "/api/v1/users").bearer("garbage").send(&app).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_agents() {
    let app = app();
    let data = register(&app, "acme", "alice@acme.test").await;
    let admin = access_token(&data);

    let (status, _) = Call::new(Method::POST, "/api/v1/users")
        .bearer(&admin)
        .json(json!({ "email": "eve@acme.test", "password": "password123", "name": "Eve", "role": "agent" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, login) = Call::new(Method::POST, "/api/v1/auth/login")
        .json(json!({ "email": "eve@acme.test", "password": "password123", "tenant_slug": "acme" }))
        .send(&app)
        .await;
    let agent = access_token(&login["data"]);

    let (status, body) = Call::new(Method::GET, "/api/v1/users").bearer(&agent).send(&app).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = Call::new(Method::GET, "/api/v1/profile").bearer(&agent).send(&app).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = Call::new(Method::GET, "/api/v1/users?limit=500").bearer(&admin).send(&app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["limit"], 100);
}

#[tokio::test]
async fn last_admin_and_self_delete_are_refused() {
    let app = app();
    let data = register(&app, "acme", "bob@acme.test").await;
    let token = access_token(&data);
    let me = data["user"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/users/{me}");

    let (status, body) = Call::new(Method::PATCH, &uri)
        .bearer(&token)
        .json(json!({ "role": "viewer" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "LAST_ADMIN");

    let (status, body) = Call::new(Method::DELETE, &uri).bearer(&token).send(&app).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "CANNOT_DELETE_SELF");

    let (status, body) = Call::new(Method::GET, "/api/v1/users/stats").bearer(&token).send(&app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["by_role"]["admin"], 1);
}

#[tokio::test]
async fn forgot_password_answers_the_same_for_everyone() {
    let app = app();
    register(&app, "acme", "alice@acme.test").await;

    let ask = |email: &'static str| {
        Call::new(Method::POST, "/api/v1/auth/forgot-password")
            .json(json!({ "email": email, "tenant_slug": "acme" }))
    };
    let (s1, b1) = ask("alice@acme.test").send(&app).await;
    let (s2, b2) = ask("ghost@acme.test").send(&app).await;

    assert_eq!(s1, StatusCode::OK);
    assert_eq!(s2, StatusCode::OK);
    assert_eq!(b1["message"], b2["message"]);

    let (status, body) = Call::new(Method::GET, "/api/v1/auth/reset-password/validate?token=bogus")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_RESET_TOKEN");
}

#[tokio::test]
async fn refresh_tokens_are_single_use() {
    let app = app();
    let data = register(&app, "acme", "alice@acme.test").await;
    let secret = data["tokens"]["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = Call::new(Method::POST, "/api/v1/auth/refresh")
        .json(json!({ "refresh_token": secret }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["data"]["tokens"]["refresh_token"], json!(secret));

    let (status, body) = Call::new(Method::POST, "/api/v1/auth/refresh")
        .json(json!({ "refresh_token": secret }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Invalid or expired refresh token");

    let (status, unknown) = Call::new(Method::POST, "/api/v1/auth/refresh")
        .json(json!({ "refresh_token": "never-issued" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown["error"], body["error"]);
    assert_eq!(body["error"]["code"], "INVALID_REFRESH_TOKEN");
}

#[tokio::test]
async fn tenant_admin_cannot_raise_own_user_limit() {
    let app = app();
    let data = register(&app, "acme", "alice@acme.test").await;
    let token = access_token(&data);

    let (status, _) = Call::new(Method::PATCH, "/api/v1/tenant")
        .bearer(&token)
        .json(json!({ "settings": { "max_users": 1000000 } }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = Call::new(Method::GET, "/api/v1/users/stats").bearer(&token).send(&app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["limit"], 100);
    assert_eq!(body["data"]["remaining"], 99);
}

#[tokio::test]
async fn profile_update_and_password_change() {
    let app = app();
    let data = register(&app, "acme", "alice@acme.test").await;
    let token = access_token(&data);

    let (status, body) = Call::new(Method::PATCH, "/api/v1/profile")
        .bearer(&token)
        .json(json!({ "name": "Alice Liddell" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Alice Liddell");

    let (status, body) = Call::new(Method::POST, "/api/v1/profile/password")
        .bearer(&token)
        .json(json!({ "current_password": "wrong-one", "new_password": "password456" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "WRONG_PASSWORD");

    let (status, _) = Call::new(Method::POST, "/api/v1/profile/password")
        .bearer(&token)
        .json(json!({ "current_password": "password123", "new_password": "password456" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = Call::new(Method::PATCH, "/api/v1/tenant")
        .bearer(&token)
        .json(json!({ "domain": "Acme.COM " }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["domain"], "acme.com");
}
