pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::http::middleware::RequestGate;
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by the admin routes.
#[derive(Clone)]
pub struct AdminState {
    pub gate: Arc<RequestGate>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(gate: Arc<RequestGate>, api_key: &str) -> Self {
        Self {
            gate,
            api_key: Arc::from(api_key),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/clients", get(get_clients))
        .route("/admin/prune", post(prune))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateSettings;
    use crate::security::clock::ManualClock;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::time::Duration;
    use tower::ServiceExt;

    fn state(clock: Arc<ManualClock>) -> AdminState {
        let settings = GateSettings {
            api_key: Some("abc123".into()),
            ..GateSettings::default()
        };
        AdminState::new(Arc::new(RequestGate::with_clock(&settings, clock)), "admin-key")
    }

    fn request(method: &str, path: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_requires_bearer_token() {
        let app = setup_admin_router(state(Arc::new(ManualClock::new())));

        let res = app.clone().oneshot(request("GET", "/admin/status", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app.oneshot(request("GET", "/admin/status", Some("nope"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_status() {
        let app = setup_admin_router(state(Arc::new(ManualClock::new())));
        let res = app.oneshot(request("GET", "/admin/status", Some("admin-key"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = json(res).await;
        assert_eq!(body["auth_mode"], "shared_secret");
        assert_eq!(body["window_secs"], 60);
        assert_eq!(body["max_requests"], 100);
        assert_eq!(body["tracked_clients"], 0);
    }

    #[tokio::test]
    async fn test_clients_and_prune() {
        let clock = Arc::new(ManualClock::new());
        let state = state(clock.clone());
        state.gate.limiter().check("1.2.3.4");
        clock.advance(Duration::from_secs(50));
        state.gate.limiter().check("5.6.7.8");
        state.gate.limiter().check("5.6.7.8");

        let app = setup_admin_router(state);
        let res = app
            .clone()
            .oneshot(request("GET", "/admin/clients", Some("admin-key")))
            .await
            .unwrap();
        let body = json(res).await;
        assert_eq!(body["tracked"], 2);
        assert_eq!(body["clients"][1]["identifier"], "5.6.7.8");
        assert_eq!(body["clients"][1]["count"], 2);

        clock.advance(Duration::from_secs(20));
        let res = app
            .oneshot(request("POST", "/admin/prune", Some("admin-key")))
            .await
            .unwrap();
        let body = json(res).await;
        assert_eq!(body["removed"], 1);
        assert_eq!(body["remaining"], 1);
    }
}
