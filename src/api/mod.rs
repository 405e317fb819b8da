// HTTP routes served behind the gate

use axum::{
    Extension, Router,
    extract::{OriginalUri, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::auth::SessionContext;
use crate::env_check::auth_env_summary;
use crate::gate::{Gate, ResolvedLocale, gate_request};

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<Gate>,
    /// Enables diagnostics that must never run in production
    pub development: bool,
}

pub fn create_router(state: AppState) -> Router {
    let gate = state.gate.clone();

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/test-env", get(test_env))
        .route("/api/session", get(current_session))
        .fallback(page)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(gate, gate_request)),
        )
}

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "message": "Service is healthy",
    }))
}

async fn test_env(State(state): State<AppState>) -> Response {
    if !state.development {
        return (StatusCode::FORBIDDEN, "Not available in production").into_response();
    }

    Json(auth_env_summary(|name| std::env::var(name).ok())).into_response()
}

async fn current_session(Extension(session): Extension<SessionContext>) -> Json<Value> {
    Json(serde_json::json!({
        "display": session.display(),
        "session": session,
    }))
}

/// Stand-in for page rendering: reports what the gate resolved.
async fn page(
    OriginalUri(uri): OriginalUri,
    Extension(ResolvedLocale(locale)): Extension<ResolvedLocale>,
    Extension(session): Extension<SessionContext>,
) -> Json<Value> {
    Json(serde_json::json!({
        "path": uri.path(),
        "locale": locale,
        "authenticated": session.is_authenticated(),
        "tier": session.tier().as_str(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use axum::body::Body;
    use axum::http::{Request, header};
    use tower::ServiceExt;

    fn router(development: bool) -> Router {
        let gate = Gate::new(&GateConfig::default()).unwrap();
        create_router(AppState {
            gate: Arc::new(gate),
            development,
        })
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri).header(header::ACCEPT_LANGUAGE, "zh");
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn location(response: &Response) -> Option<&str> {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_locale_redirects_with_307() {
        let response = router(false)
            .oneshot(get_request("/dashboard", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), Some("/zh/dashboard"));
    }

    #[tokio::test]
    async fn test_protected_page_redirects_to_login() {
        let response = router(false)
            .oneshot(get_request("/zh/dashboard", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), Some("/zh/login?from=%2Fzh%2Fdashboard"));
    }

    #[tokio::test]
    async fn test_protected_page_passes_with_cookie() {
        let response = router(false)
            .oneshot(get_request(
                "/zh/dashboard",
                Some("next-auth.session-token=opaque"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["path"], "/zh/dashboard");
        assert_eq!(body["locale"], "zh");
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["tier"], "cookie_present");
    }

    #[tokio::test]
    async fn test_public_page_passes() {
        let response = router(false)
            .oneshot(get_request("/en/pricing", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // locale comes from Accept-Language, not the path prefix
        let body = body_json(response).await;
        assert_eq!(body["locale"], "zh");
        assert_eq!(body["authenticated"], false);
        assert_eq!(body["tier"], "anonymous");
    }

    #[tokio::test]
    async fn test_health_is_reachable_without_session() {
        let response = router(false)
            .oneshot(get_request("/api/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_session_endpoint_requires_session() {
        let response = router(false)
            .oneshot(get_request("/api/session", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), Some("/zh/login?from=%2Fapi%2Fsession"));

        let response = router(false)
            .oneshot(get_request(
                "/api/session",
                Some("__Secure-next-auth.session-token=opaque"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["display"], "Signed-in user");
        assert_eq!(body["session"]["tier"], "cookie_present");
        assert_eq!(body["session"]["is_admin"], false);
    }

    #[tokio::test]
    async fn test_env_diagnostics_forbidden_outside_development() {
        let cookie = Some("next-auth.session-token=opaque");

        let response = router(false)
            .oneshot(get_request("/api/test-env", cookie))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = router(true)
            .oneshot(get_request("/api/test-env", cookie))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_dashboard_closed_in_presence_mode() {
        let response = router(false)
            .oneshot(get_request(
                "/admin/dashboard",
                Some("next-auth.session-token=opaque"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), Some("/admin/login"));
    }
}
