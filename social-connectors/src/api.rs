//! OAuth HTTP routes.
//!
//! - `GET /api/oauth/platforms` - configured platforms
//! - `GET /api/oauth/:platform/start` - redirect the user to the provider
//! - `GET /api/oauth/:platform/callback` - provider redirect target
//!
//! The callback never renders an error page: every outcome is a redirect to
//! `<frontend_url>/accounts` with either `connected=<platform>` or a short
//! `error=<code>`.

use crate::registry::ConnectorRegistry;
use crate::sink::AccountSink;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use socialink::oauth::{callback_redirect, AuthorizationFlow, CallbackParams, Platform};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Shared state for the OAuth routes
#[derive(Clone)]
pub struct OAuthAppState {
    pub registry: Arc<ConnectorRegistry>,
    pub flow: AuthorizationFlow,
    pub sink: Arc<dyn AccountSink>,
    pub frontend_url: String,
}

/// Query parameters of the start route
#[derive(Debug, Deserialize)]
pub struct StartParams {
    pub user_id: Option<String>,
    pub organization_id: Option<String>,
}

#[derive(Serialize)]
pub struct PlatformsResponse {
    pub platforms: Vec<Platform>,
}

pub fn create_oauth_router(state: OAuthAppState) -> Router {
    Router::new()
        .route("/api/oauth/platforms", get(list_platforms))
        .route("/api/oauth/:platform/start", get(oauth_start))
        .route("/api/oauth/:platform/callback", get(oauth_callback))
        .with_state(Arc::new(state))
}

async fn list_platforms(State(state): State<Arc<OAuthAppState>>) -> Json<PlatformsResponse> {
    Json(PlatformsResponse {
        platforms: state.registry.platforms(),
    })
}

/// GET /api/oauth/:platform/start?user_id=&organization_id=
///
/// Issues a single-use state bound to the user and platform, then redirects
/// to the provider's consent page.
async fn oauth_start(
    State(state): State<Arc<OAuthAppState>>,
    Path(platform_name): Path<String>,
    Query(params): Query<StartParams>,
) -> Result<Redirect, AppError> {
    debug!(platform = %platform_name, "OAuth start requested");

    let platform: Platform = platform_name.parse().map_err(|_| {
        warn!(platform = %platform_name, "Unknown platform");
        AppError::NotFound(format!("Platform '{}' not found", platform_name))
    })?;

    let connector = state.registry.get(platform).ok_or_else(|| {
        warn!(platform = %platform, "Platform not configured");
        AppError::NotFound(format!(
            "OAuth not configured for '{}'. Set {}_CLIENT_ID and {}_CLIENT_SECRET.",
            platform,
            platform.env_prefix(),
            platform.env_prefix()
        ))
    })?;

    let user_id = params
        .user_id
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing 'user_id' parameter".to_string()))?;
    let organization_id = params.organization_id.filter(|o| !o.trim().is_empty());

    let start = state
        .flow
        .start(&*connector, &user_id, organization_id.as_deref());

    info!(platform = %platform, "Redirecting to OAuth provider");
    Ok(Redirect::temporary(&start.url))
}

/// GET /api/oauth/:platform/callback
async fn oauth_callback(
    State(state): State<Arc<OAuthAppState>>,
    Path(platform_name): Path<String>,
    query: Result<Query<CallbackParams>, QueryRejection>,
) -> Redirect {
    debug!(platform = %platform_name, "OAuth callback received");

    let Ok(platform) = platform_name.parse::<Platform>() else {
        warn!(platform = %platform_name, "Callback for unknown platform");
        return Redirect::to(&error_location(&state.frontend_url, "unsupported_platform", None));
    };
    let Some(connector) = state.registry.get(platform) else {
        warn!(platform = %platform, "Callback for unconfigured platform");
        return Redirect::to(&error_location(
            &state.frontend_url,
            "unsupported_platform",
            Some(platform),
        ));
    };

    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => {
            warn!(platform = %platform, error = %rejection, "Malformed callback query");
            return Redirect::to(&error_location(
                &state.frontend_url,
                "invalid_request",
                Some(platform),
            ));
        }
    };

    let outcome = state.flow.complete(&*connector, params).await;
    let mut location = callback_redirect(&state.frontend_url, platform, &outcome);

    if let Ok(account) = outcome {
        let user_id = account.user_id.clone();
        match state.sink.save(account).await {
            Ok(()) => info!(platform = %platform, user_id = %user_id, "Account connected"),
            Err(e) => {
                error!(platform = %platform, error = %e, "Failed to store connected account");
                location = error_location(&state.frontend_url, "storage_failed", Some(platform));
            }
        }
    }

    Redirect::to(&location)
}

fn error_location(frontend_url: &str, code: &str, platform: Option<Platform>) -> String {
    let mut location = format!(
        "{}/accounts?error={}",
        frontend_url.trim_end_matches('/'),
        code
    );
    if let Some(platform) = platform {
        location.push_str(&format!("&platform={}", platform));
    }
    location
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::test_support::client;
    use crate::platforms::TiktokConnector;
    use crate::sink::InMemoryAccountSink;
    use axum::body::Body;
    use axum::http::{header, Request};
    use mockito::{Matcher, Server};
    use socialink::oauth::OAuthStateStore;
    use std::collections::HashMap;
    use tower::util::ServiceExt;

    const FRONTEND: &str = "https://app.example.com";

    struct TestApp {
        router: Router,
        store: Arc<OAuthStateStore>,
        sink: Arc<InMemoryAccountSink>,
    }

    fn test_app(tiktok_base_url: &str) -> TestApp {
        let mut registry = ConnectorRegistry::new();
        registry.register(Arc::new(TiktokConnector::with_base_url(
            client(Platform::Tiktok),
            tiktok_base_url,
        )));

        let store = Arc::new(OAuthStateStore::default());
        let sink = Arc::new(InMemoryAccountSink::new());
        let state = OAuthAppState {
            registry: Arc::new(registry),
            flow: AuthorizationFlow::new(Arc::clone(&store)),
            sink: sink.clone(),
            frontend_url: FRONTEND.to_string(),
        };

        TestApp {
            router: create_oauth_router(state),
            store,
            sink,
        }
    }

    async fn get(router: &Router, uri: &str) -> Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        router.clone().oneshot(request).await.unwrap()
    }

    fn location(response: &Response) -> String {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    fn query_of(url: &str) -> HashMap<String, String> {
        let (_, query) = url.split_once('?').unwrap();
        serde_urlencoded::from_str(query).unwrap()
    }

    async fn mock_provider(server: &mut Server) -> (mockito::Mock, mockito::Mock) {
        let token = server
            .mock("POST", "/v2/oauth/token/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "act.1", "refresh_token": "rft.1", "expires_in": 86400, "open_id": "open-1"}"#)
            .create_async()
            .await;
        let profile = server
            .mock("GET", "/v2/user/info/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": {"user": {"open_id": "open-1", "display_name": "Creator"}}, "error": {"code": "ok"}}"#)
            .create_async()
            .await;
        (token, profile)
    }

    #[tokio::test]
    async fn test_list_platforms() {
        let app = test_app("http://127.0.0.1:9");
        let response = get(&app.router, "/api/oauth/platforms").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["platforms"], serde_json::json!(["tiktok"]));
    }

    #[tokio::test]
    async fn test_start_redirects_to_provider() {
        let app = test_app("https://tiktok.test");
        let response = get(&app.router, "/api/oauth/tiktok/start?user_id=user-1&organization_id=org-9").await;

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let url = location(&response);
        assert!(url.starts_with("https://tiktok.test/v2/auth/authorize/?"));

        let query = query_of(&url);
        assert_eq!(query["client_key"], "test_client_id");
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["state"].len(), 43);
        assert_eq!(app.store.len(), 1);
    }

    #[tokio::test]
    async fn test_start_unknown_platform() {
        let app = test_app("http://127.0.0.1:9");
        let response = get(&app.router, "/api/oauth/myspace/start?user_id=u").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_start_unconfigured_platform() {
        let app = test_app("http://127.0.0.1:9");
        let response = get(&app.router, "/api/oauth/linkedin/start?user_id=u").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("LINKEDIN_CLIENT_ID"));
    }

    #[tokio::test]
    async fn test_start_requires_user_id() {
        let app = test_app("http://127.0.0.1:9");
        let response = get(&app.router, "/api/oauth/tiktok/start").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(app.store.is_empty());
    }

    #[tokio::test]
    async fn test_callback_connects_account() {
        let mut server = Server::new_async().await;
        let (token, profile) = mock_provider(&mut server).await;
        let app = test_app(&server.url());

        let start = get(&app.router, "/api/oauth/tiktok/start?user_id=user-1").await;
        let state = query_of(&location(&start))["state"].clone();

        let callback = get(
            &app.router,
            &format!("/api/oauth/tiktok/callback?code=auth-code&state={}", state),
        )
        .await;

        assert!(callback.status().is_redirection());
        assert_eq!(location(&callback), format!("{}/accounts?connected=tiktok", FRONTEND));
        token.assert_async().await;
        profile.assert_async().await;

        let account = app.sink.get("user-1", Platform::Tiktok).unwrap();
        assert_eq!(account.profile.id, "open-1");
        assert!(!account.tokens.access_token.as_str().contains("act.1"));
        assert!(app.store.is_empty());
    }

    #[tokio::test]
    async fn test_callback_replay_is_rejected() {
        let mut server = Server::new_async().await;
        let _mocks = mock_provider(&mut server).await;
        let app = test_app(&server.url());

        let start = get(&app.router, "/api/oauth/tiktok/start?user_id=user-1").await;
        let state = query_of(&location(&start))["state"].clone();
        let uri = format!("/api/oauth/tiktok/callback?code=auth-code&state={}", state);

        let first = get(&app.router, &uri).await;
        assert!(location(&first).contains("connected=tiktok"));

        let second = get(&app.router, &uri).await;
        assert_eq!(
            location(&second),
            format!("{}/accounts?error=invalid_state&platform=tiktok", FRONTEND)
        );
    }

    #[tokio::test]
    async fn test_callback_invalid_state_never_reaches_provider() {
        let mut server = Server::new_async().await;
        let token = server
            .mock("POST", "/v2/oauth/token/")
            .expect(0)
            .create_async()
            .await;
        let app = test_app(&server.url());

        let response = get(&app.router, "/api/oauth/tiktok/callback?code=abc&state=invalid_state").await;
        assert_eq!(
            location(&response),
            format!("{}/accounts?error=invalid_state&platform=tiktok", FRONTEND)
        );
        token.assert_async().await;
        assert!(app.sink.is_empty());
    }

    #[tokio::test]
    async fn test_callback_provider_denial() {
        let app = test_app("http://127.0.0.1:9");
        let start = get(&app.router, "/api/oauth/tiktok/start?user_id=user-1").await;
        let state = query_of(&location(&start))["state"].clone();

        let response = get(
            &app.router,
            &format!(
                "/api/oauth/tiktok/callback?error=access_denied&error_description=User+cancelled&state={}",
                state
            ),
        )
        .await;

        let url = location(&response);
        assert!(url.contains("error=provider_rejected"));
        assert!(!url.contains("cancelled"));
        // The denied attempt's state cannot be reused
        assert!(app.store.is_empty());
    }

    #[tokio::test]
    async fn test_callback_unknown_platform_redirects() {
        let app = test_app("http://127.0.0.1:9");
        let response = get(&app.router, "/api/oauth/myspace/callback?code=a&state=b").await;
        assert!(response.status().is_redirection());
        assert_eq!(
            location(&response),
            format!("{}/accounts?error=unsupported_platform", FRONTEND)
        );
    }

    #[tokio::test]
    async fn test_callback_malformed_query_redirects() {
        let mut server = Server::new_async().await;
        let token = server
            .mock("POST", "/v2/oauth/token/")
            .expect(0)
            .create_async()
            .await;
        let app = test_app(&server.url());

        let response = get(&app.router, "/api/oauth/tiktok/callback?code=a&code=b&state=s").await;
        assert!(response.status().is_redirection());
        assert_eq!(
            location(&response),
            format!("{}/accounts?error=invalid_request&platform=tiktok", FRONTEND)
        );
        token.assert_async().await;
        assert!(app.sink.is_empty());
    }
}
