use axum::{
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use http::{header, HeaderValue};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::{request_tracing, server_config::HttpConfig, ServerState};

use super::handlers::{gmail, health, preferences, summaries, summarize};

pub struct AppRouter;

impl AppRouter {
    pub fn create(state: ServerState) -> Router {
        let cors_layer = cors_layer(&state.config.server);

        let router = Router::new()
            .route("/", get(health::health))
            .nest(
                "/api",
                Router::new()
                    .route("/summarize", post(summarize::summarize))
                    .route("/gmail/authorize", post(gmail::authorize))
                    .route("/gmail/fetch", post(gmail::fetch))
                    .route("/gmail/reply", post(gmail::reply))
                    .route("/gmail/send", post(gmail::send))
                    .route(
                        "/summaries/:user_id",
                        get(summaries::list).delete(summaries::clear),
                    )
                    .route("/analytics/:user_id", get(summaries::analytics))
                    .route(
                        "/user/preferences",
                        get(preferences::get).post(preferences::update),
                    ),
            )
            .with_state(state)
            .fallback(handler_404);

        request_tracing::with_request_tracing(router).layer(cors_layer)
    }
}

/// `*` allows any origin, in which case credentials cannot be allowed.
fn cors_layer(config: &HttpConfig) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
        Method::PATCH,
    ];
    let headers = [header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT];

    if config.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let origins = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(true)
}

pub async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Route does not exist")
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::testing::common::{test_context, ScriptedModel};

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let ctx = test_context(ScriptedModel::always("{}"), None);
        let resp = AppRouter::create(ctx.state)
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Route does not exist");
    }

    #[tokio::test]
    async fn test_cors_preflight_for_configured_origin() {
        let ctx = test_context(ScriptedModel::always("{}"), None);
        let resp = AppRouter::create(ctx.state)
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/summarize")
                    .header("origin", "http://localhost:5173")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            resp.headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("http://localhost:5173")
        );
        assert_eq!(
            resp.headers()
                .get("access-control-allow-credentials")
                .and_then(|v| v.to_str().ok()),
            Some("true")
        );
    }

    #[test]
    fn test_wildcard_origin_builds() {
        let config = HttpConfig {
            port: 8000,
            cors_origins: vec!["*".to_string()],
        };
        // tower-http panics on wildcard origin combined with credentials
        let _router: Router = Router::new().layer(cors_layer(&config));
    }
}
