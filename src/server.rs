use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, RawQuery, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use eyre::Result;
use log::{error, info};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

use crate::error::ApiError;
use crate::extract_video_id;
use crate::output::{DiagnosticBody, HealthBody, TranscriptBody};
use crate::resolver::Resolver;

/// Shared per-process state; the resolver holds no mutable state
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
}

impl AppState {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Wildcards so URLs with slashes can be passed as-is
        .route("/transcript/*input", get(get_transcript))
        .route("/test/*input", get(test_transcript))
        .fallback(not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::permissive())
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Transcript service listening on {}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Transcript service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Re-attach a query string the router split off, so `watch?v=` URLs survive
fn raw_input(input: String, query: Option<String>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{input}?{q}"),
        _ => input,
    }
}

async fn get_transcript(
    State(state): State<AppState>,
    Path(input): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<TranscriptBody>, ApiError> {
    let input = raw_input(input, query);
    info!("Received transcript request for: {input}");

    let Some(video_id) = extract_video_id(&input) else {
        error!("Invalid video ID format: {input}");
        return Err(ApiError::InvalidVideoId);
    };

    match state.resolver.resolve(&video_id).await {
        Ok(transcript) => {
            info!(
                "Successfully processed {} segments via {} for {video_id}",
                transcript.segments.len(),
                transcript.method
            );
            Ok(Json(transcript.into()))
        }
        Err(e) => {
            error!("Transcript resolution failed for {video_id}: {e}");
            Err(ApiError::Resolution {
                error: e.into(),
                video_id,
            })
        }
    }
}

async fn test_transcript(
    State(state): State<AppState>,
    Path(input): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<DiagnosticBody>, ApiError> {
    let input = raw_input(input, query);
    info!("Running strategy diagnostics for: {input}");

    let video_id = extract_video_id(&input).ok_or(ApiError::InvalidVideoId)?;
    let test_results = state.resolver.diagnose(&video_id).await;

    Ok(Json(DiagnosticBody {
        video_id: video_id.to_string(),
        test_results,
    }))
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "healthy",
        service: "transcript-api",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Unhandled error while serving request: {detail}");
    ApiError::Internal.into_response()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::resolver::Strategy;
    use crate::resolver::tests::{FakeStrategy, hello};
    use crate::{ResolutionMethod, Segment, VideoId};

    struct PanickingStrategy;

    #[async_trait]
    impl Strategy for PanickingStrategy {
        fn method(&self) -> ResolutionMethod {
            ResolutionMethod::Auto
        }

        async fn attempt(&self, _video_id: &VideoId) -> Result<Vec<Segment>> {
            panic!("strategy blew up");
        }
    }

    fn app(strategies: Vec<Box<dyn Strategy>>) -> Router {
        create_router(AppState::new(Resolver::new(strategies)))
    }

    fn language_fallback_app() -> Router {
        app(vec![
            Box::new(FakeStrategy::err(
                ResolutionMethod::PreferredLanguage,
                "No transcripts were found for any of the requested language codes",
            )),
            Box::new(FakeStrategy::ok(ResolutionMethod::FallbackLanguage, vec![hello()])),
        ])
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_fallback_language_success() {
        let (status, json) = get_json(language_fallback_app(), "/transcript/jh4FH-EDGJ4").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "transcript": [{"text": "hello", "start": 0.0, "duration": 2.0}],
                "method": "fallback_language",
                "video_id": "jh4FH-EDGJ4"
            })
        );
    }

    #[tokio::test]
    async fn test_encoded_short_url_input() {
        let (status, json) = get_json(
            language_fallback_app(),
            "/transcript/https%3A%2F%2Fyoutu.be%2Fjh4FH-EDGJ4",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["video_id"], "jh4FH-EDGJ4");
    }

    #[tokio::test]
    async fn test_watch_url_query_is_reattached() {
        let (status, json) = get_json(
            language_fallback_app(),
            "/transcript/https://www.youtube.com/watch?v=jh4FH-EDGJ4",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["video_id"], "jh4FH-EDGJ4");
    }

    #[tokio::test]
    async fn test_invalid_video_id() {
        let (status, json) = get_json(language_fallback_app(), "/transcript/not-a-video-id").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "Invalid video ID format"})
        );
    }

    #[tokio::test]
    async fn test_all_strategies_failing() {
        let app = app(vec![
            Box::new(FakeStrategy::err(ResolutionMethod::PreferredLanguage, "connection refused")),
            Box::new(FakeStrategy::err(ResolutionMethod::Scraped, "no caption tracks found")),
        ]);
        let (status, json) = get_json(app, "/transcript/jh4FH-EDGJ4").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["video_id"], "jh4FH-EDGJ4");
        let error = json["error"].as_str().unwrap();
        assert!(error.starts_with("All methods failed"));
    }

    #[tokio::test]
    async fn test_known_failure_gets_friendly_message() {
        let app = app(vec![
            Box::new(FakeStrategy::err(ResolutionMethod::PreferredLanguage, "Video unavailable: private")),
            Box::new(FakeStrategy::err(ResolutionMethod::Auto, "Video unavailable: private")),
        ]);
        let (status, json) = get_json(app, "/transcript/jh4FH-EDGJ4").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Video is unavailable or private");
    }

    #[tokio::test]
    async fn test_diagnostics_report_every_strategy() {
        let (status, json) = get_json(language_fallback_app(), "/test/jh4FH-EDGJ4").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["video_id"], "jh4FH-EDGJ4");
        let results = json["test_results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["method"], "preferred_language");
        assert_eq!(results[0]["success"], false);
        assert!(results[0]["error"].as_str().unwrap().contains("No transcripts were found"));
        assert_eq!(results[1]["success"], true);
        assert_eq!(results[1]["segments"], 1);
        assert_eq!(results[1]["sample"]["text"], "hello");
    }

    #[tokio::test]
    async fn test_diagnostics_invalid_id() {
        let (status, json) = get_json(language_fallback_app(), "/test/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid video ID format");
    }

    #[tokio::test]
    async fn test_health() {
        let (status, json) = get_json(app(vec![]), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "transcript-api");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, json) = get_json(app(vec![]), "/nope").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
        assert_eq!(
            json["error"],
            "Endpoint not found. Use /transcript/<video_id> or /health"
        );
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let (status, json) = get_json(app(vec![Box::new(PanickingStrategy)]), "/transcript/jh4FH-EDGJ4").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "Internal server error"})
        );
    }

    #[tokio::test]
    async fn test_internal_error_carries_cors_headers() {
        let request = Request::builder()
            .uri("/transcript/jh4FH-EDGJ4")
            .header("origin", "https://example.com")
            .body(Body::empty())
            .unwrap();
        let response = app(vec![Box::new(PanickingStrategy)]).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[test]
    fn test_raw_input() {
        assert_eq!(raw_input("abc".to_string(), None), "abc");
        assert_eq!(raw_input("abc".to_string(), Some(String::new())), "abc");
        assert_eq!(raw_input("watch".to_string(), Some("v=x".to_string())), "watch?v=x");
    }
}
