//! HTTP gateway over the movement pipeline

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use geostride_core::providers::{
    ChatNarrator, GooglePlacesGeocoder, InMemoryPositionStore, StaticGeocoder, TemplateNarrator,
};
use geostride_core::{
    ActorId, ErrorCode, Geocoder, MovementOutcome, NarrativeGenerator, Pipeline,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::{GatewayConfig, GeocoderProvider, NarratorProvider};
use crate::{GatewayError, Result};

const DEFAULT_AUDIT_LIMIT: usize = 50;
const MAX_AUDIT_LIMIT: usize = 500;

/// Gateway state shared across handlers
pub struct GatewayState {
    pub config: GatewayConfig,
    pub pipeline: Pipeline,
    pub shutdown_tx: broadcast::Sender<()>,
}

impl GatewayState {
    /// Build the pipeline with the collaborators named in `config`
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let pipeline = Pipeline::builder()
            .config(config.pipeline.clone())
            .geocoder(build_geocoder(&config))
            .narrator(build_narrator(&config))
            .store(build_store(&config))
            .build()?;

        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            config,
            pipeline,
            shutdown_tx,
        })
    }
}

fn build_geocoder(config: &GatewayConfig) -> Arc<dyn Geocoder> {
    let settings = &config.geocoder;
    match (settings.provider, settings.api_key.as_deref()) {
        (GeocoderProvider::GooglePlaces, Some(key)) => {
            let mut geocoder = GooglePlacesGeocoder::new(key)
                .with_region(settings.region.clone())
                .with_language(settings.language.clone());
            if let Some(base_url) = &settings.base_url {
                geocoder = geocoder.with_base_url(base_url.clone());
            }
            Arc::new(geocoder)
        }
        (GeocoderProvider::GooglePlaces, None) => {
            tracing::warn!(
                "Google Places selected but {} is not set, using the static gazetteer",
                crate::config::GOOGLE_PLACES_KEY_VAR
            );
            Arc::new(StaticGeocoder::taiwan())
        }
        (GeocoderProvider::Static, _) => Arc::new(StaticGeocoder::taiwan()),
    }
}

fn build_narrator(config: &GatewayConfig) -> Arc<dyn NarrativeGenerator> {
    let settings = &config.narrator;
    match settings.provider {
        NarratorProvider::Template => Arc::new(TemplateNarrator),
        NarratorProvider::Chat => Arc::new(
            ChatNarrator::new(
                settings.api_key.clone(),
                settings.base_url.clone(),
                settings.model.clone(),
            )
            .with_temperature(settings.temperature)
            .with_max_tokens(settings.max_tokens),
        ),
    }
}

fn build_store(config: &GatewayConfig) -> Arc<InMemoryPositionStore> {
    let store = InMemoryPositionStore::new();
    Arc::new(match config.spawn_point {
        Some(spawn_point) => store.with_spawn_point(spawn_point),
        None => store,
    })
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub actor_id: String,
    pub text: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub actor_id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

pub struct Gateway {
    state: Arc<GatewayState>,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let state = Arc::new(GatewayState::new(config)?);
        Ok(Self { state })
    }

    pub fn state(&self) -> Arc<GatewayState> {
        self.state.clone()
    }

    /// Build the Axum router
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/move", post(Self::handle_move))
            .route("/debug/parse", post(Self::handle_debug_parse))
            .route("/health", get(Self::handle_health))
            .route("/status", get(Self::handle_status))
            .route("/actors/:id/stats", get(Self::handle_actor_stats))
            .route("/actors/:id/audit", get(Self::handle_actor_audit))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve until [`Gateway::shutdown`] is called
    pub async fn start(&self) -> Result<()> {
        let addr = self.state.config.socket_addr()?;
        let router = self.build_router();
        let maintenance = self.state.pipeline.spawn_maintenance();
        let mut shutdown_rx = self.state.shutdown_tx.subscribe();

        tracing::info!("Geostride gateway starting on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))?;

        maintenance.abort();
        tracing::info!("Gateway stopped");
        Ok(())
    }

    pub fn shutdown(&self) {
        let _ = self.state.shutdown_tx.send(());
        tracing::info!("Gateway shutdown initiated");
    }

    // HTTP handlers

    async fn handle_move(
        State(state): State<Arc<GatewayState>>,
        connect_info: Option<ConnectInfo<SocketAddr>>,
        headers: HeaderMap,
        Json(request): Json<MoveRequest>,
    ) -> Response {
        let actor = match actor_id(&request.actor_id) {
            Ok(actor) => actor,
            Err(response) => return response,
        };
        let origin_ip = client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));

        let outcome = state
            .pipeline
            .execute(&actor, &request.text, request.session_id, origin_ip)
            .await;

        let status = status_for(&outcome);
        let retry_after = outcome
            .retry_after_secs
            .and_then(|secs| HeaderValue::from_str(&secs.to_string()).ok());

        let mut response = (status, Json(outcome)).into_response();
        if let Some(value) = retry_after {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }

    async fn handle_debug_parse(
        State(state): State<Arc<GatewayState>>,
        Json(request): Json<ParseRequest>,
    ) -> Response {
        match actor_id(&request.actor_id) {
            Ok(actor) => Json(state.pipeline.preview(&actor, &request.text).await).into_response(),
            Err(response) => response,
        }
    }

    async fn handle_health() -> impl IntoResponse {
        Json(serde_json::json!({
            "status": "healthy",
            "version": crate::VERSION
        }))
    }

    async fn handle_status(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
        let pipeline = &state.pipeline;
        let limiter = pipeline.rate_limiter();

        Json(serde_json::json!({
            "version": crate::VERSION,
            "tracked_actors": limiter.tracked_actors(),
            "audit_entries": pipeline.audit_log().len(),
            "rate_limit": {
                "max_requests": limiter.max_requests(),
                "window_secs": limiter.window().as_secs(),
            },
            "geocoder": state.config.geocoder.provider,
            "narrator": state.config.narrator.provider,
        }))
    }

    async fn handle_actor_stats(
        State(state): State<Arc<GatewayState>>,
        Path(id): Path<String>,
    ) -> Response {
        match actor_id(&id) {
            Ok(actor) => Json(state.pipeline.movement_stats(&actor)).into_response(),
            Err(response) => response,
        }
    }

    async fn handle_actor_audit(
        State(state): State<Arc<GatewayState>>,
        Path(id): Path<String>,
        Query(query): Query<AuditQuery>,
    ) -> Response {
        let actor = match actor_id(&id) {
            Ok(actor) => actor,
            Err(response) => return response,
        };
        let limit = query
            .limit
            .unwrap_or(DEFAULT_AUDIT_LIMIT)
            .min(MAX_AUDIT_LIMIT);

        let mut records = state.pipeline.audit_log().for_actor(&actor);
        records.reverse();
        records.truncate(limit);
        Json(records).into_response()
    }
}

fn actor_id(raw: &str) -> std::result::Result<ActorId, Response> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "actor_id must not be empty" })),
        )
            .into_response());
    }
    Ok(ActorId::new(trimmed))
}

/// First `X-Forwarded-For` hop, else the socket peer
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

fn status_for(outcome: &MovementOutcome) -> StatusCode {
    match outcome.error_code {
        None => StatusCode::OK,
        Some(ErrorCode::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
        Some(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use geostride_core::PipelineConfig;
    use std::time::Duration;
    use tower::ServiceExt;

    fn router(config: GatewayConfig) -> Router {
        Gateway::new(config).unwrap().build_router()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, serde_json::Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, headers, json)
    }

    #[test]
    fn test_gateway_creation() {
        let gateway = Gateway::new(GatewayConfig::default()).unwrap();
        assert!(gateway.state().config.port > 0);
        assert!(gateway.state().pipeline.audit_log().is_empty());
    }

    #[test]
    fn test_client_ip() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "192.0.2.1:5000".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("192.0.2.1"));
        assert_eq!(client_ip(&headers, None), None);

        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.4, 10.0.0.1"));
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("198.51.100.4"));
    }

    #[tokio::test]
    async fn test_health() {
        let (status, _, body) = send(&router(GatewayConfig::default()), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_move_success() {
        let router = router(GatewayConfig::default());
        let (status, _, body) = send(
            &router,
            post_json(
                "/move",
                serde_json::json!({ "actor_id": "rabbit", "text": "move 200 meters north" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["estimated_seconds"], 80);
        assert_eq!(body["audit"]["origin_ip"], "203.0.113.9");
    }

    #[tokio::test]
    async fn test_move_rejection_is_unprocessable() {
        let router = router(GatewayConfig::default());
        let (status, _, body) = send(
            &router,
            post_json("/move", serde_json::json!({ "actor_id": "rabbit", "text": "hello" })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert_eq!(body["error_code"], "NOT_A_MOVEMENT_COMMAND");
    }

    #[tokio::test]
    async fn test_rate_limited_move_is_429() {
        let config = GatewayConfig::default().with_pipeline(
            PipelineConfig::default().with_rate_limit(1, Duration::from_secs(60)),
        );
        let router = router(config);
        let request = || {
            post_json("/move", serde_json::json!({ "actor_id": "rabbit", "text": "go north" }))
        };

        let (first, _, _) = send(&router, request()).await;
        assert_eq!(first, StatusCode::OK);

        let (status, headers, body) = send(&router, request()).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["rate_limited"], true);
        assert!(headers.contains_key(header::RETRY_AFTER));
    }

    #[tokio::test]
    async fn test_blank_actor_is_bad_request() {
        let router = router(GatewayConfig::default());
        let (status, _, _) = send(
            &router,
            post_json("/move", serde_json::json!({ "actor_id": "  ", "text": "go north" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_actor_without_spawn_point() {
        let router = router(GatewayConfig::default().with_spawn_point(None));
        let (status, _, body) = send(
            &router,
            post_json("/move", serde_json::json!({ "actor_id": "ghost", "text": "go north" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error_code"], "PLAYER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_debug_parse_leaves_no_trace() {
        let router = router(GatewayConfig::default());
        let (status, _, body) = send(
            &router,
            post_json(
                "/debug/parse",
                serde_json::json!({ "actor_id": "rabbit", "text": "go to Taichung" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["command"]["place_name"], "Taichung");
        assert!(body["error_code"].is_null());

        let (_, _, audit) = send(&router, get("/actors/rabbit/audit")).await;
        assert_eq!(audit.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_actor_stats_and_audit() {
        let router = router(GatewayConfig::default());
        for text in ["go north", "hello", "go east"] {
            send(
                &router,
                post_json("/move", serde_json::json!({ "actor_id": "rabbit", "text": text })),
            )
            .await;
        }

        let (status, _, stats) = send(&router, get("/actors/rabbit/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["audit"]["attempts"], 3);
        assert_eq!(stats["audit"]["successes"], 2);
        assert_eq!(stats["rate_limit"]["count"], 2);

        let (_, _, audit) = send(&router, get("/actors/rabbit/audit?limit=2")).await;
        let records = audit.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["original_text"], "go east");
        assert_eq!(records[1]["error_code"], "NOT_A_MOVEMENT_COMMAND");

        let (_, _, status) = send(&router, get("/status")).await;
        assert_eq!(status["audit_entries"], 3);
        assert_eq!(status["tracked_actors"], 1);
    }
}
