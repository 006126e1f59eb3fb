//! HTTP/SSE transport for the intent protocol

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::dispatcher::IntentDispatcher;
use crate::notify::{Notifier, TracingNotifier};
use crate::protocol::{IntentResponse, RequestHandler, PROTOCOL_ERROR};
use wallet_session::{ProviderInfo, SessionSnapshot, WalletSession};

/// Shared state for HTTP handlers
struct AppState {
    handler: RequestHandler,
}

/// HTTP transport for the intent protocol
pub struct HttpTransport {
    session: Arc<WalletSession>,
    port: u16,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(session: Arc<WalletSession>, port: u16) -> Self {
        Self { session, port }
    }

    /// Run the HTTP server
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let app = router(self.session.clone(), Arc::new(TracingNotifier));

        let addr = format!("0.0.0.0:{}", self.port);
        info!("Starting wallet session HTTP server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Build the HTTP routes around a session
pub fn router(session: Arc<WalletSession>, notifier: Arc<dyn Notifier>) -> Router {
    let dispatcher = Arc::new(IntentDispatcher::new(session, notifier));
    let state = Arc::new(AppState {
        handler: RequestHandler::new(dispatcher),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/providers", get(list_providers))
        .route("/session", get(current_session))
        .route("/intent", post(handle_intent))
        .route("/events", get(session_events))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// HTTP status for an intent response
pub fn status_for(response: &IntentResponse) -> StatusCode {
    match response.error_kind() {
        None => StatusCode::OK,
        Some("validation_error") | Some("insufficient_balance") => StatusCode::UNPROCESSABLE_ENTITY,
        Some("invalid_state") | Some("busy") => StatusCode::CONFLICT,
        Some("provider_error") | Some("transaction_error") | Some("signing_error") => {
            StatusCode::BAD_GATEWAY
        }
        Some(kind) if kind == PROTOCOL_ERROR => StatusCode::BAD_REQUEST,
        Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Health check endpoint
async fn health() -> &'static str {
    "OK"
}

async fn list_providers(State(state): State<Arc<AppState>>) -> Json<Vec<ProviderInfo>> {
    Json(state.handler.dispatcher().session().providers().list())
}

async fn current_session(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.handler.dispatcher().session().snapshot().await)
}

/// Handle an intent posted as JSON
async fn handle_intent(
    State(state): State<Arc<AppState>>,
    body: String,
) -> (StatusCode, Json<IntentResponse>) {
    debug!("HTTP intent: {}", body);

    let response = match RequestHandler::parse(&body) {
        Ok(request) => state.handler.handle(request).await,
        Err(response) => response,
    };
    (status_for(&response), Json(response))
}

/// Stream session events via Server-Sent Events
async fn session_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("SSE connection established");

    let mut events = state.handler.dispatcher().session().subscribe();
    let stream = async_stream::stream! {
        loop {
            match events.recv().await {
                Ok(event) => match Event::default().event(event.name()).json_data(&event) {
                    Ok(sse) => yield Ok(sse),
                    Err(e) => warn!("Failed to encode session event: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE subscriber lagged, {} events skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
