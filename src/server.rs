// 🌐 Web front-end - the same form over HTTP
// Checks run on the blocking pool, one at a time, behind a mutex

use crate::checker::{AllotmentChecker, CheckError, CheckRequest, CollectingObserver};
use crate::notice::Notice;
use crate::presenter::IdentifierReport;
use crate::selection::{IpoChoice, Selection};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub const PASSCODE_HEADER: &str = "x-passcode";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    checker: Arc<Mutex<AllotmentChecker>>,
}

impl AppState {
    pub fn new(checker: AllotmentChecker) -> Self {
        Self {
            checker: Arc::new(Mutex::new(checker)),
        }
    }

    fn checker(&self) -> MutexGuard<'_, AllotmentChecker> {
        self.checker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn failed(data: T, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            error: Some(error.into()),
        }
    }
}

/// One entry of the IPO multi-select
#[derive(Debug, Serialize)]
pub struct IpoOption {
    pub label: String,
    pub name: String,
    pub registrar: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckBody {
    pub passcode: String,
    #[serde(default)]
    pub include_all: bool,
    #[serde(default)]
    pub selected: Vec<String>,
    #[serde(default)]
    pub pans: String,
}

#[derive(Debug, Default, Serialize)]
pub struct CheckResponse {
    pub notices: Vec<Notice>,
    pub reports: Vec<IdentifierReport>,
}

fn status_for(err: &CheckError) -> StatusCode {
    match err {
        CheckError::AccessDenied => StatusCode::UNAUTHORIZED,
        CheckError::CatalogUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        CheckError::NoIdentifiers | CheckError::InvalidIdentifiers(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn internal_error<T: Serialize>(data: T, err: tokio::task::JoinError) -> Response {
    tracing::error!(error = %err, "check task failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::failed(data, "internal error")),
    )
        .into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/ipos - Catalog entries for the multi-select
async fn list_ipos(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let passcode = headers
        .get(PASSCODE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let joined = tokio::task::spawn_blocking(move || {
        let mut checker = state.checker();
        let mut observer = CollectingObserver::default();
        let catalog = checker
            .unlock(&passcode)
            .and_then(|access| checker.load_catalog(access, &mut observer));
        (catalog, observer.notices)
    })
    .await;

    match joined {
        Ok((Ok(catalog), _)) => {
            let options: Vec<IpoOption> = catalog
                .iter()
                .map(|ipo| {
                    let choice = IpoChoice::of(ipo);
                    IpoOption {
                        label: choice.label(),
                        name: choice.name,
                        registrar: choice.registrar,
                    }
                })
                .collect();
            (StatusCode::OK, Json(ApiResponse::ok(options))).into_response()
        }
        Ok((Err(err), notices)) => (
            status_for(&err),
            Json(ApiResponse::failed(notices, err.to_string())),
        )
            .into_response(),
        Err(e) => internal_error(Vec::<Notice>::new(), e),
    }
}

/// POST /api/check - Run a full check and return every notice and report
async fn run_check(State(state): State<AppState>, Json(body): Json<CheckBody>) -> Response {
    let joined = tokio::task::spawn_blocking(move || {
        let mut observer = CollectingObserver::default();

        let selection = if body.include_all {
            Selection::All
        } else {
            let mut choices = Vec::new();
            for label in &body.selected {
                match IpoChoice::from_label(label) {
                    Some(choice) => choices.push(choice),
                    None => observer.notices.push(Notice::warning(format!("Ignoring unrecognized IPO selection: {}", label))),
                }
            }
            Selection::Chosen(choices)
        };

        let request = CheckRequest {
            passcode: body.passcode,
            selection,
            identifiers: body.pans,
        };
        let outcome = state.checker().run(&request, &mut observer);
        (outcome, observer)
    })
    .await;

    match joined {
        Ok((outcome, observer)) => {
            let data = CheckResponse {
                notices: observer.notices,
                reports: observer.reports,
            };
            match outcome {
                Ok(_) => (StatusCode::OK, Json(ApiResponse::ok(data))).into_response(),
                Err(err) => (status_for(&err), Json(ApiResponse::failed(data, err.to_string()))).into_response(),
            }
        }
        Err(e) => internal_error(CheckResponse::default(), e),
    }
}

/// GET / - Serve the form
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ipos", get(list_ipos))
        .route("/check", post(run_check))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(state: AppState, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router(state)).await
}
