//! Chart configuration and health endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Days, Local, NaiveDate};
use plcwatch_types::{ChartConfiguration, DEFAULT_GROUP_NAME};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::AppState;
use crate::config::ConfigUpdate;
use crate::error::Error;

/// Days covered by the date pickers' default range.
const DEFAULT_SEARCH_DAYS: u64 = 3;

#[derive(Debug, Default, Deserialize)]
pub struct ConfigQuery {
    /// Group to mark as selected; defaults to "All Variables".
    pub selected: Option<String>,
}

/// Default `from`/`to` dates (`YYYY-MM-DD`) for the date pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRange {
    pub from: String,
    pub to: String,
}

impl SearchRange {
    pub fn ending(today: NaiveDate) -> Self {
        let from = today
            .checked_sub_days(Days::new(DEFAULT_SEARCH_DAYS))
            .unwrap_or(today);
        Self {
            from: from.format("%Y-%m-%d").to_string(),
            to: today.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    #[serde(flatten)]
    pub config: ChartConfiguration,
    pub default_search_range: SearchRange,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    fn success() -> Self {
        Self {
            status: "success",
            message: None,
        }
    }
}

/// An error rendered as `{status: "error", message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = if e.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = StatusResponse {
            status: "error",
            message: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

/// GET /api/chart-config
pub async fn get_chart_config(
    State(state): State<AppState>,
    Query(query): Query<ConfigQuery>,
) -> Json<ConfigResponse> {
    let selected = query.selected.as_deref().unwrap_or(DEFAULT_GROUP_NAME);
    let config = state.service.config().snapshot().await.with_selection(selected);

    Json(ConfigResponse {
        config,
        default_search_range: SearchRange::ending(Local::now().date_naive()),
    })
}

/// POST /api/chart-config
pub async fn update_chart_config(
    State(state): State<AppState>,
    body: Result<Json<ConfigUpdate>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(update) = body.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected chart configuration body");
        ApiError::from(rejection)
    })?;

    match state.service.config().update(update).await {
        Ok(_) => Ok(Json(StatusResponse::success())),
        Err(e) => {
            if e.is_client_error() {
                warn!(error = %e, "Rejected chart configuration update");
            } else {
                error!(error = %e, "Chart configuration update failed");
            }
            Err(e.into())
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: String,
    pub store_reachable: bool,
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.service.store();
    let reachable = match store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(store = store.description(), error = %e, "Store health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: "ok",
        store: store.description().to_string(),
        store_reachable: reachable,
    })
}
