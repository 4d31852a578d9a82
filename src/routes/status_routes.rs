// src/routes/status_routes.rs

use axum::{Json, Router, routing::get};

use crate::models::{ApiOk, AppState, StatusSummary};
use crate::scheduling::status::AppointmentStatus;

pub fn router() -> Router<AppState> {
    Router::new().route("/statuses", get(list_statuses))
}

/// The whole workflow table, so clients do not hard-code colors or buttons.
pub async fn list_statuses() -> Json<ApiOk<Vec<StatusSummary>>> {
    Json(ApiOk {
        data: AppointmentStatus::KNOWN
            .into_iter()
            .map(StatusSummary::of)
            .collect(),
    })
}
