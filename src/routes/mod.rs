use crate::models::{ApiOk, AppState};
use axum::{Json, Router, routing::get};
use serde::Serialize;

pub mod appointment_routes;
pub mod catalog_routes;
pub mod schedule_routes;
pub mod status_routes;

#[derive(Debug, Serialize)]
pub struct OkData {
    pub ok: bool,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(appointment_routes::router())
        .merge(schedule_routes::router())
        .merge(status_routes::router())
        .merge(catalog_routes::router());

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<ApiOk<OkData>> {
    Json(ApiOk {
        data: OkData { ok: true },
    })
}
