// src/routes/catalog_routes.rs

use axum::{Json, Router, extract::State, routing::get};

use crate::{
    error::ApiError,
    models::{ApiOk, AppState},
    scheduling::appointment::{Doctor, Specialty},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/doctors", get(list_doctors))
        .route("/specialties", get(list_specialties))
}

pub async fn list_doctors(
    State(state): State<AppState>,
) -> Result<Json<ApiOk<Vec<Doctor>>>, ApiError> {
    Ok(Json(ApiOk {
        data: state.source.fetch_doctors().await?,
    }))
}

pub async fn list_specialties(
    State(state): State<AppState>,
) -> Result<Json<ApiOk<Vec<Specialty>>>, ApiError> {
    Ok(Json(ApiOk {
        data: state.source.fetch_specialties().await?,
    }))
}
