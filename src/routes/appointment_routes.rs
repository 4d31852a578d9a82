// src/routes/appointment_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::{
    error::ApiError,
    models::{ApiOk, AppState, BoardItem},
    scheduling::{
        appointment::parse_timestamp,
        filtering::{self, Facets, FilterState, Page},
        status::{self, AppointmentStatus},
    },
    source::FetchCriteria,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list_appointments))
        .route("/appointments/facets", get(get_facets))
        .route("/appointments/{appointment_id}", get(get_appointment))
        .route("/appointments/{appointment_id}/status", post(change_status))
        .route("/appointments/{appointment_id}/cancel", post(cancel_appointment))
}

/* ============================================================
   Query params
   ============================================================ */

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub specialty: Option<String>,
    pub doctor: Option<String>,
    pub status: Option<String>,
    pub show_cancelled: Option<bool>,
    // YYYY-MM-DD or ISO-8601 timestamp, clinic-local when no offset is given
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FacetQuery {
    pub specialty: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Query-string filters into a [`FilterState`]. Specialty is applied first since it resets doctor.
pub fn filter_from_query(
    specialty: Option<&str>,
    doctor: Option<&str>,
    status: Option<&str>,
    show_cancelled: Option<bool>,
) -> FilterState {
    FilterState::default()
        .with_specialty(specialty.unwrap_or_default())
        .with_doctor(doctor.unwrap_or_default())
        .with_status(status.unwrap_or_default())
        .with_show_cancelled(show_cancelled.unwrap_or(false))
}

pub fn parse_bound(
    name: &str,
    raw: Option<&str>,
    clinic_offset: FixedOffset,
) -> Result<Option<DateTime<FixedOffset>>, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    parse_timestamp(raw, clinic_offset)
        .map(Some)
        .ok_or_else(|| ApiError::validation(format!("{name} must be YYYY-MM-DD or an ISO-8601 timestamp")))
}

fn range_criteria(
    from: Option<&str>,
    to: Option<&str>,
    clinic_offset: FixedOffset,
) -> Result<FetchCriteria, ApiError> {
    let from = parse_bound("from", from, clinic_offset)?;
    let to = parse_bound("to", to, clinic_offset)?;
    if let (Some(f), Some(t)) = (from, to) {
        if t <= f {
            return Err(ApiError::validation("to must be after from"));
        }
    }
    Ok(FetchCriteria {
        from,
        to,
        ..FetchCriteria::default()
    })
}

/* ============================================================
   GET /appointments
   ============================================================ */

pub async fn list_appointments(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiOk<Page<BoardItem>>>, ApiError> {
    let filter = filter_from_query(
        q.specialty.as_deref(),
        q.doctor.as_deref(),
        q.status.as_deref(),
        q.show_cancelled,
    );

    let criteria = FetchCriteria {
        doctor_id: filter.doctor.clone(),
        specialty_id: filter.specialty.clone(),
        ..range_criteria(q.from.as_deref(), q.to.as_deref(), state.clinic_offset)?
    };

    let fetched = state.source.fetch_appointments(&criteria).await?;
    let filtered = filtering::apply_filters(&fetched, &filter);
    tracing::debug!(fetched = fetched.len(), shown = filtered.len(), "appointment board list");

    let page = filtering::paginate(filtered, q.limit, q.offset);
    Ok(Json(ApiOk {
        data: Page {
            items: page.items.into_iter().map(BoardItem::from_appointment).collect(),
            total: page.total,
            limit: page.limit,
            offset: page.offset,
        },
    }))
}

/* ============================================================
   GET /appointments/facets
   ============================================================ */

pub async fn get_facets(
    State(state): State<AppState>,
    Query(q): Query<FacetQuery>,
) -> Result<Json<ApiOk<Facets>>, ApiError> {
    let criteria = range_criteria(q.from.as_deref(), q.to.as_deref(), state.clinic_offset)?;
    let fetched = state.source.fetch_appointments(&criteria).await?;

    Ok(Json(ApiOk {
        data: filtering::derive_facets(&fetched, q.specialty.as_deref()),
    }))
}

/* ============================================================
   GET /appointments/{id}
   ============================================================ */

pub async fn get_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<String>,
) -> Result<Json<ApiOk<BoardItem>>, ApiError> {
    let appointment = state
        .source
        .fetch_appointment(&appointment_id)
        .await?
        .ok_or_else(|| ApiError::appointment_not_found(&appointment_id))?;

    Ok(Json(ApiOk {
        data: BoardItem::from_appointment(appointment),
    }))
}

/* ============================================================
   Status transitions
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
}

pub async fn change_status(
    State(state): State<AppState>,
    Path(appointment_id): Path<String>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<ApiOk<BoardItem>>, ApiError> {
    if req.status.trim().is_empty() {
        return Err(ApiError::validation("status is required"));
    }
    let target = AppointmentStatus::from_code(&req.status);
    if let AppointmentStatus::Unrecognized(raw) = &target {
        return Err(ApiError::validation(format!("unknown status: {raw}")));
    }

    let current = state
        .source
        .fetch_appointment(&appointment_id)
        .await?
        .ok_or_else(|| ApiError::appointment_not_found(&appointment_id))?;

    let next = status::transition(&current, target)?;
    store_status(&state, &appointment_id, &current.status, &next.status).await
}

pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<String>,
) -> Result<Json<ApiOk<BoardItem>>, ApiError> {
    let current = state
        .source
        .fetch_appointment(&appointment_id)
        .await?
        .ok_or_else(|| ApiError::appointment_not_found(&appointment_id))?;

    let Some(cancelled) = status::cancel(&current) else {
        return Err(ApiError::Conflict(
            "TRANSITION_NOT_ALLOWED",
            format!("appointment {appointment_id} is already {}", current.status),
        ));
    };
    store_status(&state, &appointment_id, &current.status, &cancelled.status).await
}

async fn store_status(
    state: &AppState,
    appointment_id: &str,
    from: &AppointmentStatus,
    to: &AppointmentStatus,
) -> Result<Json<ApiOk<BoardItem>>, ApiError> {
    // the row can disappear between the read and the write
    let stored = state
        .source
        .update_status(appointment_id, to)
        .await?
        .ok_or_else(|| ApiError::appointment_not_found(appointment_id))?;

    tracing::info!(
        appointment_id,
        from = %from,
        to = %stored.status,
        "appointment status changed"
    );

    Ok(Json(ApiOk {
        data: BoardItem::from_appointment(stored),
    }))
}
