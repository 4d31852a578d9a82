// src/routes/schedule_routes.rs

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    models::{ApiOk, AppState, BoardItem},
    routes::appointment_routes::filter_from_query,
    scheduling::{
        filtering::{self, Facets},
        time_grid::{self, TimeSlot},
    },
    source::FetchCriteria,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/schedule/slots", get(get_slots))
        .route("/schedule/day", get(get_day))
}

pub async fn get_slots() -> Json<ApiOk<&'static [TimeSlot]>> {
    Json(ApiOk {
        data: time_grid::day_slots(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct DayQuery {
    // YYYY-MM-DD in clinic time; today when omitted
    pub date: Option<String>,
    pub specialty: Option<String>,
    pub doctor: Option<String>,
    pub status: Option<String>,
    pub show_cancelled: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub slots: &'static [TimeSlot],
    pub items: Vec<BoardItem>,
    /// Items whose start falls outside the grid. They are still listed; the client decides.
    pub off_grid: usize,
    pub facets: Facets,
}

pub async fn get_day(
    State(state): State<AppState>,
    Query(q): Query<DayQuery>,
) -> Result<Json<ApiOk<DayView>>, ApiError> {
    let date = match q.date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ApiError::validation("date must be YYYY-MM-DD"))?,
        None => Utc::now().with_timezone(&state.clinic_offset).date_naive(),
    };

    let day_start = state
        .clinic_offset
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .single()
        .ok_or_else(|| ApiError::validation("date is out of range"))?;

    let criteria = FetchCriteria {
        from: Some(day_start),
        to: Some(day_start + TimeDelta::days(1)),
        ..FetchCriteria::default()
    };
    let fetched = state.source.fetch_appointments(&criteria).await?;

    let filter = filter_from_query(
        q.specialty.as_deref(),
        q.doctor.as_deref(),
        q.status.as_deref(),
        q.show_cancelled,
    );
    let facets = filtering::derive_facets(&fetched, filter.specialty.as_deref());

    let items: Vec<BoardItem> = filtering::apply_filters(&fetched, &filter)
        .into_iter()
        .map(BoardItem::from_appointment)
        .collect();
    let off_grid = items.iter().filter(|i| !i.within_grid).count();

    tracing::debug!(%date, items = items.len(), off_grid, "day schedule");

    Ok(Json(ApiOk {
        data: DayView {
            date,
            slots: time_grid::day_slots(),
            items,
            off_grid,
            facets,
        },
    }))
}
