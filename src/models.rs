use std::sync::Arc;

use chrono::FixedOffset;
use serde::Serialize;

use crate::scheduling::appointment::Appointment;
use crate::scheduling::status::{AppointmentStatus, StatusDisplay};
use crate::scheduling::time_grid::{self, GridPosition};
use crate::source::AppointmentSource;

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn AppointmentSource>,
    pub clinic_offset: FixedOffset,
}

/* -------------------------
   API DTOs
--------------------------*/

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

/// One appointment as the board draws it: the snapshot plus everything derived from it.
#[derive(Debug, Serialize)]
pub struct BoardItem {
    pub appointment: Appointment,
    pub display: StatusDisplay,
    pub next_states: Vec<AppointmentStatus>,
    pub can_cancel: bool,
    /// `next_states` followed by `cancelled` when offered; what the board renders as buttons.
    pub actions: Vec<AppointmentStatus>,
    pub position: Option<GridPosition>,
    /// false when the start lies outside 08:00–20:00 (or is unknown)
    pub within_grid: bool,
    pub slot_index: Option<usize>,
}

impl BoardItem {
    pub fn from_appointment(appointment: Appointment) -> Self {
        let position = time_grid::position(&appointment);
        Self {
            display: appointment.status.display(),
            next_states: appointment.status.next_states(),
            can_cancel: appointment.status.can_cancel(),
            actions: appointment.status.available_actions(),
            within_grid: position.is_some_and(|p| p.is_within_grid()),
            slot_index: position.and_then(|p| p.slot_index()),
            position,
            appointment,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub status: AppointmentStatus,
    pub label: &'static str,
    pub color_class: &'static str,
    pub next_states: Vec<AppointmentStatus>,
    pub can_cancel: bool,
    pub terminal: bool,
}

impl StatusSummary {
    pub fn of(status: AppointmentStatus) -> Self {
        Self {
            label: status.label(),
            color_class: status.color_class(),
            next_states: status.next_states(),
            can_cancel: status.can_cancel(),
            terminal: status.is_terminal(),
            status,
        }
    }
}
