// src/scheduling/status.rs

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::scheduling::appointment::Appointment;

/*
FHIR appointment status codes used by the board.

pending -> booked -> arrived -> in-consultation -> fulfilled
                           \----------------------^
cancel is a side channel open from every non-terminal state.
*/

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Booked,
    Arrived,
    InConsultation,
    Fulfilled,
    Cancelled,
    EnteredInError,
    CheckedIn,
    Waitlist,
    /// Anything the backend sent that is not in the fixed set. Kept verbatim.
    Unrecognized(String),
}

impl AppointmentStatus {
    pub const KNOWN: [AppointmentStatus; 9] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Booked,
        AppointmentStatus::Arrived,
        AppointmentStatus::InConsultation,
        AppointmentStatus::Fulfilled,
        AppointmentStatus::Cancelled,
        AppointmentStatus::EnteredInError,
        AppointmentStatus::CheckedIn,
        AppointmentStatus::Waitlist,
    ];

    /// Parse a status code coming from a backend. Matching ignores surrounding
    /// whitespace and ASCII case; unknown codes are preserved as `Unrecognized`.
    pub fn from_code(code: &str) -> Self {
        Self::known(&code.trim().to_ascii_lowercase())
            .unwrap_or_else(|| AppointmentStatus::Unrecognized(code.to_string()))
    }

    /// Exact-match parse: only the canonical lowercase codes are known.
    pub fn from_exact_code(code: &str) -> Self {
        Self::known(code).unwrap_or_else(|| AppointmentStatus::Unrecognized(code.to_string()))
    }

    fn known(code: &str) -> Option<Self> {
        let status = match code {
            "pending" => AppointmentStatus::Pending,
            "booked" => AppointmentStatus::Booked,
            "arrived" => AppointmentStatus::Arrived,
            "in-consultation" => AppointmentStatus::InConsultation,
            "fulfilled" => AppointmentStatus::Fulfilled,
            "cancelled" => AppointmentStatus::Cancelled,
            "entered-in-error" => AppointmentStatus::EnteredInError,
            "checked-in" => AppointmentStatus::CheckedIn,
            "waitlist" => AppointmentStatus::Waitlist,
            _ => return None,
        };
        Some(status)
    }

    pub fn as_str(&self) -> &str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::Arrived => "arrived",
            AppointmentStatus::InConsultation => "in-consultation",
            AppointmentStatus::Fulfilled => "fulfilled",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::EnteredInError => "entered-in-error",
            AppointmentStatus::CheckedIn => "checked-in",
            AppointmentStatus::Waitlist => "waitlist",
            AppointmentStatus::Unrecognized(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::Fulfilled)
    }

    /// Forward transitions offered for this status, in display order.
    /// Cancellation is deliberately absent; see [`AppointmentStatus::can_cancel`].
    pub fn next_states(&self) -> Vec<AppointmentStatus> {
        match self {
            AppointmentStatus::Pending => vec![AppointmentStatus::Booked],
            AppointmentStatus::Booked => vec![AppointmentStatus::Arrived],
            AppointmentStatus::Arrived => vec![
                AppointmentStatus::InConsultation,
                AppointmentStatus::Fulfilled,
            ],
            AppointmentStatus::InConsultation => vec![AppointmentStatus::Fulfilled],
            _ => vec![],
        }
    }

    /// Cancel is offered from every state except the terminal ones,
    /// including statuses that have no forward transitions at all.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    /// Forward transitions followed by `cancelled` when it is reachable.
    pub fn available_actions(&self) -> Vec<AppointmentStatus> {
        let mut actions = self.next_states();
        if self.can_cancel() {
            actions.push(AppointmentStatus::Cancelled);
        }
        actions
    }

    pub fn allows(&self, target: &AppointmentStatus) -> bool {
        if *target == AppointmentStatus::Cancelled {
            return self.can_cancel();
        }
        self.next_states().contains(target)
    }

    /// Unrecognized statuses fall through to the pending treatment.
    pub fn color_class(&self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "bg-blue-100 text-blue-800",
            AppointmentStatus::Arrived => "bg-green-100 text-green-800",
            AppointmentStatus::InConsultation => "bg-purple-100 text-purple-800",
            AppointmentStatus::Fulfilled => "bg-gray-100 text-gray-800",
            AppointmentStatus::Cancelled => "bg-red-100 text-red-800",
            AppointmentStatus::EnteredInError => "bg-red-200 text-red-900",
            AppointmentStatus::CheckedIn => "bg-teal-100 text-teal-800",
            AppointmentStatus::Waitlist => "bg-orange-100 text-orange-800",
            _ => "bg-yellow-100 text-yellow-800",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "Booked",
            AppointmentStatus::Arrived => "Arrived",
            AppointmentStatus::InConsultation => "In Consultation",
            AppointmentStatus::Fulfilled => "Fulfilled",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::EnteredInError => "Entered in Error",
            AppointmentStatus::CheckedIn => "Checked In",
            AppointmentStatus::Waitlist => "Waitlist",
            _ => "Pending",
        }
    }

    pub fn display(&self) -> StatusDisplay {
        StatusDisplay {
            code: self.as_str().to_string(),
            label: self.label(),
            color_class: self.color_class(),
        }
    }
}

impl From<String> for AppointmentStatus {
    fn from(code: String) -> Self {
        AppointmentStatus::from_code(&code)
    }
}

impl From<&str> for AppointmentStatus {
    fn from(code: &str) -> Self {
        AppointmentStatus::from_code(code)
    }
}

impl From<AppointmentStatus> for String {
    fn from(status: AppointmentStatus) -> Self {
        match status {
            AppointmentStatus::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusDisplay {
    pub code: String,
    pub label: &'static str,
    pub color_class: &'static str,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot move appointment from {from} to {to}")]
    NotAllowed {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
}

/// Side-channel cancellation. Returns `None` when the appointment is already terminal.
pub fn cancel(appointment: &Appointment) -> Option<Appointment> {
    if !appointment.status.can_cancel() {
        debug!(id = %appointment.id, status = %appointment.status, "cancel not offered");
        return None;
    }
    Some(appointment.with_status(AppointmentStatus::Cancelled))
}

/// Validated move to `target`, covering both the forward table and cancellation.
pub fn transition(
    appointment: &Appointment,
    target: AppointmentStatus,
) -> Result<Appointment, TransitionError> {
    if !appointment.status.allows(&target) {
        warn!(
            id = %appointment.id,
            from = %appointment.status,
            to = %target,
            "rejected status transition"
        );
        return Err(TransitionError::NotAllowed {
            from: appointment.status.clone(),
            to: target,
        });
    }
    Ok(appointment.with_status(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appt(status: AppointmentStatus) -> Appointment {
        Appointment {
            status,
            ..Appointment::new("a-1")
        }
    }

    #[test]
    fn forward_table_matches_workflow() {
        use AppointmentStatus::*;
        assert_eq!(Pending.next_states(), vec![Booked]);
        assert_eq!(Booked.next_states(), vec![Arrived]);
        assert_eq!(Arrived.next_states(), vec![InConsultation, Fulfilled]);
        assert_eq!(InConsultation.next_states(), vec![Fulfilled]);
        assert!(Cancelled.next_states().is_empty());
        assert!(Fulfilled.next_states().is_empty());
        assert!(Waitlist.next_states().is_empty());
        assert!(AppointmentStatus::from_code("unknown").next_states().is_empty());
    }

    #[test]
    fn cancel_is_reachable_from_every_non_terminal_state() {
        for status in AppointmentStatus::KNOWN {
            let expected = !matches!(
                status,
                AppointmentStatus::Cancelled | AppointmentStatus::Fulfilled
            );
            assert_eq!(status.can_cancel(), expected, "{status}");
            assert!(!status.next_states().contains(&AppointmentStatus::Cancelled));
        }
        assert!(AppointmentStatus::from_code("on-hold").can_cancel());
    }

    #[test]
    fn available_actions_append_cancel() {
        use AppointmentStatus::*;
        assert_eq!(Pending.available_actions(), vec![Booked, Cancelled]);
        assert_eq!(
            Arrived.available_actions(),
            vec![InConsultation, Fulfilled, Cancelled]
        );
        assert_eq!(CheckedIn.available_actions(), vec![Cancelled]);
        assert!(Fulfilled.available_actions().is_empty());
    }

    #[test]
    fn unknown_status_uses_pending_display() {
        let unknown = AppointmentStatus::from_code("unknown-status");
        assert_eq!(unknown.color_class(), AppointmentStatus::Pending.color_class());
        assert_eq!(unknown.label(), "Pending");
        assert_eq!(unknown.as_str(), "unknown-status");
    }

    #[test]
    fn every_known_status_has_a_distinct_label() {
        let mut labels: Vec<&str> = AppointmentStatus::KNOWN.iter().map(|s| s.label()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), AppointmentStatus::KNOWN.len());
    }

    #[test]
    fn codes_round_trip_through_strings() {
        for status in AppointmentStatus::KNOWN {
            assert_eq!(AppointmentStatus::from_code(status.as_str()), status);
        }
        assert_eq!(
            AppointmentStatus::from_code(" In-Consultation "),
            AppointmentStatus::InConsultation
        );
        assert_eq!(
            AppointmentStatus::from_exact_code("Cancelled"),
            AppointmentStatus::Unrecognized("Cancelled".into())
        );
        assert_eq!(
            AppointmentStatus::from_exact_code("cancelled"),
            AppointmentStatus::Cancelled
        );
        let json = serde_json::to_string(&AppointmentStatus::EnteredInError).unwrap();
        assert_eq!(json, "\"entered-in-error\"");
    }

    #[test]
    fn cancel_leaves_terminal_appointments_alone() {
        assert!(cancel(&appt(AppointmentStatus::Fulfilled)).is_none());
        assert!(cancel(&appt(AppointmentStatus::Cancelled)).is_none());

        let cancelled = cancel(&appt(AppointmentStatus::Booked)).unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert_eq!(cancelled.id, "a-1");
    }

    #[test]
    fn transition_validates_target() {
        let booked = appt(AppointmentStatus::Booked);
        assert_eq!(
            transition(&booked, AppointmentStatus::Fulfilled),
            Err(TransitionError::NotAllowed {
                from: AppointmentStatus::Booked,
                to: AppointmentStatus::Fulfilled,
            })
        );
        let arrived = transition(&booked, AppointmentStatus::Arrived).unwrap();
        assert_eq!(arrived.status, AppointmentStatus::Arrived);

        let consulting = appt(AppointmentStatus::InConsultation);
        assert!(transition(&consulting, AppointmentStatus::Cancelled).is_ok());
        assert!(transition(&appt(AppointmentStatus::Fulfilled), AppointmentStatus::Cancelled).is_err());
    }
}
