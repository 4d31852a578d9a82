// src/source/mod.rs
//
// The appointment backend as seen from the board. Everything behind this trait
// owns persistence; the board only reads snapshots and forwards validated status moves.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use thiserror::Error;

use crate::scheduling::appointment::{Appointment, Doctor, Specialty};
use crate::scheduling::status::AppointmentStatus;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("seed file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("seed file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Provider-side narrowing. The board re-applies its own filters afterwards,
/// so a source may ignore any of these and still be correct.
#[derive(Debug, Clone, Default)]
pub struct FetchCriteria {
    /// Inclusive lower bound on start.
    pub from: Option<DateTime<FixedOffset>>,
    /// Exclusive upper bound on start.
    pub to: Option<DateTime<FixedOffset>>,
    pub doctor_id: Option<String>,
    pub specialty_id: Option<String>,
}

impl FetchCriteria {
    /// Appointments without a start only pass when no time range is requested.
    pub fn admits(&self, a: &Appointment) -> bool {
        if self.from.is_some() || self.to.is_some() {
            let Some(start) = a.start else {
                return false;
            };
            if self.from.is_some_and(|from| start < from) {
                return false;
            }
            if self.to.is_some_and(|to| start >= to) {
                return false;
            }
        }
        if let Some(doctor) = &self.doctor_id {
            if a.doctor_id() != Some(doctor.as_str()) {
                return false;
            }
        }
        if let Some(specialty) = &self.specialty_id {
            if a.specialty_id() != Some(specialty.as_str()) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait AppointmentSource: Send + Sync {
    async fn fetch_appointments(&self, criteria: &FetchCriteria) -> Result<Vec<Appointment>, SourceError>;

    async fn fetch_appointment(&self, id: &str) -> Result<Option<Appointment>, SourceError>;

    async fn fetch_doctors(&self) -> Result<Vec<Doctor>, SourceError>;

    async fn fetch_specialties(&self) -> Result<Vec<Specialty>, SourceError>;

    /// Write a status the workflow already validated. `None` if the id is unknown.
    async fn update_status(
        &self,
        id: &str,
        status: &AppointmentStatus,
    ) -> Result<Option<Appointment>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::appointment::parse_timestamp;

    fn at(ts: &str) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(ts, FixedOffset::east_opt(0).unwrap())
    }

    #[test]
    fn range_is_half_open() {
        let criteria = FetchCriteria {
            from: at("2024-01-01"),
            to: at("2024-01-02"),
            ..FetchCriteria::default()
        };
        let mut a = Appointment::new("a");

        a.start = at("2024-01-01T00:00");
        assert!(criteria.admits(&a));
        a.start = at("2024-01-01T23:59");
        assert!(criteria.admits(&a));
        a.start = at("2024-01-02T00:00");
        assert!(!criteria.admits(&a));
        a.start = None;
        assert!(!criteria.admits(&a));
        assert!(FetchCriteria::default().admits(&a));
    }
}
