// src/source/memory.rs

use std::path::Path;

use async_trait::async_trait;
use chrono::FixedOffset;
use tokio::sync::RwLock;

use serde_json::Value as JsonValue;

use crate::scheduling::appointment::{Appointment, Doctor, Specialty, normalize_all};
use crate::scheduling::status::AppointmentStatus;
use crate::source::{AppointmentSource, FetchCriteria, SourceError};

/// Process-local backend used when no database is configured, and by the tests.
/// Doctor and specialty catalogs are derived from the seeded appointments.
pub struct MemorySource {
    appointments: RwLock<Vec<Appointment>>,
    doctors: Vec<Doctor>,
    specialties: Vec<Specialty>,
}

impl MemorySource {
    pub fn new(appointments: Vec<Appointment>) -> Self {
        let mut doctors: Vec<Doctor> = vec![];
        let mut specialties: Vec<Specialty> = vec![];

        for a in &appointments {
            if let Some(s) = &a.specialty {
                if !specialties.iter().any(|x| x.id == s.id) {
                    specialties.push(s.clone());
                }
            }
            if let Some(d) = &a.doctor {
                if !doctors.iter().any(|x| x.id == d.id) {
                    doctors.push(Doctor {
                        id: d.id.clone(),
                        first_name: d.first_name.clone(),
                        last_name: d.last_name.clone(),
                        specialty_id: a.specialty_id().map(str::to_string),
                    });
                }
            }
        }

        Self {
            appointments: RwLock::new(appointments),
            doctors,
            specialties,
        }
    }

    /// Seed from a JSON array of appointment records. Records that are malformed or
    /// unidentifiable are skipped one by one; only an unreadable file or a non-array fails.
    pub async fn from_seed_file(path: &Path, clinic_offset: FixedOffset) -> Result<Self, SourceError> {
        let bytes = tokio::fs::read(path).await?;
        let records: Vec<JsonValue> = serde_json::from_slice(&bytes)?;
        let total = records.len();
        let appointments = normalize_all(records, clinic_offset);
        tracing::info!(
            path = %path.display(),
            loaded = appointments.len(),
            skipped = total - appointments.len(),
            "seeded in-memory appointment source"
        );
        Ok(Self::new(appointments))
    }
}

#[async_trait]
impl AppointmentSource for MemorySource {
    async fn fetch_appointments(&self, criteria: &FetchCriteria) -> Result<Vec<Appointment>, SourceError> {
        let guard = self.appointments.read().await;
        Ok(guard.iter().filter(|a| criteria.admits(a)).cloned().collect())
    }

    async fn fetch_appointment(&self, id: &str) -> Result<Option<Appointment>, SourceError> {
        let guard = self.appointments.read().await;
        Ok(guard.iter().find(|a| a.id == id).cloned())
    }

    async fn fetch_doctors(&self) -> Result<Vec<Doctor>, SourceError> {
        Ok(self.doctors.clone())
    }

    async fn fetch_specialties(&self) -> Result<Vec<Specialty>, SourceError> {
        Ok(self.specialties.clone())
    }

    async fn update_status(
        &self,
        id: &str,
        status: &AppointmentStatus,
    ) -> Result<Option<Appointment>, SourceError> {
        let mut guard = self.appointments.write().await;
        let Some(slot) = guard.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        // replace the snapshot rather than mutating it in place
        *slot = slot.with_status(status.clone());
        Ok(Some(slot.clone()))
    }
}
