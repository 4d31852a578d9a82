// src/scheduling/appointment.rs

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::warn;

use crate::scheduling::status::AppointmentStatus;

/* -------------------------
   Typed snapshot
--------------------------*/

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specialty {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorRef {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

impl DoctorRef {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Doctor catalog entry as served by the appointment backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub specialty_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParticipantRequired {
    #[default]
    Required,
    Optional,
    InformationOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParticipationStatus {
    Accepted,
    Declined,
    Tentative,
    #[default]
    NeedsAction,
}

impl ParticipantRequired {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "required" => Some(ParticipantRequired::Required),
            "optional" => Some(ParticipantRequired::Optional),
            "information-only" => Some(ParticipantRequired::InformationOnly),
            _ => None,
        }
    }
}

impl ParticipationStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "accepted" => Some(ParticipationStatus::Accepted),
            "declined" => Some(ParticipationStatus::Declined),
            "tentative" => Some(ParticipationStatus::Tentative),
            "needs-action" => Some(ParticipationStatus::NeedsAction),
            _ => None,
        }
    }
}

/// FHIR Appointment.participant: who takes part and whether they have confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub actor_type: String,
    pub actor_id: String,
    pub required: ParticipantRequired,
    pub status: ParticipationStatus,
    pub period_start: Option<DateTime<FixedOffset>>,
    pub period_end: Option<DateTime<FixedOffset>>,
}

/// Read-only appointment snapshot. Timestamps are already in the clinic's offset;
/// `None` means the backend sent nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
    pub status: AppointmentStatus,
    pub specialty: Option<Specialty>,
    pub doctor: Option<DoctorRef>,
    pub patient: Option<PatientRef>,
    pub priority: Option<u32>,
    pub appointment_type: Option<String>,
    pub service_category: Option<String>,
    pub description: Option<String>,
    pub participants: Vec<Participant>,
}

impl Appointment {
    /// Bare pending appointment; everything else absent.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start: None,
            end: None,
            status: AppointmentStatus::Pending,
            specialty: None,
            doctor: None,
            patient: None,
            priority: None,
            appointment_type: None,
            service_category: None,
            description: None,
            participants: vec![],
        }
    }

    pub fn with_status(&self, status: AppointmentStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    pub fn specialty_id(&self) -> Option<&str> {
        self.specialty.as_ref().map(|s| s.id.as_str())
    }

    pub fn doctor_id(&self) -> Option<&str> {
        self.doctor.as_ref().map(|d| d.id.as_str())
    }

    /// Normalize a loosely-shaped record into a snapshot.
    /// Only a missing or unusable id is fatal; every other field degrades to `None`.
    pub fn from_raw(raw: RawAppointment, clinic_offset: FixedOffset) -> Result<Self, RecordError> {
        let id = match raw.id {
            Some(v) => opaque_id(&v).ok_or(RecordError::InvalidId)?,
            None => return Err(RecordError::MissingId),
        };

        let status = text(&raw.status)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(AppointmentStatus::from_code)
            .unwrap_or_default();

        let specialty = raw.specialty.and_then(|s| {
            let id = s.id.as_ref().and_then(opaque_id)?;
            Some(Specialty {
                id,
                name: s.name.unwrap_or_default(),
            })
        });

        let doctor = raw.doctor.and_then(|d| {
            let id = d.id.as_ref().and_then(opaque_id)?;
            Some(DoctorRef {
                id,
                first_name: d.first_name.unwrap_or_default(),
                last_name: d.last_name.unwrap_or_default(),
            })
        });

        let patient = raw.patient.and_then(|p| {
            let id = p.id.as_ref().and_then(opaque_id)?;
            Some(PatientRef {
                id,
                name: p.name.unwrap_or_default(),
            })
        });

        let participants = raw
            .participants
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| {
                let actor_id = p.actor_id.as_ref().and_then(opaque_id)?;
                Some(Participant {
                    actor_type: p.actor_type.unwrap_or_else(|| "Practitioner".into()),
                    actor_id,
                    required: text(&p.required)
                        .and_then(ParticipantRequired::from_code)
                        .unwrap_or_default(),
                    status: text(&p.status)
                        .and_then(ParticipationStatus::from_code)
                        .unwrap_or_default(),
                    period_start: text(&p.period_start).and_then(|t| parse_timestamp(t, clinic_offset)),
                    period_end: text(&p.period_end).and_then(|t| parse_timestamp(t, clinic_offset)),
                })
            })
            .collect();

        Ok(Self {
            id,
            start: text(&raw.start).and_then(|t| parse_timestamp(t, clinic_offset)),
            end: text(&raw.end).and_then(|t| parse_timestamp(t, clinic_offset)),
            status,
            specialty,
            doctor,
            patient,
            priority: raw
                .priority
                .as_ref()
                .and_then(JsonValue::as_u64)
                .and_then(|p| u32::try_from(p).ok()),
            appointment_type: raw.appointment_type.filter(|s| !s.trim().is_empty()),
            service_category: raw.service_category.filter(|s| !s.trim().is_empty()),
            description: raw.description,
            participants,
        })
    }
}

/* -------------------------
   Boundary records
--------------------------*/

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("appointment record has no id")]
    MissingId,
    #[error("appointment id must be a non-empty string or a number")]
    InvalidId,
}

/// One backend record before normalization. Fields a backend commonly gets wrong
/// (timestamps, status, priority, participant codes) stay as raw JSON and degrade
/// to `None` or a default when they have the wrong shape.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAppointment {
    pub id: Option<JsonValue>,
    pub start: Option<JsonValue>,
    pub end: Option<JsonValue>,
    pub status: Option<JsonValue>,
    pub specialty: Option<RawSpecialty>,
    pub doctor: Option<RawDoctor>,
    pub patient: Option<RawPatient>,
    pub priority: Option<JsonValue>,
    pub appointment_type: Option<String>,
    pub service_category: Option<String>,
    pub description: Option<String>,
    pub participants: Option<Vec<RawParticipant>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawSpecialty {
    pub id: Option<JsonValue>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDoctor {
    pub id: Option<JsonValue>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawPatient {
    pub id: Option<JsonValue>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawParticipant {
    pub actor_type: Option<String>,
    pub actor_id: Option<JsonValue>,
    pub required: Option<JsonValue>,
    pub status: Option<JsonValue>,
    pub period_start: Option<JsonValue>,
    pub period_end: Option<JsonValue>,
}

/// Normalize a batch record by record. A record that does not decode, or cannot be
/// identified, is logged and skipped; the rest of the batch survives.
pub fn normalize_all(records: Vec<JsonValue>, clinic_offset: FixedOffset) -> Vec<Appointment> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(idx, record)| {
            let raw = match serde_json::from_value::<RawAppointment>(record) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(index = idx, error = %e, "skipping malformed appointment record");
                    return None;
                }
            };
            match Appointment::from_raw(raw, clinic_offset) {
                Ok(a) => Some(a),
                Err(e) => {
                    warn!(index = idx, error = %e, "skipping appointment record");
                    None
                }
            }
        })
        .collect()
}

fn text(v: &Option<JsonValue>) -> Option<&str> {
    v.as_ref().and_then(JsonValue::as_str)
}

fn opaque_id(v: &JsonValue) -> Option<String> {
    match v {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 timestamp into the clinic's offset.
///
/// Zoned input (`Z`, `+02:00`) is converted; offset-less input is taken as clinic
/// wall-clock time; a bare date means local midnight. Anything else is `None`.
pub fn parse_timestamp(raw: &str, clinic_offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(zoned) = DateTime::parse_from_rfc3339(raw) {
        return Some(zoned.with_timezone(&clinic_offset));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    clinic_offset.from_local_datetime(&naive).single()
}
