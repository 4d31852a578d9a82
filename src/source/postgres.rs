// src/source/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::scheduling::appointment::{
    Appointment, Doctor, DoctorRef, Participant, ParticipantRequired, ParticipationStatus,
    PatientRef, Specialty,
};
use crate::scheduling::status::AppointmentStatus;
use crate::source::{AppointmentSource, FetchCriteria, SourceError};

/*
Reads the appointment backend's tables:

appointment(appointment_id, start_at, end_at, status, priority, appointment_type,
            service_category, description, specialty_id, doctor_id, patient_id, updated_at)
appointment_participant(appointment_id, actor_type, actor_id, required, status,
                        period_start, period_end)
specialty(specialty_id, name)
doctor(doctor_id, first_name, last_name, specialty_id)
patient(patient_id, first_name, last_name)
*/

const APPOINTMENT_SELECT: &str = r#"
    SELECT
      a.appointment_id,
      a.start_at,
      a.end_at,
      a.status,
      a.priority,
      a.appointment_type,
      a.service_category,
      a.description,

      s.specialty_id,
      s.name AS specialty_name,

      d.doctor_id,
      d.first_name AS doctor_first,
      d.last_name  AS doctor_last,

      p.patient_id,
      p.first_name AS patient_first,
      p.last_name  AS patient_last

    FROM appointment a
    LEFT JOIN specialty s ON s.specialty_id = a.specialty_id
    LEFT JOIN doctor d    ON d.doctor_id    = a.doctor_id
    LEFT JOIN patient p   ON p.patient_id   = a.patient_id
"#;

#[derive(Debug, FromRow)]
struct AppointmentRow {
    appointment_id: Uuid,
    start_at: Option<DateTime<Utc>>,
    end_at: Option<DateTime<Utc>>,
    status: Option<String>,
    priority: Option<i32>,
    appointment_type: Option<String>,
    service_category: Option<String>,
    description: Option<String>,
    specialty_id: Option<Uuid>,
    specialty_name: Option<String>,
    doctor_id: Option<Uuid>,
    doctor_first: Option<String>,
    doctor_last: Option<String>,
    patient_id: Option<Uuid>,
    patient_first: Option<String>,
    patient_last: Option<String>,
}

#[derive(Debug, FromRow)]
struct ParticipantRow {
    appointment_id: Uuid,
    actor_type: String,
    actor_id: String,
    required: Option<String>,
    status: Option<String>,
    period_start: Option<DateTime<Utc>>,
    period_end: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct DoctorRow {
    doctor_id: Uuid,
    first_name: String,
    last_name: String,
    specialty_id: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct SpecialtyRow {
    specialty_id: Uuid,
    name: String,
}

pub struct PgSource {
    db: PgPool,
    clinic_offset: FixedOffset,
}

impl PgSource {
    pub fn new(db: PgPool, clinic_offset: FixedOffset) -> Self {
        Self { db, clinic_offset }
    }

    fn local(&self, ts: Option<DateTime<Utc>>) -> Option<DateTime<FixedOffset>> {
        ts.map(|t| t.with_timezone(&self.clinic_offset))
    }

    fn build_appointment(&self, row: AppointmentRow, participants: Vec<Participant>) -> Appointment {
        let status = row
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(AppointmentStatus::from_code)
            .unwrap_or_default();

        Appointment {
            id: row.appointment_id.to_string(),
            start: self.local(row.start_at),
            end: self.local(row.end_at),
            status,
            specialty: row.specialty_id.map(|id| Specialty {
                id: id.to_string(),
                name: row.specialty_name.unwrap_or_default(),
            }),
            doctor: row.doctor_id.map(|id| DoctorRef {
                id: id.to_string(),
                first_name: row.doctor_first.unwrap_or_default(),
                last_name: row.doctor_last.unwrap_or_default(),
            }),
            patient: row.patient_id.map(|id| PatientRef {
                id: id.to_string(),
                name: format!(
                    "{} {}",
                    row.patient_first.unwrap_or_default(),
                    row.patient_last.unwrap_or_default()
                )
                .trim()
                .to_string(),
            }),
            priority: row.priority.and_then(|p| u32::try_from(p).ok()),
            appointment_type: row.appointment_type,
            service_category: row.service_category,
            description: row.description,
            participants,
        }
    }

    fn build_participant(&self, row: ParticipantRow) -> Participant {
        Participant {
            actor_type: row.actor_type,
            actor_id: row.actor_id,
            required: row
                .required
                .as_deref()
                .and_then(ParticipantRequired::from_code)
                .unwrap_or_default(),
            status: row
                .status
                .as_deref()
                .and_then(ParticipationStatus::from_code)
                .unwrap_or_default(),
            period_start: self.local(row.period_start),
            period_end: self.local(row.period_end),
        }
    }

    async fn load_participants(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Participant>>, SourceError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<ParticipantRow> = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT appointment_id, actor_type, actor_id, required, status, period_start, period_end
            FROM appointment_participant
            WHERE appointment_id = ANY($1)
            ORDER BY appointment_id, actor_type, actor_id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await?;

        let mut map: HashMap<Uuid, Vec<Participant>> = HashMap::new();
        for r in rows {
            let appointment_id = r.appointment_id;
            map.entry(appointment_id)
                .or_default()
                .push(self.build_participant(r));
        }
        Ok(map)
    }

    async fn assemble(&self, rows: Vec<AppointmentRow>) -> Result<Vec<Appointment>, SourceError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.appointment_id).collect();
        let mut participants = self.load_participants(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let p = participants.remove(&r.appointment_id).unwrap_or_default();
                self.build_appointment(r, p)
            })
            .collect())
    }
}

// Ids in this backend are uuids; anything else cannot name a row.
fn parse_uuid(value: &str) -> Option<Uuid> {
    Uuid::parse_str(value.trim()).ok()
}

/// Doctor and specialty narrowing as uuids. `None` when either id cannot match any row.
fn narrowing_ids(criteria: &FetchCriteria) -> Option<(Option<Uuid>, Option<Uuid>)> {
    let doctor_id = match criteria.doctor_id.as_deref() {
        Some(v) => Some(parse_uuid(v)?),
        None => None,
    };
    let specialty_id = match criteria.specialty_id.as_deref() {
        Some(v) => Some(parse_uuid(v)?),
        None => None,
    };
    Some((doctor_id, specialty_id))
}

#[async_trait]
impl AppointmentSource for PgSource {
    async fn fetch_appointments(&self, criteria: &FetchCriteria) -> Result<Vec<Appointment>, SourceError> {
        let Some((doctor_id, specialty_id)) = narrowing_ids(criteria) else {
            tracing::debug!(?criteria, "narrowing id is not a uuid; nothing can match");
            return Ok(vec![]);
        };

        let sql = format!(
            r#"{APPOINTMENT_SELECT}
            WHERE ($1::timestamptz IS NULL OR a.start_at >= $1)
              AND ($2::timestamptz IS NULL OR a.start_at <  $2)
              AND ($3::uuid IS NULL OR a.doctor_id    = $3)
              AND ($4::uuid IS NULL OR a.specialty_id = $4)
            ORDER BY a.start_at DESC NULLS LAST
            "#
        );

        let rows: Vec<AppointmentRow> = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(criteria.from.map(|t| t.with_timezone(&Utc)))
            .bind(criteria.to.map(|t| t.with_timezone(&Utc)))
            .bind(doctor_id)
            .bind(specialty_id)
            .fetch_all(&self.db)
            .await?;

        tracing::debug!(rows = rows.len(), "fetched appointments");
        self.assemble(rows).await
    }

    async fn fetch_appointment(&self, id: &str) -> Result<Option<Appointment>, SourceError> {
        let Some(appointment_id) = parse_uuid(id) else {
            return Ok(None);
        };

        let sql = format!("{APPOINTMENT_SELECT} WHERE a.appointment_id = $1");
        let row: Option<AppointmentRow> = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(appointment_id)
            .fetch_optional(&self.db)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.assemble(vec![row]).await?.into_iter().next())
    }

    async fn fetch_doctors(&self) -> Result<Vec<Doctor>, SourceError> {
        let rows: Vec<DoctorRow> = sqlx::query_as::<_, DoctorRow>(
            r#"
            SELECT doctor_id, first_name, last_name, specialty_id
            FROM doctor
            ORDER BY last_name ASC, first_name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Doctor {
                id: r.doctor_id.to_string(),
                first_name: r.first_name,
                last_name: r.last_name,
                specialty_id: r.specialty_id.map(|s| s.to_string()),
            })
            .collect())
    }

    async fn fetch_specialties(&self) -> Result<Vec<Specialty>, SourceError> {
        let rows: Vec<SpecialtyRow> = sqlx::query_as::<_, SpecialtyRow>(
            r#"
            SELECT specialty_id, name
            FROM specialty
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Specialty {
                id: r.specialty_id.to_string(),
                name: r.name,
            })
            .collect())
    }

    async fn update_status(
        &self,
        id: &str,
        status: &AppointmentStatus,
    ) -> Result<Option<Appointment>, SourceError> {
        let Some(appointment_id) = parse_uuid(id) else {
            return Ok(None);
        };

        let updated = sqlx::query(
            r#"
            UPDATE appointment
            SET status = $2,
                updated_at = now()
            WHERE appointment_id = $1
            "#,
        )
        .bind(appointment_id)
        .bind(status.as_str())
        .execute(&self.db)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_appointment(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCTOR: &str = "6f1c3f0e-6c1f-4c38-9a53-0e3c7b0c9d11";

    #[test]
    fn uuid_ids_are_parsed_leniently() {
        assert!(parse_uuid(DOCTOR).is_some());
        assert!(parse_uuid(&format!(" {DOCTOR} ")).is_some());
        assert!(parse_uuid("d-1").is_none());
    }

    #[test]
    fn non_uuid_narrowing_means_no_match_not_an_error() {
        let criteria = FetchCriteria {
            doctor_id: Some(DOCTOR.into()),
            ..FetchCriteria::default()
        };
        let (doctor, specialty) = narrowing_ids(&criteria).unwrap();
        assert_eq!(doctor.map(|d| d.to_string()).as_deref(), Some(DOCTOR));
        assert!(specialty.is_none());

        let criteria = FetchCriteria {
            specialty_id: Some("cardiology".into()),
            ..criteria
        };
        assert!(narrowing_ids(&criteria).is_none());

        assert_eq!(narrowing_ids(&FetchCriteria::default()), Some((None, None)));
    }
}
