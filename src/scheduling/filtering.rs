// src/scheduling/filtering.rs

use std::collections::HashMap;

use serde::Serialize;

use crate::scheduling::appointment::Appointment;
use crate::scheduling::status::AppointmentStatus;

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;

/* -------------------------
   Filter state
--------------------------*/

/// Board filters as one immutable value. Every `with_*` returns a new state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub specialty: Option<String>,
    pub doctor: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub show_cancelled: bool,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl FilterState {
    /// Selecting a specialty drops the doctor filter, since the doctor facets change with it.
    pub fn with_specialty(self, specialty: &str) -> Self {
        Self {
            specialty: non_empty(specialty),
            doctor: None,
            ..self
        }
    }

    pub fn with_doctor(self, doctor: &str) -> Self {
        Self {
            doctor: non_empty(doctor),
            ..self
        }
    }

    /// Status filtering is exact: `CANCELLED` is not `cancelled` and matches nothing.
    pub fn with_status(self, status: &str) -> Self {
        Self {
            status: non_empty(status).map(|s| AppointmentStatus::from_exact_code(&s)),
            ..self
        }
    }

    pub fn with_show_cancelled(self, show_cancelled: bool) -> Self {
        Self {
            show_cancelled,
            ..self
        }
    }

    pub fn reset(&self) -> Self {
        Self::default()
    }

    /// `show_cancelled == false` wins over an explicit `status = cancelled`.
    pub fn matches(&self, appointment: &Appointment) -> bool {
        if let Some(specialty) = &self.specialty {
            if appointment.specialty_id() != Some(specialty.as_str()) {
                return false;
            }
        }
        if let Some(doctor) = &self.doctor {
            if appointment.doctor_id() != Some(doctor.as_str()) {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if appointment.status != *status {
                return false;
            }
        }
        if !self.show_cancelled && appointment.status == AppointmentStatus::Cancelled {
            return false;
        }
        true
    }
}

/* -------------------------
   Filter + sort
--------------------------*/

fn start_key(appointment: &Appointment) -> i64 {
    appointment
        .start
        .map(|s| s.timestamp_millis())
        .unwrap_or(0)
}

/// Narrow by the filter, then order most recent first.
/// Appointments without a start sort as if they started at the Unix epoch.
pub fn apply_filters(appointments: &[Appointment], filter: &FilterState) -> Vec<Appointment> {
    let mut out: Vec<Appointment> = appointments
        .iter()
        .filter(|a| filter.matches(a))
        .cloned()
        .collect();
    out.sort_by(|a, b| start_key(b).cmp(&start_key(a)));
    out
}

/* -------------------------
   Facets
--------------------------*/

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecialtyFacet {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorFacet {
    pub id: String,
    pub name: String,
    pub specialty_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facets {
    pub specialties: Vec<SpecialtyFacet>,
    pub doctors: Vec<DoctorFacet>,
}

/// Keeps first-seen order; a later entry with the same id replaces the data.
struct Dedup<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Dedup<T> {
    fn new() -> Self {
        Self {
            items: vec![],
            index: HashMap::new(),
        }
    }

    fn put(&mut self, id: &str, item: T) {
        match self.index.get(id) {
            Some(&at) => self.items[at] = item,
            None => {
                self.index.insert(id.to_string(), self.items.len());
                self.items.push(item);
            }
        }
    }
}

/// Specialty facets ignore the active filter; doctor facets only include doctors
/// seen on appointments of the active specialty.
pub fn derive_facets(appointments: &[Appointment], active_specialty: Option<&str>) -> Facets {
    let active_specialty = active_specialty.map(str::trim).filter(|s| !s.is_empty());

    let mut specialties: Dedup<SpecialtyFacet> = Dedup::new();
    let mut doctors: Dedup<DoctorFacet> = Dedup::new();

    for a in appointments {
        if let Some(s) = &a.specialty {
            specialties.put(
                &s.id,
                SpecialtyFacet {
                    id: s.id.clone(),
                    name: s.name.clone(),
                },
            );
        }

        let Some(d) = &a.doctor else { continue };
        if active_specialty.is_some() && a.specialty_id() != active_specialty {
            continue;
        }
        doctors.put(
            &d.id,
            DoctorFacet {
                id: d.id.clone(),
                name: d.display_name(),
                specialty_id: a.specialty_id().map(str::to_string),
            },
        );
    }

    Facets {
        specialties: specialties.items,
        doctors: doctors.items,
    }
}

/* -------------------------
   Pagination
--------------------------*/

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: i64,
    pub offset: i64,
}

/// limit defaults to 50 and is clamped to 1..=200; offset defaults to 0 and is never negative.
pub fn paginate<T>(items: Vec<T>, limit: Option<i64>, offset: Option<i64>) -> Page<T> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = offset.unwrap_or(0).max(0);
    let total = items.len();

    let items = items
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(usize::try_from(limit).unwrap_or(0))
        .collect();

    Page {
        items,
        total,
        limit,
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::appointment::{DoctorRef, Specialty, parse_timestamp};
    use chrono::FixedOffset;

    fn appt(id: &str, status: &str, start: Option<&str>) -> Appointment {
        let utc = FixedOffset::east_opt(0).unwrap();
        Appointment {
            status: AppointmentStatus::from_code(status),
            start: start.and_then(|s| parse_timestamp(s, utc)),
            ..Appointment::new(id)
        }
    }

    fn with_refs(mut a: Appointment, specialty: (&str, &str), doctor: (&str, &str, &str)) -> Appointment {
        a.specialty = Some(Specialty {
            id: specialty.0.into(),
            name: specialty.1.into(),
        });
        a.doctor = Some(DoctorRef {
            id: doctor.0.into(),
            first_name: doctor.1.into(),
            last_name: doctor.2.into(),
        });
        a
    }

    fn ids(list: &[Appointment]) -> Vec<&str> {
        list.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn show_cancelled_orders_most_recent_first() {
        let list = vec![
            appt("1", "pending", Some("2024-01-01T09:00")),
            appt("2", "cancelled", Some("2024-01-02T09:00")),
        ];
        let filter = FilterState::default().with_show_cancelled(true);
        assert_eq!(ids(&apply_filters(&list, &filter)), vec!["2", "1"]);
    }

    #[test]
    fn cancelled_hidden_by_default() {
        let list = vec![
            appt("1", "pending", Some("2024-01-01T09:00")),
            appt("2", "cancelled", Some("2024-01-02T09:00")),
        ];
        assert_eq!(ids(&apply_filters(&list, &FilterState::default())), vec!["1"]);
    }

    #[test]
    fn hidden_cancelled_beats_explicit_cancelled_status() {
        let list = vec![
            appt("1", "cancelled", Some("2024-01-01T09:00")),
            appt("2", "booked", Some("2024-01-02T09:00")),
        ];
        let filter = FilterState::default().with_status("cancelled");
        assert!(apply_filters(&list, &filter).is_empty());

        let filter = filter.with_show_cancelled(true);
        assert_eq!(ids(&apply_filters(&list, &filter)), vec!["1"]);
    }

    #[test]
    fn status_filter_is_case_sensitive() {
        let list = vec![
            appt("1", "cancelled", Some("2024-01-01T09:00")),
            appt("2", "booked", Some("2024-01-02T09:00")),
        ];
        let loud = FilterState::default()
            .with_show_cancelled(true)
            .with_status("CANCELLED");
        assert!(apply_filters(&list, &loud).is_empty());

        let exact = loud.with_status("booked");
        assert_eq!(ids(&apply_filters(&list, &exact)), vec!["2"]);
    }

    #[test]
    fn filters_are_and_combined() {
        let list = vec![
            with_refs(appt("1", "booked", Some("2024-01-01T09:00")), ("s1", "Cardio"), ("d1", "A", "B")),
            with_refs(appt("2", "booked", Some("2024-01-01T10:00")), ("s1", "Cardio"), ("d2", "C", "D")),
            with_refs(appt("3", "arrived", Some("2024-01-01T11:00")), ("s1", "Cardio"), ("d1", "A", "B")),
            with_refs(appt("4", "booked", Some("2024-01-01T12:00")), ("s2", "Derm"), ("d1", "A", "B")),
        ];
        let filter = FilterState::default()
            .with_specialty("s1")
            .with_doctor("d1")
            .with_status("booked");
        assert_eq!(ids(&apply_filters(&list, &filter)), vec!["1"]);

        let filter = FilterState::default().with_specialty("s1");
        assert_eq!(ids(&apply_filters(&list, &filter)), vec!["3", "2", "1"]);
    }

    #[test]
    fn empty_values_are_pass_through() {
        let list = vec![
            appt("1", "booked", Some("2024-01-01T09:00")),
            appt("2", "arrived", Some("2024-01-01T10:00")),
        ];
        let filter = FilterState::default()
            .with_specialty("")
            .with_doctor(" ")
            .with_status("");
        assert_eq!(filter, FilterState::default());
        assert_eq!(apply_filters(&list, &filter).len(), 2);
    }

    #[test]
    fn missing_start_sinks_to_the_end() {
        let list = vec![
            appt("none", "booked", None),
            appt("bad", "booked", Some("yesterday-ish")),
            appt("new", "booked", Some("2024-05-01T09:00")),
            appt("old", "booked", Some("2023-05-01T09:00")),
        ];
        let out = apply_filters(&list, &FilterState::default());
        assert_eq!(ids(&out), vec!["new", "old", "none", "bad"]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let list = vec![
            appt("a", "booked", Some("2024-01-01T09:00")),
            appt("b", "cancelled", Some("2024-01-03T09:00")),
            appt("c", "arrived", None),
            appt("d", "booked", Some("2024-01-02T09:00")),
            appt("e", "booked", Some("2024-01-02T09:00")),
        ];
        let filter = FilterState::default().with_show_cancelled(true);
        let once = apply_filters(&list, &filter);
        let twice = apply_filters(&once, &filter);
        assert_eq!(once, twice);
    }

    #[test]
    fn selecting_specialty_clears_doctor_and_reset_restores_defaults() {
        let filter = FilterState::default()
            .with_doctor("d1")
            .with_show_cancelled(true)
            .with_specialty("s2");
        assert_eq!(filter.doctor, None);
        assert_eq!(filter.specialty.as_deref(), Some("s2"));
        assert!(filter.show_cancelled);
        assert_eq!(filter.reset(), FilterState::default());
    }

    #[test]
    fn doctor_facets_follow_specialty_filter() {
        let list = vec![
            with_refs(appt("1", "booked", None), ("s1", "Cardio"), ("d1", "Ana", "Silva")),
            with_refs(appt("2", "booked", None), ("s2", "Derm"), ("d1", "Ana", "Silva")),
            with_refs(appt("3", "booked", None), ("s2", "Derm"), ("d2", "Rui", "Costa")),
        ];

        let facets = derive_facets(&list, Some("s1"));
        assert_eq!(facets.specialties.len(), 2);
        assert_eq!(
            facets.doctors,
            vec![DoctorFacet {
                id: "d1".into(),
                name: "Ana Silva".into(),
                specialty_id: Some("s1".into()),
            }]
        );

        let facets = derive_facets(&list, None);
        assert_eq!(facets.doctors.len(), 2);
        assert_eq!(facets.doctors[0].specialty_id.as_deref(), Some("s2"));

        assert_eq!(derive_facets(&list, Some("")), facets);
    }

    #[test]
    fn facets_dedup_with_last_seen_data() {
        let list = vec![
            with_refs(appt("1", "booked", None), ("s1", "Cardio"), ("d1", "Ana", "Silva")),
            with_refs(appt("2", "booked", None), ("s2", "Derm"), ("d2", "Rui", "Costa")),
            with_refs(appt("3", "booked", None), ("s1", "Cardiology"), ("d1", "Ana", "Silva-Reis")),
        ];
        let facets = derive_facets(&list, None);
        let names: Vec<&str> = facets.specialties.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Cardiology", "Derm"]);
        assert_eq!(facets.doctors[0].name, "Ana Silva-Reis");
    }

    #[test]
    fn paginate_clamps_limit_and_offset() {
        let items: Vec<u32> = (0..10).collect();

        let page = paginate(items.clone(), Some(3), Some(4));
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 10);

        let page = paginate(items.clone(), Some(0), Some(-5));
        assert_eq!((page.limit, page.offset), (1, 0));
        assert_eq!(page.items, vec![0]);

        let page = paginate(items.clone(), Some(1000), None);
        assert_eq!(page.limit, 200);
        assert_eq!(page.items.len(), 10);

        let page = paginate(items, None, Some(50));
        assert_eq!(page.limit, 50);
        assert!(page.items.is_empty());
    }
}
