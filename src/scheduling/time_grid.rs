// src/scheduling/time_grid.rs

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, Timelike};
use serde::Serialize;

use crate::scheduling::appointment::Appointment;

pub const DAY_START_HOUR: u32 = 8;
pub const DAY_END_HOUR: u32 = 20;
pub const SLOT_MINUTES: u32 = 30;

/// Every appointment is drawn one slot tall, whatever its real duration.
pub const SLOT_EXTENT: i64 = SLOT_MINUTES as i64;

const GRID_MINUTES: i64 = ((DAY_END_HOUR - DAY_START_HOUR) * 60) as i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub hour: u32,
    pub minute: u32,
    /// "HH:MM", 24-hour.
    pub time: String,
    /// "8:30 AM" style label.
    pub display: String,
}

impl TimeSlot {
    fn at(hour: u32, minute: u32) -> Self {
        let (h12, meridiem) = match hour {
            0 => (12, "AM"),
            1..=11 => (hour, "AM"),
            12 => (12, "PM"),
            _ => (hour - 12, "PM"),
        };
        Self {
            hour,
            minute,
            time: format!("{hour:02}:{minute:02}"),
            display: format!("{h12}:{minute:02} {meridiem}"),
        }
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        self.hour * 60 + self.minute
    }
}

/// Bookable slots of a day: 08:00 through 20:00 inclusive, every 30 minutes.
pub fn generate_slots() -> Vec<TimeSlot> {
    let first = DAY_START_HOUR * 60;
    let last = DAY_END_HOUR * 60;
    (first..=last)
        .step_by(SLOT_MINUTES as usize)
        .map(|m| TimeSlot::at(m / 60, m % 60))
        .collect()
}

static DAY_SLOTS: LazyLock<Vec<TimeSlot>> = LazyLock::new(generate_slots);

pub fn day_slots() -> &'static [TimeSlot] {
    &DAY_SLOTS
}

/// Vertical placement on the day grid, one unit per minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridPosition {
    /// Minutes since 08:00. Negative before opening, above 720 after closing; never clipped.
    pub offset: i64,
    pub extent: i64,
}

impl GridPosition {
    pub fn is_within_grid(&self) -> bool {
        (0..=GRID_MINUTES).contains(&self.offset)
    }

    /// Index into [`day_slots`] of the slot this offset falls in.
    pub fn slot_index(&self) -> Option<usize> {
        if !self.is_within_grid() {
            return None;
        }
        usize::try_from(self.offset / SLOT_EXTENT).ok()
    }
}

pub fn position_at(start: &DateTime<FixedOffset>) -> GridPosition {
    let hour = i64::from(start.hour());
    let minute = i64::from(start.minute());
    GridPosition {
        offset: (hour - i64::from(DAY_START_HOUR)) * 60 + minute,
        extent: SLOT_EXTENT,
    }
}

/// `None` when the appointment has no usable start timestamp.
pub fn position(appointment: &Appointment) -> Option<GridPosition> {
    appointment.start.as_ref().map(position_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::appointment::parse_timestamp;

    fn starting_at(ts: &str) -> Appointment {
        let offset = FixedOffset::east_opt(0).unwrap();
        Appointment {
            start: parse_timestamp(ts, offset),
            ..Appointment::new("a")
        }
    }

    #[test]
    fn day_has_25_half_hour_slots() {
        let slots = generate_slots();
        assert_eq!(slots.len(), 25);
        assert_eq!(slots.first().unwrap().time, "08:00");
        assert_eq!(slots.last().unwrap().time, "20:00");
        for pair in slots.windows(2) {
            assert_eq!(
                pair[1].minutes_since_midnight() - pair[0].minutes_since_midnight(),
                30
            );
        }
    }

    #[test]
    fn slot_labels() {
        let slots = day_slots();
        assert_eq!(slots[0].display, "8:00 AM");
        assert_eq!(slots[8].time, "12:00");
        assert_eq!(slots[8].display, "12:00 PM");
        assert_eq!(slots[9].display, "12:30 PM");
        assert_eq!(slots[24].display, "8:00 PM");
    }

    #[test]
    fn cached_slots_match_fresh_generation() {
        assert_eq!(day_slots(), generate_slots().as_slice());
    }

    #[test]
    fn offset_counts_minutes_from_opening() {
        let p = position(&starting_at("2024-03-04T08:00:00")).unwrap();
        assert_eq!(p, GridPosition { offset: 0, extent: 30 });

        let p = position(&starting_at("2024-03-04T08:45:00")).unwrap();
        assert_eq!(p.offset, 45);
        assert_eq!(p.extent, 30);
        assert_eq!(p.slot_index(), Some(1));
    }

    #[test]
    fn extent_ignores_duration() {
        let mut a = starting_at("2024-03-04T10:00:00");
        a.end = parse_timestamp("2024-03-04T12:30:00", FixedOffset::east_opt(0).unwrap());
        assert_eq!(position(&a).unwrap().extent, 30);
    }

    #[test]
    fn out_of_hours_offsets_are_not_clipped() {
        let early = position(&starting_at("2024-03-04T07:15")).unwrap();
        assert_eq!(early.offset, -45);
        assert!(!early.is_within_grid());
        assert_eq!(early.slot_index(), None);

        let late = position(&starting_at("2024-03-04T21:00")).unwrap();
        assert_eq!(late.offset, 780);
        assert!(!late.is_within_grid());

        let closing = position(&starting_at("2024-03-04T20:00")).unwrap();
        assert!(closing.is_within_grid());
        assert_eq!(closing.slot_index(), Some(24));
    }

    #[test]
    fn missing_start_has_no_position() {
        assert!(position(&Appointment::new("a")).is_none());
        assert!(position(&starting_at("garbage")).is_none());
    }

    #[test]
    fn zoned_start_is_placed_in_clinic_time() {
        let plus_one = FixedOffset::east_opt(3600).unwrap();
        let a = Appointment {
            start: parse_timestamp("2024-01-01T09:00:00Z", plus_one),
            ..Appointment::new("a")
        };
        assert_eq!(position(&a).unwrap().offset, 120);
    }
}
