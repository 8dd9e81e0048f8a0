// src/scheduling.rs

//! Interview slot computation.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, Utc};

use crate::models::interview::{AvailabilityWindow, BookedInterview};

pub const DEFAULT_SLOT_MINUTES: i64 = 30;
pub const DEFAULT_MIN_NOTICE_HOURS: i64 = 12;
pub const DEFAULT_DAYS: u32 = 7;

#[derive(Debug, Clone)]
pub struct SlotQuery {
    pub from: NaiveDate,
    pub days: u32,
    pub slot_minutes: i64,
    pub now: DateTime<Utc>,
    /// Slots starting before `now + min_notice` are not offered.
    pub min_notice: Duration,
}

impl SlotQuery {
    pub fn new(from: NaiveDate, days: u32, now: DateTime<Utc>) -> Self {
        Self {
            from,
            days,
            slot_minutes: DEFAULT_SLOT_MINUTES,
            now,
            min_notice: Duration::hours(DEFAULT_MIN_NOTICE_HOURS),
        }
    }

    /// `[start, end)` covering every day of the query, for fetching bookings.
    ///
    /// `None` when the range runs past the last representable date.
    pub fn range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.from.and_time(NaiveTime::MIN).and_utc();
        let end = Duration::try_days(i64::from(self.days))
            .and_then(|days| start.checked_add_signed(days))?;
        Some((start, end))
    }
}

/// Expands weekly availability into free slot start times, sorted and unique.
///
/// Slots that would end past the last representable instant are skipped.
pub fn open_slots(
    windows: &[AvailabilityWindow],
    bookings: &[BookedInterview],
    query: &SlotQuery,
) -> Vec<DateTime<Utc>> {
    let Some(slot) = Duration::try_minutes(query.slot_minutes).filter(|d| *d > Duration::zero())
    else {
        return Vec::new();
    };
    let Some(earliest) = query.now.checked_add_signed(query.min_notice) else {
        return Vec::new();
    };
    let mut slots = BTreeSet::new();

    for offset in 0..query.days {
        let Some(date) = query.from.checked_add_days(Days::new(u64::from(offset))) else {
            break;
        };
        let weekday = date.weekday().num_days_from_sunday() as u8;

        for window in windows.iter().filter(|w| w.day_of_week == weekday) {
            let mut start = date.and_time(window.start_time).and_utc();
            let end = date.and_time(window.end_time).and_utc();

            while let Some(slot_end) = start.checked_add_signed(slot) {
                if slot_end > end {
                    break;
                }
                if start >= earliest && !overlaps_booking(start, slot_end, bookings) {
                    slots.insert(start);
                }
                start = slot_end;
            }
        }
    }

    slots.into_iter().collect()
}

/// Whether `at` is one of the open slots for its day.
pub fn is_open_slot(
    windows: &[AvailabilityWindow],
    bookings: &[BookedInterview],
    at: DateTime<Utc>,
    query: &SlotQuery,
) -> bool {
    open_slots(windows, bookings, query).contains(&at)
}

fn overlaps_booking(start: DateTime<Utc>, end: DateTime<Utc>, bookings: &[BookedInterview]) -> bool {
    bookings.iter().any(|b| {
        // A duration too large to add blocks the rest of the calendar.
        let booked_end = Duration::try_minutes(b.duration_minutes)
            .and_then(|d| b.scheduled_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        start < booked_end && b.scheduled_at < end
    })
}
