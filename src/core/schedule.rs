use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::models::{DaySet, Deal, DealKind, Event, Venue};

/// Time-of-day window; either bound may be open
///
/// A window whose end is earlier than its start runs past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
}

impl TimeWindow {
    pub fn new(start: Option<NaiveTime>, end: Option<NaiveTime>) -> Self {
        Self { start, end }
    }

    pub fn always() -> Self {
        Self::new(None, None)
    }

    #[inline]
    pub fn contains(&self, time: NaiveTime) -> bool {
        match (self.start, self.end) {
            (None, None) => true,
            (Some(start), None) => time >= start,
            (None, Some(end)) => time <= end,
            (Some(start), Some(end)) if start <= end => time >= start && time <= end,
            (Some(start), Some(end)) => time >= start || time <= end,
        }
    }

    /// True when the window runs past midnight
    pub fn wraps_midnight(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if end < start)
    }
}

impl DaySet {
    #[inline]
    pub fn includes(&self, day: Weekday) -> bool {
        match self {
            DaySet::All => true,
            DaySet::Days(days) => days.contains(&day),
        }
    }
}

impl Deal {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_time, self.end_time)
    }

    /// Whether the deal applies at the given venue-local moment
    pub fn is_active_at(&self, now: NaiveDateTime) -> bool {
        self.is_active && self.days.includes(now.weekday()) && self.window().contains(now.time())
    }

    pub fn is_happy_hour(&self) -> bool {
        self.kind == DealKind::HappyHour
    }
}

impl Event {
    pub fn is_on(&self, date: NaiveDate) -> bool {
        self.starts_at.date() == date
    }
}

/// Deals and events of a venue that apply right now
#[derive(Debug, Clone, Default)]
pub struct TonightSchedule<'a> {
    pub active_deals: Vec<&'a Deal>,
    pub events_today: Vec<&'a Event>,
}

impl TonightSchedule<'_> {
    pub fn has_deals(&self) -> bool {
        !self.active_deals.is_empty()
    }

    pub fn has_events(&self) -> bool {
        !self.events_today.is_empty()
    }

    pub fn has_happy_hour(&self) -> bool {
        self.active_deals.iter().any(|d| d.is_happy_hour())
    }
}

/// Match a venue's deals and events against the current local time
pub fn tonight_schedule(venue: &Venue, now: NaiveDateTime) -> TonightSchedule<'_> {
    TonightSchedule {
        active_deals: venue.deals.iter().filter(|d| d.is_active_at(now)).collect(),
        events_today: venue.events.iter().filter(|e| e.is_on(now.date())).collect(),
    }
}

/// Decides whether a venue is open at a given moment
///
/// Supplied by the catalog side so the engine never hard-codes hours.
pub trait OpenNowPolicy: Send + Sync + std::fmt::Debug {
    fn is_open(&self, venue: &Venue, now: NaiveDateTime) -> bool;
}

/// Uses each venue's published weekly opening hours
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduledHours;

impl OpenNowPolicy for ScheduledHours {
    fn is_open(&self, venue: &Venue, now: NaiveDateTime) -> bool {
        let time = now.time();
        venue.opening_hours.iter().any(|hours| {
            let window = TimeWindow::new(Some(hours.opens), Some(hours.closes));
            if !window.wraps_midnight() {
                return hours.days.includes(now.weekday()) && window.contains(time);
            }
            // Late hours belong to the day the venue opened
            if time >= hours.opens {
                hours.days.includes(now.weekday())
            } else {
                time <= hours.closes && hours.days.includes(now.weekday().pred())
            }
        })
    }
}

/// Treats every venue as open inside one fixed nightly window
#[derive(Debug, Clone, Copy)]
pub struct FixedWindow(pub TimeWindow);

impl OpenNowPolicy for FixedWindow {
    fn is_open(&self, _venue: &Venue, now: NaiveDateTime) -> bool {
        self.0.contains(now.time())
    }
}
