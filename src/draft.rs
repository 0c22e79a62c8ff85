//! The in-progress booking.
//!
//! A draft is filled one selection at a time and only becomes a request once
//! every required field is present and the date is not in the past.

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;
use crate::gateway::CreateBookingRequest;

pub const PAST_DATE_MESSAGE: &str = "You cannot book for a past date";
pub const MISSING_FIELDS_MESSAGE: &str = "Please fill all the fields before proceeding.";

pub const MIN_PASSENGERS: u8 = 1;
pub const MAX_PASSENGERS: u8 = 8;

const SOURCES: &[(&str, &str)] = &[("Gangtok", "gk"), ("Siliguri", "si"), ("Darjeeling", "dj")];

const DESTINATIONS: &[(&str, &str)] = &[("Nathula", "na"), ("Lachung", "la")];

const PICKUP_POINTS: &[(&str, &str)] = &[
    ("Kazi Road Power Office", "krpo"),
    ("Nam Nang Legislative Assembly", "nnla"),
    ("Zero Point", "zp"),
    ("White Hill", "wh"),
    ("Chanmari Forest Check Post", "cfcp"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub label: String,
    pub value: String,
}

/// Fixed lists a draft location must come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catalog {
    Source,
    Destination,
    PickupPoint,
}

impl Catalog {
    fn entries(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Catalog::Source => SOURCES,
            Catalog::Destination => DESTINATIONS,
            Catalog::PickupPoint => PICKUP_POINTS,
        }
    }

    pub fn locations(&self) -> Vec<Location> {
        self.entries()
            .iter()
            .map(|(label, value)| Location {
                label: label.to_string(),
                value: value.to_string(),
            })
            .collect()
    }

    /// Look up an entry by value or label, ignoring case.
    pub fn find(&self, query: &str) -> Option<Location> {
        let query = query.trim();
        self.entries()
            .iter()
            .find(|(label, value)| {
                value.eq_ignore_ascii_case(query) || label.eq_ignore_ascii_case(query)
            })
            .map(|(label, value)| Location {
                label: label.to_string(),
                value: value.to_string(),
            })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Catalog::Source => "source location",
            Catalog::Destination => "destination location",
            Catalog::PickupPoint => "pickup point",
        }
    }

    pub fn select(&self, query: &str) -> Result<Location, ClientError> {
        self.find(query).ok_or_else(|| {
            let known: Vec<&str> = self.entries().iter().map(|(label, _)| *label).collect();
            ClientError::validation(format!(
                "Unknown {} '{}'. Choose one of: {}",
                self.name(),
                query,
                known.join(", ")
            ))
        })
    }
}

/// Departure time on a 15-minute grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepartureTime {
    hour: u32,
    minute: u32,
}

impl DepartureTime {
    /// Round to the nearest quarter hour; :53 becomes the next full hour.
    /// The result stays on the same day, so 11:53 PM is held at 11:45 PM.
    pub fn quantize(time: NaiveTime) -> Self {
        let mut hour = time.hour();
        let mut minute = (time.minute() + 7) / 15 * 15;
        if minute == 60 {
            if hour == 23 {
                minute = 45;
            } else {
                hour += 1;
                minute = 0;
            }
        }
        Self { hour, minute }
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }
}

impl Default for DepartureTime {
    fn default() -> Self {
        Self { hour: 7, minute: 0 }
    }
}

impl fmt::Display for DepartureTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meridiem = if self.hour >= 12 { "PM" } else { "AM" };
        let hour = match self.hour % 12 {
            0 => 12,
            h => h,
        };
        write!(f, "{:02}:{:02} {}", hour, self.minute, meridiem)
    }
}

impl FromStr for DepartureTime {
    type Err = ClientError;

    /// Accepts `hh:mm AM/PM` or 24-hour `HH:MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_uppercase();
        NaiveTime::parse_from_str(&s, "%I:%M %p")
            .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M"))
            .map(Self::quantize)
            .map_err(|_| ClientError::validation("Departure time must look like 07:15 AM"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PassengerCount(u8);

impl PassengerCount {
    pub fn new(count: u8) -> Result<Self, ClientError> {
        if (MIN_PASSENGERS..=MAX_PASSENGERS).contains(&count) {
            Ok(Self(count))
        } else {
            Err(ClientError::validation(format!(
                "Passenger count must be between {} and {}",
                MIN_PASSENGERS, MAX_PASSENGERS
            )))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn increment(self) -> Self {
        Self(self.0.saturating_add(1).min(MAX_PASSENGERS))
    }

    pub fn decrement(self) -> Self {
        Self(self.0.saturating_sub(1).max(MIN_PASSENGERS))
    }
}

impl Default for PassengerCount {
    fn default() -> Self {
        Self(MIN_PASSENGERS)
    }
}

/// Local calendar date, the reference point for "past".
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn validate_booking_date(date: NaiveDate, today: NaiveDate) -> Result<(), ClientError> {
    if date < today {
        return Err(ClientError::validation(PAST_DATE_MESSAGE));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingDraft {
    pub source: Option<Location>,
    pub destination: Option<Location>,
    pub pickup_point: Option<Location>,
    pub date: Option<NaiveDate>,
    pub departure_time: DepartureTime,
    pub passengers: PassengerCount,
}

impl BookingDraft {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether every field the backend requires has been chosen.
    pub fn is_complete(&self) -> bool {
        self.source.is_some()
            && self.destination.is_some()
            && self.pickup_point.is_some()
            && self.date.is_some()
    }

    /// Set the date unless it is in the past; a rejected date leaves the draft as it was.
    pub fn set_date(&mut self, date: NaiveDate, today: NaiveDate) -> Result<(), ClientError> {
        validate_booking_date(date, today)?;
        self.date = Some(date);
        Ok(())
    }

    /// Checks shared by "proceed to confirm" and by submission.
    pub fn check(&self, today: NaiveDate) -> Result<(), ClientError> {
        if !self.is_complete() {
            return Err(ClientError::validation(MISSING_FIELDS_MESSAGE));
        }
        if let Some(date) = self.date {
            validate_booking_date(date, today)?;
        }
        Ok(())
    }

    pub fn to_request(&self, today: NaiveDate) -> Result<CreateBookingRequest, ClientError> {
        self.check(today)?;
        let (Some(source), Some(destination), Some(pickup), Some(date)) = (
            &self.source,
            &self.destination,
            &self.pickup_point,
            self.date,
        ) else {
            return Err(ClientError::validation(MISSING_FIELDS_MESSAGE));
        };

        Ok(CreateBookingRequest {
            source_location: source.label.clone(),
            destination_location: destination.label.clone(),
            pickup_point: pickup.label.clone(),
            departure_time: self.departure_time.to_string(),
            seats: self.passengers.get() as u32,
            start_date: date,
            end_date: date,
        })
    }
}
