//! Admin side: booking list, search, detail, driver assignment and cancel.

use chrono::{DateTime, NaiveDate};
use std::cmp::Ordering;
use tracing::info;

use super::{reject, submit, token_for};
use crate::error::{ClientError, FieldErrors};
use crate::gateway::{Booking, CarModel, DriverAssignment};
use crate::inflight::ActionKey;
use crate::notify::Notice;
use crate::router::{Event, Screen};
use crate::session::Role;
use crate::validation::{keep_digits, validate_person_name};
use crate::AppState;

const NOT_AVAILABLE: &str = "N/A";
const CONTACT_DIGITS: usize = 10;

fn require_admin(state: &AppState) -> Result<String, ClientError> {
    token_for(state, Role::Admin, "Error")
}

/// Short reference shown in the list: `B` plus the last six id characters.
pub fn booking_reference(id: &str) -> String {
    let tail: Vec<char> = id.chars().rev().take(6).collect();
    let tail: String = tail.into_iter().rev().collect();
    format!("B{}", tail)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

/// Sort by rider name. Bookings without a name go last in either order.
pub fn sort_bookings(bookings: &mut [Booking], order: SortOrder) {
    bookings.sort_by(|a, b| match (&a.username, &b.username) {
        (Some(a), Some(b)) => {
            let ord = a.to_lowercase().cmp(&b.to_lowercase());
            match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Case-insensitive substring match on the booking reference or rider name.
/// A blank query matches everything.
pub fn search_bookings(bookings: &[Booking], query: &str) -> Vec<Booking> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return bookings.to_vec();
    }
    bookings
        .iter()
        .filter(|b| {
            booking_reference(&b.id).to_lowercase().contains(&query)
                || b
                    .username
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(&query))
        })
        .cloned()
        .collect()
}

pub async fn load_bookings(state: &AppState, order: SortOrder) -> Result<Vec<Booking>, ClientError> {
    let token = require_admin(state)?;
    let mut bookings = state
        .gateway
        .list_bookings(&token)
        .await
        .or_else(|e| reject(state, "Error", e))?;
    sort_bookings(&mut bookings, order);
    info!(count = bookings.len(), "Loaded bookings");
    Ok(bookings)
}

/// Display form of one booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingSummary {
    pub id: String,
    pub reference: String,
    pub rider: String,
    pub email: String,
    pub phone: String,
    pub source: String,
    pub destination: String,
    pub pickup_point: String,
    pub date: String,
    pub departure_time: String,
    pub seats: String,
    pub payment_status: String,
    pub driver: Option<String>,
}

fn or_na(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// `dd/mm/yyyy` from an ISO date or timestamp.
pub fn format_booking_date(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return NOT_AVAILABLE.to_string();
    };
    let date = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"));
    match date {
        Ok(date) => date.format("%d/%m/%Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

impl From<&Booking> for BookingSummary {
    fn from(b: &Booking) -> Self {
        let rider = b.user_id.as_ref();
        Self {
            id: b.id.clone(),
            reference: booking_reference(&b.id),
            rider: or_na(b.username.as_deref()),
            email: or_na(rider.and_then(|r| r.email())),
            phone: or_na(rider.and_then(|r| r.phone())),
            source: or_na(b.source_location.as_deref()),
            destination: or_na(b.destination_location.as_deref()),
            pickup_point: or_na(b.pickup_point.as_deref()),
            date: format_booking_date(b.start_date.as_deref()),
            departure_time: or_na(b.departure_time.as_deref()),
            seats: b
                .seats
                .filter(|s| *s > 0)
                .map(|s| s.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            payment_status: or_na(b.payment_status.as_deref()),
            driver: b
                .driver
                .as_ref()
                .map(|d| format!("{} ({}, {})", d.name, d.car_model, d.cab_number)),
        }
    }
}

/// Fetch one booking and show its detail screen.
pub async fn open_booking(state: &AppState, id: &str) -> Result<BookingSummary, ClientError> {
    let token = require_admin(state)?;
    let booking = state
        .gateway
        .get_booking(&token, id)
        .await
        .or_else(|e| reject(state, "Error", e))?;
    state.navigate(Event::Open(Screen::BookingDetail { id: id.to_string() }))?;
    Ok(BookingSummary::from(&booking))
}

/// Driver fields for one booking. Kept intact across failed submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverForm {
    booking_id: String,
    pub name: String,
    contact: String,
    pub cab_number: String,
    pub car_model: CarModel,
}

impl DriverForm {
    pub fn new(booking_id: impl Into<String>) -> Self {
        Self {
            booking_id: booking_id.into(),
            name: String::new(),
            contact: String::new(),
            cab_number: String::new(),
            car_model: CarModel::default(),
        }
    }

    pub fn booking_id(&self) -> &str {
        &self.booking_id
    }

    pub fn contact(&self) -> &str {
        &self.contact
    }

    /// Store typed contact input, keeping digits only (at most ten).
    /// Returns true when something was dropped.
    pub fn set_contact(&mut self, input: &str) -> bool {
        let sanitized = keep_digits(input, Some(CONTACT_DIGITS));
        self.contact = sanitized.value;
        sanitized.rejected
    }

    pub fn set_car_model(&mut self, input: &str) -> Result<(), ClientError> {
        self.car_model = input.parse()?;
        Ok(())
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Err(e) = validate_person_name(&self.name) {
            errors.add("name", e);
        }
        if self.contact.is_empty() {
            errors.add("contact", "Contact number is required");
        } else if self.contact.len() != CONTACT_DIGITS {
            errors.add("contact", "Contact number must be exactly 10 digits");
        }
        if self.cab_number.trim().is_empty() {
            errors.add("cab_number", "Cab number is required");
        }
        errors
    }

    /// Whether "Allocate Driver" is enabled.
    pub fn can_submit(&self) -> bool {
        self.validate().is_empty()
    }

    pub fn to_assignment(&self) -> DriverAssignment {
        DriverAssignment {
            name: self.name.trim().to_string(),
            contact_number: self.contact.clone(),
            cab_number: self.cab_number.trim().to_string(),
            car_model: self.car_model,
        }
    }
}

/// Show the allocation screen for `id` with an empty form.
pub fn open_allocation(state: &AppState, id: &str) -> Result<DriverForm, ClientError> {
    require_admin(state)?;
    state
        .navigate(Event::Open(Screen::DriverAllocation { id: id.to_string() }))
        .or_else(|e| reject(state, "Error", e))?;
    Ok(DriverForm::new(id))
}

/// Typed contact input; a dropped character raises a notice.
pub fn enter_contact(state: &AppState, form: &mut DriverForm, input: &str) {
    if form.set_contact(input) {
        state.notify(Notice::error(
            "Invalid Input",
            "Please enter only numeric values for contact number.",
        ));
    }
}

pub async fn assign_driver(state: &AppState, form: &DriverForm) -> Result<(), ClientError> {
    let token = require_admin(state)?;
    form.validate()
        .finish()
        .or_else(|e| reject(state, "Incomplete Form", e))?;

    let id = form.booking_id().to_string();
    let driver = form.to_assignment();
    submit(state, ActionKey::Booking(id.clone()), "Error", || {
        state.gateway.assign_driver(&token, &id, &driver)
    })
    .await?;

    state.navigate(Event::DriverAssigned {
        booking_id: id.clone(),
    })?;
    info!(booking_id = %id, car_model = %driver.car_model, "Driver allocated");
    state.notify(Notice::success("Success", "Driver allocated successfully"));
    Ok(())
}

/// Never in flight together with an assignment for the same booking.
pub async fn cancel_booking(state: &AppState, id: &str) -> Result<(), ClientError> {
    let token = require_admin(state)?;
    submit(state, ActionKey::Booking(id.to_string()), "Error", || {
        state.gateway.delete_booking(&token, id)
    })
    .await?;

    state.navigate(Event::BookingCancelled {
        booking_id: id.to_string(),
    })?;
    info!(booking_id = %id, "Booking cancelled");
    state.notify(Notice::success("Success", "Booking cancelled"));
    Ok(())
}
