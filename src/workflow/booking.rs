//! Rider booking flow: pick route and date, confirm, submit.

use chrono::NaiveDate;
use tracing::{debug, info};

use super::{reject, submit, token_for};
use crate::draft::{self, Catalog, DepartureTime, Location, PassengerCount};
use crate::error::ClientError;
use crate::gateway::{Booking, CreateBookingRequest};
use crate::inflight::ActionKey;
use crate::notify::Notice;
use crate::router::{Event, Screen};
use crate::session::Role;
use crate::AppState;

const TITLE: &str = "Booking Error";

pub const CONFIRM_FIRST_MESSAGE: &str = "Please review your booking before confirming";

fn require_rider(state: &AppState) -> Result<String, ClientError> {
    token_for(state, Role::User, TITLE)
}

/// Open the booking screen. A draft left from an earlier visit is kept.
pub fn start_booking(state: &AppState) -> Result<Screen, ClientError> {
    require_rider(state)?;
    state
        .navigate(Event::Open(Screen::BookRide))
        .or_else(|e| reject(state, TITLE, e))
}

fn select(state: &AppState, catalog: Catalog, query: &str) -> Result<Location, ClientError> {
    require_rider(state)?;
    let location = catalog.select(query).or_else(|e| reject(state, TITLE, e))?;
    state.session.update_draft(|d| {
        let slot = match catalog {
            Catalog::Source => &mut d.source,
            Catalog::Destination => &mut d.destination,
            Catalog::PickupPoint => &mut d.pickup_point,
        };
        *slot = Some(location.clone());
    });
    debug!(catalog = catalog.name(), value = %location.value, "Draft location selected");
    Ok(location)
}

pub fn select_source(state: &AppState, query: &str) -> Result<Location, ClientError> {
    select(state, Catalog::Source, query)
}

pub fn select_destination(state: &AppState, query: &str) -> Result<Location, ClientError> {
    select(state, Catalog::Destination, query)
}

pub fn select_pickup(state: &AppState, query: &str) -> Result<Location, ClientError> {
    select(state, Catalog::PickupPoint, query)
}

/// Past dates are refused and the draft keeps its previous date.
pub fn select_date(state: &AppState, date: NaiveDate) -> Result<(), ClientError> {
    require_rider(state)?;
    let today = draft::today();
    state
        .session
        .update_draft(|d| d.set_date(date, today))
        .or_else(|e| reject(state, TITLE, e))
}

/// Move to the confirm step once source, destination, pickup and date are set.
pub fn proceed_to_confirm(state: &AppState) -> Result<Screen, ClientError> {
    require_rider(state)?;
    state
        .session
        .draft()
        .check(draft::today())
        .or_else(|e| reject(state, TITLE, e))?;
    state.navigate(Event::DraftReady)
}

/// Accepts `hh:mm AM/PM` or `HH:MM`; the stored time is rounded to 15 minutes.
pub fn set_departure_time(state: &AppState, input: &str) -> Result<DepartureTime, ClientError> {
    require_rider(state)?;
    let time: DepartureTime = input.parse().or_else(|e| reject(state, TITLE, e))?;
    state.session.update_draft(|d| d.departure_time = time);
    Ok(time)
}

/// Step the passenger count up or down, staying within 1..=8.
pub fn adjust_passengers(state: &AppState, delta: i32) -> Result<u8, ClientError> {
    require_rider(state)?;
    let count = state.session.update_draft(|d| {
        let mut count = d.passengers;
        for _ in 0..delta.unsigned_abs() {
            count = if delta > 0 {
                count.increment()
            } else {
                count.decrement()
            };
        }
        d.passengers = count;
        count
    });
    Ok(count.get())
}

pub fn set_passengers(state: &AppState, count: u8) -> Result<u8, ClientError> {
    require_rider(state)?;
    let count = PassengerCount::new(count).or_else(|e| reject(state, TITLE, e))?;
    state.session.update_draft(|d| d.passengers = count);
    Ok(count.get())
}

/// Send the draft from the confirm screen. On success the draft is cleared and
/// the completion screen shown; on failure the draft stays as it was for a retry.
pub async fn submit_booking(state: &AppState) -> Result<CreateBookingRequest, ClientError> {
    let token = require_rider(state)?;
    if state.screen() != Screen::ConfirmBooking {
        return reject(state, TITLE, ClientError::validation(CONFIRM_FIRST_MESSAGE));
    }
    let req = state
        .session
        .draft()
        .to_request(draft::today())
        .or_else(|e| reject(state, TITLE, e))?;

    submit(state, ActionKey::SubmitBooking, TITLE, || {
        state.gateway.create_booking(&token, &req)
    })
    .await?;

    state.session.clear_draft();
    state.navigate(Event::BookingSubmitted)?;
    info!(
        source = %req.source_location,
        destination = %req.destination_location,
        date = %req.start_date,
        seats = req.seats,
        "Booking created"
    );
    state.notify(Notice::success("Booking", "Booking created successfully"));
    Ok(req)
}

/// The signed-in rider's own bookings.
pub async fn my_trips(state: &AppState) -> Result<Vec<Booking>, ClientError> {
    let token = require_rider(state)?;
    let trips = state
        .gateway
        .user_bookings(&token)
        .await
        .or_else(|e| reject(state, "Error", e))?;
    if state.navigate(Event::Open(Screen::Trips)).is_err() {
        debug!("Trips screen not reachable from here");
    }
    Ok(trips)
}
