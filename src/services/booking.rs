use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::lenient::opt_string;
use crate::models::{
    end_time_for, Booking, BookingDetails, BookingStatus, Client, MAX_DURATION_MINUTES,
};

#[derive(Debug, Default, Deserialize)]
pub struct NewBooking {
    #[serde(default, alias = "client_name", deserialize_with = "opt_string")]
    pub name: Option<String>,
    #[serde(default, alias = "client_surname", deserialize_with = "opt_string")]
    pub surname: Option<String>,
    #[serde(default, alias = "client_phone", deserialize_with = "opt_string")]
    pub phone: Option<String>,
    #[serde(default, alias = "client_email", deserialize_with = "opt_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub service_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Fields an edit may touch. Anything else in the body is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct BookingUpdate {
    #[serde(default, deserialize_with = "opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub service_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub status: Option<String>,
}

pub fn create_booking(
    conn: &Connection,
    req: &NewBooking,
    default_duration_minutes: i64,
) -> Result<BookingDetails, AppError> {
    let start_raw = req
        .start_time
        .as_deref()
        .ok_or_else(|| AppError::validation("Missing start_time"))?;
    let service_name = req
        .service_name
        .as_deref()
        .ok_or_else(|| AppError::validation("Missing service_name"))?;

    let start = parse_time(start_raw, "Invalid start_time")?;
    let explicit_minutes = parse_duration(req.duration.as_deref())?;

    let tx = conn.unchecked_transaction()?;

    let service = queries::find_service_by_name(&tx, service_name)?
        .ok_or_else(|| AppError::validation("Service not found"))?;

    let end = match req.end_time.as_deref() {
        Some(raw) => parse_time(raw, "Invalid end_time")?,
        None => {
            let minutes = explicit_minutes
                .or(service.duration_minutes.filter(|m| *m > 0))
                .unwrap_or(default_duration_minutes);
            end_time_for(start, minutes).ok_or_else(|| AppError::validation("Invalid duration"))?
        }
    };
    if end <= start {
        return Err(AppError::validation("end_time must be after start_time"));
    }

    let client = find_or_create_client(&tx, req)?;

    let now = Utc::now();
    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        client_id: Some(client.id.clone()),
        service_id: service.id.clone(),
        start_time: start,
        end_time: end,
        notes: req.notes.clone().filter(|n| !n.trim().is_empty()),
        status: BookingStatus::Confirmed,
        created_at: now,
        updated_at: now,
    };

    queries::create_booking(&tx, &booking).map_err(duplicate_as_validation)?;
    let details = queries::get_booking_details(&tx, &booking.id)?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("booking vanished after insert")))?;
    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        client_id = %client.id,
        service = %service.name,
        start = %start,
        "booking created"
    );

    Ok(details)
}

/// Email first, then phone; otherwise a new client from the supplied name.
fn find_or_create_client(conn: &Connection, req: &NewBooking) -> Result<Client, AppError> {
    if let Some(email) = req.email.as_deref() {
        if let Some(client) = queries::find_client_by_email(conn, email)? {
            return Ok(client);
        }
    }
    if let Some(phone) = req.phone.as_deref() {
        if let Some(client) = queries::find_client_by_phone(conn, phone)? {
            return Ok(client);
        }
    }

    let now = Utc::now();
    let (name, surname) = match (req.name.clone(), req.surname.clone()) {
        (Some(name), surname) => (name, surname),
        (None, Some(surname)) => (surname, None),
        (None, None) => ("Unknown".to_string(), None),
    };
    let client = Client {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        surname,
        email: req.email.clone(),
        phone: req.phone.clone(),
        notes: None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };
    queries::create_client(conn, &client)?;
    tracing::info!(client_id = %client.id, name = %client.full_name(), "client created");
    Ok(client)
}

pub fn update_booking(
    conn: &Connection,
    id: &str,
    req: &BookingUpdate,
) -> Result<BookingDetails, AppError> {
    let tx = conn.unchecked_transaction()?;

    let mut booking = queries::get_booking(&tx, id)?
        .ok_or_else(|| AppError::not_found("Booking not found"))?;

    let start = match req.start_time.as_deref() {
        Some(raw) => parse_time(raw, "Invalid start_time")?,
        None => booking.start_time,
    };
    let end = match (req.end_time.as_deref(), parse_duration(req.duration.as_deref())?) {
        (Some(raw), _) => parse_time(raw, "Invalid end_time")?,
        (None, Some(minutes)) => {
            end_time_for(start, minutes).ok_or_else(|| AppError::validation("Invalid duration"))?
        }
        // Moving the start keeps the booking's length.
        (None, None) => start
            .checked_add_signed(booking.end_time - booking.start_time)
            .ok_or_else(|| AppError::validation("Invalid start_time"))?,
    };
    if end <= start {
        return Err(AppError::validation("end_time must be after start_time"));
    }

    if let Some(name) = req.service_name.as_deref() {
        let service = queries::find_service_by_name(&tx, name)?
            .ok_or_else(|| AppError::validation("Service not found"))?;
        booking.service_id = service.id;
    }
    if let Some(status) = req.status.as_deref() {
        booking.status = BookingStatus::parse(status)
            .ok_or_else(|| AppError::validation(format!("Invalid status: {status}")))?;
    }
    if let Some(notes) = &req.notes {
        booking.notes = Some(notes.clone()).filter(|n| !n.trim().is_empty());
    }

    booking.start_time = start;
    booking.end_time = end;
    booking.updated_at = Utc::now();

    queries::update_booking(&tx, &booking).map_err(duplicate_as_validation)?;
    let details = queries::get_booking_details(&tx, id)?
        .ok_or_else(|| AppError::not_found("Booking not found"))?;
    tx.commit()?;

    tracing::info!(booking_id = %id, status = booking.status.as_str(), "booking updated");
    Ok(details)
}

/// Hard delete. Returns the row as it was.
pub fn delete_booking(conn: &Connection, id: &str) -> Result<BookingDetails, AppError> {
    let tx = conn.unchecked_transaction()?;

    let details = queries::get_booking_details(&tx, id)?
        .ok_or_else(|| AppError::not_found("Booking not found"))?;
    queries::delete_booking(&tx, id)?;
    tx.commit()?;

    tracing::info!(booking_id = %id, "booking deleted");
    Ok(details)
}

fn parse_time(raw: &str, message: &str) -> Result<DateTime<Utc>, AppError> {
    queries::parse_ts(raw).map_err(|_| AppError::validation(message))
}

fn parse_duration(raw: Option<&str>) -> Result<Option<i64>, AppError> {
    match raw {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(minutes) if (1..=MAX_DURATION_MINUTES).contains(&minutes) => Ok(Some(minutes)),
            _ => Err(AppError::validation(format!("Invalid duration: {raw}"))),
        },
    }
}

fn duplicate_as_validation(err: anyhow::Error) -> AppError {
    let is_unique_violation = matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    );

    if is_unique_violation {
        AppError::validation("A booking for this client and service already starts at that time")
    } else {
        AppError::Internal(err)
    }
}
