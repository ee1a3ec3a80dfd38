use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: String,
    pub client_id: Option<String>,
    pub service_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Pending,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Pending => "pending",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "pending" => Some(BookingStatus::Pending),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }
}

/// A booking joined with the client and service fields a calendar renders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingDetails {
    pub id: String,
    pub client_id: Option<String>,
    pub service_id: String,
    pub client_name: String,
    pub client_surname: Option<String>,
    pub client_phone: String,
    pub client_email: String,
    pub service_name: String,
    pub short_service_name: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub notes: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Longest length a booking may be given as a duration: one day.
pub const MAX_DURATION_MINUTES: i64 = 24 * 60;

/// End of a booking that starts at `start` and lasts `duration_minutes`.
/// `None` for a duration outside `1..=MAX_DURATION_MINUTES`.
pub fn end_time_for(start: DateTime<Utc>, duration_minutes: i64) -> Option<DateTime<Utc>> {
    if !(1..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
        return None;
    }
    TimeDelta::try_minutes(duration_minutes).and_then(|d| start.checked_add_signed(d))
}
