//! Client side of the calendar: viewport ranges, the local booking cache,
//! request dispatch and the HTTP/SSE source that feeds them.

pub mod cache;
pub mod client;
pub mod dispatch;
pub mod range;
pub mod source;
pub mod sse;

pub use cache::RangeCache;
pub use client::CalendarClient;
pub use dispatch::Dispatcher;
pub use range::{CalendarView, TimeRange};
pub use source::{BookingSource, HttpBookingSource};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request superseded")]
    Cancelled,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("undecodable payload: {0}")]
    Decode(String),
}
