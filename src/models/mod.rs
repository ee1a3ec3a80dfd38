pub mod booking;
pub mod client;
pub mod event;
pub mod lenient;
pub mod payment;
pub mod service;

pub use booking::{end_time_for, Booking, BookingDetails, BookingStatus, MAX_DURATION_MINUTES};
pub use client::{Client, ClientQuery};
pub use event::{ChangeEvent, ChangeKind};
pub use payment::{Payment, PaymentMethod};
pub use service::{DurationPrice, Service};
