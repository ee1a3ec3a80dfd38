use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub short_name: Option<String>,
    pub duration_minutes: Option<i64>,
    pub price: Option<f64>,
    pub standard_duration_prices: Vec<DurationPrice>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A standard (duration, price) pair a service is sold at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DurationPrice {
    pub duration: f64,
    pub price: f64,
}

impl Service {
    pub fn sells(&self, duration: f64, price: f64) -> bool {
        self.standard_duration_prices
            .iter()
            .any(|p| p.duration == duration && p.price == price)
    }
}
