use serde::{Deserialize, Serialize};

use super::BookingDetails;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row-level change on the bookings table, as pushed to calendar clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub data: BookingDetails,
}

impl ChangeEvent {
    pub fn insert(data: BookingDetails) -> Self {
        Self { kind: ChangeKind::Insert, data }
    }

    pub fn update(data: BookingDetails) -> Self {
        Self { kind: ChangeKind::Update, data }
    }

    pub fn delete(data: BookingDetails) -> Self {
        Self { kind: ChangeKind::Delete, data }
    }
}
