use std::collections::HashMap;

use crate::models::{BookingDetails, ChangeEvent, ChangeKind};

use super::range::TimeRange;

/// Bookings a calendar has already fetched, and the windows they came from.
///
/// `ranges` is kept sorted by start with no two entries touching, so a window
/// is cached iff a single entry covers it.
#[derive(Debug, Default, Clone)]
pub struct RangeCache {
    ranges: Vec<TimeRange>,
    bookings: HashMap<String, BookingDetails>,
}

impl RangeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ranges(&self) -> &[TimeRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&BookingDetails> {
        self.bookings.get(id)
    }

    pub fn covers(&self, range: &TimeRange) -> bool {
        self.ranges.iter().any(|r| r.covers(range))
    }

    /// Remember a fetched window and upsert what it returned.
    pub fn record(&mut self, range: TimeRange, bookings: Vec<BookingDetails>) {
        self.merge_range(range);
        for booking in bookings {
            self.bookings.insert(booking.id.clone(), booking);
        }
    }

    fn merge_range(&mut self, range: TimeRange) {
        let mut merged = range;
        let mut kept = Vec::with_capacity(self.ranges.len() + 1);
        for r in self.ranges.drain(..) {
            if r.touches(&merged) {
                merged = TimeRange::new(merged.start.min(r.start), merged.end.max(r.end));
            } else {
                kept.push(r);
            }
        }
        let pos = kept.partition_point(|r| r.start < merged.start);
        kept.insert(pos, merged);
        self.ranges = kept;
    }

    /// Cached bookings starting inside `range`, earliest first.
    pub fn visible(&self, range: &TimeRange) -> Vec<BookingDetails> {
        let mut out: Vec<BookingDetails> = self
            .bookings
            .values()
            .filter(|b| range.contains(b.start_time))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
        out
    }

    /// Fold one realtime change into the map, in arrival order.
    ///
    /// Inserts upsert by id. Updates for ids not held here are dropped.
    /// Deletes remove exactly the matching id.
    pub fn apply(&mut self, event: ChangeEvent) {
        let id = event.data.id.clone();
        match event.kind {
            ChangeKind::Insert => {
                self.bookings.insert(id, event.data);
            }
            ChangeKind::Update => match self.bookings.get_mut(&id) {
                Some(slot) => *slot = event.data,
                None => tracing::debug!(booking_id = %id, "update for uncached booking ignored"),
            },
            ChangeKind::Delete => {
                self.bookings.remove(&id);
            }
        }
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
        self.bookings.clear();
    }
}
