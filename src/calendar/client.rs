use std::sync::Mutex;
use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::models::{BookingDetails, ChangeEvent, Client, ClientQuery};

use super::cache::RangeCache;
use super::dispatch::Dispatcher;
use super::range::{self, CalendarView, TimeRange};
use super::source::BookingSource;
use super::ClientError;

/// Debounce for similar-client lookups fired while the user types.
pub const SIMILAR_CLIENTS_DELAY: Duration = Duration::from_millis(500);

/// A calendar view model: resolves viewports, serves them from the cache when
/// it can, and keeps the cache current from the change feed.
pub struct CalendarClient<S> {
    source: S,
    cache: Mutex<RangeCache>,
    fetches: Dispatcher,
    searches: Dispatcher,
    tz: Tz,
    agenda_days: u32,
}

impl<S: BookingSource> CalendarClient<S> {
    pub fn new(source: S, tz: Tz, agenda_days: u32) -> Self {
        Self {
            source,
            cache: Mutex::new(RangeCache::new()),
            fetches: Dispatcher::new(),
            searches: Dispatcher::with_delay(SIMILAR_CLIENTS_DELAY),
            tz,
            agenda_days,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn show(
        &self,
        anchor: NaiveDate,
        view: CalendarView,
    ) -> Result<Vec<BookingDetails>, ClientError> {
        let range = range::resolve(anchor, view, self.tz, self.agenda_days);
        self.load_range(range).await
    }

    /// Bookings starting in `range`. Only windows the cache does not already
    /// cover reach the source; a newer load cancels an older one still in flight.
    pub async fn load_range(&self, range: TimeRange) -> Result<Vec<BookingDetails>, ClientError> {
        if let Some(hit) = self.with_cache(|c| c.covers(&range).then(|| c.visible(&range))) {
            tracing::debug!(%range, "served from cache");
            return Ok(hit);
        }

        let fetched = self.fetches.run(self.source.fetch_range(&range)).await?;
        tracing::debug!(%range, count = fetched.len(), "fetched bookings");

        Ok(self.with_cache(|c| {
            c.record(range, fetched);
            c.visible(&range)
        }))
    }

    /// Debounced similarity lookup. A blank query cancels any pending lookup.
    pub async fn find_similar(&self, query: &ClientQuery) -> Result<Vec<Client>, ClientError> {
        if query.is_empty() {
            self.searches.cancel();
            return Ok(vec![]);
        }
        self.searches
            .run(self.source.find_similar_clients(query))
            .await
    }

    pub fn apply_event(&self, event: ChangeEvent) {
        self.with_cache(|c| c.apply(event));
    }

    /// Drop all cached windows and rows, e.g. after the change feed reconnects.
    pub fn invalidate(&self) {
        self.fetches.cancel();
        self.with_cache(RangeCache::clear);
    }

    pub fn cached(&self, range: &TimeRange) -> Vec<BookingDetails> {
        self.with_cache(|c| c.visible(range))
    }

    /// Fold change events into the cache until the stream ends or `cancel` fires.
    pub async fn follow<St>(&self, mut events: St, cancel: CancellationToken) -> Result<(), ClientError>
    where
        St: Stream<Item = Result<ChangeEvent, ClientError>> + Unpin,
    {
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                next = events.next() => next,
            };
            match next {
                Some(Ok(event)) => self.apply_event(event),
                Some(Err(e)) => return Err(e),
                None => return Ok(()),
            }
        }
    }

    fn with_cache<T>(&self, f: impl FnOnce(&mut RangeCache) -> T) -> T {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::models::BookingStatus;

    struct FakeSource {
        bookings: Vec<BookingDetails>,
        fetches: AtomicUsize,
        searches: AtomicUsize,
        latency: Duration,
    }

    impl FakeSource {
        fn new(bookings: Vec<BookingDetails>) -> Self {
            Self {
                bookings,
                fetches: AtomicUsize::new(0),
                searches: AtomicUsize::new(0),
                latency: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl BookingSource for FakeSource {
        async fn fetch_range(&self, range: &TimeRange) -> Result<Vec<BookingDetails>, ClientError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            Ok(self
                .bookings
                .iter()
                .filter(|b| range.contains(b.start_time))
                .cloned()
                .collect())
        }

        async fn find_similar_clients(&self, _query: &ClientQuery) -> Result<Vec<Client>, ClientError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }
    }

    fn t(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn booking(id: &str, start: &str) -> BookingDetails {
        let start = t(start);
        BookingDetails {
            id: id.to_string(),
            client_id: None,
            service_id: "svc-thai-oil".to_string(),
            client_name: "Unknown".to_string(),
            client_surname: None,
            client_phone: "Unknown".to_string(),
            client_email: "Unknown".to_string(),
            service_name: "Thai Oil".to_string(),
            short_service_name: Some("Oil".to_string()),
            start_time: start,
            end_time: start + chrono::Duration::minutes(60),
            notes: String::new(),
            status: BookingStatus::Confirmed,
            created_at: start,
            updated_at: start,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_covered_window_makes_no_source_calls() {
        let source = FakeSource::new(vec![
            booking("b1", "2024-05-06T09:00:00Z"),
            booking("b2", "2024-05-08T09:00:00Z"),
            booking("b3", "2024-05-20T09:00:00Z"),
        ]);
        let client = CalendarClient::new(source, chrono_tz::UTC, 30);

        let week = client.show(date("2024-05-08"), CalendarView::Week).await.unwrap();
        assert_eq!(week.len(), 2);
        assert_eq!(client.source().fetches.load(Ordering::SeqCst), 1);

        // Same week again, then a day inside it.
        client.show(date("2024-05-08"), CalendarView::Week).await.unwrap();
        let day = client.show(date("2024-05-06"), CalendarView::Day).await.unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(client.source().fetches.load(Ordering::SeqCst), 1);

        // The month is wider than anything cached.
        let month = client.show(date("2024-05-08"), CalendarView::Month).await.unwrap();
        assert_eq!(month.len(), 3);
        assert_eq!(client.source().fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_superseded_load_is_cancelled_and_not_cached() {
        let mut source = FakeSource::new(vec![booking("b1", "2024-05-06T09:00:00Z")]);
        source.latency = Duration::from_millis(200);
        let client = Arc::new(CalendarClient::new(source, chrono_tz::UTC, 30));

        let first = {
            let client = client.clone();
            tokio::spawn(async move { client.show(date("2024-05-06"), CalendarView::Week).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = client.show(date("2024-06-03"), CalendarView::Week).await.unwrap();
        assert!(second.is_empty());
        assert!(matches!(first.await.unwrap(), Err(ClientError::Cancelled)));

        let may = range::resolve(date("2024-05-06"), CalendarView::Week, chrono_tz::UTC, 30);
        assert!(client.cached(&may).is_empty());
    }

    #[tokio::test]
    async fn test_follow_applies_events_in_order() {
        let client = CalendarClient::new(FakeSource::new(vec![]), chrono_tz::UTC, 30);
        let day = client.show(date("2024-05-06"), CalendarView::Day).await.unwrap();
        assert!(day.is_empty());

        let mut moved = booking("b1", "2024-05-06T15:00:00Z");
        moved.notes = "moved".to_string();
        let events = tokio_stream::iter(vec![
            Ok(ChangeEvent::insert(booking("b1", "2024-05-06T09:00:00Z"))),
            Ok(ChangeEvent::insert(booking("b2", "2024-05-06T10:00:00Z"))),
            Ok(ChangeEvent::update(moved)),
            Ok(ChangeEvent::delete(booking("b2", "2024-05-06T10:00:00Z"))),
        ]);
        client.follow(events, CancellationToken::new()).await.unwrap();

        let day = client.show(date("2024-05-06"), CalendarView::Day).await.unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].notes, "moved");
        assert_eq!(client.source().fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_follow_stops_on_stream_error() {
        let client = CalendarClient::new(FakeSource::new(vec![]), chrono_tz::UTC, 30);
        let events = tokio_stream::iter(vec![
            Err(ClientError::Decode("bad frame".to_string())),
            Ok(ChangeEvent::insert(booking("b1", "2024-05-06T09:00:00Z"))),
        ]);
        let result = client.follow(events, CancellationToken::new()).await;
        assert!(matches!(result, Err(ClientError::Decode(_))));
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let client = CalendarClient::new(FakeSource::new(vec![]), chrono_tz::UTC, 30);
        client.show(date("2024-05-06"), CalendarView::Day).await.unwrap();
        client.invalidate();
        client.show(date("2024-05-06"), CalendarView::Day).await.unwrap();
        assert_eq!(client.source().fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_blank_similarity_query_skips_source() {
        let client = CalendarClient::new(FakeSource::new(vec![]), chrono_tz::UTC, 30);
        let found = client.find_similar(&ClientQuery::default()).await.unwrap();
        assert!(found.is_empty());
        assert_eq!(client.source().searches.load(Ordering::SeqCst), 0);
    }
}
