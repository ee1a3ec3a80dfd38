use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::realtime::ChangeFeed;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub changes: ChangeFeed,
}

impl AppState {
    pub fn new(conn: Connection, config: AppConfig) -> Self {
        let changes = ChangeFeed::new(config.change_feed_capacity);
        Self {
            db: Arc::new(Mutex::new(conn)),
            config,
            changes,
        }
    }

    /// Lock the connection. Never hold the guard across an `.await`.
    ///
    /// A handler that panicked while holding the lock leaves its transaction
    /// rolled back, so a poisoned lock is taken over rather than failing
    /// every later request.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("database mutex was poisoned, recovering");
            self.db.clear_poison();
            poisoned.into_inner()
        })
    }
}
