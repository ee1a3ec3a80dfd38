use std::env;

use chrono_tz::Tz;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub api_token: String,
    pub timezone: Tz,
    pub agenda_length_days: u32,
    pub default_duration_minutes: i64,
    pub clients_fetch_limit: i64,
    pub similar_clients_limit: i64,
    pub change_feed_capacity: usize,
    pub cors_allow_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: parsed("PORT", 3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "studiobook.db".to_string()),
            api_token: env::var("API_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            timezone: timezone_from_env(),
            agenda_length_days: parsed("AGENDA_LENGTH_DAYS", 30),
            default_duration_minutes: parsed("DEFAULT_DURATION_MINUTES", 60),
            clients_fetch_limit: parsed("CLIENTS_FETCH_LIMIT", 50),
            similar_clients_limit: parsed("SIMILAR_CLIENTS_LIMIT", 5),
            change_feed_capacity: parsed("CHANGE_FEED_CAPACITY", 256),
            cors_allow_origin: env::var("CORS_ALLOW_ORIGIN").ok().filter(|v| !v.is_empty()),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: ":memory:".to_string(),
            api_token: "changeme".to_string(),
            timezone: chrono_tz::Europe::Madrid,
            agenda_length_days: 30,
            default_duration_minutes: 60,
            clients_fetch_limit: 50,
            similar_clients_limit: 5,
            change_feed_capacity: 256,
            cors_allow_origin: None,
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn timezone_from_env() -> Tz {
    match env::var("CALENDAR_TIMEZONE") {
        Ok(name) => name.parse().unwrap_or_else(|_| {
            tracing::warn!(timezone = %name, "unknown CALENDAR_TIMEZONE, falling back to UTC");
            chrono_tz::UTC
        }),
        Err(_) => chrono_tz::Europe::Madrid,
    }
}
