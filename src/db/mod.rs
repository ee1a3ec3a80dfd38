pub mod migrations;
pub mod queries;

use anyhow::Context;
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// Open the studio database, switch it to WAL with foreign keys enforced, and
/// bring the schema up to date. `":memory:"` gives a throwaway database.
pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("failed to open database {path}"))?;

    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA foreign_keys=ON;
         PRAGMA busy_timeout=5000;",
    )
    .context("failed to set database pragmas")?;

    register_functions(&conn)?;
    migrations::run_migrations(&conn)?;
    tracing::debug!(path, "database initialised");

    Ok(conn)
}

/// SQL helpers the queries rely on. SQLite's own `lower()` and `LIKE` only
/// fold ASCII, so client search goes through `lower_unicode(col)`.
fn register_functions(conn: &Connection) -> anyhow::Result<()> {
    conn.create_scalar_function(
        "lower_unicode",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|v| v.to_lowercase()))
        },
    )
    .context("failed to register lower_unicode")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_keys_enforced() {
        let conn = init_db(":memory:").unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);

        let orphan = conn.execute(
            "INSERT INTO bookings (id, client_id, service_id, start_time, end_time, status, created_at, updated_at)
             VALUES ('b1', 'nobody', 'svc-relaxzy', '2024-01-01T10:00:00.000Z', '2024-01-01T11:00:00.000Z',
                     'confirmed', '2024-01-01T00:00:00.000Z', '2024-01-01T00:00:00.000Z')",
            [],
        );
        assert!(orphan.is_err());
    }

    #[test]
    fn test_lower_unicode_folds_non_ascii() {
        let conn = init_db(":memory:").unwrap();
        let (lowered, null): (String, Option<String>) = conn
            .query_row("SELECT lower_unicode('ÁLVARO Núñez'), lower_unicode(NULL)", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(lowered, "álvaro núñez");
        assert_eq!(null, None);
    }
}
