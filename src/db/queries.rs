use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::models::{
    Booking, BookingDetails, BookingStatus, Client, ClientQuery, DurationPrice, Payment,
    PaymentMethod, Service,
};

/// Fixed-width UTC format, so string order is time order.
const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub fn parse_ts(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let dt = DateTime::parse_from_rfc3339(s).with_context(|| format!("bad timestamp: {s}"))?;
    Ok(dt.with_timezone(&Utc))
}

fn parse_opt_ts(s: Option<String>) -> anyhow::Result<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_ts).transpose()
}

/// Lowercased `%needle%` for matching against `lower_unicode(column)`, with
/// wildcards in the needle escaped by `\`.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

// ── Bookings ──

const BOOKING_COLUMNS: &str =
    "id, client_id, service_id, start_time, end_time, notes, status, created_at, updated_at";

const DETAILS_SELECT: &str = "SELECT b.id, b.client_id, b.service_id, c.name, c.surname, c.phone, c.email, s.name, s.short_name,
        b.start_time, b.end_time, b.notes, b.status, b.created_at, b.updated_at
 FROM bookings b
 LEFT JOIN clients c ON c.id = b.client_id
 LEFT JOIN services s ON s.id = b.service_id";

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, client_id, service_id, start_time, end_time, notes, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            booking.id,
            booking.client_id,
            booking.service_id,
            fmt_ts(&booking.start_time),
            fmt_ts(&booking.end_time),
            booking.notes,
            booking.status.as_str(),
            fmt_ts(&booking.created_at),
            fmt_ts(&booking.updated_at),
        ],
    )?;
    Ok(())
}

/// Insert, or refresh the row with the same (client, service, start). Returns the stored id.
pub fn upsert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<String> {
    let id: String = conn.query_row(
        "INSERT INTO bookings (id, client_id, service_id, start_time, end_time, notes, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(client_id, service_id, start_time) DO UPDATE SET
           end_time = excluded.end_time,
           notes = excluded.notes,
           status = excluded.status,
           updated_at = excluded.updated_at
         RETURNING id",
        params![
            booking.id,
            booking.client_id,
            booking.service_id,
            fmt_ts(&booking.start_time),
            fmt_ts(&booking.end_time),
            booking.notes,
            booking.status.as_str(),
            fmt_ts(&booking.created_at),
            fmt_ts(&booking.updated_at),
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn update_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET service_id = ?1, start_time = ?2, end_time = ?3, notes = ?4, status = ?5, updated_at = ?6
         WHERE id = ?7",
        params![
            booking.service_id,
            fmt_ts(&booking.start_time),
            fmt_ts(&booking.end_time),
            booking.notes,
            booking.status.as_str(),
            fmt_ts(&booking.updated_at),
            booking.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn get_booking_details(conn: &Connection, id: &str) -> anyhow::Result<Option<BookingDetails>> {
    let result = conn
        .query_row(
            &format!("{DETAILS_SELECT} WHERE b.id = ?1"),
            params![id],
            |row| Ok(parse_details_row(row)),
        )
        .optional()?;

    result.transpose()
}

/// Bookings whose start lies in `[start, end]`, earliest first.
pub fn get_bookings_in_range(
    conn: &Connection,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
) -> anyhow::Result<Vec<BookingDetails>> {
    let mut stmt = conn.prepare(&format!(
        "{DETAILS_SELECT} WHERE b.start_time >= ?1 AND b.start_time <= ?2 ORDER BY b.start_time ASC, b.id ASC"
    ))?;

    let rows = stmt.query_map(params![fmt_ts(start), fmt_ts(end)], |row| {
        Ok(parse_details_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_all_bookings(conn: &Connection) -> anyhow::Result<Vec<BookingDetails>> {
    let mut stmt = conn.prepare(&format!(
        "{DETAILS_SELECT} ORDER BY b.start_time ASC, b.id ASC"
    ))?;

    let rows = stmt.query_map([], |row| Ok(parse_details_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let start_time: String = row.get(3)?;
    let end_time: String = row.get(4)?;
    let status: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(Booking {
        id: row.get(0)?,
        client_id: row.get(1)?,
        service_id: row.get(2)?,
        start_time: parse_ts(&start_time)?,
        end_time: parse_ts(&end_time)?,
        notes: row.get(5)?,
        status: BookingStatus::parse(&status).unwrap_or(BookingStatus::Pending),
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn parse_details_row(row: &rusqlite::Row) -> anyhow::Result<BookingDetails> {
    let unknown = |v: Option<String>| v.unwrap_or_else(|| "Unknown".to_string());

    let start_time: String = row.get(9)?;
    let end_time: String = row.get(10)?;
    let status: String = row.get(12)?;
    let created_at: String = row.get(13)?;
    let updated_at: String = row.get(14)?;

    Ok(BookingDetails {
        id: row.get(0)?,
        client_id: row.get(1)?,
        service_id: row.get(2)?,
        client_name: unknown(row.get(3)?),
        client_surname: row.get(4)?,
        client_phone: unknown(row.get(5)?),
        client_email: unknown(row.get(6)?),
        service_name: unknown(row.get(7)?),
        short_service_name: row.get(8)?,
        start_time: parse_ts(&start_time)?,
        end_time: parse_ts(&end_time)?,
        notes: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
        status: BookingStatus::parse(&status).unwrap_or(BookingStatus::Pending),
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

// ── Clients ──

const CLIENT_COLUMNS: &str =
    "id, name, surname, email, phone, notes, created_at, updated_at, deleted_at";

pub fn create_client(conn: &Connection, client: &Client) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO clients (id, name, surname, email, phone, notes, created_at, updated_at, deleted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            client.id,
            client.name,
            client.surname,
            client.email,
            client.phone,
            client.notes,
            fmt_ts(&client.created_at),
            fmt_ts(&client.updated_at),
            client.deleted_at.as_ref().map(fmt_ts),
        ],
    )?;
    Ok(())
}

/// Looks up a client by id, soft-deleted ones included.
pub fn get_client(conn: &Connection, id: &str) -> anyhow::Result<Option<Client>> {
    query_one_client(
        conn,
        &format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1"),
        id,
    )
}

pub fn find_client_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<Client>> {
    query_one_client(
        conn,
        &format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE email = ?1 AND deleted_at IS NULL ORDER BY created_at LIMIT 1"
        ),
        email,
    )
}

pub fn find_client_by_phone(conn: &Connection, phone: &str) -> anyhow::Result<Option<Client>> {
    query_one_client(
        conn,
        &format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE phone = ?1 AND deleted_at IS NULL ORDER BY created_at LIMIT 1"
        ),
        phone,
    )
}

pub fn find_client_by_name(conn: &Connection, name: &str) -> anyhow::Result<Option<Client>> {
    query_one_client(
        conn,
        &format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE name = ?1 AND deleted_at IS NULL ORDER BY created_at LIMIT 1"
        ),
        name,
    )
}

fn query_one_client(conn: &Connection, sql: &str, arg: &str) -> anyhow::Result<Option<Client>> {
    let result = conn
        .query_row(sql, params![arg], |row| Ok(parse_client_row(row)))
        .optional()?;
    result.transpose()
}

pub fn update_client(conn: &Connection, client: &Client) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE clients SET name = ?1, surname = ?2, email = ?3, phone = ?4, notes = ?5, updated_at = ?6
         WHERE id = ?7",
        params![
            client.name,
            client.surname,
            client.email,
            client.phone,
            client.notes,
            fmt_ts(&client.updated_at),
            client.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn set_client_phone(conn: &Connection, id: &str, phone: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE clients SET phone = ?1, updated_at = ?2 WHERE id = ?3",
        params![phone, fmt_ts(&Utc::now()), id],
    )?;
    Ok(())
}

/// Marks a client deleted. Returns the updated row, or `None` for an unknown id.
pub fn soft_delete_client(conn: &Connection, id: &str) -> anyhow::Result<Option<Client>> {
    let now = fmt_ts(&Utc::now());
    let count = conn.execute(
        "UPDATE clients SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2",
        params![now, id],
    )?;
    if count == 0 {
        return Ok(None);
    }
    get_client(conn, id)
}

/// Case-insensitive substring search over name, surname, email and phone.
/// Folding covers non-ASCII letters through `lower_unicode`.
pub fn search_clients(
    conn: &Connection,
    term: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<Client>> {
    let term = term.map(str::trim).filter(|t| !t.is_empty());

    let mut clients = vec![];
    match term {
        Some(term) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CLIENT_COLUMNS} FROM clients
                 WHERE deleted_at IS NULL AND (
                   lower_unicode(name) LIKE ?1 ESCAPE '\\'
                   OR lower_unicode(surname) LIKE ?1 ESCAPE '\\'
                   OR lower_unicode(email) LIKE ?1 ESCAPE '\\'
                   OR lower_unicode(phone) LIKE ?1 ESCAPE '\\'
                 )
                 ORDER BY name ASC, id ASC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![like_pattern(term), limit], |row| {
                Ok(parse_client_row(row))
            })?;
            for row in rows {
                clients.push(row??);
            }
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CLIENT_COLUMNS} FROM clients WHERE deleted_at IS NULL
                 ORDER BY name ASC, id ASC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], |row| Ok(parse_client_row(row)))?;
            for row in rows {
                clients.push(row??);
            }
        }
    }
    Ok(clients)
}

/// Clients matching any of the supplied fields. An empty query matches nothing.
pub fn find_similar_clients(
    conn: &Connection,
    query: &ClientQuery,
    limit: i64,
) -> anyhow::Result<Vec<Client>> {
    let filters = query.filters();
    if filters.is_empty() {
        return Ok(vec![]);
    }

    let clause = filters
        .iter()
        .enumerate()
        .map(|(i, (col, _))| format!("lower_unicode({col}) LIKE ?{} ESCAPE '\\'", i + 1))
        .collect::<Vec<_>>()
        .join(" OR ");
    let sql = format!(
        "SELECT {CLIENT_COLUMNS} FROM clients WHERE deleted_at IS NULL AND ({clause})
         ORDER BY name ASC, id ASC LIMIT {limit}"
    );

    let mut stmt = conn.prepare(&sql)?;
    let patterns: Vec<String> = filters.iter().map(|(_, v)| like_pattern(v)).collect();
    let rows = stmt.query_map(params_from_iter(patterns.iter()), |row| {
        Ok(parse_client_row(row))
    })?;

    let mut clients = vec![];
    for row in rows {
        clients.push(row??);
    }
    Ok(clients)
}

fn parse_client_row(row: &rusqlite::Row) -> anyhow::Result<Client> {
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    Ok(Client {
        id: row.get(0)?,
        name: row.get(1)?,
        surname: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        notes: row.get(5)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
        deleted_at: parse_opt_ts(row.get(8)?)?,
    })
}

// ── Services ──

const SERVICE_COLUMNS: &str = "id, name, short_name, duration_minutes, price, standard_duration_prices, notes, created_at, deleted_at";

pub fn list_services(conn: &Connection) -> anyhow::Result<Vec<Service>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SERVICE_COLUMNS} FROM services WHERE deleted_at IS NULL ORDER BY name ASC"
    ))?;
    let rows = stmt.query_map([], |row| Ok(parse_service_row(row)))?;

    let mut services = vec![];
    for row in rows {
        services.push(row??);
    }
    Ok(services)
}

pub fn find_service_by_name(conn: &Connection, name: &str) -> anyhow::Result<Option<Service>> {
    let result = conn
        .query_row(
            &format!(
                "SELECT {SERVICE_COLUMNS} FROM services WHERE name = ?1 AND deleted_at IS NULL"
            ),
            params![name],
            |row| Ok(parse_service_row(row)),
        )
        .optional()?;
    result.transpose()
}

/// Like [`find_service_by_name`] but also returns a soft-deleted row, which
/// still owns the name.
pub fn find_service_by_name_any(conn: &Connection, name: &str) -> anyhow::Result<Option<Service>> {
    let result = conn
        .query_row(
            &format!("SELECT {SERVICE_COLUMNS} FROM services WHERE name = ?1"),
            params![name],
            |row| Ok(parse_service_row(row)),
        )
        .optional()?;
    result.transpose()
}

pub fn create_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    let prices = serde_json::to_string(&service.standard_duration_prices)?;
    conn.execute(
        "INSERT INTO services (id, name, short_name, duration_minutes, price, standard_duration_prices, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            service.id,
            service.name,
            service.short_name,
            service.duration_minutes,
            service.price,
            prices,
            service.notes,
            fmt_ts(&service.created_at),
        ],
    )?;
    Ok(())
}

pub fn soft_delete_service(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE services SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        params![fmt_ts(&Utc::now()), id],
    )?;
    Ok(count > 0)
}

/// Bring a soft-deleted service back with new details. Its id and price list
/// are kept so old bookings still point at it.
pub fn restore_service(conn: &Connection, service: &Service) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE services SET short_name = ?1, duration_minutes = ?2, price = ?3, notes = ?4, deleted_at = NULL
         WHERE id = ?5 AND deleted_at IS NOT NULL",
        params![
            service.short_name,
            service.duration_minutes,
            service.price,
            service.notes,
            service.id,
        ],
    )?;
    Ok(count > 0)
}

fn parse_service_row(row: &rusqlite::Row) -> anyhow::Result<Service> {
    let prices_json: String = row.get(5)?;
    let created_at: String = row.get(7)?;

    let standard_duration_prices: Vec<DurationPrice> = serde_json::from_str(&prices_json)
        .with_context(|| format!("bad standard_duration_prices: {prices_json}"))?;

    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        short_name: row.get(2)?,
        duration_minutes: row.get(3)?,
        price: row.get(4)?,
        standard_duration_prices,
        notes: row.get(6)?,
        created_at: parse_ts(&created_at)?,
        deleted_at: parse_opt_ts(row.get(8)?)?,
    })
}

// ── Payments ──

pub fn upsert_payment(conn: &Connection, payment: &Payment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO payments (id, booking_id, amount, method, paid, paid_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(booking_id, method) DO UPDATE SET
           amount = excluded.amount,
           paid = excluded.paid,
           paid_at = excluded.paid_at",
        params![
            payment.id,
            payment.booking_id,
            payment.amount,
            payment.method.as_str(),
            payment.paid as i32,
            fmt_ts(&payment.paid_at),
        ],
    )?;
    Ok(())
}

pub fn get_payments_for_booking(conn: &Connection, booking_id: &str) -> anyhow::Result<Vec<Payment>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, amount, method, paid, paid_at FROM payments
         WHERE booking_id = ?1 ORDER BY method ASC",
    )?;
    let rows = stmt.query_map(params![booking_id], |row| {
        let method: String = row.get(3)?;
        let paid_at: String = row.get(5)?;
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, f64>(2)?,
            method,
            row.get::<_, i32>(4)? != 0,
            paid_at,
        ))
    })?;

    let mut payments = vec![];
    for row in rows {
        let (id, booking_id, amount, method, paid, paid_at) = row?;
        let method = PaymentMethod::parse(&method)
            .with_context(|| format!("unknown payment method: {method}"))?;
        payments.push(Payment {
            id,
            booking_id,
            amount,
            method,
            paid,
            paid_at: parse_ts(&paid_at)?,
        });
    }
    Ok(payments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn ts(s: &str) -> DateTime<Utc> {
        parse_ts(s).unwrap()
    }

    fn client(id: &str, name: &str, phone: Option<&str>) -> Client {
        let now = ts("2024-01-01T00:00:00Z");
        Client {
            id: id.to_string(),
            name: name.to_string(),
            surname: None,
            email: None,
            phone: phone.map(String::from),
            notes: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn booking(id: &str, client_id: Option<&str>, start: &str, end: &str) -> Booking {
        let now = ts("2024-01-01T00:00:00Z");
        Booking {
            id: id.to_string(),
            client_id: client_id.map(String::from),
            service_id: "svc-relaxzy".to_string(),
            start_time: ts(start),
            end_time: ts(end),
            notes: None,
            status: BookingStatus::Confirmed,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_timestamp_format_sorts_as_time() {
        let a = fmt_ts(&ts("2024-01-01T09:59:59.999Z"));
        let b = fmt_ts(&ts("2024-01-01T10:00:00Z"));
        assert_eq!(b, "2024-01-01T10:00:00.000Z");
        assert!(a < b);
    }

    #[test]
    fn test_range_is_inclusive_and_ordered() {
        let conn = setup_db();
        create_client(&conn, &client("c1", "Ana", Some("+34600000001"))).unwrap();
        create_booking(&conn, &booking("late", Some("c1"), "2024-01-01T15:00:00Z", "2024-01-01T16:00:00Z")).unwrap();
        create_booking(&conn, &booking("early", Some("c1"), "2024-01-01T09:00:00Z", "2024-01-01T10:00:00Z")).unwrap();
        create_booking(&conn, &booking("edge", None, "2024-01-01T23:59:59.999Z", "2024-01-02T01:00:00Z")).unwrap();
        create_booking(&conn, &booking("next-day", None, "2024-01-02T00:00:00Z", "2024-01-02T01:00:00Z")).unwrap();

        let found = get_bookings_in_range(
            &conn,
            &ts("2024-01-01T00:00:00Z"),
            &ts("2024-01-01T23:59:59.999Z"),
        )
        .unwrap();

        let ids: Vec<_> = found.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late", "edge"]);
        assert_eq!(found[0].client_name, "Ana");
        assert_eq!(found[0].client_phone, "+34600000001");
        assert_eq!(found[0].client_email, "Unknown");
        assert_eq!(found[0].service_name, "Relaxzy");
        assert_eq!(found[2].client_name, "Unknown");
        assert_eq!(found[2].notes, "");
    }

    #[test]
    fn test_end_before_start_is_rejected_by_schema() {
        let conn = setup_db();
        let result = create_booking(
            &conn,
            &booking("bad", None, "2024-01-01T10:00:00Z", "2024-01-01T10:00:00Z"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_upsert_booking_reuses_row() {
        let conn = setup_db();
        create_client(&conn, &client("c1", "Ana", None)).unwrap();
        let first = upsert_booking(
            &conn,
            &booking("b1", Some("c1"), "2024-01-01T10:00:00Z", "2024-01-01T11:00:00Z"),
        )
        .unwrap();
        let mut again = booking("b2", Some("c1"), "2024-01-01T10:00:00Z", "2024-01-01T11:30:00Z");
        again.status = BookingStatus::Completed;
        let second = upsert_booking(&conn, &again).unwrap();

        assert_eq!(first, "b1");
        assert_eq!(second, "b1");
        let stored = get_booking(&conn, "b1").unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Completed);
        assert_eq!((stored.end_time - stored.start_time).num_minutes(), 90);
        assert!(get_booking(&conn, "b2").unwrap().is_none());
    }

    #[test]
    fn test_search_skips_soft_deleted() {
        let conn = setup_db();
        create_client(&conn, &client("c1", "Maria", Some("+34611111111"))).unwrap();
        create_client(&conn, &client("c2", "Mariano", None)).unwrap();
        create_client(&conn, &client("c3", "Pedro", None)).unwrap();

        let found = search_clients(&conn, Some("mari"), 50).unwrap();
        assert_eq!(found.len(), 2);

        let deleted = soft_delete_client(&conn, "c2").unwrap().unwrap();
        assert!(deleted.is_deleted());

        let found = search_clients(&conn, Some("MARI"), 50).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "c1");

        let all = search_clients(&conn, None, 50).unwrap();
        assert_eq!(all.len(), 2);

        assert!(soft_delete_client(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_like_wildcards_are_literal() {
        let conn = setup_db();
        create_client(&conn, &client("c1", "100% Ana", None)).unwrap();
        create_client(&conn, &client("c2", "1000 Ana", None)).unwrap();

        let found = search_clients(&conn, Some("100%"), 50).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "c1");
    }

    #[test]
    fn test_find_similar_matches_any_field() {
        let conn = setup_db();
        let mut ana = client("c1", "Ana", Some("+34600000001"));
        ana.email = Some("ana@example.com".to_string());
        create_client(&conn, &ana).unwrap();
        create_client(&conn, &client("c2", "Luis", Some("+34600000002"))).unwrap();

        let query = ClientQuery {
            client_name: Some("zzz".to_string()),
            client_phone: Some("0002".to_string()),
            ..Default::default()
        };
        let found = find_similar_clients(&conn, &query, 5).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "c2");

        let found = find_similar_clients(&conn, &ClientQuery::default(), 5).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_soft_deleted_service_hidden() {
        let conn = setup_db();
        assert!(find_service_by_name(&conn, "Thai Oil").unwrap().is_some());
        assert!(soft_delete_service(&conn, "svc-thai-oil").unwrap());
        assert!(!soft_delete_service(&conn, "svc-thai-oil").unwrap());
        assert!(find_service_by_name(&conn, "Thai Oil").unwrap().is_none());
        assert_eq!(list_services(&conn).unwrap().len(), 5);
        let deleted = find_service_by_name_any(&conn, "Thai Oil").unwrap().unwrap();
        assert!(deleted.deleted_at.is_some());

        let mut revived = deleted.clone();
        revived.duration_minutes = Some(75);
        assert!(restore_service(&conn, &revived).unwrap());
        assert!(!restore_service(&conn, &revived).unwrap());
        let found = find_service_by_name(&conn, "Thai Oil").unwrap().unwrap();
        assert_eq!(found.id, "svc-thai-oil");
        assert_eq!(found.duration_minutes, Some(75));
        assert!(found.deleted_at.is_none());
    }

    #[test]
    fn test_search_folds_accented_letters() {
        let conn = setup_db();
        create_client(&conn, &client("c1", "Álvaro", Some("+34600000001"))).unwrap();
        create_client(&conn, &client("c2", "Íñigo", Some("+34600000002"))).unwrap();

        let found = search_clients(&conn, Some("álvaro"), 50).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "c1");

        let found = search_clients(&conn, Some("ÍÑIGO"), 50).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "c2");

        let query = ClientQuery {
            client_name: Some("ñig".to_string()),
            ..Default::default()
        };
        let found = find_similar_clients(&conn, &query, 5).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "c2");
    }
}
