//! Bulk import of spreadsheet-exported bookings.
//!
//! Each row becomes one or more bookings (a `60*2` duration books two guests)
//! plus cash/card payments. Rows are imported one transaction at a time: a bad
//! row is logged, recorded in the report, and the run moves on.

use std::path::Path;

use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::calendar::range::local_to_utc;
use crate::db::queries;
use crate::models::lenient::opt_string;
use crate::models::{end_time_for, Booking, BookingStatus, Client, Payment, PaymentMethod};

/// Service the studio sold before services carried price lists.
const LEGACY_SERVICE: &str = "Relaxzy";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ImportRow {
    /// Month and two-digit year, e.g. `MAR24`.
    #[serde(rename = "File", default, deserialize_with = "opt_string")]
    pub file: Option<String>,
    /// Day of the month.
    #[serde(rename = "Sheet", default, deserialize_with = "opt_string")]
    pub sheet: Option<String>,
    #[serde(rename = "StartTime", default, deserialize_with = "opt_string")]
    pub start_time: Option<String>,
    #[serde(rename = "Name", default, deserialize_with = "opt_string")]
    pub name: Option<String>,
    #[serde(rename = "Phone", default, deserialize_with = "opt_string")]
    pub phone: Option<String>,
    #[serde(rename = "Massage", default, deserialize_with = "opt_string")]
    pub massage: Option<String>,
    #[serde(rename = "Duration", default, deserialize_with = "opt_string")]
    pub duration: Option<String>,
    #[serde(rename = "Price", default, deserialize_with = "opt_string")]
    pub price: Option<String>,
    #[serde(rename = "PaymentE", default, deserialize_with = "opt_string")]
    pub payment_cash: Option<String>,
    #[serde(rename = "PaymentT", default, deserialize_with = "opt_string")]
    pub payment_card: Option<String>,
    #[serde(rename = "TipT", default, deserialize_with = "opt_string")]
    pub tip_card: Option<String>,
    #[serde(rename = "Comments", default, deserialize_with = "opt_string")]
    pub comments: Option<String>,
}

impl ImportRow {
    fn summary(&self) -> String {
        format!(
            "massage={} date={}-{}T{} phone={}",
            self.massage.as_deref().unwrap_or("-"),
            self.file.as_deref().unwrap_or("-"),
            self.sheet.as_deref().unwrap_or("-"),
            self.start_time.as_deref().unwrap_or("-"),
            self.phone.as_deref().unwrap_or("-"),
        )
    }
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub timezone: Tz,
    /// Country calling code for phone numbers written without one.
    pub default_country_code: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Madrid,
            default_country_code: "34".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub total: usize,
    pub imported: usize,
    pub bookings_written: usize,
    pub failures: Vec<ImportFailure>,
}

impl ImportReport {
    /// Err when any row failed, so a partial import is not mistaken for success.
    pub fn ensure_complete(&self) -> anyhow::Result<()> {
        if !self.failures.is_empty() {
            bail!("{} of {} rows failed to import", self.failures.len(), self.total);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportFailure {
    /// 1-based position in the input.
    pub row: usize,
    pub summary: String,
    pub error: String,
}

pub fn load_rows(path: &Path) -> anyhow::Result<Vec<ImportRow>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn import_rows(conn: &mut Connection, rows: &[ImportRow], opts: &ImportOptions) -> ImportReport {
    let mut report = ImportReport {
        total: rows.len(),
        ..Default::default()
    };

    for (i, row) in rows.iter().enumerate() {
        let index = i + 1;
        match import_one(conn, row, opts) {
            Ok(written) => {
                report.imported += 1;
                report.bookings_written += written;
                tracing::info!(row = index, total = report.total, bookings = written, "imported row");
            }
            Err(e) => {
                tracing::error!(row = index, summary = %row.summary(), error = %format!("{e:#}"), "failed to import row");
                report.failures.push(ImportFailure {
                    row: index,
                    summary: row.summary(),
                    error: format!("{e:#}"),
                });
            }
        }
    }

    tracing::info!(
        total = report.total,
        imported = report.imported,
        failed = report.failures.len(),
        "import finished"
    );
    report
}

fn import_one(conn: &mut Connection, row: &ImportRow, opts: &ImportOptions) -> anyhow::Result<usize> {
    let tx = conn.transaction()?;

    let client_id = resolve_client(&tx, row, opts)?;

    let (duration, multiplier) = parse_duration(row.duration.as_deref())?;
    if duration <= 0.0 {
        bail!("missing duration");
    }
    let price_per_person = parse_number(row.price.as_deref())? / multiplier as f64;

    let mapped = row.massage.as_deref().map(map_service_abbreviation);
    let service_name = resolve_service_name(&tx, mapped, duration, price_per_person)?
        .context("could not resolve a service for this row")?;
    let service = queries::find_service_by_name(&tx, &service_name)?
        .with_context(|| format!("service not found: {service_name}"))?;

    let start = parse_start(row, opts.timezone)?;
    let end = end_time_for(start, duration.round() as i64)
        .with_context(|| format!("invalid duration: {duration}"))?;

    let cash = parse_number(row.payment_cash.as_deref())? / multiplier as f64;
    let card = parse_number(row.payment_card.as_deref())? / multiplier as f64;
    let tip = parse_number(row.tip_card.as_deref())? / multiplier as f64;

    for guest in 0..multiplier {
        let first = guest == 0;
        let notes = if first {
            let parts: Vec<String> = [
                row.comments.clone(),
                row.tip_card.as_ref().map(|t| format!("card tip {t}")),
            ]
            .into_iter()
            .flatten()
            .collect();
            Some(parts.join(", ")).filter(|n| !n.is_empty())
        } else {
            None
        };

        let now = Utc::now();
        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            client_id: if first { client_id.clone() } else { None },
            service_id: service.id.clone(),
            start_time: start,
            end_time: end,
            notes,
            status: BookingStatus::Completed,
            created_at: now,
            updated_at: now,
        };
        let booking_id = queries::upsert_booking(&tx, &booking)?;

        let mut payments = vec![];
        if cash > 0.0 {
            payments.push((PaymentMethod::Cash, cash));
        }
        if card > 0.0 {
            payments.push((PaymentMethod::CreditCard, card + tip));
        } else if tip > 0.0 {
            payments.push((PaymentMethod::CreditCard, tip));
        }

        for (method, amount) in payments {
            queries::upsert_payment(
                &tx,
                &Payment {
                    id: uuid::Uuid::new_v4().to_string(),
                    booking_id: booking_id.clone(),
                    amount,
                    method,
                    paid: true,
                    paid_at: start,
                },
            )?;
        }
    }

    tx.commit()?;
    Ok(multiplier as usize)
}

/// Phone match first, then name (back-filling a missing phone), else a new client.
fn resolve_client(
    conn: &Connection,
    row: &ImportRow,
    opts: &ImportOptions,
) -> anyhow::Result<Option<String>> {
    if row.name.is_none() && row.phone.is_none() {
        return Ok(None);
    }

    let phone = row
        .phone
        .as_deref()
        .map(|p| normalize_phone(p, &opts.default_country_code))
        .transpose()?;

    if let Some(phone) = phone.as_deref() {
        if let Some(client) = queries::find_client_by_phone(conn, phone)? {
            return Ok(Some(client.id));
        }
    }

    if let Some(name) = row.name.as_deref() {
        if let Some(client) = queries::find_client_by_name(conn, name)? {
            if let (None, Some(phone)) = (client.phone.as_deref(), phone.as_deref()) {
                queries::set_client_phone(conn, &client.id, phone)?;
                tracing::debug!(client_id = %client.id, phone, "back-filled client phone");
            }
            return Ok(Some(client.id));
        }
    }

    let now = Utc::now();
    let client = Client {
        id: uuid::Uuid::new_v4().to_string(),
        name: row.name.clone().unwrap_or_else(|| "Unknown".to_string()),
        surname: None,
        email: None,
        phone,
        notes: None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };
    queries::create_client(conn, &client)?;
    tracing::debug!(client_id = %client.id, "inserted client");
    Ok(Some(client.id))
}

pub fn map_service_abbreviation(massage: &str) -> String {
    match massage {
        "Thai" => "Traditional Thai",
        "Oil" => "Thai Oil",
        "Relaxzy" => "Relaxzy",
        "FL" => "Feet & Legs",
        "BS" => "Back & Shoulders",
        "DT" => "Deep Tissue",
        other => other,
    }
    .to_string()
}

/// A literal name wins; otherwise the service sold at this duration and price,
/// otherwise the legacy fallback for the studio's old standard prices.
fn resolve_service_name(
    conn: &Connection,
    literal: Option<String>,
    duration: f64,
    price_per_person: f64,
) -> anyhow::Result<Option<String>> {
    if let Some(name) = literal.filter(|n| !n.trim().is_empty()) {
        return Ok(Some(name));
    }

    let services = queries::list_services(conn)?;
    if services.is_empty() {
        tracing::warn!(price_per_person, duration, "no services in database");
        return Ok((price_per_person == 50.0 && duration == 60.0).then(|| LEGACY_SERVICE.to_string()));
    }

    if let Some(service) = services.iter().find(|s| s.sells(duration, price_per_person)) {
        return Ok(Some(service.name.clone()));
    }

    if price_per_person == 50.0 || duration == 60.0 || price_per_person == 45.0 || duration == 45.0 {
        tracing::warn!(price_per_person, duration, "falling back to legacy service");
        return Ok(Some(LEGACY_SERVICE.to_string()));
    }

    Ok(None)
}

/// `"60"` → (60, 1); `"60*2"` → (60, 2).
pub fn parse_duration(raw: Option<&str>) -> anyhow::Result<(f64, u32)> {
    let Some(raw) = raw else {
        return Ok((0.0, 1));
    };
    if raw.contains('*') {
        let parts = raw
            .split('*')
            .map(|p| parse_number(Some(p.trim())))
            .collect::<anyhow::Result<Vec<f64>>>()?;
        let duration = parts.iter().copied().fold(0.0, f64::max);
        let multiplier = parts.get(1).copied().unwrap_or(1.0);
        if multiplier < 1.0 || multiplier.fract() != 0.0 {
            bail!("invalid guest count in duration: {raw}");
        }
        return Ok((duration, multiplier as u32));
    }
    Ok((parse_number(Some(raw))?, 1))
}

/// Numbers with either decimal separator; absent means zero.
pub fn parse_number(raw: Option<&str>) -> anyhow::Result<f64> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(0.0),
        Some(s) => s
            .replace(',', ".")
            .parse::<f64>()
            .with_context(|| format!("invalid number: {s}")),
    }
}

/// E.164 form of a phone number. Nine-digit national numbers get the default
/// country code.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> anyhow::Result<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();
    let (international, digits) = if let Some(rest) = compact.strip_prefix('+') {
        (true, rest.to_string())
    } else if let Some(rest) = compact.strip_prefix("00") {
        (true, rest.to_string())
    } else {
        (false, compact)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        bail!("invalid phone number: {raw}");
    }

    let e164 = match (international, digits.len()) {
        (true, 8..=15) => format!("+{digits}"),
        (false, 9) => format!("+{default_country_code}{digits}"),
        (false, 10..=15) => format!("+{digits}"),
        _ => bail!("invalid phone number: {raw}"),
    };
    Ok(e164)
}

/// Start instant from `File` (`MAR24`), `Sheet` (day) and `StartTime` (`HH:MM`),
/// read as local time in `tz`.
pub fn parse_start(row: &ImportRow, tz: Tz) -> anyhow::Result<DateTime<Utc>> {
    let file = row.file.as_deref().context("missing File")?;
    let day: u32 = row
        .sheet
        .as_deref()
        .context("missing Sheet")?
        .parse()
        .context("Sheet is not a day number")?;
    let time = row.start_time.as_deref().context("missing StartTime")?;

    if file.len() < 4 || !file.is_char_boundary(3) {
        bail!("invalid File: {file}");
    }
    let (month_abbr, year_suffix) = file.split_at(3);
    let month = match month_abbr.to_uppercase().as_str() {
        "JAN" => 1,
        "FEB" => 2,
        "MAR" => 3,
        "APR" => 4,
        "MAY" => 5,
        "JUN" => 6,
        "JUL" => 7,
        "AUG" => 8,
        "SEP" => 9,
        "OCT" => 10,
        "NOV" => 11,
        "DEC" => 12,
        _ => bail!("invalid month in File: {file}"),
    };
    let year: i32 = format!("20{year_suffix}")
        .parse()
        .with_context(|| format!("invalid year in File: {file}"))?;

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .with_context(|| format!("invalid date: {file} day {day}"))?;
    let time = NaiveTime::parse_from_str(time, "%H:%M")
        .with_context(|| format!("invalid StartTime: {time}"))?;

    Ok(local_to_utc(tz, date.and_time(time)))
}
