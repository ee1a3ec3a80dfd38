use std::path::PathBuf;

use anyhow::Context;
use chrono_tz::Tz;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use studiobook::db;
use studiobook::services::import::{self, ImportOptions};

/// Load historical bookings exported from the studio spreadsheets.
#[derive(Parser)]
#[command(version, about = "Import spreadsheet bookings into studiobook")]
struct Cli {
    /// JSON array of spreadsheet rows.
    #[arg(long, value_name = "FILE")]
    file: PathBuf,

    #[arg(long, env = "DATABASE_URL", default_value = "studiobook.db")]
    database_url: String,

    /// IANA zone the spreadsheet times are written in.
    #[arg(long, env = "CALENDAR_TIMEZONE", default_value = "Europe/Madrid")]
    timezone: String,

    /// Calling code prepended to phone numbers written without one.
    #[arg(long, default_value = "34")]
    country_code: String,
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let timezone: Tz = cli
        .timezone
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid timezone {}: {e}", cli.timezone))?;
    let rows = import::load_rows(&cli.file)?;
    tracing::info!(file = %cli.file.display(), rows = rows.len(), "loaded import file");

    let mut conn = db::init_db(&cli.database_url)
        .with_context(|| format!("failed to open {}", cli.database_url))?;

    let opts = ImportOptions {
        timezone,
        default_country_code: cli.country_code,
    };
    let report = import::import_rows(&mut conn, &rows, &opts);

    for failure in &report.failures {
        tracing::warn!(row = failure.row, summary = %failure.summary, error = %failure.error, "row skipped");
    }
    tracing::info!(
        total = report.total,
        imported = report.imported,
        bookings = report.bookings_written,
        failed = report.failures.len(),
        "import complete"
    );

    report.ensure_complete()
}
