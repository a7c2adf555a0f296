//! Manual `IndexJob` scheduler. Bypasses the RPC surface and writes directly
//! to the job store — useful for backfills and one-off reindex runs an
//! operator triggers from a shell rather than through the HTTP surface.

use chrono::{NaiveTime, TimeZone, Utc};
use clap::Parser;
use indexsvc_core::job::JobStore;
use indexsvc_core::{IndexAction, IndexOp};
use indexsvc_job_postgres::PgIndexJobStore;
use sqlx::postgres::PgPoolOptions;

const MAX_DAYS: u32 = 90;

/// Create one or more future IndexJob rows, one per day, for manual testing
/// or backfills.
#[derive(Parser, Debug)]
#[command(name = "index-job-scheduler")]
struct Args {
    /// Index name (required).
    #[arg(short = 'i', long = "index")]
    index: String,

    /// Document type (required).
    #[arg(short = 't', long = "type")]
    doc_type: String,

    /// Comma-separated document keys. Omit to target all keys.
    #[arg(short = 'k', long = "keys")]
    keys: Option<String>,

    /// Number of days to schedule a job for, 1-90. First job is today.
    #[arg(short = 'd', long = "days", default_value_t = 1)]
    days: u32,

    /// Time of day (HH:MM, UTC) the job runs at. Defaults to midnight.
    #[arg(short = 'T', long = "time")]
    time: Option<String>,

    /// Job context string.
    #[arg(short = 'c', long = "context", default_value = "index_job_scheduler")]
    context: String,

    /// Print the configuration without writing anything.
    #[arg(short = 'p', long = "preview")]
    preview: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if args.days < 1 || args.days > MAX_DAYS {
        anyhow::bail!("--days must be between 1 and {MAX_DAYS}");
    }

    let keys: Vec<String> = args
        .keys
        .as_deref()
        .map(|raw| raw.split(',').map(|k| k.trim().to_string()).filter(|k| !k.is_empty()).collect())
        .unwrap_or_default();

    let time_of_day = match &args.time {
        Some(raw) => parse_hh_mm(raw)?,
        None => NaiveTime::from_hms_opt(0, 0, 0).expect("midnight is valid"),
    };

    let first_run = Utc::now().date_naive().and_time(time_of_day);
    let first_run = Utc.from_utc_datetime(&first_run);

    println!("################################################");
    println!("Using these configuration options:");
    println!("Index name: {}", args.index);
    println!("Document type: {}", args.doc_type);
    println!("Db keys: {:?}", keys);
    println!("Number of days: {}", args.days);
    println!("IndexJob start time (HH:MM): {}", time_of_day.format("%H:%M"));
    println!("IndexJob context: {}", args.context);
    println!("################################################");

    if args.preview {
        return Ok(());
    }

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let max_retry_attempts: i32 = std::env::var("INDEXER_JOB_MAX_RETRY_ATTEMPTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3);

    let pool = PgPoolOptions::new().connect(&database_url).await?;
    let store = PgIndexJobStore::new(pool);
    store.migrate().await?;

    let op = IndexOp::new(IndexAction::Update, args.index, args.doc_type, keys);
    let payload = op.encode();

    for day in 0..args.days {
        let not_before = first_run + chrono::Duration::days(day as i64);
        let job_id = store
            .insert(&args.context, payload.clone(), not_before, max_retry_attempts)
            .await?;
        println!("scheduled job {job_id} for {not_before}");
    }

    Ok(())
}

fn parse_hh_mm(raw: &str) -> anyhow::Result<NaiveTime> {
    let (hour, minute) = raw
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("--time must be HH:MM"))?;
    let hour: u32 = hour.parse()?;
    let minute: u32 = minute.parse()?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| anyhow::anyhow!("invalid time {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_hh_mm() {
        let t = parse_hh_mm("09:30").unwrap();
        assert_eq!(t, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
    }

    #[test]
    fn rejects_malformed_time() {
        assert!(parse_hh_mm("9").is_err());
        assert!(parse_hh_mm("25:00").is_err());
    }
}
