use chrono::Local;
use clap::Parser;
use marine_weather_service::db::{self, ObservationRepository};
use marine_weather_service::fetcher::{StationPageFetcher, DEFAULT_TIMEOUT_SECS};
use marine_weather_service::observation::{format_timestamp, AlignedRow};
use marine_weather_service::orchestrator::ScrapeOrchestrator;
use marine_weather_service::services::{ObservationService, SavePolicy};
use marine_weather_service::stations::{default_stations, find_station, DEFAULT_REFERENCE_STATION};
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "scrape-once")]
#[command(about = "Run a single scrape cycle of all Ise Bay stations and store the result", long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env, default_value = "sqlite://weather_data.db")]
    database_url: String,

    /// Station whose timestamps define the aligned timeline
    #[arg(long, env = "REFERENCE_STATION_CODE", default_value = DEFAULT_REFERENCE_STATION)]
    reference_station: String,

    /// Seconds to wait between station requests
    #[arg(long, env = "REQUEST_DELAY_SECS", default_value = "2")]
    request_delay_secs: u64,

    /// Per-request timeout in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    fetch_timeout_secs: u64,

    /// Save every aligned observation instead of only newer ones
    #[arg(long)]
    all: bool,

    /// Print the aligned rows without touching the database
    #[arg(long)]
    dry_run: bool,
}

fn print_row(row: &AlignedRow) {
    let o = &row.observation;
    println!(
        "{}  {:<28} {}  dir={:<6} wind={:<6} wave={:<6} ({:?})",
        format_timestamp(&row.reference_timestamp),
        o.station_code,
        format_timestamp(&o.timestamp),
        o.wind_direction.as_deref().unwrap_or("-"),
        o.wind_speed.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
        o.wave_height.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
        row.match_kind
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let stations = default_stations();
    if find_station(&stations, &cli.reference_station).is_none() {
        error!("Unknown reference station: {}", cli.reference_station);
        return Err(format!("Unknown reference station: {}", cli.reference_station).into());
    }

    let fetcher = StationPageFetcher::new(Duration::from_secs(cli.fetch_timeout_secs))?;
    let orchestrator = ScrapeOrchestrator::new(
        fetcher,
        stations,
        cli.reference_station.clone(),
        Duration::from_secs(cli.request_delay_secs),
    );

    if cli.dry_run {
        let report = orchestrator.scrape_all(Local::now().date_naive()).await;
        for row in &report.rows {
            print_row(row);
        }
        for outcome in report.failed_stations() {
            println!(
                "FAILED {}: {}",
                outcome.station_code,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
        println!("{} aligned rows (dry run, nothing saved)", report.rows.len());
        return Ok(());
    }

    let pool = db::connect(&cli.database_url, 1).await?;
    db::run_migrations(&pool).await?;

    let service = ObservationService::new(ObservationRepository::new(pool), orchestrator);
    let policy = if cli.all {
        SavePolicy::All
    } else {
        SavePolicy::Incremental
    };

    info!("Running one scrape cycle with {:?} save policy", policy);
    let summary = service.scrape_and_store(policy).await?;
    let stats = service.get_stats().await?;

    if summary.aligned_rows == 0 {
        println!("No data was scraped");
    } else {
        println!(
            "Saved {} records ({} placeholders, {} already stored)",
            summary.records_saved(),
            summary.placeholders_saved,
            summary.skipped_stale
        );
    }
    if !summary.failed_stations.is_empty() {
        println!("Stations without data: {}", summary.failed_stations.join(", "));
    }
    println!("Total records in database: {}", stats.total_records);

    Ok(())
}
