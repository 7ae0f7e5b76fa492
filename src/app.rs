use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::db::ObservationRepository;
use crate::fetcher::StationPageFetcher;
use crate::orchestrator::ScrapeOrchestrator;
use crate::scheduler;
use crate::services::ObservationService;

/// Application with the spawned server and scrape scheduler
pub struct Application {
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
    /// `None` when periodic scraping is disabled
    pub scheduler_handle: Option<JoinHandle<()>>,
}

impl Application {
    /// Wire repository, fetcher, orchestrator and service, then spawn the
    /// HTTP server and, unless the interval is 0, the scrape scheduler
    pub async fn build(config: Config, pool: SqlitePool) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application components");

        let observation_repo = ObservationRepository::new(pool);
        let fetcher = StationPageFetcher::new(config.fetch_timeout())?;
        let orchestrator = ScrapeOrchestrator::new(
            fetcher,
            config.stations.clone(),
            config.reference_station_code.clone(),
            config.request_delay(),
        );
        let observation_service = ObservationService::new(observation_repo, orchestrator);

        let scheduler_handle = if config.scrape_interval_minutes > 0 {
            info!("Spawning scrape scheduler");
            let service = observation_service.clone();
            let interval = config.scrape_interval_minutes;
            let policy = config.save_policy();

            Some(tokio::spawn(async move {
                scheduler::start_scrape_scheduler(service, interval, policy).await;
            }))
        } else {
            info!("Scrape scheduler disabled");
            None
        };

        let app_state = AppState {
            observation_service,
        };
        let app = create_router(app_state).layer(TraceLayer::new_for_http());

        let addr = config.server_addr();
        info!("Starting HTTP server on {}", addr);

        let server_handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await
        });

        info!("Application initialized successfully");

        Ok(Self {
            server_handle,
            scheduler_handle,
        })
    }

    /// Run until the server stops; the scheduler runs in the background
    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        self.server_handle.await??;
        Ok(())
    }
}
