use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tide_server::adapters::AdapterSet;
use tide_server::cache::ArtifactCache;
use tide_server::config::AppConfig;
use tide_server::render::{PcalRenderer, Renderer};
use tide_server::service::TideCalendarService;
use tide_server::stations::{ChsListingClient, DirectorySources, ListingCache, StationDirectory};
use tide_server::web::{AppState, create_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tide_server=info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    // Station directory: bundled US dataset plus the CHS listing
    let mut sources = DirectorySources::bundled(&config.noaa_dataset, &config.chs_dataset)
        .with_listing_cache(ListingCache::new(config.listing_cache()));
    if config.offline {
        info!("offline mode, using bundled Canadian stations");
    } else {
        sources = sources.with_listing(ChsListingClient::new(config.listing())?);
    }
    let directory = StationDirectory::load(sources).await;
    if directory.is_empty().await {
        warn!("station directory is empty; every calendar request will fail until a resync succeeds");
    }

    let adapters = AdapterSet::from_configs(config.noaa(), config.chs())?;
    let service = Arc::new(TideCalendarService::new(
        directory,
        adapters,
        config.retry(),
        ArtifactCache::new(config.artifact_cache()),
        PcalRenderer::new(config.pcal()),
    ));

    spawn_resync(service.clone(), config.resync_interval, config.offline);
    spawn_sweep(service.clone(), config.sweep_interval);

    let app = create_router(AppState::new(service));
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "tide calendar server listening");
    info!("  GET  /health");
    info!("  GET  /api/stations/search?q=&country=&limit=");
    info!("  GET  /api/stations/:id");
    info!("  GET  /calendar?station=&year=&month=");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Refresh the Canadian stations periodically.
fn spawn_resync<R: Renderer + 'static>(
    service: Arc<TideCalendarService<R>>,
    every: Duration,
    offline: bool,
) {
    if offline {
        return;
    }
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await; // First tick is immediate; load already synced
        loop {
            interval.tick().await;
            match service.resync_directory().await {
                Ok(report) => info!(
                    origin = ?report.origin,
                    canadian = report.canadian,
                    removed = report.removed,
                    "station directory resynced"
                ),
                Err(e) => warn!(error = %e, "station directory resync failed, keeping current stations"),
            }
        }
    });
}

/// Delete expired calendars at startup and then periodically.
fn spawn_sweep<R: Renderer + 'static>(service: Arc<TideCalendarService<R>>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            if let Err(e) = service.sweep_cache().await {
                error!(error = %e, "artifact cache sweep failed");
            }
        }
    });
}
