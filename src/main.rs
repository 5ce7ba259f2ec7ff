//!
//! Lodgelock booking service.
//! Reads configuration from TOML file (~/.config/lodgelock/config.toml).

use std::sync::Arc;
use std::time::Duration;

use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use lodgelock::application::services::{
    AllocatorConfig, BookingService, CodeIssuer, IntervalAllocator, ReconciliationConfig,
    ReconciliationScheduler,
};
use lodgelock::config::AppConfig;
use lodgelock::infrastructure::database::migrator::Migrator;
use lodgelock::support::shutdown::ShutdownCoordinator;
use lodgelock::{default_config_path, init_database, DatabaseConfig, SeaOrmRepositoryProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = std::env::var("LODGELOCK_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let app_cfg = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            // Initialize logging with configured level
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level)),
                )
                .init();
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .init();
            error!("Failed to load config: {}. Using defaults.", e);
            AppConfig::default()
        }
    };

    info!("Starting Lodgelock booking service...");

    // ── Prometheus metrics recorder (must be installed before any metrics calls) ──
    if app_cfg.metrics.enabled {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], app_cfg.metrics.port))
            .install()
            .expect("Failed to install Prometheus metrics exporter");
        info!(
            "Prometheus metrics exposed on http://0.0.0.0:{}/metrics",
            app_cfg.metrics.port
        );
    }

    // ── Database ───────────────────────────────────────────────
    let db_config = DatabaseConfig {
        url: app_cfg.database.connection_url(),
    };
    info!("Database: {}", db_config.url);

    let db = match init_database(&db_config).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    info!("Running database migrations...");
    if let Err(e) = Migrator::up(&db, None).await {
        error!("Failed to run migrations: {}", e);
        return Err(e.into());
    }
    info!("Migrations completed");

    // Initialize repository provider
    let repos: Arc<dyn lodgelock::domain::RepositoryProvider> =
        Arc::new(SeaOrmRepositoryProvider::new(db.clone()));

    // Initialize services
    let allocator = Arc::new(
        IntervalAllocator::new(repos.clone()).with_config(AllocatorConfig {
            lock_timeout: Duration::from_millis(app_cfg.allocator.lock_timeout_ms),
        }),
    );
    let codes = Arc::new(CodeIssuer::new(repos.clone()));
    let bookings = Arc::new(BookingService::new(
        repos.clone(),
        allocator.clone(),
        codes.clone(),
    ));

    // Initialize shutdown coordinator
    let shutdown = ShutdownCoordinator::new(app_cfg.service.shutdown_timeout_secs);
    let shutdown_signal = shutdown.signal();

    // Start listening for shutdown signals (SIGTERM, SIGINT)
    shutdown.start_signal_listener();

    // Start reconciliation sweep
    let scheduler = Arc::new(
        ReconciliationScheduler::new(repos.clone(), bookings.clone()).with_config(
            ReconciliationConfig {
                sweep_interval_secs: app_cfg.scheduler.sweep_interval_secs,
                batch_size: app_cfg.scheduler.batch_size,
            },
        ),
    );
    scheduler.start(shutdown_signal.clone());

    info!("Service started. Press Ctrl+C to shutdown gracefully.");

    // Run until the shutdown signal fires, then close the store within the
    // configured cleanup budget
    shutdown
        .shutdown_with_cleanup(|| async {
            if let Err(e) = db.close().await {
                warn!("Error closing database connection: {}", e);
            } else {
                info!("Database connection closed");
            }
        })
        .await;

    info!("Lodgelock shutdown complete");
    Ok(())
}
