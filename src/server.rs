//! Server initialization and startup logic for cronhook.

use std::sync::{Arc, OnceLock};

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use cronhook_api::{ApiServer, ApiServerConfig, AppState};
use cronhook_config::{Config, ConfigValidator, LoggingConfig};
use cronhook_protocols::{JobRepository, JobStore};
use cronhook_scheduler::{Scheduler, StartupPolicy};
use cronhook_store::{MemoryJobStore, SqliteJobStore};
use cronhook_trigger::{HttpTriggerClient, TriggerClientConfig, TriggerMethod};

use crate::signal::shutdown_signal;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize tracing with console output and, when `logging.dir` is set,
/// a daily-rotated log file.
pub(crate) fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let file_layer = match &logging.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("cronhook")
                .filename_suffix("log")
                .max_log_files(30)
                .build(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = LOG_GUARD.set(guard);
            Some(fmt::layer().with_writer(writer).with_ansi(false).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    Ok(())
}

/// Both views of one concrete store.
struct Stores {
    jobs: Arc<dyn JobStore>,
    repository: Arc<dyn JobRepository>,
}

async fn open_store(config: &Config) -> anyhow::Result<Stores> {
    match config.store.backend.as_str() {
        "memory" => {
            warn!("Using in-memory job store; jobs are lost on exit");
            let store = Arc::new(MemoryJobStore::new());
            Ok(Stores {
                jobs: store.clone(),
                repository: store,
            })
        }
        "sqlite" => {
            let store = Arc::new(
                SqliteJobStore::open(&config.store.path)
                    .await
                    .with_context(|| format!("opening {}", config.store.path.display()))?,
            );
            info!(path = %config.store.path.display(), "SQLite job store ready");
            Ok(Stores {
                jobs: store.clone(),
                repository: store,
            })
        }
        other => anyhow::bail!("unknown store backend '{}'", other),
    }
}

fn build_trigger(config: &Config) -> anyhow::Result<HttpTriggerClient> {
    let method: TriggerMethod = config
        .trigger
        .method
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let client = HttpTriggerClient::new(TriggerClientConfig {
        timeout: config.trigger.timeout(),
        method,
        api_key_header: config.trigger.api_key_header.clone(),
        user_agent: config.trigger.user_agent.clone(),
    })?;
    Ok(client)
}

/// Run the scheduler and API server until a shutdown signal arrives.
pub(crate) async fn run_server(config: Config) -> anyhow::Result<()> {
    info!("Starting cronhook v{}", env!("CARGO_PKG_VERSION"));

    let validation = ConfigValidator::validate(&config);
    for warning in &validation.warnings {
        warn!("Config warning: {}: {}", warning.path, warning.message);
    }
    if !validation.is_valid() {
        for e in &validation.errors {
            error!("Config error: {}", e);
        }
        anyhow::bail!("invalid configuration");
    }

    let zone = config.scheduler.zone()?;
    let stores = open_store(&config).await?;
    let trigger = Arc::new(build_trigger(&config)?);

    let policy = if config.scheduler.preload_future_jobs {
        StartupPolicy::IncludeFutureStart
    } else {
        StartupPolicy::EligibleOnly
    };

    let scheduler = Arc::new(
        Scheduler::builder(stores.jobs, trigger)
            .with_time_zone(zone)
            .with_trigger_timeout(config.trigger.timeout())
            .with_startup_policy(policy)
            .build(),
    );

    match scheduler.start().await {
        Ok(report) => info!(
            installed = report.installed,
            rejected = report.rejected.len(),
            "Scheduler started"
        ),
        // The API still comes up; jobs can be re-armed once the store recovers.
        Err(e) => error!("Startup reconciliation failed: {}", e),
    }

    let state = Arc::new(AppState::new(stores.repository, Arc::clone(&scheduler)));
    let server = ApiServer::new(
        ApiServerConfig::new(config.server.host.clone(), config.server.port),
        state,
    );

    let result = server.run(shutdown_signal()).await;

    scheduler.shutdown();
    info!("cronhook stopped");
    result.map_err(Into::into)
}
