//! Traceline CLI
//!
//! Demonstration harness for the Traceline telemetry pipeline: wires the
//! composition root with simulated producers, runs collection and sending
//! for a short while, and reports what was captured and flushed.
//!
//! # Usage
//!
//! ```bash
//! traceline --help
//! traceline demo --duration-secs 10
//! ```

#![deny(unsafe_code)]

mod sim;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sdk::data_manager::{DataManager, DataManagerDeps};
use sdk::flush::TraceFlusher;
use sdk::formatters::FormatterRegistry;
use sdk::persistence::PersistenceWorker;
use sdk::producers::{AllowAllPermissions, StaticConfigurationProvider};
use sdk::session::{SessionManager, SessionProvider};
use sdk::trace_manager::TraceManager;
use sdk::uploader::LoggingUploader;
use shared::config::{CollectionConfig, FlushConfig};
use shared::models::{DataSourceType, MeasurementRecord, MeasurementValue, ViewEvent};
use shared::storage::{
    InMemoryMetricStore, InMemoryResourceStore, InMemoryTraceStore, MetricStore, ResourceStore,
    TraceStore,
};

/// Traceline CLI - telemetry pipeline demonstration harness
#[derive(Parser)]
#[command(name = "traceline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline with simulated producers
    Demo {
        /// How long to run before shutting down
        #[arg(long, default_value_t = 10)]
        duration_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Demo { duration_secs }) => run_demo(duration_secs).await,
        None => {
            println!("Traceline CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for usage information");
            Ok(())
        }
    }
}

/// Runs the full pipeline against simulated producers.
async fn run_demo(duration_secs: u64) -> Result<()> {
    let collection_config = CollectionConfig::from_env()?;
    let flush_config = FlushConfig::from_env()?;
    collection_config.validate().map_err(anyhow::Error::msg)?;
    flush_config.validate().map_err(anyhow::Error::msg)?;

    let sessions = Arc::new(SessionManager::new());
    let session = sessions.start_session();
    tracing::info!(session_id = %session.id, "Session started");
    let session_provider: Arc<dyn SessionProvider> = sessions;

    let metric_store = InMemoryMetricStore::new_shared();
    let resource_store = InMemoryResourceStore::new_shared();
    let trace_store = InMemoryTraceStore::new_shared();
    let uploader = Arc::new(LoggingUploader);

    let (worker, persistence) = PersistenceWorker::new(
        trace_store.clone(),
        collection_config.persistence_queue_capacity,
    );
    tokio::spawn(worker.run());

    let trace_manager = Arc::new(TraceManager::new(
        session_provider.clone(),
        persistence.clone(),
    ));

    let provider = StaticConfigurationProvider::new()
        .with_collector(Arc::new(sim::SimulatedCpuCollector::new(
            collection_config.sample_interval,
        )))
        .with_collector(Arc::new(sim::SimulatedMemoryCollector::new(
            collection_config.sample_interval,
        )))
        .with_listener(Arc::new(sim::SimulatedNetworkListener::new(
            Duration::from_millis(700),
        )));

    let manager = DataManager::new(
        DataManagerDeps {
            registry: FormatterRegistry::with_defaults(),
            trace_manager: trace_manager.clone(),
            metric_store: metric_store.clone(),
            resource_store: resource_store.clone(),
            sessions: session_provider,
            provider: Arc::new(provider),
            permissions: Arc::new(AllowAllPermissions),
            uploader: uploader.clone(),
            persistence,
            flush_config,
        },
        TraceFlusher::new(trace_store.clone(), resource_store.clone(), uploader),
    );

    // Device facts a host platform would report once at startup.
    for fact in sim::device_facts() {
        manager.handle_received_data(&fact)?;
    }

    manager.start_collection();
    manager.start_sending();

    // Simulate the user navigating between two screens.
    let screens = ["MainScreen", "DetailScreen"];
    let deadline = tokio::time::Instant::now() + Duration::from_secs(duration_secs);
    let mut screen_index = 0;
    while tokio::time::Instant::now() < deadline {
        let now_ms = shared::chrono::Utc::now().timestamp_millis();
        let root_span_id = trace_manager.create_span_id(true);
        manager.handle_received_data(&MeasurementRecord::new(
            DataSourceType::ViewLifecycle,
            MeasurementValue::View(ViewEvent {
                name: screens[screen_index % screens.len()].to_string(),
                start_time_ms: now_ms,
                end_time_ms: now_ms + 2_000,
                span_id: root_span_id,
                parent_span_id: None,
            }),
        ))?;
        screen_index += 1;

        tokio::time::sleep(Duration::from_secs(2).min(deadline - tokio::time::Instant::now()))
            .await;
    }

    // One simulated cold-start figure for the startup metric.
    manager.handle_received_data(&MeasurementRecord::integer(DataSourceType::AppStartup, 1250))?;

    manager.shutdown().await;
    // The persistence worker drains asynchronously after the shutdown
    // command; give it a moment before the final flush.
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Flush whatever the scheduled jobs did not get to.
    let metrics_flushed = manager.flush_metrics_now().await?;
    let traces_flushed = manager.flush_traces_now().await?;

    println!("Demo finished:");
    println!("  metrics flushed at shutdown: {metrics_flushed}");
    println!("  traces flushed at shutdown:  {traces_flushed}");
    println!(
        "  left in stores: {} metrics, {} traces, {} resources",
        metric_store.count().map_err(anyhow::Error::new)?,
        trace_store.count().map_err(anyhow::Error::new)?,
        resource_store.count().map_err(anyhow::Error::new)?,
    );

    Ok(())
}
