//! Traceline SDK Runtime
//!
//! This crate provides the runtime of the Traceline telemetry core: the
//! trace manager owning the single active trace, the formatter registry
//! converting raw measurements into canonical metrics/spans/resource
//! labels, the data manager coordinating dispatch and lifecycle, and the
//! periodic flush jobs feeding the upload client.
//!
//! # Architecture
//!
//! Producers (collectors and listeners) push [`shared::models::MeasurementRecord`]s
//! into the [`data_manager::DataManager`], which dispatches each record to
//! its formatter and routes the outputs: spans to the
//! [`trace_manager::TraceManager`], metrics and resource labels into the
//! store, crash reports straight to the [`uploader::Uploader`].
//! Independently, two scheduled flush jobs batch the stored records and
//! hand them to the uploader.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sdk::data_manager::{DataManager, DataManagerDeps};
//! use sdk::flush::TraceFlusher;
//! use sdk::formatters::FormatterRegistry;
//! use sdk::persistence::PersistenceWorker;
//! use sdk::producers::{AllowAllPermissions, StaticConfigurationProvider};
//! use sdk::session::{SessionManager, SessionProvider};
//! use sdk::trace_manager::TraceManager;
//! use sdk::uploader::LoggingUploader;
//! use shared::config::FlushConfig;
//! use shared::storage::{InMemoryMetricStore, InMemoryResourceStore, InMemoryTraceStore};
//!
//! # #[tokio::main] async fn main() {
//! let sessions = Arc::new(SessionManager::new());
//! sessions.start_session();
//! let sessions: Arc<dyn SessionProvider> = sessions;
//!
//! let trace_store = InMemoryTraceStore::new_shared();
//! let (worker, persistence) = PersistenceWorker::new(trace_store.clone(), 64);
//! tokio::spawn(worker.run());
//!
//! let trace_manager = Arc::new(TraceManager::new(sessions.clone(), persistence.clone()));
//! let metric_store = InMemoryMetricStore::new_shared();
//! let resource_store = InMemoryResourceStore::new_shared();
//! let uploader = Arc::new(LoggingUploader);
//!
//! let manager = DataManager::new(
//!     DataManagerDeps {
//!         registry: FormatterRegistry::with_defaults(),
//!         trace_manager,
//!         metric_store: metric_store.clone(),
//!         resource_store: resource_store.clone(),
//!         sessions,
//!         provider: Arc::new(StaticConfigurationProvider::new()),
//!         permissions: Arc::new(AllowAllPermissions),
//!         uploader: uploader.clone(),
//!         persistence,
//!         flush_config: FlushConfig::default(),
//!     },
//!     TraceFlusher::new(trace_store, resource_store, uploader),
//! );
//!
//! manager.start_collection();
//! manager.start_sending();
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod collectors;
pub mod data_manager;
pub mod flush;
pub mod formatters;
pub mod persistence;
pub mod producers;
pub mod scheduler;
pub mod session;
pub mod trace_manager;
pub mod uploader;

pub use data_manager::{DataManager, DataManagerDeps};
pub use trace_manager::TraceManager;
