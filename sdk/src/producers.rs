//! Producer traits: data collectors, data listeners, and their wiring.
//!
//! Producers are the external edge of the pipeline. A [`DataCollector`] is
//! polled on a recurring cadence; a [`DataListener`] registers with its
//! source (HTTP stack, lifecycle callbacks, crash handler) and pushes
//! records through a [`MeasurementSink`] as events happen. The
//! [`ConfigurationProvider`] decides which producers exist and what OS
//! permissions they need; the [`PermissionGate`] answers whether those
//! permissions are granted.

use std::sync::Arc;
use std::time::Duration;

use shared::models::{DataSourceType, MeasurementRecord};

/// An OS permission a producer needs before it may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Read access to network state.
    AccessNetworkState,
    /// Read access to telephony state (carrier, network type).
    ReadPhoneState,
    /// Outbound network access.
    Internet,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccessNetworkState => write!(f, "access_network_state"),
            Self::ReadPhoneState => write!(f, "read_phone_state"),
            Self::Internet => write!(f, "internet"),
        }
    }
}

/// Answers whether a permission has been granted to the host application.
pub trait PermissionGate: Send + Sync {
    /// True when the permission is granted.
    fn is_granted(&self, permission: Permission) -> bool;
}

/// A gate that grants everything; the default outside Android test rigs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllPermissions;

impl PermissionGate for AllowAllPermissions {
    fn is_granted(&self, _permission: Permission) -> bool {
        true
    }
}

/// Delivery handle producers use to push records into the data manager.
#[derive(Clone)]
pub struct MeasurementSink {
    deliver: Arc<dyn Fn(MeasurementRecord) + Send + Sync>,
}

impl MeasurementSink {
    /// Creates a sink delivering records to `deliver`.
    pub fn new(deliver: impl Fn(MeasurementRecord) + Send + Sync + 'static) -> Self {
        Self {
            deliver: Arc::new(deliver),
        }
    }

    /// Pushes one record into the pipeline.
    pub fn push(&self, record: MeasurementRecord) {
        (self.deliver)(record);
    }
}

impl std::fmt::Debug for MeasurementSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementSink").finish_non_exhaustive()
    }
}

/// A producer polled on a recurring cadence.
pub trait DataCollector: Send + Sync {
    /// The source type of the records this collector produces.
    fn source(&self) -> DataSourceType;

    /// How often this collector wants to be polled.
    fn interval(&self) -> Duration;

    /// Permissions that must be granted before this collector may run.
    fn required_permissions(&self) -> Vec<Permission> {
        Vec::new()
    }

    /// Takes one measurement.
    ///
    /// A collector whose sensor has nothing to report returns a record
    /// with [`shared::models::MeasurementValue::Null`] content rather than
    /// failing.
    fn collect(&self) -> MeasurementRecord;
}

/// An event-driven producer that registers with its source.
pub trait DataListener: Send + Sync {
    /// The source type of the records this listener produces.
    fn source(&self) -> DataSourceType;

    /// Permissions that must be granted before this listener may start.
    fn required_permissions(&self) -> Vec<Permission> {
        Vec::new()
    }

    /// Registers with the underlying source and starts pushing records.
    fn start(&self, sink: MeasurementSink);

    /// Unregisters from the underlying source.
    fn stop(&self);
}

/// Provides the registered producers and their permission requirements.
///
/// Consulted once per `start_collection` call.
pub trait ConfigurationProvider: Send + Sync {
    /// The recurring collectors to schedule.
    fn recurring_collectors(&self) -> Vec<Arc<dyn DataCollector>>;

    /// The event-driven listeners to start.
    fn listeners(&self) -> Vec<Arc<dyn DataListener>>;

    /// Permissions the whole producer set depends on.
    fn required_permissions(&self) -> Vec<Permission>;
}

/// A fixed producer set, assembled by the composition root.
#[derive(Default)]
pub struct StaticConfigurationProvider {
    collectors: Vec<Arc<dyn DataCollector>>,
    listeners: Vec<Arc<dyn DataListener>>,
}

impl StaticConfigurationProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a recurring collector.
    #[must_use]
    pub fn with_collector(mut self, collector: Arc<dyn DataCollector>) -> Self {
        self.collectors.push(collector);
        self
    }

    /// Adds an event-driven listener.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn DataListener>) -> Self {
        self.listeners.push(listener);
        self
    }
}

impl ConfigurationProvider for StaticConfigurationProvider {
    fn recurring_collectors(&self) -> Vec<Arc<dyn DataCollector>> {
        self.collectors.clone()
    }

    fn listeners(&self) -> Vec<Arc<dyn DataListener>> {
        self.listeners.clone()
    }

    fn required_permissions(&self) -> Vec<Permission> {
        let mut permissions: Vec<Permission> = self
            .collectors
            .iter()
            .flat_map(|c| c.required_permissions())
            .chain(self.listeners.iter().flat_map(|l| l.required_permissions()))
            .collect();
        permissions.dedup();
        permissions
    }
}
