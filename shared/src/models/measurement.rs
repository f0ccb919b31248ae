//! Measurement records produced by data collectors and listeners.
//!
//! A [`MeasurementRecord`] is the generic envelope every producer hands to
//! the data manager: the producer's declared source type plus the observed
//! content. Records are immutable and consumed exactly once by the dispatch
//! step.

use serde::{Deserialize, Serialize};

/// The closed set of telemetry producers.
///
/// Dispatch from a record to its formatter is keyed by this enum; there is
/// exactly one formatter per registered source type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceType {
    /// Per-state system CPU usage sampled from the OS.
    SystemCpu,
    /// CPU usage of the instrumented application process.
    AppCpu,
    /// Total system memory in use.
    SystemMemory,
    /// Memory in use by the instrumented application process.
    AppMemory,
    /// A completed HTTP call made by the application.
    NetworkCall,
    /// An uncaught exception terminating the application.
    Crash,
    /// A screen/view becoming active or inactive.
    ViewLifecycle,
    /// Time from process start to the first usable frame.
    AppStartup,
    /// The installation-scoped device identifier.
    DeviceId,
    /// The mobile carrier name.
    CarrierName,
    /// The device locale.
    DeviceLocale,
    /// The device model string.
    DeviceModel,
    /// The operating system version.
    OsVersion,
    /// Whether the device appears to be rooted.
    RootedDevice,
    /// The active network transport (wifi, cellular, ...).
    NetworkType,
}

impl std::fmt::Display for DataSourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::SystemCpu => "system_cpu",
            Self::AppCpu => "app_cpu",
            Self::SystemMemory => "system_memory",
            Self::AppMemory => "app_memory",
            Self::NetworkCall => "network_call",
            Self::Crash => "crash",
            Self::ViewLifecycle => "view_lifecycle",
            Self::AppStartup => "app_startup",
            Self::DeviceId => "device_id",
            Self::CarrierName => "carrier_name",
            Self::DeviceLocale => "device_locale",
            Self::DeviceModel => "device_model",
            Self::OsVersion => "os_version",
            Self::RootedDevice => "rooted_device",
            Self::NetworkType => "network_type",
        };
        write!(f, "{name}")
    }
}

/// A completed network call as observed by the HTTP instrumentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkCallData {
    /// HTTP method, e.g. `GET`.
    pub method: String,
    /// The full request URL.
    pub url: String,
    /// HTTP response status code.
    pub status_code: u16,
    /// Request body size in bytes.
    pub request_size: i64,
    /// Response body size in bytes.
    pub response_size: i64,
    /// Call start, epoch milliseconds.
    pub start_time_ms: i64,
    /// Call end, epoch milliseconds.
    pub end_time_ms: i64,
    /// Span id allocated for this call at request time.
    pub span_id: String,
    /// Span id of the enclosing operation, if any.
    pub parent_span_id: Option<String>,
}

/// A single frame of a captured stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Fully qualified class or module name.
    pub class_name: String,
    /// Function or method name.
    pub function: String,
    /// Source file, when known.
    pub file: Option<String>,
    /// Line number, `0` when unknown.
    pub line: i64,
}

/// One exception in a cause chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionData {
    /// Fully qualified exception class name.
    pub class_name: String,
    /// The exception message, if any.
    pub message: Option<String>,
    /// Stack frames at the throw site.
    pub frames: Vec<StackFrame>,
    /// The exception this one wraps, if any.
    pub cause: Option<Box<ExceptionData>>,
}

impl ExceptionData {
    /// Walks the cause chain to the innermost exception.
    #[must_use]
    pub fn root_cause(&self) -> &ExceptionData {
        let mut current = self;
        while let Some(cause) = current.cause.as_deref() {
            current = cause;
        }
        current
    }

    /// Class names along the chain, outermost first.
    #[must_use]
    pub fn chain_class_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = Some(self);
        while let Some(exception) = current {
            names.push(exception.class_name.clone());
            current = exception.cause.as_deref();
        }
        names
    }
}

/// The captured stack of one thread at crash time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    /// Thread name.
    pub name: String,
    /// Thread id.
    pub id: i64,
    /// True for the thread the exception was thrown on.
    pub crashed: bool,
    /// Stack frames, innermost first.
    pub frames: Vec<StackFrame>,
}

/// Everything captured at the moment of an uncaught exception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashData {
    /// The thrown exception with its cause chain.
    pub exception: ExceptionData,
    /// All thread stacks captured at crash time.
    pub threads: Vec<ThreadSnapshot>,
    /// Crash instant, epoch milliseconds.
    pub crashed_at_ms: i64,
}

/// A per-state system CPU sample, values in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemCpuSample {
    /// Time running user-space processes.
    pub user: f64,
    /// Time running kernel code.
    pub system: f64,
    /// Time running niced user-space processes.
    pub nice: f64,
    /// Idle time.
    pub idle: f64,
    /// Time waiting on I/O completion.
    pub iowait: f64,
    /// Time servicing hardware interrupts.
    pub irq: f64,
    /// Time servicing software interrupts.
    pub softirq: f64,
}

impl SystemCpuSample {
    /// The sample as `(state name, value)` pairs, in canonical order.
    #[must_use]
    pub fn states(&self) -> [(&'static str, f64); 7] {
        [
            ("user", self.user),
            ("system", self.system),
            ("nice", self.nice),
            ("idle", self.idle),
            ("iowait", self.iowait),
            ("irq", self.irq),
            ("softirq", self.softirq),
        ]
    }
}

/// A screen/view lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewEvent {
    /// The screen name.
    pub name: String,
    /// View became active, epoch milliseconds.
    pub start_time_ms: i64,
    /// View stopped being active, epoch milliseconds.
    pub end_time_ms: i64,
    /// Span id allocated for this view.
    pub span_id: String,
    /// Span id of the enclosing view, if any.
    pub parent_span_id: Option<String>,
}

/// The observed content of a measurement.
///
/// `Null` is a first-class value: a sensor that could not produce a reading
/// reports `Null` rather than erroring, and formatters turn it into an empty
/// output sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementValue {
    /// No reading was available.
    Null,
    /// An integer scalar.
    Integer(i64),
    /// A floating-point scalar.
    Double(f64),
    /// A string scalar.
    Text(String),
    /// A boolean scalar.
    Flag(bool),
    /// A completed network call.
    Network(NetworkCallData),
    /// An uncaught exception.
    Crash(CrashData),
    /// A per-state system CPU sample.
    CpuSample(SystemCpuSample),
    /// A view lifecycle event.
    View(ViewEvent),
}

impl MeasurementValue {
    /// Returns the integer scalar, if that is what this value holds.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the floating-point scalar, if that is what this value holds.
    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns true when no reading was available.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// The envelope a producer hands to the data manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// The producer this record came from.
    pub source: DataSourceType,
    /// The observed content.
    pub value: MeasurementValue,
}

impl MeasurementRecord {
    /// Creates a new record.
    #[must_use]
    pub fn new(source: DataSourceType, value: MeasurementValue) -> Self {
        Self { source, value }
    }

    /// Creates a record for a sensor that had nothing to report.
    #[must_use]
    pub fn null(source: DataSourceType) -> Self {
        Self::new(source, MeasurementValue::Null)
    }

    /// Creates an integer-valued record.
    #[must_use]
    pub fn integer(source: DataSourceType, value: i64) -> Self {
        Self::new(source, MeasurementValue::Integer(value))
    }

    /// Creates a floating-point-valued record.
    #[must_use]
    pub fn double(source: DataSourceType, value: f64) -> Self {
        Self::new(source, MeasurementValue::Double(value))
    }

    /// Creates a string-valued record.
    #[must_use]
    pub fn text(source: DataSourceType, value: impl Into<String>) -> Self {
        Self::new(source, MeasurementValue::Text(value.into()))
    }

    /// Creates a boolean-valued record.
    #[must_use]
    pub fn flag(source: DataSourceType, value: bool) -> Self {
        Self::new(source, MeasurementValue::Flag(value))
    }
}
