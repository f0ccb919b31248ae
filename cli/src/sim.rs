//! Simulated producers for the demo pipeline.
//!
//! Stand-ins for the platform collectors and listeners a real host
//! application would register: a random-walk CPU sampler, a memory
//! sampler, and an HTTP listener that fabricates a network call every few
//! hundred milliseconds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use sdk::producers::{DataCollector, DataListener, MeasurementSink};
use shared::ids;
use shared::models::{DataSourceType, MeasurementRecord, MeasurementValue, NetworkCallData};

/// Random-walk CPU usage sampler.
pub struct SimulatedCpuCollector {
    interval: Duration,
    last_pct: Mutex<f64>,
}

impl SimulatedCpuCollector {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_pct: Mutex::new(20.0),
        }
    }
}

impl DataCollector for SimulatedCpuCollector {
    fn source(&self) -> DataSourceType {
        DataSourceType::AppCpu
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn collect(&self) -> MeasurementRecord {
        let mut last = self.last_pct.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let step: f64 = rand::thread_rng().gen_range(-5.0..5.0);
        *last = (*last + step).clamp(0.0, 100.0);
        MeasurementRecord::double(DataSourceType::AppCpu, *last)
    }
}

/// Slowly growing app memory sampler.
pub struct SimulatedMemoryCollector {
    interval: Duration,
    bytes: Mutex<i64>,
}

impl SimulatedMemoryCollector {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            bytes: Mutex::new(48 * 1024 * 1024),
        }
    }
}

impl DataCollector for SimulatedMemoryCollector {
    fn source(&self) -> DataSourceType {
        DataSourceType::AppMemory
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn collect(&self) -> MeasurementRecord {
        let mut bytes = self.bytes.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let growth: i64 = rand::thread_rng().gen_range(0..512 * 1024);
        *bytes += growth;
        MeasurementRecord::integer(DataSourceType::AppMemory, *bytes)
    }
}

const DEMO_URLS: [&str; 3] = [
    "https://api.example.com/users/me",
    "https://api.example.com/feed?page=2",
    "https://cdn.example.com/assets/logo.png",
];

/// Listener fabricating a completed network call on a fixed cadence.
pub struct SimulatedNetworkListener {
    cadence: Duration,
    running: Arc<AtomicBool>,
}

impl SimulatedNetworkListener {
    pub fn new(cadence: Duration) -> Self {
        Self {
            cadence,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    fn fabricate_call() -> NetworkCallData {
        let mut rng = rand::thread_rng();
        let now_ms = chrono_now_ms();
        let elapsed = rng.gen_range(20..400);
        NetworkCallData {
            method: "GET".to_string(),
            url: DEMO_URLS[rng.gen_range(0..DEMO_URLS.len())].to_string(),
            status_code: if rng.gen_range(0..10) == 0 { 503 } else { 200 },
            request_size: rng.gen_range(64..512),
            response_size: rng.gen_range(256..16_384),
            start_time_ms: now_ms - elapsed,
            end_time_ms: now_ms,
            span_id: ids::new_span_id(),
            parent_span_id: None,
        }
    }
}

fn chrono_now_ms() -> i64 {
    shared::chrono::Utc::now().timestamp_millis()
}

impl DataListener for SimulatedNetworkListener {
    fn source(&self) -> DataSourceType {
        DataSourceType::NetworkCall
    }

    fn start(&self, sink: MeasurementSink) {
        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let cadence = self.cadence;

        tokio::spawn(async move {
            let mut tick = tokio::time::interval(cadence);
            tick.tick().await;
            while running.load(Ordering::SeqCst) {
                tick.tick().await;
                sink.push(MeasurementRecord::new(
                    DataSourceType::NetworkCall,
                    MeasurementValue::Network(Self::fabricate_call()),
                ));
            }
        });
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// One-shot device facts a host platform would report at startup.
pub fn device_facts() -> Vec<MeasurementRecord> {
    vec![
        MeasurementRecord::text(DataSourceType::DeviceId, ids::new_trace_id()),
        MeasurementRecord::text(DataSourceType::DeviceModel, "Pixel 8"),
        MeasurementRecord::text(DataSourceType::OsVersion, "14"),
        MeasurementRecord::text(DataSourceType::DeviceLocale, "en_US"),
        MeasurementRecord::text(DataSourceType::CarrierName, "Vodafone"),
        MeasurementRecord::text(DataSourceType::NetworkType, "wifi"),
        MeasurementRecord::flag(DataSourceType::RootedDevice, false),
    ]
}
