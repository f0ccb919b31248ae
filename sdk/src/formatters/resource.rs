//! Resource label formatter.
//!
//! Each device/app fact source maps 1:1 onto a fixed canonical dotted key;
//! the formatter stringifies the scalar content and wraps it into a single
//! [`ResourceLabel`]. Boolean content is rendered `"true"`/`"false"`.

use shared::models::{resource, DataSourceType, MeasurementRecord, MeasurementValue, ResourceLabel};

use super::{FormattedOutput, Formatter};

/// Formats one scalar fact into a resource label under a fixed key.
pub struct ResourceFormatter {
    key: &'static str,
}

impl ResourceFormatter {
    /// The canonical key per resource-producing source type.
    pub const CANONICAL_KEYS: [(DataSourceType, &'static str); 7] = [
        (DataSourceType::DeviceId, resource::DEVICE_ID),
        (DataSourceType::CarrierName, resource::DEVICE_CARRIER),
        (DataSourceType::DeviceLocale, resource::DEVICE_LOCALE),
        (DataSourceType::DeviceModel, resource::DEVICE_MODEL),
        (DataSourceType::OsVersion, resource::OS_VERSION),
        (DataSourceType::RootedDevice, resource::DEVICE_ROOTED),
        (DataSourceType::NetworkType, resource::NETWORK_TYPE),
    ];

    /// Creates a formatter emitting labels under `key`.
    #[must_use]
    pub fn new(key: &'static str) -> Self {
        Self { key }
    }
}

impl Formatter for ResourceFormatter {
    fn format(&self, record: &MeasurementRecord) -> Vec<FormattedOutput> {
        let value = match &record.value {
            MeasurementValue::Text(s) => s.clone(),
            MeasurementValue::Flag(b) => b.to_string(),
            MeasurementValue::Integer(i) => i.to_string(),
            MeasurementValue::Double(d) => d.to_string(),
            _ => return Vec::new(),
        };

        vec![FormattedOutput::Resource(ResourceLabel::new(
            self.key, value,
        ))]
    }
}
