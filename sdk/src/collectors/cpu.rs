//! CPU stat parsing and the system CPU collector.
//!
//! Parses the kernel's `stat` text formats: the per-process
//! `/proc/<pid>/stat` line and the aggregate `cpu` line of `/proc/stat`.
//! The [`SystemCpuCollector`] turns two consecutive aggregate samples into
//! per-state usage percentages.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use shared::models::{DataSourceType, MeasurementRecord, MeasurementValue, SystemCpuSample};
use thiserror::Error;

use crate::producers::DataCollector;

/// Errors from parsing kernel stat lines.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CpuStatParseError {
    /// The comm field's closing parenthesis is missing.
    #[error("Malformed stat line: no closing parenthesis around comm")]
    MalformedComm,

    /// A required field is missing.
    #[error("Missing stat field: {0}")]
    MissingField(&'static str),

    /// A field could not be parsed as a number.
    #[error("Invalid number in stat field {field}: {value}")]
    InvalidNumber {
        /// The field name.
        field: &'static str,
        /// The offending token.
        value: String,
    },
}

/// CPU accounting of one process, from `/proc/<pid>/stat`.
#[derive(Debug, Clone, PartialEq)]
pub struct PidCpuStat {
    /// Clock ticks spent in user mode.
    pub utime: i64,
    /// Clock ticks spent in kernel mode.
    pub stime: i64,
    /// Clock ticks waited-for children spent in user mode.
    pub cutime: i64,
    /// Clock ticks waited-for children spent in kernel mode.
    pub cstime: i64,
    /// Process start, clock ticks since boot.
    ///
    /// Held in single precision; large tick counts round to the nearest
    /// representable value.
    pub start_time: f32,
}

/// Aggregate CPU time of the whole system, from the `cpu` line of
/// `/proc/stat`, in clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemCpuStat {
    /// Time running user-space processes.
    pub user: i64,
    /// Time running niced user-space processes.
    pub nice: i64,
    /// Time running kernel code.
    pub system: i64,
    /// Idle time.
    pub idle: i64,
    /// Time waiting on I/O completion.
    pub iowait: i64,
    /// Time servicing hardware interrupts.
    pub irq: i64,
    /// Time servicing software interrupts.
    pub softirq: i64,
}

impl SystemCpuStat {
    /// Sum of all accounted ticks.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.user + self.nice + self.system + self.idle + self.iowait + self.irq + self.softirq
    }
}

fn parse_field(tokens: &[&str], index: usize, field: &'static str) -> Result<i64, CpuStatParseError> {
    let token = tokens
        .get(index)
        .ok_or(CpuStatParseError::MissingField(field))?;
    token.parse().map_err(|_| CpuStatParseError::InvalidNumber {
        field,
        value: (*token).to_string(),
    })
}

/// Parses one `/proc/<pid>/stat` line.
///
/// The comm field may itself contain spaces, so fields are counted from
/// the closing parenthesis: after it, `utime` is the 12th token and
/// `starttime` the 20th.
///
/// # Errors
///
/// Returns an error when the line is malformed or a needed field is
/// missing or non-numeric.
pub fn parse_pid_cpu_stat(line: &str) -> Result<PidCpuStat, CpuStatParseError> {
    let after_comm = line
        .rfind(')')
        .map(|i| &line[i + 1..])
        .ok_or(CpuStatParseError::MalformedComm)?;

    let tokens: Vec<&str> = after_comm.split_whitespace().collect();

    let start_time_token = tokens
        .get(19)
        .ok_or(CpuStatParseError::MissingField("starttime"))?;
    let start_time: f32 =
        start_time_token
            .parse()
            .map_err(|_| CpuStatParseError::InvalidNumber {
                field: "starttime",
                value: (*start_time_token).to_string(),
            })?;

    Ok(PidCpuStat {
        utime: parse_field(&tokens, 11, "utime")?,
        stime: parse_field(&tokens, 12, "stime")?,
        cutime: parse_field(&tokens, 13, "cutime")?,
        cstime: parse_field(&tokens, 14, "cstime")?,
        start_time,
    })
}

/// Parses the aggregate `cpu` line of `/proc/stat`.
///
/// # Errors
///
/// Returns an error when the line does not start with `cpu` or a needed
/// field is missing or non-numeric.
pub fn parse_system_stat(line: &str) -> Result<SystemCpuStat, CpuStatParseError> {
    let mut tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.first() != Some(&"cpu") {
        return Err(CpuStatParseError::MissingField("cpu"));
    }
    tokens.remove(0);

    Ok(SystemCpuStat {
        user: parse_field(&tokens, 0, "user")?,
        nice: parse_field(&tokens, 1, "nice")?,
        system: parse_field(&tokens, 2, "system")?,
        idle: parse_field(&tokens, 3, "idle")?,
        iowait: parse_field(&tokens, 4, "iowait")?,
        irq: parse_field(&tokens, 5, "irq")?,
        softirq: parse_field(&tokens, 6, "softirq")?,
    })
}

/// Turns two consecutive aggregate samples into per-state percentages.
///
/// Returns `None` when no time has passed between the samples.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn usage_between(previous: &SystemCpuStat, current: &SystemCpuStat) -> Option<SystemCpuSample> {
    let delta_total = current.total() - previous.total();
    if delta_total <= 0 {
        return None;
    }

    let pct = |prev: i64, curr: i64| ((curr - prev) as f64 / delta_total as f64) * 100.0;

    Some(SystemCpuSample {
        user: pct(previous.user, current.user),
        system: pct(previous.system, current.system),
        nice: pct(previous.nice, current.nice),
        idle: pct(previous.idle, current.idle),
        iowait: pct(previous.iowait, current.iowait),
        irq: pct(previous.irq, current.irq),
        softirq: pct(previous.softirq, current.softirq),
    })
}

/// Recurring collector for per-state system CPU usage.
///
/// Needs two samples before it can report a delta, so the first poll (and
/// any poll where the stat file is unreadable) yields a record with null
/// content - the transient-absent case, not an error.
pub struct SystemCpuCollector {
    stat_path: PathBuf,
    interval: Duration,
    previous: Mutex<Option<SystemCpuStat>>,
}

impl SystemCpuCollector {
    /// Creates a collector reading `/proc/stat` on the given cadence.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self::with_stat_path("/proc/stat", interval)
    }

    /// Creates a collector reading an alternative stat file (tests).
    #[must_use]
    pub fn with_stat_path(stat_path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            stat_path: stat_path.into(),
            interval,
            previous: Mutex::new(None),
        }
    }

    fn read_stat(&self) -> Option<SystemCpuStat> {
        let contents = std::fs::read_to_string(&self.stat_path).ok()?;
        let cpu_line = contents.lines().find(|l| l.starts_with("cpu "))?;
        parse_system_stat(cpu_line).ok()
    }
}

impl DataCollector for SystemCpuCollector {
    fn source(&self) -> DataSourceType {
        DataSourceType::SystemCpu
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn collect(&self) -> MeasurementRecord {
        let Some(current) = self.read_stat() else {
            return MeasurementRecord::null(DataSourceType::SystemCpu);
        };

        let mut previous = self
            .previous
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let sample = previous
            .replace(current)
            .and_then(|prev| usage_between(&prev, &current));

        match sample {
            Some(sample) => MeasurementRecord::new(
                DataSourceType::SystemCpu,
                MeasurementValue::CpuSample(sample),
            ),
            None => MeasurementRecord::null(DataSourceType::SystemCpu),
        }
    }
}
