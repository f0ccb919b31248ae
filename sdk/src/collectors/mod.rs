//! Built-in data collectors.
//!
//! Platform measurement logic mostly lives outside the core, behind the
//! producer traits. The collectors here are the portable pieces: kernel
//! stat-file parsing and the system CPU sampler built on it.

pub mod cpu;

pub use cpu::{
    parse_pid_cpu_stat, parse_system_stat, usage_between, CpuStatParseError, PidCpuStat,
    SystemCpuCollector, SystemCpuStat,
};
