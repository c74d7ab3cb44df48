//! Time and memory sources for marks, plus record key/date formatting.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;

use std::fmt;
use std::time::{Duration, Instant};

/// Width of a microtimestamp key. Keys are right-padded with zeros to this
/// width so lexicographic order equals chronological order.
pub const MICRO_KEY_WIDTH: usize = 16;

/// Source of elapsed time and peak memory for marks.
pub trait Probe: Send {
    /// Time since the unit of work started.
    fn elapsed(&self) -> Duration;

    /// Peak resident memory of the process in bytes.
    fn peak_memory(&self) -> u64;

    /// Moves the start of the unit of work.
    fn restart_at(&mut self, start: Instant);
}

#[derive(Debug, Clone)]
pub struct SystemProbe {
    start: Instant,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for SystemProbe {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn peak_memory(&self) -> u64 {
        peak_resident_bytes().unwrap_or(0)
    }

    fn restart_at(&mut self, start: Instant) {
        self.start = start;
    }
}

/// `VmHWM` from `/proc/self/status`; `None` off Linux or on read failure.
fn peak_resident_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|l| l.starts_with("VmHWM:"))?;
    let kb: u64 = line
        .trim_start_matches("VmHWM:")
        .trim()
        .trim_end_matches("kB")
        .trim()
        .parse()
        .ok()?;
    Some(kb.saturating_mul(1024))
}

/// One/five/fifteen minute load averages, when the host exposes them.
pub fn load_average() -> Option<[f64; 3]> {
    let raw = std::fs::read_to_string("/proc/loadavg").ok()?;
    let mut parts = raw.split_whitespace().map(|s| s.parse::<f64>().ok());
    Some([parts.next()??, parts.next()??, parts.next()??])
}

/// Zero-padded microsecond timestamp naming one persisted record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MicroKey(String);

impl MicroKey {
    pub fn now() -> Self {
        Self::at(OffsetDateTime::now_utc())
    }

    pub fn at(t: OffsetDateTime) -> Self {
        let raw = format!("{}.{:06}", t.unix_timestamp(), t.microsecond());
        Self::from_raw(&raw)
    }

    /// Strips separators and right-pads with zeros.
    pub fn from_raw(raw: &str) -> Self {
        let mut digits: String = raw.chars().filter(|c| !matches!(c, '.' | ',')).collect();
        while digits.len() < MICRO_KEY_WIDTH {
            digits.push('0');
        }
        Self(digits)
    }

    /// Accepts a file stem only if it is exactly `MICRO_KEY_WIDTH` digits.
    pub fn parse(stem: &str) -> Option<Self> {
        (stem.len() == MICRO_KEY_WIDTH && stem.bytes().all(|b| b.is_ascii_digit()))
            .then(|| Self(stem.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MicroKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `YYYY-MM-DD HH:MM:SS`.
pub fn format_date(t: OffsetDateTime) -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    t.format(&fmt).unwrap_or_else(|_| t.unix_timestamp().to_string())
}
