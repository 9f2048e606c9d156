//! Human-readable file size formatting.
//!
//! Sizes are rendered with a 1024 divisor (the unit shown is `KB`, **not**
//! `KiB`), exactly one decimal digit and thousands separators. Formatted
//! strings are memoized per exact byte count in a process-wide table.

use std::fmt;
use std::sync::LazyLock;

use dashmap::DashMap;

/// Unit abbreviations, in ascending 1024-steps. Anything at or beyond
/// 1024^4 stays in TB.
const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Upper bound on distinct memoized byte counts. Beyond this the string is
/// recomputed per call instead of growing the table.
const CACHE_CAPACITY: usize = 4096;

static FORMAT_CACHE: LazyLock<DashMap<u64, String>> = LazyLock::new(DashMap::new);

/// A non-negative file size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSize {
    bytes: u64,
}

impl FileSize {
    pub fn new(bytes: u64) -> Self {
        Self { bytes }
    }

    /// Raw byte count.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// The size formatted against the unit ladder.
    ///
    /// The unit index is `min(floor(log_1024(bytes)), 4)` and the value is
    /// `bytes / 1024^index`, rendered with one decimal digit and thousands
    /// separators: `23095254` gives `"22.0 MB"`, `0` gives `"0.0 B"` (zero
    /// never reaches the logarithm). Results are cached per byte count, so
    /// repeated calls are both cheap and deterministic.
    pub fn formatted(&self) -> String {
        if let Some(cached) = FORMAT_CACHE.get(&self.bytes) {
            return cached.clone();
        }

        let rendered = render(self.bytes);
        if FORMAT_CACHE.len() < CACHE_CAPACITY {
            FORMAT_CACHE.insert(self.bytes, rendered.clone());
        }
        rendered
    }

    /// The raw byte count with thousands separators and a literal `B` unit.
    /// Not cached.
    pub fn original(&self) -> String {
        format!("{} B", group_thousands(&self.bytes.to_string()))
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

fn render(bytes: u64) -> String {
    // floor(log_1024(bytes)) == ilog2(bytes) / 10, and the integer form is
    // exact at unit boundaries where float log can land a hair under.
    let unit_index = if bytes == 0 {
        0
    } else {
        ((bytes.ilog2() / 10) as usize).min(UNITS.len() - 1)
    };
    let value = bytes as f64 / 1024f64.powi(unit_index as i32);

    format!("{} {}", group_decimal(value), UNITS[unit_index])
}

/// Format a value with one decimal digit and thousands separators in the
/// integer part, e.g. `8881.83 -> "8,881.8"`.
fn group_decimal(value: f64) -> String {
    let rendered = format!("{value:.1}");
    match rendered.split_once('.') {
        Some((int_part, frac_part)) => format!("{}.{}", group_thousands(int_part), frac_part),
        None => group_thousands(&rendered),
    }
}

/// Insert `,` every three digits from the right.
fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && i % 3 == offset % 3 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
