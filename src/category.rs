//! Metric categories and the selector mask built from them.

use crate::error::ConfigError;
use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// A set of metric categories.
    ///
    /// Single flags name one reading in a [`Snapshot`](crate::Snapshot);
    /// combinations are only meaningful as selectors.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct MetricCategory: u8 {
        /// Number of live OS threads in the process.
        const THREADS = 1;
        /// Heap allocation statistics.
        const MEMORY = 1 << 1;
    }
}

impl MetricCategory {
    /// Selects nothing; sampling produces empty snapshots.
    pub const NONE: Self = Self::empty();

    /// The selector used when none is configured.
    pub const DEFAULT: Self = Self::THREADS.union(Self::MEMORY);

    /// Stable display name for a single category.
    ///
    /// Combinations of more than one flag have no name of their own and
    /// render as `"Unknown"`.
    pub fn name(&self) -> &'static str {
        if self.is_empty() {
            "None"
        } else if *self == Self::THREADS {
            "Threads"
        } else if *self == Self::MEMORY {
            "Memory"
        } else {
            "Unknown"
        }
    }

    /// Lowercase key used in serialized selectors and snapshots.
    pub(crate) fn key(&self) -> &'static str {
        if *self == Self::THREADS {
            "threads"
        } else if *self == Self::MEMORY {
            "memory"
        } else if self.is_empty() {
            "none"
        } else {
            "unknown"
        }
    }

    /// Renders the selector as `|`-separated keys, e.g. `threads|memory`.
    pub fn to_selector_string(&self) -> String {
        if self.is_empty() {
            return "none".to_string();
        }
        self.iter()
            .map(|flag| flag.key())
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl Default for MetricCategory {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricCategory {
    type Err = ConfigError;

    /// Parses `none`, `all`, or a list of category names separated by commas,
    /// pipes, or whitespace. Matching is case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut selector = Self::NONE;
        for token in s
            .split(|c: char| c == ',' || c == '|' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            match token.to_ascii_lowercase().as_str() {
                "none" => {}
                "all" => selector |= Self::all(),
                "threads" => selector |= Self::THREADS,
                "memory" => selector |= Self::MEMORY,
                other => return Err(ConfigError::UnknownCategory(other.to_string())),
            }
        }
        Ok(selector)
    }
}

impl Serialize for MetricCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_selector_string())
    }
}

impl<'de> Deserialize<'de> for MetricCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
