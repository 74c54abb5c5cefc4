use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lineage index behaviour switches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// When off, appends skip the index and every lookup scans.
    pub enabled: bool,
    /// Scan the block store when a key has no entry.
    pub scan_on_miss: bool,
    /// Bound on each individual key-value read.
    #[serde(with = "duration_ms")]
    pub read_timeout: Duration,
    /// Maximum key updates in flight for one block.
    pub write_concurrency: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_on_miss: true,
            read_timeout: Duration::from_secs(60),
            write_concurrency: 8,
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
