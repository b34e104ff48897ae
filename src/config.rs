use crate::ids::MessageQueueId;
use serde::{Deserialize, Serialize};

/// Maximum number of housekeeping receivers one manager can hold.
pub const MAX_HK_RECEIVERS: usize = 32;
/// Maximum number of distinct update-reset helpers one manager can hold.
pub const MAX_RESET_HELPERS: usize = 32;
/// Default capacity of a pool owner's housekeeping queue.
pub const DEFAULT_QUEUE_DEPTH: usize = 20;

const DEFAULT_NON_DIAG_FACTOR: u8 = 5;
const DEFAULT_LOCK_TIMEOUT_MS: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HkManagerConfig {
    /// Scales the collection interval of regular (non-diagnostic) sets.
    pub non_diagnostic_interval_factor: u8,
    /// Append the per-variable validity bitmask to full HK packets.
    pub append_validity_buffer: bool,
    /// Default destination for periodic and update packets.
    pub hk_destination: Option<MessageQueueId>,
    /// Timeout for drop-time commits and per-variable protection.
    pub lock_timeout_ms: u32,
}

impl Default for HkManagerConfig {
    fn default() -> Self {
        Self {
            non_diagnostic_interval_factor: DEFAULT_NON_DIAG_FACTOR,
            append_validity_buffer: true,
            hk_destination: None,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }
}

impl HkManagerConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn lock_timeout(&self) -> core::time::Duration {
        core::time::Duration::from_millis(u64::from(self.lock_timeout_ms))
    }
}

/// One page class of the IPC store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorePageConfig {
    pub number_of_elements: u16,
    pub element_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Page classes, sorted by element size on use.
    pub pages: alloc::vec::Vec<StorePageConfig>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            pages: alloc::vec![
                StorePageConfig { number_of_elements: 32, element_size: 32 },
                StorePageConfig { number_of_elements: 16, element_size: 256 },
                StorePageConfig { number_of_elements: 8, element_size: 1024 },
            ],
        }
    }
}

impl StoreConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
