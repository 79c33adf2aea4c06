//! System configuration parameters
//!
//! Queue and table capacities are compile-time constants: they size the
//! static worker and pubsub and are never resized.  Everything else is a
//! runtime tunable that can be overridden from a JSON blob (NVS,
//! provisioning, test fixtures).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Capacity of the shared worker task queue.
pub const WORKER_QUEUE_DEPTH: usize = 8;

/// Capacity of the system pubsub event queue.
pub const EVENT_QUEUE_DEPTH: usize = 4;

/// Number of subscriber slots on the system pubsub.
pub const MAX_SUBSCRIBERS: usize = 4;

/// Longest worker thread name `SystemConfig` can hold.
pub const THREAD_NAME_LEN: usize = 16;

const DEFAULT_WORKER_THREAD_NAME: &str = "worker";
const _: () = assert!(DEFAULT_WORKER_THREAD_NAME.len() <= THREAD_NAME_LEN);

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Sampling ---
    /// Proximity sampling period (milliseconds)
    pub sampling_period_ms: u32,
    /// Proximity reading above which the indicator lights
    pub proximity_threshold: u16,

    // --- Buttons ---
    /// A level must hold this long before an edge is reported (milliseconds)
    pub button_debounce_ms: u32,

    // --- Worker thread ---
    /// Name given to the worker thread
    pub worker_thread_name: heapless::String<THREAD_NAME_LEN>,
    /// Worker thread stack size (bytes)
    pub worker_stack_size: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            sampling_period_ms: 100, // 10 Hz
            proximity_threshold: 1024,
            button_debounce_ms: 20,
            // Length checked at compile time above.
            worker_thread_name: heapless::String::try_from(DEFAULT_WORKER_THREAD_NAME)
                .unwrap_or_default(),
            worker_stack_size: 8 * 1024,
        }
    }
}

impl SystemConfig {
    /// Parse a (possibly partial) JSON override; missing fields keep
    /// their defaults.  The result is validated.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed JSON"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range values instead of clamping them.
    pub fn validate(&self) -> Result<()> {
        if self.sampling_period_ms == 0 {
            return Err(Error::Config("sampling_period_ms must be non-zero"));
        }
        if self.button_debounce_ms >= self.sampling_period_ms.saturating_mul(10) {
            return Err(Error::Config("button_debounce_ms is unreasonably long"));
        }
        if self.worker_thread_name.is_empty() {
            return Err(Error::Config("worker_thread_name must not be empty"));
        }
        if self.worker_stack_size < 4096 {
            return Err(Error::Config("worker_stack_size below 4 KiB"));
        }
        Ok(())
    }
}
