//! Unified error types for the Sense firmware.
//!
//! The dispatch core reports capacity exhaustion through plain return
//! values (`bool` / `Option`).  This enum names the same conditions so
//! adapters and logs can talk about them uniformly, and carries the
//! sensor / bring-up / configuration failures of the outer layers.
//! All variants are `Copy`.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An event queue or the worker task queue is at capacity.
    QueueFull,
    /// Every subscriber slot is occupied.
    TableFull,
    /// A subscription token is stale or belongs to another table.
    InvalidToken,
    /// The operation is already in progress (e.g. a blink sequence).
    Busy,
    /// A sensor could not be read.
    Sensor(SensorError),
    /// Bring-up of a subsystem failed.
    Init(&'static str),
    /// Configuration is invalid or could not be parsed.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "queue full"),
            Self::TableFull => write!(f, "subscriber table full"),
            Self::InvalidToken => write!(f, "invalid subscription token"),
            Self::Busy => write!(f, "busy"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The bus transaction failed or timed out.
    ReadFailed,
    /// A sample was requested before `enable()`.
    NotEnabled,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed => write!(f, "read failed"),
            Self::NotEnabled => write!(f, "sensor not enabled"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
