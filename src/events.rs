//! Application events carried by the system pubsub.
//!
//! Events are produced by:
//! - the sampling loop (proximity samples, every sampling period)
//! - the button manager (debounced press / release edges)
//!
//! and consumed on the worker thread by the status indicator, the
//! metrics aggregator and any RPC notification bridge.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │ Sampling     │────▶│              │     │ StatusIndicator  │
//! │ ButtonManager│────▶│  PubSub<Event>│────▶│ EventMetrics     │
//! │ ...          │────▶│              │     │ RPC bridges      │
//! └──────────────┘     └──────────────┘     └──────────────────┘
//! ```

use serde::{Deserialize, Serialize};

/// The four user buttons on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ButtonId {
    A = 0,
    B = 1,
    X = 2,
    Y = 3,
}

impl ButtonId {
    pub const ALL: [ButtonId; 4] = [ButtonId::A, ButtonId::B, ButtonId::X, ButtonId::Y];
}

/// A debounced button edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEvent {
    pub id: ButtonId,
    pub pressed: bool,
}

/// Everything published on the system pubsub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A button changed state.
    Button(ButtonEvent),
    /// Raw proximity sensor reading (larger is closer).
    ProximitySample(u16),
}

impl Event {
    pub const fn pressed(id: ButtonId) -> Self {
        Self::Button(ButtonEvent { id, pressed: true })
    }

    pub const fn released(id: ButtonId) -> Self {
        Self::Button(ButtonEvent { id, pressed: false })
    }
}
