//! Event metrics aggregator.
//!
//! Subscribed on the system pubsub; counts what flows through it.  The
//! counters are atomics so RPC handlers on other threads can read a
//! [`MetricsSnapshot`] without going through the worker.

use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};

use log::info;
use serde::{Deserialize, Serialize};

use crate::events::{ButtonEvent, Event};
use crate::pubsub::Subscriber;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub button_presses: u32,
    pub proximity_samples: u32,
    pub proximity_last: u16,
    pub proximity_min: u16,
    pub proximity_max: u16,
}

impl MetricsSnapshot {
    /// Encode for an RPC notification into `buf`.  Returns the used prefix.
    pub fn encode<'b>(&self, buf: &'b mut [u8]) -> postcard::Result<&'b mut [u8]> {
        postcard::to_slice(self, buf)
    }
}

pub struct EventMetrics {
    button_presses: AtomicU32,
    proximity_samples: AtomicU32,
    proximity_last: AtomicU16,
    proximity_min: AtomicU16,
    proximity_max: AtomicU16,
}

impl EventMetrics {
    pub const fn new() -> Self {
        Self {
            button_presses: AtomicU32::new(0),
            proximity_samples: AtomicU32::new(0),
            proximity_last: AtomicU16::new(0),
            proximity_min: AtomicU16::new(u16::MAX),
            proximity_max: AtomicU16::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let samples = self.proximity_samples.load(Ordering::Relaxed);
        MetricsSnapshot {
            button_presses: self.button_presses.load(Ordering::Relaxed),
            proximity_samples: samples,
            proximity_last: self.proximity_last.load(Ordering::Relaxed),
            // Report 0 rather than the sentinel before the first sample.
            proximity_min: if samples == 0 {
                0
            } else {
                self.proximity_min.load(Ordering::Relaxed)
            },
            proximity_max: self.proximity_max.load(Ordering::Relaxed),
        }
    }

    /// Write the current counters to the log.
    pub fn log(&self) {
        let s = self.snapshot();
        info!(
            "metrics: presses={} samples={} proximity last={} min={} max={}",
            s.button_presses, s.proximity_samples, s.proximity_last, s.proximity_min, s.proximity_max
        );
    }
}

impl Default for EventMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscriber<Event> for EventMetrics {
    fn on_event(&self, event: Event) {
        match event {
            Event::Button(ButtonEvent { pressed: true, .. }) => {
                self.button_presses.fetch_add(1, Ordering::Relaxed);
            }
            Event::Button(_) => {}
            Event::ProximitySample(value) => {
                self.proximity_last.store(value, Ordering::Relaxed);
                self.proximity_min.fetch_min(value, Ordering::Relaxed);
                self.proximity_max.fetch_max(value, Ordering::Relaxed);
                self.proximity_samples.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
