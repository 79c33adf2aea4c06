//! Proximity sampling loop.
//!
//! Runs on its own thread: every period, read one sample and publish it.
//! A failed read is logged and skipped.  A full event queue drops the
//! sample (no retry; the next period brings a fresher one).

use core::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::events::Event;
use crate::ports::ProximitySensor;
use crate::pubsub::PubSub;

/// Counters kept by the sampling loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplingStats {
    pub published: u32,
    pub dropped: u32,
    pub read_failures: u32,
}

pub struct SamplingLoop<S> {
    sensor: S,
    period: Duration,
    stats: SamplingStats,
}

impl<S: ProximitySensor> SamplingLoop<S> {
    pub fn new(sensor: S, period: Duration) -> Self {
        Self {
            sensor,
            period,
            stats: SamplingStats::default(),
        }
    }

    pub fn stats(&self) -> SamplingStats {
        self.stats
    }

    /// Read one sample and publish it.
    ///
    /// Returns the sample, `Error::Sensor` if the read failed, or
    /// `Error::QueueFull` if the event was dropped.
    pub fn sample_once<'a, const C: usize, const N: usize>(
        &mut self,
        pubsub: &'a PubSub<'a, Event, C, N>,
    ) -> Result<u16> {
        let sample = match self.sensor.read_sample() {
            Ok(sample) => sample,
            Err(e) => {
                self.stats.read_failures += 1;
                return Err(e);
            }
        };
        if !pubsub.publish(Event::ProximitySample(sample)) {
            self.stats.dropped += 1;
            return Err(Error::QueueFull);
        }
        self.stats.published += 1;
        Ok(sample)
    }

    /// Enable the sensor, then sample on a fixed-rate schedule until
    /// `stop` is set.  Only enabling the sensor is fatal.
    pub fn run<'a, const C: usize, const N: usize>(
        &mut self,
        pubsub: &'a PubSub<'a, Event, C, N>,
        stop: &AtomicBool,
    ) -> Result<()> {
        self.sensor.enable()?;
        info!("sampling: started, period {:?}", self.period);

        let mut deadline = Instant::now();
        while !stop.load(Ordering::Acquire) {
            deadline += self.period;
            thread::sleep(deadline.saturating_duration_since(Instant::now()));

            match self.sample_once(pubsub) {
                Ok(_) => {}
                Err(Error::QueueFull) => debug!("sampling: event queue full, sample dropped"),
                Err(e) => warn!("sampling: failed to read proximity sample: {}", e),
            }
        }

        info!("sampling: stopped ({:?})", self.stats);
        Ok(())
    }
}
