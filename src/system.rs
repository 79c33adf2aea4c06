//! Process-wide wiring: the shared worker and the system pubsub.
//!
//! Both live in statics and are never torn down before the process
//! exits.  [`start`] may run once; it spawns the worker thread and
//! returns a [`System`] handle.  Subsystems receive `&'static` references
//! from that handle instead of reaching for the statics themselves.
//!
//! ```text
//!  start(config) ──▶ System { worker, pubsub }
//!                        │
//!      ┌─────────────────┼──────────────────────┐
//!      ▼                 ▼                      ▼
//!  SamplingLoop     ButtonManager      subscribers (indicator,
//!  (own thread)     (caller's loop)     metrics, RPC bridges)
//! ```

use core::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::info;

use crate::config::{EVENT_QUEUE_DEPTH, MAX_SUBSCRIBERS, SystemConfig, WORKER_QUEUE_DEPTH};
use crate::error::Error;
use crate::events::Event;
use crate::ports::ProximitySensor;
use crate::pubsub::PubSub;
use crate::sampling::{SamplingLoop, SamplingStats};
use crate::worker::Worker;

pub type SystemWorker = Worker<'static, WORKER_QUEUE_DEPTH>;
pub type SystemPubSub = PubSub<'static, Event, EVENT_QUEUE_DEPTH, MAX_SUBSCRIBERS>;

static WORKER: SystemWorker = Worker::new();
static PUBSUB: SystemPubSub = PubSub::new(&WORKER);

static STARTED: AtomicBool = AtomicBool::new(false);
static SAMPLING_STOP: AtomicBool = AtomicBool::new(false);

type SamplingHandle = JoinHandle<crate::error::Result<SamplingStats>>;

/// Handle to the running system.
pub struct System {
    worker: &'static SystemWorker,
    pubsub: &'static SystemPubSub,
    worker_thread: JoinHandle<()>,
    sampling_thread: Option<SamplingHandle>,
    config: SystemConfig,
}

/// Validate `config`, spawn the worker thread and hand out the system.
/// Fails if called more than once per process.
pub fn start(config: SystemConfig) -> Result<System> {
    config.validate().context("invalid system configuration")?;
    if STARTED.swap(true, Ordering::AcqRel) {
        return Err(Error::Init("system already started")).context("system start");
    }

    let worker_thread = thread::Builder::new()
        .name(config.worker_thread_name.to_string())
        .stack_size(config.worker_stack_size)
        .spawn(|| WORKER.run())
        .context("spawning worker thread")?;

    info!(
        "system: started (worker {} slots, {} events, {} subscribers)",
        WORKER.capacity(),
        PUBSUB.event_capacity(),
        PUBSUB.max_subscribers()
    );

    Ok(System {
        worker: &WORKER,
        pubsub: &PUBSUB,
        worker_thread,
        sampling_thread: None,
        config,
    })
}

impl System {
    pub fn worker(&self) -> &'static SystemWorker {
        self.worker
    }

    pub fn pubsub(&self) -> &'static SystemPubSub {
        self.pubsub
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Run the proximity sampling loop on its own thread.
    pub fn spawn_sampling<S>(&mut self, sensor: S) -> Result<()>
    where
        S: ProximitySensor + Send + 'static,
    {
        if self.sampling_thread.is_some() {
            return Err(Error::Init("sampling already running")).context("spawn sampling");
        }
        let pubsub = self.pubsub;
        let period = Duration::from_millis(u64::from(self.config.sampling_period_ms));
        let handle = thread::Builder::new()
            .name("sampling".into())
            .spawn(move || {
                let mut sampler = SamplingLoop::new(sensor, period);
                sampler.run(pubsub, &SAMPLING_STOP)?;
                Ok(sampler.stats())
            })
            .context("spawning sampling thread")?;
        self.sampling_thread = Some(handle);
        Ok(())
    }

    /// Stop sampling, then let the worker drain and exit.  Returns the
    /// sampling counters if sampling was running.
    ///
    /// The statics stay stopped afterwards; this is for tests and
    /// orderly shutdown only.
    pub fn shutdown(self) -> Result<Option<SamplingStats>> {
        let mut stats = None;
        if let Some(handle) = self.sampling_thread {
            SAMPLING_STOP.store(true, Ordering::Release);
            let result = handle
                .join()
                .map_err(|_| anyhow!("sampling thread panicked"))?;
            stats = Some(result.context("sampling loop")?);
        }

        self.worker.stop();
        self.worker_thread
            .join()
            .map_err(|_| anyhow!("worker thread panicked"))?;
        info!("system: stopped");
        Ok(stats)
    }
}
