//! Status LED state machine, driven by pubsub events.
//!
//! Steady state: the LED is lit while either condition holds:
//! - it has been toggled on with button A, or
//! - the latest proximity sample is above the configured threshold.
//!
//! A blink sequence overrides the steady state until it finishes:
//!
//! ```text
//!  blink(2, t)   ──t──▶ on ──t──▶ off ──t──▶ on ──t──▶ off ──▶ steady
//!  (timer thread pushes one step per interval onto the worker)
//! ```
//!
//! Subscribed on the system pubsub and stepped by worker tasks, so every
//! transition runs on the worker thread.

use core::cell::RefCell;
use std::thread;
use std::time::Duration;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::digital::{OutputPin, PinState};
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::events::{ButtonEvent, ButtonId, Event};
use crate::pubsub::Subscriber;
use crate::worker::{Job, WorkQueue};

struct Inner<L> {
    led: L,
    toggled: bool,
    near: bool,
    // Half-periods of the running blink sequence still to execute.
    blink_steps: u32,
    blink_on: bool,
    lit: bool,
}

pub struct StatusIndicator<L> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Inner<L>>>,
    proximity_threshold: u16,
}

impl<L: OutputPin + Send> StatusIndicator<L> {
    pub fn new(led: L, proximity_threshold: u16) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                led,
                toggled: false,
                near: false,
                blink_steps: 0,
                blink_on: false,
                lit: false,
            })),
            proximity_threshold,
        }
    }

    /// Whether the LED is currently commanded on.
    pub fn is_lit(&self) -> bool {
        self.inner.lock(|i| i.borrow().lit)
    }

    /// No blink sequence is running.
    pub fn is_idle(&self) -> bool {
        self.inner.lock(|i| i.borrow().blink_steps == 0)
    }

    /// Forget the toggle and proximity state.  A running blink sequence
    /// is left alone; the LED goes dark once it ends.
    pub fn reset(&self) {
        self.inner.lock(|i| {
            let mut i = i.borrow_mut();
            i.toggled = false;
            i.near = false;
            Self::apply(&mut i);
        });
    }

    fn cancel_blink(&self) {
        self.inner.lock(|i| {
            let mut i = i.borrow_mut();
            i.blink_steps = 0;
            i.blink_on = false;
            Self::apply(&mut i);
        });
    }

    fn apply(inner: &mut Inner<L>) {
        let lit = if inner.blink_steps > 0 {
            inner.blink_on
        } else {
            inner.toggled || inner.near
        };
        if lit == inner.lit {
            return;
        }
        match inner.led.set_state(PinState::from(lit)) {
            Ok(()) => inner.lit = lit,
            Err(e) => warn!("indicator: LED write failed: {:?}", e),
        }
    }
}

impl<L: OutputPin + Send + 'static> StatusIndicator<L> {
    /// Blink `count` times, each phase lasting at least `interval`, then
    /// return to the steady state.
    ///
    /// A timer thread pushes one step per interval onto `worker`; the
    /// LED itself is only written from the worker.  Fails with
    /// [`Error::Busy`] while another sequence is running.
    pub fn blink(
        &'static self,
        worker: &'static dyn WorkQueue<'static>,
        count: u16,
        interval: Duration,
    ) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let steps = u32::from(count) * 2;
        let started = self.inner.lock(|i| {
            let mut i = i.borrow_mut();
            if i.blink_steps > 0 {
                return false;
            }
            i.blink_steps = steps;
            i.blink_on = false;
            Self::apply(&mut i);
            true
        });
        if !started {
            return Err(Error::Busy);
        }

        let timer = thread::Builder::new()
            .name("blink".into())
            .spawn(move || {
                for _ in 0..steps {
                    thread::sleep(interval);
                    if !worker.push_or_defer(self) {
                        warn!("indicator: worker refused blink step, sequence cancelled");
                        self.cancel_blink();
                        return;
                    }
                }
            });
        if timer.is_err() {
            self.cancel_blink();
            return Err(Error::Init("spawning blink timer"));
        }
        debug!("indicator: blinking {} times every {:?}", count, interval);
        Ok(())
    }
}

// One blink step.
impl<'a, L: OutputPin + Send> Job<'a> for StatusIndicator<L> {
    fn run(&'a self) {
        self.inner.lock(|i| {
            let mut i = i.borrow_mut();
            if i.blink_steps == 0 {
                return;
            }
            i.blink_steps -= 1;
            i.blink_on = i.blink_steps > 0 && !i.blink_on;
            Self::apply(&mut i);
        });
    }
}

impl<L: OutputPin + Send> Subscriber<Event> for StatusIndicator<L> {
    fn on_event(&self, event: Event) {
        self.inner.lock(|i| {
            let mut i = i.borrow_mut();
            match event {
                Event::Button(ButtonEvent {
                    id: ButtonId::A,
                    pressed: true,
                }) => i.toggled = !i.toggled,
                Event::ProximitySample(value) => i.near = value > self.proximity_threshold,
                Event::Button(_) => return,
            }
            Self::apply(&mut i);
        });
    }
}
