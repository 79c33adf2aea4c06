//! Generic publish/subscribe on top of the shared [`Worker`](crate::worker::Worker).
//!
//! ```text
//! ┌────────────┐ publish ┌──────────────────┐ push_work(self) ┌────────┐
//! │ producers  │───────▶│ event queue (C)   │────────────────▶│ worker │
//! │ (any ctx)  │        │ subscriber table  │◀────────────────│ thread │
//! └────────────┘        └──────────────────┘   dispatch task  └────────┘
//!                                 │
//!                                 ▼  one event at a time, slot order
//!                        subscriber callbacks
//! ```
//!
//! Producers copy events into a bounded queue and return immediately.
//! At most one dispatch task per instance is outstanding on the worker
//! (the `dispatch_pending` bit).  Publish schedules it with
//! `push_or_defer`, so a momentarily full worker holds the task until a
//! slot frees instead of losing it.  The dispatch task delivers one event
//! to every subscriber, then re-queues itself while events remain.  If
//! the worker queue has no room for the re-queue it keeps draining in
//! place, so buffered events are never stranded once dispatch has started.
//!
//! The state lock is never held while a callback runs, so subscribers may
//! publish, subscribe or unsubscribe from inside a callback.

mod subscribers;

pub use subscribers::{SubscriberTable, Token};

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use heapless::Deque;
use log::debug;

use crate::error::{Error, Result};
use crate::worker::{Job, WorkQueue};

/// Receives events on the worker thread.
pub trait Subscriber<E>: Sync {
    fn on_event(&self, event: E);
}

impl<E, F> Subscriber<E> for F
where
    F: Fn(E) + Sync,
{
    fn on_event(&self, event: E) {
        self(event)
    }
}

/// A registered subscriber.  The referent must outlive the pubsub.
pub type SubscribeCallback<'a, E> = &'a (dyn Subscriber<E> + 'a);

struct State<'a, E, const C: usize, const N: usize> {
    events: Deque<E, C>,
    subscribers: SubscriberTable<SubscribeCallback<'a, E>, N>,
    dispatch_pending: bool,
}

/// Event queue of depth `C` and `N` subscriber slots, dispatched on a
/// shared worker.
pub struct PubSub<'a, E, const C: usize, const N: usize> {
    worker: &'a dyn WorkQueue<'a>,
    state: Mutex<CriticalSectionRawMutex, RefCell<State<'a, E, C, N>>>,
}

impl<'a, E, const C: usize, const N: usize> PubSub<'a, E, C, N>
where
    E: Clone + Send + 'a,
{
    pub const fn new(worker: &'a dyn WorkQueue<'a>) -> Self {
        Self {
            worker,
            state: Mutex::new(RefCell::new(State {
                events: Deque::new(),
                subscribers: SubscriberTable::new(),
                dispatch_pending: false,
            })),
        }
    }

    /// Buffer `event` for delivery.
    ///
    /// Returns `false` if the event queue is full; the event is dropped
    /// and nothing is scheduled.  Returns `true` once the event is
    /// buffered; a full worker defers the dispatch task rather than
    /// refusing it.
    pub fn publish(&'a self, event: E) -> bool {
        let schedule = self.state.lock(|s| {
            let mut s = s.borrow_mut();
            if s.events.push_back(event).is_err() {
                return None;
            }
            let schedule = !s.dispatch_pending;
            s.dispatch_pending = true;
            Some(schedule)
        });

        match schedule {
            None => false,
            Some(false) => true,
            Some(true) => {
                // Only a stopping worker (or one whose deferred list is
                // exhausted) refuses; the next publish then tries again.
                if !self.worker.push_or_defer(self) {
                    self.state.lock(|s| s.borrow_mut().dispatch_pending = false);
                }
                true
            }
        }
    }

    /// Register `callback`.  Returns `None` when every slot is taken.
    pub fn subscribe(&self, callback: SubscribeCallback<'a, E>) -> Option<Token> {
        let token = self
            .state
            .lock(|s| s.borrow_mut().subscribers.subscribe(callback));
        if let Some(token) = token {
            debug!("pubsub: subscribed {:?}", token);
        }
        token
    }

    /// Remove the subscription identified by `token`.  A callback that is
    /// already running finishes; later events are not delivered to it.
    pub fn unsubscribe(&self, token: Token) -> bool {
        let removed = self
            .state
            .lock(|s| s.borrow_mut().subscribers.unsubscribe(token));
        if removed {
            debug!("pubsub: unsubscribed {:?}", token);
        }
        removed
    }

    /// [`subscribe`](Self::subscribe) for callers that propagate errors.
    pub fn try_subscribe(&self, callback: SubscribeCallback<'a, E>) -> Result<Token> {
        self.subscribe(callback).ok_or(Error::TableFull)
    }

    /// [`unsubscribe`](Self::unsubscribe) for callers that propagate errors.
    pub fn try_unsubscribe(&self, token: Token) -> Result<()> {
        if self.unsubscribe(token) {
            Ok(())
        } else {
            Err(Error::InvalidToken)
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock(|s| s.borrow().subscribers.len())
    }

    pub const fn max_subscribers(&self) -> usize {
        N
    }

    /// Events buffered and not yet delivered.
    pub fn queued_events(&self) -> usize {
        self.state.lock(|s| s.borrow().events.len())
    }

    pub const fn event_capacity(&self) -> usize {
        C
    }

    /// Pop the oldest event together with the subscribers to deliver it
    /// to.  Clears the pending bit when the queue is empty.
    fn next_delivery(&self) -> Option<(E, [Option<SubscribeCallback<'a, E>>; N])> {
        self.state.lock(|s| {
            let mut s = s.borrow_mut();
            match s.events.pop_front() {
                Some(event) => Some((event, s.subscribers.snapshot())),
                None => {
                    s.dispatch_pending = false;
                    None
                }
            }
        })
    }

    fn has_events(&self) -> bool {
        self.state.lock(|s| {
            let mut s = s.borrow_mut();
            if s.events.is_empty() {
                s.dispatch_pending = false;
                false
            } else {
                true
            }
        })
    }
}

// The dispatch task.  `&'a PubSub` is what gets queued on the worker.
impl<'a, E, const C: usize, const N: usize> Job<'a> for PubSub<'a, E, C, N>
where
    E: Clone + Send + 'a,
{
    fn run(&'a self) {
        while let Some((event, callbacks)) = self.next_delivery() {
            for callback in callbacks.iter().flatten() {
                callback.on_event(event.clone());
            }
            // Yield the worker to other tasks between events; drain in
            // place only when there is no room to re-queue.
            if !self.has_events() || self.worker.push_work(self) {
                return;
            }
        }
    }
}
