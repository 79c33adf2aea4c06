//! PubSub scenarios against a real worker thread.
//!
//! Every test owns its worker, pubsub and subscribers; the worker runs on
//! a scoped thread and is stopped when the test body returns (or panics).

use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use sense::notification::Notification;
use sense::pubsub::PubSub;
use sense::worker::Worker;

#[derive(Debug, Clone, Copy)]
struct TestEvent {
    value: i32,
}

type TestPubSub<'a> = PubSub<'a, TestEvent, 4, 4>;

const WAIT: Duration = Duration::from_millis(200);

struct StopOnDrop<'w, 'a, const N: usize>(&'w Worker<'a, N>);

impl<const N: usize> Drop for StopOnDrop<'_, '_, N> {
    fn drop(&mut self) {
        self.0.stop();
    }
}

/// Serve `worker` on a scoped thread while `body` runs.
fn with_worker<'a, const N: usize>(worker: &'a Worker<'a, N>, body: impl FnOnce()) {
    thread::scope(|s| {
        s.spawn(|| worker.run());
        let _stop = StopOnDrop(worker);
        body();
    });
}

// ── Delivery ──────────────────────────────────────────────────

#[test]
fn publish_one_subscriber() {
    let result = AtomicI32::new(0);
    let notification = Notification::new();
    let on_event = |e: TestEvent| {
        result.store(e.value, Ordering::SeqCst);
        notification.release();
    };
    let worker: Worker<'_, 8> = Worker::new();
    let pubsub: TestPubSub<'_> = PubSub::new(&worker);
    assert!(pubsub.subscribe(&on_event).is_some());

    with_worker(&worker, || {
        assert!(pubsub.publish(TestEvent { value: 42 }));
        assert!(notification.try_acquire_for(WAIT));
    });

    assert_eq!(result.load(Ordering::SeqCst), 42);
}

#[test]
fn publish_multiple_subscribers() {
    let result = AtomicI32::new(0);
    let notification = Notification::new();
    let (result_ref, notification_ref) = (&result, &notification);
    let adders: [_; 4] = core::array::from_fn(|i| {
        move |e: TestEvent| {
            result_ref.fetch_add(e.value, Ordering::SeqCst);
            if i == 3 {
                notification_ref.release();
            }
        }
    });
    let worker: Worker<'_, 8> = Worker::new();
    let pubsub: TestPubSub<'_> = PubSub::new(&worker);
    for adder in &adders {
        assert!(pubsub.subscribe(adder).is_some());
    }

    with_worker(&worker, || {
        assert!(pubsub.publish(TestEvent { value: 4 }));
        assert!(notification.try_acquire_for(WAIT));
    });

    assert_eq!(result.load(Ordering::SeqCst), 4 * 4);
}

#[test]
fn publish_multiple_events() {
    let result = AtomicI32::new(0);
    let processed = AtomicUsize::new(0);
    let notification = Notification::new();
    let on_event = |e: TestEvent| {
        result.fetch_add(e.value, Ordering::SeqCst);
        let n = processed.fetch_add(1, Ordering::SeqCst) + 1;
        if n % 4 == 0 {
            notification.release();
        }
    };
    let worker: Worker<'_, 8> = Worker::new();
    let pubsub: TestPubSub<'_> = PubSub::new(&worker);
    assert!(pubsub.subscribe(&on_event).is_some());

    with_worker(&worker, || {
        for value in 1..=4 {
            assert!(pubsub.publish(TestEvent { value }));
        }
        assert!(notification.try_acquire_for(WAIT));
        assert_eq!(result.load(Ordering::SeqCst), 10);
        assert_eq!(processed.load(Ordering::SeqCst), 4);

        for value in 5..=8 {
            assert!(pubsub.publish(TestEvent { value }));
        }
        assert!(notification.try_acquire_for(WAIT));
        assert_eq!(result.load(Ordering::SeqCst), 36);
        assert_eq!(processed.load(Ordering::SeqCst), 8);
    });
}

// ── Backpressure ──────────────────────────────────────────────

#[test]
fn publish_multiple_events_queue_full() {
    let result = AtomicI32::new(0);
    let processed = AtomicUsize::new(0);
    let notification = Notification::new();
    let unblock = Notification::new();
    // Holds the worker until every event has been published.
    let blocker = || {
        let _ = unblock.try_acquire_for(Duration::from_secs(1));
    };
    let on_event = |e: TestEvent| {
        result.fetch_add(e.value, Ordering::SeqCst);
        if processed.fetch_add(1, Ordering::SeqCst) + 1 == 5 {
            notification.release();
        }
    };
    let worker: Worker<'_, 8> = Worker::new();
    let pubsub: TestPubSub<'_> = PubSub::new(&worker);
    assert!(pubsub.subscribe(&on_event).is_some());

    with_worker(&worker, || {
        assert!(worker.push_work(&blocker));

        assert!(pubsub.publish(TestEvent { value: 10 }));
        assert!(pubsub.publish(TestEvent { value: 11 }));
        assert!(pubsub.publish(TestEvent { value: 12 }));
        assert!(pubsub.publish(TestEvent { value: 13 }));
        assert!(!pubsub.publish(TestEvent { value: 14 }));
        unblock.release();

        // Times out: the fifth event was never buffered.
        assert!(!notification.try_acquire_for(WAIT));
    });

    assert_eq!(processed.load(Ordering::SeqCst), 4);
    assert_eq!(result.load(Ordering::SeqCst), 46);
}

#[test]
fn publish_succeeds_while_worker_queue_is_full() {
    let seen = Mutex::new(Vec::new());
    let notification = Notification::new();
    let started = Notification::new();
    let unblock = Notification::new();
    let blocker = || {
        started.release();
        let _ = unblock.try_acquire_for(Duration::from_secs(1));
    };
    let noop = || {};
    let on_event = |e: TestEvent| {
        let mut seen = seen.lock().unwrap();
        seen.push(e.value);
        if seen.len() == 2 {
            notification.release();
        }
    };
    let worker: Worker<'_, 2> = Worker::new();
    let pubsub: TestPubSub<'_> = PubSub::new(&worker);
    assert!(pubsub.subscribe(&on_event).is_some());

    with_worker(&worker, || {
        assert!(worker.push_work(&blocker));
        assert!(started.try_acquire_for(WAIT));
        assert!(worker.push_work(&noop));
        assert!(worker.push_work(&noop));
        assert!(!worker.push_work(&noop), "worker queue should be full");

        // Buffered even though no dispatch task fits right now.
        assert!(pubsub.publish(TestEvent { value: 1 }));
        assert!(pubsub.publish(TestEvent { value: 2 }));
        assert_eq!(pubsub.queued_events(), 2);
        assert_eq!(worker.pending(), 3, "dispatch deferred behind the noops");

        // Freeing the worker is enough: no further publish is needed.
        unblock.release();
        assert!(notification.try_acquire_for(WAIT));
        assert_eq!(pubsub.queued_events(), 0);
    });

    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
}

#[test]
fn single_slot_worker_delivers_after_blocker_finishes() {
    let delivered = AtomicUsize::new(0);
    let notification = Notification::new();
    let started = Notification::new();
    let unblock = Notification::new();
    let blocker = || {
        started.release();
        let _ = unblock.try_acquire_for(Duration::from_secs(1));
    };
    let noop = || {};
    let on_event = |e: TestEvent| {
        assert_eq!(e.value, 7);
        delivered.fetch_add(1, Ordering::SeqCst);
        notification.release();
    };
    let worker: Worker<'_, 1> = Worker::new();
    let pubsub: TestPubSub<'_> = PubSub::new(&worker);
    assert!(pubsub.subscribe(&on_event).is_some());

    with_worker(&worker, || {
        assert!(worker.push_work(&blocker));
        assert!(started.try_acquire_for(WAIT));
        assert!(worker.push_work(&noop));

        assert!(pubsub.publish(TestEvent { value: 7 }));
        unblock.release();
        assert!(notification.try_acquire_for(WAIT));
    });

    assert_eq!(delivered.load(Ordering::SeqCst), 1);
    assert_eq!(worker.pending(), 0);
}

// ── Subscriber table ──────────────────────────────────────────

#[test]
fn subscribe_full() {
    let notification = Notification::new();
    let on_event = |_: TestEvent| notification.release();
    let worker: Worker<'_, 8> = Worker::new();
    let pubsub: TestPubSub<'_> = PubSub::new(&worker);

    for expected in 1..=4 {
        assert!(pubsub.subscribe(&on_event).is_some());
        assert_eq!(pubsub.subscriber_count(), expected);
    }
    assert_eq!(pubsub.subscriber_count(), pubsub.max_subscribers());
    assert!(pubsub.subscribe(&on_event).is_none());
    assert_eq!(pubsub.subscriber_count(), 4);
}

#[test]
fn subscribe_unsubscribe() {
    let notification = Notification::new();
    let on_event = |_: TestEvent| notification.release();
    let worker: Worker<'_, 8> = Worker::new();
    let pubsub: TestPubSub<'_> = PubSub::new(&worker);

    let token1 = pubsub.subscribe(&on_event).unwrap();
    let token2 = pubsub.subscribe(&on_event).unwrap();
    let token3 = pubsub.subscribe(&on_event).unwrap();
    let token4 = pubsub.subscribe(&on_event).unwrap();
    assert_eq!(pubsub.subscriber_count(), 4);

    assert!(pubsub.subscribe(&on_event).is_none());
    assert_eq!(pubsub.subscriber_count(), 4);

    assert!(pubsub.unsubscribe(token2));
    assert_eq!(pubsub.subscriber_count(), 3);

    let token5 = pubsub.subscribe(&on_event).unwrap();
    assert_eq!(pubsub.subscriber_count(), 4);
    assert!(!pubsub.unsubscribe(token2), "stale token must not evict slot reuser");
    assert_eq!(pubsub.subscriber_count(), 4);

    assert!(pubsub.unsubscribe(token1));
    assert!(pubsub.unsubscribe(token3));
    assert!(pubsub.unsubscribe(token4));
    assert_eq!(pubsub.subscriber_count(), 1);
    assert!(pubsub.unsubscribe(token5));
    assert_eq!(pubsub.subscriber_count(), 0);
}

// ── Concurrency ───────────────────────────────────────────────

#[test]
fn concurrent_producers_keep_per_producer_order() {
    const PER_PRODUCER: i32 = 200;
    let seen = Mutex::new(Vec::new());
    let notification = Notification::new();
    let on_event = |e: TestEvent| {
        let mut seen = seen.lock().unwrap();
        seen.push(e.value);
        if seen.len() == 2 * PER_PRODUCER as usize {
            notification.release();
        }
    };
    let worker: Worker<'_, 4> = Worker::new();
    let pubsub: TestPubSub<'_> = PubSub::new(&worker);
    assert!(pubsub.subscribe(&on_event).is_some());

    with_worker(&worker, || {
        thread::scope(|s| {
            for producer in 0..2 {
                let pubsub = &pubsub;
                s.spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        let event = TestEvent {
                            value: producer * 1000 + seq,
                        };
                        // Caller-side retry: the queue only holds four.
                        while !pubsub.publish(event) {
                            thread::yield_now();
                        }
                    }
                });
            }
        });
        assert!(notification.try_acquire_for(Duration::from_secs(5)));
    });

    let seen = seen.lock().unwrap();
    for producer in 0..2 {
        let mine: Vec<i32> = seen
            .iter()
            .filter(|v| **v / 1000 == producer)
            .map(|v| v % 1000)
            .collect();
        assert_eq!(mine, (0..PER_PRODUCER).collect::<Vec<_>>());
    }
}
