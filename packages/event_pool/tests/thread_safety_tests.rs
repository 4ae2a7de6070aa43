//! Thread safety integration tests for `event_pool`.
//!
//! These tests fire events from several producer threads through publishers and verify that
//! the owning thread dispatches all of them, in the order each producer fired them.

#![expect(
    missing_docs,
    reason = "This is a test file, documentation is not required."
)]

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use event_pool::{EventArgs, EventBus, EventBusMode, EventHandler, EventId, Sender};
use reference_pool::{Reference, ReferencePool, ReferenceType};
use testing::{CallLog, with_watchdog};

const PRODUCER_COUNT: usize = 4;
const EVENTS_PER_PRODUCER: u32 = 250;
const PROGRESS: EventId = 1;

#[derive(Debug, Default)]
struct Progress {
    producer: usize,
    step: u32,
}

impl Reference for Progress {
    fn clear(&mut self) {
        self.producer = 0;
        self.step = 0;
    }
}

impl EventArgs for Progress {
    fn id(&self) -> EventId {
        PROGRESS
    }
}

#[test]
fn events_from_many_producers_are_all_dispatched_in_producer_order() {
    with_watchdog(|| {
        let bus = EventBus::<Progress>::builder()
            .mode(EventBusMode::DEFAULT)
            .pool(ReferencePool::builder().strict_check(true).build())
            .build();

        let log = CallLog::new();
        let handler = {
            let log = log.clone();
            EventHandler::new(move |_, progress: &Progress| {
                log.record((progress.producer, progress.step));
            })
        };
        bus.subscribe(PROGRESS, handler).unwrap();

        let barrier = Arc::new(Barrier::new(PRODUCER_COUNT));

        let producers: Vec<_> = (0..PRODUCER_COUNT)
            .map(|producer| {
                let publisher = bus.publisher();
                let barrier = Arc::clone(&barrier);

                thread::spawn(move || {
                    barrier.wait();

                    for step in 0..EVENTS_PER_PRODUCER {
                        let mut progress = publisher.pool().acquire::<Progress>().unwrap();
                        progress.producer = producer;
                        progress.step = step;
                        publisher.fire(None, progress).unwrap();
                    }
                })
            })
            .collect();

        // Dispatch concurrently with the producers, as a frame loop would.
        while producers.iter().any(|producer| !producer.is_finished()) {
            bus.update(Duration::ZERO, Duration::ZERO).unwrap();
            thread::yield_now();
        }

        for producer in producers {
            producer.join().unwrap();
        }

        bus.update(Duration::ZERO, Duration::ZERO).unwrap();
        assert_eq!(bus.pending_count(), 0);

        let entries = log.entries();
        let expected_total = PRODUCER_COUNT * usize::try_from(EVENTS_PER_PRODUCER).unwrap();
        assert_eq!(entries.len(), expected_total);

        for producer in 0..PRODUCER_COUNT {
            let steps: Vec<_> = entries
                .iter()
                .filter(|(from, _)| *from == producer)
                .map(|(_, step)| *step)
                .collect();

            assert_eq!(steps, (0..EVENTS_PER_PRODUCER).collect::<Vec<_>>());
        }

        let info = bus
            .pool()
            .snapshot()
            .into_iter()
            .find(|info| info.reference_type() == ReferenceType::of::<Progress>())
            .unwrap();
        assert_eq!(info.using_count(), 0);
    });
}

#[test]
fn sender_fired_from_another_thread_reaches_handler() {
    with_watchdog(|| {
        let bus = EventBus::<Progress>::builder()
            .pool(ReferencePool::builder().strict_check(true).build())
            .build();

        let senders = CallLog::new();
        let handler = {
            let senders = senders.clone();
            EventHandler::new(move |sender: Option<&Sender>, _: &Progress| {
                let id = sender.and_then(|sender| sender.downcast_ref::<u64>()).copied();
                senders.record(id);
            })
        };
        bus.subscribe(PROGRESS, handler).unwrap();

        let publisher = bus.publisher();
        thread::spawn(move || {
            let sender: Sender = Arc::new(77_u64);
            let progress = publisher.pool().acquire::<Progress>().unwrap();
            publisher.fire(Some(sender), progress).unwrap();
        })
        .join()
        .unwrap();

        bus.update(Duration::ZERO, Duration::ZERO).unwrap();

        assert_eq!(senders.entries(), vec![Some(77)]);
    });
}
