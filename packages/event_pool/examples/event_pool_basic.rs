//! A frame loop that drives an `EventBus`, with a background thread firing events into it.
//!
//! Run with `RUST_LOG=event_pool=trace,reference_pool=debug` to see events being queued and
//! dispatched.

use std::cell::OnceCell;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use event_pool::{EventArgs, EventBus, EventBusMode, EventHandler, EventId, Sender};
use reference_pool::{Reference, ReferencePool};
use tracing_subscriber::EnvFilter;

const ASSET_LOADED: EventId = 1;
const ASSET_FAILED: EventId = 2;
const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Default)]
struct AssetEvent {
    id: EventId,
    path: String,
}

impl Reference for AssetEvent {
    fn clear(&mut self) {
        self.id = 0;
        self.path.clear();
    }
}

impl EventArgs for AssetEvent {
    fn id(&self) -> EventId {
        self.id
    }
}

fn main() -> event_pool::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let pool = ReferencePool::builder().strict_check(true).build();
    let bus = Rc::new(
        EventBus::<AssetEvent>::builder()
            .mode(EventBusMode::ALLOW_MULTI_HANDLER)
            .pool(pool.clone())
            .build(),
    );

    bus.subscribe(
        ASSET_LOADED,
        EventHandler::new(|sender: Option<&Sender>, event: &AssetEvent| {
            let loader = sender
                .and_then(|sender| sender.downcast_ref::<&str>())
                .copied()
                .unwrap_or("unknown");
            println!("loaded {} (by {loader})", event.path);
        }),
    )?;

    // Only interested in the first failure, so the handler unsubscribes itself.
    let first_failure = Rc::new(OnceCell::<EventHandler<AssetEvent>>::new());
    let on_failure = {
        let bus = Rc::downgrade(&bus);
        let first_failure = Rc::clone(&first_failure);
        EventHandler::new(move |_, event: &AssetEvent| {
            println!("first failure: {}", event.path);

            if let (Some(bus), Some(this)) = (bus.upgrade(), first_failure.get()) {
                if let Err(error) = bus.unsubscribe(ASSET_FAILED, this) {
                    eprintln!("could not unsubscribe: {error}");
                }
            }
        })
    };
    drop(first_failure.set(on_failure.clone()));
    bus.subscribe(ASSET_FAILED, on_failure)?;

    // Failures without a subscriber end up here.
    bus.set_default_handler(Some(EventHandler::new(|_, event: &AssetEvent| {
        println!("unhandled event {} for {}", event.id, event.path);
    })));

    let publisher = bus.publisher();
    let loader = thread::spawn(move || -> event_pool::Result<()> {
        let sender: Sender = Arc::new("background loader");

        for (id, path) in [
            (ASSET_LOADED, "textures/grass.png"),
            (ASSET_FAILED, "textures/missing.png"),
            (ASSET_FAILED, "sounds/missing.ogg"),
            (ASSET_LOADED, "models/tree.glb"),
        ] {
            let mut event = publisher.pool().acquire::<AssetEvent>()?;
            event.id = id;
            event.path.push_str(path);
            publisher.fire(Some(Arc::clone(&sender)), event)?;
        }

        Ok(())
    });

    for frame in 0..5 {
        println!("frame {frame}: {} pending", bus.pending_count());
        bus.update(FRAME, FRAME)?;
        thread::sleep(FRAME);
    }

    loader.join().expect("loader thread does not panic")?;
    bus.update(FRAME, FRAME)?;

    bus.shutdown();

    for info in pool.snapshot() {
        println!(
            "{}: unused={} using={}",
            info.reference_type().name(),
            info.unused_count(),
            info.using_count()
        );
    }

    Ok(())
}
