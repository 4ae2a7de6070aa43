//! Basic usage of `ReferencePool`: warm up, acquire, release and inspect statistics.
//!
//! Run with `RUST_LOG=reference_pool=trace` to see when the pool creates free lists and
//! constructs new instances.

use reference_pool::{Reference, ReferencePool};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct DamageDealt {
    target: u32,
    amount: f32,
    tags: Vec<&'static str>,
}

impl Reference for DamageDealt {
    fn clear(&mut self) {
        self.target = 0;
        self.amount = 0.0;
        self.tags.clear();
    }
}

fn main() -> reference_pool::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let pool = ReferencePool::builder().strict_check(true).build();

    // Preallocate so the first frames do not need to construct anything.
    pool.add::<DamageDealt>(4)?;

    for frame in 0..3_u32 {
        let mut damage = pool.acquire::<DamageDealt>()?;
        damage.target = frame;
        damage.amount = 12.5;
        damage.tags.push("fire");

        println!("frame {frame}: {damage:?}");

        pool.release(damage)?;
    }

    for info in pool.snapshot() {
        println!(
            "{}: unused={} using={} acquired={} released={} added={} removed={}",
            info.reference_type().name(),
            info.unused_count(),
            info.using_count(),
            info.acquire_count(),
            info.release_count(),
            info.add_count(),
            info.remove_count()
        );
    }

    Ok(())
}
