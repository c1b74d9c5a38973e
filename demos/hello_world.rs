//! Hello World example - every participant reports its rank.
//!
//! Run with: cargo run --example hello_world -- 4

use std::thread;

use minimpi::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let size = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(4);

    // Form the group; each thread then initializes as one participant
    let group = minimpi::initialize(size)?;

    thread::scope(|s| -> Result<()> {
        let handles: Vec<_> = (0..size)
            .map(|_| {
                let group = group.clone();
                s.spawn(move || -> Result<()> {
                    let world = group.initialize()?;
                    println!(
                        "Hello, I am rank {} out of {} participants",
                        world.rank(),
                        world.size()
                    );
                    world.finalize()
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("participant panicked")?;
        }
        Ok(())
    })?;

    println!("\nAll participants reported in ({:.6}s).", group.wtime());
    Ok(())
}
