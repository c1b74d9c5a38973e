//! Ring communication example - point-to-point communication.
//!
//! Each participant sends data to the next participant in a ring pattern.
//!
//! Run with: cargo run --example ring -- 4

use std::thread;

use minimpi::{Communicator, Result};
use tracing_subscriber::EnvFilter;

fn ring_step(world: &Communicator) -> Result<()> {
    let rank = world.rank();
    let size = world.size();

    // Calculate neighbors in the ring
    let next = (rank + 1) % size;
    let prev = (rank + size - 1) % size;

    let send_data = vec![rank as f64 * 100.0 + 1.0, rank as f64 * 100.0 + 2.0];
    let mut recv_data = vec![0.0; 2];

    println!("Rank {}: sending {:?} to rank {}", rank, send_data, next);

    // Sends never wait for the receiver, so every rank can send first
    world.send(&send_data, next, 0)?;
    let (source, tag, count) = world.recv(&mut recv_data, prev, 0)?;
    println!(
        "Rank {}: received {:?} from rank {} (tag={}, count={})",
        rank, recv_data, source, tag, count
    );

    let expected = vec![prev as f64 * 100.0 + 1.0, prev as f64 * 100.0 + 2.0];
    assert_eq!(recv_data, expected, "Data mismatch!");
    Ok(())
}

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

    if size < 2 {
        eprintln!("This example requires at least 2 participants");
        return Ok(());
    }

    let group = minimpi::initialize(size)?;
    let participants = group.participants()?;

    thread::scope(|s| -> Result<()> {
        let handles: Vec<_> = participants
            .into_iter()
            .map(|world| {
                s.spawn(move || -> Result<()> {
                    ring_step(&world)?;
                    world.finalize()
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("participant panicked")?;
        }
        Ok(())
    })?;

    println!("\nRing communication test passed!");
    Ok(())
}
