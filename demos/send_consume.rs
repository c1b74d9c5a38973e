//! Tag matching pitfall.
//!
//! Rank 0 sends two messages to rank 1, tagged 1 and 2. Rank 1 asks for
//! tag 1 twice. The first receive takes the tag-1 message; the second finds
//! nothing with tag 1 and would block forever, because the tag-2 message is
//! never matched by a tag-1 request. Here rank 1 checks with `try_recv`
//! instead of blocking, then drains the tag-2 message explicitly.
//!
//! Run with: cargo run --example send_consume -- <count>

use std::thread;

use minimpi::{Communicator, Result};
use tracing_subscriber::EnvFilter;

fn sender(world: &Communicator, buf: &mut [i32]) -> Result<()> {
    world.send(buf, 1, 1)?;
    println!("rank {}: sent tag 1", world.rank());
    // Safe to reuse: send copied the payload
    buf.iter_mut().for_each(|v| *v += 1000);
    world.send(buf, 1, 2)?;
    println!("rank {}: sent tag 2", world.rank());
    Ok(())
}

fn receiver(world: &Communicator, buf: &mut [i32]) -> Result<()> {
    let (source, tag, count) = world.recv(buf, 0, 1)?;
    println!("rank 1: got {buf:?} from {source} (tag={tag}, count={count})");

    match world.try_recv(buf, 0, 1)? {
        Some(status) => println!("rank 1: unexpected second tag-1 message {status:?}"),
        None => println!("rank 1: second tag-1 receive would block; tag 2 does not match"),
    }

    let (source, tag, count) = world.recv(buf, 0, 2)?;
    println!("rank 1: got {buf:?} from {source} (tag={tag}, count={count})");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let count = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<i64>().ok())
        .unwrap_or(4);
    let len = minimpi::buffer_len(count)?;

    let group = minimpi::initialize(2)?;
    let participants = group.participants()?;

    thread::scope(|s| -> Result<()> {
        let handles: Vec<_> = participants
            .into_iter()
            .map(|world| {
                s.spawn(move || -> Result<()> {
                    let rank = world.rank();
                    let mut buf: Vec<i32> = (0..len as i32).map(|i| rank + i).collect();
                    if rank == 0 {
                        sender(&world, &mut buf)?;
                    } else {
                        receiver(&world, &mut buf)?;
                    }
                    println!("rank {rank}: count {count}");
                    world.finalize()
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("participant panicked")?;
        }
        Ok(())
    })?;

    println!("elapsed {:.6}s", group.wtime());
    Ok(())
}
