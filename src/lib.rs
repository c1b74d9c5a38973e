//! # minimpi
//!
//! In-process, tagged point-to-point messaging between a fixed group of
//! ranked participants.
//!
//! This crate models the two-sided transfer core of a message-passing
//! runtime, with threads standing in for processes:
//! - A [`Group`] of `n` participants, each holding a unique rank in `[0, n)`
//! - Typed [`send`](Communicator::send) / [`recv`](Communicator::recv) over
//!   any [`MpiDatatype`]
//! - `(source, tag)` matching with [`ANY_SOURCE`] / [`ANY_TAG`] wildcards
//! - Probing, non-blocking receive, and explicit shutdown of blocked waits
//!
//! ## Quick Start
//!
//! ```
//! use std::thread;
//!
//! fn main() -> Result<(), minimpi::Error> {
//!     let group = minimpi::initialize(2)?;
//!
//!     thread::scope(|s| {
//!         let handles: Vec<_> = group
//!             .participants()?
//!             .into_iter()
//!             .map(|comm| {
//!                 s.spawn(move || -> minimpi::Result<()> {
//!                     let rank = comm.rank();
//!                     println!("Hello from rank {} of {}", rank, comm.size());
//!
//!                     if rank == 0 {
//!                         comm.send(&[10i32, 11, 12], 1, 0)?;
//!                     } else {
//!                         let mut buf = [0i32; 3];
//!                         comm.recv(&mut buf, 0, 0)?;
//!                         assert_eq!(buf, [10, 11, 12]);
//!                     }
//!                     comm.finalize()
//!                 })
//!             })
//!             .collect();
//!         for handle in handles {
//!             handle.join().expect("participant panicked")?;
//!         }
//!         Ok(())
//!     })
//! }
//! ```
//!
//! ## Matching
//!
//! Each participant has one inbound queue in arrival order. A receive
//! takes the earliest queued message whose source and tag both match its
//! filter. Messages from one sender to one receiver are matched in send
//! order; there is no ordering across senders.
//!
//! A receive never takes a message with a different tag, even if the
//! sender "meant" it for that receive:
//!
//! ```
//! let group = minimpi::initialize(2).unwrap();
//! let p0 = group.participant(0).unwrap();
//! let p1 = group.participant(1).unwrap();
//!
//! p0.send(&[1i32], 1, 1).unwrap();
//! p0.send(&[2i32], 1, 2).unwrap();
//!
//! let mut buf = [0i32; 1];
//! p1.recv(&mut buf, 0, 1).unwrap();
//! assert_eq!(buf, [1]);
//!
//! // A second tag-1 receive would block: the tag-2 message does not match.
//! assert_eq!(p1.try_recv(&mut buf, 0, 1).unwrap(), None);
//! ```
//!
//! ## Logging
//!
//! Events are emitted through [`tracing`]; install a subscriber to see
//! them. The library never installs one itself.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

mod comm;
mod datatype;
mod envelope;
mod error;
mod group;
mod queue;
mod status;

pub use comm::Communicator;
pub use datatype::{buffer_len, DatatypeTag, MpiDatatype};
pub use error::{Error, Result};
pub use group::{initialize, Group};
pub use queue::{ANY_SOURCE, ANY_TAG};
pub use status::Status;
