//! Message status information.
//!
//! This module provides the [`Status`] struct returned by probe operations,
//! containing metadata about a message without actually receiving it.

/// Information about a probed or received message.
///
/// Returned by [`Communicator::probe`](crate::Communicator::probe) and
/// [`Communicator::iprobe`](crate::Communicator::iprobe) to describe a
/// queued message without consuming it.
///
/// # Example
///
/// ```
/// # use minimpi::{ANY_SOURCE, ANY_TAG};
/// let group = minimpi::initialize(2).unwrap();
/// let p0 = group.participant(0).unwrap();
/// let p1 = group.participant(1).unwrap();
///
/// p0.send(&[1.0f64, 2.0], 1, 4).unwrap();
///
/// let status = p1.probe(ANY_SOURCE, ANY_TAG).unwrap();
/// assert_eq!((status.source, status.tag, status.count), (0, 4, 2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// Source rank of the message.
    pub source: i32,
    /// Tag of the message.
    pub tag: i32,
    /// Number of elements in the message.
    pub count: i64,
}
