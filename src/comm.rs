//! Point-to-point transfers for one participant.

use std::cell::Cell;
use std::sync::Arc;

use tracing::{debug, info};

use crate::datatype::MpiDatatype;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::group::GroupState;
use crate::queue::{MatchFilter, ANY_SOURCE, ANY_TAG};
use crate::status::Status;

/// One participant's view of its group.
///
/// A communicator is the only handle that can receive from its rank's
/// queue. It can be moved to another thread but not shared, which keeps
/// the remove side of each queue single-consumer.
///
/// Dropping a communicator finalizes it if [`finalize`](Self::finalize)
/// was not called.
///
/// # Example
///
/// ```
/// use minimpi::ANY_TAG;
///
/// let group = minimpi::initialize(2).unwrap();
/// let p0 = group.participant(0).unwrap();
/// let p1 = group.participant(1).unwrap();
///
/// p0.send(&[1i32, 2, 3], 1, 7).unwrap();
///
/// let mut buf = [0i32; 3];
/// let (source, tag, count) = p1.recv(&mut buf, 0, ANY_TAG).unwrap();
/// assert_eq!((source, tag, count), (0, 7, 3));
/// assert_eq!(buf, [1, 2, 3]);
/// ```
#[derive(Debug)]
pub struct Communicator {
    group: Arc<GroupState>,
    rank: i32,
    finalized: Cell<bool>,
}

impl Communicator {
    pub(crate) fn new(group: Arc<GroupState>, rank: i32) -> Self {
        Communicator {
            group,
            rank,
            finalized: Cell::new(false),
        }
    }

    /// Get the rank of this participant.
    pub fn rank(&self) -> i32 {
        self.rank
    }

    /// Get the number of participants in the group.
    pub fn size(&self) -> i32 {
        self.group.size()
    }

    /// Check whether this participant has finalized.
    pub fn is_finalized(&self) -> bool {
        self.finalized.get()
    }

    // ========================================================================
    // Point-to-Point Communication
    // ========================================================================

    /// Send a slice to another participant.
    ///
    /// The payload is copied before this returns, so `data` may be reused
    /// immediately. Delivery into the destination queue is immediate; this
    /// never waits for a matching receive.
    ///
    /// # Errors
    ///
    /// - [`Error::GroupFinalized`] after [`finalize`](Self::finalize), once
    ///   the whole group is finalized, or if the destination was cancelled.
    ///   A destination that merely finalized still accepts (and drops) the
    ///   message.
    /// - [`Error::InvalidDestination`] if `dest` is outside `[0, size)`
    /// - [`Error::InvalidTag`] if `tag` is negative
    pub fn send<T: MpiDatatype>(&self, data: &[T], dest: i32, tag: i32) -> Result<()> {
        self.check_active()?;
        if !self.group.contains(dest) {
            return Err(Error::InvalidDestination(dest));
        }
        if tag < 0 {
            return Err(Error::InvalidTag(tag));
        }
        let envelope = Envelope::new(self.rank, dest, tag, data);
        debug!(
            source = envelope.source(),
            dest = envelope.dest(),
            tag,
            count = envelope.count(),
            "send"
        );
        self.group.queue(dest).enqueue(envelope)
    }

    /// Receive into a slice, blocking until a matching message is queued.
    ///
    /// Use [`ANY_SOURCE`] and [`ANY_TAG`] as wildcards. The earliest queued
    /// message whose source and tag both match is taken; messages with
    /// other tags are left in place.
    ///
    /// Returns `(actual_source, actual_tag, actual_count)`.
    ///
    /// # Errors
    ///
    /// - [`Error::CountMismatch`] / [`Error::DatatypeMismatch`] if the matched
    ///   message does not fit `data` exactly; the message stays queued
    /// - [`Error::Aborted`] if the queue is shut down while waiting
    /// - [`Error::GroupFinalized`], [`Error::InvalidRank`], [`Error::InvalidTag`]
    ///   for a finalized participant or a malformed filter
    pub fn recv<T: MpiDatatype>(
        &self,
        data: &mut [T],
        source: i32,
        tag: i32,
    ) -> Result<(i32, i32, i64)> {
        let filter = self.filter(source, tag)?;
        let envelope = self
            .group
            .queue(self.rank)
            .take(filter, |env| env.check_fits(&*data))?;
        self.deliver(envelope, data)
    }

    /// Receive without blocking.
    ///
    /// Returns `Ok(None)` if no queued message matches. Errors are as for
    /// [`recv`](Self::recv), with [`Error::Aborted`] meaning the queue has
    /// been shut down.
    pub fn try_recv<T: MpiDatatype>(
        &self,
        data: &mut [T],
        source: i32,
        tag: i32,
    ) -> Result<Option<(i32, i32, i64)>> {
        let filter = self.filter(source, tag)?;
        match self
            .group
            .queue(self.rank)
            .try_take(filter, |env| env.check_fits(&*data))?
        {
            Some(envelope) => self.deliver(envelope, data).map(Some),
            None => Ok(None),
        }
    }

    /// Receive a whole message into a new vector, blocking until one
    /// matches.
    ///
    /// The vector is sized to the message, so this never fails with
    /// [`Error::CountMismatch`]. The element type must still match.
    pub fn recv_vec<T: MpiDatatype>(&self, source: i32, tag: i32) -> Result<(Vec<T>, Status)> {
        let filter = self.filter(source, tag)?;
        let envelope = self
            .group
            .queue(self.rank)
            .take(filter, Envelope::check_datatype::<T>)?;
        let (data, status) = envelope.into_vec()?;
        debug!(
            rank = self.rank,
            source = status.source,
            tag = status.tag,
            count = status.count,
            "matched"
        );
        Ok((data, status))
    }

    /// Send to one participant and receive from another in a single call.
    ///
    /// Returns `(actual_source, actual_tag, actual_count)` for the receive.
    pub fn sendrecv<T: MpiDatatype>(
        &self,
        send: &[T],
        dest: i32,
        sendtag: i32,
        recv: &mut [T],
        source: i32,
        recvtag: i32,
    ) -> Result<(i32, i32, i64)> {
        self.send(send, dest, sendtag)?;
        self.recv(recv, source, recvtag)
    }

    /// Block until a matching message is queued and describe it without
    /// receiving it.
    pub fn probe(&self, source: i32, tag: i32) -> Result<Status> {
        let filter = self.filter(source, tag)?;
        self.group.queue(self.rank).wait_peek(filter)
    }

    /// Describe the first matching queued message, if any, without
    /// receiving it.
    pub fn iprobe(&self, source: i32, tag: i32) -> Result<Option<Status>> {
        let filter = self.filter(source, tag)?;
        self.group.queue(self.rank).peek(filter)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Finalize this participant.
    ///
    /// Discards anything not yet received by this rank and drops whatever
    /// peers send it afterwards; peers' own sends keep succeeding.
    /// Every later call on this communicator, including a second
    /// `finalize`, fails with [`Error::GroupFinalized`].
    pub fn finalize(&self) -> Result<()> {
        if self.finalized.replace(true) {
            return Err(Error::GroupFinalized);
        }
        info!(rank = self.rank, "participant finalized");
        self.group.finalize_rank(self.rank);
        Ok(())
    }

    fn check_active(&self) -> Result<()> {
        if self.finalized.get() || self.group.is_finalized() {
            return Err(Error::GroupFinalized);
        }
        Ok(())
    }

    fn filter(&self, source: i32, tag: i32) -> Result<MatchFilter> {
        self.check_active()?;
        if source != ANY_SOURCE && !self.group.contains(source) {
            return Err(Error::InvalidRank(source));
        }
        if tag != ANY_TAG && tag < 0 {
            return Err(Error::InvalidTag(tag));
        }
        Ok(MatchFilter::new(source, tag))
    }

    fn deliver<T: MpiDatatype>(
        &self,
        envelope: Envelope,
        data: &mut [T],
    ) -> Result<(i32, i32, i64)> {
        let status = envelope.copy_into(data)?;
        debug!(
            rank = self.rank,
            source = status.source,
            tag = status.tag,
            count = status.count,
            "matched"
        );
        Ok((status.source, status.tag, status.count))
    }
}

impl Drop for Communicator {
    fn drop(&mut self) {
        if !self.finalized.get() {
            let _ = self.finalize();
        }
    }
}
