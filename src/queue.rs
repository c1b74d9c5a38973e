//! Per-participant inbound queue and the `(source, tag)` matching rule.
//!
//! Every participant owns one [`MatchingQueue`]. Any participant may append
//! to it; only the owner removes from it. Envelopes sit in arrival order,
//! which preserves send order per source.
//!
//! Matching is first-eligible-in-queue: a request scans from the head and
//! takes the earliest envelope whose source and tag both satisfy the
//! filter. There is no per-tag dispatch. Two receives for tag 1 against
//! sends tagged 1 and 2 take the tag-1 envelope and then keep waiting; the
//! tag-2 envelope is never handed to a tag-1 request.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use tracing::{trace, warn};

use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::status::Status;

/// Wildcard source for receive and probe filters.
pub const ANY_SOURCE: i32 = -1;

/// Wildcard tag for receive and probe filters.
pub const ANY_TAG: i32 = -1;

/// A `(source, tag)` request; `None` matches anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MatchFilter {
    source: Option<i32>,
    tag: Option<i32>,
}

impl MatchFilter {
    /// Build a filter from raw values, treating [`ANY_SOURCE`] and
    /// [`ANY_TAG`] as wildcards. Validation happens in the caller.
    pub(crate) fn new(source: i32, tag: i32) -> Self {
        MatchFilter {
            source: (source != ANY_SOURCE).then_some(source),
            tag: (tag != ANY_TAG).then_some(tag),
        }
    }

    pub(crate) fn matches(&self, envelope: &Envelope) -> bool {
        self.source.is_none_or(|s| s == envelope.source())
            && self.tag.is_none_or(|t| t == envelope.tag())
    }
}

#[derive(Debug, Default)]
struct QueueState {
    envelopes: VecDeque<Envelope>,
    closed: bool,
    /// Owner has finalized: arrivals are accepted and dropped.
    retired: bool,
    dropped: usize,
}

impl QueueState {
    fn position(&self, filter: &MatchFilter) -> Option<usize> {
        self.envelopes.iter().position(|env| filter.matches(env))
    }

    /// Scan from the head and remove the first envelope matching `filter`.
    ///
    /// The envelope is removed only if `accept` returns `Ok`; on `Err` it
    /// keeps its place in the queue.
    fn match_and_remove<F>(&mut self, filter: &MatchFilter, accept: F) -> Result<Option<Envelope>>
    where
        F: FnOnce(&Envelope) -> Result<()>,
    {
        let Some(index) = self.position(filter) else {
            return Ok(None);
        };
        accept(&self.envelopes[index])?;
        Ok(self.envelopes.remove(index))
    }
}

/// Inbound envelopes for one participant.
#[derive(Debug, Default)]
pub(crate) struct MatchingQueue {
    state: Mutex<QueueState>,
    arrived: Condvar,
}

impl MatchingQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // Critical sections below never panic, so a poisoned lock still guards
    // a consistent queue.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an envelope at the tail and wake the owner.
    ///
    /// Only fails once the queue has been closed by a cancel or abort. After
    /// the owner finalizes, arrivals still succeed but are dropped.
    pub(crate) fn enqueue(&self, envelope: Envelope) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(Error::GroupFinalized);
        }
        if state.retired {
            state.dropped += 1;
            warn!(
                source = envelope.source(),
                dest = envelope.dest(),
                tag = envelope.tag(),
                dropped = state.dropped,
                "dropping message for finalized participant"
            );
            return Ok(());
        }
        state.envelopes.push_back(envelope);
        drop(state);
        self.arrived.notify_all();
        Ok(())
    }

    /// Non-blocking claim of the first envelope matching `filter`.
    pub(crate) fn try_take<F>(&self, filter: MatchFilter, accept: F) -> Result<Option<Envelope>>
    where
        F: FnOnce(&Envelope) -> Result<()>,
    {
        let mut state = self.lock();
        if state.closed {
            return Err(Error::Aborted);
        }
        state.match_and_remove(&filter, accept)
    }

    /// Block until an envelope matches `filter`, then claim it as in
    /// [`try_take`](Self::try_take).
    ///
    /// Returns [`Error::Aborted`] if the queue is closed while waiting.
    pub(crate) fn take<F>(&self, filter: MatchFilter, accept: F) -> Result<Envelope>
    where
        F: FnOnce(&Envelope) -> Result<()>,
    {
        let mut state = self.wait_for(&filter)?;
        state
            .match_and_remove(&filter, accept)?
            .ok_or(Error::Aborted)
    }

    /// Status of the first envelope matching `filter`, without removing it.
    pub(crate) fn peek(&self, filter: MatchFilter) -> Result<Option<Status>> {
        let state = self.lock();
        if state.closed {
            return Err(Error::Aborted);
        }
        Ok(state
            .position(&filter)
            .map(|index| state.envelopes[index].status()))
    }

    /// Block until an envelope matches `filter` and report its status.
    pub(crate) fn wait_peek(&self, filter: MatchFilter) -> Result<Status> {
        let state = self.wait_for(&filter)?;
        state
            .position(&filter)
            .map(|index| state.envelopes[index].status())
            .ok_or(Error::Aborted)
    }

    /// Wait on the condvar until `filter` has a match or the queue closes.
    fn wait_for(&self, filter: &MatchFilter) -> Result<MutexGuard<'_, QueueState>> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return Err(Error::Aborted);
            }
            if state.position(filter).is_some() {
                return Ok(state);
            }
            trace!(?filter, queued = state.envelopes.len(), "waiting for match");
            state = self
                .arrived
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Close the queue, wake every waiter and drop unclaimed envelopes.
    ///
    /// Returns how many envelopes were discarded. Closing twice is a no-op.
    pub(crate) fn close(&self) -> usize {
        let mut state = self.lock();
        state.closed = true;
        let discarded = state.envelopes.len();
        state.envelopes.clear();
        drop(state);
        self.arrived.notify_all();
        discarded
    }

    /// Stop holding envelopes for an owner that has finalized.
    ///
    /// Unlike [`close`](Self::close), senders are not rejected. Returns how
    /// many queued envelopes were discarded.
    pub(crate) fn retire(&self) -> usize {
        let mut state = self.lock();
        state.retired = true;
        let discarded = state.envelopes.len();
        state.envelopes.clear();
        discarded
    }

    #[cfg(test)]
    pub(crate) fn dropped(&self) -> usize {
        self.lock().dropped
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().envelopes.len()
    }
}
