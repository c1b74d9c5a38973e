//! Participant registry and group lifecycle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Instant;

use tracing::{info, warn};

use crate::comm::Communicator;
use crate::error::{Error, Result};
use crate::queue::MatchingQueue;

/// Form a group of `participant_count` ranked participants.
///
/// This is the entry point of the crate. The returned [`Group`] hands out
/// one [`Communicator`] per rank; see [`Group::initialize`] and
/// [`Group::participant`].
///
/// # Errors
///
/// Returns [`Error::Initialization`] if `participant_count < 1`.
///
/// # Example
///
/// ```
/// let group = minimpi::initialize(4).unwrap();
/// assert_eq!(group.size(), 4);
/// ```
pub fn initialize(participant_count: i32) -> Result<Group> {
    Group::new(participant_count)
}

#[derive(Debug, Default)]
struct Claims {
    ranks: Vec<bool>,
    threads: HashMap<ThreadId, i32>,
}

#[derive(Debug)]
pub(crate) struct GroupState {
    size: i32,
    queues: Vec<MatchingQueue>,
    claims: Mutex<Claims>,
    finalized: AtomicUsize,
    aborted: AtomicBool,
    started: Instant,
}

impl GroupState {
    pub(crate) fn size(&self) -> i32 {
        self.size
    }

    /// Inbound queue of `rank`. Callers validate the rank first.
    pub(crate) fn queue(&self, rank: i32) -> &MatchingQueue {
        &self.queues[rank as usize]
    }

    pub(crate) fn contains(&self, rank: i32) -> bool {
        (0..self.size).contains(&rank)
    }

    pub(crate) fn is_finalized(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
            || self.finalized.load(Ordering::SeqCst) == self.size as usize
    }

    /// Record one participant's finalize, retiring its queue.
    ///
    /// Peers can keep sending to the rank; their messages are dropped.
    pub(crate) fn finalize_rank(&self, rank: i32) {
        let discarded = self.queue(rank).retire();
        if discarded > 0 {
            warn!(rank, discarded, "finalize discarded unreceived messages");
        }
        let done = self.finalized.fetch_add(1, Ordering::SeqCst) + 1;
        if done == self.size as usize {
            info!(size = self.size, "all participants finalized");
        }
    }
}

/// A fixed-size group of participants.
///
/// The group owns one matching queue per rank. It is a cheap, clonable
/// handle, so a launcher can move a clone into every participant thread.
/// Independent groups never share state.
///
/// # Example
///
/// ```
/// use std::thread;
///
/// let group = minimpi::initialize(2).unwrap();
/// let ranks: Vec<i32> = thread::scope(|s| {
///     let handles: Vec<_> = (0..2)
///         .map(|_| {
///             let group = group.clone();
///             s.spawn(move || group.initialize().unwrap().rank())
///         })
///         .collect();
///     handles.into_iter().map(|h| h.join().unwrap()).collect()
/// });
/// let mut sorted = ranks.clone();
/// sorted.sort();
/// assert_eq!(sorted, vec![0, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct Group {
    state: Arc<GroupState>,
}

impl Group {
    fn new(size: i32) -> Result<Self> {
        if size < 1 {
            return Err(Error::Initialization(format!(
                "participant count must be at least 1, got {size}"
            )));
        }
        let state = GroupState {
            size,
            queues: (0..size).map(|_| MatchingQueue::new()).collect(),
            claims: Mutex::new(Claims {
                ranks: vec![false; size as usize],
                threads: HashMap::new(),
            }),
            finalized: AtomicUsize::new(0),
            aborted: AtomicBool::new(false),
            started: Instant::now(),
        };
        info!(size, "group formed");
        Ok(Group {
            state: Arc::new(state),
        })
    }

    /// Number of participants in the group.
    pub fn size(&self) -> i32 {
        self.state.size
    }

    /// Initialize the calling thread as a participant.
    ///
    /// Hands out the lowest rank not yet claimed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialization`] if this thread already initialized
    /// in this group, if every rank is taken, or if the group was torn down.
    pub fn initialize(&self) -> Result<Communicator> {
        let thread = thread::current().id();
        let mut claims = self.lock_claims();
        if let Some(rank) = claims.threads.get(&thread) {
            return Err(Error::Initialization(format!(
                "this thread already initialized as rank {rank}"
            )));
        }
        self.check_open()?;
        let rank = claims
            .ranks
            .iter()
            .position(|taken| !taken)
            .ok_or_else(|| {
                Error::Initialization(format!("all {} ranks already claimed", self.state.size))
            })?;
        claims.ranks[rank] = true;
        let rank = rank as i32;
        claims.threads.insert(thread, rank);
        info!(rank, size = self.state.size, "participant initialized");
        Ok(Communicator::new(Arc::clone(&self.state), rank))
    }

    /// Claim a specific rank.
    ///
    /// Unlike [`initialize`](Self::initialize), this is not tied to the
    /// calling thread, so one thread may hold several participants. The
    /// returned communicator can be moved to another thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRank`] for a rank outside `[0, size)` and
    /// [`Error::Initialization`] if the rank is already claimed.
    pub fn participant(&self, rank: i32) -> Result<Communicator> {
        if !self.state.contains(rank) {
            return Err(Error::InvalidRank(rank));
        }
        let mut claims = self.lock_claims();
        self.check_open()?;
        let slot = &mut claims.ranks[rank as usize];
        if *slot {
            return Err(Error::Initialization(format!(
                "rank {rank} already claimed"
            )));
        }
        *slot = true;
        info!(rank, size = self.state.size, "participant claimed");
        Ok(Communicator::new(Arc::clone(&self.state), rank))
    }

    /// Claim every rank at once, in rank order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialization`] if any rank is already claimed; in
    /// that case nothing is claimed.
    pub fn participants(&self) -> Result<Vec<Communicator>> {
        let mut claims = self.lock_claims();
        self.check_open()?;
        if let Some(rank) = claims.ranks.iter().position(|taken| *taken) {
            return Err(Error::Initialization(format!(
                "rank {rank} already claimed"
            )));
        }
        claims.ranks.iter_mut().for_each(|taken| *taken = true);
        info!(size = self.state.size, "all participants claimed");
        Ok((0..self.state.size)
            .map(|rank| Communicator::new(Arc::clone(&self.state), rank))
            .collect())
    }

    /// Shut down one participant's queue.
    ///
    /// A receive or probe blocked on that queue returns [`Error::Aborted`],
    /// and later sends to the rank fail with [`Error::GroupFinalized`].
    /// Use this to unblock a participant waiting on a message that will
    /// never be sent.
    pub fn cancel(&self, rank: i32) -> Result<()> {
        if !self.state.contains(rank) {
            return Err(Error::InvalidRank(rank));
        }
        let discarded = self.state.queue(rank).close();
        info!(rank, discarded, "participant queue cancelled");
        Ok(())
    }

    /// Tear down the whole group immediately.
    ///
    /// Every blocked receive returns [`Error::Aborted`] and every later
    /// transfer fails with [`Error::GroupFinalized`].
    pub fn abort(&self) {
        if self.state.aborted.swap(true, Ordering::SeqCst) {
            return;
        }
        let discarded: usize = self.state.queues.iter().map(MatchingQueue::close).sum();
        info!(size = self.state.size, discarded, "group aborted");
    }

    /// Check whether the group has been torn down, either because every
    /// participant finalized or because of [`abort`](Self::abort).
    pub fn is_finalized(&self) -> bool {
        self.state.is_finalized()
    }

    /// Seconds elapsed since the group was formed.
    pub fn wtime(&self) -> f64 {
        self.state.started.elapsed().as_secs_f64()
    }

    fn lock_claims(&self) -> std::sync::MutexGuard<'_, Claims> {
        self.state
            .claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn check_open(&self) -> Result<()> {
        if self.state.is_finalized() {
            return Err(Error::Initialization("group has been finalized".into()));
        }
        Ok(())
    }
}
