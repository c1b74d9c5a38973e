//! Error types for minimpi

use crate::datatype::DatatypeTag;
use thiserror::Error;

/// Result type for minimpi operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for group and transfer operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The group was formed incorrectly, or a participant initialized twice
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Invalid rank specified
    #[error("Invalid rank: {0}")]
    InvalidRank(i32),

    /// Send addressed to a rank outside the group
    #[error("Invalid destination: {0}")]
    InvalidDestination(i32),

    /// Negative tag on a send, or a negative non-wildcard tag filter
    #[error("Invalid tag: {0}")]
    InvalidTag(i32),

    /// Invalid count specified
    #[error("Invalid count: {0}")]
    InvalidCount(i64),

    /// Receive buffer length differs from the matched message length
    #[error("Count mismatch: buffer holds {expected} elements, message has {actual}")]
    CountMismatch {
        /// Capacity of the receive buffer
        expected: usize,
        /// Length of the matched payload
        actual: usize,
    },

    /// Receive buffer element type differs from the matched message type
    #[error("Datatype mismatch: buffer is {expected:?}, message is {actual:?}")]
    DatatypeMismatch {
        /// Element type of the receive buffer
        expected: DatatypeTag,
        /// Element type of the matched payload
        actual: DatatypeTag,
    },

    /// Operation issued after finalize, or addressed to a closed participant
    #[error("Group has been finalized")]
    GroupFinalized,

    /// A blocked receive was interrupted by a queue shutdown
    #[error("Receive aborted by shutdown")]
    Aborted,
}
