//! Payload element types.
//!
//! This module provides the [`MpiDatatype`] trait, a sealed trait naming the
//! fixed-width primitives a message payload can carry. Each type maps to a
//! [`DatatypeTag`] that travels with the envelope so a receive can reject a
//! buffer of the wrong element type instead of reinterpreting it.
//!
//! # Supported Types
//!
//! | Rust Type | Tag   |
//! |-----------|-------|
//! | `f32`     | `F32` |
//! | `f64`     | `F64` |
//! | `i32`     | `I32` |
//! | `i64`     | `I64` |
//! | `u8`      | `U8`  |
//! | `u32`     | `U32` |
//! | `u64`     | `U64` |

use crate::error::{Error, Result};

/// Seals the trait against external implementations.
mod sealed {
    pub trait Sealed {}
}

/// Element type carried by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatatypeTag {
    /// 32-bit floating point
    F32,
    /// 64-bit floating point
    F64,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 8-bit unsigned integer
    U8,
    /// 32-bit unsigned integer
    U32,
    /// 64-bit unsigned integer
    U64,
}

/// Trait for types that can be sent between participants.
///
/// This is a **sealed trait**: it cannot be implemented outside this crate.
/// Supported types: [`f32`], [`f64`], [`i32`], [`i64`], [`u8`], [`u32`], [`u64`].
///
/// # Example
///
/// ```
/// use minimpi::MpiDatatype;
///
/// fn element_tag<T: MpiDatatype>(_: &[T]) -> minimpi::DatatypeTag {
///     T::TAG
/// }
///
/// assert_eq!(element_tag(&[1i32, 2, 3]), minimpi::DatatypeTag::I32);
/// ```
pub trait MpiDatatype: sealed::Sealed + Copy + Send + Sync + 'static {
    /// The tag recorded in every envelope carrying this type.
    const TAG: DatatypeTag;
}

macro_rules! impl_mpi_datatype {
    ($ty:ty, $tag:expr) => {
        impl sealed::Sealed for $ty {}
        impl MpiDatatype for $ty {
            const TAG: DatatypeTag = $tag;
        }
    };
}

impl_mpi_datatype!(f32, DatatypeTag::F32);
impl_mpi_datatype!(f64, DatatypeTag::F64);
impl_mpi_datatype!(i32, DatatypeTag::I32);
impl_mpi_datatype!(i64, DatatypeTag::I64);
impl_mpi_datatype!(u8, DatatypeTag::U8);
impl_mpi_datatype!(u32, DatatypeTag::U32);
impl_mpi_datatype!(u64, DatatypeTag::U64);

/// Validate an externally supplied element count and turn it into a buffer
/// length.
///
/// # Errors
///
/// Returns [`Error::InvalidCount`] if `count` is negative or does not fit
/// in `usize`.
///
/// # Example
///
/// ```
/// let len = minimpi::buffer_len(4).unwrap();
/// let buf = vec![0i32; len];
/// assert_eq!(buf.len(), 4);
/// assert!(minimpi::buffer_len(-1).is_err());
/// ```
pub fn buffer_len(count: i64) -> Result<usize> {
    usize::try_from(count).map_err(|_| Error::InvalidCount(count))
}
