//! The unit of transfer between participants.

use std::any::Any;

use crate::datatype::{DatatypeTag, MpiDatatype};
use crate::error::{Error, Result};
use crate::status::Status;

/// An addressed, tagged payload in transit.
///
/// The payload is copied out of the sender's slice when the envelope is
/// built, so the sender may reuse its buffer as soon as `send` returns.
/// An envelope is never mutated after construction.
pub(crate) struct Envelope {
    source: i32,
    dest: i32,
    tag: i32,
    datatype: DatatypeTag,
    count: usize,
    payload: Box<dyn Any + Send>,
}

impl Envelope {
    pub(crate) fn new<T: MpiDatatype>(source: i32, dest: i32, tag: i32, data: &[T]) -> Self {
        Envelope {
            source,
            dest,
            tag,
            datatype: T::TAG,
            count: data.len(),
            payload: Box::new(data.to_vec()),
        }
    }

    pub(crate) fn source(&self) -> i32 {
        self.source
    }

    pub(crate) fn dest(&self) -> i32 {
        self.dest
    }

    pub(crate) fn tag(&self) -> i32 {
        self.tag
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn status(&self) -> Status {
        Status {
            source: self.source,
            tag: self.tag,
            count: self.count as i64,
        }
    }

    pub(crate) fn check_datatype<T: MpiDatatype>(&self) -> Result<()> {
        if self.datatype != T::TAG {
            return Err(Error::DatatypeMismatch {
                expected: T::TAG,
                actual: self.datatype,
            });
        }
        Ok(())
    }

    /// Check that `buf` can hold this payload exactly.
    pub(crate) fn check_fits<T: MpiDatatype>(&self, buf: &[T]) -> Result<()> {
        self.check_datatype::<T>()?;
        if self.count != buf.len() {
            return Err(Error::CountMismatch {
                expected: buf.len(),
                actual: self.count,
            });
        }
        Ok(())
    }

    /// Copy the payload into `buf`, consuming the envelope.
    pub(crate) fn copy_into<T: MpiDatatype>(self, buf: &mut [T]) -> Result<Status> {
        self.check_fits(buf)?;
        let (data, status) = self.into_vec::<T>()?;
        buf.copy_from_slice(&data);
        Ok(status)
    }

    /// Take ownership of the payload.
    pub(crate) fn into_vec<T: MpiDatatype>(self) -> Result<(Vec<T>, Status)> {
        let status = self.status();
        let expected = T::TAG;
        let actual = self.datatype;
        let data = self
            .payload
            .downcast::<Vec<T>>()
            .map_err(|_| Error::DatatypeMismatch { expected, actual })?;
        Ok((*data, status))
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("source", &self.source)
            .field("dest", &self.dest)
            .field("tag", &self.tag)
            .field("datatype", &self.datatype)
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}
