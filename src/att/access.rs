use std::fmt::Debug;

use super::*;

/// Attribute access operation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AccessOp {
    Read,
    Write,
    /// Compares the 128-bit attribute type stored by the access function with
    /// the supplied UUID.
    CompareUuid128,
}

/// Result of a single attribute access. Every variant is an expected outcome
/// that the caller has to branch on.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[must_use]
pub enum AccessResult {
    Success,
    /// The value was longer than the output buffer. The buffer holds as much
    /// of the value as fits.
    ReadTruncated,
    /// The value was longer than the attribute can store. The attribute holds
    /// as much of the value as fits.
    WriteTruncated,
    /// The written value does not have the fixed length that the attribute
    /// requires. The attribute is unchanged.
    InvalidLength,
    WriteNotPermitted,
    ReadNotPermitted,
    /// Returned for [`AccessOp::CompareUuid128`] when the attribute type is a
    /// 128-bit UUID equal to the supplied one.
    UuidEqual,
}

impl AccessResult {
    /// Returns whether the access transferred any data.
    #[inline]
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(
            self,
            Self::Success | Self::ReadTruncated | Self::WriteTruncated | Self::UuidEqual
        )
    }
}

/// Attribute access arguments. Access functions never touch memory outside of
/// the supplied buffers.
#[derive(Debug)]
pub enum AccessArgs<'a> {
    /// Read into `buf`. `n` is set to the number of bytes written.
    Read { buf: &'a mut [u8], n: usize },
    /// Write the provided value.
    Write(&'a [u8]),
    /// Compare the attribute type with a little-endian 128-bit UUID.
    CompareUuid128(&'a [u8; Uuid::BYTES]),
}

impl<'a> AccessArgs<'a> {
    /// Creates read access arguments.
    #[inline]
    #[must_use]
    pub fn read(buf: &'a mut [u8]) -> Self {
        Self::Read { buf, n: 0 }
    }

    /// Creates write access arguments.
    #[inline]
    #[must_use]
    pub const fn write(v: &'a [u8]) -> Self {
        Self::Write(v)
    }

    /// Creates 128-bit UUID comparison arguments.
    #[inline]
    #[must_use]
    pub const fn compare_uuid128(u: &'a [u8; Uuid::BYTES]) -> Self {
        Self::CompareUuid128(u)
    }

    /// Returns the access operation.
    #[inline]
    #[must_use]
    pub const fn op(&self) -> AccessOp {
        match *self {
            Self::Read { .. } => AccessOp::Read,
            Self::Write(_) => AccessOp::Write,
            Self::CompareUuid128(_) => AccessOp::CompareUuid128,
        }
    }

    /// Returns the bytes produced by a read operation. Empty for other
    /// operations.
    #[inline]
    #[must_use]
    pub fn output(&self) -> &[u8] {
        match *self {
            Self::Read { ref buf, n } => &buf[..n],
            _ => &[],
        }
    }

    /// Completes a read operation by copying as much of `v` as fits into the
    /// output buffer.
    pub fn read_from(&mut self, v: &[u8]) -> AccessResult {
        let Self::Read { ref mut buf, ref mut n } = *self else {
            return AccessResult::ReadNotPermitted;
        };
        *n = v.len().min(buf.len());
        buf[..*n].copy_from_slice(&v[..*n]);
        if *n < v.len() {
            AccessResult::ReadTruncated
        } else {
            AccessResult::Success
        }
    }
}

/// Attribute access function. Implemented by the value holders that attribute
/// providers lend out through [`Attr`] records.
pub trait AttrAccess: Debug + Send + Sync {
    /// Performs the requested operation on the attribute with handle `hdl`.
    fn access(&self, args: &mut AccessArgs<'_>, hdl: Handle) -> AccessResult;
}
