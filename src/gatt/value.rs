use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::util::name_of;

use super::*;

/// Inline capacity of a value before it spills to the heap.
const INLINE: usize = 20;

/// Attribute value storage shared between the server and the application.
///
/// Clones refer to the same storage. The storage address is the value's
/// identity, which maps a changed value back to the characteristic that
/// exposes it (see [`Notifications::find`]).
#[derive(Clone)]
#[must_use]
pub struct Value(Arc<Inner>);

struct Inner {
    perm: Perm,
    max: usize,
    buf: RwLock<SmallVec<[u8; INLINE]>>,
}

impl Value {
    /// Creates a value with access permissions `perm` that can hold up to
    /// `max_len` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `init` is longer than `max_len`.
    pub fn new(perm: Perm, max_len: usize, init: impl AsRef<[u8]>) -> Self {
        let init = init.as_ref();
        assert!(
            init.len() <= max_len,
            "initial value exceeds maximum length ({} > {max_len})",
            init.len()
        );
        Self(Arc::new(Inner {
            perm,
            max: max_len,
            buf: RwLock::new(SmallVec::from_slice(init)),
        }))
    }

    /// Creates a read-only value.
    #[inline]
    pub fn read_only(v: impl AsRef<[u8]>) -> Self {
        let v = v.as_ref();
        Self::new(Perm::READ, v.len(), v)
    }

    /// Returns the access permissions.
    #[inline(always)]
    pub fn perm(&self) -> Perm {
        self.0.perm
    }

    /// Returns the maximum value length.
    #[inline(always)]
    #[must_use]
    pub fn max_len(&self) -> usize {
        self.0.max
    }

    /// Calls `f` with the current value.
    #[inline]
    pub fn with<T>(&self, f: impl FnOnce(&[u8]) -> T) -> T {
        f(&self.0.buf.read())
    }

    /// Returns a copy of the current value.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Vec<u8> {
        self.with(<[u8]>::to_vec)
    }

    /// Replaces the value from the application side, ignoring permissions.
    /// Returns `false` if `v` is longer than the maximum length, in which case
    /// only the prefix that fits is stored.
    pub fn set(&self, v: impl AsRef<[u8]>) -> bool {
        let v = v.as_ref();
        let n = v.len().min(self.0.max);
        let mut buf = self.0.buf.write();
        buf.clear();
        buf.extend_from_slice(&v[..n]);
        n == v.len()
    }

    /// Returns whether `self` and `other` refer to the same storage.
    #[inline(always)]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Performs a client read or write subject to the value permissions.
    pub(super) fn access(&self, args: &mut AccessArgs<'_>) -> AccessResult {
        let op = args.op();
        if !self.0.perm.allows(op) {
            return Perm::denied(op);
        }
        match *args {
            AccessArgs::Read { .. } => args.read_from(&self.0.buf.read()),
            AccessArgs::Write(v) => {
                if self.set(v) {
                    AccessResult::Success
                } else {
                    AccessResult::WriteTruncated
                }
            }
            AccessArgs::CompareUuid128(_) => AccessResult::Success,
        }
    }
}

impl Debug for Value {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        (f.debug_tuple(name_of!(Value)).field(&Arc::as_ptr(&self.0))).finish()
    }
}
