//! Attribute Protocol ([Vol 3] Part F) attribute records.
//!
//! An attribute is a type combined with a means of accessing its value. The
//! protocol engine resolves a handle to an [`Attr`] and calls
//! [`Attr::access`]; everything else about the attribute stays with the
//! provider that declared it.

use std::fmt::{Debug, Formatter};

pub use {access::*, handle::*, perm::*};

use bluetab_const::{Declaration, Descriptor, Uuid, Uuid16};

mod access;
mod handle;
mod perm;

/// Attribute type as stored in the table. All GATT profile attributes use
/// 16-bit UUIDs. Attributes with any other type are marked with `Uuid128` and
/// answer [`AccessOp::CompareUuid128`] through their access function.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub enum AttrType {
    Uuid16(Uuid16),
    Uuid128,
}

impl AttrType {
    /// Returns the table representation of attribute type `u`.
    #[inline]
    #[must_use]
    pub fn of(u: Uuid) -> Self {
        u.as_uuid16().map_or(Self::Uuid128, Self::Uuid16)
    }

    /// Returns the 16-bit UUID or [`None`] for the 128-bit marker.
    #[inline]
    #[must_use]
    pub const fn uuid16(self) -> Option<Uuid16> {
        match self {
            Self::Uuid16(u) => Some(u),
            Self::Uuid128 => None,
        }
    }
}

impl Debug for AttrType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Uuid16(u) => write!(f, "{u} <{u:?}>"),
            Self::Uuid128 => f.write_str("Uuid128"),
        }
    }
}

impl From<Uuid16> for AttrType {
    #[inline]
    fn from(u: Uuid16) -> Self {
        Self::Uuid16(u)
    }
}

impl From<Declaration> for AttrType {
    #[inline]
    fn from(d: Declaration) -> Self {
        Self::Uuid16(d.uuid16())
    }
}

impl From<Descriptor> for AttrType {
    #[inline]
    fn from(d: Descriptor) -> Self {
        Self::Uuid16(d.uuid16())
    }
}

/// Attribute record lent out by an attribute provider. Records are never
/// copied into the table; they borrow the provider's access function.
#[derive(Clone, Copy)]
#[must_use]
pub struct Attr<'a> {
    typ: AttrType,
    acc: &'a dyn AttrAccess,
}

impl<'a> Attr<'a> {
    /// Creates an attribute record.
    #[inline(always)]
    pub fn new(typ: impl Into<AttrType>, acc: &'a dyn AttrAccess) -> Self {
        Self {
            typ: typ.into(),
            acc,
        }
    }

    /// Returns the attribute type.
    #[inline(always)]
    #[must_use]
    pub const fn typ(&self) -> AttrType {
        self.typ
    }

    /// Performs attribute access. `hdl` must be the handle at which this
    /// record was found.
    #[inline]
    pub fn access(&self, args: &mut AccessArgs<'_>, hdl: Handle) -> AccessResult {
        self.acc.access(args, hdl)
    }

    /// Returns whether the attribute type equals `u`, comparing 128-bit types
    /// through the access function.
    #[must_use]
    pub fn is(&self, u: Uuid, hdl: Handle) -> bool {
        match (self.typ, u.as_uuid16()) {
            (AttrType::Uuid16(a), Some(b)) => a == b,
            (AttrType::Uuid128, None) => {
                let v = u.to_bytes();
                self.access(&mut AccessArgs::compare_uuid128(&v), hdl) == AccessResult::UuidEqual
            }
            _ => false,
        }
    }
}

impl Debug for Attr<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        (f.debug_struct("Attr").field("typ", &self.typ)).finish_non_exhaustive()
    }
}
