use super::*;

bitflags::bitflags! {
    /// Attribute value access permissions ([Vol 3] Part F, Section 3.2.5).
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    #[must_use]
    #[repr(transparent)]
    pub struct Perm: u8 {
        /// Read access.
        const READ = 1 << 0;
        /// Write access.
        const WRITE = 1 << 1;
        /// Read/write access.
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

impl Perm {
    /// Tests whether the permissions allow the specified operation.
    #[inline]
    #[must_use]
    pub fn allows(self, op: AccessOp) -> bool {
        match op {
            AccessOp::Read => self.contains(Self::READ),
            AccessOp::Write => self.contains(Self::WRITE),
            AccessOp::CompareUuid128 => true,
        }
    }

    /// Returns the result reported when `op` is not allowed.
    #[inline]
    pub(crate) const fn denied(op: AccessOp) -> AccessResult {
        match op {
            AccessOp::Write => AccessResult::WriteNotPermitted,
            AccessOp::Read | AccessOp::CompareUuid128 => AccessResult::ReadNotPermitted,
        }
    }
}
