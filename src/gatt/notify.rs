use tracing::trace;

use super::*;

/// Notification entry of a characteristic with a Client Characteristic
/// Configuration descriptor.
#[derive(
    Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize,
)]
pub struct NotifyEntry {
    hdl: Handle,
    idx: usize,
    prio: i32,
}

impl NotifyEntry {
    /// Returns the characteristic value handle.
    #[inline(always)]
    #[must_use]
    pub const fn handle(self) -> Handle {
        self.hdl
    }

    /// Returns the declaration index of the entry among all notifying
    /// characteristics.
    #[inline(always)]
    #[must_use]
    pub const fn index(self) -> usize {
        self.idx
    }

    /// Returns the entry priority. Lower values are sent first.
    #[inline(always)]
    #[must_use]
    pub const fn priority(self) -> i32 {
        self.prio
    }
}

/// Notification priority list of a server.
///
/// Holds one entry per characteristic with a Client Characteristic
/// Configuration descriptor, both in declaration order and in priority order.
/// Entries of equal priority keep their declaration order.
#[derive(Debug, Default)]
pub struct Notifications {
    decl: Box<[NotifyEntry]>,
    vals: Box<[Value]>,
    order: Box<[NotifyEntry]>,
}

impl Notifications {
    /// Assigns value handles and priorities to all characteristics of `svcs`
    /// and sorts the notifying ones by priority.
    ///
    /// # Panics
    ///
    /// Panics if the services do not fit into the handle space.
    #[must_use]
    pub fn resolve(svcs: &[Svc], eval: &PriorityEval<'_>) -> Self {
        let mut decl = Vec::new();
        let mut vals = Vec::new();
        let mut next = 1;
        for (i, s) in svcs.iter().enumerate() {
            next += s.service_attr_count();
            for c in s.characteristics() {
                let prio = eval.priority(i, c);
                if c.has_client_cfg() {
                    let hdl = Handle::from_index(next).expect("maximum handle reached");
                    decl.push(NotifyEntry {
                        hdl,
                        idx: decl.len(),
                        prio,
                    });
                    vals.push(c.value().clone());
                }
                next += c.attr_count();
            }
        }
        let mut order = decl.clone();
        order.sort_by_key(|e| e.prio);
        for (i, e) in order.iter().enumerate() {
            trace!("Notification {i}: {:?} idx={} prio={}", e.hdl, e.idx, e.prio);
        }
        Self {
            decl: decl.into_boxed_slice(),
            vals: vals.into_boxed_slice(),
            order: order.into_boxed_slice(),
        }
    }

    /// Returns the number of notifying characteristics.
    #[inline(always)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns whether there are no notifying characteristics.
    #[inline(always)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the value handle of the `i`-th entry in priority order.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    #[inline]
    #[must_use]
    pub fn by_priority_index(&self, i: usize) -> Handle {
        self.entry(i).hdl
    }

    /// Returns the `i`-th entry in priority order.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    #[inline]
    #[must_use]
    pub fn entry(&self, i: usize) -> NotifyEntry {
        match self.order.get(i) {
            Some(&e) => e,
            None => panic!("priority index {i} out of range (count {})", self.len()),
        }
    }

    /// Returns an iterator over all entries in priority order.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = NotifyEntry> + '_ {
        self.order.iter().copied()
    }

    /// Returns the entry of the characteristic that exposes `v` or [`None`]
    /// if `v` does not belong to a notifying characteristic.
    #[must_use]
    pub fn find(&self, v: &Value) -> Option<NotifyEntry> {
        (self.vals.iter().position(|x| x.ptr_eq(v))).map(|i| self.decl[i])
    }
}
