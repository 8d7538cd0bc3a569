use tracing::{debug, info};

use super::*;

/// Read-only GATT server attribute table and notification priority list.
///
/// The structure never changes after [`Builder::freeze`]. All queries are pure
/// lookups, so a server can be shared between the protocol engine and the
/// notification scheduler without locking.
#[derive(Debug)]
pub struct Server {
    svcs: AttrList<Svc>,
    ntf: Notifications,
}

impl Server {
    /// Returns a new server builder.
    #[inline]
    #[must_use]
    pub fn build() -> Builder<ServerDef> {
        Builder::new()
    }

    /// Creates a server from service definitions and an optional server-scope
    /// priority rule.
    pub(super) fn new(svcs: Vec<Svc>, rule: Option<&OutgoingPriority>) -> Result<Self> {
        let ntf = Notifications::resolve(&svcs, &PriorityEval::new(&svcs, rule)?);
        let this = Self {
            svcs: AttrList::new(svcs),
            ntf,
        };
        debug_assert!(this.ntf.iter().all(|e| this.is_value_of(e)));
        debug!(
            "Server with {} services, {} attributes, {} notifying characteristics",
            this.svcs.len(),
            this.attr_count(),
            this.ntf.len()
        );
        Ok(this)
    }

    /// Returns the service definitions in declaration order.
    #[inline(always)]
    #[must_use]
    pub fn services(&self) -> &[Svc] {
        &self.svcs
    }

    /// Returns the attribute with handle `hdl` or [`None`] if the handle is
    /// not part of the table.
    #[inline]
    pub fn get(&self, hdl: Handle) -> Option<Attr<'_>> {
        (hdl.index() < self.attr_count()).then(|| self.attr_at(hdl.index()))
    }

    /// Performs attribute access on the attribute with handle `hdl`. Returns
    /// [`None`] if the handle is not part of the table.
    #[inline]
    pub fn access(&self, hdl: Handle, args: &mut AccessArgs<'_>) -> Option<AccessResult> {
        self.get(hdl).map(|at| at.access(args, hdl))
    }

    /// Returns the notification priority list.
    #[inline(always)]
    #[must_use]
    pub const fn notifications(&self) -> &Notifications {
        &self.ntf
    }

    /// Returns the value handle of the `i`-th notifying characteristic in
    /// priority order.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    #[inline]
    #[must_use]
    pub fn by_priority_index(&self, i: usize) -> Handle {
        self.ntf.by_priority_index(i)
    }

    /// Returns the notification entry of the characteristic exposing `v`.
    #[inline]
    #[must_use]
    pub fn find_notification(&self, v: &Value) -> Option<NotifyEntry> {
        self.ntf.find(v)
    }

    /// Logs the contents of the attribute table.
    pub fn dump(&self) {
        macro_rules! log {
            ($hdl:expr, $fmt:expr$(, $($args:tt)*)?) => {
                info!("[{:#06X}] {}", $hdl, format_args!($fmt$(, $($args)*)?))
            };
        }
        info!("GATT server:");
        let mut hdl = 1_usize;
        for s in self.svcs.iter() {
            let uuid = s.uuid();
            let sec = (!s.is_primary()).then_some("(Secondary) ").unwrap_or_default();
            if let UuidType::Service(v) = uuid.typ() {
                log!(hdl, "{sec}{v} <{uuid}>");
            } else {
                log!(hdl, "{sec}Service <{uuid}>");
            }
            for i in 1..s.service_attr_count() {
                log!(hdl + i, "|__ [Include]");
            }
            hdl += s.service_attr_count();
            let n = s.characteristics().len();
            for (i, c) in s.characteristics().iter().enumerate() {
                let cont = if i + 1 < n { '|' } else { ' ' };
                let uuid = c.uuid();
                if let UuidType::Characteristic(v) = uuid.typ() {
                    log!(hdl, "|__ {v} <{uuid}>");
                } else {
                    log!(hdl, "|__ Characteristic <{uuid}>");
                }
                log!(hdl + 1, "{cont}   |__ [Value {:?}]", c.props());
                for (j, d) in c.descriptors().iter().enumerate() {
                    let uuid = d.uuid();
                    if let UuidType::Descriptor(v) = uuid.typ() {
                        log!(hdl + 2 + j, "{cont}   |__ {v} <{uuid}>");
                    } else {
                        log!(hdl + 2 + j, "{cont}   |__ Descriptor <{uuid}>");
                    }
                }
                hdl += c.attr_count();
            }
        }
        info!("Notification priorities:");
        for e in self.ntf.iter() {
            log!(u16::from(e.handle()), "#{} priority {}", e.index(), e.priority());
        }
    }

    /// Returns whether the entry handle refers to the value attribute of the
    /// characteristic that produced the entry.
    fn is_value_of(&self, e: NotifyEntry) -> bool {
        let Some(c) = (self.svcs.iter())
            .flat_map(|s| s.characteristics())
            .filter(|c| c.has_client_cfg())
            .nth(e.index())
        else {
            return false;
        };
        let Some(at) = self.get(e.handle()) else { return false };
        at.is(c.uuid(), e.handle())
            && (e.handle().index().checked_sub(1).and_then(|i| self.get(Handle::from_index(i)?)))
                .map_or(false, |d| d.typ() == AttrType::from(Declaration::Characteristic))
    }
}

impl AttrProvider for Server {
    #[inline(always)]
    fn attr_count(&self) -> usize {
        self.svcs.attr_count()
    }

    #[inline]
    fn attr_at(&self, i: usize) -> Attr<'_> {
        self.svcs.attr_at(i)
    }
}
