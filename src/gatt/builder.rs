use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};

use bitflags::bitflags;
use tracing::trace;

use super::*;

/// Server definition marker type.
#[derive(Debug)]
pub struct ServerDef;

/// Service definition marker type.
#[derive(Debug)]
pub struct ServiceDef;

/// Characteristic definition marker type.
#[derive(Debug)]
pub struct CharacteristicDef;

/// Server builder used to define services, characteristics, and descriptors.
/// Handles are assigned in definition order starting at `0x0001`.
#[derive(Debug)]
#[repr(transparent)]
pub struct Builder<T>(DbBuilder, PhantomData<T>);

impl<T> Deref for Builder<T> {
    type Target = DbBuilder;

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Builder<T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Builder<ServerDef> {
    /// Creates a new server builder.
    #[inline]
    #[must_use]
    pub(super) fn new() -> Self {
        Self(
            DbBuilder {
                svcs: Vec::with_capacity(8),
                grp: Vec::with_capacity(8),
                ..DbBuilder::default()
            },
            PhantomData,
        )
    }

    /// Validates all priority rules and returns the final read-only server.
    pub fn freeze(self) -> Result<Server> {
        let b = self.0;
        if let Some(e) = b.err {
            return Err(e);
        }
        Server::new(b.svcs, b.rule.as_ref())
    }

    /// Defines a primary service ([Vol 3] Part G, Section 3.1). `include`
    /// contains the handles of previously defined services.
    #[inline]
    pub fn primary_service<T>(
        &mut self,
        uuid: impl Into<Uuid>,
        include: impl AsRef<[Handle]>,
        chars: impl FnOnce(&mut Builder<ServiceDef>) -> T,
    ) -> (Handle, T) {
        self.service(true, uuid.into(), include.as_ref(), chars)
    }

    /// Defines a secondary service ([Vol 3] Part G, Section 3.1). `include`
    /// contains the handles of previously defined services.
    #[inline]
    pub fn secondary_service<T>(
        &mut self,
        uuid: impl Into<Uuid>,
        include: impl AsRef<[Handle]>,
        chars: impl FnOnce(&mut Builder<ServiceDef>) -> T,
    ) -> (Handle, T) {
        self.service(false, uuid.into(), include.as_ref(), chars)
    }

    /// Sets the server-scope priority rule, which may only name services.
    pub fn priority(&mut self, rule: OutgoingPriority) {
        if self.rule.is_some() {
            self.fail(Error::DuplicateRule {
                scope: RuleScope::Server,
            });
        }
        self.rule = Some(rule);
    }

    /// Declares a service, its includes ([Vol 3] Part G, Section 3.2), and
    /// calls `f` to define service characteristics.
    fn service<T>(
        &mut self,
        primary: bool,
        uuid: Uuid,
        include: &[Handle],
        f: impl FnOnce(&mut Builder<ServiceDef>) -> T,
    ) -> (Handle, T) {
        let hdl = self.alloc();
        for &inc in include {
            let i = (self.grp.iter().position(|g| g.start() == inc))
                .expect("invalid service handle");
            let inc = Include::new(self.grp[i], self.svcs[i].uuid());
            self.alloc();
            self.incs.push(inc);
        }
        self.svc = Some(uuid);
        let v = f(self.builder());
        let end = self.last();
        trace!("Service {uuid} at {hdl}..={end}");
        let s = Svc::new(
            uuid,
            primary,
            mem::take(&mut self.incs),
            mem::take(&mut self.chars),
            self.svc_rule.take(),
        );
        self.grp.push(HandleRange::new(hdl, end));
        self.svcs.push(s);
        self.svc = None;
        (hdl, v)
    }
}

impl Builder<ServiceDef> {
    /// Defines a characteristic with value storage `val`
    /// ([Vol 3] Part G, Section 3.3) and returns the value handle. A Client
    /// Characteristic Configuration descriptor is added automatically if
    /// `props` contain `NOTIFY` or `INDICATE`.
    pub fn characteristic<T>(
        &mut self,
        uuid: impl Into<Uuid>,
        props: Prop,
        val: Value,
        descs: impl FnOnce(&mut Builder<CharacteristicDef>) -> T,
    ) -> (Handle, T) {
        self.alloc();
        let hdl = self.alloc();
        let mut flag = Bld::empty();
        flag.set(Bld::NEED_CCCD, props.needs_client_cfg());
        self.flag = flag;
        let b: &mut Builder<CharacteristicDef> = self.0.builder();
        let v = descs(b);
        b.finalize();
        let descs = mem::take(&mut self.descs);
        self.chars.push(Char::new(uuid.into(), props, val, descs));
        (hdl, v)
    }

    /// Defines a read-only characteristic with a fixed value
    /// ([Vol 3] Part G, Section 3.3).
    #[inline]
    pub fn ro_characteristic<T>(
        &mut self,
        uuid: impl Into<Uuid>,
        val: impl AsRef<[u8]>,
        descs: impl FnOnce(&mut Builder<CharacteristicDef>) -> T,
    ) -> T {
        (self.characteristic(uuid, Prop::READ, Value::read_only(val), descs)).1
    }

    /// Sets the service-scope priority rule, which may only name
    /// characteristics of this service.
    pub fn priority(&mut self, rule: OutgoingPriority) {
        if self.svc_rule.is_some() {
            let scope = RuleScope::Service(self.svc.expect("service builder outside of a service"));
            self.fail(Error::DuplicateRule { scope });
        }
        self.svc_rule = Some(rule);
    }
}

impl Builder<CharacteristicDef> {
    /// Declares a characteristic descriptor with value storage `val`
    /// ([Vol 3] Part G, Section 3.3.3).
    #[inline]
    pub fn descriptor(&mut self, uuid: impl Into<Uuid>, val: Value) -> Handle {
        let uuid = uuid.into();
        assert_ne!(
            uuid,
            Descriptor::ClientCharacteristicConfiguration.uuid(),
            "use client_cfg() to declare a CCCD"
        );
        let hdl = self.alloc();
        self.descs.push(Desc::new(uuid, val));
        hdl
    }

    /// Declares a read-only characteristic descriptor with a fixed value
    /// ([Vol 3] Part G, Section 3.3.3).
    #[inline]
    pub fn ro_descriptor(&mut self, uuid: impl Into<Uuid>, val: impl AsRef<[u8]>) -> Handle {
        self.descriptor(uuid, Value::read_only(val))
    }

    /// Declares a Characteristic User Description descriptor
    /// ([Vol 3] Part G, Section 3.3.3.2).
    pub fn user_description(&mut self, desc: &str) -> Handle {
        assert!(
            !self.flag.contains(Bld::HAVE_USER_DESC),
            "descriptor already exists"
        );
        self.flag.insert(Bld::HAVE_USER_DESC);
        self.ro_descriptor(Descriptor::CharacteristicUserDescription, desc)
    }

    /// Declares a Client Characteristic Configuration descriptor
    /// ([Vol 3] Part G, Section 3.3.3.3).
    ///
    /// This descriptor will be added automatically if the characteristic
    /// properties contain `NOTIFY` or `INDICATE` flags.
    pub fn client_cfg(&mut self) -> Handle {
        assert!(
            !self.flag.contains(Bld::HAVE_CCCD),
            "descriptor already exists"
        );
        self.flag.insert(Bld::HAVE_CCCD);
        let hdl = self.alloc();
        self.descs.push(Desc::client_cfg());
        hdl
    }

    /// Finalizes characteristic definition by adding required descriptors.
    fn finalize(&mut self) {
        if self.flag.contains(Bld::NEED_CCCD) && !self.flag.contains(Bld::HAVE_CCCD) {
            self.client_cfg();
        }
    }
}

bitflags! {
    /// Builder flags.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[repr(transparent)]
    pub struct Bld: u8 {
        const NEED_CCCD = 1 << 0;
        const HAVE_CCCD = 1 << 1;
        const HAVE_USER_DESC = 1 << 2;
    }
}

/// Shared [`Server`] builder state.
#[derive(Debug, Default)]
pub struct DbBuilder {
    svcs: Vec<Svc>,
    grp: Vec<HandleRange>,
    n: usize,
    svc: Option<Uuid>,
    incs: Vec<Include>,
    chars: Vec<Char>,
    svc_rule: Option<OutgoingPriority>,
    descs: Vec<Desc>,
    flag: Bld,
    rule: Option<OutgoingPriority>,
    err: Option<Error>,
}

impl DbBuilder {
    /// Returns the number of attributes defined so far.
    #[inline(always)]
    #[must_use]
    pub const fn attr_count(&self) -> usize {
        self.n
    }

    /// Allocates the next handle.
    #[inline]
    fn alloc(&mut self) -> Handle {
        let hdl = Handle::from_index(self.n).expect("maximum handle reached");
        self.n += 1;
        hdl
    }

    /// Returns the last allocated handle.
    #[inline]
    fn last(&self) -> Handle {
        (self.n.checked_sub(1).and_then(Handle::from_index)).expect("empty server")
    }

    /// Records the first definition error, which is reported by
    /// [`Builder::freeze`].
    #[inline]
    fn fail(&mut self, e: Error) {
        self.err.get_or_insert(e);
    }

    /// Returns a new builder.
    #[inline(always)]
    fn builder<T>(&mut self) -> &mut Builder<T> {
        // SAFETY: Builder is a `repr(transparent)` onetype
        unsafe { &mut *(self as *mut Self).cast() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles() {
        let mut b = Server::build();
        let (bas, lvl) = b.primary_service(Service::Battery, [], |b| {
            let (lvl, desc) = b.characteristic(
                Characteristic::BatteryLevel,
                Prop::READ | Prop::NOTIFY,
                Value::read_only([100_u8]),
                |b| b.user_description("Level"),
            );
            b.ro_characteristic(Characteristic::ModelNumberString, b"M1", |_| {});
            (lvl, desc)
        });
        assert_eq!(u16::from(bas), 1);
        assert_eq!(u16::from(lvl.0), 3);
        assert_eq!(u16::from(lvl.1), 4);
        assert_eq!(b.attr_count(), 7);

        let (hrs, hrm) = b.secondary_service(Service::HeartRate, [bas], |b| {
            b.characteristic(
                Characteristic::HeartRateMeasurement,
                Prop::NOTIFY,
                Value::new(Perm::empty(), 8, b""),
                |b| b.client_cfg(),
            )
        });
        assert_eq!(u16::from(hrs), 8);
        assert_eq!(u16::from(hrm.0), 11);
        assert_eq!(u16::from(hrm.1), 12);

        let s = b.freeze().unwrap();
        assert_eq!(s.attr_count(), 12);
        let bas = &s.services()[0];
        let descs = bas.characteristics()[0].descriptors();
        assert_eq!(descs.len(), 2);
        assert_eq!(descs[0].uuid(), Descriptor::CharacteristicUserDescription.uuid());
        assert!(descs[1].is_client_cfg());
        let hrs = &s.services()[1];
        assert!(!hrs.is_primary());
        assert_eq!(hrs.service_attr_count(), 2);
        assert_eq!(hrs.characteristics()[0].descriptors().len(), 1);
    }

    #[test]
    #[should_panic(expected = "descriptor already exists")]
    fn duplicate_cccd() {
        let mut b = Server::build();
        b.primary_service(Service::Battery, [], |b| {
            b.characteristic(
                Characteristic::BatteryLevel,
                Prop::NOTIFY,
                Value::read_only([0_u8]),
                |b| {
                    b.client_cfg();
                    b.client_cfg();
                },
            );
        });
    }

    #[test]
    #[should_panic(expected = "invalid service handle")]
    fn invalid_include() {
        let mut b = Server::build();
        b.primary_service(Service::Battery, [Handle::MAX], |_| {});
    }

    #[test]
    fn duplicate_rule() {
        let mut b = Server::build();
        b.primary_service(Service::Battery, [], |b| {
            b.priority(OutgoingPriority::higher([Characteristic::BatteryLevel]));
            b.priority(OutgoingPriority::lower([Characteristic::BatteryLevel]));
        });
        assert!(matches!(
            b.freeze(),
            Err(Error::DuplicateRule { scope: RuleScope::Service(u) }) if u == Service::Battery.uuid()
        ));

        let mut b = Server::build();
        b.primary_service(Service::Battery, [], |_| {});
        b.priority(OutgoingPriority::higher([Service::Battery]));
        b.priority(OutgoingPriority::higher([Service::Battery]));
        assert!(matches!(
            b.freeze(),
            Err(Error::DuplicateRule {
                scope: RuleScope::Server
            })
        ));
    }
}
