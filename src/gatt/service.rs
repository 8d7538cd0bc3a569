use structbuf::{Pack, StructBuf};

use super::*;

/// Service definition ([Vol 3] Part G, Section 3.1).
///
/// Contributes the service declaration, any include declarations, and all
/// characteristics in declaration order.
#[derive(Debug)]
pub struct Svc {
    decl: SvcDecl,
    incs: Box<[Include]>,
    chars: AttrList<Char>,
    rule: Option<OutgoingPriority>,
    cccds: usize,
}

impl Svc {
    /// Creates a service definition.
    pub(super) fn new(
        uuid: Uuid,
        primary: bool,
        incs: Vec<Include>,
        chars: Vec<Char>,
        rule: Option<OutgoingPriority>,
    ) -> Self {
        let cccds = chars.iter().filter(|c| c.has_client_cfg()).count();
        Self {
            decl: SvcDecl { uuid, primary },
            incs: incs.into_boxed_slice(),
            chars: AttrList::new(chars),
            rule,
            cccds,
        }
    }

    /// Returns the service UUID.
    #[inline(always)]
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.decl.uuid
    }

    /// Returns whether this is a primary service.
    #[inline(always)]
    #[must_use]
    pub const fn is_primary(&self) -> bool {
        self.decl.primary
    }

    /// Returns the number of service attributes that precede the first
    /// characteristic declaration.
    #[inline]
    #[must_use]
    pub fn service_attr_count(&self) -> usize {
        1 + self.incs.len()
    }

    /// Returns the number of characteristics with a Client Characteristic
    /// Configuration descriptor.
    #[inline(always)]
    #[must_use]
    pub const fn client_cfg_count(&self) -> usize {
        self.cccds
    }

    /// Returns the service characteristics in declaration order.
    #[inline(always)]
    #[must_use]
    pub fn characteristics(&self) -> &[Char] {
        &self.chars
    }

    /// Returns the service-scope priority rule.
    #[inline(always)]
    #[must_use]
    pub const fn priority(&self) -> Option<&OutgoingPriority> {
        self.rule.as_ref()
    }
}

impl AttrProvider for Svc {
    #[inline]
    fn attr_count(&self) -> usize {
        self.service_attr_count() + self.chars.attr_count()
    }

    fn attr_at(&self, i: usize) -> Attr<'_> {
        if i == 0 {
            let typ = if self.decl.primary {
                Declaration::PrimaryService
            } else {
                Declaration::SecondaryService
            };
            return Attr::new(typ, &self.decl);
        }
        match self.incs.get(i - 1) {
            Some(inc) => Attr::new(Declaration::Include, inc),
            None => self.chars.attr_at(i - self.service_attr_count()),
        }
    }
}

/// Primary or secondary service declaration attribute.
#[derive(Debug)]
struct SvcDecl {
    uuid: Uuid,
    primary: bool,
}

impl AttrAccess for SvcDecl {
    fn access(&self, args: &mut AccessArgs<'_>, _: Handle) -> AccessResult {
        match args.op() {
            AccessOp::Read => {
                let mut b = StructBuf::new(Uuid::BYTES);
                b.append().uuid(self.uuid);
                args.read_from(&b)
            }
            AccessOp::Write => AccessResult::WriteNotPermitted,
            AccessOp::CompareUuid128 => AccessResult::Success,
        }
    }
}

/// Include declaration attribute ([Vol 3] Part G, Section 3.2). The service
/// UUID is only part of the value if it is a 16-bit UUID.
#[derive(Clone, Copy, Debug)]
pub(super) struct Include {
    grp: HandleRange,
    uuid: Option<Uuid16>,
}

impl Include {
    #[inline]
    pub(super) fn new(grp: HandleRange, uuid: Uuid) -> Self {
        Self {
            grp,
            uuid: uuid.as_uuid16(),
        }
    }
}

impl AttrAccess for Include {
    fn access(&self, args: &mut AccessArgs<'_>, _: Handle) -> AccessResult {
        match args.op() {
            AccessOp::Read => {
                let mut b = StructBuf::new(2 + 2 + Uuid16::BYTES);
                {
                    let mut p = b.append();
                    p.u16(self.grp.start()).u16(self.grp.end());
                    if let Some(u) = self.uuid {
                        p.u16(u);
                    }
                }
                args.read_from(&b)
            }
            AccessOp::Write => AccessResult::WriteNotPermitted,
            AccessOp::CompareUuid128 => AccessResult::Success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(at: Attr) -> Vec<u8> {
        let mut buf = [0_u8; 32];
        let mut args = AccessArgs::read(&mut buf);
        assert_eq!(at.access(&mut args, Handle::MIN), AccessResult::Success);
        args.output().to_vec()
    }

    fn chr(uuid: Characteristic, props: Prop) -> Char {
        let descs = if props.needs_client_cfg() {
            vec![Desc::client_cfg()]
        } else {
            vec![]
        };
        Char::new(uuid.uuid(), props, Value::read_only([0_u8]), descs)
    }

    #[test]
    fn layout() {
        let grp = HandleRange::new(Handle::new(1).unwrap(), Handle::new(4).unwrap());
        let s = Svc::new(
            Service::HeartRate.uuid(),
            true,
            vec![Include::new(grp, Service::Battery.uuid())],
            vec![
                chr(Characteristic::HeartRateMeasurement, Prop::NOTIFY),
                chr(Characteristic::BodySensorLocation, Prop::READ),
            ],
            None,
        );
        assert!(s.is_primary());
        assert_eq!(s.service_attr_count(), 2);
        assert_eq!(s.client_cfg_count(), 1);
        assert_eq!(s.attr_count(), 2 + 3 + 2);
        assert!(s.priority().is_none());

        let decl = s.attr_at(0);
        assert_eq!(decl.typ(), AttrType::from(Declaration::PrimaryService));
        assert_eq!(read(decl), [0x0D, 0x18]);

        let inc = s.attr_at(1);
        assert_eq!(inc.typ(), AttrType::from(Declaration::Include));
        assert_eq!(read(inc), [0x01, 0x00, 0x04, 0x00, 0x0F, 0x18]);

        let typs: Vec<_> = (2..s.attr_count()).map(|i| s.attr_at(i).typ()).collect();
        assert_eq!(
            typs,
            [
                AttrType::from(Declaration::Characteristic),
                AttrType::from(Characteristic::HEART_RATE_MEASUREMENT),
                AttrType::from(Descriptor::ClientCharacteristicConfiguration),
                AttrType::from(Declaration::Characteristic),
                AttrType::from(Characteristic::BODY_SENSOR_LOCATION),
            ]
        );
    }

    #[test]
    fn secondary_uuid128() {
        let u = Uuid::new(0xA0B1_C2D3_0000_0000_0000_0000_0000_0001).unwrap();
        let grp = HandleRange::new(Handle::new(0x10).unwrap(), Handle::new(0x12).unwrap());
        let s = Svc::new(u, false, vec![Include::new(grp, u)], vec![], None);
        assert_eq!(s.attr_count(), 2);
        assert_eq!(s.attr_at(0).typ(), AttrType::from(Declaration::SecondaryService));
        assert_eq!(read(s.attr_at(0)), u.to_bytes());
        assert_eq!(read(s.attr_at(1)), [0x10, 0x00, 0x12, 0x00]);
        assert_eq!(
            s.attr_at(0).access(&mut AccessArgs::write(&[1]), Handle::MIN),
            AccessResult::WriteNotPermitted
        );
    }
}
