use std::sync::atomic::{AtomicU16, Ordering};

use structbuf::{Pack, StructBuf};

use super::*;

/// Characteristic definition ([Vol 3] Part G, Section 3.3).
///
/// Contributes the characteristic declaration, the characteristic value, and
/// all descriptors in declaration order.
#[derive(Debug)]
pub struct Char {
    decl: CharDecl,
    val: ValueAttr,
    descs: AttrList<Desc>,
    cccd: bool,
}

impl Char {
    /// Creates a characteristic definition.
    pub(super) fn new(uuid: Uuid, props: Prop, val: Value, descs: Vec<Desc>) -> Self {
        let cccd = descs.iter().any(Desc::is_client_cfg);
        Self {
            decl: CharDecl { props, uuid },
            val: ValueAttr { uuid, val },
            descs: AttrList::new(descs),
            cccd,
        }
    }

    /// Returns the characteristic UUID, which is also used for priority rule
    /// matching.
    #[inline(always)]
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.decl.uuid
    }

    /// Returns the characteristic properties.
    #[inline(always)]
    #[must_use]
    pub const fn props(&self) -> Prop {
        self.decl.props
    }

    /// Returns the characteristic value storage.
    #[inline(always)]
    pub const fn value(&self) -> &Value {
        &self.val.val
    }

    /// Returns whether the characteristic has a Client Characteristic
    /// Configuration descriptor, which makes it eligible for notifications and
    /// indications.
    #[inline(always)]
    #[must_use]
    pub const fn has_client_cfg(&self) -> bool {
        self.cccd
    }

    /// Returns the current client configuration or [`None`] if the
    /// characteristic does not have a CCCD.
    #[must_use]
    pub fn client_cfg(&self) -> Option<Cccd> {
        (self.descs.iter()).find_map(|d| match d.kind {
            DescKind::ClientCfg(ref c) => Some(c.get()),
            DescKind::Value(_) => None,
        })
    }

    /// Returns the characteristic descriptors.
    #[inline(always)]
    #[must_use]
    pub fn descriptors(&self) -> &[Desc] {
        &self.descs
    }
}

impl AttrProvider for Char {
    #[inline]
    fn attr_count(&self) -> usize {
        2 + self.descs.attr_count()
    }

    fn attr_at(&self, i: usize) -> Attr<'_> {
        match i {
            0 => Attr::new(Declaration::Characteristic, &self.decl),
            1 => Attr::new(AttrType::of(self.val.uuid), &self.val),
            _ => self.descs.attr_at(i - 2),
        }
    }
}

/// Characteristic descriptor definition ([Vol 3] Part G, Section 3.3.3).
#[derive(Debug)]
pub struct Desc {
    uuid: Uuid,
    kind: DescKind,
}

#[derive(Debug)]
enum DescKind {
    Value(ValueAttr),
    ClientCfg(ClientCfg),
}

impl Desc {
    /// Creates a descriptor with the specified value storage.
    pub(super) const fn new(uuid: Uuid, val: Value) -> Self {
        Self {
            uuid,
            kind: DescKind::Value(ValueAttr { uuid, val }),
        }
    }

    /// Creates a Client Characteristic Configuration descriptor.
    pub(super) fn client_cfg() -> Self {
        Self {
            uuid: Descriptor::ClientCharacteristicConfiguration.uuid(),
            kind: DescKind::ClientCfg(ClientCfg::default()),
        }
    }

    /// Returns the descriptor UUID.
    #[inline(always)]
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Returns whether this is a Client Characteristic Configuration
    /// descriptor.
    #[inline]
    #[must_use]
    pub const fn is_client_cfg(&self) -> bool {
        matches!(self.kind, DescKind::ClientCfg(_))
    }
}

impl AttrProvider for Desc {
    #[inline(always)]
    fn attr_count(&self) -> usize {
        1
    }

    fn attr_at(&self, i: usize) -> Attr<'_> {
        assert_eq!(i, 0, "descriptor attribute index out of range");
        match self.kind {
            DescKind::Value(ref v) => Attr::new(AttrType::of(self.uuid), v),
            DescKind::ClientCfg(ref c) => Attr::new(Descriptor::ClientCharacteristicConfiguration, c),
        }
    }
}

/// Characteristic declaration attribute ([Vol 3] Part G, Section 3.3.1).
#[derive(Debug)]
struct CharDecl {
    props: Prop,
    uuid: Uuid,
}

impl AttrAccess for CharDecl {
    fn access(&self, args: &mut AccessArgs<'_>, hdl: Handle) -> AccessResult {
        match args.op() {
            AccessOp::Read => {}
            AccessOp::Write => return AccessResult::WriteNotPermitted,
            AccessOp::CompareUuid128 => return AccessResult::Success,
        }
        // The value attribute always follows the declaration
        let vhdl = hdl.next().expect("maximum handle reached");
        let mut b = StructBuf::new(1 + 2 + Uuid::BYTES);
        b.append().u8(self.props.bits()).u16(vhdl).uuid(self.uuid);
        args.read_from(&b)
    }
}

/// Characteristic value or descriptor attribute backed by [`Value`] storage.
#[derive(Debug)]
struct ValueAttr {
    uuid: Uuid,
    val: Value,
}

impl AttrAccess for ValueAttr {
    fn access(&self, args: &mut AccessArgs<'_>, _: Handle) -> AccessResult {
        match *args {
            AccessArgs::CompareUuid128(u) => {
                if self.uuid.as_uuid16().is_none() && *u == self.uuid.to_bytes() {
                    AccessResult::UuidEqual
                } else {
                    AccessResult::Success
                }
            }
            _ => self.val.access(args),
        }
    }
}

/// Client Characteristic Configuration descriptor attribute
/// ([Vol 3] Part G, Section 3.3.3.3).
#[derive(Debug, Default)]
struct ClientCfg(AtomicU16);

impl ClientCfg {
    #[inline]
    fn get(&self) -> Cccd {
        Cccd::from_bits_truncate(self.0.load(Ordering::Relaxed))
    }
}

impl AttrAccess for ClientCfg {
    fn access(&self, args: &mut AccessArgs<'_>, _: Handle) -> AccessResult {
        match *args {
            AccessArgs::Read { .. } => args.read_from(&self.get().bits().to_le_bytes()),
            AccessArgs::Write(v) => {
                let Ok(&b) = <&[u8; 2]>::try_from(v) else {
                    return AccessResult::InvalidLength;
                };
                let cfg = Cccd::from_bits_truncate(u16::from_le_bytes(b));
                self.0.store(cfg.bits(), Ordering::Relaxed);
                AccessResult::Success
            }
            AccessArgs::CompareUuid128(_) => AccessResult::Success,
        }
    }
}
