use matches::assert_matches;

use super::*;

const fn svc(v: u128) -> ServiceUuid {
    match ServiceUuid::new(0xA000_0000_0000_0000_0000_0000_0000_0000 | v) {
        Some(u) => u,
        None => unreachable!(),
    }
}

const fn chr(v: u128) -> CharUuid {
    match CharUuid::new(0xC000_0000_0000_0000_0000_0000_0000_0000 | v) {
        Some(u) => u,
        None => unreachable!(),
    }
}

const SVC: [ServiceUuid; 3] = [svc(0xA), svc(0xB), svc(0xC)];
const CHR: [CharUuid; 3] = [chr(0xA), chr(0xB), chr(0xC)];

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// Server with services A, B, and C, each with notifying characteristics a, b,
/// and c. A raises b, B lowers a, C raises a and b, and the server raises A.
/// Returns the server and the characteristic values indexed by service and
/// characteristic.
fn abc() -> (Server, Vec<Vec<Value>>) {
    let rules = [
        OutgoingPriority::higher([CHR[1]]),
        OutgoingPriority::lower([CHR[0]]),
        OutgoingPriority::higher([CHR[0], CHR[1]]),
    ];
    let mut vals = Vec::new();
    let mut b = Server::build();
    for (s, rule) in SVC.into_iter().zip(rules) {
        let (_, v) = b.primary_service(s, [], |b| {
            b.priority(rule);
            (CHR.iter())
                .map(|&c| {
                    let v = Value::new(Perm::READ, 4, [0_u8]);
                    b.characteristic(c, Prop::READ | Prop::NOTIFY, v.clone(), |_| {});
                    v
                })
                .collect::<Vec<_>>()
        });
        vals.push(v);
    }
    b.priority(OutgoingPriority::higher([SVC[0]]));
    (b.freeze().unwrap(), vals)
}

/// Returns the (service, characteristic) index pair that owns value handle
/// `hdl`.
fn owner(s: &Server, vals: &[Vec<Value>], hdl: Handle) -> (usize, usize) {
    let e = (s.notifications().iter())
        .find(|e| e.handle() == hdl)
        .unwrap();
    for (i, v) in vals.iter().enumerate() {
        for (j, v) in v.iter().enumerate() {
            if s.find_notification(v) == Some(e) {
                return (i, j);
            }
        }
    }
    unreachable!()
}

#[test]
fn abc_order() {
    init_tracing();
    let (s, vals) = abc();
    s.dump();
    let order: Vec<_> = (0..s.notifications().len())
        .map(|i| owner(&s, &vals, s.by_priority_index(i)))
        .collect();
    assert_eq!(
        order,
        [
            (0, 1), (0, 0), (0, 2),
            (1, 0), (1, 1), (1, 2),
            (2, 0), (2, 1), (2, 2),
        ]
    );
    let prio: Vec<_> = s.notifications().iter().map(NotifyEntry::priority).collect();
    assert_eq!(prio, [0, 1, 1, 2, 2, 2, 2, 3, 4]);
}

#[test]
fn handles() {
    let (s, vals) = abc();
    // Each service: declaration + 3 * (declaration, value, CCCD)
    assert_eq!(s.attr_count(), 3 * (1 + 3 * 3));
    let mut decl = s.notifications().iter().collect::<Vec<_>>();
    decl.sort_by_key(|e| e.index());
    let hdls: Vec<_> = decl.iter().map(|e| u16::from(e.handle())).collect();
    assert_eq!(hdls, [3, 6, 9, 13, 16, 19, 23, 26, 29]);
    assert!(hdls.windows(2).all(|w| w[0] < w[1]));
    for (i, v) in vals.iter().flatten().enumerate() {
        assert_eq!(s.find_notification(v).map(NotifyEntry::index), Some(i));
    }
    assert!(s.get(Handle::MIN).is_some());
    assert!(s.get(Handle::new(30).unwrap()).is_some());
    assert!(s.get(Handle::new(31).unwrap()).is_none());
}

#[test]
fn round_trip() {
    let (s, vals) = abc();
    for i in 0..s.notifications().len() {
        let hdl = s.by_priority_index(i);
        let at = s.attr_at(hdl.index());
        let (si, ci) = owner(&s, &vals, hdl);
        assert!(at.is(CHR[ci].uuid(), hdl));

        vals[si][ci].set([0x10 + u8::try_from(i).unwrap()]);
        let mut buf = [0_u8; 4];
        let mut args = AccessArgs::read(&mut buf);
        assert_eq!(s.access(hdl, &mut args), Some(AccessResult::Success));
        assert_eq!(args.output(), [0x10 + u8::try_from(i).unwrap()]);
    }
}

#[test]
fn builder_handles() {
    let mut b = Server::build();
    let (gap, _) = b.primary_service(Service::GenericAccess, [], |b| {
        b.ro_characteristic(Characteristic::DeviceName, "Test", |_| {});
        b.ro_characteristic(Characteristic::Appearance, [0_u8; 2], |_| {});
    });
    let (bas, (lvl, fmt)) = b.primary_service(Service::Battery, [gap], |b| {
        b.characteristic(
            Characteristic::BatteryLevel,
            Prop::READ | Prop::INDICATE,
            Value::read_only([50_u8]),
            |b| {
                let fmt = [4_u8, 0, 0xAD, 0x27, 1, 0, 0];
                b.ro_descriptor(Descriptor::CharacteristicPresentationFormat, fmt)
            },
        )
    });
    let s = b.freeze().unwrap();
    assert_eq!(u16::from(gap), 1);
    assert_eq!(u16::from(bas), 6);
    assert_eq!(u16::from(lvl), 9);
    assert_eq!(u16::from(fmt), 10);
    assert_eq!(s.notifications().len(), 1);
    assert_eq!(s.by_priority_index(0), lvl);

    // Include declaration refers to the GAP service group
    let mut buf = [0_u8; 8];
    let mut args = AccessArgs::read(&mut buf);
    let inc = Handle::new(7).unwrap();
    assert_eq!(s.get(inc).unwrap().typ(), AttrType::from(Declaration::Include));
    assert_eq!(s.access(inc, &mut args), Some(AccessResult::Success));
    assert_eq!(args.output(), [0x01, 0x00, 0x05, 0x00, 0x00, 0x18]);

    // Characteristic declaration refers to the value handle
    let mut buf = [0_u8; 8];
    let mut args = AccessArgs::read(&mut buf);
    assert_eq!(s.access(Handle::new(8).unwrap(), &mut args), Some(AccessResult::Success));
    assert_eq!(args.output(), [0x22, 0x09, 0x00, 0x19, 0x2A]);

    // Presentation format precedes the automatic CCCD
    let typs: Vec<_> = (10..=11)
        .map(|h| s.get(Handle::new(h).unwrap()).unwrap().typ())
        .collect();
    assert_eq!(
        typs,
        [
            AttrType::from(Descriptor::CharacteristicPresentationFormat),
            AttrType::from(Descriptor::ClientCharacteristicConfiguration),
        ]
    );
    assert_eq!(s.attr_count(), 11);
    assert!(s.get(Handle::new(12).unwrap()).is_none());
    assert_eq!(s.access(Handle::new(12).unwrap(), &mut AccessArgs::write(&[1])), None);
    assert!(!s.services()[1].characteristics()[0].props().contains(Prop::NOTIFY));
}

#[test]
fn cccd_only() {
    let mut b = Server::build();
    let mut vals = Vec::new();
    b.primary_service(Service::EnvironmentalSensing, [], |b| {
        for (i, c) in [Characteristic::Temperature, Characteristic::Humidity]
            .into_iter()
            .enumerate()
        {
            let v = Value::read_only([0_u8]);
            let props = if i == 0 { Prop::READ } else { Prop::READ | Prop::NOTIFY };
            b.characteristic(c, props, v.clone(), |_| {});
            vals.push(v);
        }
        b.priority(OutgoingPriority::higher([Characteristic::Temperature]));
    });
    let s = b.freeze().unwrap();
    assert_eq!(s.notifications().len(), 1);
    assert_eq!(s.find_notification(&vals[0]), None);
    let e = s.find_notification(&vals[1]).unwrap();
    assert_eq!(u16::from(e.handle()), 5);
    assert_eq!((e.index(), e.priority()), (0, 1));
}

/// Inserting a service of equal priority between two others does not change
/// the relative order of the others.
#[test]
fn stable_order() {
    fn build(middle: bool) -> Vec<Uuid> {
        let mut b = Server::build();
        let add = |b: &mut Builder<ServerDef>, s: ServiceUuid| {
            b.primary_service(s, [], |b| {
                for &c in &CHR {
                    b.characteristic(c, Prop::NOTIFY, Value::read_only([0_u8]), |_| {});
                }
            });
        };
        add(&mut b, SVC[0]);
        if middle {
            add(&mut b, SVC[1]);
        }
        add(&mut b, SVC[2]);
        let s = b.freeze().unwrap();
        (0..s.notifications().len())
            .map(|i| {
                let h = s.by_priority_index(i);
                let svc = (s.services().iter())
                    .scan(1, |n, sv| {
                        let start = *n;
                        *n += sv.attr_count();
                        Some((start, sv.uuid()))
                    })
                    .filter(|&(start, _)| start <= usize::from(h))
                    .last()
                    .unwrap();
                svc.1
            })
            .collect()
    }
    let without = build(false);
    let with: Vec<_> = build(true)
        .into_iter()
        .filter(|&u| u != SVC[1].uuid())
        .collect();
    assert_eq!(without, with);
    assert_eq!(without[..3], [SVC[0].uuid(); 3]);
}

#[test]
fn find_foreign() {
    let (s, _) = abc();
    assert_eq!(s.find_notification(&Value::read_only([0_u8])), None);
}

#[test]
fn rule_errors() {
    let mut b = Server::build();
    b.primary_service(SVC[0], [], |b| {
        b.characteristic(CHR[0], Prop::NOTIFY, Value::read_only([0_u8]), |_| {});
        b.priority(OutgoingPriority::higher([SVC[1]]));
    });
    assert_matches!(
        b.freeze(),
        Err(Error::ServiceRuleParam { service, uuid })
            if service == SVC[0].uuid() && uuid == SVC[1].uuid()
    );

    let mut b = Server::build();
    b.primary_service(SVC[0], [], |_| {});
    b.priority(OutgoingPriority::higher([CHR[0]]));
    let e = b.freeze().unwrap_err();
    assert_matches!(e, Error::ServerRuleParam(u) if u == CHR[0].uuid());
    assert!(e.to_string().contains("not a service UUID"));

    let mut b = Server::build();
    b.primary_service(SVC[0], [], |_| {});
    b.priority(OutgoingPriority::lower([SVC[2]]));
    assert_matches!(b.freeze(), Err(Error::UnknownService(u)) if u == SVC[2].uuid());

    // Inert rules are still accepted
    let mut b = Server::build();
    b.primary_service(SVC[0], [], |b| {
        b.priority(OutgoingPriority::lower([CHR[2]]));
    });
    b.priority(OutgoingPriority::lower([SVC[0]]));
    assert!(b.freeze().is_ok());
}

#[test]
fn uuid128_table() {
    let (s, _) = abc();
    let hdl = Handle::new(1).unwrap();
    let at = s.get(hdl).unwrap();
    assert_eq!(at.typ(), AttrType::from(Declaration::PrimaryService));
    let mut buf = [0_u8; 16];
    let mut args = AccessArgs::read(&mut buf);
    assert_eq!(at.access(&mut args, hdl), AccessResult::Success);
    assert_eq!(args.output(), SVC[0].uuid().to_bytes());

    let hdl = Handle::new(3).unwrap();
    let at = s.get(hdl).unwrap();
    assert_eq!(at.typ(), AttrType::Uuid128);
    assert!(at.is(CHR[0].uuid(), hdl));
    assert!(!at.is(CHR[1].uuid(), hdl));
}

#[test]
#[should_panic(expected = "out of range")]
fn priority_index_range() {
    let (s, _) = abc();
    let _ = s.by_priority_index(9);
}

#[test]
#[should_panic(expected = "out of range")]
fn attr_index_range() {
    let (s, _) = abc();
    let _ = s.attr_at(s.attr_count());
}

#[test]
fn shared_lookup() {
    const fn is_send_sync<T: Send + Sync>() {}
    is_send_sync::<Server>();

    let (s, vals) = abc();
    let want: Vec<_> = (0..s.notifications().len())
        .map(|i| s.by_priority_index(i))
        .collect();
    std::thread::scope(|sc| {
        for _ in 0..4 {
            sc.spawn(|| {
                for (i, &hdl) in want.iter().enumerate() {
                    assert_eq!(s.by_priority_index(i), hdl);
                    assert_eq!(s.attr_at(hdl.index()).typ(), AttrType::Uuid128);
                }
                for (i, v) in vals.iter().flatten().enumerate() {
                    let e = s.find_notification(v).unwrap();
                    assert_eq!(e.index(), i);
                    assert!(want.contains(&e.handle()));
                }
            });
        }
    });
}
