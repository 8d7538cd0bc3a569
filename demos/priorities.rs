#![allow(unused_crate_dependencies)]
#![allow(clippy::print_stdout)]

use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;

use bluetab::att::{AccessArgs, AccessResult, Perm};
use bluetab::gatt::{OutgoingPriority, Prop, Server, Value};
use bluetab::uuid::{CharUuid, ServiceUuid};

#[derive(Clone, Copy, Debug, clap::Parser)]
struct Args {
    /// Number of services, named A, B, C, ...
    #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=26))]
    services: u8,

    /// Number of notifying characteristics per service, named a, b, c, ...
    #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=26))]
    chars: u8,

    /// Omit the server-scope rule that raises service A.
    #[arg(long)]
    no_server_rule: bool,

    /// Log the attribute table.
    #[arg(short, long)]
    dump: bool,
}

const fn name(base: u8, i: u8) -> char {
    (base + i) as char
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let svc = |i: u8| ServiceUuid::new(0xA000_0000_0000_0000_0000_0000_0000_0000 | (u128::from(i) + 1));
    let chr = |i: u8| CharUuid::new(0xC000_0000_0000_0000_0000_0000_0000_0000 | (u128::from(i) + 1));

    let mut b = Server::build();
    for s in 0..args.services {
        let uuid = svc(s).expect("non-zero UUID");
        b.primary_service(uuid, [], |b| {
            let rule = match s % 3 {
                0 => OutgoingPriority::higher(chr(1)),
                1 => OutgoingPriority::lower(chr(0)),
                _ => OutgoingPriority::higher(chr(0).into_iter().chain(chr(1))),
            };
            b.priority(rule);
            for c in 0..args.chars {
                let val = Value::new(Perm::READ, 20, [s, c]);
                let uuid = chr(c).expect("non-zero UUID");
                b.characteristic(uuid, Prop::READ | Prop::NOTIFY, val, |_| {});
            }
        });
    }
    if !args.no_server_rule {
        b.priority(OutgoingPriority::higher(svc(0)));
    }
    let srv = b.freeze()?;
    if args.dump {
        srv.dump();
    }

    info!("{} notifying characteristics", srv.notifications().len());
    println!("Notification order (highest priority first):");
    for (i, e) in srv.notifications().iter().enumerate() {
        let at = srv.get(e.handle()).expect("value handle");
        let mut buf = [0_u8; 2];
        let mut acc = AccessArgs::read(&mut buf);
        let (s, c) = match (at.access(&mut acc, e.handle()), acc.output()) {
            (AccessResult::Success, &[s, c]) => (s, c),
            (r, v) => bail!("unexpected value {v:02X?} at {} ({r:?})", e.handle()),
        };
        println!(
            "{i:>3}: {}.{} handle={:#06X} priority={}",
            name(b'A', s),
            name(b'a', c),
            u16::from(e.handle()),
            e.priority()
        );
    }
    Ok(())
}
