use std::fmt::{Display, Formatter};

use smallvec::SmallVec;
use tracing::warn;

use super::*;

/// Identifier named by a priority rule. The kind is checked against the rule
/// scope when the server is frozen.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RuleUuid {
    Service(Uuid),
    Characteristic(Uuid),
    /// Identifier that is neither a service nor a characteristic. Always
    /// rejected by validation.
    Other(Uuid),
}

impl RuleUuid {
    /// Returns the untyped UUID.
    #[inline]
    #[must_use]
    pub const fn uuid(self) -> Uuid {
        match self {
            Self::Service(u) | Self::Characteristic(u) | Self::Other(u) => u,
        }
    }
}

impl From<Uuid> for RuleUuid {
    /// Classifies an untyped UUID. Vendor-specific UUIDs are only accepted
    /// through [`ServiceUuid`] or [`CharUuid`].
    fn from(u: Uuid) -> Self {
        match u.typ() {
            UuidType::Service(_) => Self::Service(u),
            UuidType::Characteristic(_) => Self::Characteristic(u),
            _ => Self::Other(u),
        }
    }
}

impl From<Service> for RuleUuid {
    #[inline]
    fn from(s: Service) -> Self {
        Self::Service(s.uuid())
    }
}

impl From<ServiceUuid> for RuleUuid {
    #[inline]
    fn from(s: ServiceUuid) -> Self {
        Self::Service(s.uuid())
    }
}

impl From<Characteristic> for RuleUuid {
    #[inline]
    fn from(c: Characteristic) -> Self {
        Self::Characteristic(c.uuid())
    }
}

impl From<CharUuid> for RuleUuid {
    #[inline]
    fn from(c: CharUuid) -> Self {
        Self::Characteristic(c.uuid())
    }
}

type UuidList = SmallVec<[RuleUuid; 4]>;

/// Outgoing notification and indication priority rule.
///
/// At server scope the rule names services; at service scope it names
/// characteristics of that service. UUIDs are given in decreasing order of
/// priority. Anything not named has a priority lower than the last named
/// entry, and all unnamed entries of a scope share that priority.
///
/// Given services `A`, `B`, and `C`, each with notifying characteristics `a`,
/// `b`, and `c`, where `A` raises `b`, `C` raises `a` and `b`, and the server
/// raises `A`, the resulting levels from highest to lowest are: `A.b`;
/// `A.a A.c`; `B.a B.b B.c C.a`; `C.b`; `C.c`. If `B` declares a `lower`
/// rule, it is treated as a service without a rule, so all of its
/// characteristics stay at `B`'s base priority, the same level as `C.a`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OutgoingPriority {
    Higher(UuidList),
    /// Accepted and validated like [`OutgoingPriority::Higher`], but has no
    /// effect on the resulting order.
    Lower(UuidList),
}

impl OutgoingPriority {
    /// Creates a rule that raises the priority of the named UUIDs.
    pub fn higher<T: Into<RuleUuid>>(uuids: impl IntoIterator<Item = T>) -> Self {
        Self::Higher(uuids.into_iter().map(Into::into).collect())
    }

    /// Creates a rule that lowers the priority of the named UUIDs. This rule
    /// currently has no effect.
    pub fn lower<T: Into<RuleUuid>>(uuids: impl IntoIterator<Item = T>) -> Self {
        Self::Lower(uuids.into_iter().map(Into::into).collect())
    }

    /// Returns the named UUIDs.
    #[inline]
    #[must_use]
    pub fn uuids(&self) -> &[RuleUuid] {
        match *self {
            Self::Higher(ref v) | Self::Lower(ref v) => v,
        }
    }

    /// Returns the UUIDs that affect the numeric priority.
    #[inline]
    fn raised(&self) -> &[RuleUuid] {
        match *self {
            Self::Higher(ref v) => v,
            Self::Lower(_) => &[],
        }
    }

    /// Returns the position of `u` in the raised list or the list length if
    /// it is not named.
    fn position(&self, u: Uuid) -> usize {
        let v = self.raised();
        v.iter().position(|r| r.uuid() == u).unwrap_or(v.len())
    }

    /// Verifies that a server-scope rule only names services.
    pub(super) fn check_server(&self) -> Result<()> {
        match self.uuids().iter().find(|r| !matches!(r, RuleUuid::Service(_))) {
            Some(r) => Err(Error::ServerRuleParam(r.uuid())),
            None => Ok(()),
        }
    }

    /// Verifies that a rule of service `svc` only names characteristics.
    pub(super) fn check_service(&self, svc: Uuid) -> Result<()> {
        match (self.uuids().iter()).find(|r| !matches!(r, RuleUuid::Characteristic(_))) {
            Some(r) => Err(Error::ServiceRuleParam {
                service: svc,
                uuid: r.uuid(),
            }),
            None => Ok(()),
        }
    }
}

/// Scope of a priority rule.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RuleScope {
    Server,
    Service(Uuid),
}

impl Display for RuleScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Server => f.write_str("server"),
            Self::Service(u) => write!(f, "service {u}"),
        }
    }
}

/// Priority rule evaluator. Service base priorities are computed once and
/// every characteristic priority is the base priority of its service plus its
/// position within the service rule. Lower values are sent first.
#[derive(Debug)]
pub struct PriorityEval<'a> {
    svcs: &'a [Svc],
    base: SmallVec<[i32; 8]>,
}

impl<'a> PriorityEval<'a> {
    /// Validates all rules and computes the base priority of each service.
    pub fn new(svcs: &'a [Svc], rule: Option<&OutgoingPriority>) -> Result<Self> {
        for s in svcs {
            let Some(r) = s.priority() else { continue };
            r.check_service(s.uuid())?;
            if let OutgoingPriority::Lower(_) = *r {
                warn!("Lower priority rule of service {} has no effect", s.uuid());
            }
            for u in r.uuids() {
                if !s.characteristics().iter().any(|c| c.uuid() == u.uuid()) {
                    warn!(
                        "Priority rule of service {} names undeclared characteristic {}",
                        s.uuid(),
                        u.uuid()
                    );
                }
            }
        }
        let mut this = Self {
            svcs,
            base: SmallVec::from_elem(0, svcs.len()),
        };
        let Some(r) = rule else { return Ok(this) };
        r.check_server()?;
        if let Some(u) = (r.uuids().iter()).find(|u| !svcs.iter().any(|s| s.uuid() == u.uuid())) {
            return Err(Error::UnknownService(u.uuid()));
        }
        if let OutgoingPriority::Lower(_) = *r {
            warn!("Lower server priority rule has no effect");
        }
        let named = r.raised();
        for (i, s) in svcs.iter().enumerate() {
            let n = r.position(s.uuid());
            let base: i32 = (named[..n].iter())
                .map(|u| Self::additional_priorities(this.named(u.uuid())))
                .sum();
            this.base[i] = base;
        }
        Ok(this)
    }

    /// Returns the base priority of the service at index `i`.
    #[inline]
    #[must_use]
    pub fn service_priority(&self, i: usize) -> i32 {
        self.base[i]
    }

    /// Returns the priority of characteristic `c` within service `s`: its
    /// index in the service rule, the list length if it is not named, or 0 if
    /// the service has no rule.
    #[must_use]
    pub fn characteristic_position(s: &Svc, c: &Char) -> usize {
        s.priority().map_or(0, |r| r.position(c.uuid()))
    }

    /// Returns the number of distinct priority levels produced by the rule of
    /// service `s`.
    #[must_use]
    pub fn additional_priorities(s: &Svc) -> i32 {
        let n = s.priority().map_or(0, |r| r.raised().len());
        let n = if n == s.client_cfg_count() { n } else { n + 1 };
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let n = n.max(1) as i32;
        n
    }

    /// Returns the final priority of characteristic `c` in the service at
    /// index `i`.
    #[inline]
    #[must_use]
    pub fn priority(&self, i: usize, c: &Char) -> i32 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let pos = Self::characteristic_position(&self.svcs[i], c) as i32;
        self.service_priority(i) + pos
    }

    /// Returns the first service with UUID `u`.
    fn named(&self, u: Uuid) -> &'a Svc {
        (self.svcs.iter())
            .find(|s| s.uuid() == u)
            .expect("server rule names an undeclared service")
    }
}
