//! Generic Attribute Profile ([Vol 3] Part G) server attribute table and
//! notification priorities.
//!
//! A [`Server`] is defined with the closure-based [`Builder`] returned by
//! [`Server::build`]. Freezing the builder assigns handles to all attributes,
//! validates priority rules, and resolves the order in which notifications
//! and indications of characteristics are sent.

pub use {
    builder::*, char::*, consts::*, list::*, notify::*, priority::*, server::*, service::*,
    value::*,
};

use crate::att::*;
use bluetab_const::{
    CharUuid, Characteristic, Declaration, Descriptor, Service, ServiceUuid, Uuid, Uuid16,
    UuidPacker, UuidType,
};

mod builder;
mod char;
mod consts;
mod list;
mod notify;
mod priority;
mod server;
mod service;
mod value;

#[cfg(test)]
mod tests;

/// Error type returned when a server definition is invalid.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("server priority rule names {0}, which is not a service UUID")]
    ServerRuleParam(Uuid),
    #[error("priority rule of service {service} names {uuid}, which is not a characteristic UUID")]
    ServiceRuleParam { service: Uuid, uuid: Uuid },
    #[error("server priority rule names undeclared service {0}")]
    UnknownService(Uuid),
    #[error("more than one priority rule for the {scope}")]
    DuplicateRule { scope: RuleScope },
}

/// Common GATT result type.
pub type Result<T> = std::result::Result<T, Error>;
