//! Bluetooth LE GATT server attribute table and notification priorities.
//!
//! Services, characteristics, and descriptors are declared with
//! [`gatt::Server::build`]. The frozen [`gatt::Server`] resolves any attribute
//! handle to an [`att::Attr`] record for the protocol engine and provides the
//! order in which notifications and indications should be sent.

#![warn(missing_debug_implementations)]
#![warn(non_ascii_idents)]
#![warn(single_use_lifetimes)]
#![warn(unused_extern_crates)]
#![warn(unused_import_braces)]
#![warn(unused_lifetimes)]
#![warn(unused_qualifications)]
#![warn(clippy::nursery)]
#![warn(clippy::pedantic)]
#![allow(clippy::enum_glob_use)]
#![allow(clippy::inline_always)]
#![allow(clippy::module_name_repetitions)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::mod_module_files)]
#![warn(clippy::print_stdout)]
#![warn(clippy::todo)]
#![warn(clippy::undocumented_unsafe_blocks)]

pub use bluetab_const as uuid;

pub mod att;
pub mod gatt;
mod util;
