//! Control plane for a toy distributed storage cluster.
//!
//! Disks and users register with a central manager over a length-prefixed
//! binary protocol; users then ask the manager to group disks into a DSS
//! (distributed storage set). Each module owns one concern:
//!
//! - [`protocol`] holds the version, message type and status constants.
//! - [`codec`] encodes and bounds-checks payload fields.
//! - [`frame`] reads and writes whole frames on an async stream.
//! - [`message`] maps every message type to a typed request or response.
//! - [`registry`] tracks live users and disks behind one lock and hands
//!   out ids and disk allocations.
//! - [`dispatcher`] serves one connection, request by request.
//! - [`manager`] accepts connections and spawns a dispatcher for each.
//! - [`client`], [`console`] and [`cli`] make up the user and disk
//!   command-line collaborators.
//!
//! Integration tests drive a real [`manager::Manager`] over TCP.

pub mod cli;
pub mod client;
pub mod codec;
pub mod console;
pub mod dispatcher;
pub mod error;
pub mod frame;
pub mod manager;
pub mod message;
pub mod protocol;
pub mod registry;
