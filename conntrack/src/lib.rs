// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]

//! Inspection of the kernel connection tracking table, and classification of the tracked flows by
//! the NAT transformation applied to them.
//!
//! # Example
//!
//! ```no_run
//! use nattrack_conntrack::{FlowType, LocalAddrs, snapshot};
//!
//! let local = LocalAddrs::discover().expect("no local address");
//! let flows = snapshot().expect("failed to read the table");
//! for flow in &flows.filter_by_type(FlowType::SNAT | FlowType::DNAT, &local) {
//!     println!("{flow}");
//! }
//! ```
//!
//! # Limitations
//!
//! - Only the legacy table layout (`/proc/net/ip_conntrack`) is supported.
//! - Every snapshot is independent: flows are not correlated across snapshots.
//! - The local addresses are learnt once, when [`LocalAddrs`] is built.

mod classify;
mod filter;
mod flow;
mod local;
mod parse;
mod table;

pub use classify::{FlowType, FlowTypeParseError};
pub use filter::Flows;
pub use flow::{Direction, Endpoint, Flow, Subflow};
pub use local::{LocalAddrs, LocalAddrsError};
pub use parse::{parse_line, parse_table};
pub use table::{ConntrackError, ConntrackTable, LEGACY_TABLE_PATH, snapshot};
