// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tracked connections, as reconstructed from the connection tracking table.

use std::fmt::Display;
use std::net::IpAddr;

/// One of the two directions of a tracked connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// The direction the connection was first observed in.
    Original,
    /// The return direction, possibly rewritten by NAT.
    Reply,
}

/// One direction of a connection: addresses, ports and counters.
///
/// A [`None`] address means the table did not provide a parsable address for that field.
/// Addresses are kept in canonical form, so an IPv4-mapped IPv6 address is stored (and compared)
/// as the IPv4 address it maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Subflow {
    pub src: Option<IpAddr>,
    pub dst: Option<IpAddr>,
    pub sport: u16,
    pub dport: u16,
    pub bytes: u64,
    pub packets: u64,
}

impl Subflow {
    #[must_use]
    pub fn source(&self) -> Endpoint {
        Endpoint(self.src, self.sport)
    }

    #[must_use]
    pub fn destination(&self) -> Endpoint {
        Endpoint(self.dst, self.dport)
    }
}

/// A tracked connection.
///
/// A [`Flow`] always carries both its [`Direction::Original`] and [`Direction::Reply`]
/// [`Subflow`]s, zero-valued when the table line did not provide them. Flows are built by the
/// parser and are immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flow {
    original: Subflow,
    reply: Subflow,
    protocol: String,
    state: String,
    ttl: u64,
    unreplied: bool,
    assured: bool,
}

impl Flow {
    /// Assemble a flow. An empty `state` is replaced by the effective state derived from the
    /// flags: `UNREPLIED` wins over `ASSURED`; with neither flag set the state stays empty.
    pub(crate) fn new(
        protocol: String,
        state: String,
        ttl: u64,
        (unreplied, assured): (bool, bool),
        original: Subflow,
        reply: Subflow,
    ) -> Self {
        let state = if state.is_empty() && unreplied {
            "UNREPLIED".to_string()
        } else if state.is_empty() && assured {
            "ASSURED".to_string()
        } else {
            state
        };
        Self {
            original,
            reply,
            protocol,
            state,
            ttl,
            unreplied,
            assured,
        }
    }

    #[must_use]
    pub fn original(&self) -> &Subflow {
        &self.original
    }

    #[must_use]
    pub fn reply(&self) -> &Subflow {
        &self.reply
    }

    /// Get the [`Subflow`] for the given [`Direction`]
    #[must_use]
    pub fn subflow(&self, direction: Direction) -> &Subflow {
        match direction {
            Direction::Original => &self.original,
            Direction::Reply => &self.reply,
        }
    }

    /// Transport protocol name, as written in the table (e.g. `tcp`, `udp`).
    #[must_use]
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Effective connection state.
    ///
    /// This is the transport state reported by the kernel (tcp only), or, for protocols without
    /// an explicit state, `UNREPLIED` / `ASSURED` according to the flags. It may be empty.
    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Remaining lifetime of the entry, in the table's units (seconds).
    #[must_use]
    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    /// No reply traffic has been seen for this connection yet.
    #[must_use]
    pub fn is_unreplied(&self) -> bool {
        self.unreplied
    }

    /// The kernel considers this connection established.
    #[must_use]
    pub fn is_assured(&self) -> bool {
        self.assured
    }

    /// The four addresses of the flow: original source and destination, then reply source and
    /// destination.
    pub(crate) fn addresses(&self) -> [Option<IpAddr>; 4] {
        [
            self.original.src,
            self.original.dst,
            self.reply.src,
            self.reply.dst,
        ]
    }
}

/// An address and port, printed as `addr:port`, `[addr]:port` for IPv6, or `*:port` when the
/// address is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint(pub Option<IpAddr>, pub u16);

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(IpAddr::V4(addr)) => write!(f, "{addr}:{}", self.1),
            Some(IpAddr::V6(addr)) => write!(f, "[{addr}]:{}", self.1),
            None => write!(f, "*:{}", self.1),
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Original => write!(f, "original"),
            Direction::Reply => write!(f, "reply"),
        }
    }
}

impl Display for Subflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {} ({} pkts, {} bytes)",
            self.source(),
            self.destination(),
            self.packets,
            self.bytes
        )
    }
}

impl Display for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.state.is_empty() {
            "-"
        } else {
            &self.state
        };
        write!(
            f,
            "{} {} ttl={} {} | {}",
            self.protocol, state, self.ttl, self.original, self.reply
        )
    }
}
