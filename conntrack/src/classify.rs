// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Classification of flows by the NAT transformation the kernel applied to them.
//!
//! All predicates compare the addresses of the original tuple (O) with the addresses of the reply
//! tuple (R). They are evaluated independently: a flow may satisfy none, one, or several of them.

use std::fmt::Display;
use std::str::FromStr;

use bitflags::bitflags;

use crate::flow::Flow;
use crate::local::LocalAddrs;

impl Flow {
    /// O and R mirror each other: no address was rewritten.
    fn is_symmetric(&self) -> bool {
        let (o, r) = (self.original(), self.reply());
        o.src == r.dst && o.dst == r.src
    }

    /// Source NAT: the reply comes back from where the original went, but not to where it came
    /// from, since the far end never saw the original source.
    #[must_use]
    pub fn is_snat(&self) -> bool {
        let (o, r) = (self.original(), self.reply());
        o.dst == r.src && o.src != r.dst
    }

    /// Destination NAT: the reply goes back to the original source but does not come from the
    /// original destination.
    ///
    /// Flows where only the destinations match (`O.dst == R.dst`, all other pairs differing) are
    /// also reported, as netstat-nat does for DNAT on a single interface.
    #[must_use]
    pub fn is_dnat(&self) -> bool {
        let (o, r) = (self.original(), self.reply());
        if o.src == r.dst && o.dst != r.src {
            return true;
        }
        o.src != r.src && o.src != r.dst && o.dst != r.src && o.dst == r.dst
    }

    /// No NAT, and at least one of the four addresses belongs to this host.
    #[must_use]
    pub fn is_local(&self, local: &LocalAddrs) -> bool {
        self.is_symmetric() && self.addresses().into_iter().any(|a| local.contains(a))
    }

    /// No NAT, and none of the four addresses belongs to this host.
    #[must_use]
    pub fn is_routed(&self, local: &LocalAddrs) -> bool {
        self.is_symmetric() && !self.addresses().into_iter().any(|a| local.contains(a))
    }
}

bitflags! {
    /// A set of flow categories.
    ///
    /// Used both to report which categories a flow falls into ([`FlowType::classify`]) and to
    /// select flows falling into any of several categories ([`FlowType::matches`]).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FlowType: u8 {
        const SNAT = 1 << 0;
        const DNAT = 1 << 1;
        const ROUTED = 1 << 2;
        const LOCAL = 1 << 3;
    }
}

impl FlowType {
    /// All the categories `flow` falls into.
    #[must_use]
    pub fn classify(flow: &Flow, local: &LocalAddrs) -> FlowType {
        let mut types = FlowType::empty();
        types.set(FlowType::SNAT, flow.is_snat());
        types.set(FlowType::DNAT, flow.is_dnat());
        types.set(FlowType::ROUTED, flow.is_routed(local));
        types.set(FlowType::LOCAL, flow.is_local(local));
        types
    }

    /// Tell if `flow` falls into any of the categories in this set.
    ///
    /// Only the predicates of the requested categories are evaluated.
    #[must_use]
    pub fn matches(self, flow: &Flow, local: &LocalAddrs) -> bool {
        (self.contains(FlowType::SNAT) && flow.is_snat())
            || (self.contains(FlowType::DNAT) && flow.is_dnat())
            || (self.contains(FlowType::LOCAL) && flow.is_local(local))
            || (self.contains(FlowType::ROUTED) && flow.is_routed(local))
    }
}

/// Errors which might occur when parsing a [`FlowType`] from a string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown flow type '{0}': expected snat, dnat, routed or local")]
pub struct FlowTypeParseError(String);

impl FromStr for FlowType {
    type Err = FlowTypeParseError;

    /// Parse `|`-separated category names, e.g. `snat|dnat`. Names are case insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split('|')
            .map(str::trim)
            .try_fold(FlowType::empty(), |types, name| {
                let flag = match name.to_ascii_lowercase().as_str() {
                    "snat" => FlowType::SNAT,
                    "dnat" => FlowType::DNAT,
                    "routed" => FlowType::ROUTED,
                    "local" => FlowType::LOCAL,
                    _ => return Err(FlowTypeParseError(name.to_string())),
                };
                Ok(types | flag)
            })
    }
}

impl Display for FlowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self
            .iter()
            .map(|flag| {
                if flag == FlowType::SNAT {
                    "snat"
                } else if flag == FlowType::DNAT {
                    "dnat"
                } else if flag == FlowType::ROUTED {
                    "routed"
                } else {
                    "local"
                }
            })
            .collect();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}
