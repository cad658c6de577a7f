// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tabular rendering of flows

use conntrack::{Flow, Flows, FlowType, LocalAddrs};
use std::fmt::Display;

macro_rules! FLOW_FMT {
    () => {
        "{:<6} {:<28} {:<28} {:<28} {:<12} {:<8} {}"
    };
}

fn fmt_heading(f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    writeln!(
        f,
        FLOW_FMT!(),
        "Proto", "Source", "Destination", "Reply source", "State", "TTL", "Type"
    )
}

fn fmt_flow(f: &mut std::fmt::Formatter<'_>, flow: &Flow, local: &LocalAddrs) -> std::fmt::Result {
    let (o, r) = (flow.original(), flow.reply());
    let state = if flow.state().is_empty() {
        "-"
    } else {
        flow.state()
    };
    writeln!(
        f,
        FLOW_FMT!(),
        flow.protocol(),
        // padding applies to strings, not to the endpoint's own formatter
        o.source().to_string(),
        o.destination().to_string(),
        r.source().to_string(),
        state,
        flow.ttl(),
        FlowType::classify(flow, local)
    )
}

/// Flows to be printed as a table, along with the categories each one falls into
pub struct FlowTable<'a> {
    pub flows: &'a Flows,
    pub local: &'a LocalAddrs,
    pub header: bool,
}

impl Display for FlowTable<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.header {
            fmt_heading(f)?;
        }
        for flow in self.flows {
            fmt_flow(f, flow, self.local)?;
        }
        Ok(())
    }
}
