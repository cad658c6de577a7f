// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Ordered collections of [`Flow`]s and the filters that apply to them.

use std::ops::Deref;

use crate::classify::FlowType;
use crate::flow::Flow;
use crate::local::LocalAddrs;

/// The flows of one table snapshot, in table order.
///
/// Filters never modify a [`Flows`]: each returns a new collection holding the selected flows in
/// their original relative order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flows(Vec<Flow>);

impl Flows {
    /// Keep the flows for which `pred` holds.
    #[must_use]
    pub fn filter<F>(&self, mut pred: F) -> Flows
    where
        F: FnMut(&Flow) -> bool,
    {
        self.0.iter().filter(|&flow| pred(flow)).cloned().collect()
    }

    /// Keep the flows falling into any of the categories of `types`.
    #[must_use]
    pub fn filter_by_type(&self, types: FlowType, local: &LocalAddrs) -> Flows {
        self.filter(|flow| types.matches(flow, local))
    }

    /// Keep the flows of the given transport protocol (exact match, e.g. `tcp`).
    #[must_use]
    pub fn filter_by_protocol(&self, protocol: &str) -> Flows {
        self.filter(|flow| flow.protocol() == protocol)
    }

    /// Keep the flows in the given effective state (exact match, e.g. `ESTABLISHED`).
    #[must_use]
    pub fn filter_by_state(&self, state: &str) -> Flows {
        self.filter(|flow| flow.state() == state)
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<Flow> {
        self.0
    }
}

impl Deref for Flows {
    type Target = [Flow];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Flow>> for Flows {
    fn from(flows: Vec<Flow>) -> Self {
        Flows(flows)
    }
}

impl FromIterator<Flow> for Flows {
    fn from_iter<I: IntoIterator<Item = Flow>>(iter: I) -> Self {
        Flows(iter.into_iter().collect())
    }
}

impl IntoIterator for Flows {
    type Item = Flow;
    type IntoIter = std::vec::IntoIter<Flow>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Flows {
    type Item = &'a Flow;
    type IntoIter = std::slice::Iter<'a, Flow>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_table;
    use ipnet::IpNet;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    const TABLE: &str = "\
tcp      6 999 ESTABLISHED src=10.0.0.5 dst=93.184.216.34 sport=4000 dport=80 src=93.184.216.34 dst=203.0.113.9 sport=80 dport=4000 [ASSURED] mark=0 use=1
udp      17 20 src=192.168.1.1 dst=192.168.1.50 sport=53 dport=5353 src=192.168.1.50 dst=192.168.1.1 sport=5353 dport=53 mark=0 use=1
tcp      6 100 SYN_SENT src=198.51.100.7 dst=203.0.113.9 sport=5555 dport=443 [UNREPLIED] src=10.0.0.20 dst=198.51.100.7 sport=443 dport=5555 mark=0 use=1
udp      17 28 src=10.9.0.1 dst=10.8.0.1 sport=123 dport=123 [UNREPLIED] src=10.8.0.1 dst=10.9.0.1 sport=123 dport=123 mark=0 use=1
tcp      6 50 ESTABLISHED src=10.0.0.6 dst=93.184.216.34 sport=4001 dport=80 src=93.184.216.34 dst=203.0.113.9 sport=80 dport=4001 [ASSURED] mark=0 use=1
";

    fn flows() -> Flows {
        parse_table(TABLE.as_bytes()).unwrap()
    }

    fn local() -> LocalAddrs {
        LocalAddrs::from_nets([
            IpNet::from_str("192.168.1.1/24").unwrap(),
            IpNet::from_str("203.0.113.9/24").unwrap(),
        ])
        .unwrap()
    }

    fn ttls(flows: &Flows) -> Vec<u64> {
        flows.iter().map(Flow::ttl).collect()
    }

    #[test]
    fn test_filter_preserves_order_and_input() {
        let flows = flows();
        let before = flows.clone();
        let filtered = flows.filter(|flow| flow.ttl() >= 50);
        assert_eq!(ttls(&filtered), vec![999, 100, 50]);
        assert_eq!(flows, before);
    }

    #[test]
    fn test_filter_by_type_single() {
        let flows = flows();
        let local = local();
        assert_eq!(ttls(&flows.filter_by_type(FlowType::SNAT, &local)), vec![999, 50]);
        assert_eq!(ttls(&flows.filter_by_type(FlowType::DNAT, &local)), vec![100]);
        assert_eq!(ttls(&flows.filter_by_type(FlowType::LOCAL, &local)), vec![20]);
        assert_eq!(ttls(&flows.filter_by_type(FlowType::ROUTED, &local)), vec![28]);
        assert!(flows.filter_by_type(FlowType::empty(), &local).is_empty());
    }

    #[test]
    fn test_filter_by_type_union() {
        let flows = flows();
        let local = local();
        let nat = flows.filter_by_type(FlowType::SNAT | FlowType::DNAT, &local);
        assert_eq!(ttls(&nat), vec![999, 100, 50]);
        let all = flows.filter_by_type(FlowType::all(), &local);
        assert_eq!(all, flows);
    }

    #[test]
    fn test_filter_by_protocol() {
        let flows = flows();
        assert_eq!(ttls(&flows.filter_by_protocol("udp")), vec![20, 28]);
        assert!(flows.filter_by_protocol("UDP").is_empty());
        assert!(flows.filter_by_protocol("icmp").is_empty());
    }

    #[test]
    fn test_filter_by_state() {
        let flows = flows();
        assert_eq!(ttls(&flows.filter_by_state("ESTABLISHED")), vec![999, 50]);
        // udp flows get their state from the flags
        assert_eq!(ttls(&flows.filter_by_state("UNREPLIED")), vec![28]);
        assert!(flows.filter_by_state("").contains(&flows[1]));
    }

    #[test]
    fn test_filters_compose() {
        let flows = flows();
        let picked = flows
            .filter_by_type(FlowType::SNAT | FlowType::DNAT, &local())
            .filter_by_protocol("tcp")
            .filter_by_state("SYN_SENT");
        assert_eq!(ttls(&picked), vec![100]);
        assert_eq!(picked.into_inner().len(), 1);
    }
}
