// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;
use nattrack_conntrack::{ConntrackError, ConntrackTable, FlowType, LocalAddrs};
use pretty_assertions::assert_eq;

const SAMPLE_TABLE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/ip_conntrack");

fn local() -> LocalAddrs {
    LocalAddrs::from_nets([
        IpNet::from_str("127.0.0.1/8").unwrap(),
        IpNet::from_str("203.0.113.9/24").unwrap(),
        IpNet::from_str("10.0.0.1/24").unwrap(),
    ])
    .unwrap()
}

fn addr(addr: &str) -> Option<IpAddr> {
    Some(IpAddr::from_str(addr).unwrap())
}

#[test]
fn snapshot_stops_at_blank_line() {
    let flows = ConntrackTable::new(SAMPLE_TABLE).snapshot().unwrap();
    let protocols: Vec<&str> = flows.iter().map(|flow| flow.protocol()).collect();
    assert_eq!(protocols, vec!["tcp", "udp", "tcp", "udp", "icmp"]);
}

#[test]
fn snapshot_reconstructs_tuples() {
    let flows = ConntrackTable::new(SAMPLE_TABLE).snapshot().unwrap();
    let icmp = &flows[4];
    assert_eq!(icmp.state(), "");
    assert_eq!(icmp.original().src, addr("10.0.0.8"));
    assert_eq!(icmp.reply().dst, addr("203.0.113.9"));
    assert_eq!((icmp.original().sport, icmp.original().dport), (0, 0));
    assert_eq!(icmp.reply().bytes, 84);

    let udp = &flows[1];
    assert_eq!(udp.state(), "ASSURED");
    assert_eq!(udp.reply().packets, 2);
    assert_eq!(udp.reply().bytes, 260);
}

#[test]
fn snapshots_are_independent() {
    let table = ConntrackTable::new(SAMPLE_TABLE);
    assert_eq!(table.snapshot().unwrap(), table.snapshot().unwrap());
}

#[test]
fn classification_of_sample_table() {
    let flows = ConntrackTable::new(SAMPLE_TABLE).snapshot().unwrap();
    let local = local();
    let types: Vec<FlowType> = flows
        .iter()
        .map(|flow| FlowType::classify(flow, &local))
        .collect();
    assert_eq!(
        types,
        vec![
            FlowType::SNAT,
            FlowType::DNAT,
            FlowType::LOCAL,
            FlowType::ROUTED,
            FlowType::SNAT,
        ]
    );

    let nat = flows.filter_by_type(FlowType::SNAT | FlowType::DNAT, &local);
    assert_eq!(nat.len(), 3);
    let tcp_nat = nat.filter_by_protocol("tcp");
    assert_eq!(tcp_nat.len(), 1);
    assert_eq!(tcp_nat[0].ttl(), 431_999);
    assert_eq!(flows.filter_by_state("UNREPLIED").len(), 1);
    assert_eq!(flows.filter_by_state("SYN_SENT").len(), 1);
}

#[test]
fn unreadable_table() {
    let result = ConntrackTable::new("/nonexistent/ip_conntrack").snapshot();
    let Err(ConntrackError::Read { path, .. }) = result else {
        panic!("reading a missing table must fail");
    };
    assert_eq!(path.to_str(), Some("/nonexistent/ip_conntrack"));
}
