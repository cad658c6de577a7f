// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Registry of the addresses owned by this host.

use std::net::IpAddr;

use ipnet::IpNet;
use netdev::get_interfaces;
use tracing::{debug, info, warn};

/// Errors which might occur when building a [`LocalAddrs`] registry
#[derive(Debug, thiserror::Error)]
pub enum LocalAddrsError {
    /// No address could be found.
    ///
    /// An empty registry would silently classify all local traffic as routed, so it is refused.
    #[error("no local interface address found")]
    NoAddresses,
    /// An interface reported an address with a prefix length larger than the address itself.
    #[error("invalid prefix length {prefix_len} for local address {addr}")]
    InvalidPrefix { addr: IpAddr, prefix_len: u8 },
}

/// The set of addresses configured on the interfaces of this host.
///
/// The registry is built once and never refreshed: interface changes after construction are not
/// seen. Membership is decided by address equality only; the prefix length of each address is
/// kept for reference but subnets are never considered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAddrs {
    nets: Vec<IpNet>,
}

impl LocalAddrs {
    /// Enumerate the IPv4 and IPv6 addresses of all the interfaces of the host.
    ///
    /// # Errors
    ///
    /// - [`LocalAddrsError::NoAddresses`] if no interface has an address
    /// - [`LocalAddrsError::InvalidPrefix`] if an interface reports an impossible prefix length
    pub fn discover() -> Result<Self, LocalAddrsError> {
        let interfaces = get_interfaces();
        let mut nets = Vec::new();
        for interface in &interfaces {
            let v4 = interface
                .ipv4
                .iter()
                .map(|net| (IpAddr::V4(net.addr()), net.prefix_len()));
            let v6 = interface
                .ipv6
                .iter()
                .map(|net| (IpAddr::V6(net.addr()), net.prefix_len()));
            for (addr, prefix_len) in v4.chain(v6) {
                let Ok(net) = IpNet::new(addr, prefix_len) else {
                    warn!("interface {} reports {addr}/{prefix_len}", interface.name);
                    return Err(LocalAddrsError::InvalidPrefix { addr, prefix_len });
                };
                debug!("local address {net} on {}", interface.name);
                nets.push(net);
            }
        }
        if nets.is_empty() {
            warn!(
                "none of the {} interfaces found has an address",
                interfaces.len()
            );
        }
        let local = Self::from_nets(nets)?;
        info!("discovered {} local addresses", local.len());
        Ok(local)
    }

    /// Build a registry from explicitly provided networks.
    ///
    /// # Errors
    ///
    /// [`LocalAddrsError::NoAddresses`] if `nets` is empty.
    pub fn from_nets(nets: impl IntoIterator<Item = IpNet>) -> Result<Self, LocalAddrsError> {
        let nets: Vec<IpNet> = nets.into_iter().collect();
        if nets.is_empty() {
            return Err(LocalAddrsError::NoAddresses);
        }
        Ok(Self { nets })
    }

    /// Tell if `addr` is exactly one of the local addresses. [`None`] is never local.
    #[must_use]
    pub fn contains(&self, addr: Option<IpAddr>) -> bool {
        let Some(addr) = addr.map(|addr| addr.to_canonical()) else {
            return false;
        };
        self.nets
            .iter()
            .any(|net| net.addr().to_canonical() == addr)
    }

    /// The local addresses, with their prefix lengths, in discovery order.
    #[must_use]
    pub fn nets(&self) -> &[IpNet] {
        &self.nets
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nets.len()
    }

    /// Always false: a registry holds at least one address.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn net(net: &str) -> IpNet {
        IpNet::from_str(net).unwrap()
    }

    fn addr(addr: &str) -> Option<IpAddr> {
        Some(IpAddr::from_str(addr).unwrap())
    }

    #[test]
    fn test_empty_registry_is_refused() {
        assert!(matches!(
            LocalAddrs::from_nets(Vec::<IpNet>::new()),
            Err(LocalAddrsError::NoAddresses)
        ));
    }

    #[test]
    fn test_membership_is_exact() {
        let local = LocalAddrs::from_nets([net("192.168.1.10/24"), net("2001:db8::1/64")]).unwrap();
        assert_eq!(local.len(), 2);
        assert!(local.contains(addr("192.168.1.10")));
        assert!(local.contains(addr("2001:db8::1")));
        // same subnet is not enough
        assert!(!local.contains(addr("192.168.1.11")));
        assert!(!local.contains(addr("2001:db8::2")));
        assert!(!local.contains(None));
    }

    #[test]
    fn test_membership_canonicalizes_mapped_addresses() {
        let local = LocalAddrs::from_nets([net("10.1.1.1/32")]).unwrap();
        assert!(local.contains(addr("::ffff:10.1.1.1")));
    }

    #[test]
    fn test_nets_keep_prefix() {
        let local = LocalAddrs::from_nets([net("10.1.1.1/8")]).unwrap();
        assert_eq!(local.nets()[0].prefix_len(), 8);
        assert!(!local.is_empty());
    }

    #[test]
    fn test_discover() {
        // sandboxes may hide every interface, but never report a bogus prefix
        match LocalAddrs::discover() {
            Ok(local) => assert!(!local.is_empty()),
            Err(e) => assert!(matches!(e, LocalAddrsError::NoAddresses)),
        }
    }
}
