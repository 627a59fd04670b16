//! Per-request authorization.
//!
//! There are no accounts. A caller is an admin when its network address is
//! private, loopback or link-local. The check is computed once per request
//! and passed down as an [`Access`] value.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// May see hidden files and change visibility.
    Admin,
    Visitor,
}

impl Access {
    pub fn from_ip(ip: IpAddr) -> Self {
        if is_private(ip) {
            Access::Admin
        } else {
            Access::Visitor
        }
    }

    pub fn is_admin(self) -> bool {
        self == Access::Admin
    }
}

/// Private-range test.
///
/// | Family | Ranges |
/// |---|---|
/// | IPv4 | `10/8`, `172.16/12`, `192.168/16`, `127/8`, `169.254/16` |
/// | IPv6 | `::1`, `::`, `fc00::/7`, `fe80::/10` |
///
/// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are tested as IPv4, since
/// dual-stack listeners report IPv4 peers that way.
pub fn is_private(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_private_v4(v4),
            None => is_private_v6(v6),
        },
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    ip.is_private() || ip.is_loopback() || ip.is_link_local()
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
}
