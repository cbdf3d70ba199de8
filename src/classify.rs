use core::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::{Ipv4Net, Ipv6Net};

use crate::error::ParseError;

/// How useful an address is as evidence of the client's identity
///
/// Variants are ordered from best to worst, so the minimum of a set of candidates is the one
/// to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reachability {
    /// Globally routable address
    Routable,
    /// Private, link-local, shared (CGNAT), multicast or otherwise reserved address
    NonRoutable,
    /// Loopback address
    Loopback,
}

impl Reachability {
    pub fn is_routable(self) -> bool {
        self == Reachability::Routable
    }

    pub fn of(ip: &IpAddr) -> Self {
        match ip.to_canonical() {
            IpAddr::V4(ip) => {
                if ip.is_loopback() {
                    Reachability::Loopback
                } else if in_any_v4(&ip, ROUTABLE_V4_EXCEPTIONS) {
                    Reachability::Routable
                } else if in_any_v4(&ip, NON_ROUTABLE_V4) {
                    Reachability::NonRoutable
                } else {
                    Reachability::Routable
                }
            }
            IpAddr::V6(ip) => {
                if ip.is_loopback() {
                    Reachability::Loopback
                } else if !in_any_v6(&ip, &[GLOBAL_UNICAST_V6]) {
                    // unique local, link local, multicast and the IETF reserved space
                    Reachability::NonRoutable
                } else if in_any_v6(&ip, ROUTABLE_V6_EXCEPTIONS) {
                    Reachability::Routable
                } else if in_any_v6(&ip, NON_ROUTABLE_V6) {
                    Reachability::NonRoutable
                } else {
                    Reachability::Routable
                }
            }
        }
    }
}

/// A parsed address together with its reachability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassifiedAddress {
    ip: IpAddr,
    reachability: Reachability,
}

impl ClassifiedAddress {
    pub fn new(ip: IpAddr) -> Self {
        let ip = ip.to_canonical();

        Self {
            reachability: Reachability::of(&ip),
            ip,
        }
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn reachability(&self) -> Reachability {
        self.reachability
    }

    pub fn is_routable(&self) -> bool {
        self.reachability.is_routable()
    }
}

// IANA special purpose registries, minus loopback which gets its own rank.
const NON_ROUTABLE_V4: &[(Ipv4Addr, u8)] = &[
    // "this" network
    (Ipv4Addr::new(0, 0, 0, 0), 8),
    // private networks
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
    // shared address space (carrier grade NAT)
    (Ipv4Addr::new(100, 64, 0, 0), 10),
    // link local
    (Ipv4Addr::new(169, 254, 0, 0), 16),
    // IETF protocol assignments
    (Ipv4Addr::new(192, 0, 0, 0), 24),
    // documentation
    (Ipv4Addr::new(192, 0, 2, 0), 24),
    (Ipv4Addr::new(198, 51, 100, 0), 24),
    (Ipv4Addr::new(203, 0, 113, 0), 24),
    // 6to4 relay anycast
    (Ipv4Addr::new(192, 88, 99, 0), 24),
    // benchmarking
    (Ipv4Addr::new(198, 18, 0, 0), 15),
    // multicast
    (Ipv4Addr::new(224, 0, 0, 0), 4),
    // reserved, including limited broadcast
    (Ipv4Addr::new(240, 0, 0, 0), 4),
];

// Globally reachable entries nested in the non routable blocks above.
const ROUTABLE_V4_EXCEPTIONS: &[(Ipv4Addr, u8)] = &[
    // port control protocol anycast
    (Ipv4Addr::new(192, 0, 0, 9), 32),
    // traversal using relays around NAT anycast
    (Ipv4Addr::new(192, 0, 0, 10), 32),
];

// Everything outside of it is reserved, or scoped to a link, a site or a group.
const GLOBAL_UNICAST_V6: (Ipv6Addr, u8) = (Ipv6Addr::new(0x2000, 0, 0, 0, 0, 0, 0, 0), 3);

const NON_ROUTABLE_V6: &[(Ipv6Addr, u8)] = &[
    // IETF protocol assignments
    (Ipv6Addr::new(0x2001, 0, 0, 0, 0, 0, 0, 0), 23),
    // documentation
    (Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0), 32),
    (Ipv6Addr::new(0x3fff, 0, 0, 0, 0, 0, 0, 0), 20),
    // 6to4
    (Ipv6Addr::new(0x2002, 0, 0, 0, 0, 0, 0, 0), 16),
];

const ROUTABLE_V6_EXCEPTIONS: &[(Ipv6Addr, u8)] = &[
    // port control protocol anycast
    (Ipv6Addr::new(0x2001, 1, 0, 0, 0, 0, 0, 1), 128),
    // traversal using relays around NAT anycast
    (Ipv6Addr::new(0x2001, 1, 0, 0, 0, 0, 0, 2), 128),
    // automatic multicast tunneling
    (Ipv6Addr::new(0x2001, 3, 0, 0, 0, 0, 0, 0), 32),
    // AS112-v6
    (Ipv6Addr::new(0x2001, 4, 0x112, 0, 0, 0, 0, 0), 48),
    // ORCHIDv2
    (Ipv6Addr::new(0x2001, 0x20, 0, 0, 0, 0, 0, 0), 28),
    // drone remote ID protocol entity tags
    (Ipv6Addr::new(0x2001, 0x30, 0, 0, 0, 0, 0, 0), 28),
];

fn in_any_v4(ip: &Ipv4Addr, blocks: &[(Ipv4Addr, u8)]) -> bool {
    blocks.iter().any(|(network, prefix)| {
        Ipv4Net::new(*network, *prefix)
            .map(|net| net.contains(ip))
            .unwrap_or(false)
    })
}

fn in_any_v6(ip: &Ipv6Addr, blocks: &[(Ipv6Addr, u8)]) -> bool {
    blocks.iter().any(|(network, prefix)| {
        Ipv6Net::new(*network, *prefix)
            .map(|net| net.contains(ip))
            .unwrap_or(false)
    })
}

/// Trim whitespace then any quote marks.
fn unquote(val: &str) -> &str {
    val.trim().trim_start_matches('"').trim_end_matches('"')
}

/// Remove port and IPv6 square brackets from a peer specification.
///
/// Returns `None` when the value does not look like an address with an optional port, a bare
/// IPv6 literal is returned untouched as its colons are not port separators.
fn bare_address(val: &str) -> Option<&str> {
    if let Some(rest) = val.strip_prefix('[') {
        let (host, port) = rest.split_once(']')?;

        return match port {
            "" => Some(host),
            _ => port.strip_prefix(':').filter(|p| is_port(p)).map(|_| host),
        };
    }

    match val.split_once(':') {
        Some((host, port)) if !port.contains(':') => is_port(port).then_some(host),
        _ => Some(val),
    }
}

fn is_port(val: &str) -> bool {
    val.bytes().all(|b| b.is_ascii_digit()) && val.parse::<u16>().is_ok()
}

/// Parse a single address token
///
/// The token may be quoted and may carry a port (`1.2.3.4:80`, `[::1]:80`). IPv4 mapped IPv6
/// addresses are returned in their IPv4 form.
pub fn parse_address(token: &str) -> Result<IpAddr, ParseError> {
    let token = unquote(token);

    if token.is_empty() {
        return Err(ParseError::Empty);
    }

    token
        .parse::<IpAddr>()
        .ok()
        .or_else(|| bare_address(token).and_then(|addr| addr.parse::<IpAddr>().ok()))
        .map(|ip| ip.to_canonical())
        .ok_or_else(|| ParseError::InvalidAddress(token.to_string()))
}

/// Parse and classify a single address token
pub fn classify(token: &str) -> Result<ClassifiedAddress, ParseError> {
    parse_address(token).map(ClassifiedAddress::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reachability(token: &str) -> Reachability {
        classify(token).unwrap().reachability()
    }

    #[test]
    fn public_addresses() {
        assert_eq!(reachability("177.139.233.139"), Reachability::Routable);
        assert_eq!(reachability("8.8.8.8"), Reachability::Routable);
        assert_eq!(reachability("2001:4860:4860::8888"), Reachability::Routable);
    }

    #[test]
    fn shared_address_space() {
        assert_eq!(reachability("100.63.0.9"), Reachability::Routable);
        assert_eq!(reachability("100.64.0.0"), Reachability::NonRoutable);
        assert_eq!(reachability("100.76.0.9"), Reachability::NonRoutable);
        assert_eq!(reachability("100.127.255.255"), Reachability::NonRoutable);
        assert_eq!(reachability("100.128.0.9"), Reachability::Routable);
    }

    #[test]
    fn private_and_reserved() {
        for token in [
            "10.0.0.1",
            "172.16.0.1",
            "172.31.255.255",
            "192.168.1.1",
            "169.254.10.10",
            "0.0.0.0",
            "192.0.2.60",
            "198.51.100.17",
            "203.0.113.43",
            "198.19.0.1",
            "224.0.0.1",
            "255.255.255.255",
            "fe80::1",
            "fd00::1",
            "ff02::1",
            "2001:db8:cafe::17",
            "::",
            "::10.0.0.1",
            "::127.0.0.1",
            "100:1::1",
            "4000::1",
            "fec0::1",
            "2001:2::1",
            "2002:b18b:e98b::1",
            "192.0.0.8",
        ] {
            assert_eq!(reachability(token), Reachability::NonRoutable, "{token}");
        }

        assert_eq!(reachability("172.32.0.1"), Reachability::Routable);
    }

    #[test]
    fn globally_reachable_special_purpose() {
        for token in [
            "192.0.0.9",
            "192.0.0.10",
            "2001:1::1",
            "2001:1::2",
            "2001:3::1",
            "2001:4:112::1",
            "2001:20::1",
            "2001:30::1",
        ] {
            assert_eq!(reachability(token), Reachability::Routable, "{token}");
        }

        assert_eq!(reachability("2001:1::3"), Reachability::NonRoutable);
        assert_eq!(reachability("2001:4:113::1"), Reachability::NonRoutable);
    }

    #[test]
    fn loopback() {
        assert_eq!(reachability("127.0.0.1"), Reachability::Loopback);
        assert_eq!(reachability("127.255.0.3"), Reachability::Loopback);
        assert_eq!(reachability("::1"), Reachability::Loopback);
        assert_eq!(reachability("::ffff:127.0.0.1"), Reachability::Loopback);
    }

    #[test]
    fn ipv4_mapped_is_canonicalized() {
        let classified = classify("::ffff:10.0.0.1").unwrap();

        assert_eq!(classified.ip(), IpAddr::from([10, 0, 0, 1]));
        assert_eq!(classified.reachability(), Reachability::NonRoutable);
    }

    #[test]
    fn whitespace_quotes_and_ports() {
        assert_eq!(
            parse_address("  177.139.233.139 ").unwrap(),
            IpAddr::from([177, 139, 233, 139])
        );
        assert_eq!(
            parse_address(r#""192.0.2.60:8080""#).unwrap(),
            IpAddr::from([192, 0, 2, 60])
        );
        assert_eq!(
            parse_address("[2001:db8:cafe::17]:4711").unwrap(),
            "2001:db8:cafe::17".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            parse_address("[2001:db8:cafe::17]").unwrap(),
            "2001:db8:cafe::17".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            parse_address("1.2.3.4:65535").unwrap(),
            IpAddr::from([1, 2, 3, 4])
        );
        assert_eq!(
            parse_address("2001:db8::1").unwrap(),
            "2001:db8::1".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn invalid_tokens() {
        assert_eq!(parse_address("  "), Err(ParseError::Empty));

        for token in [
            "unknown",
            "_hidden",
            "1.2.3",
            "256.1.1.1",
            "1.2.3.4:",
            "1.2.3.4:http",
            "1.2.3.4:99999",
            "1.2.3.4:+80",
            "[2001:db8::1]:65536",
            "[::1]x",
            "[::1",
            "example.com",
            "fe80::1%eth0",
        ] {
            assert_eq!(
                parse_address(token),
                Err(ParseError::InvalidAddress(token.to_string())),
                "{token}"
            );
        }
    }
}
