use core::fmt;
use core::net::IpAddr;
use core::str::FromStr;

use ipnet::{AddrParseError, IpNet};

use crate::error::ProxyOrderParseError;

/// How the value of a header is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderStyle {
    /// A single address set by the closest reverse proxy or the transport, like `X-Real-IP`
    Single,
    /// A comma separated forwarding chain, like `X-Forwarded-For`
    Chain,
    /// A RFC 7239 `Forwarded` header, the chain is read from the `for` parameters
    Forwarded,
}

impl HeaderStyle {
    /// Whether the header records forwarding history, proxy constraints only apply to those
    pub fn is_forwarding(self) -> bool {
        matches!(self, HeaderStyle::Chain | HeaderStyle::Forwarded)
    }
}

/// A header to look at, with the layout of its value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeaderSource {
    name: String,
    style: HeaderStyle,
}

impl HeaderSource {
    pub fn new(name: impl Into<String>, style: HeaderStyle) -> Self {
        Self {
            name: name.into(),
            style,
        }
    }

    pub fn single(name: impl Into<String>) -> Self {
        Self::new(name, HeaderStyle::Single)
    }

    pub fn chain(name: impl Into<String>) -> Self {
        Self::new(name, HeaderStyle::Chain)
    }

    pub fn forwarded(name: impl Into<String>) -> Self {
        Self::new(name, HeaderStyle::Forwarded)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn style(&self) -> HeaderStyle {
        self.style
    }
}

/// Which end of a forwarding chain holds the client address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProxyOrder {
    /// `<client>, <proxy1>, <proxy2>`, what most proxies produce
    #[default]
    LeftMost,
    /// `<proxy2>, <proxy1>, <client>`
    RightMost,
}

impl FromStr for ProxyOrder {
    type Err = ProxyOrderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left-most" | "leftmost" => Ok(ProxyOrder::LeftMost),
            "right-most" | "rightmost" => Ok(ProxyOrder::RightMost),
            _ => Err(ProxyOrderParseError(s.to_string())),
        }
    }
}

impl fmt::Display for ProxyOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyOrder::LeftMost => f.write_str("left-most"),
            ProxyOrder::RightMost => f.write_str("right-most"),
        }
    }
}

/// Headers looked at by default, from the most proxy specific to the transport peer address
///
/// Names follow the CGI / Django `META` convention, see
/// [`HttpMetadata`](crate::HttpMetadata) for how they map onto http headers.
pub const DEFAULT_HEADERS: &[(&str, HeaderStyle)] = &[
    // <client>, <proxy1>, <proxy2>
    ("HTTP_X_FORWARDED_FOR", HeaderStyle::Chain),
    ("X_FORWARDED_FOR", HeaderStyle::Chain),
    // Amazon EC2, Heroku and others
    ("HTTP_CLIENT_IP", HeaderStyle::Single),
    ("HTTP_X_REAL_IP", HeaderStyle::Single),
    // Squid and others
    ("HTTP_X_FORWARDED", HeaderStyle::Chain),
    // Rackspace LB and Riverbed Stingray
    ("HTTP_X_CLUSTER_CLIENT_IP", HeaderStyle::Single),
    ("HTTP_FORWARDED_FOR", HeaderStyle::Chain),
    ("HTTP_FORWARDED", HeaderStyle::Forwarded),
    ("HTTP_VIA", HeaderStyle::Single),
    // peer address of the connection
    ("REMOTE_ADDR", HeaderStyle::Single),
];

fn parse_trusted_proxy(proxy: &str) -> Result<IpNet, AddrParseError> {
    let proxy = proxy.trim();

    match proxy.parse() {
        Ok(v) => Ok(v),
        Err(e) => match proxy.parse::<IpAddr>() {
            Ok(v) => Ok(IpNet::from(v.to_canonical())),
            _ => Err(e),
        },
    }
}

/// Check if an address belongs to any of the trusted proxy networks
pub(crate) fn is_trusted(trusted_proxies: &[IpNet], addr: &IpAddr) -> bool {
    trusted_proxies.iter().any(|proxy| proxy.contains(addr))
}

fn push_unique(trusted_proxies: &mut Vec<IpNet>, proxy: IpNet) {
    if !trusted_proxies.contains(&proxy) {
        trusted_proxies.push(proxy);
    }
}

/// Resolved configuration of the resolver
///
/// By default it looks at [`DEFAULT_HEADERS`] in order, takes the left-most address of
/// forwarding chains and does not constrain the proxies a request went through.
///
/// # Example
/// ```
/// use client_ip_resolver::{Config, ProxyOrder};
///
/// let mut config = Config::default();
/// config.set_proxy_order(ProxyOrder::RightMost);
/// config.set_proxy_count(1);
/// config.add_trusted_proxy("198.84.193.158").unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    headers: Vec<HeaderSource>,
    proxy_order: ProxyOrder,
    proxy_count: Option<usize>,
    trusted_proxies: Option<Vec<IpNet>>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new_standard()
    }
}

impl Config {
    /// Create a new config with no headers and no constraints
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
            proxy_order: ProxyOrder::LeftMost,
            proxy_count: None,
            trusted_proxies: None,
        }
    }

    /// Create a new config looking at the [`DEFAULT_HEADERS`] with no constraints
    pub fn new_standard() -> Self {
        Self {
            headers: DEFAULT_HEADERS
                .iter()
                .map(|(name, style)| HeaderSource::new(*name, *style))
                .collect(),
            ..Self::new()
        }
    }

    /// Append a header at the lowest precedence
    pub fn add_header(&mut self, name: impl Into<String>, style: HeaderStyle) {
        self.headers.push(HeaderSource::new(name, style));
    }

    /// Replace the header precedence list
    pub fn set_headers(&mut self, headers: Vec<HeaderSource>) {
        self.headers = headers;
    }

    pub fn set_proxy_order(&mut self, order: ProxyOrder) {
        self.proxy_order = order;
    }

    /// Require forwarding chains to hold exactly `count` proxies after the client address
    pub fn set_proxy_count(&mut self, count: usize) {
        self.proxy_count = Some(count);
    }

    /// Add a trusted proxy
    ///
    /// proxy can be an IP address or a CIDR. Once at least one is added, the last entries of a
    /// forwarding chain, as many as there are trusted proxies, must all be trusted proxies.
    pub fn add_trusted_proxy(&mut self, proxy: &str) -> Result<(), AddrParseError> {
        let proxy = parse_trusted_proxy(proxy)?;
        push_unique(self.trusted_proxies.get_or_insert_with(Vec::new), proxy);

        Ok(())
    }

    pub fn headers(&self) -> &[HeaderSource] {
        &self.headers
    }

    pub fn proxy_order(&self) -> ProxyOrder {
        self.proxy_order
    }

    pub fn proxy_count(&self) -> Option<usize> {
        self.proxy_count
    }

    pub fn trusted_proxies(&self) -> Option<&[IpNet]> {
        self.trusted_proxies.as_deref()
    }

    /// Check if an address belongs to the trusted proxies
    pub fn is_proxy_trusted(&self, addr: &IpAddr) -> bool {
        self.trusted_proxies
            .as_deref()
            .is_some_and(|trusted| is_trusted(trusted, addr))
    }

    /// Build the config for one call, every field set in `overrides` wins
    pub fn merge(&self, overrides: &ConfigOverride) -> Config {
        Config {
            headers: overrides
                .headers
                .clone()
                .unwrap_or_else(|| self.headers.clone()),
            proxy_order: overrides.proxy_order.unwrap_or(self.proxy_order),
            proxy_count: overrides.proxy_count.or(self.proxy_count),
            trusted_proxies: overrides
                .trusted_proxies
                .clone()
                .or_else(|| self.trusted_proxies.clone()),
        }
    }
}

/// Explicit per call settings, layered over a [`Config`] with [`Config::merge`]
///
/// Fields left unset fall back to the base config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverride {
    headers: Option<Vec<HeaderSource>>,
    proxy_order: Option<ProxyOrder>,
    proxy_count: Option<usize>,
    trusted_proxies: Option<Vec<IpNet>>,
}

impl ConfigOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(mut self, headers: Vec<HeaderSource>) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn proxy_order(mut self, order: ProxyOrder) -> Self {
        self.proxy_order = Some(order);
        self
    }

    pub fn proxy_count(mut self, count: usize) -> Self {
        self.proxy_count = Some(count);
        self
    }

    /// Replace the trusted proxies of the base config, an empty list is still an override
    pub fn trusted_proxies<'a>(
        mut self,
        proxies: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, AddrParseError> {
        let mut trusted = Vec::new();

        for proxy in proxies {
            push_unique(&mut trusted, parse_trusted_proxy(proxy)?);
        }

        self.trusted_proxies = Some(trusted);

        Ok(self)
    }
}
