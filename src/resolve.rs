use core::fmt;
use core::net::IpAddr;

use crate::chain;
use crate::classify::ClassifiedAddress;
use crate::config::{Config, ConfigOverride, HeaderSource};
use crate::error::{HeaderError, ParseError};
use crate::metadata::RequestMetadata;
use crate::proxy;

/// Client address picked for a request
///
/// `ip` is `None` when no header could be trusted, in which case the address is never
/// considered routable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Resolution {
    ip: Option<IpAddr>,
    routable: bool,
}

impl Resolution {
    /// No trustworthy address available
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    pub fn address(&self) -> Option<String> {
        self.ip.map(|ip| ip.to_string())
    }

    pub fn is_routable(&self) -> bool {
        self.routable
    }

    pub fn is_unknown(&self) -> bool {
        self.ip.is_none()
    }

    pub fn into_parts(self) -> (Option<IpAddr>, bool) {
        (self.ip, self.routable)
    }
}

impl From<ClassifiedAddress> for Resolution {
    fn from(address: ClassifiedAddress) -> Self {
        Self {
            ip: Some(address.ip()),
            routable: address.is_routable(),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip {
            Some(ip) if self.routable => write!(f, "{ip} (routable)"),
            Some(ip) => write!(f, "{ip} (non routable)"),
            None => f.write_str("unknown"),
        }
    }
}

struct Candidate<'c> {
    address: ClassifiedAddress,
    header: &'c str,
    position: usize,
}

/// Read, validate and pick the address one header contributes
fn evaluate(
    raw_value: &str,
    source: &HeaderSource,
    config: &Config,
) -> Result<ClassifiedAddress, HeaderError> {
    let chain = chain::parse(raw_value, source.style())?;

    if source.style().is_forwarding() {
        proxy::validate(&chain, config.proxy_count(), config.trusted_proxies())?;
    }

    Ok(*chain
        .select(config.proxy_order())
        .ok_or(ParseError::Empty)?)
}

/// Resolve the client address of a request
///
/// Headers are evaluated in the configured order:
///  * missing or blank headers are skipped
///  * a header holding any malformed address is skipped
///  * a forwarding chain violating the proxy count or trusted proxies aborts the whole
///    resolution, no other header is tried
///
/// Among the remaining candidates, routable addresses win over non routable ones, which win
/// over loopback addresses. On a tie, the header with the highest precedence wins.
pub fn resolve<M: RequestMetadata + ?Sized>(metadata: &M, config: &Config) -> Resolution {
    let mut candidates = Vec::new();

    for (position, source) in config.headers().iter().enumerate() {
        let raw_value = match metadata.header(source.name()) {
            Some(value) if !value.trim().is_empty() => value,
            _ => continue,
        };

        match evaluate(&raw_value, source, config) {
            Ok(address) => candidates.push(Candidate {
                address,
                header: source.name(),
                position,
            }),
            Err(HeaderError::Parse(error)) => {
                tracing::debug!(header = source.name(), %error, "skipping malformed header");
            }
            Err(HeaderError::Constraint(error)) => {
                tracing::debug!(
                    header = source.name(),
                    %error,
                    "proxy constraint violated, client address unknown"
                );

                return Resolution::unknown();
            }
        }
    }

    // min_by_key keeps the first of equal elements, candidates are in precedence order
    let Some(winner) = candidates
        .into_iter()
        .min_by_key(|candidate| candidate.address.reachability())
    else {
        return Resolution::unknown();
    };

    tracing::trace!(
        header = winner.header,
        position = winner.position,
        ip = %winner.address.ip(),
        routable = winner.address.is_routable(),
        "resolved client address"
    );

    Resolution::from(winner.address)
}

/// Resolver holding process wide defaults
///
/// It is cheap to share between threads, each call works on its own merged config.
///
/// # Example
/// ```
/// use client_ip_resolver::{ConfigOverride, ProxyOrder, Resolver};
/// use std::collections::HashMap;
///
/// let resolver = Resolver::default();
/// let metadata = HashMap::from([(
///     "HTTP_X_FORWARDED_FOR",
///     "177.139.233.139, 198.84.193.157, 198.84.193.158",
/// )]);
///
/// let resolution = resolver.resolve(&metadata);
/// assert_eq!(resolution.address().as_deref(), Some("177.139.233.139"));
/// assert!(resolution.is_routable());
///
/// let overrides = ConfigOverride::new().proxy_order(ProxyOrder::RightMost);
/// let resolution = resolver.resolve_with(&metadata, &overrides);
/// assert_eq!(resolution.address().as_deref(), Some("198.84.193.158"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: Config,
}

impl Resolver {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolve<M: RequestMetadata + ?Sized>(&self, metadata: &M) -> Resolution {
        resolve(metadata, &self.config)
    }

    /// Resolve with per call settings layered over the defaults
    pub fn resolve_with<M: RequestMetadata + ?Sized>(
        &self,
        metadata: &M,
        overrides: &ConfigOverride,
    ) -> Resolution {
        resolve(metadata, &self.config.merge(overrides))
    }
}
