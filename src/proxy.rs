use ipnet::IpNet;

use crate::chain::AddressChain;
use crate::config::is_trusted;
use crate::error::ConstraintError;

/// Check a forwarding chain against the deployer's proxy constraints
///
/// `proxy_count` requires the chain to hold the client address plus exactly that many proxies.
/// `trusted_proxies` requires the entries closest to the server, as many as there are trusted
/// proxies, to all be trusted. Unset constraints always pass.
pub fn validate(
    chain: &AddressChain,
    proxy_count: Option<usize>,
    trusted_proxies: Option<&[IpNet]>,
) -> Result<(), ConstraintError> {
    if let Some(count) = proxy_count {
        let expected = count.saturating_add(1);

        if chain.len() != expected {
            return Err(ConstraintError::ProxyCountMismatch {
                expected,
                actual: chain.len(),
            });
        }
    }

    if let Some(trusted) = trusted_proxies {
        let required = trusted.len();

        let all_trusted = chain
            .trailing(required)
            .is_some_and(|hops| hops.iter().all(|hop| is_trusted(trusted, &hop.ip())));

        if !all_trusted {
            let matched = chain
                .addresses()
                .iter()
                .rev()
                .take(required)
                .filter(|hop| is_trusted(trusted, &hop.ip()))
                .count();

            return Err(ConstraintError::UntrustedProxy { required, matched });
        }
    }

    Ok(())
}
