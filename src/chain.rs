use crate::classify::{classify, ClassifiedAddress};
use crate::config::{HeaderStyle, ProxyOrder};
use crate::error::ParseError;

/// Ordered list of addresses read from one header value
///
/// The left-most address is the one recorded closest to the client, the right-most one was
/// recorded closest to the server. A chain is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressChain {
    addresses: Vec<ClassifiedAddress>,
}

impl AddressChain {
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn addresses(&self) -> &[ClassifiedAddress] {
        &self.addresses
    }

    pub fn first(&self) -> Option<&ClassifiedAddress> {
        self.addresses.first()
    }

    pub fn last(&self) -> Option<&ClassifiedAddress> {
        self.addresses.last()
    }

    /// The `count` addresses closest to the server, or `None` if the chain is shorter
    pub fn trailing(&self, count: usize) -> Option<&[ClassifiedAddress]> {
        self.len()
            .checked_sub(count)
            .map(|start| &self.addresses[start..])
    }

    /// Pick the address this chain contributes as a candidate
    pub fn select(&self, order: ProxyOrder) -> Option<&ClassifiedAddress> {
        match order {
            ProxyOrder::LeftMost => self.first(),
            ProxyOrder::RightMost => self.last(),
        }
    }
}

/// Parse a raw header value into an address chain
///
/// Every entry must be a valid address: a single malformed entry discards the whole value,
/// a partial chain is never returned.
pub fn parse(raw_value: &str, style: HeaderStyle) -> Result<AddressChain, ParseError> {
    let addresses = match style {
        // a single value header holding several entries is read as a chain
        HeaderStyle::Single | HeaderStyle::Chain => raw_value
            .split(',')
            .map(|token| token.trim())
            .filter(|token| !token.is_empty())
            .map(classify)
            .collect::<Result<Vec<_>, _>>()?,
        HeaderStyle::Forwarded => raw_value
            // "for=1.2.3.4, for=5.6.7.8; proto=https"
            .split(',')
            .map(|element| element.trim())
            .filter(|element| !element.is_empty())
            // ["for=1.2.3.4", "for=5.6.7.8; proto=https"]
            .map(forwarded_for)
            .collect::<Result<Vec<_>, _>>()?,
    };

    if addresses.is_empty() {
        return Err(ParseError::Empty);
    }

    Ok(AddressChain { addresses })
}

/// Extract the address of the `for` parameter of a RFC 7239 forwarded element
fn forwarded_for(element: &str) -> Result<ClassifiedAddress, ParseError> {
    element
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("for"))
        .ok_or_else(|| ParseError::MissingForwardedFor(element.to_string()))
        .and_then(|(_, value)| classify(value))
}
