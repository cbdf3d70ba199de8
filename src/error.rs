use thiserror::Error;

/// A header value that could not be read as a list of addresses.
///
/// Recovered by the resolver: the header is discarded and the next one in precedence order
/// is tried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("header value contains no address")]
    Empty,

    #[error("invalid address `{0}`")]
    InvalidAddress(String),

    #[error("forwarded element `{0}` has no `for` parameter")]
    MissingForwardedFor(String),
}

/// A forwarding chain that violates a deployer supplied proxy constraint.
///
/// Never recovered: the whole resolution fails when this is raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("expected {expected} addresses in forwarding chain, found {actual}")]
    ProxyCountMismatch { expected: usize, actual: usize },

    #[error("only {matched} of the last {required} forwarding hops are trusted proxies")]
    UntrustedProxy { required: usize, matched: usize },
}

/// Outcome of evaluating a single header
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Constraint(#[from] ConstraintError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown proxy order `{0}`, expected `left-most` or `right-most`")]
pub struct ProxyOrderParseError(pub String);
