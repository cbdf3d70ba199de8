//! # Client ip resolver
//!
//! This crate resolves the most plausible originating client ip address of a http request from
//! the many, redundant and spoofable headers proxies and load balancers set.
//!
//! ## Usage
//!
//! ```rust
//! use client_ip_resolver::{resolve, Config, HttpMetadata};
//! use http::Request;
//!
//! let config = Config::default();
//! let mut request = Request::get("/").body(()).unwrap();
//! request.headers_mut().insert("x-forwarded-for", "177.139.233.139, 198.84.193.158".parse().unwrap());
//! let socket_ip_addr = core::net::IpAddr::from([10, 0, 0, 1]);
//!
//! let metadata = HttpMetadata::from_request(&request, Some(socket_ip_addr));
//! let resolution = resolve(&metadata, &config);
//!
//! assert_eq!(resolution.ip(), Some(core::net::IpAddr::from([177, 139, 233, 139])));
//! assert!(resolution.is_routable());
//! ```
//!
//! ## Features
//!
//!  * Look at a configurable list of headers in precedence order, `X-Forwarded-For` first and
//!    the peer address of the connection last by default.
//!  * Skip any header holding a malformed address, a partially valid chain is never trusted.
//!  * Prefer routable addresses over private ones, and private ones over loopback.
//!  * Fail closed when a forwarding chain does not go through the expected number of proxies
//!    or through the trusted proxies.
//!
//! ## Implementation
//!
//! The `Forwarded` header is read following [RFC 7239](https://tools.ietf.org/html/rfc7239),
//! only its `for` parameters are used.

mod chain;
mod classify;
mod config;
mod error;
mod metadata;
mod proxy;
mod resolve;

pub use chain::{parse as parse_chain, AddressChain};
pub use classify::{classify, parse_address, ClassifiedAddress, Reachability};
pub use config::{Config, ConfigOverride, HeaderSource, HeaderStyle, ProxyOrder, DEFAULT_HEADERS};
pub use error::{ConstraintError, HeaderError, ParseError, ProxyOrderParseError};
#[cfg(feature = "http")]
pub use metadata::HttpMetadata;
pub use metadata::RequestMetadata;
pub use proxy::validate as validate_chain;
pub use resolve::{resolve, Resolution, Resolver};
