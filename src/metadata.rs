use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// A trait to read the raw header values the resolver needs from a request
///
/// Names are given exactly as they appear in the configured header list, mapping them onto
/// the request is up to the implementation. A missing header must be reported as `None`,
/// not as an empty value.
pub trait RequestMetadata {
    /// Get the raw value of a header
    fn header(&self, name: &str) -> Option<Cow<'_, str>>;
}

impl<T: RequestMetadata + ?Sized> RequestMetadata for &T {
    fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        (**self).header(name)
    }
}

impl<K, V, S> RequestMetadata for HashMap<K, V, S>
where
    K: Eq + std::hash::Hash + std::borrow::Borrow<str>,
    V: AsRef<str>,
    S: BuildHasher,
{
    fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|value| Cow::Borrowed(value.as_ref()))
    }
}

impl<K, V> RequestMetadata for BTreeMap<K, V>
where
    K: Ord + std::borrow::Borrow<str>,
    V: AsRef<str>,
{
    fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|value| Cow::Borrowed(value.as_ref()))
    }
}

impl<K: AsRef<str>, V: AsRef<str>> RequestMetadata for [(K, V)] {
    fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.iter()
            .find(|(key, _)| key.as_ref() == name)
            .map(|(_, value)| Cow::Borrowed(value.as_ref()))
    }
}

impl<K: AsRef<str>, V: AsRef<str>, const N: usize> RequestMetadata for [(K, V); N] {
    fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.as_slice().header(name)
    }
}

impl<K: AsRef<str>, V: AsRef<str>> RequestMetadata for Vec<(K, V)> {
    fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.as_slice().header(name)
    }
}

#[cfg(feature = "http")]
pub use self::http::HttpMetadata;

#[cfg(feature = "http")]
mod http {
    use super::RequestMetadata;
    use core::net::IpAddr;
    use http::{HeaderMap, HeaderName};
    use std::borrow::Cow;

    /// [`RequestMetadata`] over the headers of a [`http`] request and its peer address
    ///
    /// Header names use the CGI / Django `META` convention:
    ///  * `REMOTE_ADDR` is the peer address of the connection
    ///  * any other name has its `HTTP_` prefix removed, `_` replaced by `-`, and is looked up
    ///    case insensitively, so `HTTP_X_FORWARDED_FOR` reads `X-Forwarded-For`
    ///
    /// Plain http header names such as `X-Real-IP` also work.
    ///
    /// When a header is sent multiple times, the values are joined with `, ` in order.
    ///
    /// Both `HTTP_X_FORWARDED_FOR` and `X_FORWARDED_FOR` read `X-Forwarded-For`, so with the
    /// default header list that header is evaluated twice. Both evaluations agree, the second
    /// one never changes the outcome.
    #[derive(Debug, Clone)]
    pub struct HttpMetadata<'a> {
        headers: &'a HeaderMap,
        remote_addr: Option<String>,
    }

    impl<'a> HttpMetadata<'a> {
        pub fn new(headers: &'a HeaderMap, remote_addr: Option<IpAddr>) -> Self {
            Self {
                headers,
                remote_addr: remote_addr.map(|ip| ip.to_string()),
            }
        }

        pub fn from_request<T>(request: &'a http::Request<T>, remote_addr: Option<IpAddr>) -> Self {
            Self::new(request.headers(), remote_addr)
        }

        pub fn from_parts(parts: &'a http::request::Parts, remote_addr: Option<IpAddr>) -> Self {
            Self::new(&parts.headers, remote_addr)
        }
    }

    fn header_name(name: &str) -> Option<HeaderName> {
        let bare = match name.get(..5) {
            Some(prefix) if prefix.eq_ignore_ascii_case("HTTP_") => &name[5..],
            _ => name,
        };

        let normalized = bare
            .chars()
            .map(|c| match c {
                '_' => '-',
                c => c.to_ascii_lowercase(),
            })
            .collect::<String>();

        HeaderName::from_bytes(normalized.as_bytes()).ok()
    }

    impl RequestMetadata for HttpMetadata<'_> {
        fn header(&self, name: &str) -> Option<Cow<'_, str>> {
            if name.eq_ignore_ascii_case("REMOTE_ADDR") {
                return self.remote_addr.as_deref().map(Cow::Borrowed);
            }

            // invalid utf-8 is kept lossily so the value fails to parse instead of vanishing
            let mut values = self
                .headers
                .get_all(header_name(name)?)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()));

            let first = values.next()?;

            Some(values.fold(first, |mut joined, value| {
                let joined_mut = joined.to_mut();
                joined_mut.push_str(", ");
                joined_mut.push_str(&value);
                joined
            }))
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_and_slices() {
        let mut map = HashMap::new();
        map.insert("REMOTE_ADDR".to_string(), "177.139.233.133".to_string());

        assert_eq!(map.header("REMOTE_ADDR").as_deref(), Some("177.139.233.133"));
        assert_eq!(map.header("HTTP_X_REAL_IP"), None);

        let map = BTreeMap::from([("HTTP_X_REAL_IP", "192.168.1.1")]);
        assert_eq!(map.header("HTTP_X_REAL_IP").as_deref(), Some("192.168.1.1"));

        let pairs = [("HTTP_X_REAL_IP", "192.168.1.1"), ("REMOTE_ADDR", "")];
        assert_eq!(pairs.header("REMOTE_ADDR").as_deref(), Some(""));
        assert_eq!(pairs.header("HTTP_CLIENT_IP"), None);
    }
}
