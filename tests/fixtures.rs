#![cfg(feature = "http")]

use client_ip_resolver::{
    Config, ConfigOverride, HeaderSource, HeaderStyle, HttpMetadata, ProxyOrder, Resolver,
};
use http::{HeaderName, HeaderValue};
use rstest::*;
use serde::Deserialize;
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct HeaderJson {
    name: String,
    style: String,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigJson {
    headers: Option<Vec<HeaderJson>>,
    proxy_order: Option<String>,
    proxy_count: Option<usize>,
    proxy_trusted_ips: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct Expected {
    ip: Option<IpAddr>,
    routable: bool,
}

fn style(value: &str) -> HeaderStyle {
    match value {
        "single" => HeaderStyle::Single,
        "chain" => HeaderStyle::Chain,
        "forwarded" => HeaderStyle::Forwarded,
        _ => panic!("unknown header style {value}"),
    }
}

fn overrides(config_json: ConfigJson) -> ConfigOverride {
    let mut overrides = ConfigOverride::new();

    if let Some(headers) = config_json.headers {
        overrides = overrides.headers(
            headers
                .into_iter()
                .map(|h| HeaderSource::new(h.name, style(&h.style)))
                .collect(),
        );
    }

    if let Some(order) = config_json.proxy_order {
        overrides = overrides.proxy_order(order.parse::<ProxyOrder>().unwrap());
    }

    if let Some(count) = config_json.proxy_count {
        overrides = overrides.proxy_count(count);
    }

    if let Some(trusted_ips) = config_json.proxy_trusted_ips {
        overrides = overrides
            .trusted_proxies(trusted_ips.iter().map(String::as_str))
            .unwrap();
    }

    overrides
}

#[rstest]
fn fixture(
    #[files("**/*.test")]
    #[base_dir = "tests/fixtures"]
    path: PathBuf,
) {
    let content = std::fs::read_to_string(&path).unwrap();
    let split = content
        .split("-----------------------\n")
        .collect::<Vec<&str>>();

    let ip_addr_str = split.first().expect("no ip address");
    let plain_http_request = split.get(1).expect("no plain http request");
    let config_str = split.get(2).expect("no config");
    let expected_str = split.get(3).expect("no expected");

    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut parsed_request = httparse::Request::new(&mut headers);

    parsed_request.parse(plain_http_request.as_bytes()).unwrap();

    let mut request = http::Request::new(());

    for header in parsed_request.headers.iter() {
        let header_name = HeaderName::from_bytes(header.name.as_bytes()).unwrap();
        let header_value = HeaderValue::from_bytes(header.value).unwrap();

        request.headers_mut().append(header_name, header_value);
    }

    let ip_addr = match ip_addr_str.trim() {
        "none" => None,
        ip => Some(ip.parse::<IpAddr>().unwrap()),
    };
    let config_json = match config_str.trim() {
        "" => ConfigJson::default(),
        json => serde_json::from_str::<ConfigJson>(json).unwrap(),
    };
    let expected =
        serde_json::from_str::<Expected>(expected_str).expect("failed to parse expected");

    let metadata = HttpMetadata::from_request(&request, ip_addr);
    let resolution =
        Resolver::new(Config::default()).resolve_with(&metadata, &overrides(config_json));

    assert_eq!(resolution.ip(), expected.ip, "{}", path.display());
    assert_eq!(resolution.is_routable(), expected.routable, "{}", path.display());
}
