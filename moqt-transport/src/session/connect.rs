use url::Url;

use super::SessionError;

/// A parsed `moq://` connect target.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConnectAddr {
    pub host: String,
    pub port: u16,
}

impl ConnectAddr {
    pub const DEFAULT_PORT: u16 = 8080;
}

/// Parse a `moq://host[:port]` connect URI.
///
/// Accepts IPv4 literals, bracketed IPv6 literals, raw IPv6 with a trailing
/// port, and hostnames. A missing scheme is rejected rather than guessed.
pub fn parse_connect_uri(uri: &str) -> Result<ConnectAddr, SessionError> {
    // A raw IPv6 address ("fe80::1.8080") confuses Url; bracket it first.
    if let Some(addr) = parse_raw_ipv6(uri) {
        return Ok(addr);
    }

    let url = Url::parse(uri)
        .map_err(|err| SessionError::InvalidParams(format!("bad uri {uri:?}: {err}")))?;

    if url.scheme() != "moq" {
        return Err(SessionError::InvalidParams(format!(
            "expected moq:// scheme in {uri:?}"
        )));
    }

    // host() rather than host_str(): IPv6 literals come back unbracketed.
    let host = match url.host() {
        Some(url::Host::Ipv6(addr)) => addr.to_string(),
        Some(host) => host.to_string(),
        None => {
            return Err(SessionError::InvalidParams(format!(
                "missing host in {uri:?}"
            )))
        }
    };

    Ok(ConnectAddr {
        host,
        port: url.port().unwrap_or(ConnectAddr::DEFAULT_PORT),
    })
}

/// `moq://` followed by an unbracketed IPv6 literal with a trailing `.port`.
fn parse_raw_ipv6(uri: &str) -> Option<ConnectAddr> {
    let rest = uri.strip_prefix("moq://")?;
    if rest.starts_with('[') || rest.matches(':').count() < 2 {
        return None;
    }

    match rest.rsplit_once('.') {
        Some((host, port)) if host.parse::<std::net::Ipv6Addr>().is_ok() => {
            Some(ConnectAddr {
                host: host.to_string(),
                port: port.parse().ok()?,
            })
        }
        _ => rest.parse::<std::net::Ipv6Addr>().ok().map(|_| ConnectAddr {
            host: rest.to_string(),
            port: ConnectAddr::DEFAULT_PORT,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_with_port() {
        let addr = parse_connect_uri("moq://127.0.0.1:8080").unwrap();
        assert_eq!(addr.host, "127.0.0.1");
        assert_eq!(addr.port, 8080);
    }

    #[test]
    fn missing_scheme_is_invalid() {
        let result = parse_connect_uri("127.0.0.1:8080");
        assert!(matches!(result, Err(SessionError::InvalidParams(_))));

        let result = parse_connect_uri("https://127.0.0.1:8080");
        assert!(matches!(result, Err(SessionError::InvalidParams(_))));
    }

    #[test]
    fn bracketed_ipv6() {
        let addr = parse_connect_uri("moq://[fe80::1004:921d:48e:9a7d]:8080").unwrap();
        assert_eq!(addr.host, "fe80::1004:921d:48e:9a7d");
        assert_eq!(addr.port, 8080);
    }

    #[test]
    fn raw_ipv6_with_trailing_port() {
        let addr = parse_connect_uri("moq://fe80::1004:921d:48e:9a7d.8080").unwrap();
        assert_eq!(addr.host, "fe80::1004:921d:48e:9a7d");
        assert_eq!(addr.port, 8080);
    }

    #[test]
    fn hostname_defaults_port() {
        let addr = parse_connect_uri("moq://relay.example.com").unwrap();
        assert_eq!(addr.host, "relay.example.com");
        assert_eq!(addr.port, ConnectAddr::DEFAULT_PORT);
    }
}
