/// A `Host` header value split into host and port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostAndPort<'a> {
    pub host: &'a str,
    pub port: Option<u16>,
}

impl<'a> HostAndPort<'a> {
    /// Split `host[:port]`, ipv6 literals keep their brackets.
    pub fn parse(value: &'a str) -> Self {
        let value = value.trim();
        match value.rsplit_once(':') {
            Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) && (!host.contains(':') || host.ends_with(']')) => HostAndPort {
                host,
                port: port.parse().ok(),
            },
            _ => HostAndPort { host: value, port: None },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(HostAndPort::parse("example.org:8080"), HostAndPort { host: "example.org", port: Some(8080) });
        assert_eq!(HostAndPort::parse("example.org"), HostAndPort { host: "example.org", port: None });
        assert_eq!(HostAndPort::parse("[::1]:80"), HostAndPort { host: "[::1]", port: Some(80) });
        assert_eq!(HostAndPort::parse("[::1]"), HostAndPort { host: "[::1]", port: None });
    }
}
