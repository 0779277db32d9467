use std::fmt;

use url::Url;

/// Service every target is checked against.
pub const DEFAULT_SERVICE: &str = "https";

/// What gets probed: a host (optionally `host:port`) and a service name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub service: String,
}

impl Target {
    pub fn new(host: impl Into<String>, service: impl Into<String>) -> Self {
        Self { host: host.into(), service: service.into() }
    }

    /// Build a target from whatever the caller sent.
    ///
    /// A string that parses as a URL with a host contributes its authority as
    /// typed, minus any userinfo; anything else is taken verbatim. No case
    /// folding or port stripping happens, so `Example.com` and `example.com`
    /// are different cache keys.
    pub fn parse(raw: &str, service: &str) -> Self {
        Self::new(host_of(raw).unwrap_or_else(|| raw.to_owned()), service)
    }

    /// Cache key for this target.
    pub fn key(&self) -> &str {
        &self.host
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.host, self.service)
    }
}

fn host_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    url.host_str().filter(|host| !host.is_empty())?;

    // `Url` folds case and drops default ports, so read the authority back
    // out of the input itself.
    let (_, rest) = raw.split_once("://")?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);

    (!host.is_empty()).then(|| host.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_contributes_its_host() {
        let target = Target::parse("https://example.com/x", DEFAULT_SERVICE);
        assert_eq!(target.host, "example.com");
        assert_eq!(target.service, "https");
    }

    #[test]
    fn test_bare_host_is_verbatim() {
        assert_eq!(Target::parse("example.com", DEFAULT_SERVICE).host, "example.com");
    }

    #[test]
    fn test_host_with_port_without_scheme_is_verbatim() {
        // Parses as scheme `example.com` with an opaque path, so no host.
        assert_eq!(Target::parse("example.com:8443", DEFAULT_SERVICE).host, "example.com:8443");
    }

    #[test]
    fn test_explicit_port_is_kept() {
        assert_eq!(
            Target::parse("https://example.com:8443/", DEFAULT_SERVICE).host,
            "example.com:8443"
        );
        assert_eq!(
            Target::parse("https://example.com:443/", DEFAULT_SERVICE).host,
            "example.com:443"
        );
    }

    #[test]
    fn test_no_case_folding() {
        assert_eq!(Target::parse("Example.COM", DEFAULT_SERVICE).host, "Example.COM");
        assert_eq!(Target::parse("https://EXAMPLE.com/x", DEFAULT_SERVICE).host, "EXAMPLE.com");
    }

    #[test]
    fn test_url_authority_ends_at_query_or_fragment() {
        assert_eq!(Target::parse("https://example.com?x=1", DEFAULT_SERVICE).host, "example.com");
        assert_eq!(Target::parse("https://example.com#top", DEFAULT_SERVICE).host, "example.com");
    }

    #[test]
    fn test_userinfo_is_dropped() {
        assert_eq!(
            Target::parse("https://user:pw@Example.com:8443/x", DEFAULT_SERVICE).host,
            "Example.com:8443"
        );
    }

    #[test]
    fn test_ipv6_authority_is_kept_bracketed() {
        assert_eq!(Target::parse("https://[::1]:443/", DEFAULT_SERVICE).host, "[::1]:443");
    }

    #[test]
    fn test_url_without_host_falls_back() {
        assert_eq!(Target::parse("mailto:someone", DEFAULT_SERVICE).host, "mailto:someone");
    }
}
