use crate::{UrlError, UrlResult};
use url::{Host, Url};

/// The parts of a URL the scheduler cares about
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlParts {
    /// Lowercase scheme, either `http` or `https`
    pub scheme: String,

    /// Host name as normalized by the URL parser
    pub host: String,
}

/// Parses a URL and extracts its scheme and host
///
/// Only plain `http`/`https` URLs naming a host are accepted. The URL is
/// rejected when it:
/// - cannot be parsed
/// - uses any other scheme
/// - carries a fragment
/// - embeds user info
/// - names an IPv4 or IPv6 literal instead of a host
/// - spells out a port, including the scheme's default one
///
/// # Examples
///
/// ```
/// use sumi_crawl::url::split_url;
///
/// let parts = split_url("https://Example.com/page?q=1").unwrap();
/// assert_eq!(parts.scheme, "https");
/// assert_eq!(parts.host, "example.com");
///
/// assert!(split_url("http://example.com/#top").is_err());
/// assert!(split_url("http://127.0.0.1/").is_err());
/// ```
pub fn split_url(url_str: &str) -> UrlResult<UrlParts> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(UrlError::InvalidScheme(scheme.to_string()));
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(UrlError::UserInfo);
    }

    if url.fragment().is_some() {
        return Err(UrlError::Fragment);
    }

    let host = match url.host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        Some(Host::Ipv4(ip)) => return Err(UrlError::IpHost(ip.to_string())),
        Some(Host::Ipv6(ip)) => return Err(UrlError::IpHost(ip.to_string())),
        None => return Err(UrlError::MissingHost),
    };

    // The parser drops default ports, so the raw authority has to be checked too
    if url.port().is_some() || has_explicit_port(url_str) {
        return Err(UrlError::ExplicitPort);
    }

    Ok(UrlParts {
        scheme: scheme.to_string(),
        host,
    })
}

/// Builds the robots.txt URL for a scheme and host
///
/// # Examples
///
/// ```
/// use sumi_crawl::url::robots_txt_url;
///
/// assert_eq!(robots_txt_url("https", "example.com"), "https://example.com/robots.txt");
/// ```
pub fn robots_txt_url(scheme: &str, host: &str) -> String {
    format!("{}://{}/robots.txt", scheme, host)
}

/// Looks for a `:port` suffix in the authority of a raw URL string
fn has_explicit_port(url_str: &str) -> bool {
    // `http:a.com:80` and `http:/a.com:80` parse like `http://a.com:80`
    let Some((_, rest)) = url_str.trim().split_once(':') else {
        return false;
    };
    let rest = rest.trim_start_matches(['/', '\\']);

    let authority_end = rest
        .find(|c| matches!(c, '/' | '?' | '#' | '\\'))
        .unwrap_or(rest.len());
    let authority = &rest[..authority_end];

    let host_port = match authority.rfind('@') {
        Some(at) => &authority[at + 1..],
        None => authority,
    };

    host_port.contains(':')
}
