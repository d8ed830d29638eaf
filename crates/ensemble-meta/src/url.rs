//! Meta endpoint URL construction

use crate::error::{MetaError, Result};
use reqwest::Url;

/// Build the meta endpoint URL from either `host:port` or
/// `scheme://host:port`.
///
/// A bare `host:port` gets `http`. A scheme declared in the input is kept,
/// unless `tls` is set, in which case the scheme is always `https`.
pub fn parse_meta_url(raw: &str, tls: bool) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(MetaError::InvalidUrl("meta URL is empty".to_string()));
    }

    let parsed = if raw.contains("://") {
        Url::parse(raw)
    } else {
        Url::parse(&format!("http://{}", raw))
    };
    let mut url = parsed.map_err(|e| MetaError::InvalidUrl(format!("'{}': {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(MetaError::InvalidUrl(format!(
                "'{}': unsupported scheme '{}'",
                raw, other
            )))
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(MetaError::InvalidUrl(format!("'{}': missing host", raw)));
    }

    if tls {
        url.set_scheme("https")
            .map_err(|_| MetaError::InvalidUrl(format!("'{}': cannot switch to https", raw)))?;
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_port() {
        let url = parse_meta_url("metahost:8091", false).unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host_str(), Some("metahost"));
        assert_eq!(url.port(), Some(8091));
    }

    #[test]
    fn test_bare_host_port_with_tls() {
        let url = parse_meta_url("metahost:8091", true).unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.port(), Some(8091));
    }

    #[test]
    fn test_declared_https_is_kept() {
        let url = parse_meta_url("https://metahost:8091", false).unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("metahost"));
    }

    #[test]
    fn test_tls_flag_overrides_http() {
        let url = parse_meta_url("http://metahost:8091", true).unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.port(), Some(8091));
    }

    #[test]
    fn test_host_named_like_scheme() {
        let url = parse_meta_url("httpmeta:8091", false).unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host_str(), Some("httpmeta"));
    }

    #[test]
    fn test_invalid_urls() {
        assert!(matches!(parse_meta_url("", false), Err(MetaError::InvalidUrl(_))));
        assert!(matches!(parse_meta_url("   ", true), Err(MetaError::InvalidUrl(_))));
        assert!(matches!(
            parse_meta_url("ftp://metahost:8091", false),
            Err(MetaError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_meta_url("metahost:notaport", false),
            Err(MetaError::InvalidUrl(_))
        ));
        assert!(matches!(parse_meta_url("http://", false), Err(MetaError::InvalidUrl(_))));
    }
}
