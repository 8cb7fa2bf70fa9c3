// src/normalize.rs
// =============================================================================
// URL identity.
//
// Two raw URLs that normalize to the same string are the same page as far as
// the crawler is concerned. The normalized string is the dedup key in the
// frontier, so this module must be pure: no network, same input -> same
// output.
//
// Canonical form:
// - scheme and host lower-cased, default ports dropped (the url crate does
//   this while parsing)
// - fragment removed, empty "?" removed
// - empty path becomes "/"
// - only http and https survive
// =============================================================================

use serde::{Serialize, Serializer};
use std::fmt;
use url::Url;

/// A URL in canonical form. Only `normalize` can build one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedUrl(Url);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Host component ("example.com"), always present for http(s).
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NormalizedUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Resolves `raw` against `base` (if given) and canonicalizes the result.
///
/// Returns `None` when the URL can't be parsed/resolved or is not http(s).
///
/// ```
/// use frontier_crawler::normalize::normalize;
///
/// let n = normalize("HTTPS://Example.COM:443/a?x=1#top", None).unwrap();
/// assert_eq!(n.as_str(), "https://example.com/a?x=1");
/// ```
pub fn normalize(raw: &str, base: Option<&Url>) -> Option<NormalizedUrl> {
    let raw = raw.trim();

    let mut url = match base {
        Some(base) => base.join(raw).ok()?,
        None => Url::parse(raw).ok()?,
    };

    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    if url.host_str().map_or(true, str::is_empty) {
        return None;
    }

    url.set_fragment(None);
    if url.query() == Some("") {
        url.set_query(None);
    }
    if url.path().is_empty() {
        url.set_path("/");
    }

    Some(NormalizedUrl(url))
}

/// True when both URLs point at the same host. Scheme and port are ignored.
pub fn is_same_origin(a: &NormalizedUrl, b: &NormalizedUrl) -> bool {
    a.host() == b.host()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str) -> String {
        normalize(raw, None).unwrap().as_str().to_string()
    }

    #[test]
    fn test_lowercases_scheme_and_host() {
        assert_eq!(norm("HTTP://WWW.Example.COM/Path"), "http://www.example.com/Path");
    }

    #[test]
    fn test_strips_default_ports() {
        assert_eq!(norm("http://example.com:80/a"), "http://example.com/a");
        assert_eq!(norm("https://example.com:443/a"), "https://example.com/a");
        assert_eq!(norm("https://example.com:8443/a"), "https://example.com:8443/a");
    }

    #[test]
    fn test_removes_fragment_and_empty_query() {
        assert_eq!(norm("https://example.com/page#section"), "https://example.com/page");
        assert_eq!(norm("https://example.com/page?"), "https://example.com/page");
    }

    #[test]
    fn test_bare_host_gets_root_path() {
        assert_eq!(norm("https://example.com"), "https://example.com/");
        assert_eq!(norm("https://example.com/"), "https://example.com/");
    }

    #[test]
    fn test_query_order_preserved() {
        assert_eq!(norm("https://example.com/s?b=2&a=1"), "https://example.com/s?b=2&a=1");
    }

    #[test]
    fn test_rejects_non_http_schemes() {
        assert!(normalize("mailto:someone@example.com", None).is_none());
        assert!(normalize("ftp://example.com/file", None).is_none());
        assert!(normalize("javascript:void(0)", None).is_none());
        assert!(normalize("not a url", None).is_none());
    }

    #[test]
    fn test_resolves_relative_against_base() {
        let base = Url::parse("https://example.com/docs/intro.html").unwrap();
        let n = normalize("../about#team", Some(&base)).unwrap();
        assert_eq!(n.as_str(), "https://example.com/about");

        let n = normalize("guide", Some(&base)).unwrap();
        assert_eq!(n.as_str(), "https://example.com/docs/guide");

        let n = normalize("//cdn.example.org/x", Some(&base)).unwrap();
        assert_eq!(n.as_str(), "https://cdn.example.org/x");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let inputs = [
            "HTTPS://Example.com:443",
            "http://example.com/a/./b/../c?q=1#f",
            "https://example.com/dir/",
            "https://EXAMPLE.com/?",
            "http://example.com:8080/x?b=1&a=2",
        ];
        for raw in inputs {
            let once = normalize(raw, None).unwrap();
            let twice = normalize(once.as_str(), None).unwrap();
            assert_eq!(once, twice, "not idempotent for {raw}");
        }
    }

    #[test]
    fn test_same_origin() {
        let a = normalize("https://example.com/a", None).unwrap();
        let b = normalize("http://EXAMPLE.com:8080/b", None).unwrap();
        let c = normalize("https://other.example/x", None).unwrap();
        assert!(is_same_origin(&a, &b));
        assert!(!is_same_origin(&a, &c));
    }
}
