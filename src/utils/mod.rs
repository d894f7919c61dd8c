//! Utility functions and helpers.

pub mod http;
pub mod log;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://www.propertyfinder.ae").unwrap();
        assert_eq!(
            resolve_url(&base, "/en/plp/buy/land-123.html"),
            "https://www.propertyfinder.ae/en/plp/buy/land-123.html"
        );
        assert_eq!(
            resolve_url(&Url::parse("https://www.bayut.com/a/").unwrap(), "b"),
            "https://www.bayut.com/a/b"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  AED \n 1,200,000 "), "AED 1,200,000");
        assert_eq!(normalize_whitespace(""), "");
    }
}
