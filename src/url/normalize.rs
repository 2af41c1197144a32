use crate::UrlError;
use url::Url;

/// Normalizes a URL into the canonical form used for deduplication
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not http(s)
/// 2. Lowercase the host
/// 3. Drop the port when it is the scheme default (80 for http, 443 for https);
///    the `url` crate already omits default ports on parse
/// 4. Remove trailing slashes from the path, except for the root `/`
/// 5. Remove the fragment
/// 6. Sort query parameters by key (stable, so repeated keys keep their order)
/// 7. Remove an empty query string (trailing `?`)
///
/// The function is idempotent: normalizing an already normalized URL
/// returns it unchanged.
///
/// # Examples
///
/// ```
/// use site_audit::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.COM:80/page/?b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/page?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Normalizes an already parsed URL
pub fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlError::MissingDomain)?
        .to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    if url.port().is_some() && url.port() == default_port(url.scheme()) {
        // set_port only fails for cannot-be-a-base URLs, excluded above
        let _ = url.set_port(None);
    }

    let trimmed = url.path().trim_end_matches('/').to_string();
    if trimmed.is_empty() {
        url.set_path("/");
    } else {
        url.set_path(&trimmed);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let params = sorted_query_params(&url);
        url.set_query(None);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Returns the normalized string key of a URL, as stored in the visited set
pub fn normalized_key(url_str: &str) -> Result<String, UrlError> {
    normalize_url(url_str).map(String::from)
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Collects query parameters sorted by key
fn sorted_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_trailing_slash() {
        let result = normalize_url("https://example.com/page/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keep_root_slash() {
        let result = normalize_url("https://example.com/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = normalize_url("https://example.com").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_keeps_scheme_and_www() {
        let result = normalize_url("http://www.example.com/a").unwrap();
        assert_eq!(result.as_str(), "http://www.example.com/a");
    }

    #[test]
    fn test_strip_default_ports() {
        let http = normalize_url("http://example.com:80/a").unwrap();
        assert_eq!(http.as_str(), "http://example.com/a");

        let https = normalize_url("https://example.com:443/a").unwrap();
        assert_eq!(https.as_str(), "https://example.com/a");
    }

    #[test]
    fn test_keep_non_default_port() {
        let result = normalize_url("https://example.com:8443/a").unwrap();
        assert_eq!(result.as_str(), "https://example.com:8443/a");
    }

    #[test]
    fn test_lowercase_host_keeps_path_case() {
        let result = normalize_url("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_sort_query_params() {
        let result = normalize_url("https://example.com/page?b=2&a=1").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?a=1&b=2");
    }

    #[test]
    fn test_repeated_keys_keep_order() {
        let result = normalize_url("https://example.com/?t=2&a=1&t=1").unwrap();
        assert_eq!(result.as_str(), "https://example.com/?a=1&t=2&t=1");
    }

    #[test]
    fn test_empty_query_removed() {
        let result = normalize_url("https://example.com/page?").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "HTTPS://Example.com:443/a/b/?z=1&y=hello%20world#x",
            "http://example.com//",
            "https://example.com/search?q=a+b&flag",
            "https://example.com/a/../b/./c/",
        ];

        for input in inputs {
            let once = normalize_url(input).unwrap();
            let twice = normalize_url(once.as_str()).unwrap();
            assert_eq!(once, twice, "normalization not idempotent for {}", input);
        }
    }

    #[test]
    fn test_equivalent_urls_share_key() {
        let a = normalized_key("https://Example.com:443/about/?b=1&a=2").unwrap();
        let b = normalized_key("https://example.com/about?a=2&b=1").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page");
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_malformed_url() {
        assert!(normalize_url("not a url").is_err());
    }
}
