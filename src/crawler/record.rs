//! Page record types
//!
//! A [`PageRecord`] is the unit handed to persistence: one per processed
//! URL, created once and never mutated afterwards.

/// An anchor found on a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link {
    /// Absolute target URL
    pub url: String,
    /// Trimmed anchor text
    pub text: String,
    pub nofollow: bool,
    pub sponsored: bool,
    pub ugc: bool,
}

/// An `<img>` element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    pub url: String,
    pub alt: Option<String>,
}

/// A `<link rel="alternate" hreflang="..">` pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hreflang {
    pub lang: String,
    pub url: String,
}

/// Structured extraction result for one processed URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRecord {
    pub url: String,
    pub scheme: String,
    /// Final URL when the request was redirected
    pub redirect_url: Option<String>,
    /// `<meta http-equiv="refresh">` content
    pub refresh: Option<String>,
    /// HTTP status, 0 when no response was received
    pub status_code: u16,
    /// Raw Content-Type header
    pub content_type: Option<String>,
    /// Content-Type without parameters, lowercased ("text/html")
    pub media_type: Option<String>,
    pub lang: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Robots directive from the meta tag, or the X-Robots-Tag header
    pub robots: Option<String>,
    pub canonical: Option<String>,
    pub h1: Option<String>,
    pub h2: Option<String>,
    pub words: usize,
    /// UTF-8 length of the raw body
    pub size: usize,
    /// Hex SHA-256 of the normalized URL
    pub url_hash: String,
    /// Hex SHA-256 of the extracted body text, empty when nothing was parsed
    pub body_hash: String,
    pub blocked_by_robots: bool,
    pub in_sitemap: bool,
    pub timeout: bool,
    pub ttfb_millis: u64,

    pub internal_links: Vec<Link>,
    pub external_links: Vec<Link>,
    pub images: Vec<Image>,
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
    pub iframes: Vec<String>,
    pub audios: Vec<String>,
    pub videos: Vec<String>,
    pub hreflangs: Vec<Hreflang>,
}

impl PageRecord {
    /// Returns true if the page's media type is HTML
    pub fn is_html(&self) -> bool {
        self.media_type.as_deref() == Some("text/html")
    }

    /// Returns true if the body was parsed (only 200 HTML GET responses are)
    pub fn is_parsed(&self) -> bool {
        !self.body_hash.is_empty()
    }

    /// Returns true if the robots directive contains the given token
    pub fn has_robots_directive(&self, directive: &str) -> bool {
        self.robots
            .as_deref()
            .map(|robots| {
                robots
                    .split(',')
                    .any(|token| token.trim().eq_ignore_ascii_case(directive))
            })
            .unwrap_or(false)
    }

    pub fn is_noindex(&self) -> bool {
        self.has_robots_directive("noindex") || self.has_robots_directive("none")
    }

    pub fn is_nofollow(&self) -> bool {
        self.has_robots_directive("nofollow") || self.has_robots_directive("none")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_robots_directives() {
        let record = PageRecord {
            robots: Some("NOINDEX, follow".to_string()),
            ..PageRecord::default()
        };
        assert!(record.is_noindex());
        assert!(!record.is_nofollow());

        let none = PageRecord {
            robots: Some("none".to_string()),
            ..PageRecord::default()
        };
        assert!(none.is_noindex());
        assert!(none.is_nofollow());

        assert!(!PageRecord::default().is_noindex());
    }

    #[test]
    fn test_is_html() {
        let record = PageRecord {
            media_type: Some("text/html".to_string()),
            ..PageRecord::default()
        };
        assert!(record.is_html());
        assert!(!PageRecord::default().is_html());
    }
}
