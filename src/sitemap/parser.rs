//! Sitemap protocol XML parser
//!
//! Recognizes `<urlset>` documents (page entries) and `<sitemapindex>`
//! documents (child sitemap entries). Only `<loc>` elements directly under
//! `<url>` or `<sitemap>` are collected, so extension tags such as
//! `<image:loc>` are ignored.

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Errors produced while parsing a sitemap document
#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Unexpected root element <{0}>")]
    UnknownRoot(String),

    #[error("Document has no root element")]
    Empty,
}

/// A parsed sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// A `<urlset>`: locations of pages
    UrlSet(Vec<String>),
    /// A `<sitemapindex>`: locations of other sitemaps
    Index(Vec<String>),
}

impl SitemapDocument {
    /// The `<loc>` values of the document
    pub fn locations(&self) -> &[String] {
        match self {
            Self::UrlSet(locs) | Self::Index(locs) => locs,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Root {
    UrlSet,
    Index,
}

/// Parses a sitemap or sitemap index document
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, SitemapError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut root: Option<Root> = None;
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut locs: Vec<String> = Vec::new();
    let mut current_loc: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();

                if root.is_none() {
                    root = Some(match name.as_slice() {
                        b"urlset" => Root::UrlSet,
                        b"sitemapindex" => Root::Index,
                        other => {
                            return Err(SitemapError::UnknownRoot(
                                String::from_utf8_lossy(other).into_owned(),
                            ))
                        }
                    });
                } else if name == b"loc" && in_entry(&stack) {
                    current_loc = Some(String::new());
                }

                stack.push(name);
            }
            Event::End(_) => {
                if let Some(name) = stack.pop() {
                    if name == b"loc" {
                        if let Some(loc) = current_loc.take() {
                            let loc = loc.trim().to_string();
                            if !loc.is_empty() {
                                locs.push(loc);
                            }
                        }
                    }
                }
            }
            Event::Text(t) => {
                if let Some(loc) = current_loc.as_mut() {
                    loc.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(loc) = current_loc.as_mut() {
                    loc.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match root {
        Some(Root::UrlSet) => Ok(SitemapDocument::UrlSet(locs)),
        Some(Root::Index) => Ok(SitemapDocument::Index(locs)),
        None => Err(SitemapError::Empty),
    }
}

fn in_entry(stack: &[Vec<u8>]) -> bool {
    matches!(stack.last().map(Vec::as_slice), Some(b"url") | Some(b"sitemap"))
}
