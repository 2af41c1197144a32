//! Rules evaluated on one page record at a time

use super::IssueType;
use crate::crawler::PageRecord;

pub const TITLE_MIN_CHARS: usize = 30;
pub const TITLE_MAX_CHARS: usize = 60;
pub const DESCRIPTION_MIN_CHARS: usize = 70;
pub const DESCRIPTION_MAX_CHARS: usize = 160;
pub const MIN_WORDS: usize = 300;

/// Per-page predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRule {
    Status3xx,
    Status4xx,
    Status5xx,
    EmptyTitle,
    ShortTitle,
    LongTitle,
    EmptyDescription,
    ShortDescription,
    LongDescription,
    MissingH1,
    MissingLang,
    LittleContent,
}

impl PageRule {
    /// Every per-page rule, in evaluation order
    pub const ALL: [PageRule; 12] = [
        Self::Status3xx,
        Self::Status4xx,
        Self::Status5xx,
        Self::EmptyTitle,
        Self::ShortTitle,
        Self::LongTitle,
        Self::EmptyDescription,
        Self::ShortDescription,
        Self::LongDescription,
        Self::MissingH1,
        Self::MissingLang,
        Self::LittleContent,
    ];

    pub fn issue_type(&self) -> IssueType {
        match self {
            Self::Status3xx => IssueType::Redirect3xx,
            Self::Status4xx => IssueType::Error4xx,
            Self::Status5xx => IssueType::Error5xx,
            Self::EmptyTitle => IssueType::EmptyTitle,
            Self::ShortTitle => IssueType::ShortTitle,
            Self::LongTitle => IssueType::LongTitle,
            Self::EmptyDescription => IssueType::EmptyDescription,
            Self::ShortDescription => IssueType::ShortDescription,
            Self::LongDescription => IssueType::LongDescription,
            Self::MissingH1 => IssueType::MissingH1,
            Self::MissingLang => IssueType::MissingLang,
            Self::LittleContent => IssueType::LittleContent,
        }
    }

    /// Returns true if the page has this issue
    ///
    /// Content rules only look at parsed 200 HTML pages; status rules look
    /// at any record that received a response.
    pub fn matches(&self, page: &PageRecord) -> bool {
        let status = page.status_code;
        match self {
            Self::Status3xx => (300..400).contains(&status),
            Self::Status4xx => (400..500).contains(&status),
            Self::Status5xx => (500..600).contains(&status),
            _ if !has_content(page) => false,
            Self::EmptyTitle => chars(&page.title) == 0,
            Self::ShortTitle => (1..TITLE_MIN_CHARS).contains(&chars(&page.title)),
            Self::LongTitle => chars(&page.title) > TITLE_MAX_CHARS,
            Self::EmptyDescription => chars(&page.description) == 0,
            Self::ShortDescription => {
                (1..DESCRIPTION_MIN_CHARS).contains(&chars(&page.description))
            }
            Self::LongDescription => chars(&page.description) > DESCRIPTION_MAX_CHARS,
            Self::MissingH1 => chars(&page.h1) == 0,
            Self::MissingLang => chars(&page.lang) == 0,
            Self::LittleContent => page.words < MIN_WORDS,
        }
    }
}

/// A 200 response whose HTML body was parsed
pub(crate) fn has_content(page: &PageRecord) -> bool {
    page.status_code == 200 && page.is_parsed()
}

fn chars(value: &Option<String>) -> usize {
    value.as_deref().map(|s| s.trim().chars().count()).unwrap_or(0)
}
