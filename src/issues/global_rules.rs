//! Rules evaluated over every page of a finished crawl

use super::page_rules::has_content;
use super::IssueType;
use crate::crawler::PageRecord;
use crate::storage::StoredPage;
use std::collections::HashMap;

/// Cross-page duplicate predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalRule {
    DuplicateTitle,
    DuplicateDescription,
    DuplicateContent,
}

impl GlobalRule {
    pub const ALL: [GlobalRule; 3] = [
        Self::DuplicateTitle,
        Self::DuplicateDescription,
        Self::DuplicateContent,
    ];

    pub fn issue_type(&self) -> IssueType {
        match self {
            Self::DuplicateTitle => IssueType::DuplicatedTitle,
            Self::DuplicateDescription => IssueType::DuplicatedDescription,
            Self::DuplicateContent => IssueType::DuplicatedContent,
        }
    }

    /// Grouping key of a page, None if the page takes no part in this rule
    fn key(&self, page: &PageRecord) -> Option<String> {
        if !has_content(page) {
            return None;
        }

        let key = match self {
            Self::DuplicateTitle => page.title.as_deref()?.trim().to_lowercase(),
            Self::DuplicateDescription => page.description.as_deref()?.trim().to_string(),
            Self::DuplicateContent => page.body_hash.clone(),
        };

        if key.is_empty() {
            None
        } else {
            Some(key)
        }
    }

    /// Returns the IDs of pages sharing their key with at least one other page
    pub fn duplicates(&self, pages: &[StoredPage]) -> Vec<i64> {
        let mut groups: HashMap<String, Vec<i64>> = HashMap::new();
        for page in pages {
            if let Some(key) = self.key(&page.record) {
                groups.entry(key).or_default().push(page.id);
            }
        }

        let mut ids: Vec<i64> = groups
            .into_values()
            .filter(|group| group.len() > 1)
            .flatten()
            .collect();
        ids.sort_unstable();
        ids
    }
}
