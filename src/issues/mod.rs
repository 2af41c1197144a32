//! SEO issue rule engine
//!
//! Runs once over the page records of a finished crawl. Per-page rules
//! ([`PageRule`]) look at one record; global rules ([`GlobalRule`]) group
//! parsed 200 pages by title, description and body hash and report every
//! group with more than one member. Both are closed enums evaluated from
//! their `ALL` tables.
//!
//! Evaluation is pure: persisting the result, and ignoring issues that
//! were already stored, is up to the caller.

mod catalog;
mod global_rules;
mod page_rules;

pub use catalog::IssueType;
pub use global_rules::GlobalRule;
pub use page_rules::{
    PageRule, DESCRIPTION_MAX_CHARS, DESCRIPTION_MIN_CHARS, MIN_WORDS, TITLE_MAX_CHARS,
    TITLE_MIN_CHARS,
};

use crate::storage::StoredPage;

/// One issue found on one stored page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IssueRecord {
    pub page_record_id: i64,
    pub issue_type: IssueType,
}

/// Evaluates every rule over a crawl's pages
///
/// Results are sorted by page ID, then by issue type.
pub fn evaluate_issues(pages: &[StoredPage]) -> Vec<IssueRecord> {
    let mut issues = Vec::new();

    for page in pages {
        for rule in PageRule::ALL {
            if rule.matches(&page.record) {
                issues.push(IssueRecord {
                    page_record_id: page.id,
                    issue_type: rule.issue_type(),
                });
            }
        }
    }

    for rule in GlobalRule::ALL {
        let issue_type = rule.issue_type();
        issues.extend(
            rule.duplicates(pages)
                .into_iter()
                .map(|page_record_id| IssueRecord {
                    page_record_id,
                    issue_type,
                }),
        );
    }

    issues.sort_unstable();
    tracing::debug!("Evaluated {} pages: {} issues", pages.len(), issues.len());
    issues
}
