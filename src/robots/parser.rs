//! Robots.txt parser implementation
//!
//! Matching is delegated to the robotstxt crate. The allow/disallow rule
//! lists and `Sitemap:` hints are extracted here so callers can inspect
//! the policy without re-parsing.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt policy, bound to one user agent
///
/// Immutable once built. A policy built with [`ParsedRobots::allow_all`]
/// answers every query with "allowed" and reports `exists() == false`.
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
    /// Product token used for matching (e.g. "SiteAuditBot")
    agent: String,
    /// Whether a robots.txt was actually fetched
    exists: bool,
    allow_rules: Vec<String>,
    disallow_rules: Vec<String>,
    sitemaps: Vec<String>,
}

impl ParsedRobots {
    /// Creates a policy from raw robots.txt content for the given user agent
    pub fn from_content(content: &str, user_agent: &str) -> Self {
        let agent = agent_token(user_agent);
        let (allow_rules, disallow_rules) = extract_rules(content, &agent);

        Self {
            content: content.to_string(),
            sitemaps: extract_sitemaps(content),
            agent,
            exists: true,
            allow_rules,
            disallow_rules,
        }
    }

    /// Creates a permissive policy that allows everything
    ///
    /// This is used when robots.txt is absent or cannot be fetched.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            agent: String::new(),
            exists: false,
            allow_rules: Vec::new(),
            disallow_rules: Vec::new(),
            sitemaps: Vec::new(),
        }
    }

    /// Whether the policy came from a fetched robots.txt
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Checks if an absolute URL is allowed for the bound user agent
    pub fn is_allowed(&self, url: &str) -> bool {
        if !self.exists || self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, &self.agent, url)
    }

    /// Sitemap URLs declared with `Sitemap:` directives
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    /// `Allow:` paths of the group that applies to the bound user agent
    pub fn allow_rules(&self) -> &[String] {
        &self.allow_rules
    }

    /// Non-empty `Disallow:` paths of the group that applies to the bound user agent
    pub fn disallow_rules(&self) -> &[String] {
        &self.disallow_rules
    }
}

/// Extracts the product token robots.txt groups are matched against
///
/// "SiteAuditBot/1.0 (+https://example.com)" -> "SiteAuditBot"
fn agent_token(user_agent: &str) -> String {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .find(|s| !s.is_empty())
        .unwrap_or("*")
        .to_string()
}

fn split_directive(line: &str) -> Option<(String, &str)> {
    let line = line.split('#').next()?.trim();
    let (key, value) = line.split_once(':')?;
    Some((key.trim().to_lowercase(), value.trim()))
}

fn extract_sitemaps(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            let (key, value) = trimmed.split_once(':')?;
            if key.trim().eq_ignore_ascii_case("sitemap") && !value.trim().is_empty() {
                Some(value.trim().to_string())
            } else {
                None
            }
        })
        .collect()
}

/// Collects the rules of the most specific group for `agent`
///
/// A group naming the agent wins over `*` groups. Consecutive
/// `User-agent` lines share the rules that follow them.
fn extract_rules(content: &str, agent: &str) -> (Vec<String>, Vec<String>) {
    let agent = agent.to_lowercase();

    let mut specific = (Vec::new(), Vec::new(), false);
    let mut wildcard = (Vec::new(), Vec::new(), false);

    let mut group_agents: Vec<String> = Vec::new();
    let mut in_rules = false;

    for line in content.lines() {
        let Some((key, value)) = split_directive(line) else {
            continue;
        };

        match key.as_str() {
            "user-agent" => {
                if in_rules {
                    group_agents.clear();
                    in_rules = false;
                }
                group_agents.push(value.to_lowercase());
            }
            "allow" | "disallow" => {
                in_rules = true;
                let target = if group_agents.iter().any(|ua| *ua == agent) {
                    &mut specific
                } else if group_agents.iter().any(|ua| ua == "*") {
                    &mut wildcard
                } else {
                    continue;
                };
                target.2 = true;

                if value.is_empty() {
                    continue;
                }
                if key == "allow" {
                    target.0.push(value.to_string());
                } else {
                    target.1.push(value.to_string());
                }
            }
            _ => {}
        }
    }

    if specific.2 {
        (specific.0, specific.1)
    } else {
        (wildcard.0, wildcard.1)
    }
}
