//! Robots.txt filter
//!
//! Thin wrapper over the robotstxt crate's matcher, built once per fetched
//! robots.txt and queried for each URL waiting behind it.

use robotstxt::DefaultMatcher;

/// Decides which URLs an agent may fetch according to one robots.txt
#[derive(Debug, Clone)]
pub struct RobotsFilter {
    agent: String,
    content: String,
}

impl RobotsFilter {
    /// Creates a filter for `agent` from raw robots.txt text
    pub fn new(agent: &str, robots_txt: &str) -> Self {
        Self {
            agent: agent.to_string(),
            content: robots_txt.to_string(),
        }
    }

    /// Creates a permissive filter that allows everything
    pub fn allow_all(agent: &str) -> Self {
        Self::new(agent, "")
    }

    /// The agent name rules are matched against
    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Checks whether the agent may download `url`
    ///
    /// `url` may be absolute or a bare path; only its path and query matter.
    pub fn can_download(&self, url: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, &self.agent, url)
    }
}
