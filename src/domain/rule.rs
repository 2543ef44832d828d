//! Source/sink/sanitizer rules
//!
//! The declarative rule set the engine is driven by. Rule documents are
//! plain JSON; reading them from disk is the caller's concern.

use serde::{Deserialize, Serialize};

/// Role a rule plays in taint tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleRole {
    /// Introduces taint (e.g. a request parameter)
    Source,
    /// Dangerous consumer of tainted data (e.g. shell or query execution)
    Sink,
    /// Clears its category from data flowing through it
    Sanitizer,
}

/// A single rule.
///
/// `matcher` accepts three pattern forms, compiled by the catalog:
/// a dotted property chain with `*` wildcard segments (`req.query.*`),
/// a call pattern over the callee name (`exec(...)`, `*.find(...)`), or
/// an object-key pattern over object literals (`{$where}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Unique rule identifier
    pub id: String,
    pub role: RuleRole,
    /// Vulnerability category the rule participates in
    /// (e.g. "command-injection", "nosql-injection")
    pub category: String,
    pub matcher: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Ordered rule document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

/// Error rejecting an invalid rule document or matcher pattern.
#[derive(Debug, thiserror::Error)]
pub enum RuleParseError {
    #[error("invalid rule document: {0}")]
    Document(#[from] serde_json::Error),
    #[error("rule {rule_id}: invalid matcher pattern {pattern:?}: {reason}")]
    Matcher {
        rule_id: String,
        pattern: String,
        reason: String,
    },
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Parse a JSON rule document: `{"rules": [{"id", "role", "category",
    /// "matcher"}, ...]}`.
    pub fn from_json(document: &str) -> Result<Self, RuleParseError> {
        Ok(serde_json::from_str(document)?)
    }

    /// Distinct categories, sorted.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> =
            self.rules.iter().map(|r| r.category.clone()).collect();
        categories.sort();
        categories.dedup();
        categories
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }
}
