//! Source/sink/sanitizer catalog
//!
//! Compiles the declarative rule set into matchers and classifies graph
//! nodes. Matching is name-based and deliberately approximate: dynamic call
//! targets are matched on the callee's qualified name alone, without type
//! information, which over-approximates rather than misses.
//!
//! Matcher forms:
//! - `req.query.*`: dotted chain over a node's qualified name; `*` matches
//!   exactly one segment
//! - `exec(...)`, `*.find(...)`: call nodes only, matched on the callee
//!   chain
//! - `{$where}`: object literals containing the given key

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain::graph::{GraphNode, NodeKind};
use crate::domain::rule::{Rule, RuleParseError, RuleRole, RuleSet};

/// Compiled patterns are shared process-wide; the same matcher string in
/// several rule sets compiles once.
static PATTERN_CACHE: Lazy<RwLock<HashMap<String, Regex>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

fn cached_regex(pattern: &str) -> Result<Regex, regex::Error> {
    if let Some(existing) = PATTERN_CACHE
        .read()
        .ok()
        .and_then(|guard| guard.get(pattern).cloned())
    {
        return Ok(existing);
    }

    let compiled = Regex::new(pattern)?;
    if let Ok(mut guard) = PATTERN_CACHE.write() {
        guard
            .entry(pattern.to_string())
            .or_insert_with(|| compiled.clone());
    }
    Ok(compiled)
}

#[derive(Debug, Clone)]
enum CompiledMatcher {
    /// Qualified-name pattern for non-call nodes
    Name(Regex),
    /// Callee pattern for call nodes
    Call(Regex),
    /// Object literals carrying the key
    ObjectKey(String),
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: Rule,
    matcher: CompiledMatcher,
}

/// Catalog of compiled rules, queried once per node during propagation.
/// Classification is pure: no state changes after compilation.
#[derive(Debug)]
pub struct Catalog {
    compiled: Vec<CompiledRule>,
    categories: Vec<String>,
}

impl Catalog {
    pub fn compile(rules: &RuleSet) -> Result<Self, RuleParseError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules.iter() {
            compiled.push(CompiledRule {
                rule: rule.clone(),
                matcher: compile_matcher(rule)?,
            });
        }
        debug!(rule_count = compiled.len(), "Compiled rule catalog");
        Ok(Self {
            compiled,
            categories: rules.categories(),
        })
    }

    /// Every rule whose matcher accepts the node; empty when none match.
    /// Rules of different categories may match the same node.
    pub fn classify(&self, node: &GraphNode) -> Vec<&Rule> {
        self.compiled
            .iter()
            .filter(|c| matches_node(&c.matcher, node))
            .map(|c| &c.rule)
            .collect()
    }

    /// First rule of the given role and category matching the node.
    pub fn classify_role(
        &self,
        node: &GraphNode,
        role: RuleRole,
        category: &str,
    ) -> Option<&Rule> {
        self.compiled
            .iter()
            .find(|c| {
                c.rule.role == role
                    && c.rule.category == category
                    && matches_node(&c.matcher, node)
            })
            .map(|c| &c.rule)
    }

    /// Whether any rule at all matches the node, regardless of role.
    /// The builder uses this to distinguish known externals from
    /// unresolved call targets.
    pub fn knows(&self, node: &GraphNode) -> bool {
        self.compiled.iter().any(|c| matches_node(&c.matcher, node))
    }

    /// Distinct categories of the compiled rule set, sorted.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}

fn matches_node(matcher: &CompiledMatcher, node: &GraphNode) -> bool {
    match matcher {
        CompiledMatcher::Name(regex) => {
            node.kind != NodeKind::Call
                && node
                    .qualified_name
                    .as_deref()
                    .is_some_and(|name| regex.is_match(name))
        }
        CompiledMatcher::Call(regex) => {
            node.kind == NodeKind::Call
                && node
                    .qualified_name
                    .as_deref()
                    .is_some_and(|name| regex.is_match(name))
        }
        CompiledMatcher::ObjectKey(key) => {
            node.kind == NodeKind::Object && node.object_keys.iter().any(|k| k == key)
        }
    }
}

fn compile_matcher(rule: &Rule) -> Result<CompiledMatcher, RuleParseError> {
    let pattern = rule.matcher.trim();
    if pattern.is_empty() {
        return Err(RuleParseError::Matcher {
            rule_id: rule.id.clone(),
            pattern: rule.matcher.clone(),
            reason: "empty pattern".into(),
        });
    }

    if let Some(key) = pattern
        .strip_prefix('{')
        .and_then(|p| p.strip_suffix('}'))
    {
        if key.is_empty() {
            return Err(RuleParseError::Matcher {
                rule_id: rule.id.clone(),
                pattern: rule.matcher.clone(),
                reason: "empty object key".into(),
            });
        }
        return Ok(CompiledMatcher::ObjectKey(key.to_string()));
    }

    if let Some(base) = pattern.strip_suffix("(...)") {
        return Ok(CompiledMatcher::Call(name_regex(rule, base)?));
    }

    Ok(CompiledMatcher::Name(name_regex(rule, pattern)?))
}

/// Anchored regex over a dotted name; a `*` segment matches exactly one
/// segment.
fn name_regex(rule: &Rule, pattern: &str) -> Result<Regex, RuleParseError> {
    let mut source = String::from("^");
    for (i, segment) in pattern.split('.').enumerate() {
        if segment.is_empty() {
            return Err(RuleParseError::Matcher {
                rule_id: rule.id.clone(),
                pattern: rule.matcher.clone(),
                reason: "empty segment".into(),
            });
        }
        if i > 0 {
            source.push_str("\\.");
        }
        if segment == "*" {
            source.push_str("[^.]+");
        } else {
            source.push_str(&regex::escape(segment));
        }
    }
    source.push('$');

    cached_regex(&source).map_err(|e| RuleParseError::Matcher {
        rule_id: rule.id.clone(),
        pattern: rule.matcher.clone(),
        reason: e.to_string(),
    })
}
