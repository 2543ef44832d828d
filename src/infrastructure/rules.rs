//! Built-in injection rules
//!
//! Default source/sink/sanitizer rules for JavaScript-style web handlers:
//! request parameters as sources, shell and query execution as sinks, and
//! the usual numeric/encoding conversions as sanitizers. Callers with their
//! own rule documents bypass this entirely.

use crate::domain::rule::{Rule, RuleRole, RuleSet};

const COMMAND: &str = "command-injection";
const NOSQL: &str = "nosql-injection";

fn rule(id: &str, role: RuleRole, category: &str, matcher: &str, description: &str) -> Rule {
    Rule {
        id: id.into(),
        role,
        category: category.into(),
        matcher: matcher.into(),
        description: Some(description.into()),
    }
}

/// The embedded default rule set.
pub fn default_rules() -> RuleSet {
    let mut rules = Vec::new();

    // request-derived sources taint both categories
    for (suffix, matcher) in [
        ("req-query", "req.query.*"),
        ("req-params", "req.params.*"),
        ("req-body", "req.body.*"),
        ("req-headers", "req.headers.*"),
    ] {
        for category in [COMMAND, NOSQL] {
            rules.push(rule(
                &format!("js-{}-{}", suffix, category),
                RuleRole::Source,
                category,
                matcher,
                "HTTP request data controlled by the client",
            ));
        }
    }

    rules.push(rule(
        "js-exec",
        RuleRole::Sink,
        COMMAND,
        "exec(...)",
        "Shell command execution",
    ));
    rules.push(rule(
        "js-exec-sync",
        RuleRole::Sink,
        COMMAND,
        "execSync(...)",
        "Synchronous shell command execution",
    ));
    rules.push(rule(
        "js-spawn",
        RuleRole::Sink,
        COMMAND,
        "spawn(...)",
        "Child process spawn",
    ));
    rules.push(rule(
        "js-child-process-exec",
        RuleRole::Sink,
        COMMAND,
        "child_process.exec(...)",
        "Shell command execution via module path",
    ));

    rules.push(rule(
        "js-collection-find",
        RuleRole::Sink,
        NOSQL,
        "*.find(...)",
        "Query execution against a collection",
    ));
    rules.push(rule(
        "js-collection-find-one",
        RuleRole::Sink,
        NOSQL,
        "*.findOne(...)",
        "Single-document query execution",
    ));
    rules.push(rule(
        "js-where-document",
        RuleRole::Sink,
        NOSQL,
        "{$where}",
        "Server-side JavaScript query document",
    ));

    for category in [COMMAND, NOSQL] {
        rules.push(rule(
            &format!("js-parse-int-{}", category),
            RuleRole::Sanitizer,
            category,
            "parseInt(...)",
            "Numeric conversion discards injected syntax",
        ));
        rules.push(rule(
            &format!("js-number-{}", category),
            RuleRole::Sanitizer,
            category,
            "Number(...)",
            "Numeric conversion discards injected syntax",
        ));
    }
    rules.push(rule(
        "js-encode-uri-component",
        RuleRole::Sanitizer,
        COMMAND,
        "encodeURIComponent(...)",
        "Percent-encoding neutralizes shell metacharacters",
    ));

    RuleSet::new(rules)
}
