//! SARIF v2.1.0 export
//!
//! Optional rendering of findings for code-scanning integrations. Taint
//! paths map onto SARIF code flows, one thread flow per finding.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::finding::Finding;
use crate::domain::graph::Location;
use crate::domain::rule::RuleSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarifReport {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub version: String,
    pub runs: Vec<SarifRun>,
}

impl Default for SarifReport {
    fn default() -> Self {
        Self {
            schema: "https://docs.oasis-open.org/sarif/sarif/v2.1.0/os/schemas/sarif-schema-2.1.0.json"
                .to_string(),
            version: "2.1.0".to_string(),
            runs: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarifRun {
    pub tool: SarifTool,
    pub results: Vec<SarifResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarifTool {
    pub driver: SarifToolDriver,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifToolDriver {
    pub name: String,
    #[serde(default)]
    pub semantic_version: Option<String>,
    #[serde(default)]
    pub rules: Vec<SarifRuleEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRuleEntry {
    pub id: String,
    #[serde(default)]
    pub short_description: Option<SarifMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarifMessage {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SarifLevel {
    Note,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifResult {
    pub rule_id: String,
    pub level: SarifLevel,
    pub message: SarifMessage,
    pub locations: Vec<SarifLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_flows: Option<Vec<SarifCodeFlow>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifCodeFlow {
    pub thread_flows: Vec<SarifThreadFlow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarifThreadFlow {
    pub locations: Vec<SarifThreadFlowLocation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarifThreadFlowLocation {
    pub location: SarifLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifLocation {
    pub physical_location: SarifPhysicalLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifPhysicalLocation {
    pub artifact_location: SarifArtifactLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<SarifRegion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarifArtifactLocation {
    pub uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRegion {
    pub start_line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_column: Option<u32>,
}

fn sarif_location(location: &Location) -> SarifLocation {
    SarifLocation {
        physical_location: SarifPhysicalLocation {
            artifact_location: SarifArtifactLocation {
                uri: location.file.clone(),
            },
            region: Some(SarifRegion {
                start_line: location.line,
                // SARIF columns are 1-based
                start_column: Some(location.column + 1),
            }),
        },
    }
}

/// Render findings into a SARIF report. Rule entries cover the sink rules
/// the findings reference, in rule-set order.
pub fn to_sarif(findings: &[Finding], rules: &RuleSet, tool_name: &str) -> SarifReport {
    let rule_entries: Vec<SarifRuleEntry> = rules
        .iter()
        .filter(|r| findings.iter().any(|f| f.rule_id == r.id))
        .map(|r| SarifRuleEntry {
            id: r.id.clone(),
            short_description: r
                .description
                .as_ref()
                .map(|text| SarifMessage { text: text.clone() }),
        })
        .collect();

    let results: Vec<SarifResult> = findings
        .iter()
        .map(|finding| SarifResult {
            rule_id: finding.rule_id.clone(),
            level: SarifLevel::Error,
            message: SarifMessage {
                text: format!(
                    "{}: untrusted data from {} reaches {}",
                    finding.category, finding.source_location, finding.sink_location
                ),
            },
            locations: vec![sarif_location(&finding.sink_location)],
            code_flows: Some(vec![SarifCodeFlow {
                thread_flows: vec![SarifThreadFlow {
                    locations: finding
                        .path
                        .iter()
                        .map(|step| SarifThreadFlowLocation {
                            location: sarif_location(&step.location),
                        })
                        .collect(),
                }],
            }]),
        })
        .collect();

    debug!(
        rule_count = rule_entries.len(),
        result_count = results.len(),
        "Rendered SARIF report"
    );
    SarifReport {
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifToolDriver {
                    name: tool_name.to_string(),
                    semantic_version: Some(env!("CARGO_PKG_VERSION").to_string()),
                    rules: rule_entries,
                },
            },
            results,
        }],
        ..Default::default()
    }
}
