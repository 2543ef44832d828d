//! Analysis use cases
//!
//! `analyze` covers one group of units built into a single graph. The
//! project use case fans independent groups across a worker pool; each
//! group's graph and propagation state stay private to its task, and
//! results merge only at the reporting boundary.

use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::domain::ast::ProgramUnit;
use crate::domain::finding::Finding;
use crate::domain::rule::{RuleParseError, RuleSet};
use crate::infrastructure::catalog::Catalog;
use crate::infrastructure::graph_builder::{BuildError, GraphBuilder};
use crate::infrastructure::propagation::{EngineError, PropagationEngine};
use crate::infrastructure::reporter;

/// Failure analyzing one unit group. The rule document is rejected before
/// any group runs; build and engine failures stay scoped to their group.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Rules(#[from] RuleParseError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Analyze one group of units as a single graph, with default settings.
pub fn analyze(units: &[ProgramUnit], rules: &RuleSet) -> Result<Vec<Finding>, AnalysisError> {
    analyze_with_config(units, rules, &EngineConfig::default())
}

/// Analyze one group of units as a single graph.
#[instrument(skip_all, fields(unit_count = units.len(), rule_count = rules.len()))]
pub fn analyze_with_config(
    units: &[ProgramUnit],
    rules: &RuleSet,
    config: &EngineConfig,
) -> Result<Vec<Finding>, AnalysisError> {
    let catalog = Catalog::compile(rules)?;
    analyze_group(units, &catalog, config)
}

fn analyze_group(
    units: &[ProgramUnit],
    catalog: &Catalog,
    config: &EngineConfig,
) -> Result<Vec<Finding>, AnalysisError> {
    let graph = GraphBuilder::new(catalog)
        .interprocedural(config.interprocedural)
        .build(units)?;
    let propagation = PropagationEngine::new(&graph, catalog).run(config)?;
    let findings = reporter::report(&graph, &propagation.paths);
    debug!(
        node_count = graph.len(),
        finding_count = findings.len(),
        "Analyzed unit group"
    );
    Ok(findings)
}

/// A unit group whose analysis was abandoned; the rest of the project is
/// unaffected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedGroup {
    /// Files of the group, in input order
    pub files: Vec<String>,
    pub reason: String,
}

/// Merged project results.
#[derive(Debug, Clone)]
pub struct ProjectAnalysis {
    /// Findings of every completed group, globally ordered
    pub findings: Vec<Finding>,
    pub skipped: Vec<SkippedGroup>,
}

/// Analyzes independent unit groups in parallel. Units that must see each
/// other (handler and DAO modules, say) belong in the same group; grouping
/// is the caller's knowledge of the project layout.
pub struct AnalyzeProjectUseCase {
    config: EngineConfig,
}

impl AnalyzeProjectUseCase {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    #[instrument(skip_all, fields(group_count = groups.len()))]
    pub fn execute(
        &self,
        groups: &[Vec<ProgramUnit>],
        rules: &RuleSet,
    ) -> Result<ProjectAnalysis, RuleParseError> {
        let catalog = Catalog::compile(rules)?;

        let outcomes: Vec<Result<Vec<Finding>, AnalysisError>> = groups
            .par_iter()
            .map(|units| analyze_group(units, &catalog, &self.config))
            .collect();

        let mut findings = Vec::new();
        let mut skipped = Vec::new();
        for (group, outcome) in groups.iter().zip(outcomes) {
            match outcome {
                Ok(group_findings) => findings.extend(group_findings),
                Err(error) => {
                    let files: Vec<String> = group.iter().map(|u| u.file.clone()).collect();
                    warn!(files = ?files, error = %error, "Skipping unit group");
                    skipped.push(SkippedGroup {
                        files,
                        reason: error.to_string(),
                    });
                }
            }
        }

        findings.sort_by(|a, b| {
            (&a.source_location, &a.sink_location, &a.category)
                .cmp(&(&b.source_location, &b.sink_location, &b.category))
        });

        info!(
            finding_count = findings.len(),
            skipped_count = skipped.len(),
            "Project analysis completed"
        );
        Ok(ProjectAnalysis { findings, skipped })
    }
}

impl Default for AnalyzeProjectUseCase {
    fn default() -> Self {
        Self::new()
    }
}
