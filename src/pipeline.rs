//! End-to-end analysis.
//!
//! [`analyze`] wires the four stages into one pure function:
//!
//! 1. relationship extraction over the supplied sources
//! 2. aggregation into a [`SatdGraph`] and chain decomposition
//! 3. SIR scoring
//! 4. commit-aware ranking
//!
//! Nothing here touches the filesystem or version control; sources and
//! commits are handed in by the caller.

use crate::config::SatdConfig;
use crate::core::{DebtMarker, SourceMap};
use crate::errors::{normalize_diagnostics, Diagnostic, Result};
use crate::extraction::extract_relationships;
use crate::graph::{assign_representatives, ChainMetrics, SatdGraph};
use crate::scoring::{rank_by_sir, CaigRanker, CommitRecord, RankedMarker, SirScore, SirScorer};
use serde::Serialize;
use tracing::{debug, info, info_span};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub graph: SatdGraph,
    pub chain_metrics: ChainMetrics,
    /// SIR scores, highest first.
    pub sir_scores: Vec<SirScore>,
    /// Final CAIG ranking, highest priority first.
    pub ranking: Vec<RankedMarker>,
    /// Sorted, deduplicated conditions recovered from during the run.
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisReport {
    fn empty() -> Self {
        Self {
            diagnostics: vec![Diagnostic::EmptyInput],
            ..Self::default()
        }
    }

    /// The `n` highest-priority markers.
    pub fn top(&self, n: usize) -> &[RankedMarker] {
        &self.ranking[..n.min(self.ranking.len())]
    }

    pub fn ranked(&self, id: &str) -> Option<&RankedMarker> {
        self.ranking.iter().find(|r| r.marker.id == id)
    }
}

/// Run every stage over `markers`.
///
/// Only an invalid configuration fails. Zero markers is a valid input and
/// yields an empty report carrying [`Diagnostic::EmptyInput`].
pub fn analyze(
    markers: &[DebtMarker],
    sources: &SourceMap,
    commits: &[CommitRecord],
    config: &SatdConfig,
) -> Result<AnalysisReport> {
    config.validate()?;

    let span = info_span!(
        "satd_analysis",
        markers = markers.len(),
        files = sources.len(),
        commits = commits.len(),
    );
    let _guard = span.enter();

    if markers.is_empty() {
        info!("No debt markers supplied; returning an empty report");
        return Ok(AnalysisReport::empty());
    }

    let extraction = {
        let _span = info_span!("relationship_extraction").entered();
        let extraction = extract_relationships(markers, sources, config);
        debug!(edges = extraction.edges.len(), "Extraction complete");
        extraction
    };
    let mut diagnostics = extraction.diagnostics;

    let mut graph = {
        let _span = info_span!("graph_aggregation").entered();
        let (graph, graph_diagnostics) = SatdGraph::build_with_diagnostics(markers, extraction.edges);
        diagnostics.extend(graph_diagnostics);
        debug!(
            relationships = graph.relationships.len(),
            chains = graph.chains.len(),
            "Graph built"
        );
        graph
    };

    let scores = {
        let _span = info_span!("sir_scoring").entered();
        SirScorer::new(config.sir, config.max_hops).calculate_sir_scores(&graph)
    };
    assign_representatives(&mut graph.chains, |id| {
        scores.get(id).map(|s| s.sir).unwrap_or(0.0)
    });

    let ranking = {
        let _span = info_span!("caig_ranking").entered();
        let (ranking, rank_diagnostics) =
            CaigRanker::new(config).rank(&graph, &scores, sources, commits);
        diagnostics.extend(rank_diagnostics);
        ranking
    };

    let chain_metrics = ChainMetrics::compute(&graph.chains, &graph.nodes);
    info!(
        markers = graph.node_count(),
        chains = chain_metrics.chain_count,
        "Analysis complete"
    );

    Ok(AnalysisReport {
        sir_scores: rank_by_sir(&scores),
        chain_metrics,
        graph,
        ranking,
        diagnostics: normalize_diagnostics(diagnostics),
    })
}
