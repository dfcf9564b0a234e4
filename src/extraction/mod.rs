//! Structural relationship discovery between debt markers.
//!
//! Every source file is parsed once, in parallel, into a [`SourceUnit`].
//! Three independent [`RelationshipExtractor`]s then read the shared
//! [`ExtractionContext`] and propose candidate [`WeightedEdge`]s:
//!
//! - [`CallExtractor`]: marker A's function reaches marker B's function
//!   through the call graph.
//! - [`DataExtractor`]: a name defined near A is read later near B.
//! - [`ModuleExtractor`]: A's file imports B's file, directly or
//!   transitively.
//!
//! A file that fails to parse is skipped with a
//! [`Diagnostic::ParseFailure`]; it never aborts the run.

pub mod call;
pub mod data;
pub mod lexical;
pub mod module;
pub mod parsers;

pub use call::CallExtractor;
pub use data::DataExtractor;
pub use module::{ModuleExtractor, ModuleResolver};
pub use parsers::{parse_source, parser_for, StructureParser};

use crate::config::SatdConfig;
use crate::core::{paths::normalize_path, DebtMarker, SourceMap, SourceUnit};
use crate::errors::Diagnostic;
use crate::graph::{RelationType, WeightedEdge};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Candidate edges plus the conditions met while producing them.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub edges: Vec<WeightedEdge>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    /// Add an edge, discarding it if both ends are the same marker.
    pub fn push(&mut self, edge: WeightedEdge) {
        if edge.is_self_loop() {
            log::debug!("Discarding {} self-relationship on {}", edge.relation, edge.source);
            self.diagnostics.push(Diagnostic::SelfRelationship {
                marker: edge.source,
            });
            return;
        }
        self.edges.push(edge);
    }

    pub fn merge(&mut self, other: Extraction) {
        self.edges.extend(other.edges);
        self.diagnostics.extend(other.diagnostics);
    }
}

/// Everything the extractors read, built once per run.
pub struct ExtractionContext<'a> {
    /// Markers per normalized file path, ordered by line then id.
    pub markers_by_file: BTreeMap<PathBuf, Vec<&'a DebtMarker>>,
    /// Raw text per normalized file path.
    pub sources: BTreeMap<PathBuf, &'a str>,
    /// Parsed units for every file that parsed cleanly.
    pub units: BTreeMap<PathBuf, SourceUnit>,
    pub max_hops: usize,
    pub context_window: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> ExtractionContext<'a> {
    pub fn new(markers: &'a [DebtMarker], sources: &'a SourceMap, config: &SatdConfig) -> Self {
        let mut markers_by_file: BTreeMap<PathBuf, Vec<&'a DebtMarker>> = BTreeMap::new();
        for marker in markers {
            markers_by_file
                .entry(normalize_path(&marker.file))
                .or_default()
                .push(marker);
        }
        for file_markers in markers_by_file.values_mut() {
            file_markers.sort_by(|a, b| a.line.cmp(&b.line).then_with(|| a.id.cmp(&b.id)));
        }

        let sources: BTreeMap<PathBuf, &'a str> = sources
            .iter()
            .map(|(path, text)| (normalize_path(path), text.as_str()))
            .collect();

        let (units, diagnostics) = parse_all(&sources);

        Self {
            markers_by_file,
            sources,
            units,
            max_hops: config.max_hops,
            context_window: config.context_window,
            diagnostics,
        }
    }

    pub fn unit(&self, path: &std::path::Path) -> Option<&SourceUnit> {
        self.units.get(path)
    }
}

fn parse_all(sources: &BTreeMap<PathBuf, &str>) -> (BTreeMap<PathBuf, SourceUnit>, Vec<Diagnostic>) {
    let results: Vec<_> = sources
        .par_iter()
        .filter_map(|(path, text)| parse_source(path, text).map(|result| (path, result)))
        .collect();

    let mut units = BTreeMap::new();
    let mut diagnostics = Vec::new();
    for (path, result) in results {
        match result {
            Ok(unit) => {
                units.insert(path.clone(), unit);
            }
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                diagnostics.push(Diagnostic::ParseFailure {
                    file: path.clone(),
                    message: e.to_string(),
                });
            }
        }
    }
    (units, diagnostics)
}

/// One structural relationship analysis.
pub trait RelationshipExtractor: Sync {
    fn relation(&self) -> RelationType;

    fn extract(&self, ctx: &ExtractionContext<'_>) -> Extraction;
}

/// Parse every source and run all three extractors.
///
/// The returned edges are sorted, so the result does not depend on the
/// order in which markers or sources were supplied.
pub fn extract_relationships(
    markers: &[DebtMarker],
    sources: &SourceMap,
    config: &SatdConfig,
) -> Extraction {
    let ctx = ExtractionContext::new(markers, sources, config);
    let extractors: [&dyn RelationshipExtractor; 3] =
        [&CallExtractor, &DataExtractor, &ModuleExtractor];

    let results: Vec<Extraction> = extractors
        .par_iter()
        .map(|extractor| {
            let _span = tracing::debug_span!("extractor", relation = %extractor.relation()).entered();
            let extraction = extractor.extract(&ctx);
            tracing::debug!(edges = extraction.edges.len(), "extractor finished");
            extraction
        })
        .collect();

    let mut combined = Extraction {
        edges: Vec::new(),
        diagnostics: ctx.diagnostics,
    };
    for extraction in results {
        combined.merge(extraction);
    }
    combined.edges.sort_by(|a, b| {
        (&a.source, &a.target, a.relation, a.hops)
            .cmp(&(&b.source, &b.target, b.relation, b.hops))
            .then_with(|| b.weight.total_cmp(&a.weight))
    });
    combined
}
