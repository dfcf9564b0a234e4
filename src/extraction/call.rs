//! Call relationships: marker A's function reaches marker B's function
//! through at most `max_hops` calls.

use super::{Extraction, ExtractionContext, RelationshipExtractor};
use crate::core::{DebtMarker, SourceUnit};
use crate::graph::{RelationType, WeightedEdge};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::PathBuf;

/// A marker written just above a function header belongs to that function
/// when it sits within this many lines of it.
pub const LEADING_COMMENT_SLACK: usize = 3;

/// Identity of a function across the analyzed files.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FunctionKey {
    pub file: PathBuf,
    pub qualified_name: String,
    pub start_line: usize,
}

/// Directed call graph over every function in every parsed unit.
#[derive(Debug, Default)]
pub struct CallGraph {
    pub functions: Vec<FunctionKey>,
    /// Callees per function index, sorted and deduplicated.
    pub callees: Vec<Vec<usize>>,
    /// Graph index of each file's first function; a unit's functions
    /// occupy consecutive indices from there.
    offsets: BTreeMap<PathBuf, usize>,
}

impl CallGraph {
    /// Build the graph, resolving call sites by bare name.
    ///
    /// A callee defined in the caller's own file wins over same-named
    /// functions elsewhere; otherwise every function with that name is a
    /// candidate. Calls that match nothing (library calls, dynamic
    /// dispatch) are dropped.
    pub fn build(units: &BTreeMap<PathBuf, SourceUnit>) -> Self {
        let mut functions = Vec::new();
        let mut offsets = BTreeMap::new();
        let mut name_index: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (path, unit) in units {
            offsets.insert(path.clone(), functions.len());
            for function in &unit.functions {
                name_index
                    .entry(function.name.as_str())
                    .or_default()
                    .push(functions.len());
                functions.push(FunctionKey {
                    file: path.clone(),
                    qualified_name: function.qualified_name.clone(),
                    start_line: function.start_line,
                });
            }
        }

        let mut callees = Vec::with_capacity(functions.len());
        for (path, unit) in units {
            for function in &unit.functions {
                let mut targets = BTreeSet::new();
                for call in &function.calls {
                    let Some(candidates) = name_index.get(call.callee.as_str()) else {
                        log::trace!("Unresolved call to {} in {}", call.callee, path.display());
                        continue;
                    };
                    let local: Vec<usize> = candidates
                        .iter()
                        .copied()
                        .filter(|&idx| functions[idx].file == *path)
                        .collect();
                    if local.is_empty() {
                        targets.extend(candidates.iter().copied());
                    } else {
                        targets.extend(local);
                    }
                }
                callees.push(targets.into_iter().collect());
            }
        }

        Self {
            functions,
            callees,
            offsets,
        }
    }

    /// Graph index of the `function`-th function of `file`'s unit.
    pub fn index_of(&self, file: &std::path::Path, function: usize) -> Option<usize> {
        let idx = self.offsets.get(file)? + function;
        (self.functions.get(idx)?.file == file).then_some(idx)
    }

    /// Shortest call distance from `from` to every function it reaches
    /// within `max_hops` calls. `from` itself appears only when it is
    /// reachable through recursion.
    pub fn reachable_within(&self, from: usize, max_hops: usize) -> BTreeMap<usize, usize> {
        let mut distances = BTreeMap::new();
        let mut queue = VecDeque::new();

        for &callee in &self.callees[from] {
            if distances.insert(callee, 1).is_none() {
                queue.push_back(callee);
            }
        }
        while let Some(current) = queue.pop_front() {
            let hops = distances[&current];
            if hops >= max_hops {
                continue;
            }
            for &callee in &self.callees[current] {
                if !distances.contains_key(&callee) {
                    distances.insert(callee, hops + 1);
                    queue.push_back(callee);
                }
            }
        }
        distances
    }
}

pub struct CallExtractor;

impl CallExtractor {
    /// Markers grouped by the call-graph index of their owning function.
    fn markers_by_function<'a>(
        ctx: &ExtractionContext<'a>,
        graph: &CallGraph,
    ) -> BTreeMap<usize, Vec<&'a DebtMarker>> {
        let mut owned: BTreeMap<usize, Vec<&'a DebtMarker>> = BTreeMap::new();
        for (path, markers) in &ctx.markers_by_file {
            let Some(unit) = ctx.unit(path) else { continue };
            for &marker in markers {
                let owner = unit
                    .owning_function(marker.line, LEADING_COMMENT_SLACK)
                    .and_then(|idx| graph.index_of(path, idx));
                if let Some(owner) = owner {
                    owned.entry(owner).or_default().push(marker);
                }
            }
        }
        owned
    }
}

impl RelationshipExtractor for CallExtractor {
    fn relation(&self) -> RelationType {
        RelationType::Call
    }

    fn extract(&self, ctx: &ExtractionContext<'_>) -> Extraction {
        let graph = CallGraph::build(&ctx.units);
        let owned = Self::markers_by_function(ctx, &graph);
        let mut extraction = Extraction::default();

        for (&caller, sources) in &owned {
            for (callee, hops) in graph.reachable_within(caller, ctx.max_hops) {
                let Some(targets) = owned.get(&callee) else {
                    continue;
                };
                let weight = RelationType::Call.weight_for_hops(hops, ctx.max_hops);
                for source in sources {
                    for target in targets {
                        extraction.push(WeightedEdge::new(
                            source.id.clone(),
                            target.id.clone(),
                            RelationType::Call,
                            weight,
                            hops,
                        ));
                    }
                }
            }
        }

        log::debug!(
            "Call extractor: {} functions, {} edges",
            graph.functions.len(),
            extraction.edges.len()
        );
        extraction
    }
}
