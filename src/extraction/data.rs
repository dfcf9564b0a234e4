//! Data relationships: a name assigned near marker A is read later near
//! marker B in the same file.
//!
//! Each marker covers a context window of `context_window` lines on either
//! side. Definitions are assignment targets; uses are identifiers and
//! dotted access chains (`self.cache.get` counts as a use of `self`,
//! `self.cache` and `self.cache.get`). On an assignment line only the
//! right-hand side is scanned for uses.

use super::lexical::code_portion;
use super::{Extraction, ExtractionContext, RelationshipExtractor};
use crate::core::{DebtMarker, Language};
use crate::graph::{RelationType, WeightedEdge};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;
use std::path::Path;

/// Definition-to-use distance that still earns the full weight.
pub const NEAR_DISTANCE: usize = 10;
/// Distance at which the weight has decayed to the type default.
pub const FAR_DISTANCE: usize = 50;
pub const LINES_PER_HOP: usize = 10;

static IDENT_CHAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*").unwrap());
static TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*$").unwrap());
static INDEXING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").unwrap());

static DECLARATION_KEYWORDS: &[&str] = &[
    "let", "mut", "const", "var", "val", "final", "static", "auto", "global", "nonlocal",
];

/// Weight of a data edge spanning `distance` lines.
pub fn data_weight(distance: usize) -> f64 {
    let range = RelationType::Data.weight_range();
    if distance <= NEAR_DISTANCE {
        range.max
    } else if distance <= FAR_DISTANCE {
        let progress = (distance - NEAR_DISTANCE) as f64 / (FAR_DISTANCE - NEAR_DISTANCE) as f64;
        range.max - (range.max - range.default) * progress
    } else {
        range.min
    }
}

/// Hop count for a data edge: one hop per started block of ten lines.
pub fn data_hops(distance: usize, max_hops: usize) -> usize {
    distance.div_ceil(LINES_PER_HOP).clamp(1, max_hops.max(1))
}

/// Byte offset of the first plain assignment operator (`=`, `+=`, `:=`,
/// ...), ignoring comparisons and arrows.
fn assignment_operator(code: &str) -> Option<usize> {
    let bytes = code.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'=' {
            i += 1;
            continue;
        }
        let next = bytes.get(i + 1).copied();
        if matches!(next, Some(b'=') | Some(b'>')) {
            i += 2;
            continue;
        }
        let prev = if i > 0 { Some(bytes[i - 1]) } else { None };
        let prev2 = if i > 1 { Some(bytes[i - 2]) } else { None };
        let comparison = match prev {
            Some(b'=') | Some(b'!') => true,
            // `<<=` and `>>=` assign, `<=` and `>=` compare
            Some(c @ (b'<' | b'>')) => prev2 != Some(c),
            _ => false,
        };
        if !comparison {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Position of a type-annotation colon (`x: int`), skipping `::` paths.
fn annotation_colon(part: &str) -> Option<usize> {
    let bytes = part.as_bytes();
    (0..bytes.len()).find(|&i| {
        bytes[i] == b':'
            && bytes.get(i + 1) != Some(&b':')
            && (i == 0 || bytes[i - 1] != b':')
    })
}

fn assignment_targets(lhs: &str) -> Vec<String> {
    let lhs = lhs.trim_end().trim_end_matches(|c: char| "+-*/%&|^<>:!~?@".contains(c));
    if lhs.contains('(') {
        return Vec::new();
    }

    lhs.split(',')
        .filter_map(|part| {
            let part = match annotation_colon(part) {
                Some(idx) => &part[..idx],
                None => part,
            };
            let part = INDEXING.replace_all(part, "");
            let last = part.split_whitespace().last()?;
            let name = last.trim_start_matches(['*', '&']);
            let valid = TARGET.is_match(name) && !DECLARATION_KEYWORDS.contains(&name);
            valid.then(|| name.to_string())
        })
        .collect()
}

/// Every identifier chain in `code` together with its dotted prefixes.
fn used_names(code: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for found in IDENT_CHAIN.find_iter(code) {
        // `call().field` reads a member of a temporary, not a variable
        if found.start() > 0 && code.as_bytes()[found.start() - 1] == b'.' {
            continue;
        }
        let chain = found.as_str();
        for (idx, ch) in chain.char_indices() {
            if ch == '.' {
                names.insert(chain[..idx].to_string());
            }
        }
        names.insert(chain.to_string());
    }
    names
}

/// Definitions and uses on a single (already lexically cleaned) line.
pub fn scan_line(code: &str) -> (Vec<String>, BTreeSet<String>) {
    match assignment_operator(code) {
        Some(op) => (assignment_targets(&code[..op]), used_names(&code[op + 1..])),
        None => (Vec::new(), used_names(code)),
    }
}

pub struct DataExtractor;

impl DataExtractor {
    fn extract_file(
        path: &Path,
        markers: &[&DebtMarker],
        text: &str,
        ctx: &ExtractionContext<'_>,
        extraction: &mut Extraction,
    ) {
        let language = Language::from_path(path);
        let lines: Vec<&str> = text.lines().collect();
        let windows: Vec<RangeInclusive<usize>> = markers
            .iter()
            .map(|m| {
                let start = m.line.saturating_sub(ctx.context_window).max(1);
                let end = (m.line + ctx.context_window).min(lines.len());
                start..=end
            })
            .collect();

        let covered: BTreeSet<usize> = windows.iter().flat_map(|w| w.clone()).collect();
        let mut definitions: Vec<(usize, String)> = Vec::new();
        let mut uses: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for line_no in covered {
            let code = code_portion(lines[line_no - 1], language);
            let (defs, used) = scan_line(&code);
            definitions.extend(defs.into_iter().map(|name| (line_no, name)));
            for name in used {
                uses.entry(name).or_default().push(line_no);
            }
        }

        let mut closest: BTreeMap<(usize, usize), usize> = BTreeMap::new();
        for (a, window_a) in windows.iter().enumerate() {
            for (def_line, name) in definitions.iter().filter(|(l, _)| window_a.contains(l)) {
                let Some(use_lines) = uses.get(name) else {
                    continue;
                };
                for &use_line in use_lines.iter().filter(|&&l| l > *def_line) {
                    let distance = use_line - def_line;
                    for (b, window_b) in windows.iter().enumerate() {
                        if a == b || !window_b.contains(&use_line) {
                            continue;
                        }
                        closest
                            .entry((a, b))
                            .and_modify(|d| *d = (*d).min(distance))
                            .or_insert(distance);
                    }
                }
            }
        }

        for ((a, b), distance) in closest {
            extraction.push(WeightedEdge::new(
                markers[a].id.clone(),
                markers[b].id.clone(),
                RelationType::Data,
                data_weight(distance),
                data_hops(distance, ctx.max_hops),
            ));
        }
    }
}

impl RelationshipExtractor for DataExtractor {
    fn relation(&self) -> RelationType {
        RelationType::Data
    }

    fn extract(&self, ctx: &ExtractionContext<'_>) -> Extraction {
        let mut extraction = Extraction::default();
        for (path, markers) in &ctx.markers_by_file {
            if markers.len() < 2 {
                continue;
            }
            match ctx.sources.get(path) {
                Some(text) => Self::extract_file(path, markers, text, ctx, &mut extraction),
                None => log::debug!("No source text for {}", path.display()),
            }
        }
        extraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_data_weight_bands() {
        assert_eq!(data_weight(3), 0.8);
        assert_eq!(data_weight(10), 0.8);
        assert!((data_weight(30) - 0.75).abs() < 1e-9);
        assert!((data_weight(50) - 0.7).abs() < 1e-9);
        assert_eq!(data_weight(51), 0.6);
    }

    #[test]
    fn test_data_hops() {
        assert_eq!(data_hops(1, 5), 1);
        assert_eq!(data_hops(10, 5), 1);
        assert_eq!(data_hops(11, 5), 2);
        assert_eq!(data_hops(200, 5), 5);
    }

    #[test]
    fn test_scan_line_assignments() {
        let (defs, uses) = scan_line("total = price * qty");
        assert_eq!(defs, vec!["total"]);
        assert!(uses.contains("price") && uses.contains("qty") && !uses.contains("total"));

        let (defs, _) = scan_line("let mut count: usize = 0;");
        assert_eq!(defs, vec!["count"]);

        let (defs, _) = scan_line("self.cache[key] += 1");
        assert_eq!(defs, vec!["self.cache"]);

        let (defs, _) = scan_line("a, b := split(x)");
        assert_eq!(defs, vec!["a", "b"]);
    }

    #[test]
    fn test_scan_line_ignores_comparisons() {
        let (defs, uses) = scan_line("if limit == self.max.value:");
        assert!(defs.is_empty());
        assert!(uses.contains("self.max"));
        assert!(uses.contains("self.max.value"));

        assert!(scan_line("x >= y").0.is_empty());
        assert!(scan_line("f(a=1)").0.is_empty());
        assert_eq!(scan_line("mask <<= 2").0, vec!["mask"]);
    }
}
