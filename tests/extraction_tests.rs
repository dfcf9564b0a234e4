//! Relationship extraction over small multi-file fixtures.

use indoc::indoc;
use pretty_assertions::assert_eq;
use satdmap::extraction::{extract_relationships, Extraction};
use satdmap::{DebtMarker, Diagnostic, RelationType, SatdConfig, SatdGraph, SourceMap, WeightedEdge};
use std::path::PathBuf;

fn sources(files: &[(&str, &str)]) -> SourceMap {
    files
        .iter()
        .map(|(path, text)| (PathBuf::from(path), text.to_string()))
        .collect()
}

fn edge<'a>(
    extraction: &'a Extraction,
    source: &str,
    target: &str,
    relation: RelationType,
) -> Option<&'a WeightedEdge> {
    extraction
        .edges
        .iter()
        .find(|e| e.source == source && e.target == target && e.relation == relation)
}

#[test]
fn test_python_call_and_relative_import() {
    let files = sources(&[
        (
            "pkg/service.py",
            indoc! {r#"
                from .store import save

                def handle(request):
                    # TODO: validate request before saving
                    return save(request)
            "#},
        ),
        (
            "pkg/store.py",
            indoc! {r#"
                def save(record):
                    # FIXME: no retry on failure
                    return record
            "#},
        ),
    ]);
    let markers = vec![
        DebtMarker::new("svc", "pkg/service.py", 4, "TODO: validate request before saving"),
        DebtMarker::new("store", "pkg/store.py", 2, "FIXME: no retry on failure"),
    ];

    let extraction = extract_relationships(&markers, &files, &SatdConfig::default());

    let call = edge(&extraction, "svc", "store", RelationType::Call).unwrap();
    assert_eq!((call.hops, call.weight), (1, 0.9));
    let module = edge(&extraction, "svc", "store", RelationType::Module).unwrap();
    assert_eq!((module.hops, module.weight), (1, 1.0));
    assert!(edge(&extraction, "store", "svc", RelationType::Call).is_none());
    assert!(extraction.diagnostics.is_empty());
}

#[test]
fn test_python_transitive_imports_decay() {
    let files = sources(&[
        ("app/a.py", "from . import b\n# TODO: a\n"),
        ("app/b.py", "from . import c\n"),
        ("app/c.py", "# TODO: c\n"),
    ]);
    let markers = vec![
        DebtMarker::new("a", "app/a.py", 2, "TODO: a"),
        DebtMarker::new("c", "app/c.py", 1, "TODO: c"),
    ];

    let extraction = extract_relationships(&markers, &files, &SatdConfig::default());

    let module = edge(&extraction, "a", "c", RelationType::Module).unwrap();
    assert_eq!(module.hops, 2);
    assert!((module.weight - 0.95).abs() < 1e-9);
}

#[test]
fn test_javascript_cross_file_call() {
    let files = sources(&[
        (
            "web/app.js",
            indoc! {r#"
                import { helper } from './util';

                function main() {
                  // TODO: validate input
                  return helper();
                }
            "#},
        ),
        (
            "web/util.js",
            indoc! {r#"
                export function helper() {
                  // HACK: magic number
                  return 42;
                }
            "#},
        ),
    ]);
    let markers = vec![
        DebtMarker::new("main", "web/app.js", 4, "TODO: validate input"),
        DebtMarker::new("helper", "web/util.js", 2, "HACK: magic number"),
    ];

    let extraction = extract_relationships(&markers, &files, &SatdConfig::default());

    assert!(edge(&extraction, "main", "helper", RelationType::Call).is_some());
    assert!(edge(&extraction, "main", "helper", RelationType::Module).is_some());
}

#[test]
fn test_rust_use_and_call() {
    let files = sources(&[
        ("src/lib.rs", "mod engine;\nmod store;\n"),
        (
            "src/engine.rs",
            indoc! {r#"
                use crate::store::save;

                pub fn run() {
                    // TODO: batch writes
                    save();
                }
            "#},
        ),
        (
            "src/store.rs",
            indoc! {r#"
                pub fn save() {
                    // FIXME: fsync every write
                }
            "#},
        ),
    ]);
    let markers = vec![
        DebtMarker::new("run", "src/engine.rs", 4, "TODO: batch writes"),
        DebtMarker::new("save", "src/store.rs", 2, "FIXME: fsync every write"),
    ];

    let extraction = extract_relationships(&markers, &files, &SatdConfig::default());

    assert!(edge(&extraction, "run", "save", RelationType::Call).is_some());
    assert!(edge(&extraction, "run", "save", RelationType::Module).is_some());
}

#[test]
fn test_data_dependency_within_file() {
    let files = sources(&[(
        "calc.py",
        indoc! {r#"
            # TODO: make the rate configurable
            rate = 0.2
            base = 10


            total = base * rate
            # FIXME: rounding
        "#},
    )]);
    let markers = vec![
        DebtMarker::new("rate", "calc.py", 1, "TODO: make the rate configurable"),
        DebtMarker::new("total", "calc.py", 7, "FIXME: rounding"),
    ];
    let config = SatdConfig {
        context_window: 1,
        ..SatdConfig::default()
    };

    let extraction = extract_relationships(&markers, &files, &config);

    let data = edge(&extraction, "rate", "total", RelationType::Data).unwrap();
    assert_eq!(data.hops, 1);
    assert_eq!(data.weight, 0.8);
}

#[test]
fn test_unparseable_file_is_skipped() {
    let files = sources(&[
        ("ok.py", "def fine():\n    # TODO: fine\n    return broken()\n"),
        ("bad.py", "def broken(:\n    # TODO: bad\n"),
    ]);
    let markers = vec![
        DebtMarker::new("ok", "ok.py", 2, "TODO: fine"),
        DebtMarker::new("bad", "bad.py", 2, "TODO: bad"),
    ];

    let extraction = extract_relationships(&markers, &files, &SatdConfig::default());

    assert!(extraction.edges.iter().all(|e| e.source != "bad" && e.target != "bad"));
    assert!(matches!(
        extraction.diagnostics.as_slice(),
        [Diagnostic::ParseFailure { file, .. }] if file == &PathBuf::from("bad.py")
    ));
}

#[test]
fn test_unresolved_relative_import_is_reported() {
    let files = sources(&[("pkg/a.py", "from .missing import thing\n# TODO: a\n")]);
    let markers = vec![DebtMarker::new("a", "pkg/a.py", 2, "TODO: a")];

    let extraction = extract_relationships(&markers, &files, &SatdConfig::default());

    assert!(extraction.edges.is_empty());
    assert!(extraction
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::UnresolvedDependency { .. })));
}

fn padded(head: &[&str], gap: usize, tail: &[&str]) -> String {
    let mut lines: Vec<&str> = head.to_vec();
    lines.extend(std::iter::repeat_n("pass", gap));
    lines.extend_from_slice(tail);
    lines.join("\n") + "\n"
}

fn data_edges(extraction: &Extraction) -> Vec<&WeightedEdge> {
    extraction
        .edges
        .iter()
        .filter(|e| e.relation == RelationType::Data)
        .collect()
}

fn narrow_window() -> SatdConfig {
    SatdConfig {
        context_window: 1,
        ..SatdConfig::default()
    }
}

#[test]
fn test_use_before_definition_is_not_a_data_dependency() {
    // line 2 reads v, line 16 assigns it
    let text = padded(&["# TODO: early", "print(v)"], 12, &["# FIXME: late", "v = 3"]);
    let files = sources(&[("order.py", text.as_str())]);
    let markers = vec![
        DebtMarker::new("early", "order.py", 1, "TODO: early"),
        DebtMarker::new("late", "order.py", 15, "FIXME: late"),
    ];

    let extraction = extract_relationships(&markers, &files, &narrow_window());

    assert!(data_edges(&extraction).is_empty());
}

#[test]
fn test_definition_and_use_in_one_window_stay_local() {
    let text = padded(&["# TODO: one", "x = 1", "y = x + 1"], 14, &["# TODO: two", "z = 0"]);
    let files = sources(&[("local.py", text.as_str())]);
    let markers = vec![
        DebtMarker::new("one", "local.py", 1, "TODO: one"),
        DebtMarker::new("two", "local.py", 18, "TODO: two"),
    ];
    let config = SatdConfig {
        context_window: 2,
        ..SatdConfig::default()
    };

    let extraction = extract_relationships(&markers, &files, &config);

    assert!(data_edges(&extraction).is_empty());
}

#[test]
fn test_distant_data_dependency_decays() {
    // rate assigned on line 2, read on line 26
    let text = padded(&["# TODO: tune", "rate = 2"], 23, &["total = rate * 3", "# FIXME: b"]);
    let files = sources(&[("far.py", text.as_str())]);
    let markers = vec![
        DebtMarker::new("a", "far.py", 1, "TODO: tune"),
        DebtMarker::new("b", "far.py", 27, "FIXME: b"),
    ];

    let extraction = extract_relationships(&markers, &files, &narrow_window());

    let edges = data_edges(&extraction);
    assert_eq!(edges.len(), 1);
    assert_eq!((edges[0].source.as_str(), edges[0].target.as_str()), ("a", "b"));
    assert_eq!(edges[0].hops, 3);
    // 24 lines: 14/40 of the way from 0.8 down to 0.7
    assert!((edges[0].weight - 0.765).abs() < 1e-9);
}

#[test]
fn test_recursive_call_is_not_a_relationship() {
    let files = sources(&[(
        "tree.py",
        indoc! {r#"
            def walk(node):
                # TODO: make this iterative
                visit(node)
                return walk(node.next)

            def visit(node):
                # FIXME: skips leaves
                return node
        "#},
    )]);
    let markers = vec![
        DebtMarker::new("walk", "tree.py", 2, "TODO: make this iterative"),
        DebtMarker::new("visit", "tree.py", 7, "FIXME: skips leaves"),
    ];

    let extraction = extract_relationships(&markers, &files, &SatdConfig::default());

    assert!(extraction.edges.iter().all(|e| !e.is_self_loop()));
    assert!(extraction
        .diagnostics
        .contains(&Diagnostic::SelfRelationship { marker: "walk".into() }));
    let graph = SatdGraph::build(&markers, extraction.edges);
    assert_eq!(graph.relationships.len(), 1);
    assert_eq!(graph.relationships[0].source, "walk");
    assert_eq!(graph.relationships[0].target, "visit");
}

#[test]
fn test_indirect_call_weight_interpolates() {
    let files = sources(&[(
        "steps.py",
        indoc! {r#"
            def a():
                # TODO: a
                return b()

            def b():
                return c()

            def c():
                # TODO: c
                return 0
        "#},
    )]);
    let markers = vec![
        DebtMarker::new("a", "steps.py", 2, "TODO: a"),
        DebtMarker::new("c", "steps.py", 9, "TODO: c"),
    ];

    let extraction = extract_relationships(&markers, &files, &SatdConfig::default());

    let call = edge(&extraction, "a", "c", RelationType::Call).unwrap();
    assert_eq!(call.hops, 2);
    assert!((call.weight - 0.85).abs() < 1e-9);
    assert!(edge(&extraction, "c", "a", RelationType::Call).is_none());
}
