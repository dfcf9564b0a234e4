//! Per-language front-ends that lower source text into a [`SourceUnit`].
//!
//! Python and JavaScript/TypeScript go through tree-sitter grammars, Rust
//! through `syn`. Every other recognized language falls back to the
//! line-scanning [`HeuristicParser`], which is lossy: multi-line signatures
//! and nested scopes are approximated by brace counting.

mod heuristic;
mod javascript;
mod python;
mod rust;

pub use heuristic::HeuristicParser;
pub use javascript::JavaScriptParser;
pub use python::PythonParser;
pub use rust::RustParser;

use crate::core::{Language, SourceUnit};
use anyhow::Result;
use std::path::Path;

/// Function boundaries, call sites and imports for one language.
pub trait StructureParser: Send + Sync {
    fn parse(&self, path: &Path, content: &str) -> Result<SourceUnit>;
}

static PYTHON: PythonParser = PythonParser;
static JAVASCRIPT: JavaScriptParser = JavaScriptParser;
static RUST: RustParser = RustParser;
static HEURISTIC: HeuristicParser = HeuristicParser;

/// Parser for a language, or `None` when the language is not analyzed.
pub fn parser_for(language: Language) -> Option<&'static dyn StructureParser> {
    match language {
        Language::Python => Some(&PYTHON),
        Language::JavaScript | Language::TypeScript => Some(&JAVASCRIPT),
        Language::Rust => Some(&RUST),
        Language::Java | Language::Go | Language::C | Language::Cpp | Language::CSharp => {
            Some(&HEURISTIC)
        }
        Language::Unknown => None,
    }
}

/// Parse a file with the front-end its extension selects.
///
/// Returns `None` for files in unrecognized languages.
pub fn parse_source(path: &Path, content: &str) -> Option<Result<SourceUnit>> {
    let language = Language::from_path(path);
    parser_for(language).map(|parser| parser.parse(path, content))
}

/// 1-based line of a tree-sitter node.
pub(crate) fn node_line(node: &tree_sitter::Node) -> usize {
    node.start_position().row + 1
}

/// 1-based last line of a node; a trailing newline does not count.
pub(crate) fn node_end_line(node: &tree_sitter::Node) -> usize {
    let end = node.end_position();
    if end.column == 0 && end.row > node.start_position().row {
        end.row
    } else {
        end.row + 1
    }
}

pub(crate) fn node_text<'a>(node: &tree_sitter::Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Strip the quotes tree-sitter keeps on string literal nodes.
pub(crate) fn unquote(literal: &str) -> &str {
    literal.trim_matches(|c| c == '"' || c == '\'' || c == '`')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_selection() {
        assert!(parser_for(Language::Python).is_some());
        assert!(parser_for(Language::Go).is_some());
        assert!(parser_for(Language::Unknown).is_none());
        assert!(parse_source(Path::new("notes.txt"), "TODO").is_none());
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'./util'"), "./util");
        assert_eq!(unquote("\"x.h\""), "x.h");
    }
}
