//! Language-neutral view of a parsed source file.
//!
//! Every front-end in [`crate::extraction::parsers`] lowers its own syntax
//! tree into a [`SourceUnit`]: the function boundaries with their outgoing
//! call sites, plus the file's import statements. The relationship
//! extractors only ever see this representation.

use super::types::Language;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub language: Language,
    pub functions: Vec<FunctionSpan>,
    pub imports: Vec<ImportSpec>,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>, language: Language) -> Self {
        Self {
            path: path.into(),
            language,
            functions: Vec::new(),
            imports: Vec::new(),
        }
    }

    /// Innermost function whose body covers `line`.
    pub fn enclosing_function(&self, line: usize) -> Option<usize> {
        self.functions
            .iter()
            .enumerate()
            .filter(|(_, func)| func.contains(line))
            .min_by_key(|(idx, func)| (func.end_line - func.start_line, *idx))
            .map(|(idx, _)| idx)
    }

    /// Function a marker line belongs to: the enclosing one, or else the
    /// first function whose header starts within `slack` lines below it
    /// (a comment written just above the definition).
    pub fn owning_function(&self, line: usize, slack: usize) -> Option<usize> {
        self.enclosing_function(line).or_else(|| {
            self.functions
                .iter()
                .enumerate()
                .filter(|(_, func)| func.start_line > line && func.start_line <= line + slack)
                .min_by_key(|(idx, func)| (func.start_line, *idx))
                .map(|(idx, _)| idx)
        })
    }
}

/// A function or method boundary and its outgoing calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionSpan {
    /// Bare name used for call resolution.
    pub name: String,
    /// Name qualified by its enclosing classes/impls/modules.
    pub qualified_name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub calls: Vec<CallSite>,
}

impl FunctionSpan {
    pub fn new(
        name: impl Into<String>,
        qualified_name: impl Into<String>,
        start_line: usize,
        end_line: usize,
    ) -> Self {
        Self {
            name: name.into(),
            qualified_name: qualified_name.into(),
            start_line,
            end_line: end_line.max(start_line),
            calls: Vec::new(),
        }
    }

    pub fn contains(&self, line: usize) -> bool {
        (self.start_line..=self.end_line).contains(&line)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallSite {
    /// Bare callee name (`obj.method()` records `method`).
    pub callee: String,
    pub line: usize,
}

/// An import statement, tagged by the resolution scheme it needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportSpec {
    /// `import a.b` / `from ..a import b, c`
    Python {
        module: String,
        level: usize,
        names: Vec<String>,
        line: usize,
    },
    /// `import x from './y'`, `require('./y')`, `import('./y')`
    Script { specifier: String, line: usize },
    /// `use crate::a::b::C;` flattened into segments.
    RustUse { segments: Vec<String>, line: usize },
    /// `mod child;`
    RustMod { name: String, line: usize },
    /// `#include "x/y.h"`
    Include { path: String, line: usize },
    /// Dotted or slashed package path: Java/C# `import a.b.C;`, Go `import "a/b"`.
    Qualified { segments: Vec<String>, line: usize },
}

impl ImportSpec {
    pub fn line(&self) -> usize {
        match self {
            ImportSpec::Python { line, .. }
            | ImportSpec::Script { line, .. }
            | ImportSpec::RustUse { line, .. }
            | ImportSpec::RustMod { line, .. }
            | ImportSpec::Include { line, .. }
            | ImportSpec::Qualified { line, .. } => *line,
        }
    }

    /// Human-readable form used in diagnostics.
    pub fn specifier(&self) -> String {
        match self {
            ImportSpec::Python { module, level, .. } => format!("{}{}", ".".repeat(*level), module),
            ImportSpec::Script { specifier, .. } => specifier.clone(),
            ImportSpec::RustUse { segments, .. } => segments.join("::"),
            ImportSpec::RustMod { name, .. } => format!("mod {name}"),
            ImportSpec::Include { path, .. } => path.clone(),
            ImportSpec::Qualified { segments, .. } => segments.join("."),
        }
    }

    /// Whether the import unambiguously points inside the analyzed tree,
    /// so that failing to resolve it is worth reporting.
    pub fn is_local(&self) -> bool {
        match self {
            ImportSpec::Python { level, .. } => *level > 0,
            ImportSpec::Script { specifier, .. } => specifier.starts_with('.'),
            ImportSpec::RustUse { segments, .. } => matches!(
                segments.first().map(String::as_str),
                Some("crate") | Some("super") | Some("self")
            ),
            ImportSpec::RustMod { .. } | ImportSpec::Include { .. } => true,
            ImportSpec::Qualified { .. } => false,
        }
    }
}
