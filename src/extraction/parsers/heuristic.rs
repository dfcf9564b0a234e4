//! Line-scanning front-end for languages without a bundled grammar
//! (C, C++, C#, Java, Go).
//!
//! Function headers are matched one line at a time and bodies are delimited
//! by brace counting. Multi-line signatures whose name and opening paren sit
//! on different lines are missed, and class scopes are not tracked, so
//! qualified names are just the bare names.

use super::StructureParser;
use crate::core::{CallSite, FunctionSpan, ImportSpec, Language, SourceUnit};
use crate::extraction::lexical::code_portion;
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static GO_FUNC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*func\s+(?:\([^)]*\)\s*)?([A-Za-z_]\w*)\s*[\[(]").unwrap());
static C_FAMILY_FUNC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*((?:[\w:<>,\[\]\*&~]+\s+)+)[\*&]*([A-Za-z_~][\w:~]*)\s*\([^;]*$").unwrap()
});
static CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Za-z_]\w*)\s*\(").unwrap());

static INCLUDE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^\s*#\s*include\s*"([^"]+)""#).unwrap());
static JAVA_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*import\s+(?:static\s+)?([\w.]+?)(?:\.\*)?\s*;").unwrap());
static CSHARP_USING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*using\s+(?:static\s+)?([\w.]+)\s*;").unwrap());
static GO_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*(?:import\s+)?(?:[\w.]+\s+)?"([^"]+)""#).unwrap());

static KEYWORDS: &[&str] = &[
    "if", "else", "for", "foreach", "while", "do", "switch", "case", "return", "catch", "throw",
    "new", "delete", "sizeof", "typeof", "using", "lock", "defer", "go", "select", "func",
];

/// How many lines past a header the opening brace may appear.
const MAX_BRACE_LOOKAHEAD: usize = 3;

pub struct HeuristicParser;

impl StructureParser for HeuristicParser {
    fn parse(&self, path: &Path, content: &str) -> Result<SourceUnit> {
        let language = Language::from_path(path);
        let lines: Vec<String> = content
            .lines()
            .map(|line| code_portion(line, language))
            .collect();

        let mut unit = SourceUnit::new(path, language);
        unit.imports = scan_imports(content, language);
        unit.functions = scan_functions(&lines, language);
        attach_calls(&mut unit, &lines);
        Ok(unit)
    }
}

fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Bare function name from a header line, if the line looks like one.
fn header_name(line: &str, language: Language) -> Option<String> {
    if language == Language::Go {
        return GO_FUNC.captures(line).map(|caps| caps[1].to_string());
    }

    let caps = C_FAMILY_FUNC.captures(line)?;
    let leading = caps[1].split_whitespace().next().unwrap_or("");
    let name = &caps[2];
    if is_keyword(leading) || is_keyword(name) {
        return None;
    }
    Some(name.to_string())
}

/// Line (0-based) where the brace opened at or after `start` closes again.
fn body_end(lines: &[String], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut opened = false;

    for (offset, line) in lines.iter().enumerate().skip(start) {
        if !opened && offset > start + MAX_BRACE_LOOKAHEAD {
            return None;
        }
        for ch in line.chars() {
            match ch {
                ';' if !opened => return None,
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' if opened => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(offset);
                    }
                }
                _ => {}
            }
        }
    }
    None
}

fn scan_functions(lines: &[String], language: Language) -> Vec<FunctionSpan> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| {
            let name = header_name(line, language)?;
            let end = body_end(lines, idx)?;
            let bare = name.rsplit("::").next().unwrap_or(&name).to_string();
            Some(FunctionSpan::new(bare, name, idx + 1, end + 1))
        })
        .collect()
}

fn attach_calls(unit: &mut SourceUnit, lines: &[String]) {
    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let Some(owner) = unit.enclosing_function(line_no) else {
            continue;
        };
        for caps in CALL.captures_iter(line) {
            let callee = &caps[1];
            let function = &unit.functions[owner];
            let is_own_header = function.start_line == line_no && function.name == callee;
            if is_keyword(callee) || is_own_header {
                continue;
            }
            unit.functions[owner].calls.push(CallSite {
                callee: callee.to_string(),
                line: line_no,
            });
        }
    }
}

fn scan_imports(content: &str, language: Language) -> Vec<ImportSpec> {
    let mut imports = Vec::new();
    let mut in_go_block = false;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        match language {
            Language::C | Language::Cpp => {
                if let Some(caps) = INCLUDE.captures(line) {
                    imports.push(ImportSpec::Include {
                        path: caps[1].to_string(),
                        line: line_no,
                    });
                }
            }
            Language::Java | Language::CSharp => {
                let pattern = if language == Language::Java {
                    &*JAVA_IMPORT
                } else {
                    &*CSHARP_USING
                };
                if let Some(caps) = pattern.captures(line) {
                    imports.push(ImportSpec::Qualified {
                        segments: caps[1].split('.').map(str::to_string).collect(),
                        line: line_no,
                    });
                }
            }
            Language::Go => {
                let trimmed = line.trim();
                if trimmed.starts_with("import (") {
                    in_go_block = true;
                    continue;
                }
                if in_go_block && trimmed.starts_with(')') {
                    in_go_block = false;
                    continue;
                }
                if !(in_go_block || trimmed.starts_with("import ")) {
                    continue;
                }
                if let Some(caps) = GO_IMPORT.captures(line) {
                    imports.push(ImportSpec::Qualified {
                        segments: caps[1].split('/').map(str::to_string).collect(),
                        line: line_no,
                    });
                }
            }
            _ => {}
        }
    }
    imports
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_java_methods_and_imports() {
        let source = indoc! {r#"
            import com.acme.store.Repository;
            import java.util.*;

            public class Service {
                // TODO: cache lookups
                public User find(String id) {
                    if (id == null) {
                        return null;
                    }
                    return repository.load(id);
                }

                private void audit() {
                    find("root");
                }
            }
        "#};
        let unit = HeuristicParser
            .parse(Path::new("src/Service.java"), source)
            .unwrap();

        let names: Vec<_> = unit.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["find", "audit"]);
        assert_eq!((unit.functions[0].start_line, unit.functions[0].end_line), (6, 11));
        assert_eq!(unit.functions[0].calls[0].callee, "load");
        assert_eq!(unit.functions[1].calls[0].callee, "find");
        assert_eq!(unit.imports[0].specifier(), "com.acme.store.Repository");
        assert_eq!(unit.imports[1].specifier(), "java.util");
    }

    #[test]
    fn test_go_functions_and_import_block() {
        let source = indoc! {r#"
            package main

            import (
                "fmt"
                store "example.com/app/store"
            )

            func (s *Server) Handle() {
                s.load()
            }

            func load() {
                fmt.Println("loading")
            }
        "#};
        let unit = HeuristicParser.parse(Path::new("main.go"), source).unwrap();

        let names: Vec<_> = unit.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Handle", "load"]);
        assert_eq!(unit.functions[0].calls[0].callee, "load");
        assert_eq!(unit.imports.len(), 2);
        assert_eq!(unit.imports[1].specifier(), "example.com.app.store");
    }

    #[test]
    fn test_c_prototypes_are_not_functions() {
        let source = indoc! {r#"
            #include "util/buffer.h"
            #include <stdio.h>

            int parse(const char *input);

            static int parse(const char *input) {
                return buffer_len(input);
            }
        "#};
        let unit = HeuristicParser.parse(Path::new("src/parse.c"), source).unwrap();

        assert_eq!(unit.functions.len(), 1);
        assert_eq!(unit.functions[0].start_line, 6);
        assert_eq!(unit.functions[0].calls[0].callee, "buffer_len");
        assert_eq!(
            unit.imports,
            vec![ImportSpec::Include {
                path: "util/buffer.h".into(),
                line: 1
            }]
        );
    }
}
