use super::{node_end_line, node_line, node_text, StructureParser};
use crate::core::{CallSite, FunctionSpan, ImportSpec, Language, SourceUnit};
use anyhow::{Context, Result};
use std::path::Path;
use tree_sitter::{Node, Parser};

/// tree-sitter front-end for Python.
pub struct PythonParser;

impl StructureParser for PythonParser {
    fn parse(&self, path: &Path, content: &str) -> Result<SourceUnit> {
        let mut parser = Parser::new();
        let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        parser
            .set_language(&language)
            .context("Failed to set Python language")?;

        let tree = parser
            .parse(content, None)
            .context("Failed to parse Python source")?;
        let root = tree.root_node();
        if root.has_error() {
            anyhow::bail!("Python syntax error in {}", path.display());
        }

        let mut walker = PythonWalker {
            source: content,
            unit: SourceUnit::new(path, Language::Python),
            scope: Vec::new(),
            current: None,
        };
        walker.visit(root);
        Ok(walker.unit)
    }
}

struct PythonWalker<'a> {
    source: &'a str,
    unit: SourceUnit,
    /// Enclosing class and function names.
    scope: Vec<String>,
    /// Index of the innermost function being walked.
    current: Option<usize>,
}

impl PythonWalker<'_> {
    fn visit(&mut self, node: Node) {
        match node.kind() {
            "function_definition" => return self.visit_function(node),
            "class_definition" => return self.visit_class(node),
            "call" => self.record_call(node),
            "import_statement" => self.record_import(node),
            "import_from_statement" => self.record_from_import(node),
            _ => {}
        }
        self.visit_children(node);
    }

    fn visit_children(&mut self, node: Node) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    fn visit_function(&mut self, node: Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return self.visit_children(node);
        };
        let name = node_text(&name_node, self.source).to_string();
        let qualified = qualify(&self.scope, &name);

        let idx = self.unit.functions.len();
        self.unit.functions.push(FunctionSpan::new(
            name.clone(),
            qualified,
            node_line(&node),
            node_end_line(&node),
        ));

        let previous = self.current.replace(idx);
        self.scope.push(name);
        if let Some(body) = node.child_by_field_name("body") {
            self.visit(body);
        }
        self.scope.pop();
        self.current = previous;
    }

    fn visit_class(&mut self, node: Node) {
        let name = node
            .child_by_field_name("name")
            .map(|n| node_text(&n, self.source).to_string());
        let Some(name) = name else {
            return self.visit_children(node);
        };

        self.scope.push(name);
        if let Some(body) = node.child_by_field_name("body") {
            self.visit(body);
        }
        self.scope.pop();
    }

    fn record_call(&mut self, node: Node) {
        let Some(idx) = self.current else { return };
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };

        let callee = match function.kind() {
            "identifier" => Some(function),
            "attribute" => function.child_by_field_name("attribute"),
            _ => None,
        };
        if let Some(callee) = callee {
            let callee = node_text(&callee, self.source).to_string();
            self.unit.functions[idx].calls.push(CallSite {
                callee,
                line: node_line(&node),
            });
        }
    }

    /// `import a.b, c as d`
    fn record_import(&mut self, node: Node) {
        let line = node_line(&node);
        let mut cursor = node.walk();
        let modules: Vec<String> = node
            .children_by_field_name("name", &mut cursor)
            .map(|name| imported_name(name, self.source))
            .collect();

        for module in modules {
            self.unit.imports.push(ImportSpec::Python {
                module,
                level: 0,
                names: Vec::new(),
                line,
            });
        }
    }

    /// `from ..pkg.mod import a, b as c`
    fn record_from_import(&mut self, node: Node) {
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return;
        };

        let (module, level) = if module_node.kind() == "relative_import" {
            let mut module = String::new();
            let mut level = 0;
            let mut cursor = module_node.walk();
            for child in module_node.children(&mut cursor) {
                match child.kind() {
                    "import_prefix" => {
                        level = node_text(&child, self.source)
                            .chars()
                            .filter(|c| *c == '.')
                            .count()
                    }
                    "dotted_name" => module = node_text(&child, self.source).to_string(),
                    _ => {}
                }
            }
            (module, level)
        } else {
            (node_text(&module_node, self.source).to_string(), 0)
        };

        let mut cursor = node.walk();
        let names = node
            .children_by_field_name("name", &mut cursor)
            .map(|name| imported_name(name, self.source))
            .collect();

        self.unit.imports.push(ImportSpec::Python {
            module,
            level,
            names,
            line: node_line(&node),
        });
    }
}

fn imported_name(node: Node, source: &str) -> String {
    let target = if node.kind() == "aliased_import" {
        node.child_by_field_name("name").unwrap_or(node)
    } else {
        node
    };
    node_text(&target, source).to_string()
}

fn qualify(scope: &[String], name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope.join("."), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(source: &str) -> SourceUnit {
        PythonParser.parse(Path::new("pkg/app.py"), source).unwrap()
    }

    #[test]
    fn test_functions_and_methods_are_qualified() {
        let unit = parse(indoc! {r#"
            class Cache:
                def get(self, key):
                    return self.lookup(key)

                def lookup(self, key):
                    return None

            def main():
                cache = Cache()
                cache.get("x")
        "#});

        let names: Vec<_> = unit
            .functions
            .iter()
            .map(|f| f.qualified_name.as_str())
            .collect();
        assert_eq!(names, vec!["Cache.get", "Cache.lookup", "main"]);

        let get = &unit.functions[0];
        assert_eq!((get.start_line, get.end_line), (2, 3));
        assert_eq!(get.calls[0].callee, "lookup");

        let main_calls: Vec<_> = unit.functions[2]
            .calls
            .iter()
            .map(|c| c.callee.as_str())
            .collect();
        assert_eq!(main_calls, vec!["Cache", "get"]);
    }

    #[test]
    fn test_nested_function_owns_its_calls() {
        let unit = parse(indoc! {r#"
            def outer():
                def inner():
                    helper()
                inner()
        "#});

        assert_eq!(unit.functions[0].calls.len(), 1);
        assert_eq!(unit.functions[0].calls[0].callee, "inner");
        assert_eq!(unit.functions[1].qualified_name, "outer.inner");
        assert_eq!(unit.functions[1].calls[0].callee, "helper");
    }

    #[test]
    fn test_imports() {
        let unit = parse(indoc! {r#"
            import os, pkg.util as u
            from . import models
            from ..core.db import connect, Session as S
            from typing import *
        "#});

        assert_eq!(
            unit.imports,
            vec![
                ImportSpec::Python {
                    module: "os".into(),
                    level: 0,
                    names: vec![],
                    line: 1
                },
                ImportSpec::Python {
                    module: "pkg.util".into(),
                    level: 0,
                    names: vec![],
                    line: 1
                },
                ImportSpec::Python {
                    module: String::new(),
                    level: 1,
                    names: vec!["models".into()],
                    line: 2
                },
                ImportSpec::Python {
                    module: "core.db".into(),
                    level: 2,
                    names: vec!["connect".into(), "Session".into()],
                    line: 3
                },
                ImportSpec::Python {
                    module: "typing".into(),
                    level: 0,
                    names: vec![],
                    line: 4
                },
            ]
        );
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let result = PythonParser.parse(Path::new("bad.py"), "def broken(:\n    pass\n");
        assert!(result.is_err());
    }
}
