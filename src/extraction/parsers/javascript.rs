//! tree-sitter front-end for JavaScript and TypeScript.

use super::{node_end_line, node_line, node_text, unquote, StructureParser};
use crate::core::{CallSite, FunctionSpan, ImportSpec, Language, SourceUnit};
use anyhow::{Context, Result};
use std::path::Path;
use tree_sitter::{Language as TsLanguage, Node, Parser};

pub struct JavaScriptParser;

fn grammar_for(path: &Path) -> (TsLanguage, Language) {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "tsx" => (tree_sitter_typescript::LANGUAGE_TSX.into(), Language::TypeScript),
        "ts" | "mts" | "cts" => (
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::TypeScript,
        ),
        _ => (tree_sitter_javascript::LANGUAGE.into(), Language::JavaScript),
    }
}

impl StructureParser for JavaScriptParser {
    fn parse(&self, path: &Path, content: &str) -> Result<SourceUnit> {
        let (grammar, language) = grammar_for(path);
        let mut parser = Parser::new();
        parser
            .set_language(&grammar)
            .context("Failed to set tree-sitter language")?;

        let tree = parser
            .parse(content, None)
            .context("Failed to parse source code")?;
        let root = tree.root_node();
        if root.has_error() {
            anyhow::bail!("{language} syntax error in {}", path.display());
        }

        let mut walker = ScriptWalker {
            source: content,
            unit: SourceUnit::new(path, language),
            scope: Vec::new(),
            current: None,
        };
        walker.visit(root);
        Ok(walker.unit)
    }
}

fn is_function_value(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function" | "function" | "function_expression" | "generator_function"
    )
}

struct ScriptWalker<'a> {
    source: &'a str,
    unit: SourceUnit,
    scope: Vec<String>,
    current: Option<usize>,
}

impl ScriptWalker<'_> {
    fn visit(&mut self, node: Node) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" | "method_definition" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let name = node_text(&name, self.source).to_string();
                    return self.visit_function(node, name, node);
                }
            }
            "class_declaration" | "abstract_class_declaration" | "class" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let name = node_text(&name, self.source).to_string();
                    self.scope.push(name);
                    self.visit_children(node);
                    self.scope.pop();
                    return;
                }
            }
            "variable_declarator" => {
                let name = node.child_by_field_name("name");
                let value = node.child_by_field_name("value");
                if let (Some(name), Some(value)) = (name, value) {
                    if name.kind() == "identifier" && is_function_value(value.kind()) {
                        let name = node_text(&name, self.source).to_string();
                        return self.visit_function(node, name, value);
                    }
                }
            }
            "call_expression" => self.record_call(node),
            "new_expression" => {
                if let Some(constructor) = node.child_by_field_name("constructor") {
                    if constructor.kind() == "identifier" {
                        self.push_call(node_text(&constructor, self.source), node_line(&node));
                    }
                }
            }
            "import_statement" | "export_statement" => {
                if let Some(source) = node.child_by_field_name("source") {
                    self.push_import(node_text(&source, self.source), node_line(&node));
                }
            }
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

    /// `header` spans the whole definition, `function` is the node holding
    /// the body (they differ for `const f = () => {}`).
    fn visit_function(&mut self, header: Node, name: String, function: Node) {
        let qualified = if self.scope.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", self.scope.join("."), name)
        };

        let idx = self.unit.functions.len();
        self.unit.functions.push(FunctionSpan::new(
            name.clone(),
            qualified,
            node_line(&header),
            node_end_line(&function),
        ));

        let previous = self.current.replace(idx);
        self.scope.push(name);
        if let Some(body) = function.child_by_field_name("body") {
            self.visit(body);
        }
        self.scope.pop();
        self.current = previous;
    }

    fn record_call(&mut self, node: Node) {
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        let line = node_line(&node);

        match function.kind() {
            // dynamic import('./x')
            "import" => {
                if let Some(specifier) = first_string_argument(node, self.source) {
                    self.push_import(specifier, line);
                }
            }
            "identifier" => {
                let name = node_text(&function, self.source);
                if name == "require" {
                    if let Some(specifier) = first_string_argument(node, self.source) {
                        self.push_import(specifier, line);
                    }
                } else {
                    self.push_call(name, line);
                }
            }
            "member_expression" => {
                if let Some(property) = function.child_by_field_name("property") {
                    self.push_call(node_text(&property, self.source), line);
                }
            }
            _ => {}
        }
    }

    fn push_call(&mut self, callee: &str, line: usize) {
        if let Some(idx) = self.current {
            self.unit.functions[idx].calls.push(CallSite {
                callee: callee.to_string(),
                line,
            });
        }
    }

    fn push_import(&mut self, literal: &str, line: usize) {
        self.unit.imports.push(ImportSpec::Script {
            specifier: unquote(literal).to_string(),
            line,
        });
    }
}

fn first_string_argument<'a>(call: Node, source: &'a str) -> Option<&'a str> {
    let args = call.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    let found = args
        .children(&mut cursor)
        .find(|child| child.kind() == "string")
        .map(|child| node_text(&child, source));
    found
}
