use super::StructureParser;
use crate::core::{CallSite, FunctionSpan, ImportSpec, Language, SourceUnit};
use anyhow::Result;
use std::path::Path;
use syn::visit::Visit;

/// `syn` front-end for Rust.
///
/// Line numbers come from `proc-macro2` span locations, so the thread-local
/// span map is reset once the unit has been lowered.
pub struct RustParser;

impl StructureParser for RustParser {
    fn parse(&self, path: &Path, content: &str) -> Result<SourceUnit> {
        let file = match syn::parse_file(content) {
            Ok(file) => file,
            Err(e) => {
                // the error holds spans too; keep only its message
                let message = e.to_string();
                drop(e);
                proc_macro2::extra::invalidate_current_thread_spans();
                anyhow::bail!("Parse error in {}: {}", path.display(), message);
            }
        };

        let mut walker = RustWalker {
            unit: SourceUnit::new(path, Language::Rust),
            scope: Vec::new(),
            current: None,
        };
        walker.visit_file(&file);

        // spans are unusable past this point
        proc_macro2::extra::invalidate_current_thread_spans();
        Ok(walker.unit)
    }
}

struct RustWalker {
    unit: SourceUnit,
    scope: Vec<String>,
    current: Option<usize>,
}

impl RustWalker {
    fn with_function<F>(&mut self, sig: &syn::Signature, block: &syn::Block, walk: F)
    where
        F: FnOnce(&mut Self),
    {
        let name = sig.ident.to_string();
        let qualified = if self.scope.is_empty() {
            name.clone()
        } else {
            format!("{}::{}", self.scope.join("::"), name)
        };
        let start = sig.fn_token.span.start().line;
        let end = block.brace_token.span.close().end().line;

        let idx = self.unit.functions.len();
        self.unit
            .functions
            .push(FunctionSpan::new(name, qualified, start, end));

        let previous = self.current.replace(idx);
        walk(self);
        self.current = previous;
    }

    fn with_scope<F>(&mut self, name: String, walk: F)
    where
        F: FnOnce(&mut Self),
    {
        self.scope.push(name);
        walk(self);
        self.scope.pop();
    }

    fn push_call(&mut self, ident: &syn::Ident) {
        if let Some(idx) = self.current {
            self.unit.functions[idx].calls.push(CallSite {
                callee: ident.to_string(),
                line: ident.span().start().line,
            });
        }
    }
}

fn self_type_name(ty: &syn::Type) -> Option<String> {
    match ty {
        syn::Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string()),
        syn::Type::Reference(reference) => self_type_name(&reference.elem),
        _ => None,
    }
}

/// Flatten a use tree into one segment list per imported leaf.
fn flatten_use_tree(tree: &syn::UseTree, prefix: &mut Vec<String>, out: &mut Vec<Vec<String>>) {
    match tree {
        syn::UseTree::Path(path) => {
            prefix.push(path.ident.to_string());
            flatten_use_tree(&path.tree, prefix, out);
            prefix.pop();
        }
        syn::UseTree::Name(name) if name.ident == "self" => out.push(prefix.clone()),
        syn::UseTree::Name(name) => {
            let mut segments = prefix.clone();
            segments.push(name.ident.to_string());
            out.push(segments);
        }
        syn::UseTree::Rename(rename) => {
            let mut segments = prefix.clone();
            segments.push(rename.ident.to_string());
            out.push(segments);
        }
        syn::UseTree::Glob(_) => out.push(prefix.clone()),
        syn::UseTree::Group(group) => {
            for item in &group.items {
                flatten_use_tree(item, prefix, out);
            }
        }
    }
}

impl<'ast> Visit<'ast> for RustWalker {
    fn visit_item_fn(&mut self, item: &'ast syn::ItemFn) {
        self.with_function(&item.sig, &item.block, |w| {
            syn::visit::visit_item_fn(w, item)
        });
    }

    fn visit_impl_item_fn(&mut self, item: &'ast syn::ImplItemFn) {
        self.with_function(&item.sig, &item.block, |w| {
            syn::visit::visit_impl_item_fn(w, item)
        });
    }

    fn visit_trait_item_fn(&mut self, item: &'ast syn::TraitItemFn) {
        match &item.default {
            Some(block) => self.with_function(&item.sig, block, |w| {
                syn::visit::visit_trait_item_fn(w, item)
            }),
            None => syn::visit::visit_trait_item_fn(self, item),
        }
    }

    fn visit_item_impl(&mut self, item: &'ast syn::ItemImpl) {
        match self_type_name(&item.self_ty) {
            Some(name) => self.with_scope(name, |w| syn::visit::visit_item_impl(w, item)),
            None => syn::visit::visit_item_impl(self, item),
        }
    }

    fn visit_item_trait(&mut self, item: &'ast syn::ItemTrait) {
        self.with_scope(item.ident.to_string(), |w| {
            syn::visit::visit_item_trait(w, item)
        });
    }

    fn visit_item_mod(&mut self, item: &'ast syn::ItemMod) {
        if item.content.is_none() {
            self.unit.imports.push(ImportSpec::RustMod {
                name: item.ident.to_string(),
                line: item.mod_token.span.start().line,
            });
            return;
        }
        self.with_scope(item.ident.to_string(), |w| {
            syn::visit::visit_item_mod(w, item)
        });
    }

    fn visit_item_use(&mut self, item: &'ast syn::ItemUse) {
        let line = item.use_token.span.start().line;
        let mut leaves = Vec::new();
        flatten_use_tree(&item.tree, &mut Vec::new(), &mut leaves);
        for segments in leaves.into_iter().filter(|s| !s.is_empty()) {
            self.unit.imports.push(ImportSpec::RustUse { segments, line });
        }
    }

    fn visit_expr_call(&mut self, expr: &'ast syn::ExprCall) {
        if let syn::Expr::Path(path) = &*expr.func {
            if let Some(segment) = path.path.segments.last() {
                self.push_call(&segment.ident);
            }
        }
        syn::visit::visit_expr_call(self, expr);
    }

    fn visit_expr_method_call(&mut self, expr: &'ast syn::ExprMethodCall) {
        self.push_call(&expr.method);
        syn::visit::visit_expr_method_call(self, expr);
    }
}
