//! Module relationships: marker A's file imports marker B's file, directly
//! or through a chain of at most `max_hops` imports.

use super::{Extraction, ExtractionContext, RelationshipExtractor};
use crate::core::paths::{escapes_root, key_ends_with, normalize_path, parent_dir, stem_key};
use crate::core::{ImportSpec, SourceUnit};
use crate::errors::Diagnostic;
use crate::graph::{RelationType, WeightedEdge};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Component, Path, PathBuf};

/// Files that may serve as the entry point of a Rust module directory.
const RUST_ROOTS: &[&str] = &["lib.rs", "main.rs", "mod.rs"];

/// Maps import statements onto the analyzed file set.
pub struct ModuleResolver {
    files: BTreeSet<PathBuf>,
    /// Extension-less key (`pkg/util`) to the files carrying it.
    by_stem: BTreeMap<String, Vec<PathBuf>>,
}

/// `dir` plus extra segments as a `/`-joined key.
fn join_key(dir: &Path, rest: &[&str]) -> String {
    dir.components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .chain(rest.iter().copied())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn path_key(path: &Path) -> String {
    join_key(path, &[])
}

impl ModuleResolver {
    pub fn new<'a>(files: impl IntoIterator<Item = &'a PathBuf>) -> Self {
        let files: BTreeSet<PathBuf> = files.into_iter().map(|p| normalize_path(p)).collect();
        let mut by_stem: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for file in &files {
            by_stem.entry(stem_key(file)).or_default().push(file.clone());
        }
        Self { files, by_stem }
    }

    /// Files the import points at; empty when it cannot be resolved.
    pub fn resolve(&self, from: &Path, import: &ImportSpec) -> Vec<PathBuf> {
        let mut targets: Vec<PathBuf> = match import {
            ImportSpec::Python {
                module,
                level,
                names,
                ..
            } => self.resolve_python(from, module, *level, names),
            ImportSpec::Script { specifier, .. } => self.resolve_script(from, specifier),
            ImportSpec::RustUse { segments, .. } => self.resolve_rust_use(from, segments),
            ImportSpec::RustMod { name, .. } => self.resolve_rust_mod(from, name),
            ImportSpec::Include { path, .. } => self.resolve_include(from, path),
            ImportSpec::Qualified { segments, .. } => self.resolve_qualified(segments),
        };
        targets.sort();
        targets.dedup();
        targets
    }

    fn exact(&self, key: &str) -> Vec<PathBuf> {
        self.by_stem.get(key).cloned().unwrap_or_default()
    }

    fn first_exact(&self, keys: &[String]) -> Option<PathBuf> {
        keys.iter()
            .find_map(|key| self.by_stem.get(key).and_then(|files| files.first()))
            .cloned()
    }

    fn suffix(&self, suffix: &str) -> Vec<PathBuf> {
        self.by_stem
            .iter()
            .filter(|(key, _)| key_ends_with(key, suffix))
            .flat_map(|(_, files)| files.iter().cloned())
            .collect()
    }

    /// Python module file or package `__init__` for a key.
    fn python_module(&self, key: &str, relative: bool) -> Vec<PathBuf> {
        let keys = [key.to_string(), format!("{key}/__init__")];
        if relative {
            keys.iter().flat_map(|k| self.exact(k)).collect()
        } else {
            keys.iter().flat_map(|k| self.suffix(k)).collect()
        }
    }

    fn resolve_python(&self, from: &Path, module: &str, level: usize, names: &[String]) -> Vec<PathBuf> {
        let parts: Vec<&str> = module.split('.').filter(|p| !p.is_empty()).collect();
        let relative = level > 0;
        let module_key = if relative {
            let mut base = parent_dir(from).to_path_buf();
            for _ in 1..level {
                // `from ... import x` above the top-level package
                if base.as_os_str().is_empty() {
                    return Vec::new();
                }
                base = parent_dir(&base).to_path_buf();
            }
            join_key(&base, &parts)
        } else {
            parts.join("/")
        };

        let mut targets = Vec::new();
        for name in names {
            let submodule = if module_key.is_empty() {
                name.clone()
            } else {
                format!("{module_key}/{name}")
            };
            targets.extend(self.python_module(&submodule, relative));
        }
        if !module_key.is_empty() || relative {
            targets.extend(self.python_module(&module_key, relative));
        }
        targets
    }

    fn resolve_script(&self, from: &Path, specifier: &str) -> Vec<PathBuf> {
        if !specifier.starts_with('.') {
            return Vec::new();
        }
        let target = normalize_path(&parent_dir(from).join(specifier));
        if escapes_root(&target) {
            return Vec::new();
        }
        if self.files.contains(&target) {
            return vec![target];
        }

        let key = path_key(&target);
        let mut candidates = vec![key.clone(), format!("{key}/index")];
        // `./util.js` written against a `util.ts` source
        let stem = stem_key(&target);
        if stem != key {
            candidates.push(stem);
        }
        self.first_exact(&candidates).into_iter().collect()
    }

    /// Directory holding the child modules of the module defined by `file`.
    fn rust_children_dir(file: &Path) -> PathBuf {
        let dir = parent_dir(file).to_path_buf();
        match file.file_name().and_then(|n| n.to_str()) {
            Some(name) if RUST_ROOTS.contains(&name) => dir,
            _ => match file.file_stem() {
                Some(stem) => dir.join(stem),
                None => dir,
            },
        }
    }

    /// Nearest ancestor directory holding a crate root.
    fn rust_crate_root(&self, from: &Path) -> PathBuf {
        let mut dir = parent_dir(from).to_path_buf();
        loop {
            let has_root = ["lib.rs", "main.rs"]
                .iter()
                .any(|root| self.files.contains(&dir.join(root)));
            if has_root {
                return dir;
            }
            if dir.as_os_str().is_empty() {
                return parent_dir(from).to_path_buf();
            }
            dir = parent_dir(&dir).to_path_buf();
        }
    }

    /// File defining the module whose children live in `dir`.
    fn rust_module_file(&self, dir: &Path) -> Option<PathBuf> {
        let mut keys: Vec<String> = RUST_ROOTS
            .iter()
            .map(|root| join_key(dir, &[root.trim_end_matches(".rs")]))
            .collect();
        keys.push(path_key(dir));
        self.first_exact(&keys)
            .filter(|file| file.extension().is_some_and(|ext| ext == "rs"))
    }

    fn resolve_rust_use(&self, from: &Path, segments: &[String]) -> Vec<PathBuf> {
        let mut rest: Vec<&str> = segments.iter().map(String::as_str).collect();
        let dir = match rest.first().copied() {
            Some("crate") => {
                rest.remove(0);
                self.rust_crate_root(from)
            }
            Some("self") => {
                rest.remove(0);
                Self::rust_children_dir(from)
            }
            Some("super") => {
                let mut dir = Self::rust_children_dir(from);
                while rest.first() == Some(&"super") {
                    rest.remove(0);
                    dir = parent_dir(&dir).to_path_buf();
                }
                dir
            }
            // 2018-style path relative to the current module
            _ => Self::rust_children_dir(from),
        };

        // longest module prefix that names a file
        for len in (1..=rest.len()).rev() {
            let key = join_key(&dir, &rest[..len]);
            let found = self.first_exact(&[key.clone(), format!("{key}/mod")]);
            if let Some(file) = found.filter(|f| f.extension().is_some_and(|e| e == "rs")) {
                return vec![file];
            }
        }
        self.rust_module_file(&dir)
            .filter(|file| file != from)
            .into_iter()
            .collect()
    }

    fn resolve_rust_mod(&self, from: &Path, name: &str) -> Vec<PathBuf> {
        let key = join_key(&Self::rust_children_dir(from), &[name]);
        self.first_exact(&[key.clone(), format!("{key}/mod")])
            .into_iter()
            .collect()
    }

    fn resolve_include(&self, from: &Path, include: &str) -> Vec<PathBuf> {
        let relative = normalize_path(&parent_dir(from).join(include));
        if self.files.contains(&relative) {
            return vec![relative];
        }
        // a parent-relative include names one location, not a search path
        if escapes_root(&relative) || include.contains("..") {
            return Vec::new();
        }
        let wanted = path_key(Path::new(include));
        self.files
            .iter()
            .filter(|file| key_ends_with(&path_key(file), &wanted))
            .cloned()
            .collect()
    }

    /// Java/C# type paths match a file stem; Go package paths match a
    /// directory.
    fn resolve_qualified(&self, segments: &[String]) -> Vec<PathBuf> {
        let wanted = segments.join("/");
        let by_file = self.suffix(&wanted);
        if !by_file.is_empty() {
            return by_file;
        }
        self.files
            .iter()
            .filter(|file| key_ends_with(&path_key(parent_dir(file)), &wanted))
            .cloned()
            .collect()
    }
}

/// File-level import adjacency, without self-imports.
pub fn file_dependencies(
    units: &BTreeMap<PathBuf, SourceUnit>,
    resolver: &ModuleResolver,
) -> (BTreeMap<PathBuf, BTreeSet<PathBuf>>, Vec<Diagnostic>) {
    let mut adjacency: BTreeMap<PathBuf, BTreeSet<PathBuf>> = BTreeMap::new();
    let mut diagnostics = Vec::new();

    for (path, unit) in units {
        let deps = adjacency.entry(path.clone()).or_default();
        for import in &unit.imports {
            let targets = resolver.resolve(path, import);
            if targets.is_empty() {
                if import.is_local() {
                    log::debug!(
                        "Unresolved import '{}' in {}",
                        import.specifier(),
                        path.display()
                    );
                    diagnostics.push(Diagnostic::UnresolvedDependency {
                        file: path.clone(),
                        specifier: import.specifier(),
                    });
                }
                continue;
            }
            deps.extend(targets.into_iter().filter(|target| target != path));
        }
    }
    (adjacency, diagnostics)
}

/// Breadth-first distances from `start` over the file adjacency, bounded by
/// `max_hops`. `start` itself is never included.
pub fn reachable_files(
    adjacency: &BTreeMap<PathBuf, BTreeSet<PathBuf>>,
    start: &Path,
    max_hops: usize,
) -> BTreeMap<PathBuf, usize> {
    let mut distances: BTreeMap<PathBuf, usize> = BTreeMap::new();
    let mut queue = VecDeque::from([(start.to_path_buf(), 0usize)]);

    while let Some((file, hops)) = queue.pop_front() {
        if hops >= max_hops {
            continue;
        }
        let Some(deps) = adjacency.get(&file) else {
            continue;
        };
        for dep in deps {
            if dep.as_path() == start || distances.contains_key(dep) {
                continue;
            }
            distances.insert(dep.clone(), hops + 1);
            queue.push_back((dep.clone(), hops + 1));
        }
    }
    distances
}

pub struct ModuleExtractor;

impl RelationshipExtractor for ModuleExtractor {
    fn relation(&self) -> RelationType {
        RelationType::Module
    }

    fn extract(&self, ctx: &ExtractionContext<'_>) -> Extraction {
        let resolver = ModuleResolver::new(ctx.sources.keys());
        let (adjacency, diagnostics) = file_dependencies(&ctx.units, &resolver);
        let mut extraction = Extraction {
            edges: Vec::new(),
            diagnostics,
        };

        for (file, sources) in &ctx.markers_by_file {
            for (target_file, hops) in reachable_files(&adjacency, file, ctx.max_hops) {
                let Some(targets) = ctx.markers_by_file.get(&target_file) else {
                    continue;
                };
                let weight = RelationType::Module.weight_for_hops(hops, ctx.max_hops);
                for source in sources {
                    for target in targets {
                        extraction.push(WeightedEdge::new(
                            source.id.clone(),
                            target.id.clone(),
                            RelationType::Module,
                            weight,
                            hops,
                        ));
                    }
                }
            }
        }
        extraction
    }
}
