//! Lexical path helpers shared by import resolution and commit matching.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` segments and fold `..` into the
/// preceding component. The filesystem is never consulted.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            // only a real directory name can absorb `..`
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Path without its extension, joined with `/`, e.g. `pkg/util/io`.
pub fn stem_key(path: &Path) -> String {
    let without_ext = path.with_extension("");
    without_ext
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// True when `key` equals `suffix` or ends with `/suffix`.
pub fn key_ends_with(key: &str, suffix: &str) -> bool {
    key == suffix
        || key
            .strip_suffix(suffix)
            .is_some_and(|head| head.ends_with('/'))
}

/// True when a normalized path climbs above the analyzed root.
pub fn escapes_root(path: &Path) -> bool {
    matches!(path.components().next(), Some(Component::ParentDir))
}

pub fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_folds_parent_segments() {
        assert_eq!(
            normalize_path(Path::new("pkg/./sub/../util.py")),
            PathBuf::from("pkg/util.py")
        );
        assert_eq!(
            normalize_path(Path::new("../shared/a.js")),
            PathBuf::from("../shared/a.js")
        );
    }

    #[test]
    fn test_normalize_path_keeps_escaping_parents() {
        assert_eq!(normalize_path(Path::new("../../a.js")), PathBuf::from("../../a.js"));
        assert_eq!(
            normalize_path(Path::new("web/../../x.js")),
            PathBuf::from("../x.js")
        );
        assert_eq!(normalize_path(Path::new("/../etc")), PathBuf::from("/etc"));
        assert!(escapes_root(&normalize_path(Path::new("web/../../x.js"))));
        assert!(!escapes_root(&normalize_path(Path::new("web/../x.js"))));
    }

    #[test]
    fn test_stem_key_and_suffix() {
        let key = stem_key(Path::new("src/pkg/util.py"));
        assert_eq!(key, "src/pkg/util");
        assert!(key_ends_with(&key, "pkg/util"));
        assert!(!key_ends_with(&key, "kg/util"));
        assert!(key_ends_with("util", "util"));
    }
}
