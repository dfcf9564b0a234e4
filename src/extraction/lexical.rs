//! Line-level lexical helpers shared by the line scanner and the data
//! extractor.

use crate::core::Language;
use once_cell::sync::Lazy;
use regex::Regex;

static DOUBLE_QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(?:[^"\\]|\\.)*"|`[^`]*`"#).unwrap());
static SINGLE_QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"'(?:[^'\\]|\\.)*'").unwrap());
// Rust uses `'` for lifetimes, so only blank single-character literals there.
static CHAR_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"'(?:[^'\\]|\\.)'").unwrap());

/// Whether a language writes line comments with `#`.
fn hash_comments(language: Language) -> bool {
    matches!(language, Language::Python)
}

/// True for lines that hold nothing but a comment.
pub fn is_comment_line(line: &str, language: Language) -> bool {
    let trimmed = line.trim_start();
    if hash_comments(language) {
        return trimmed.starts_with('#');
    }
    trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}

/// Replace string and character literals with empty quotes.
pub fn strip_literals(line: &str, language: Language) -> String {
    let stripped = DOUBLE_QUOTED.replace_all(line, "\"\"");
    let single = if language == Language::Rust {
        &*CHAR_LITERAL
    } else {
        &*SINGLE_QUOTED
    };
    single.replace_all(&stripped, "''").into_owned()
}

/// Drop a trailing line comment. Call after [`strip_literals`] so that
/// comment markers inside strings are already gone.
pub fn strip_trailing_comment(line: &str, language: Language) -> &str {
    let marker = if hash_comments(language) { "#" } else { "//" };
    match line.find(marker) {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Code portion of a line: literals blanked, trailing comment removed.
/// Comment-only lines come back empty.
pub fn code_portion(line: &str, language: Language) -> String {
    if is_comment_line(line, language) {
        return String::new();
    }
    let stripped = strip_literals(line, language);
    strip_trailing_comment(&stripped, language).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_portion_strips_literals_and_comments() {
        assert_eq!(
            code_portion(r#"x = "a # b"  # note"#, Language::Python),
            r#"x = ""  "#
        );
        assert_eq!(
            code_portion("let s = \"//\"; // why", Language::Rust),
            "let s = \"\"; "
        );
        assert_eq!(code_portion("    # TODO: fix", Language::Python), "");
        assert_eq!(code_portion(" * doc", Language::Java), "");
    }

    #[test]
    fn test_rust_lifetimes_survive() {
        assert_eq!(
            strip_literals("fn f<'a>(x: &'a str) -> char { 'x' }", Language::Rust),
            "fn f<'a>(x: &'a str) -> char { '' }"
        );
    }
}
