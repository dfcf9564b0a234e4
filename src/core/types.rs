use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Identity of a debt marker as assigned by the detection stage.
pub type MarkerId = String;

/// File path to raw file text, for every file the extractors may look at.
pub type SourceMap = BTreeMap<PathBuf, String>;

/// Category of self-admitted technical debt assigned by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtType {
    Architecture,
    Design,
    Algorithm,
    Defect,
    Requirement,
    Test,
    Build,
    Documentation,
}

impl DebtType {
    /// Parse a detector label such as `"design"` or `"Documentation"`.
    pub fn from_label(label: &str) -> Option<Self> {
        static LABELS: &[(&[&str], DebtType)] = &[
            (&["architecture", "architectural"], DebtType::Architecture),
            (&["design", "code"], DebtType::Design),
            (&["algorithm", "algorithmic", "refactoring"], DebtType::Algorithm),
            (&["defect", "bug"], DebtType::Defect),
            (&["requirement", "requirements"], DebtType::Requirement),
            (&["test", "testing"], DebtType::Test),
            (&["build"], DebtType::Build),
            (&["documentation", "docs"], DebtType::Documentation),
        ];

        let label = label.trim().to_ascii_lowercase();
        LABELS
            .iter()
            .find(|(labels, _)| labels.contains(&label.as_str()))
            .map(|(_, debt_type)| *debt_type)
    }
}

impl fmt::Display for DebtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DebtType::Architecture => "architecture",
            DebtType::Design => "design",
            DebtType::Algorithm => "algorithm",
            DebtType::Defect => "defect",
            DebtType::Requirement => "requirement",
            DebtType::Test => "test",
            DebtType::Build => "build",
            DebtType::Documentation => "documentation",
        };
        f.write_str(label)
    }
}

/// Externally assigned estimate of how directly a proposed fix resolves a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FixPotential {
    High,
    Partial,
    Low,
}

impl FixPotential {
    pub fn value(self) -> f64 {
        match self {
            FixPotential::High => 1.0,
            FixPotential::Partial => 0.5,
            FixPotential::Low => 0.0,
        }
    }
}

/// One detected SATD instance.
///
/// Markers are produced by the detection collaborator and are never mutated
/// by the core; computed scores travel alongside them in
/// [`RankedMarker`](crate::scoring::RankedMarker).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtMarker {
    pub id: MarkerId,
    pub file: PathBuf,
    /// 1-based source line of the marker comment.
    pub line: usize,
    pub content: String,
    #[serde(default)]
    pub debt_type: Option<DebtType>,
    #[serde(default)]
    pub fix_potential: Option<FixPotential>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl DebtMarker {
    pub fn new(
        id: impl Into<MarkerId>,
        file: impl Into<PathBuf>,
        line: usize,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            file: file.into(),
            line,
            content: content.into(),
            debt_type: None,
            fix_potential: None,
            confidence: None,
        }
    }

    pub fn with_debt_type(mut self, debt_type: DebtType) -> Self {
        self.debt_type = Some(debt_type);
        self
    }

    pub fn with_fix_potential(mut self, fix_potential: FixPotential) -> Self {
        self.fix_potential = Some(fix_potential);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Fix potential as a number; an unlabeled marker carries no signal.
    pub fn fix_potential_value(&self) -> f64 {
        self.fix_potential.map(FixPotential::value).unwrap_or(0.0)
    }

    pub fn directory(&self) -> &Path {
        self.file.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// Source language, resolved from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Java,
    Go,
    C,
    Cpp,
    CSharp,
    Unknown,
}

impl Language {
    pub fn from_extension(ext: &str) -> Self {
        static EXTENSION_MAP: &[(&[&str], Language)] = &[
            (&["rs"], Language::Rust),
            (&["py", "pyi"], Language::Python),
            (&["js", "jsx", "mjs", "cjs"], Language::JavaScript),
            (&["ts", "tsx", "mts", "cts"], Language::TypeScript),
            (&["java", "kt", "scala"], Language::Java),
            (&["go"], Language::Go),
            (&["c", "h"], Language::C),
            (&["cc", "cpp", "cxx", "hpp", "hh", "hxx"], Language::Cpp),
            (&["cs"], Language::CSharp),
        ];

        EXTENSION_MAP
            .iter()
            .find(|(exts, _)| exts.contains(&ext))
            .map(|(_, lang)| *lang)
            .unwrap_or(Language::Unknown)
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Languages backed by a full grammar rather than the line scanner.
    pub fn has_grammar(self) -> bool {
        matches!(
            self,
            Language::Rust | Language::Python | Language::JavaScript | Language::TypeScript
        )
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        static DISPLAY_STRINGS: &[(Language, &str)] = &[
            (Language::Rust, "Rust"),
            (Language::Python, "Python"),
            (Language::JavaScript, "JavaScript"),
            (Language::TypeScript, "TypeScript"),
            (Language::Java, "Java"),
            (Language::Go, "Go"),
            (Language::C, "C"),
            (Language::Cpp, "C++"),
            (Language::CSharp, "C#"),
            (Language::Unknown, "Unknown"),
        ];

        let name = DISPLAY_STRINGS
            .iter()
            .find(|(lang, _)| lang == self)
            .map(|(_, s)| *s)
            .unwrap_or("Unknown");
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_potential_values() {
        assert_eq!(FixPotential::High.value(), 1.0);
        assert_eq!(FixPotential::Partial.value(), 0.5);
        assert_eq!(FixPotential::Low.value(), 0.0);

        let unlabeled = DebtMarker::new("m1", "a.py", 3, "TODO");
        assert_eq!(unlabeled.fix_potential_value(), 0.0);
    }

    #[test]
    fn test_debt_type_labels() {
        assert_eq!(
            DebtType::from_label("Architecture"),
            Some(DebtType::Architecture)
        );
        assert_eq!(DebtType::from_label(" docs "), Some(DebtType::Documentation));
        assert_eq!(DebtType::from_label("mystery"), None);
    }

    #[test]
    fn test_language_from_path() {
        assert_eq!(Language::from_path(Path::new("pkg/mod.py")), Language::Python);
        assert_eq!(Language::from_path(Path::new("web/app.tsx")), Language::TypeScript);
        assert_eq!(Language::from_path(Path::new("src/lib.rs")), Language::Rust);
        assert_eq!(Language::from_path(Path::new("Makefile")), Language::Unknown);
        assert!(!Language::Go.has_grammar());
    }
}
