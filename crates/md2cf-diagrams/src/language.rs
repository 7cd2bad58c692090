//! Diagram types for supported diagram languages.

use sha2::{Digest, Sha256};

/// Supported diagram languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramLanguage {
    Mermaid,
    PlantUml,
}

impl DiagramLanguage {
    /// Parse language from a code fence info string.
    ///
    /// Only the first word of the info string is considered, so
    /// `mermaid title="Flow"` is still a Mermaid block. Matching is
    /// case-insensitive.
    ///
    /// Returns None if the language is not a supported diagram type.
    #[must_use]
    pub fn parse(info: &str) -> Option<Self> {
        let lang = info.split_whitespace().next()?.to_ascii_lowercase();

        match lang.as_str() {
            "mermaid" | "mmd" => Some(Self::Mermaid),
            "plantuml" | "puml" => Some(Self::PlantUml),
            _ => None,
        }
    }

    /// Canonical name, also used in cache keys and log entries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mermaid => "mermaid",
            Self::PlantUml => "plantuml",
        }
    }

    /// Whether sources need `!include` resolution before rendering.
    #[must_use]
    pub fn needs_plantuml_preprocessing(self) -> bool {
        matches!(self, Self::PlantUml)
    }
}

impl std::fmt::Display for DiagramLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A diagram found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramSource {
    /// Diagram language.
    pub language: DiagramLanguage,
    /// Diagram definition as written in the code block.
    pub code: String,
}

impl DiagramSource {
    /// Create a diagram source.
    #[must_use]
    pub fn new(language: DiagramLanguage, code: impl Into<String>) -> Self {
        Self {
            language,
            code: code.into(),
        }
    }

    /// Content-address key of this diagram.
    ///
    /// SHA-256 of `"{language}:{code}"`, hex encoded. The key depends on
    /// nothing else, so the same diagram maps to the same cache entry in
    /// every document and every run.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.language.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(self.code.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_languages() {
        let languages = [
            ("mermaid", DiagramLanguage::Mermaid),
            ("mmd", DiagramLanguage::Mermaid),
            ("Mermaid", DiagramLanguage::Mermaid),
            ("plantuml", DiagramLanguage::PlantUml),
            ("puml", DiagramLanguage::PlantUml),
            ("PlantUML", DiagramLanguage::PlantUml),
        ];

        for (name, expected) in languages {
            assert_eq!(
                DiagramLanguage::parse(name),
                Some(expected),
                "Failed to parse: {name}"
            );
        }
    }

    #[test]
    fn test_parse_uses_first_word() {
        assert_eq!(
            DiagramLanguage::parse("mermaid title=\"Flow\""),
            Some(DiagramLanguage::Mermaid)
        );
        assert_eq!(
            DiagramLanguage::parse("  plantuml  "),
            Some(DiagramLanguage::PlantUml)
        );
    }

    #[test]
    fn test_parse_non_diagram() {
        assert!(DiagramLanguage::parse("rust").is_none());
        assert!(DiagramLanguage::parse("").is_none());
        assert!(DiagramLanguage::parse("graphviz").is_none());
        assert!(DiagramLanguage::parse("mermaid-js").is_none());
    }

    #[test]
    fn test_as_str_and_display() {
        assert_eq!(DiagramLanguage::Mermaid.as_str(), "mermaid");
        assert_eq!(DiagramLanguage::PlantUml.to_string(), "plantuml");
    }

    #[test]
    fn test_plantuml_preprocessing_flag() {
        assert!(DiagramLanguage::PlantUml.needs_plantuml_preprocessing());
        assert!(!DiagramLanguage::Mermaid.needs_plantuml_preprocessing());
    }

    #[test]
    fn test_cache_key_deterministic() {
        let a = DiagramSource::new(DiagramLanguage::Mermaid, "graph TD; A-->B;");
        let b = DiagramSource::new(DiagramLanguage::Mermaid, "graph TD; A-->B;");
        let c = DiagramSource::new(DiagramLanguage::Mermaid, "graph TD; A-->C;");

        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
    }

    #[test]
    fn test_cache_key_language_matters() {
        let mermaid = DiagramSource::new(DiagramLanguage::Mermaid, "A -> B");
        let plantuml = DiagramSource::new(DiagramLanguage::PlantUml, "A -> B");

        assert_ne!(mermaid.cache_key(), plantuml.cache_key());
    }

    #[test]
    fn test_cache_key_format() {
        let key = DiagramSource::new(DiagramLanguage::PlantUml, "test source").cache_key();

        assert_eq!(key.len(), 64, "SHA-256 hash should be 64 hex characters");
        assert!(
            key.chars().all(|c| c.is_ascii_hexdigit()),
            "Hash should contain only hex digits"
        );
    }

    #[test]
    fn test_cache_key_known_value() {
        // sha256("mermaid:") computed independently.
        let key = DiagramSource::new(DiagramLanguage::Mermaid, "").cache_key();
        let mut hasher = Sha256::new();
        hasher.update(b"mermaid:");
        assert_eq!(key, hex::encode(hasher.finalize()));
    }
}
