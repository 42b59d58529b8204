//! AST parsing subsystem using tree-sitter.
//!
//! `extract_structure` is the single entry point: it dispatches on
//! `Language`, runs one tree-sitter parse, and hands the tree to a
//! per-language post-order traversal that emits a `FileStructure`. An
//! unsupported language or a failed parse both yield an empty structure
//! rather than aborting ingestion.

pub mod languages;
pub mod registry;

use crate::types::FileStructure;

/// Source language recognized by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// Python (`.py`).
    Python,
    /// TypeScript (`.ts`).
    TypeScript,
    /// TSX (`.tsx`).
    Tsx,
    /// JavaScript (`.js`, `.jsx`, `.mjs`, `.cjs`).
    JavaScript,
    /// No registered analyzer; yields an empty `FileStructure`.
    Unknown,
}

impl Language {
    /// Detect a language from a lowercased file extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "py" => Language::Python,
            "ts" | "mts" | "cts" => Language::TypeScript,
            "tsx" => Language::Tsx,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            _ => Language::Unknown,
        }
    }
}

/// Trait each language analyzer implements: turn a tree-sitter parse tree
/// into a `FileStructure`.
pub trait LanguageAnalyzer: Send + Sync {
    /// The tree-sitter grammar to use for this language.
    fn tree_sitter_language(&self) -> tree_sitter::Language;

    /// Extract imports, classes, and functions from a parsed tree.
    ///
    /// `local_root_prefixes` feeds the Python import classifier; other
    /// languages ignore it.
    fn extract_structure(
        &self,
        tree: &tree_sitter::Tree,
        source: &[u8],
        file_path: &str,
        local_root_prefixes: &[String],
    ) -> FileStructure;
}

/// Produce a `FileStructure` from a source file.
///
/// Always succeeds. An unsupported language or a tree-sitter failure both
/// yield `FileStructure::empty`; callers should log a warning in the
/// latter case but must not abort.
pub fn extract_structure(
    source: &[u8],
    language: Language,
    file_path: &str,
    local_root_prefixes: &[String],
) -> FileStructure {
    let Some(analyzer) = registry::analyzer_for(language) else {
        return FileStructure::empty(file_path);
    };

    let mut parser = tree_sitter::Parser::new();
    if parser.set_language(&analyzer.tree_sitter_language()).is_err() {
        tracing::warn!(file_path = %file_path, "failed to set tree-sitter language");
        return FileStructure::empty(file_path);
    }

    let Some(tree) = parser.parse(source, None) else {
        tracing::warn!(file_path = %file_path, "tree-sitter returned no parse tree");
        return FileStructure::empty(file_path);
    };

    analyzer.extract_structure(&tree, source, file_path, local_root_prefixes)
}

/// Extract the UTF-8 text spanned by a tree-sitter node. Returns `""` on
/// invalid UTF-8 rather than panicking (the caller already filters
/// non-UTF-8 files, but individual node spans are defensive here too).
pub(crate) fn node_text<'a>(node: tree_sitter::Node<'_>, source: &'a [u8]) -> &'a str {
    std::str::from_utf8(&source[node.start_byte()..node.end_byte()]).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_yields_empty_structure() {
        let structure = extract_structure(b"hello world", Language::Unknown, "file.xyz", &[]);
        assert!(structure.is_empty());
        assert_eq!(structure.file_path, "file.xyz");
    }

    #[test]
    fn language_from_extension_covers_supported_set() {
        assert_eq!(Language::from_extension("py"), Language::Python);
        assert_eq!(Language::from_extension("ts"), Language::TypeScript);
        assert_eq!(Language::from_extension("tsx"), Language::Tsx);
        assert_eq!(Language::from_extension("jsx"), Language::JavaScript);
        assert_eq!(Language::from_extension("rs"), Language::Unknown);
    }
}
