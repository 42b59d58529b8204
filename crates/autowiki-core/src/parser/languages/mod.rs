//! Per-language tree-sitter analyzers.
//!
//! Each module implements `LanguageAnalyzer` for one grammar. They are
//! wired together in `registry`.

pub mod javascript;
pub mod python;
pub mod typescript;
