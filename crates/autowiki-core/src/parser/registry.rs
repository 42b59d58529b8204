//! Language analyzer registry.
//!
//! A small lazily-initialized table mapping `Language` to its
//! `LanguageAnalyzer`. `Unknown` (and any language with no analyzer)
//! resolves to `None`, which `extract_structure` turns into an empty
//! `FileStructure`.

use std::sync::OnceLock;

use super::languages::{javascript::JavaScriptAnalyzer, python::PythonAnalyzer, typescript::TypeScriptAnalyzer};
use super::{Language, LanguageAnalyzer};

struct Registry {
    python: PythonAnalyzer,
    typescript: TypeScriptAnalyzer,
    javascript: JavaScriptAnalyzer,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();
static TSX_ANALYZER: OnceLock<TypeScriptAnalyzer> = OnceLock::new();

fn global_registry() -> &'static Registry {
    REGISTRY.get_or_init(|| Registry {
        python: PythonAnalyzer,
        typescript: TypeScriptAnalyzer { tsx: false },
        javascript: JavaScriptAnalyzer,
    })
}

/// Look up the analyzer for a language, if one is registered.
pub fn analyzer_for(language: Language) -> Option<&'static dyn LanguageAnalyzer> {
    let registry = global_registry();
    match language {
        Language::Python => Some(&registry.python),
        Language::TypeScript => Some(&registry.typescript),
        Language::Tsx => Some(TSX_ANALYZER.get_or_init(|| TypeScriptAnalyzer { tsx: true })),
        Language::JavaScript => Some(&registry.javascript),
        Language::Unknown => None,
    }
}
