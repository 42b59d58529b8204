//! Python structural extractor.
//!
//! Extracts imports, classes, and functions (including methods, which
//! appear in the flat `functions` list alongside module-level functions)
//! via a single post-order traversal identified by grammar node kind.
//!
//! ## Node kinds consumed
//!
//! - `import_statement`, `import_from_statement` -> `ImportInfo`
//! - `class_definition` -> `ClassInfo`
//! - `function_definition` -> `FunctionInfo`

use crate::parser::{node_text, LanguageAnalyzer};
use crate::types::{ClassInfo, FileStructure, FunctionInfo, ImportInfo, ImportKind};

/// Analyzer for Python source files.
pub struct PythonAnalyzer;

impl LanguageAnalyzer for PythonAnalyzer {
    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn extract_structure(
        &self,
        tree: &tree_sitter::Tree,
        source: &[u8],
        file_path: &str,
        local_root_prefixes: &[String],
    ) -> FileStructure {
        let mut structure = FileStructure::empty(file_path);
        walk(
            tree.root_node(),
            source,
            local_root_prefixes,
            &mut structure,
        );
        structure
    }
}

fn walk(
    node: tree_sitter::Node<'_>,
    source: &[u8],
    local_root_prefixes: &[String],
    out: &mut FileStructure,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "import_statement" => extract_import_statement(child, source, local_root_prefixes, out),
            "import_from_statement" => {
                extract_import_from_statement(child, source, local_root_prefixes, out);
            }
            "function_definition" => {
                if let Some(func) = extract_function(child, source) {
                    out.functions.push(func);
                }
                if let Some(body) = child.child_by_field_name("body") {
                    walk(body, source, local_root_prefixes, out);
                }
            }
            "class_definition" => {
                if let Some(class) = extract_class(child, source) {
                    out.classes.push(class);
                }
                if let Some(body) = child.child_by_field_name("body") {
                    walk(body, source, local_root_prefixes, out);
                }
            }
            "decorated_definition" => {
                // The decorator is a sibling of the wrapped def inside this
                // node; recurse so the function/class is still captured.
                walk(child, source, local_root_prefixes, out);
            }
            _ => {
                if child.child_count() > 0 {
                    walk(child, source, local_root_prefixes, out);
                }
            }
        }
    }
}

fn classify(module: &str, local_root_prefixes: &[String]) -> ImportKind {
    if module.starts_with('.') {
        ImportKind::LocalRelative
    } else if local_root_prefixes
        .iter()
        .any(|prefix| module == prefix || module.starts_with(&format!("{prefix}.")))
    {
        ImportKind::LocalAbsolute
    } else {
        ImportKind::Stdlib
    }
}

/// `import foo`, `import foo as f`, `import foo.bar, baz as b`.
fn extract_import_statement(
    node: tree_sitter::Node<'_>,
    source: &[u8],
    local_root_prefixes: &[String],
    out: &mut FileStructure,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "dotted_name" => {
                let module = node_text(child, source).to_string();
                let kind = classify(&module, local_root_prefixes);
                out.imports.push(ImportInfo {
                    module,
                    name: None,
                    alias: None,
                    kind,
                });
            }
            "aliased_import" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    let module = node_text(name_node, source).to_string();
                    let alias = child
                        .child_by_field_name("alias")
                        .map(|n| node_text(n, source).to_string());
                    let kind = classify(&module, local_root_prefixes);
                    out.imports.push(ImportInfo {
                        module,
                        name: None,
                        alias,
                        kind,
                    });
                }
            }
            _ => {}
        }
    }
}

/// `from foo import bar`, `from foo import bar as b`, `from .x import y`,
/// `from .. import y`.
fn extract_import_from_statement(
    node: tree_sitter::Node<'_>,
    source: &[u8],
    local_root_prefixes: &[String],
    out: &mut FileStructure,
) {
    let module_node = node.child_by_field_name("module_name");
    let module = module_node
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_default();

    // `from .. import y`: no `module_name` field, only leading dots
    // (tokenized as `import_prefix`). Recover the dot count directly.
    let module = if module.is_empty() {
        let mut dots = String::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "import_prefix" {
                dots.push_str(node_text(child, source));
            }
        }
        dots
    } else {
        module
    };

    if module.is_empty() {
        return;
    }

    let kind = classify(&module, local_root_prefixes);
    let module_field_id = module_node.map(|n| n.id());

    let mut cursor = node.walk();
    let mut emitted_any = false;
    for child in node.children(&mut cursor) {
        if Some(child.id()) == module_field_id {
            continue;
        }
        match child.kind() {
            "dotted_name" | "identifier" => {
                out.imports.push(ImportInfo {
                    module: module.clone(),
                    name: Some(node_text(child, source).to_string()),
                    alias: None,
                    kind,
                });
                emitted_any = true;
            }
            "aliased_import" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    let alias = child
                        .child_by_field_name("alias")
                        .map(|n| node_text(n, source).to_string());
                    out.imports.push(ImportInfo {
                        module: module.clone(),
                        name: Some(node_text(name_node, source).to_string()),
                        alias,
                        kind,
                    });
                    emitted_any = true;
                }
            }
            "wildcard_import" => {
                out.imports.push(ImportInfo {
                    module: module.clone(),
                    name: Some("*".to_string()),
                    alias: None,
                    kind,
                });
                emitted_any = true;
            }
            _ => {}
        }
    }

    if !emitted_any {
        // `from . import X` where X didn't parse into a recognized child
        // kind (defensive; the grammar always emits one of the above).
        out.imports.push(ImportInfo {
            module,
            name: None,
            alias: None,
            kind,
        });
    }
}

fn extract_function(node: tree_sitter::Node<'_>, source: &[u8]) -> Option<FunctionInfo> {
    let name_node = node.child_by_field_name("name")?;
    let args = node
        .child_by_field_name("parameters")
        .map(|params| extract_params(params, source))
        .unwrap_or_default();

    Some(FunctionInfo {
        name: node_text(name_node, source).to_string(),
        args,
        start_line: node.start_position().row as u32,
        end_line: node.end_position().row as u32,
        source: node_text(node, source).to_string(),
    })
}

fn extract_params(params_node: tree_sitter::Node<'_>, source: &[u8]) -> Vec<String> {
    let mut args = Vec::new();
    let mut cursor = params_node.walk();
    for child in params_node.children(&mut cursor) {
        match child.kind() {
            "(" | ")" | "," => {}
            _ => args.push(node_text(child, source).trim().to_string()),
        }
    }
    args
}

fn extract_class(node: tree_sitter::Node<'_>, source: &[u8]) -> Option<ClassInfo> {
    let name_node = node.child_by_field_name("name")?;

    let mut bases = Vec::new();
    if let Some(superclasses) = node.child_by_field_name("superclasses") {
        let mut cursor = superclasses.walk();
        for child in superclasses.children(&mut cursor) {
            match child.kind() {
                "(" | ")" | "," | "keyword_argument" => {}
                _ => bases.push(node_text(child, source).trim().to_string()),
            }
        }
    }

    Some(ClassInfo {
        name: node_text(name_node, source).to_string(),
        bases,
        start_line: node.start_position().row as u32,
        end_line: node.end_position().row as u32,
        source: node_text(node, source).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{extract_structure, Language};

    fn parse(source: &str) -> FileStructure {
        extract_structure(
            source.as_bytes(),
            Language::Python,
            "test.py",
            &["backend".to_string(), "app".to_string()],
        )
    }

    #[test]
    fn plain_import_is_classified_by_prefix() {
        let s = parse("import os\nimport backend.utils\n");
        assert_eq!(s.imports[0].module, "os");
        assert_eq!(s.imports[0].kind, ImportKind::Stdlib);
        assert_eq!(s.imports[1].module, "backend.utils");
        assert_eq!(s.imports[1].kind, ImportKind::LocalAbsolute);
    }

    #[test]
    fn aliased_import_captures_alias() {
        let s = parse("import numpy as np\n");
        assert_eq!(s.imports[0].module, "numpy");
        assert_eq!(s.imports[0].alias.as_deref(), Some("np"));
    }

    #[test]
    fn from_import_emits_one_record_per_name() {
        let s = parse("from backend.app import a, b as bb\n");
        assert_eq!(s.imports.len(), 2);
        assert_eq!(s.imports[0].module, "backend.app");
        assert_eq!(s.imports[0].name.as_deref(), Some("a"));
        assert_eq!(s.imports[1].name.as_deref(), Some("b"));
        assert_eq!(s.imports[1].alias.as_deref(), Some("bb"));
        assert!(s.imports.iter().all(|i| i.kind == ImportKind::LocalAbsolute));
    }

    #[test]
    fn relative_import_retains_leading_dots() {
        let s = parse("from .services.parser import X\n");
        assert_eq!(s.imports[0].module, ".services.parser");
        assert_eq!(s.imports[0].kind, ImportKind::LocalRelative);
    }

    #[test]
    fn bare_dot_relative_import() {
        let s = parse("from .. import helpers\n");
        assert_eq!(s.imports[0].module, "..");
        assert_eq!(s.imports[0].kind, ImportKind::LocalRelative);
    }

    #[test]
    fn class_with_bases_and_methods() {
        let s = parse(
            "class Dog(Animal):\n    def bark(self, loud=True):\n        pass\n",
        );
        assert_eq!(s.classes.len(), 1);
        assert_eq!(s.classes[0].name, "Dog");
        assert_eq!(s.classes[0].bases, vec!["Animal".to_string()]);
        assert_eq!(s.functions.len(), 1);
        assert_eq!(s.functions[0].name, "bark");
        assert_eq!(s.functions[0].args, vec!["self".to_string(), "loud=True".to_string()]);
    }

    #[test]
    fn line_ranges_are_zero_based() {
        let s = parse("def first():\n    pass\n");
        assert_eq!(s.functions[0].start_line, 0);
        assert_eq!(s.functions[0].end_line, 1);
    }

    #[test]
    fn unsupported_module_defaults_to_stdlib() {
        let s = parse("import requests\n");
        assert_eq!(s.imports[0].kind, ImportKind::Stdlib);
    }
}
