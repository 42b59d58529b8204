//! TypeScript/TSX structural extractor.
//!
//! Recognizes function declarations, class declarations, method
//! definitions, interface declarations, and lexical declarations that
//! bind an arrow function. Interfaces are folded into `classes[]` since
//! the data model has no separate interface list; their
//! `extends_type_clause` base list is captured the same way a class's
//! `class_heritage` is.
//!
//! Import resolution is a Python-only concern, so this analyzer leaves
//! `imports` empty.

use crate::parser::{node_text, LanguageAnalyzer};
use crate::types::{ClassInfo, FileStructure, FunctionInfo};

/// Analyzer for TypeScript (`tsx: false`) and TSX (`tsx: true`) source.
pub struct TypeScriptAnalyzer {
    /// Selects the TSX grammar instead of plain TypeScript.
    pub tsx: bool,
}

impl LanguageAnalyzer for TypeScriptAnalyzer {
    fn tree_sitter_language(&self) -> tree_sitter::Language {
        if self.tsx {
            tree_sitter_typescript::LANGUAGE_TSX.into()
        } else {
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
        }
    }

    fn extract_structure(
        &self,
        tree: &tree_sitter::Tree,
        source: &[u8],
        file_path: &str,
        _local_root_prefixes: &[String],
    ) -> FileStructure {
        let mut structure = FileStructure::empty(file_path);
        walk(tree.root_node(), source, &mut structure);
        structure
    }
}

pub(crate) fn walk(node: tree_sitter::Node<'_>, source: &[u8], out: &mut FileStructure) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "function_declaration" => {
                if let Some(func) = extract_function(child, source) {
                    out.functions.push(func);
                }
            }
            "class_declaration" => {
                if let Some(class) = extract_class(child, source, "class_heritage") {
                    out.classes.push(class);
                }
                if let Some(body) = child.child_by_field_name("body") {
                    walk(body, source, out);
                }
            }
            "interface_declaration" => {
                if let Some(class) = extract_class(child, source, "extends_type_clause") {
                    out.classes.push(class);
                }
            }
            "method_definition" => {
                if let Some(func) = extract_function(child, source) {
                    out.functions.push(func);
                }
            }
            "lexical_declaration" => extract_arrow_bindings(child, source, out),
            "export_statement" => walk(child, source, out),
            _ => {
                if child.child_count() > 0 && !matches!(child.kind(), "string" | "template_string") {
                    walk(child, source, out);
                }
            }
        }
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

fn extract_class(
    node: tree_sitter::Node<'_>,
    source: &[u8],
    heritage_kind: &str,
) -> Option<ClassInfo> {
    let name_node = node.child_by_field_name("name")?;

    let mut bases = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == heritage_kind {
            for part in node_text(child, source).split_whitespace() {
                if part != "extends" && part != "implements" {
                    let clean = part.trim_end_matches(',');
                    if !clean.is_empty() {
                        bases.push(clean.to_string());
                    }
                }
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

/// `const f = () => {...}` / `const f = function() {...}`.
fn extract_arrow_bindings(node: tree_sitter::Node<'_>, source: &[u8], out: &mut FileStructure) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() != "variable_declarator" {
            continue;
        }
        let Some(name_node) = child.child_by_field_name("name") else {
            continue;
        };
        let is_fn = matches!(
            child.child_by_field_name("value").map(|v| v.kind()),
            Some("arrow_function") | Some("function")
        );
        if !is_fn {
            continue;
        }

        let args = child
            .child_by_field_name("value")
            .and_then(|v| v.child_by_field_name("parameters"))
            .map(|p| extract_params(p, source))
            .unwrap_or_default();

        out.functions.push(FunctionInfo {
            name: node_text(name_node, source).to_string(),
            args,
            start_line: node.start_position().row as u32,
            end_line: node.end_position().row as u32,
            source: node_text(node, source).to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{extract_structure, Language};

    fn parse(source: &str) -> FileStructure {
        extract_structure(source.as_bytes(), Language::TypeScript, "test.ts", &[])
    }

    #[test]
    fn function_declaration_is_captured() {
        let s = parse("function add(a: number, b: number): number { return a + b; }");
        assert_eq!(s.functions.len(), 1);
        assert_eq!(s.functions[0].name, "add");
        assert_eq!(s.functions[0].args, vec!["a: number".to_string(), "b: number".to_string()]);
    }

    #[test]
    fn class_with_extends_and_method() {
        let s = parse(
            "class Dog extends Animal {\n  bark(loud: boolean) {\n    return loud;\n  }\n}",
        );
        assert_eq!(s.classes.len(), 1);
        assert_eq!(s.classes[0].name, "Dog");
        assert_eq!(s.classes[0].bases, vec!["Animal".to_string()]);
        assert_eq!(s.functions.len(), 1);
        assert_eq!(s.functions[0].name, "bark");
    }

    #[test]
    fn interface_declaration_is_captured_as_class() {
        let s = parse("interface Shape extends Drawable {\n  area(): number;\n}");
        assert_eq!(s.classes.len(), 1);
        assert_eq!(s.classes[0].name, "Shape");
        assert_eq!(s.classes[0].bases, vec!["Drawable".to_string()]);
    }

    #[test]
    fn arrow_function_binding_is_captured() {
        let s = parse("const handler = (req, res) => { res.send('ok'); };");
        assert_eq!(s.functions.len(), 1);
        assert_eq!(s.functions[0].name, "handler");
        assert_eq!(s.functions[0].args, vec!["req".to_string(), "res".to_string()]);
    }

    #[test]
    fn non_function_const_is_ignored() {
        let s = parse("const PI = 3.14159;");
        assert!(s.functions.is_empty());
    }

    #[test]
    fn exported_definitions_are_still_captured() {
        let s = parse("export function greet(name: string) { return `hi ${name}`; }");
        assert_eq!(s.functions.len(), 1);
        assert_eq!(s.functions[0].name, "greet");
    }
}
