//! Splits source or text files into retrievable `Chunk`s with stable
//! identities, and forwards code files' parsed `FileStructure` to the
//! graph service.

use std::path::Path;

use crate::config::Config;
use crate::parser::{self, Language};
use crate::types::{Chunk, ChunkMetadata, ChunkType, FileStructure};

const TEXT_EXTENSIONS: &[&str] = &["md", "txt", "rst", "adoc"];

/// Dispatch on `rel_path`'s extension, producing chunks and (for code
/// files) the parsed structure. Non-UTF-8 content and unrecognized
/// extensions both yield `(vec![], None)`.
pub fn chunk_and_structure(
    abs_path: &Path,
    rel_path: &str,
    config: &Config,
) -> (Vec<Chunk>, Option<FileStructure>) {
    let Ok(bytes) = std::fs::read(abs_path) else {
        tracing::warn!(path = %abs_path.display(), "failed to read file");
        return (Vec::new(), None);
    };

    let Ok(text) = String::from_utf8(bytes) else {
        tracing::warn!(path = %abs_path.display(), "skipping non-UTF-8 file");
        return (Vec::new(), None);
    };

    let ext = abs_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        let chunks = chunk_text(&text, rel_path, &ext, config);
        return (chunks, None);
    }

    let language = Language::from_extension(&ext);
    if matches!(language, Language::Unknown) {
        return (Vec::new(), None);
    }

    let structure = parser::extract_structure(
        text.as_bytes(),
        language,
        rel_path,
        &config.indexing.local_root_prefixes,
    );
    let chunks = chunk_code(&structure, &ext);
    (chunks, Some(structure))
}

/// Sliding-window text chunker: default window 1000 chars, overlap 200
/// (configurable). Advances by `size - overlap`; `Config::validate`
/// enforces `overlap < size` so the loop always terminates.
fn chunk_text(text: &str, rel_path: &str, ext: &str, config: &Config) -> Vec<Chunk> {
    let size = config.indexing.text_chunk_size;
    let overlap = config.indexing.text_chunk_overlap;
    let bytes = text.as_bytes();
    let line_starts = line_start_index(text);

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < bytes.len() {
        let end = (start + size).min(bytes.len());
        let content = String::from_utf8_lossy(&bytes[start..end]).into_owned();

        chunks.push(Chunk {
            id: Chunk::text_id(rel_path, start),
            content,
            metadata: ChunkMetadata {
                name: String::new(),
                chunk_type: ChunkType::Documentation,
                file_path: rel_path.to_string(),
                language: text_language(ext).to_string(),
                start_line: line_for_offset(&line_starts, start),
                end_line: line_for_offset(&line_starts, end),
            },
        });

        if end == bytes.len() {
            break;
        }
        start += size - overlap;
    }

    chunks
}

fn text_language(ext: &str) -> &'static str {
    match ext {
        "md" => "markdown",
        "rst" => "restructuredtext",
        "adoc" => "asciidoc",
        _ => "text",
    }
}

/// Byte offsets at which each line starts (line 0 always starts at 0).
fn line_start_index(text: &str) -> Vec<usize> {
    let mut starts = vec![0usize];
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

/// 1-based line number containing byte offset `offset`.
fn line_for_offset(line_starts: &[usize], offset: usize) -> u32 {
    match line_starts.binary_search(&offset) {
        Ok(idx) => (idx + 1) as u32,
        Err(idx) => idx as u32,
    }
}

/// One chunk per class/function definition; content is the definition's
/// source slice, line numbers as reported by the parser.
fn chunk_code(structure: &FileStructure, ext: &str) -> Vec<Chunk> {
    let language = code_language(ext);
    let mut chunks = Vec::with_capacity(structure.classes.len() + structure.functions.len());

    for class in &structure.classes {
        chunks.push(Chunk {
            id: Chunk::code_id(&structure.file_path, ChunkType::Class, &class.name),
            content: class.source.clone(),
            metadata: ChunkMetadata {
                name: class.name.clone(),
                chunk_type: ChunkType::Class,
                file_path: structure.file_path.clone(),
                language: language.to_string(),
                start_line: class.start_line,
                end_line: class.end_line,
            },
        });
    }

    for func in &structure.functions {
        chunks.push(Chunk {
            id: Chunk::code_id(&structure.file_path, ChunkType::Function, &func.name),
            content: func.source.clone(),
            metadata: ChunkMetadata {
                name: func.name.clone(),
                chunk_type: ChunkType::Function,
                file_path: structure.file_path.clone(),
                language: language.to_string(),
                start_line: func.start_line,
                end_line: func.end_line,
            },
        });
    }

    chunks
}

fn code_language(ext: &str) -> &'static str {
    match ext {
        "py" => "python",
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "tsx",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).expect("create temp file");
        f.write_all(content).expect("write temp file");
        path
    }

    #[test]
    fn markdown_file_yields_one_chunk_with_expected_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_temp(
            &dir,
            "readme.md",
            b"# Title\nThis is a test documentation for AutoWiki.",
        );
        let config = Config::default();
        let (chunks, structure) = chunk_and_structure(&path, "readme.md", &config);

        assert!(structure.is_none());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.chunk_type, ChunkType::Documentation);
        assert_eq!(chunks[0].metadata.start_line, 1);
        assert_eq!(chunks[0].metadata.end_line, 2);
    }

    #[test]
    fn binary_file_yields_no_chunks_and_no_structure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_temp(&dir, "blob.bin", &[0x00, 0x01, 0x02]);
        let config = Config::default();
        let (chunks, structure) = chunk_and_structure(&path, "blob.bin", &config);
        assert!(chunks.is_empty());
        assert!(structure.is_none());
    }

    #[test]
    fn sliding_window_on_long_text_yields_multiple_overlapping_chunks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let lines: String = (1..=100).map(|n| format!("Line {n}\n")).collect();
        let path = write_temp(&dir, "big.txt", lines.as_bytes());

        let mut config = Config::default();
        config.indexing.text_chunk_size = 200;
        config.indexing.text_chunk_overlap = 50;

        let (chunks, _) = chunk_and_structure(&path, "big.txt", &config);
        assert!(chunks.len() >= 2);
        assert!(chunks[1].metadata.start_line < chunks[0].metadata.end_line);
    }

    #[test]
    fn code_file_produces_stable_ids_across_runs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_temp(&dir, "main.py", b"def foo():\n    pass\n");
        let config = Config::default();

        let (chunks_a, structure_a) = chunk_and_structure(&path, "main.py", &config);
        let (chunks_b, _) = chunk_and_structure(&path, "main.py", &config);

        assert!(structure_a.is_some());
        assert_eq!(chunks_a.len(), 1);
        assert_eq!(chunks_a[0].id, chunks_b[0].id);
        assert_eq!(chunks_a[0].metadata.name, "foo");
    }

    #[test]
    fn unknown_extension_yields_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_temp(&dir, "data.bin2", b"whatever");
        let config = Config::default();
        let (chunks, structure) = chunk_and_structure(&path, "data.bin2", &config);
        assert!(chunks.is_empty());
        assert!(structure.is_none());
    }
}
