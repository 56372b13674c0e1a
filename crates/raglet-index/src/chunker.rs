//! Line-based block chunking terminated by blank lines.

use std::borrow::Cow;

/// Marker that opens a function block.
pub const FUNCTION_MARKER: &str = "def ";
/// Marker that opens a class block.
pub const CLASS_MARKER: &str = "class ";

/// Splits source text into ordered, non-overlapping chunk strings.
///
/// Implementations must be pure and deterministic: record ids are derived from
/// chunk positions, so the same text must always yield the same chunks.
pub trait ChunkStrategy: Send + Sync {
    fn chunk(&self, source: &str) -> Vec<String>;
}

/// One chunk of a source, before metadata is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub sequence_index: usize,
    pub source_id: String,
}

/// Flat block scanner.
///
/// A line starting with one of the markers opens a block and flushes the
/// previous one. Lines are collected while inside a block. A whitespace-only
/// line is collected and then closes the block; anything after it is dropped
/// until the next marker line. Text before the first marker is never emitted,
/// nesting is not tracked, and a blank line inside a body ends the block early.
/// `\r\n` and `\r` line endings are read as `\n`.
#[derive(Debug, Clone)]
pub struct BlankLineChunker {
    markers: Vec<String>,
}

impl Default for BlankLineChunker {
    fn default() -> Self {
        Self {
            markers: vec![FUNCTION_MARKER.to_owned(), CLASS_MARKER.to_owned()],
        }
    }
}

impl BlankLineChunker {
    #[must_use]
    pub fn with_markers(markers: Vec<String>) -> Self {
        Self { markers }
    }

    fn opens_block(&self, line: &str) -> bool {
        self.markers.iter().any(|m| line.starts_with(m.as_str()))
    }
}

impl ChunkStrategy for BlankLineChunker {
    fn chunk(&self, source: &str) -> Vec<String> {
        let source = normalize_newlines(source);
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut in_block = false;

        for line in source.split('\n') {
            if self.opens_block(line) {
                if !current.is_empty() {
                    chunks.push(current.join("\n"));
                    current.clear();
                }
                in_block = true;
            }

            if in_block {
                current.push(line);
                if line.trim().is_empty() {
                    in_block = false;
                }
            }
        }

        if !current.is_empty() {
            chunks.push(current.join("\n"));
        }

        chunks
    }
}

/// Rewrite `\r\n` and lone `\r` line endings as `\n`.
#[must_use]
pub fn normalize_newlines(source: &str) -> Cow<'_, str> {
    if source.contains('\r') {
        Cow::Owned(source.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(source)
    }
}

/// Chunk `source` and tag each piece with its position and origin.
#[must_use]
pub fn chunk_source(strategy: &dyn ChunkStrategy, source_id: &str, source: &str) -> Vec<Chunk> {
    strategy
        .chunk(source)
        .into_iter()
        .enumerate()
        .map(|(sequence_index, text)| Chunk {
            text,
            sequence_index,
            source_id: source_id.to_owned(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str) -> Vec<String> {
        BlankLineChunker::default().chunk(source)
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(chunk("").is_empty());
    }

    #[test]
    fn two_one_line_functions() {
        let chunks = chunk("def a(): pass\n\ndef b(): pass\n");
        assert_eq!(chunks, vec!["def a(): pass\n", "def b(): pass\n"]);
    }

    #[test]
    fn preamble_is_discarded() {
        let source = "from typing import Callable\nimport os\n\ndef somar(a, b):\n    return a + b\n";
        let chunks = chunk(source);
        assert_eq!(chunks, vec!["def somar(a, b):\n    return a + b\n"]);
        assert!(chunks.iter().all(|c| !c.contains("import")));
    }

    #[test]
    fn lines_after_block_end_are_dropped() {
        let source = "def a():\n    return 1\n\nprint(a())\nx = 2\n\ndef b():\n    return 2";
        let chunks = chunk(source);
        assert_eq!(chunks, vec!["def a():\n    return 1\n", "def b():\n    return 2"]);
    }

    #[test]
    fn blank_line_inside_body_splits_early() {
        let source = "def long():\n    x = 1\n\n    return x\n";
        assert_eq!(chunk(source), vec!["def long():\n    x = 1\n"]);
    }

    #[test]
    fn consecutive_markers_flush_without_blank_line() {
        let source = "class A:\n    pass\nclass B:\n    pass";
        assert_eq!(chunk(source), vec!["class A:\n    pass", "class B:\n    pass"]);
    }

    #[test]
    fn indented_methods_stay_in_class_chunk() {
        let source = "class Calc:\n    def add(self, a, b):\n        return a + b\n\n";
        let chunks = chunk(source);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with("class Calc:"));
        assert!(chunks[0].contains("def add"));
    }

    #[test]
    fn whitespace_only_line_closes_block() {
        let chunks = chunk("def a():\n    pass\n   \nstray = 1\n");
        assert_eq!(chunks, vec!["def a():\n    pass\n   "]);
    }

    #[test]
    fn crlf_line_endings() {
        let source = "import os\r\n\r\ndef a():\r\n    return 1\r\n\r\ndef b():\r\n    return 2\r\n";
        assert_eq!(
            chunk(source),
            vec!["def a():\n    return 1\n", "def b():\n    return 2\n"]
        );
    }

    #[test]
    fn cr_only_line_endings() {
        let source = "def a():\r    return 1\r\rdef b():\r    return 2\r";
        assert_eq!(
            chunk(source),
            vec!["def a():\n    return 1\n", "def b():\n    return 2\n"]
        );
    }

    #[test]
    fn normalize_borrows_when_clean() {
        assert!(matches!(normalize_newlines("a\nb"), Cow::Borrowed("a\nb")));
        assert_eq!(normalize_newlines("a\r\nb\rc\n"), "a\nb\nc\n");
    }

    #[test]
    fn marker_must_start_the_line() {
        assert!(chunk("x = 1  # def not_a_block\n    def indented():\n").is_empty());
    }

    #[test]
    fn custom_markers() {
        let chunker = BlankLineChunker::with_markers(vec!["fn ".into()]);
        let chunks = chunker.chunk("use std::io;\nfn main() {}\n\ndef ignored():\n");
        assert_eq!(chunks, vec!["fn main() {}\n"]);
    }

    #[test]
    fn chunk_source_numbers_chunks() {
        let chunks = chunk_source(
            &BlankLineChunker::default(),
            "calc.py",
            "def a(): pass\n\ndef b(): pass\n",
        );
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].sequence_index, 0);
        assert_eq!(chunks[1].sequence_index, 1);
        assert!(chunks.iter().all(|c| c.source_id == "calc.py"));
    }

    mod proptest_chunker {
        use proptest::prelude::*;

        use super::*;

        fn function_block() -> impl Strategy<Value = String> {
            ("[a-z]{1,8}", prop::collection::vec("    [a-z =+0-9]{1,20}", 0..4)).prop_map(
                |(name, body)| {
                    let mut block = format!("def {name}():");
                    for line in body {
                        block.push('\n');
                        block.push_str(&line);
                    }
                    block.push_str("\n\n");
                    block
                },
            )
        }

        fn python_like_source() -> impl Strategy<Value = String> {
            let line = prop_oneof![
                Just(String::new()),
                Just("   ".to_owned()),
                "def [a-z]{1,6}\\(\\):",
                "class [A-Z][a-z]{0,6}:",
                "    [a-z =+0-9]{0,16}",
                "[a-z =0-9#]{0,16}",
            ];
            prop::collection::vec(line, 0..24).prop_map(|lines| lines.join("\n"))
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(500))]

            #[test]
            fn one_chunk_per_marker_in_order(
                preamble in "(# [a-z =0-9]{0,20}\n){0,3}",
                blocks in prop::collection::vec(function_block(), 0..8),
            ) {
                let source = format!("{preamble}{}", blocks.concat());
                let chunks = chunk(&source);
                prop_assert_eq!(chunks.len(), blocks.len());
                for (chunk, block) in chunks.iter().zip(&blocks) {
                    let header = block.lines().next().unwrap_or_default();
                    prop_assert!(chunk.starts_with(header));
                }
            }

            #[test]
            fn preamble_never_leaks(
                blocks in prop::collection::vec(function_block(), 1..5),
            ) {
                let source = format!("PREAMBLE_TOKEN = 1\n{}", blocks.concat());
                for c in chunk(&source) {
                    prop_assert!(!c.contains("PREAMBLE_TOKEN"));
                }
            }

            #[test]
            fn chunks_are_ordered_disjoint_substrings(source in python_like_source()) {
                let mut cursor = 0usize;
                for c in chunk(&source) {
                    let found = source[cursor..].find(c.as_str());
                    prop_assert!(found.is_some());
                    cursor += found.unwrap_or_default() + c.len();
                }
            }

            #[test]
            fn chunking_is_deterministic(source in python_like_source()) {
                prop_assert_eq!(chunk(&source), chunk(&source));
            }
        }
    }
}
