//! Sliding-window text chunker.
//!
//! Splits file bodies into [`Chunk`]s of at most `chunk_size_chars`
//! bytes, with a configurable overlap carried between consecutive
//! windows so context is not lost at the boundary. Splits prefer a
//! newline or space near the window edge; indices are contiguous per
//! file starting at 0.

use crate::config::ChunkingConfig;
use crate::models::{Chunk, SourceFile};

/// Split one file body into bounded chunks.
///
/// Whitespace-only input yields no chunks. Windows are snapped to
/// UTF-8 character boundaries, so multibyte text never splits a
/// character.
pub fn chunk_file(file_id: &str, text: &str, max_chars: usize, overlap: usize) -> Vec<Chunk> {
    let len = text.len();
    let mut chunks = Vec::new();
    let mut index: i64 = 0;
    let mut start = 0usize;

    while start < len {
        let mut end = (start + max_chars).min(len);

        if end < len {
            while end > start && !text.is_char_boundary(end) {
                end -= 1;
            }
            if end == start {
                // A single character wider than the window; take it whole.
                end = start + 1;
                while end < len && !text.is_char_boundary(end) {
                    end += 1;
                }
            } else {
                // Prefer a newline or space split near the window edge.
                let window = &text[start..end];
                if let Some(pos) = window.rfind('\n').or_else(|| window.rfind(' ')) {
                    if pos > 0 {
                        end = start + pos + 1;
                    }
                }
            }
        }

        let piece = &text[start..end];
        if !piece.trim().is_empty() {
            chunks.push(Chunk::new(file_id, index, piece));
            index += 1;
        }

        if end >= len {
            break;
        }

        // The next window re-reads the tail of this one.
        let mut next = end.saturating_sub(overlap).max(start + 1);
        while next < len && !text.is_char_boundary(next) {
            next += 1;
        }
        start = next;
    }

    chunks
}

/// Chunk every scanned file, assigning per-file indices.
pub fn chunk_files(files: &[SourceFile], config: &ChunkingConfig) -> Vec<Chunk> {
    files
        .iter()
        .flat_map(|file| {
            chunk_file(
                &file.file_id,
                &file.body,
                config.chunk_size_chars,
                config.overlap_chars,
            )
        })
        .collect()
}
