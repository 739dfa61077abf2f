//! Fixed-size, overlapping text chunker.
//!
//! Splits document text into [`Chunk`]s of at most `chunk_size` characters,
//! where consecutive chunks share up to `overlap` characters so a sentence
//! cut at one boundary still appears whole in the neighbouring chunk.
//!
//! Sizes are counted in characters, never bytes, so multi-byte UTF-8 text
//! is never split inside a code point. When a window ends mid-text, the cut
//! is moved back to the last whitespace in the second half of the window.
//!
//! Each chunk gets a UUID plus a SHA-256 hash of its text for staleness
//! detection when the index is rebuilt.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Split `text` into overlapping chunks tagged with `document`.
///
/// Returns chunks with contiguous indices starting at 0. Blank text yields
/// no chunks.
pub fn chunk_text(document: &str, text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size - 1);

    if text.trim().is_empty() {
        return Vec::new();
    }

    // Byte offset of every char, plus the end of the string.
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = offsets.len() - 1;
    let chars: Vec<char> = text.chars().collect();

    let mut chunks = Vec::new();
    let mut chunk_index: i64 = 0;
    let mut start = 0usize;

    loop {
        let mut end = (start + chunk_size).min(total);

        if end < total {
            let floor = start + chunk_size / 2;
            if let Some(ws) = (floor..end).rev().find(|&i| chars[i].is_whitespace()) {
                end = ws + 1;
            }
        }

        let piece = text[offsets[start]..offsets[end]].trim();
        if !piece.is_empty() {
            chunks.push(make_chunk(document, chunk_index, piece));
            chunk_index += 1;
        }

        if end >= total {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

fn make_chunk(document: &str, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        document: document.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_text("doc1", "Hello, world!", 1000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].document, "doc1");
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_text("doc1", "", 1000, 200).is_empty());
        assert!(chunk_text("doc1", "  \n\n ", 1000, 200).is_empty());
    }

    #[test]
    fn test_chunks_respect_size() {
        let text = "lorem ipsum dolor sit amet ".repeat(200);
        let chunks = chunk_text("doc1", &text, 100, 20);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.text.chars().count() <= 100, "chunk too long: {}", c.text.len());
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let text = (0..300)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunk_text("doc1", &text, 100, 30);
        for pair in chunks.windows(2) {
            let tail_word = pair[0].text.split_whitespace().last().unwrap();
            assert!(
                pair[1].text.contains(tail_word),
                "expected {:?} to reappear in next chunk",
                tail_word
            );
        }
    }

    #[test]
    fn test_chunk_indices_contiguous() {
        let text = "abc ".repeat(1000);
        let chunks = chunk_text("doc1", &text, 50, 10);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64, "Index mismatch at position {}", i);
        }
    }

    #[test]
    fn test_text_without_whitespace_is_hard_split() {
        let text = "x".repeat(250);
        let chunks = chunk_text("doc1", &text, 100, 0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].text.len(), 50);
    }

    #[test]
    fn test_multibyte_utf8_chars() {
        let text = "┌──────────────────┐\n│ Grüße aus Köln   │\n└──────────────────┘".repeat(5);
        let chunks = chunk_text("doc1", &text, 17, 4);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.text.chars().count() <= 17);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha beta gamma delta epsilon zeta eta theta ".repeat(30);
        let c1 = chunk_text("doc1", &text, 64, 16);
        let c2 = chunk_text("doc1", &text, 64, 16);
        assert_eq!(c1.len(), c2.len());
        for (a, b) in c1.iter().zip(c2.iter()) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.hash, b.hash);
            assert_eq!(a.chunk_index, b.chunk_index);
        }
    }
}
