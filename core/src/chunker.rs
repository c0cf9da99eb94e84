//! Sliding-window splitting of documents into retrieval chunks.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::document::{Document, DocumentKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("chunk size must be greater than zero")]
    ZeroSize,
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// Window parameters, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    pub size: usize,
    pub overlap: usize,
    /// Trimmed windows of this length or shorter are dropped.
    pub min_length: usize,
}

impl ChunkConfig {
    /// # Errors
    /// Fails when the window would not advance.
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.size == 0 {
            return Err(ChunkError::ZeroSize);
        }
        if self.overlap >= self.size {
            return Err(ChunkError::OverlapTooLarge {
                size: self.size,
                overlap: self.overlap,
            });
        }
        Ok(())
    }

    fn stride(&self) -> usize {
        self.size - self.overlap
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub kind: DocumentKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Splits every document into overlapping windows, in document order.
///
/// # Errors
/// Returns the config validation error; no chunks are produced for an invalid config.
pub fn chunk(documents: &[Document], config: &ChunkConfig) -> Result<Vec<Chunk>, ChunkError> {
    config.validate()?;
    let mut chunks = Vec::new();
    for doc in documents {
        let before = chunks.len();
        let metadata = ChunkMetadata {
            source: doc.source.clone(),
            kind: doc.kind,
        };
        chunks.extend(
            windows(&doc.content, config)
                .map(str::trim)
                .filter(|w| w.chars().count() > config.min_length)
                .map(|w| Chunk {
                    text: w.to_string(),
                    metadata: metadata.clone(),
                }),
        );
        debug!(source = %doc.source, chunks = chunks.len() - before, "Chunked document");
    }
    Ok(chunks)
}

/// Raw windows of `config.size` chars starting every `stride` chars, the last one possibly
/// shorter. Offsets are char-based so multi-byte text never splits inside a code point.
fn windows<'a>(text: &'a str, config: &ChunkConfig) -> impl Iterator<Item = &'a str> + 'a {
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let char_count = bounds.len();
    bounds.push(text.len());
    let (size, stride) = (config.size, config.stride());
    (0..char_count)
        .step_by(stride)
        .map(move |start| &text[bounds[start]..bounds[(start + size).min(char_count)]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str) -> Document {
        Document::new(content, "doc.txt", DocumentKind::Transcript)
    }

    fn config(size: usize, overlap: usize, min_length: usize) -> ChunkConfig {
        ChunkConfig {
            size,
            overlap,
            min_length,
        }
    }

    #[test]
    fn test_sliding_windows_with_tail() {
        let chunks = chunk(&[doc("abcdefghij")], &config(4, 1, 0)).unwrap();
        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "defg", "ghij", "j"]);
        assert!(chunks.iter().all(|c| c.metadata.source == "doc.txt"));
        assert!(chunks.iter().all(|c| c.metadata.kind == DocumentKind::Transcript));
    }

    #[test]
    fn test_short_and_blank_windows_dropped() {
        let chunks = chunk(&[doc("   hello world      ")], &config(10, 0, 5)).unwrap();
        // windows "   hello w" and "orld      " trim to "hello w" (7) and "orld" (4)
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello w");

        let none = chunk(&[doc("                ")], &config(4, 1, 0)).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_multibyte_text() {
        let chunks = chunk(&[doc("₹₹₹₹₹₹")], &config(4, 2, 0)).unwrap();
        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["₹₹₹₹", "₹₹₹₹", "₹₹"]);
    }

    #[test]
    fn test_invalid_configs() {
        assert_eq!(
            chunk(&[doc("abc")], &config(4, 4, 0)),
            Err(ChunkError::OverlapTooLarge { size: 4, overlap: 4 })
        );
        assert_eq!(
            chunk(&[doc("abc")], &config(4, 9, 0)),
            Err(ChunkError::OverlapTooLarge { size: 4, overlap: 9 })
        );
        assert_eq!(chunk(&[doc("abc")], &config(0, 0, 0)), Err(ChunkError::ZeroSize));
    }

    #[test]
    fn test_deterministic() {
        let docs = vec![
            doc("The quarter saw strong growth in lending and insurance premiums."),
            Document::new("Stock summary text for the index", "prices.csv", DocumentKind::StockData),
        ];
        let cfg = config(20, 5, 3);
        assert_eq!(chunk(&docs, &cfg).unwrap(), chunk(&docs, &cfg).unwrap());
    }

    #[test]
    fn test_windows_cover_whole_document() {
        let text = "Revenue grew twelve percent year over year while costs stayed flat.";
        let cfg = config(16, 4, 0);
        let windows: Vec<_> = windows(text, &cfg).collect();
        let mut covered = String::new();
        for (i, w) in windows.iter().enumerate() {
            if i == 0 {
                covered.push_str(w);
            } else {
                covered.extend(w.chars().skip(cfg.overlap));
            }
        }
        assert_eq!(covered, text);
    }

    #[test]
    fn test_kept_chunks_cover_padded_document() {
        let text = "   Revenue grew twelve percent year over year while costs stayed flat.      ";
        let cfg = config(16, 4, 3);
        let chunks = chunk(&[doc(text)], &cfg).unwrap();
        assert!(!chunks.is_empty());

        let mut covered = vec![false; text.len()];
        let mut from = 0;
        for c in &chunks {
            assert_eq!(c.text, c.text.trim());
            assert!(c.text.chars().count() > cfg.min_length);
            let start = from + text[from..].find(c.text.as_str()).unwrap();
            covered[start..start + c.text.len()].fill(true);
            from = start + 1;
        }
        for (i, ch) in text.char_indices() {
            assert!(ch.is_whitespace() || covered[i], "byte {i} ({ch:?}) not in any chunk");
        }
    }

    #[test]
    fn test_documents_keep_insertion_order() {
        let docs = vec![
            Document::new("first document body", "a", DocumentKind::Transcript),
            Document::new("second document body", "b", DocumentKind::BusinessInfo),
        ];
        let chunks = chunk(&docs, &config(100, 10, 0)).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.source, "a");
        assert_eq!(chunks[1].metadata.source, "b");
        assert_eq!(chunks[1].metadata.kind, DocumentKind::BusinessInfo);
    }
}
