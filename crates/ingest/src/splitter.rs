use crate::chunk::Chunk;

#[derive(Debug, Clone)]
pub struct SplitterConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next.
    pub chunk_overlap: usize,
    pub separators: Vec<String>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: ["\n\n", "\n", " ", ""].iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Recursive character splitter.
///
/// Tries each separator in turn, recursing into pieces that are still too
/// long, then greedily merges the pieces back up to `chunk_size` with
/// `chunk_overlap` characters shared between neighbours.
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    pub fn chunk_text(&self, doc_id: &str, text: &str, source: &str) -> Vec<Chunk> {
        self.split_text(text)
            .into_iter()
            .enumerate()
            .map(|(i, piece)| Chunk::new(doc_id.to_string(), piece, source.to_string(), i))
            .collect()
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.config.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        // First separator present in the text; "" always matches.
        let (position, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, s)| s.is_empty() || text.contains(s.as_str()))
            .map(|(i, s)| (i, s.as_str()))
            .unwrap_or((separators.len(), ""));
        let remaining = separators.get(position + 1..).unwrap_or(&[]);

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|p| !p.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) < self.config.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge(&pending, separator));
                pending.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending, separator));
        }

        chunks
    }

    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut docs = Vec::new();
        let mut window: Vec<&str> = Vec::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            let joiner = if window.is_empty() { 0 } else { separator_len };

            if total + len + joiner > self.config.chunk_size && !window.is_empty() {
                if let Some(doc) = join_trimmed(&window, separator) {
                    docs.push(doc);
                }
                // Drop from the front until only the overlap remains.
                while total > self.config.chunk_overlap
                    || (total + len + separator_len > self.config.chunk_size && total > 0)
                {
                    let dropped = window.remove(0);
                    total -= char_len(dropped);
                    if !window.is_empty() {
                        total -= separator_len;
                    }
                }
            }

            if !window.is_empty() {
                total += separator_len;
            }
            window.push(piece);
            total += len;
        }

        if let Some(doc) = join_trimmed(&window, separator) {
            docs.push(doc);
        }
        docs
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn join_trimmed(pieces: &[&str], separator: &str) -> Option<String> {
    let joined = pieces.join(separator);
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(chunk_size: usize, chunk_overlap: usize) -> TextSplitter {
        TextSplitter::new(SplitterConfig {
            chunk_size,
            chunk_overlap,
            ..SplitterConfig::default()
        })
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = TextSplitter::new(SplitterConfig::default()).chunk_text(
            "test-doc",
            "Invoice INV-001.\n\nTotal due: 42.00",
            "invoice.txt",
        );

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].doc_id, "test-doc");
        assert_eq!(chunks[0].text, "Invoice INV-001.\n\nTotal due: 42.00");
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let text = "one two three four five six seven eight nine ten";
        let pieces = splitter(15, 5).split_text(text);

        assert!(pieces.len() > 1);
        assert!(pieces.iter().all(|p| p.chars().count() <= 15), "{pieces:?}");
        // Neighbouring chunks share a word.
        let first_last = pieces[0].split(' ').last().unwrap();
        assert!(pieces[1].starts_with(first_last), "{pieces:?}");
    }

    #[test]
    fn test_long_word_falls_back_to_characters() {
        let pieces = splitter(4, 0).split_text("abcdefghij");
        assert_eq!(pieces, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_chunk_ids_are_stable() {
        let splitter = TextSplitter::new(SplitterConfig::default());
        let a = splitter.chunk_text("doc", "same text", "a.txt");
        let b = splitter.chunk_text("doc", "same text", "a.txt");
        assert_eq!(a[0].chunk_id, b[0].chunk_id);
    }
}
