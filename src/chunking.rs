use crate::config::ChunkConfig;
use crate::document::Document;

/// Separators tried in decreasing priority: paragraph break, line break,
/// sentence break, then whitespace. Text still too large after all of them
/// is cut at raw character boundaries.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

/// A contiguous text span cut from one page of a document
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// The text content of this chunk, including any carried overlap
    pub text: String,
    /// 1-based page number this chunk was cut from
    pub page_number: usize,
    /// Character offset of the chunk start within the page text
    pub offset: usize,
}

/// Split a document into overlapping chunks in reading order.
///
/// Pure function over the document: chunking the same document twice with
/// the same configuration yields identical chunk sequences. Chunks never
/// cross a page boundary, so each chunk has exactly one originating page.
/// An empty document yields an empty sequence.
pub fn split_document(document: &Document, config: &ChunkConfig) -> Vec<Chunk> {
    document
        .pages
        .iter()
        .flat_map(|page| chunk_page(&page.text, page.number, config))
        .collect()
}

/// Split one page into chunks of at most `chunk_size` characters, carrying
/// `chunk_overlap` trailing characters of context into each following chunk.
fn chunk_page(text: &str, page_number: usize, config: &ChunkConfig) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    split_pieces(text, 0, config.chunk_size, &mut pieces);

    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;
    // Character offset of the buffer start within the page
    let mut start = 0usize;
    // Character offset of the next unconsumed content
    let mut pos = 0usize;
    let mut has_new_content = false;

    for piece in pieces {
        let piece_chars = piece.chars().count();

        if has_new_content && buf_chars + piece_chars > config.chunk_size {
            chunks.push(Chunk {
                text: buf.clone(),
                page_number,
                offset: start,
            });

            // Carry trailing context into the next chunk
            let (carried, carried_chars) = overlap_suffix(&buf, config.chunk_overlap);
            start = pos - carried_chars;
            buf = carried;
            buf_chars = carried_chars;
            has_new_content = false;
        }

        buf.push_str(&piece);
        buf_chars += piece_chars;
        pos += piece_chars;
        has_new_content = true;
    }

    if has_new_content {
        chunks.push(Chunk {
            text: buf,
            page_number,
            offset: start,
        });
    }

    chunks
}

/// Recursively split `text` into pieces of at most `max_chars` characters,
/// preferring the highest-priority separator that fits. Separators stay
/// attached to the preceding piece, so concatenating all pieces
/// reconstructs the input exactly.
fn split_pieces(text: &str, level: usize, max_chars: usize, out: &mut Vec<String>) {
    if text.is_empty() {
        return;
    }
    if text.chars().count() <= max_chars {
        out.push(text.to_string());
        return;
    }

    if level >= SEPARATORS.len() {
        // No separator left: cut at raw character boundaries
        let mut buf = String::new();
        let mut count = 0;
        for ch in text.chars() {
            buf.push(ch);
            count += 1;
            if count == max_chars {
                out.push(std::mem::take(&mut buf));
                count = 0;
            }
        }
        if !buf.is_empty() {
            out.push(buf);
        }
        return;
    }

    for part in text.split_inclusive(SEPARATORS[level]) {
        split_pieces(part, level + 1, max_chars, out);
    }
}

/// Take up to `overlap` trailing characters of `text` at a char boundary.
/// Returns the suffix and its character count.
fn overlap_suffix(text: &str, overlap: usize) -> (String, usize) {
    if overlap == 0 {
        return (String::new(), 0);
    }
    let total = text.chars().count();
    let skip = total.saturating_sub(overlap);
    let suffix: String = text.chars().skip(skip).collect();
    (suffix, total - skip)
}
