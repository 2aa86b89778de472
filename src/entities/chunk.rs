// Split long documents into model-sized chunks.
//
// NER models have a hard input limit (512 tokens for BERT). Rather than
// truncating, the document is cut into chunks and each chunk remembers its
// character offset, so spans found inside a chunk can be shifted back into
// document coordinates.
//
// A cut through a multi-word name turns one person into two fragments, so
// chunks end at the best break inside the window, in this order:
//
//   - a line break in the second half of the window
//   - a sentence end in the second half of the window
//   - the last whitespace that doesn't sit between two capitalised words
//   - the last whitespace of any kind
//
// A run with no whitespace at all is cut hard.

/// A slice of the document plus where it starts, in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk<'a> {
    pub text: &'a str,
    pub char_offset: usize,
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Empty or whitespace-only input yields no chunks.
pub fn split_text(text: &str, max_chars: usize) -> Vec<TextChunk<'_>> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();

    // (byte index, char index) for every char, plus the end sentinel
    let boundaries: Vec<(usize, usize)> = text
        .char_indices()
        .enumerate()
        .map(|(ci, (bi, _))| (bi, ci))
        .chain(std::iter::once((text.len(), text.chars().count())))
        .collect();
    let total_chars = boundaries.len() - 1;

    let mut start = 0usize; // char index
    while start < total_chars {
        let hard_end = (start + max_chars).min(total_chars);
        let mut end = hard_end;

        if hard_end < total_chars {
            let rest = &text[boundaries[start].0..];
            let limit = boundaries[hard_end].0 - boundaries[start].0;
            if let Some(cut) = break_before(rest, limit) {
                end = start + rest[..cut].chars().count();
            }
        }

        let slice = &text[boundaries[start].0..boundaries[end].0];
        if !slice.trim().is_empty() {
            chunks.push(TextChunk {
                text: slice,
                char_offset: start,
            });
        }
        start = end;
    }

    chunks
}

/// Pick where a chunk that must stop within `limit` bytes of `rest` ends.
///
/// Returns a byte length into `rest` that always lands just after a
/// whitespace character, or `None` when the window has no whitespace.
fn break_before(rest: &str, limit: usize) -> Option<usize> {
    let half = limit / 2;
    let mut paragraph = None;
    let mut sentence = None;
    let mut between_words = None;
    let mut any = None;

    for (i, c) in rest[..limit].char_indices().filter(|(_, c)| c.is_whitespace()) {
        let cut = i + c.len_utf8();
        any = Some(cut);

        let prev = rest[..i].split_whitespace().next_back().unwrap_or("");
        let next = rest[cut..].split_whitespace().next().unwrap_or("");
        let joined = joins_name(prev, next);

        if c == '\n' && cut >= half {
            paragraph = Some(cut);
        }
        if !joined && prev.ends_with(['.', '!', '?']) && cut >= half {
            sentence = Some(cut);
        }
        if !joined {
            between_words = Some(cut);
        }
    }

    paragraph.or(sentence).or(between_words).or(any)
}

/// Whether a cut between `prev` and `next` would split a name such as
/// "Ada Lovelace" or "Dr. Watson".
fn joins_name(prev: &str, next: &str) -> bool {
    let capitalised = |w: &str| w.chars().next().is_some_and(char::is_uppercase);
    if !capitalised(prev) || !capitalised(next) {
        return false;
    }
    match prev.strip_suffix('.') {
        // Titles and initials: "Mr.", "St.", "J."
        Some(stem) => stem.chars().count() <= 3,
        None => !prev.ends_with([',', ';', ':', '!', '?']),
    }
}

/// Convert a byte offset inside `text` to a character offset.
pub fn byte_to_char_offset(text: &str, byte_offset: usize) -> usize {
    let clamped = byte_offset.min(text.len());
    text.char_indices().take_while(|(i, _)| *i < clamped).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = split_text("Alice went to Paris.", 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].char_offset, 0);
        assert_eq!(chunks[0].text, "Alice went to Paris.");
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(split_text("", 10).is_empty());
        assert!(split_text("   \n  ", 10).is_empty());
    }

    #[test]
    fn test_splits_at_whitespace() {
        let text = "aaaa bbbb cccc";
        let chunks = split_text(text, 7);
        let pieces: Vec<&str> = chunks.iter().map(|c| c.text).collect();
        assert_eq!(pieces, vec!["aaaa ", "bbbb ", "cccc"]);
        assert_eq!(chunks[1].char_offset, 5);
        assert_eq!(chunks[2].char_offset, 10);
    }

    #[test]
    fn test_chunks_cover_whole_text() {
        let text = "The quick brown fox jumps over the lazy dog near Zürich and Kraków.";
        let chunks = split_text(text, 12);
        let rebuilt: String = chunks.iter().map(|c| c.text).collect();
        assert_eq!(rebuilt, text);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 12);
            let expected: String = text.chars().skip(chunk.char_offset).take(chunk.text.chars().count()).collect();
            assert_eq!(chunk.text, expected);
        }
    }

    #[test]
    fn test_hard_cut_without_whitespace() {
        let chunks = split_text("abcdefghij", 4);
        let pieces: Vec<&str> = chunks.iter().map(|c| c.text).collect();
        assert_eq!(pieces, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_name_straddling_limit_stays_whole() {
        // "Ada" ends just inside the limit, "Lovelace" starts past it
        let text = format!("{}xx Ada Lovelace went to London.", "word ".repeat(298));
        let chunks = split_text(&text, 1500);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.ends_with("xx "));
        assert_eq!(chunks[1].char_offset, 1493);
        assert!(chunks[1].text.starts_with("Ada Lovelace"));
    }

    #[test]
    fn test_prefers_sentence_end() {
        let text = "Alice met Bob in Rome. Then they left for the coast";
        let chunks = split_text(text, 30);
        assert_eq!(chunks[0].text, "Alice met Bob in Rome. ");
        assert_eq!(chunks[1].char_offset, 23);
    }

    #[test]
    fn test_prefers_line_break() {
        let text = "first line here\nsecond line. more words after it";
        let chunks = split_text(text, 30);
        assert_eq!(chunks[0].text, "first line here\n");
    }

    #[test]
    fn test_title_is_not_a_sentence_end() {
        let text = "we spoke with Dr. Watson about it";
        let chunks = split_text(text, 21);
        assert!(chunks.iter().any(|c| c.text.contains("Dr. Watson")), "{chunks:?}");
    }

    #[test]
    fn test_all_capitalised_falls_back_to_whitespace() {
        let chunks = split_text("Alpha Beta Gamma Delta", 12);
        let rebuilt: String = chunks.iter().map(|c| c.text).collect();
        assert_eq!(rebuilt, "Alpha Beta Gamma Delta");
        assert_eq!(chunks[0].text, "Alpha Beta ");
    }

    #[test]
    fn test_byte_to_char_offset_multibyte() {
        let text = "Zürich, Kraków";
        let byte = text.find("Kraków").unwrap();
        assert_eq!(byte_to_char_offset(text, byte), 8);
        assert_eq!(byte_to_char_offset(text, 0), 0);
        assert_eq!(byte_to_char_offset(text, 999), text.chars().count());
    }
}
