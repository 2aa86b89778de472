// BIO tag decoding and "simple" entity grouping for token-classification output.
//
// A BERT NER model labels every sub-word token with a tag like `B-PER`,
// `I-LOC` or `O`. Adjacent tokens belonging to the same entity are merged
// into one span the way the Hugging Face pipeline's "simple" aggregation
// strategy does it:
//
//   - `O` closes any open entity
//   - `B-X` always starts a new entity of type X
//   - `I-X` continues an open entity of type X, or starts one otherwise
//
// The span score is the mean of its token scores.

use super::traits::EntitySpan;

/// Label set of the CoNLL-2003 NER models (dslim/bert-base-NER and its ONNX
/// exports), indexed by class id. Used when the model ships no config.json.
pub const CONLL_LABELS: [&str; 9] = [
    "O", "B-MISC", "I-MISC", "B-PER", "I-PER", "B-ORG", "I-ORG", "B-LOC", "I-LOC",
];

/// A decoded BIO tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Outside,
    Begin(String),
    Inside(String),
}

impl Tag {
    /// Parse a label like `B-PER`, `I-LOC` or `O`. Labels without a BIO
    /// prefix (some models emit bare `PER`) are treated as `I-`.
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() || label.eq_ignore_ascii_case("O") {
            return Tag::Outside;
        }
        match label.split_once('-') {
            Some((prefix, kind)) if prefix.eq_ignore_ascii_case("B") => Tag::Begin(kind.to_string()),
            Some((prefix, kind)) if prefix.eq_ignore_ascii_case("I") => Tag::Inside(kind.to_string()),
            _ => Tag::Inside(label.to_string()),
        }
    }
}

/// One classified token. Offsets are byte offsets into the text the token
/// came from.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedToken {
    pub tag: Tag,
    pub score: f32,
    pub start: usize,
    pub end: usize,
}

struct OpenEntity {
    kind: String,
    start: usize,
    end: usize,
    scores: Vec<f32>,
}

impl OpenEntity {
    fn close(self, text: &str) -> Option<EntitySpan> {
        let word = text.get(self.start..self.end)?.trim();
        if word.is_empty() {
            return None;
        }
        let score = self.scores.iter().sum::<f32>() / self.scores.len() as f32;
        Some(EntitySpan {
            entity_group: self.kind,
            score,
            word: word.to_string(),
            start: super::chunk::byte_to_char_offset(text, self.start),
            end: super::chunk::byte_to_char_offset(text, self.end),
        })
    }
}

/// Merge tagged tokens into entity spans.
///
/// `text` is the string the token offsets point into; the span's `word` is
/// sliced from it (so sub-word markers like `##` never leak into names) and
/// its offsets are converted to characters.
pub fn group_tokens(tokens: &[TaggedToken], text: &str) -> Vec<EntitySpan> {
    let mut spans = Vec::new();
    let mut open: Option<OpenEntity> = None;

    for token in tokens {
        match &token.tag {
            Tag::Outside => {
                if let Some(entity) = open.take() {
                    spans.extend(entity.close(text));
                }
            }
            Tag::Begin(kind) => {
                if let Some(entity) = open.take() {
                    spans.extend(entity.close(text));
                }
                open = Some(OpenEntity {
                    kind: kind.clone(),
                    start: token.start,
                    end: token.end,
                    scores: vec![token.score],
                });
            }
            Tag::Inside(kind) => {
                if let Some(entity) = open.as_mut().filter(|e| e.kind == *kind) {
                    entity.end = token.end;
                    entity.scores.push(token.score);
                    continue;
                }
                if let Some(entity) = open.take() {
                    spans.extend(entity.close(text));
                }
                open = Some(OpenEntity {
                    kind: kind.clone(),
                    start: token.start,
                    end: token.end,
                    scores: vec![token.score],
                });
            }
        }
    }

    if let Some(entity) = open {
        spans.extend(entity.close(text));
    }

    spans
}
