use regex::Regex;
use std::sync::LazyLock;

/// Context kept for backends that accept non-spoken continuity text
pub const CONTEXT_WINDOW_CHARS: usize = 2000;

/// Sentence-ending punctuation followed by whitespace
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+").expect("sentence pattern is valid"));

/// Blank line between paragraphs
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("paragraph pattern is valid"));

/// One piece of a longer text, synthesized on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// 1-based position in the source text
    pub index: usize,
    pub text: String,
    /// Already-synthesized text preceding this chunk, not to be spoken
    pub context: Option<String>,
}

impl TextChunk {
    pub fn with_context(mut self, context: Option<&str>) -> Self {
        self.context = context.filter(|c| !c.is_empty()).map(str::to_string);
        self
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Split `text` into ordered chunks of at most `max_chunk_size` characters.
///
/// Paragraph breaks are preferred, then sentence ends, and only then a hard
/// cut at the limit. Neighbouring fragments are packed greedily, joined by
/// one space. Whitespace-only input yields no chunks.
pub fn segment(text: &str, max_chunk_size: usize) -> Vec<TextChunk> {
    let max = max_chunk_size.max(1);
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    // 1. Break into fragments that each fit the limit
    let mut fragments: Vec<&str> = Vec::new();
    for paragraph in PARAGRAPH_BREAK.split(text) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if char_len(paragraph) <= max {
            fragments.push(paragraph);
            continue;
        }

        for sentence in split_sentences(paragraph) {
            if char_len(sentence) <= max {
                fragments.push(sentence);
            } else {
                fragments.extend(hard_split(sentence, max));
            }
        }
    }

    // 2. Pack fragments into chunks
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for fragment in fragments {
        let fragment_len = char_len(fragment);
        if !current.is_empty() && current_len + 1 + fragment_len > max {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(fragment);
        current_len += fragment_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, text)| TextChunk {
            index: i + 1,
            text,
            context: None,
        })
        .collect()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Sentences of a paragraph, trimmed, punctuation kept with its sentence
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut last_end = 0;

    for mat in SENTENCE_END.find_iter(paragraph) {
        let sentence = paragraph[last_end..mat.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        last_end = mat.end();
    }

    let rest = paragraph[last_end..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }

    sentences
}

/// Cut at exactly `max` characters, on char boundaries
fn hard_split(text: &str, max: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in text.char_indices() {
        if count == max {
            pieces.push(&text[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    pieces.push(&text[start..]);

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// The most recent characters of what has already been synthesized
#[derive(Debug, Clone)]
pub struct ContextWindow {
    text: String,
    limit: usize,
}

impl ContextWindow {
    pub fn new(limit: usize) -> Self {
        Self {
            text: String::new(),
            limit,
        }
    }

    pub fn push(&mut self, chunk: &str) {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(chunk);

        let len = char_len(&self.text);
        if len > self.limit {
            let cut = self
                .text
                .char_indices()
                .nth(len - self.limit)
                .map(|(offset, _)| offset)
                .unwrap_or(self.text.len());
            self.text.drain(..cut);
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        (!self.text.is_empty()).then_some(self.text.as_str())
    }
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new(CONTEXT_WINDOW_CHARS)
    }
}
