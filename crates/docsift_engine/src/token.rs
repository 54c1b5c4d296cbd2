pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> u32;
}

/// Simple, deterministic whitespace tokenizer; an approximation of model tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceTokenCounter;

impl TokenCounter for WhitespaceTokenCounter {
    fn count(&self, text: &str) -> u32 {
        text.split_whitespace().count() as u32
    }
}

/// Split `text` into chunks of at most `max_tokens` whitespace-separated words.
///
/// Words are re-joined with a single space, so original spacing is not preserved.
/// Empty or whitespace-only input yields no chunks.
pub fn chunk_by_tokens(text: &str, max_tokens: usize) -> Vec<String> {
    let max_tokens = max_tokens.max(1);
    let words: Vec<&str> = text.split_whitespace().collect();
    words.chunks(max_tokens).map(|chunk| chunk.join(" ")).collect()
}
