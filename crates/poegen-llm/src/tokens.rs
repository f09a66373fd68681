//! Prompt size estimation.
//!
//! CJK text is close to one token per character for GPT tokenizers, other
//! text averages about four characters per token. The estimate errs high.

/// Fixed overhead per chat message (role markers and separators).
const PER_MESSAGE_OVERHEAD: usize = 4;

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3000..=0x303F     // CJK punctuation
        | 0x3040..=0x30FF   // Hiragana, Katakana
        | 0x3400..=0x4DBF   // CJK extension A
        | 0x4E00..=0x9FFF   // CJK unified ideographs
        | 0xAC00..=0xD7AF   // Hangul syllables
        | 0xF900..=0xFAFF   // CJK compatibility ideographs
        | 0xFF00..=0xFFEF   // Full-width forms
        | 0x20000..=0x2FA1F // Supplementary ideographs
    )
}

/// Estimated token count of a single text.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    let (cjk, other) = text.chars().fold((0usize, 0usize), |(cjk, other), c| {
        if is_cjk(c) {
            (cjk + 1, other)
        } else {
            (cjk, other + 1)
        }
    });
    cjk + other.div_ceil(4)
}

/// Estimated token count of a whole conversation.
#[must_use]
pub fn estimate_prompt_tokens<'a>(messages: impl IntoIterator<Item = &'a str>) -> usize {
    messages
        .into_iter()
        .map(|m| estimate_tokens(m) + PER_MESSAGE_OVERHEAD)
        .sum()
}
