//! Token estimation.

pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate LLM tokens as `ceil(chars / 4)`.
///
/// Counts Unicode scalar values, not bytes. This is an approximation, not a
/// tokenizer; the constant is part of the output format and must not change.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::estimate_tokens;

    #[test]
    fn rounds_up_partial_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(&"x".repeat(4000)), 1000);
    }

    #[test]
    fn counts_characters_not_bytes() {
        // Four multi-byte characters are still one token.
        assert_eq!(estimate_tokens("日本語字"), 1);
        assert_eq!(estimate_tokens("ééééé"), 2);
    }
}
