//! Pre-admission cost kill-switch for retrieved content.
//!
//! A crude token estimate gates pathological inputs before they touch the
//! budget ledger or the provider. Word count scaled by 1.3 tracks BPE
//! tokenization closely enough for a guardrail; the ceiling is a tunable
//! safety margin, not an exact accounting of provider cost. The estimate
//! covers retrieved content only, not the full prompt.

/// Tokens-per-word scaling factor for the estimate.
const TOKENS_PER_WORD: f64 = 1.3;

/// Default ceiling on estimated tokens of retrieved content.
pub const DEFAULT_COST_CEILING: u64 = 300;

/// Estimate the token cost of a block of text.
pub fn estimate_tokens(text: &str) -> u64 {
    let words = text.split_whitespace().count() as f64;
    (words * TOKENS_PER_WORD).ceil() as u64
}

/// Whether the estimated cost of `text` exceeds `ceiling`.
pub fn exceeds_ceiling(text: &str, ceiling: u64) -> bool {
    estimate_tokens(text) > ceiling
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_scales_word_count() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("one"), 2); // ceil(1.3)
        assert_eq!(estimate_tokens("one two three four"), 6); // ceil(5.2)
    }

    #[test]
    fn estimate_ignores_extra_whitespace() {
        assert_eq!(
            estimate_tokens("a  b\t c \n d"),
            estimate_tokens("a b c d")
        );
    }

    #[test]
    fn ceiling_boundary() {
        // 230 words → 299 estimated tokens, just under the default ceiling.
        let under = vec!["word"; 230].join(" ");
        assert!(!exceeds_ceiling(&under, DEFAULT_COST_CEILING));

        // 231 words → 301 estimated tokens, over the ceiling.
        let over = vec!["word"; 231].join(" ");
        assert!(exceeds_ceiling(&over, DEFAULT_COST_CEILING));
    }
}
