//! Text chunking for per-request synthesis size limits
//!
//! The synthesis API behaves best with bounded request sizes, so long text is
//! split into smaller chunks while trying to end each chunk on a sentence
//! boundary. Mid-sentence cuts are audible in synthesized speech; a sentence
//! break too early in the window would leave a degenerate tiny fragment, so
//! breaks before the window midpoint are passed over in favor of a word break.

/// Split `text` into chunks of at most `max_len` characters.
///
/// The scan keeps a cursor and inspects one window of `max_len` characters at
/// a time. If the remaining text fits, it is emitted whole. Otherwise the cut
/// point is, in order of preference: just after the last `.`, `?`, or `!` in
/// the window, provided it falls past the window midpoint; at the last space
/// in the window (the space is consumed); or at exactly `max_len` (a hard
/// mid-word break, the unavoidable degenerate case).
///
/// Every returned chunk is trimmed and non-empty. Empty input yields no
/// chunks; input that already fits yields exactly one trimmed chunk.
#[must_use]
pub fn split_text(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    let chars: Vec<char> = text.chars().collect();

    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        if pos + max_len >= chars.len() {
            push_trimmed(&mut chunks, &chars[pos..]);
            break;
        }

        let window = &chars[pos..pos + max_len];
        let end = match find_sentence_break(window, max_len) {
            Some(cut) => pos + cut,
            None => match window.iter().rposition(|&c| c == ' ') {
                // Cut after the space so it lands on the trimmed edge
                Some(space) => pos + space + 1,
                None => pos + max_len,
            },
        };

        push_trimmed(&mut chunks, &chars[pos..end]);
        pos = end;
    }

    chunks
}

/// Find the offset just past the last sentence-ending punctuation mark in the
/// window, provided it falls past the window midpoint.
fn find_sentence_break(window: &[char], max_len: usize) -> Option<usize> {
    let last = window
        .iter()
        .rposition(|&c| matches!(c, '.' | '?' | '!'))?;
    (last * 2 > max_len).then_some(last + 1)
}

/// Trim a character range and push it if anything remains.
fn push_trimmed(chunks: &mut Vec<String>, chars: &[char]) {
    let segment: String = chars.iter().collect();
    let trimmed = segment.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- basics ----

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(split_text("", 100).is_empty());
    }

    #[test]
    fn whitespace_only_input_yields_no_chunks() {
        assert!(split_text("   \n  ", 100).is_empty());
    }

    #[test]
    fn short_input_yields_single_trimmed_chunk() {
        let result = split_text("  Hello, world!  ", 100);
        assert_eq!(result, vec!["Hello, world!"]);
    }

    #[test]
    fn no_empty_chunks_ever() {
        let result = split_text("a   b   c   d   e", 4);
        assert!(result.iter().all(|c| !c.is_empty()));
    }

    // ---- sentence boundary preference ----

    #[test]
    fn cuts_after_sentence_past_midpoint() {
        // The period at offset 11 falls past half of 15
        let result = split_text("Hello world. This is a test!", 15);
        assert_eq!(result[0], "Hello world.");
        assert!(result.iter().all(|c| c.chars().count() <= 15));
    }

    #[test]
    fn ignores_sentence_break_before_midpoint() {
        // Period at offset 1 is before half of 20; falls back to word break
        let result = split_text("A. bcdef ghijklmnop qrstuv", 20);
        assert!(result[0].chars().count() > 2, "cut too early: {result:?}");
    }

    #[test]
    fn question_and_exclamation_also_break() {
        let result = split_text("Is this ok? Sure thing! More text follows here", 14);
        assert_eq!(result[0], "Is this ok?");
    }

    // ---- word boundary fallback ----

    #[test]
    fn falls_back_to_last_space() {
        let result = split_text("alpha beta gamma delta", 12);
        assert_eq!(result[0], "alpha beta");
        assert!(result.iter().all(|c| c.chars().count() <= 12));
    }

    #[test]
    fn hard_break_when_no_space_or_punctuation() {
        let result = split_text("abcdefghijklmnop", 5);
        assert_eq!(result, vec!["abcde", "fghij", "klmno", "p"]);
    }

    // ---- reconstruction ----

    #[test]
    fn concatenation_preserves_content() {
        let text = "The quick brown fox jumps over the lazy dog. Pack my box \
                    with five dozen liquor jugs! How vexingly quick daft zebras jump?";
        let result = split_text(text, 40);
        let rejoined = result.join(" ");
        let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(normalize(&rejoined), normalize(text));
    }

    #[test]
    fn chunk_lengths_bounded() {
        let text = "word ".repeat(200);
        let result = split_text(&text, 50);
        assert!(result.iter().all(|c| c.chars().count() <= 50));
    }

    // ---- multi-byte safety ----

    #[test]
    fn counts_characters_not_bytes() {
        // Each char is multi-byte; a byte-offset cut would panic or overshoot
        let text = "über café naïve später müde dösen";
        let result = split_text(text, 10);
        assert!(result.iter().all(|c| c.chars().count() <= 10));
        assert!(!result.is_empty());
    }

    // ---- long-form scenario ----

    #[test]
    fn periodic_sentences_land_on_period_boundaries() {
        // ~100-char sentences, no other punctuation; 2000 chars total
        let sentence = format!("{}. ", "x".repeat(98));
        let text = sentence.repeat(20);
        let result = split_text(text.trim(), 800);

        assert_eq!(result.len(), 3);
        for chunk in &result {
            assert!(chunk.ends_with('.'), "chunk not period-aligned: …{}", &chunk[chunk.len() - 5..]);
        }

        // No character loss beyond the one separator consumed per cut
        let total: usize = result.iter().map(|c| c.chars().count()).sum();
        let cuts = result.len() - 1;
        assert_eq!(total, text.trim().chars().count() - cuts);
    }
}
