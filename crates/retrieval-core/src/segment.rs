use common::SentenceSplitter;

/// Default sentence segmentation: breaks on terminal punctuation (`.`, `!`,
/// `?`) followed by whitespace or end of text, collapsing internal runs of
/// whitespace. Order-preserving and merge-free, as the segmentation contract
/// requires. Callers with better models (abbreviation-aware, multilingual)
/// can substitute their own implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSplitter;

impl SentenceSplitter for RuleSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut current = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            current.push(c);
            if matches!(c, '.' | '!' | '?') {
                let boundary = chars.peek().is_none_or(|next| next.is_whitespace());
                if boundary {
                    push_sentence(&mut sentences, &current);
                    current.clear();
                }
            }
        }
        push_sentence(&mut sentences, &current);
        sentences
    }
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !normalized.is_empty() {
        sentences.push(normalized);
    }
}
