use crate::types::TermCounts;

/// Word characters: letters, digits and underscore
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokenize text for indexing and querying (lowercase, split on non-word characters)
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !is_word_char(c))
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Count occurrences of each token
pub fn term_counts(tokens: &[String]) -> TermCounts {
    let mut counts = TermCounts::new();
    for token in tokens {
        *counts.entry(token.clone()).or_insert(0) += 1;
    }
    counts
}

/// Tokenized document ready to be inserted into the index
#[derive(Debug, Clone, Default)]
pub struct Analyzed {
    pub counts: TermCounts,
    pub length: u32,
}

/// Tokenize and count a document in one pass
pub fn analyze(text: &str) -> Analyzed {
    let tokens = tokenize(text);
    Analyzed {
        length: tokens.len() as u32,
        counts: term_counts(&tokens),
    }
}
