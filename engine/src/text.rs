use lazy_static::lazy_static;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    /// Closed stopword list for the catalog's language (Slovak plus the
    /// handful of English function words that show up in queries).
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a", "je", "to", "na", "v", "sa", "so", "pre", "ako", "ze", "ma", "mi", "me", "si", "su", "som",
            "ale", "alebo", "aj", "ani", "az", "ak", "bo", "by", "co", "ci", "do", "ho", "im", "ju", "ka", "ku",
            "ne", "ni", "no", "od", "po", "pri", "ta", "te", "ti", "tu", "ty", "uz", "vo", "za",
            "mate", "mam", "chcem", "potrebujem", "hladam", "prosim", "ahoj", "dobry", "den",
            "nejaky", "nejake", "dajaky", "vhodny", "vhodne",
            "the", "and", "or", "is", "are", "this", "that",
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Normalize text for matching: lowercase, NFD decomposition, strip
/// combining diacritics, map non-alphanumerics to spaces, collapse runs of
/// whitespace, trim. Idempotent; empty input yields an empty string.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for c in text.to_lowercase().nfd() {
        if is_combining_mark(c) {
            continue;
        }
        if c.is_alphanumeric() {
            out.push(c);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

fn is_combining_mark(c: char) -> bool {
    // U+0300..U+036F covers the combining marks NFD produces for Latin text.
    ('\u{0300}'..='\u{036F}').contains(&c)
}

/// Split normalized text into tokens, dropping stopwords and tokens shorter
/// than two characters. Order is preserved for phrase heuristics; indexing
/// itself ignores it.
pub fn tokenize(normalized: &str) -> Vec<String> {
    normalized
        .split_whitespace()
        .filter(|t| t.len() >= 2 && !is_stopword(t))
        .map(|t| t.to_string())
        .collect()
}

/// Normalize and tokenize in one step.
pub fn tokenize_raw(text: &str) -> Vec<String> {
    tokenize(&normalize(text))
}
