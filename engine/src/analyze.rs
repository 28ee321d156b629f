//! Query analysis: synonym expansion, brand detection, and intent slots.

use serde::Serialize;

use crate::lexicon::{
    BRAND_PHRASES, BRAND_WORDS, DISCOUNT_INTENT, FEMALE_PATTERNS, GENDER_SENSITIVE_TYPES,
    KIDS_PATTERNS, MALE_PATTERNS, PREFERENCES, PROBLEMS, PRODUCT_TYPES, SENIOR_PATTERNS, SYNONYMS,
};
use crate::product::{AgeGroup, Gender};
use crate::text::{normalize, tokenize};

/// Structured intent extracted from one query. Per-request and ephemeral.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnalysis {
    pub normalized: String,
    /// Meaningful tokens after stopword filtering.
    pub tokens: Vec<String>,
    /// Token superset after synonym expansion, ordered and deduplicated.
    pub expanded: Vec<String>,
    pub gender: Option<Gender>,
    /// True when the gender came from an explicit phrase rather than the
    /// kids-slot default. Only explicit gender drives exclusion.
    pub explicit_gender: bool,
    pub age_group: Option<AgeGroup>,
    pub product_type: Option<String>,
    pub problems: Vec<String>,
    pub preferences: Vec<String>,
    pub wants_discount: bool,
    pub brands: Vec<String>,
    /// Two-word variant-name phrase, e.g. "pearl beauty".
    pub product_line: Option<String>,
    pub needs_clarification: bool,
    pub clarification_question: Option<String>,
}

fn contains_any(haystack: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| haystack.contains(p))
}

fn contains_word(normalized: &str, word: &str) -> bool {
    normalized.split(' ').any(|t| t == word)
}

/// Expand query tokens with synonym groups. A group fires when a token
/// matches its key or any variant, exactly or as a substring (three
/// characters minimum for substring hits); the canonical key and all
/// variants then join the working set.
pub fn expand_tokens(tokens: &[String]) -> Vec<String> {
    let mut expanded: Vec<String> = tokens.to_vec();
    let push = |set: &mut Vec<String>, term: &str| {
        if !set.iter().any(|t| t == term) {
            set.push(term.to_string());
        }
    };
    for token in tokens {
        for (key, variants) in SYNONYMS {
            let hit = entry_matches(token, key) || variants.iter().any(|v| entry_matches(token, v));
            if hit {
                push(&mut expanded, key);
                for v in *variants {
                    push(&mut expanded, v);
                }
            }
        }
    }
    expanded
}

fn entry_matches(token: &str, entry: &str) -> bool {
    token == entry
        || (token.len() >= 3 && entry.len() >= 3 && (entry.contains(token) || token.contains(entry)))
}

/// Expansion used on the document side at index time. Only canonical keys
/// are added; the query side carries the full variant sets, so key-level
/// overlap is enough for matching without bloating doc lengths.
pub fn expand_for_index(tokens: &[String]) -> Vec<String> {
    let mut out: Vec<String> = tokens.to_vec();
    for token in tokens {
        for (key, variants) in SYNONYMS {
            if token != key
                && (entry_matches(token, key) || variants.iter().any(|v| entry_matches(token, v)))
                && !out.iter().any(|t| t == key)
            {
                out.push(key.to_string());
            }
        }
    }
    out
}

/// Detect brands in the full normalized query. Multi-word phrases win over
/// single words on the same span; brands of three characters or fewer only
/// match whole words, longer ones may match as substrings. The result is
/// ordered by position in the query and deduplicated.
pub fn detect_brands(normalized: &str) -> Vec<String> {
    let padded = format!(" {normalized} ");
    let mut spans: Vec<(usize, usize, &str)> = Vec::new();

    for phrase in BRAND_PHRASES {
        if let Some(pos) = normalized.find(phrase) {
            spans.push((pos, pos + phrase.len(), phrase));
        }
    }
    for word in BRAND_WORDS {
        // With one leading pad space, a hit at padded index p starts at
        // normalized index p.
        let start = if word.len() <= 3 {
            padded.find(&format!(" {word} "))
        } else {
            normalized.find(word)
        };
        if let Some(start) = start {
            let end = start + word.len();
            let overlaps = spans.iter().any(|(s, e, _)| start < *e && *s < end);
            if !overlaps {
                spans.push((start, end, word));
            }
        }
    }

    spans.sort_by_key(|(s, _, _)| *s);
    let mut brands: Vec<String> = Vec::new();
    for (_, _, name) in spans {
        if !brands.iter().any(|b| b == name) {
            brands.push(name.to_string());
        }
    }
    brands
}

/// Analyze a raw query into intent slots, in fixed priority order: gender,
/// age group, product type (first match in the ordered table), problems,
/// preferences, discount intent, brands, product-line phrase.
pub fn analyze(query: &str) -> QueryAnalysis {
    let normalized = normalize(query);
    let tokens = tokenize(&normalized);
    let expanded = expand_tokens(&tokens);
    let brands = detect_brands(&normalized);

    let mut gender = None;
    let mut explicit_gender = false;
    let mut age_group = None;

    if contains_any(&normalized, KIDS_PATTERNS) {
        age_group = Some(AgeGroup::Kids);
        gender = Some(Gender::Unisex);
    }
    if contains_any(&normalized, MALE_PATTERNS) {
        gender = Some(Gender::Male);
        explicit_gender = true;
    } else if contains_any(&normalized, FEMALE_PATTERNS) {
        gender = Some(Gender::Female);
        explicit_gender = true;
    }
    if age_group.is_none() && contains_any(&normalized, SENIOR_PATTERNS) {
        age_group = Some(AgeGroup::Senior);
    }

    let product_type = PRODUCT_TYPES
        .iter()
        .find(|(_, patterns)| contains_any(&normalized, patterns))
        .map(|(tag, _)| tag.to_string());

    let problems: Vec<String> = PROBLEMS
        .iter()
        .filter(|(_, patterns)| contains_any(&normalized, patterns))
        .map(|(tag, _)| tag.to_string())
        .collect();

    let preferences: Vec<String> = PREFERENCES
        .iter()
        .filter(|(_, patterns, _)| contains_any(&normalized, patterns))
        .map(|(tag, _, _)| tag.to_string())
        .collect();

    let wants_discount = DISCOUNT_INTENT.iter().any(|w| contains_word(&normalized, w));

    let product_line = find_product_line(&tokens, &brands, product_type.as_deref());

    let (needs_clarification, clarification_question) = clarification(
        &tokens,
        product_type.as_deref(),
        gender,
        &brands,
        product_line.as_deref(),
    );

    QueryAnalysis {
        normalized,
        tokens,
        expanded,
        gender,
        explicit_gender,
        age_group,
        product_type,
        problems,
        preferences,
        wants_discount,
        brands,
        product_line,
        needs_clarification,
        clarification_question,
    }
}

/// Two adjacent tokens nothing else claimed, both reasonably long, read as a
/// variant name ("pearl beauty", "fresh kick"). First such pair wins.
fn find_product_line(tokens: &[String], brands: &[String], product_type: Option<&str>) -> Option<String> {
    let recognized = |t: &str| {
        brands.iter().any(|b| b.split(' ').any(|w| w == t))
            || product_type.map_or(false, |pt| pt.split(' ').any(|w| w == t))
            || PRODUCT_TYPES
                .iter()
                .any(|(_, patterns)| patterns.iter().any(|p| p.split(' ').any(|w| w == t)))
            || MALE_PATTERNS.iter().chain(FEMALE_PATTERNS).chain(KIDS_PATTERNS).any(|p| p.contains(t))
            || DISCOUNT_INTENT.contains(&t)
    };
    tokens.windows(2).find_map(|pair| {
        let (a, b) = (pair[0].as_str(), pair[1].as_str());
        if a.len() >= 4 && b.len() >= 4 && !recognized(a) && !recognized(b) {
            Some(format!("{a} {b}"))
        } else {
            None
        }
    })
}

fn clarification(
    tokens: &[String],
    product_type: Option<&str>,
    gender: Option<Gender>,
    brands: &[String],
    product_line: Option<&str>,
) -> (bool, Option<String>) {
    // A named brand or variant already pins the product down; only a bare
    // gender-sensitive type is worth a follow-up question.
    if let Some(pt) = product_type {
        if gender.is_none()
            && brands.is_empty()
            && product_line.is_none()
            && GENDER_SENSITIVE_TYPES.contains(&pt)
        {
            return (
                true,
                Some(format!(
                    "Pre koho hľadáte {pt}? Pre muža, ženu, alebo má byť unisex?"
                )),
            );
        }
    }
    if tokens.len() < 2 && product_type.is_none() && brands.is_empty() {
        return (
            true,
            Some("Môžete upresniť, aký produkt alebo značku hľadáte?".to_string()),
        );
    }
    (false, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_brand_needs_word_boundary() {
        assert!(detect_brands("dezodorant axe africa").contains(&"axe".to_string()));
        // "fa" must not fire inside an unrelated longer word
        assert!(detect_brands("fantasticky krem na ruky").is_empty());
        assert_eq!(detect_brands("mydlo fa"), vec!["fa"]);
    }

    #[test]
    fn multiword_brand_detected_as_unit() {
        let brands = detect_brands("dezodorant old spice whitewater");
        assert_eq!(brands, vec!["old spice"]);
    }

    #[test]
    fn multi_brand_query_keeps_order() {
        let brands = detect_brands("porovnaj nivea a old spice dezodoranty");
        assert_eq!(brands, vec!["nivea", "old spice"]);
    }

    #[test]
    fn kids_phrase_sets_both_slots() {
        let a = analyze("šampón pre deti");
        assert_eq!(a.age_group, Some(AgeGroup::Kids));
        assert_eq!(a.gender, Some(Gender::Unisex));
        assert!(!a.explicit_gender);
        assert!(!a.needs_clarification);
    }

    #[test]
    fn explicit_gender_wins_over_kids_default() {
        let a = analyze("pánsky šampón pre deti");
        assert_eq!(a.gender, Some(Gender::Male));
        assert!(a.explicit_gender);
    }

    #[test]
    fn gender_sensitive_type_without_gender_asks_back() {
        let a = analyze("dezodorant");
        assert!(a.needs_clarification);
        assert!(a.clarification_question.is_some());
    }

    #[test]
    fn brand_pinned_type_skips_clarification() {
        // A named brand already narrows the catalog enough to rank; asking
        // for a gender here would also break exact-title queries, which
        // must return results.
        let a = analyze("nivea dezodorant");
        assert_eq!(a.brands, vec!["nivea"]);
        assert!(!a.needs_clarification);
        let a = analyze("old spice whitewater dezodorant");
        assert!(!a.needs_clarification);
    }

    #[test]
    fn stopword_only_query_asks_back() {
        let a = analyze("mate nejaky a to je");
        assert!(a.needs_clarification);
        assert!(a.clarification_question.is_some());
        assert!(a.tokens.len() < 2);
    }

    #[test]
    fn full_query_fills_slots() {
        let a = analyze("lacný dezodorant pre mužov proti poteniu od nivea");
        assert_eq!(a.gender, Some(Gender::Male));
        assert_eq!(a.product_type.as_deref(), Some("dezodorant"));
        assert_eq!(a.problems, vec!["potenie"]);
        assert!(a.wants_discount);
        assert_eq!(a.brands, vec!["nivea"]);
        assert!(!a.needs_clarification);
    }

    #[test]
    fn product_line_pairs_leftover_tokens() {
        let a = analyze("nivea pearl beauty dezodorant");
        assert_eq!(a.product_line.as_deref(), Some("pearl beauty"));
    }

    #[test]
    fn synonyms_expand_bidirectionally() {
        let expanded = expand_tokens(&["deo".to_string()]);
        assert!(expanded.iter().any(|t| t == "dezodorant"));
        assert!(expanded.iter().any(|t| t == "antiperspirant"));
    }
}
