//! Candidate scoring: lexical BM25 and the heuristic multi-factor mode.
//!
//! Hard filters (availability, explicit opposite-gender) run before either
//! mode. A minimum-score gate decides candidate-set membership before
//! ranking; the gate is stricter when a product type was recognized because
//! type hits alone already clear it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analyze::QueryAnalysis;
use crate::index::IndexMeta;
use crate::lexicon::{PREFERENCES, PROBLEMS, PRODUCT_TYPES};
use crate::product::{Gender, Product};
use crate::text::normalize;

pub const BM25_K1: f32 = 1.2;
pub const BM25_B: f32 = 0.75;

const TYPE_CAP: f32 = 40.0;
const LINE_CAP: f32 = 30.0;
const GROUP_CAP: f32 = 25.0;
const PROBLEM_CAP: f32 = 15.0;
const PROBLEM_STEP: f32 = 8.0;
const BRAND_CAP: f32 = 15.0;
const DISCOUNT_BONUS: f32 = 10.0;
const AVAILABILITY_BONUS: f32 = 2.0;
const OVERLAP_CAP: f32 = 5.0;
const PREFERENCE_PENALTY: f32 = 10.0;

const GATE_WITH_TYPE: f32 = 20.0;
const GATE_WITHOUT_TYPE: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    #[default]
    Lexical,
    Heuristic,
}

/// Filters applied before scoring, independent of mode.
pub fn passes_hard_filters(product: &Product, analysis: &QueryAnalysis, only_available: bool) -> bool {
    if only_available && !product.available {
        return false;
    }
    // Symmetric exclusion, but only for explicitly expressed gender.
    if analysis.explicit_gender {
        match (analysis.gender, product.target_gender) {
            (Some(Gender::Male), Gender::Female) | (Some(Gender::Female), Gender::Male) => {
                return false
            }
            _ => {}
        }
    }
    true
}

/// Membership gate applied to the scored value.
pub fn score_gate(mode: ScoreMode, analysis: &QueryAnalysis) -> f32 {
    match mode {
        ScoreMode::Lexical => f32::EPSILON,
        ScoreMode::Heuristic => {
            if analysis.product_type.is_some() {
                GATE_WITH_TYPE
            } else {
                GATE_WITHOUT_TYPE
            }
        }
    }
}

/// BM25 over the retrieved postings for one candidate.
pub fn bm25_score(
    postings: &BTreeMap<String, BTreeMap<String, u32>>,
    id: &str,
    doc_len: u32,
    meta: &IndexMeta,
) -> f32 {
    let n = meta.doc_count.max(1) as f32;
    let avgdl = meta.avg_doc_len.max(1.0);
    let dl = doc_len as f32;
    let mut score = 0.0;
    for plist in postings.values() {
        let Some(&tf) = plist.get(id) else { continue };
        let df = plist.len() as f32;
        let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
        let tf = tf as f32;
        let tf_norm = (tf * (BM25_K1 + 1.0)) / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * dl / avgdl));
        score += idf * tf_norm;
    }
    score
}

/// Heuristic multi-factor score with independently capped components.
pub fn heuristic_score(product: &Product, analysis: &QueryAnalysis) -> f32 {
    let title = product.normalized_title();
    let category = normalize(&product.category_path.join(" "));
    let description = normalize(&product.description);
    let composite = normalize(&product.composite_text());

    let mut score = 0.0;
    score += type_component(analysis, &title, &category, &description);
    score += line_component(analysis, &title);
    score += group_component(analysis, product);
    score += problem_component(analysis, &composite);
    score += brand_component(analysis, product, &title);

    if analysis.wants_discount && product.has_discount {
        score += DISCOUNT_BONUS;
    }
    if product.available {
        score += AVAILABILITY_BONUS;
    }

    let overlap = analysis
        .tokens
        .iter()
        .filter(|t| composite.contains(t.as_str()))
        .count() as f32;
    score += overlap.min(OVERLAP_CAP);

    score -= preference_penalty(analysis, &composite);
    score
}

/// Title match outranks category match outranks description match.
fn type_component(analysis: &QueryAnalysis, title: &str, category: &str, description: &str) -> f32 {
    let Some(tag) = analysis.product_type.as_deref() else {
        return 0.0;
    };
    let Some((_, patterns)) = PRODUCT_TYPES.iter().find(|(t, _)| *t == tag) else {
        return 0.0;
    };
    let hit = |text: &str| patterns.iter().any(|p| text.contains(p));
    let raw = if hit(title) {
        TYPE_CAP
    } else if hit(category) {
        30.0
    } else if hit(description) {
        20.0
    } else {
        0.0
    };
    raw.min(TYPE_CAP)
}

/// Full-phrase match beats proportional word overlap.
fn line_component(analysis: &QueryAnalysis, title: &str) -> f32 {
    let Some(line) = analysis.product_line.as_deref() else {
        return 0.0;
    };
    if title.contains(line) {
        return LINE_CAP;
    }
    let words: Vec<&str> = line.split(' ').collect();
    let hits = words.iter().filter(|w| title.contains(**w)).count();
    (hits as f32 / words.len() as f32 * LINE_CAP).min(LINE_CAP)
}

/// Exact gender match, partial credit for unisex products, age-group bonus.
fn group_component(analysis: &QueryAnalysis, product: &Product) -> f32 {
    let mut score: f32 = 0.0;
    if let Some(gender) = analysis.gender {
        if product.target_gender == gender {
            score += 18.0;
        } else if product.target_gender == Gender::Unisex {
            score += 9.0;
        }
    }
    if let Some(age) = analysis.age_group {
        if product.target_age_group == age {
            score += 7.0;
        }
    }
    score.min(GROUP_CAP)
}

fn problem_component(analysis: &QueryAnalysis, composite: &str) -> f32 {
    let mut score = 0.0;
    for tag in &analysis.problems {
        let matched = PROBLEMS
            .iter()
            .find(|(t, _)| t == tag)
            .map_or(false, |(_, patterns)| {
                patterns.iter().any(|p| composite.contains(p))
            });
        if matched {
            score += PROBLEM_STEP;
        }
    }
    score.min(PROBLEM_CAP)
}

/// Exact brand field beats brand-in-title beats partial word overlap.
fn brand_component(analysis: &QueryAnalysis, product: &Product, title: &str) -> f32 {
    if analysis.brands.is_empty() {
        return 0.0;
    }
    let brand_field = product.normalized_brand();
    let mut best: f32 = 0.0;
    for brand in &analysis.brands {
        let component = if brand_field == *brand {
            BRAND_CAP
        } else if title.contains(brand.as_str()) {
            10.0
        } else {
            let words: Vec<&str> = brand.split(' ').collect();
            let hits = words
                .iter()
                .filter(|w| brand_field.contains(**w) || title.contains(**w))
                .count();
            hits as f32 / words.len() as f32 * 6.0
        };
        best = best.max(component);
    }
    best.min(BRAND_CAP)
}

/// A product exhibiting an attribute the user asked to exclude is pushed
/// down; a product that itself carries the preference wording is not.
fn preference_penalty(analysis: &QueryAnalysis, composite: &str) -> f32 {
    let mut penalty = 0.0;
    for tag in &analysis.preferences {
        if let Some((_, patterns, violations)) = PREFERENCES.iter().find(|(t, _, _)| t == tag) {
            let carries_preference = patterns.iter().any(|p| composite.contains(p));
            let violated = violations.iter().any(|v| composite.contains(v));
            if violated && !carries_preference {
                penalty += PREFERENCE_PENALTY;
            }
        }
    }
    penalty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::analyze;
    use crate::product::AgeGroup;

    fn meta() -> IndexMeta {
        IndexMeta {
            doc_count: 100,
            avg_doc_len: 20.0,
            last_sync: "2026-01-01T00:00:00Z".into(),
        }
    }

    fn postings_with_tf(tf: u32) -> BTreeMap<String, BTreeMap<String, u32>> {
        let mut plist = BTreeMap::new();
        plist.insert("p1".to_string(), tf);
        plist.insert("p2".to_string(), 1);
        let mut postings = BTreeMap::new();
        postings.insert("dezodorant".to_string(), plist);
        postings
    }

    fn product(gender: Gender, available: bool) -> Product {
        Product {
            id: "p1".into(),
            title: "Old Spice Whitewater dezodorant".into(),
            brand: "Old Spice".into(),
            category_path: vec!["Drogeria".into(), "Dezodoranty".into()],
            category: "Drogeria | Dezodoranty".into(),
            price: 4.99,
            sale_price: None,
            has_discount: false,
            discount_percent: 0,
            available,
            description: "Pánsky dezodorant s vôňou Whitewater".into(),
            image: None,
            url: None,
            target_gender: gender,
            target_age_group: AgeGroup::Adult,
        }
    }

    #[test]
    fn bm25_is_nondecreasing_in_tf() {
        let m = meta();
        let low = bm25_score(&postings_with_tf(1), "p1", 20, &m);
        let high = bm25_score(&postings_with_tf(5), "p1", 20, &m);
        assert!(high > low);
    }

    #[test]
    fn bm25_average_length_doc_gets_no_length_adjustment() {
        let m = meta();
        let postings = postings_with_tf(3);
        let at_avg = bm25_score(&postings, "p1", 20, &m);
        // With dl == avgdl the normalization term collapses to tf + k1.
        let tf = 3.0f32;
        let df = 2.0f32;
        let idf = ((100.0 - df + 0.5) / (df + 0.5) + 1.0).ln();
        let expected = idf * (tf * (BM25_K1 + 1.0)) / (tf + BM25_K1);
        assert!((at_avg - expected).abs() < 1e-5);
    }

    #[test]
    fn hard_filter_excludes_opposite_gender_both_ways() {
        let male_q = analyze("dezodorant pre mužov");
        let female_q = analyze("dezodorant pre ženy");
        let male_p = product(Gender::Male, true);
        let female_p = product(Gender::Female, true);
        assert!(!passes_hard_filters(&female_p, &male_q, true));
        assert!(!passes_hard_filters(&male_p, &female_q, true));
        assert!(passes_hard_filters(&male_p, &male_q, true));
    }

    #[test]
    fn hard_filter_excludes_unavailable() {
        let q = analyze("dezodorant pre mužov");
        assert!(!passes_hard_filters(&product(Gender::Male, false), &q, true));
        assert!(passes_hard_filters(&product(Gender::Male, false), &q, false));
    }

    #[test]
    fn discount_bonus_requires_intent() {
        let mut p = product(Gender::Male, true);
        p.has_discount = true;
        let with_intent = heuristic_score(&p, &analyze("dezodorant pre mužov v akcii"));
        let without_intent = heuristic_score(&p, &analyze("dezodorant pre mužov"));
        assert!(with_intent > without_intent);
    }

    #[test]
    fn exact_brand_outscores_partial() {
        let q = analyze("old spice dezodorant pre mužov");
        let exact = product(Gender::Male, true);
        let mut other = product(Gender::Male, true);
        other.brand = "Nivea".into();
        other.title = "Nivea Men dezodorant".into();
        assert!(heuristic_score(&exact, &q) > heuristic_score(&other, &q));
    }

    #[test]
    fn group_component_caps_gender_and_age_contributions() {
        let q = analyze("dezodorant pre mužov pre deti");
        let mut p = product(Gender::Male, true);
        p.target_age_group = AgeGroup::Kids;
        // Exact gender (18) plus age group (7) stays within the cap.
        assert!((group_component(&q, &p) - GROUP_CAP).abs() < f32::EPSILON);
        let unisex = product(Gender::Unisex, true);
        assert!((group_component(&q, &unisex) - 9.0).abs() < f32::EPSILON);
    }

    #[test]
    fn gate_is_stricter_with_recognized_type() {
        let with_type = analyze("dezodorant pre mužov");
        let without_type = analyze("nieco pre mužov nivea");
        assert!(
            score_gate(ScoreMode::Heuristic, &with_type)
                > score_gate(ScoreMode::Heuristic, &without_type)
        );
    }
}
