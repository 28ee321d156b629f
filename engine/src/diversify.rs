//! Brand-balanced re-ranking for multi-brand comparison queries.

use std::collections::HashSet;

/// Re-rank already-scored candidates so one dominant brand cannot crowd the
/// others out. Only active for two or more detected brands: each brand gets
/// a quota of `max(2, ceil(limit / brands))` slots, picks are deduplicated
/// by product id, and the union is re-sorted by score and truncated.
///
/// `items` must already be sorted by descending score, so per-brand picks
/// take each brand's best candidates.
pub fn diversify_by_brand<T>(
    items: Vec<T>,
    brands: &[String],
    limit: usize,
    id_of: impl Fn(&T) -> String,
    brand_of: impl Fn(&T) -> String,
    score_of: impl Fn(&T) -> f32,
) -> Vec<T> {
    if brands.len() < 2 {
        let mut items = items;
        items.truncate(limit);
        return items;
    }

    let quota = 2.max(limit.div_ceil(brands.len()));
    let mut picked_ids: HashSet<String> = HashSet::new();
    let mut picked_idx: HashSet<usize> = HashSet::new();

    for brand in brands {
        let mut taken = 0;
        for (i, item) in items.iter().enumerate() {
            if taken >= quota {
                break;
            }
            if picked_idx.contains(&i) || !brand_matches(&brand_of(item), brand) {
                continue;
            }
            if picked_ids.insert(id_of(item)) {
                picked_idx.insert(i);
                taken += 1;
            }
        }
    }

    let mut union: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter(|(i, _)| picked_idx.contains(i))
        .map(|(_, item)| item)
        .collect();
    union.sort_by(|a, b| {
        score_of(b)
            .partial_cmp(&score_of(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    union.truncate(limit);
    union
}

/// Whole-word match of a detected brand against the normalized brand field,
/// so a short brand like "fa" never claims slots from an unrelated brand
/// that merely contains it.
fn brand_matches(field: &str, brand: &str) -> bool {
    format!(" {field} ").contains(&format!(" {brand} "))
}
