//! Candidate retrieval with tiered fallback.
//!
//! Tier order is fixed: exact postings, fuzzy substring over indexed terms,
//! prefix match, then a bounded scan over a capped product sample. The tier
//! that satisfied the query is reported back to the caller. Every tier
//! checks the request deadline before starting; an expired request keeps
//! whatever it has instead of escalating into slower tiers.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::Result;
use crate::index;
use crate::store::{get_value, keys, KvStore};
use crate::text::normalize;

/// Cap on products examined by the last-resort scan tier.
const SCAN_SAMPLE_CAP: usize = 500;
/// Fuzzy substring matching needs a bit of signal to avoid matching half
/// the dictionary; prefix and scan accept shorter tokens.
const FUZZY_MIN_TOKEN: usize = 4;
const FALLBACK_MIN_TOKEN: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Fuzzy,
    Prefix,
    Scan,
}

/// Retrieval output: candidate ids plus the postings that produced them
/// (term → product id → frequency), so the scorer reuses them directly.
#[derive(Debug)]
pub struct Retrieved {
    pub ids: BTreeSet<String>,
    pub postings: BTreeMap<String, BTreeMap<String, u32>>,
    pub tier: MatchTier,
    /// Query terms that hit at least one posting list.
    pub recognized_terms: Vec<String>,
}

impl Retrieved {
    fn empty() -> Self {
        Self {
            ids: BTreeSet::new(),
            postings: BTreeMap::new(),
            tier: MatchTier::Exact,
            recognized_terms: Vec::new(),
        }
    }
}

pub struct Filters<'a> {
    pub category: Option<&'a str>,
    pub brand: Option<&'a str>,
}

/// Retrieve candidates for the expanded query terms, intersected with the
/// optional category/brand filter sets.
pub fn retrieve(
    store: &dyn KvStore,
    terms: &[String],
    filters: &Filters<'_>,
    deadline: Deadline,
) -> Result<Retrieved> {
    let filter_ids = load_filter_ids(store, filters)?;

    let mut result = exact_tier(store, terms)?;
    apply_filters(&mut result, &filter_ids);
    if !result.ids.is_empty() {
        return Ok(result);
    }

    for tier in [MatchTier::Fuzzy, MatchTier::Prefix, MatchTier::Scan] {
        if deadline.expired() {
            tracing::warn!(?tier, "deadline hit, abandoning remaining fallback tiers");
            return Ok(result);
        }
        let mut fallback = match tier {
            MatchTier::Fuzzy => term_match_tier(store, terms, tier, FUZZY_MIN_TOKEN, |term, token| {
                term.contains(token) || (term.len() >= FUZZY_MIN_TOKEN && token.contains(term))
            })?,
            MatchTier::Prefix => term_match_tier(store, terms, tier, FALLBACK_MIN_TOKEN, |term, token| {
                term.starts_with(token)
            })?,
            MatchTier::Scan => scan_tier(store, terms)?,
            MatchTier::Exact => unreachable!(),
        };
        apply_filters(&mut fallback, &filter_ids);
        if !fallback.ids.is_empty() {
            return Ok(fallback);
        }
    }

    Ok(result)
}

fn load_filter_ids(store: &dyn KvStore, filters: &Filters<'_>) -> Result<Option<BTreeSet<String>>> {
    let mut combined: Option<BTreeSet<String>> = None;
    if let Some(category) = filters.category {
        // A filter on an unknown category matches nothing.
        let ids = index::category_ids(store, category)?.unwrap_or_default();
        combined = Some(ids);
    }
    if let Some(brand) = filters.brand {
        let ids = index::brand_ids(store, brand)?.unwrap_or_default();
        combined = Some(match combined {
            Some(prev) => prev.intersection(&ids).cloned().collect(),
            None => ids,
        });
    }
    Ok(combined)
}

// Only candidate ids are filtered. Postings stay complete so that per-term
// document frequencies keep describing the corpus, not the filtered subset.
fn apply_filters(result: &mut Retrieved, filter_ids: &Option<BTreeSet<String>>) {
    if let Some(allowed) = filter_ids {
        result.ids.retain(|id| allowed.contains(id));
    }
}

fn exact_tier(store: &dyn KvStore, terms: &[String]) -> Result<Retrieved> {
    let mut result = Retrieved::empty();
    for term in terms {
        // A single failed lookup degrades relevance, never the request.
        let plist = match index::postings(store, term) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(term = %term, error = %e, "term lookup failed, skipping");
                continue;
            }
        };
        if let Some(plist) = plist {
            if !plist.is_empty() {
                result.ids.extend(plist.keys().cloned());
                result.recognized_terms.push(term.clone());
                result.postings.insert(term.clone(), plist);
            }
        }
    }
    Ok(result)
}

/// Fuzzy and prefix tiers: match query tokens against the indexed term
/// dictionary and union the postings of every matching term.
fn term_match_tier(
    store: &dyn KvStore,
    terms: &[String],
    tier: MatchTier,
    min_token: usize,
    matches: impl Fn(&str, &str) -> bool,
) -> Result<Retrieved> {
    let mut result = Retrieved::empty();
    result.tier = tier;
    let indexed = index::indexed_terms(store)?;
    for token in terms.iter().filter(|t| t.len() >= min_token) {
        let mut hit = false;
        for term in indexed.iter().filter(|term| matches(term, token)) {
            // Same swallow-and-degrade rule as the exact tier.
            let plist = match index::postings(store, term) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(term = %term, error = %e, "term lookup failed, skipping");
                    continue;
                }
            };
            if let Some(plist) = plist {
                result.ids.extend(plist.keys().cloned());
                merge_postings(&mut result.postings, token, plist);
                hit = true;
            }
        }
        if hit {
            result.recognized_terms.push(token.clone());
        }
    }
    Ok(result)
}

/// Last resort: linear scan of composite text over a capped sample of the
/// snapshot. Synthesizes frequency-1 postings for matched tokens.
fn scan_tier(store: &dyn KvStore, terms: &[String]) -> Result<Retrieved> {
    let mut result = Retrieved::empty();
    result.tier = MatchTier::Scan;
    let Some(ids) = get_value::<Vec<String>>(store, keys::SNAPSHOT_IDS)? else {
        return Ok(result);
    };
    for id in ids.iter().take(SCAN_SAMPLE_CAP) {
        let Some(product) = index::product_by_id(store, id)? else {
            continue;
        };
        let text = normalize(&product.composite_text());
        for token in terms.iter().filter(|t| t.len() >= FALLBACK_MIN_TOKEN) {
            if text.contains(token.as_str()) {
                result.ids.insert(id.clone());
                result
                    .postings
                    .entry(token.clone())
                    .or_default()
                    .insert(id.clone(), 1);
                if !result.recognized_terms.contains(token) {
                    result.recognized_terms.push(token.clone());
                }
            }
        }
    }
    Ok(result)
}

fn merge_postings(
    into: &mut BTreeMap<String, BTreeMap<String, u32>>,
    token: &str,
    plist: BTreeMap<String, u32>,
) {
    let entry = into.entry(token.to_string()).or_default();
    for (id, tf) in plist {
        let slot = entry.entry(id).or_insert(0);
        *slot = (*slot).max(tf);
    }
}
