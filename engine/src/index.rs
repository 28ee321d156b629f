//! Inverted-index construction and read-side accessors.
//!
//! The index is a deterministic function of the last committed snapshot.
//! A rebuild deletes stale keys in bounded batches, writes the new postings
//! and sets, and commits summary metadata last, so the metadata never
//! describes an index that is not fully written. Readers racing a rebuild
//! may transiently mix old and new postings; that eventual-consistency
//! window is accepted and documented rather than papered over.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::analyze::expand_for_index;
use crate::error::Result;
use crate::product::{CatalogSnapshot, Product};
use crate::store::{get_value, keys, set_value, KvStore};
use crate::text::{normalize, tokenize};

const DELETE_BATCH: usize = 256;

/// Summary metadata, committed last during a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub doc_count: u64,
    pub avg_doc_len: f32,
    pub last_sync: String,
}

#[derive(Debug, Serialize)]
pub struct IndexStats {
    pub products: usize,
    pub terms: usize,
    pub categories: usize,
    pub brands: usize,
    pub avg_doc_len: f32,
}

/// Build the full index from a snapshot and commit it to the store.
pub fn build_index(store: &dyn KvStore, products: &[Product], last_sync: &str) -> Result<IndexStats> {
    let mut postings: HashMap<String, BTreeMap<String, u32>> = HashMap::new();
    let mut doc_lengths: BTreeMap<String, u32> = BTreeMap::new();
    let mut categories: HashMap<String, BTreeSet<String>> = HashMap::new();
    let mut brands: HashMap<String, BTreeSet<String>> = HashMap::new();
    let mut total_tokens: u64 = 0;

    for product in products {
        let tokens = tokenize(&normalize(&product.composite_text()));
        let expanded = expand_for_index(&tokens);
        let doc_len = expanded.len() as u32;
        total_tokens += doc_len as u64;
        doc_lengths.insert(product.id.clone(), doc_len);

        for term in expanded {
            *postings
                .entry(term)
                .or_default()
                .entry(product.id.clone())
                .or_insert(0) += 1;
        }

        for part in &product.category_path {
            let key = normalize(part);
            if !key.is_empty() {
                categories.entry(key).or_default().insert(product.id.clone());
            }
        }
        let brand_key = product.normalized_brand();
        if !brand_key.is_empty() {
            brands.entry(brand_key).or_default().insert(product.id.clone());
        }
    }

    let avg_doc_len = if products.is_empty() {
        0.0
    } else {
        total_tokens as f32 / products.len() as f32
    };

    clear_stale(store)?;

    for product in products {
        set_value(store, &keys::product(&product.id), product)?;
    }
    let ids: Vec<String> = products.iter().map(|p| p.id.clone()).collect();
    set_value(store, keys::SNAPSHOT_IDS, &ids)?;

    for (term, plist) in &postings {
        set_value(store, &keys::term(term), plist)?;
    }
    for (id, len) in &doc_lengths {
        set_value(store, &keys::doc_len(id), len)?;
    }
    for (cat, ids) in &categories {
        set_value(store, &keys::category(cat), ids)?;
    }
    for (brand, ids) in &brands {
        set_value(store, &keys::brand(brand), ids)?;
    }

    // Metadata goes in last: readers treat its presence as the commit point.
    let meta = IndexMeta {
        doc_count: products.len() as u64,
        avg_doc_len,
        last_sync: last_sync.to_string(),
    };
    set_value(store, keys::META_COUNT, &meta.doc_count)?;
    set_value(store, keys::META_AVG_LEN, &meta.avg_doc_len)?;
    set_value(store, keys::META_LAST_SYNC, &meta.last_sync)?;
    store.flush()?;

    tracing::info!(
        products = products.len(),
        terms = postings.len(),
        avg_doc_len,
        "index committed"
    );

    Ok(IndexStats {
        products: products.len(),
        terms: postings.len(),
        categories: categories.len(),
        brands: brands.len(),
        avg_doc_len,
    })
}

/// Delete the previous snapshot's keys in bounded batches before any new
/// posting is written.
fn clear_stale(store: &dyn KvStore) -> Result<()> {
    for prefix in [
        keys::TERM_PREFIX,
        keys::CATEGORY_PREFIX,
        keys::BRAND_PREFIX,
        keys::DOCLEN_PREFIX,
        keys::PRODUCT_PREFIX,
    ] {
        let stale = store.scan_prefix(prefix)?;
        for chunk in stale.chunks(DELETE_BATCH) {
            store.remove_batch(chunk)?;
        }
    }
    Ok(())
}

pub fn load_meta(store: &dyn KvStore) -> Result<Option<IndexMeta>> {
    let doc_count: Option<u64> = get_value(store, keys::META_COUNT)?;
    let avg_doc_len: Option<f32> = get_value(store, keys::META_AVG_LEN)?;
    let last_sync: Option<String> = get_value(store, keys::META_LAST_SYNC)?;
    Ok(match (doc_count, avg_doc_len, last_sync) {
        (Some(doc_count), Some(avg_doc_len), Some(last_sync)) => Some(IndexMeta {
            doc_count,
            avg_doc_len,
            last_sync,
        }),
        _ => None,
    })
}

/// Postings for one term: product id → term frequency.
pub fn postings(store: &dyn KvStore, term: &str) -> Result<Option<BTreeMap<String, u32>>> {
    get_value(store, &keys::term(term))
}

pub fn doc_length(store: &dyn KvStore, id: &str) -> Result<Option<u32>> {
    get_value(store, &keys::doc_len(id))
}

pub fn category_ids(store: &dyn KvStore, category: &str) -> Result<Option<BTreeSet<String>>> {
    get_value(store, &keys::category(&normalize(category)))
}

pub fn brand_ids(store: &dyn KvStore, brand: &str) -> Result<Option<BTreeSet<String>>> {
    get_value(store, &keys::brand(&normalize(brand)))
}

pub fn product_by_id(store: &dyn KvStore, id: &str) -> Result<Option<Product>> {
    get_value(store, &keys::product(id))
}

/// All indexed terms, prefix stripped. Used by the fuzzy/prefix fallbacks.
pub fn indexed_terms(store: &dyn KvStore) -> Result<Vec<String>> {
    Ok(store
        .scan_prefix(keys::TERM_PREFIX)?
        .into_iter()
        .map(|k| k[keys::TERM_PREFIX.len()..].to_string())
        .collect())
}

/// Load the published snapshot from the store, or None before first sync.
pub fn load_snapshot(store: &dyn KvStore) -> Result<Option<CatalogSnapshot>> {
    let Some(meta) = load_meta(store)? else {
        return Ok(None);
    };
    let Some(ids) = get_value::<Vec<String>>(store, keys::SNAPSHOT_IDS)? else {
        return Ok(None);
    };
    let mut products = Vec::with_capacity(ids.len());
    for id in &ids {
        if let Some(product) = product_by_id(store, id)? {
            products.push(product);
        }
    }
    Ok(Some(CatalogSnapshot {
        products,
        doc_count: meta.doc_count,
        avg_doc_len: meta.avg_doc_len,
        last_sync: meta.last_sync,
    }))
}
