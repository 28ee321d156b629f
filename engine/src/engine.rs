//! The search engine facade tying analysis, retrieval, scoring and
//! diversification together over one store and one snapshot cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::analyze::{analyze, QueryAnalysis};
use crate::cache::SnapshotCache;
use crate::diversify::diversify_by_brand;
use crate::error::Result;
use crate::index::{self, IndexMeta, IndexStats};
use crate::product::Product;
use crate::retrieve::{retrieve, Deadline, Filters, MatchTier};
use crate::score::{bm25_score, heuristic_score, passes_hard_filters, score_gate, ScoreMode};
use crate::store::{keys, KvStore};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
    pub score_mode: ScoreMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            request_timeout: Duration::from_millis(2_000),
            score_mode: ScoreMode::Lexical,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub only_available: bool,
    pub mode: Option<ScoreMode>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            category: None,
            brand: None,
            only_available: true,
            mode: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScoredProduct {
    #[serde(flatten)]
    pub product: Product,
    pub score: f32,
    pub match_tier: MatchTier,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub products: Vec<ScoredProduct>,
    /// Candidates clearing the score gate, before the limit cut.
    pub total: usize,
    /// Query terms that matched the index.
    pub recognized_terms: Vec<String>,
    pub detected_brands: Vec<String>,
    pub analysis: QueryAnalysis,
    pub needs_clarification: bool,
    pub clarification_question: Option<String>,
    /// True when no snapshot/index has been published yet, so an empty
    /// result means "no data" rather than "no match".
    pub source_unavailable: bool,
}

#[derive(Debug, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct EngineStats {
    pub product_count: u64,
    pub last_sync: String,
    pub category_count: usize,
    pub brand_count: usize,
    pub top_categories: Vec<NamedCount>,
    pub top_brands: Vec<NamedCount>,
}

pub struct SearchEngine {
    store: Arc<dyn KvStore>,
    cache: SnapshotCache,
    config: EngineConfig,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn KvStore>, config: EngineConfig) -> Self {
        let cache = SnapshotCache::new(store.clone(), config.cache_ttl);
        Self {
            store,
            cache,
            config,
        }
    }

    /// Rebuild the index from a fresh product list and invalidate the cache.
    /// A failed rebuild leaves the previously committed index serving.
    pub fn sync(&self, products: &[Product], last_sync: &str) -> Result<IndexStats> {
        let stats = index::build_index(self.store.as_ref(), products, last_sync)?;
        self.cache.invalidate();
        Ok(stats)
    }

    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let analysis = analyze(query);
        tracing::debug!(
            query,
            tokens = analysis.tokens.len(),
            brands = ?analysis.brands,
            product_type = ?analysis.product_type,
            "query analyzed"
        );

        if analysis.needs_clarification {
            return Ok(Self::response(Vec::new(), 0, Vec::new(), analysis, false));
        }

        let Some(snapshot) = self.cache.get()? else {
            return Ok(Self::response(Vec::new(), 0, Vec::new(), analysis, true));
        };
        let meta = IndexMeta {
            doc_count: snapshot.doc_count,
            avg_doc_len: snapshot.avg_doc_len,
            last_sync: snapshot.last_sync.clone(),
        };
        let by_id: HashMap<&str, &Product> =
            snapshot.products.iter().map(|p| (p.id.as_str(), p)).collect();

        let deadline = Deadline::after(self.config.request_timeout);
        let filters = Filters {
            category: options.category.as_deref(),
            brand: options.brand.as_deref(),
        };
        let retrieved = retrieve(self.store.as_ref(), &analysis.expanded, &filters, deadline)?;

        let mode = options.mode.unwrap_or(self.config.score_mode);
        let gate = score_gate(mode, &analysis);
        let mut scored: Vec<ScoredProduct> = Vec::new();
        for id in &retrieved.ids {
            let Some(&product) = by_id.get(id.as_str()) else {
                continue;
            };
            if !passes_hard_filters(product, &analysis, options.only_available) {
                continue;
            }
            let score = match mode {
                ScoreMode::Lexical => {
                    let doc_len = index::doc_length(self.store.as_ref(), id)
                        .unwrap_or(None)
                        .unwrap_or(meta.avg_doc_len.round() as u32);
                    bm25_score(&retrieved.postings, id, doc_len, &meta)
                }
                ScoreMode::Heuristic => heuristic_score(product, &analysis),
            };
            if score >= gate {
                scored.push(ScoredProduct {
                    product: product.clone(),
                    score,
                    match_tier: retrieved.tier,
                });
            }
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        let total = scored.len();

        let products = if analysis.brands.len() > 1 {
            diversify_by_brand(
                scored,
                &analysis.brands,
                options.limit,
                |s| s.product.id.clone(),
                |s| s.product.normalized_brand(),
                |s| s.score,
            )
        } else {
            let mut scored = scored;
            scored.truncate(options.limit);
            scored
        };

        Ok(Self::response(
            products,
            total,
            retrieved.recognized_terms,
            analysis,
            false,
        ))
    }

    fn response(
        products: Vec<ScoredProduct>,
        total: usize,
        recognized_terms: Vec<String>,
        analysis: QueryAnalysis,
        source_unavailable: bool,
    ) -> SearchResponse {
        SearchResponse {
            products,
            total,
            recognized_terms,
            detected_brands: analysis.brands.clone(),
            needs_clarification: analysis.needs_clarification,
            clarification_question: analysis.clarification_question.clone(),
            analysis,
            source_unavailable,
        }
    }

    /// Available discounted products, deepest discount first.
    pub fn discounted_products(&self, limit: usize) -> Result<Vec<Product>> {
        let Some(snapshot) = self.cache.get()? else {
            return Ok(Vec::new());
        };
        let mut discounted: Vec<Product> = snapshot
            .products
            .iter()
            .filter(|p| p.has_discount && p.available)
            .cloned()
            .collect();
        discounted.sort_by(|a, b| b.discount_percent.cmp(&a.discount_percent));
        discounted.truncate(limit);
        Ok(discounted)
    }

    pub fn categories(&self) -> Result<Vec<NamedCount>> {
        self.named_counts(keys::CATEGORY_PREFIX)
    }

    pub fn brands(&self) -> Result<Vec<NamedCount>> {
        self.named_counts(keys::BRAND_PREFIX)
    }

    fn named_counts(&self, prefix: &str) -> Result<Vec<NamedCount>> {
        let mut out = Vec::new();
        for key in self.store.scan_prefix(prefix)? {
            let name = key[prefix.len()..].to_string();
            let ids: Option<std::collections::BTreeSet<String>> =
                crate::store::get_value(self.store.as_ref(), &key)?;
            out.push(NamedCount {
                name,
                count: ids.map_or(0, |s| s.len()),
            });
        }
        out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        Ok(out)
    }

    pub fn stats(&self) -> Result<EngineStats> {
        let meta = index::load_meta(self.store.as_ref())?;
        let mut categories = self.categories()?;
        let mut brands = self.brands()?;
        let (category_count, brand_count) = (categories.len(), brands.len());
        categories.truncate(5);
        brands.truncate(5);
        Ok(EngineStats {
            product_count: meta.as_ref().map_or(0, |m| m.doc_count),
            last_sync: meta.map_or_else(|| "unknown".to_string(), |m| m.last_sync),
            category_count,
            brand_count,
            top_categories: categories,
            top_brands: brands,
        })
    }

    pub fn product_by_id(&self, id: &str) -> Result<Option<Product>> {
        index::product_by_id(self.store.as_ref(), id)
    }
}
