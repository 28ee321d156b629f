//! Retrieval-and-ranking engine for a conversational product-search
//! assistant: text normalization, query-intent analysis, inverted-index
//! construction from catalog snapshots, tiered candidate retrieval, and
//! multi-factor scoring with brand diversification.

pub mod analyze;
pub mod cache;
pub mod diversify;
pub mod engine;
pub mod error;
pub mod index;
pub mod lexicon;
pub mod product;
pub mod retrieve;
pub mod score;
pub mod store;
pub mod text;

pub use analyze::{analyze, QueryAnalysis};
pub use engine::{EngineConfig, SearchEngine, SearchOptions, SearchResponse};
pub use error::{EngineError, Result};
pub use product::{AgeGroup, CatalogSnapshot, Gender, Product};
pub use retrieve::MatchTier;
pub use score::ScoreMode;
pub use store::{KvStore, MemoryStore, SledStore};
