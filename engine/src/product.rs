use serde::{Deserialize, Serialize};

use crate::text::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Unisex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    Kids,
    Adult,
    Senior,
}

/// One catalog item. Owned by a snapshot and immutable once published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub brand: String,
    /// Ordered category path, most general first.
    pub category_path: Vec<String>,
    /// The raw category string the path was split from.
    pub category: String,
    pub price: f64,
    pub sale_price: Option<f64>,
    pub has_discount: bool,
    pub discount_percent: u32,
    pub available: bool,
    pub description: String,
    pub image: Option<String>,
    pub url: Option<String>,
    pub target_gender: Gender,
    pub target_age_group: AgeGroup,
}

impl Product {
    /// Weighted composite text used for indexing and the scan fallback.
    /// Title and brand count twice; description and the full category path
    /// once each.
    pub fn composite_text(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            self.title,
            self.title,
            self.brand,
            self.brand,
            self.description,
            self.category_path.join(" "),
        )
    }

    pub fn normalized_title(&self) -> String {
        normalize(&self.title)
    }

    pub fn normalized_brand(&self) -> String {
        normalize(&self.brand)
    }
}

/// Full catalog state at one sync point. Replaced wholesale, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub products: Vec<Product>,
    pub doc_count: u64,
    pub avg_doc_len: f32,
    /// RFC3339 timestamp of the sync that produced this snapshot.
    pub last_sync: String,
}

impl CatalogSnapshot {
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }
}

/// Infer the target gender from title and category text. Explicit product
/// tagging is rare in the feed, so this leans on naming conventions.
pub fn infer_gender(text_norm: &str) -> Gender {
    const MALE: &[&str] = &["pansk", "muzsk", "pre muzov", "for men", " men ", " man "];
    const FEMALE: &[&str] = &["damsk", "zensk", "pre zeny", "for women", " women ", " woman "];
    let padded = format!(" {text_norm} ");
    if MALE.iter().any(|p| padded.contains(p)) {
        Gender::Male
    } else if FEMALE.iter().any(|p| padded.contains(p)) {
        Gender::Female
    } else {
        Gender::Unisex
    }
}

pub fn infer_age_group(text_norm: &str) -> AgeGroup {
    const KIDS: &[&str] = &["detsk", "pre deti", "baby", "kids", "junior"];
    const SENIOR: &[&str] = &["senior", "pre seniorov"];
    if KIDS.iter().any(|p| text_norm.contains(p)) {
        AgeGroup::Kids
    } else if SENIOR.iter().any(|p| text_norm.contains(p)) {
        AgeGroup::Senior
    } else {
        AgeGroup::Adult
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_inference_uses_naming_conventions() {
        assert_eq!(infer_gender(&normalize("Pánsky dezodorant Nivea Men")), Gender::Male);
        assert_eq!(infer_gender(&normalize("Dámsky parfum")), Gender::Female);
        assert_eq!(infer_gender(&normalize("Sprchový gél aloe vera")), Gender::Unisex);
    }

    #[test]
    fn age_inference_defaults_to_adult() {
        assert_eq!(infer_age_group("detsky sampon"), AgeGroup::Kids);
        assert_eq!(infer_age_group("sampon proti lupinam"), AgeGroup::Adult);
    }
}
