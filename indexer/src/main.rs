use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine::index::build_index;
use engine::product::{infer_age_group, infer_gender, Product};
use engine::store::SledStore;
use engine::text::normalize;
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One product record as it arrives in the shop feed export. Field names
/// follow the feed, not the index.
#[derive(Debug, Deserialize)]
struct InputProduct {
    id: String,
    #[serde(alias = "name")]
    title: String,
    #[serde(default)]
    brand: String,
    #[serde(default)]
    category: String,
    price: f64,
    #[serde(default)]
    sale_price: Option<f64>,
    #[serde(default = "default_available")]
    available: bool,
    #[serde(default)]
    description: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

fn default_available() -> bool {
    true
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the product search index from shop feed exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from input JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Index store directory
        #[arg(long)]
        store: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, store } => build(&input, &store),
    }
}

fn build(input: &str, store_path: &str) -> Result<()> {
    let mut products: Vec<Product> = Vec::new();
    for file in input_files(Path::new(input)) {
        let before = products.len();
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut products)?;
        } else {
            read_json(&file, &mut products)?;
        }
        tracing::info!(file = %file.display(), records = products.len() - before, "ingested feed file");
    }

    let last_sync = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".into());

    let store = SledStore::open(store_path)
        .with_context(|| format!("opening index store at {store_path}"))?;
    let stats = build_index(&store, &products, &last_sync)?;
    tracing::info!(
        products = stats.products,
        terms = stats.terms,
        store = store_path,
        "index build complete"
    );
    Ok(())
}

fn input_files(input: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
        files.sort();
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

fn read_jsonl(file: &Path, out: &mut Vec<Product>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let input: InputProduct = serde_json::from_str(&line)?;
        out.push(convert(input));
    }
    Ok(())
}

fn read_json(file: &Path, out: &mut Vec<Product>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                let input: InputProduct = serde_json::from_value(v)?;
                out.push(convert(input));
            }
        }
        serde_json::Value::Object(_) => {
            let input: InputProduct = serde_json::from_value(json)?;
            out.push(convert(input));
        }
        _ => {}
    }
    Ok(())
}

/// Turn one feed record into an index product: derive the discount from the
/// price pair, split the category into a path (dropping the marketplace root
/// segment), and infer gender and age group from naming.
fn convert(input: InputProduct) -> Product {
    let (has_discount, discount_percent) = match input.sale_price {
        Some(sale) if sale < input.price && input.price > 0.0 => {
            let pct = ((input.price - sale) / input.price * 100.0).round() as u32;
            (true, pct)
        }
        _ => (false, 0),
    };

    let category_path: Vec<String> = input
        .category
        .split('|')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "Heureka.sk")
        .collect();

    let text_norm = normalize(&format!("{} {}", input.title, category_path.join(" ")));
    let target_gender = infer_gender(&text_norm);
    let target_age_group = infer_age_group(&text_norm);

    Product {
        id: input.id,
        title: input.title,
        brand: input.brand,
        category_path,
        category: input.category,
        price: input.price,
        sale_price: input.sale_price,
        has_discount,
        discount_percent,
        available: input.available,
        description: input.description,
        image: input.image,
        url: input.url,
        target_gender,
        target_age_group,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::product::{AgeGroup, Gender};

    fn feed(id: &str, title: &str, price: f64, sale: Option<f64>) -> InputProduct {
        InputProduct {
            id: id.into(),
            title: title.into(),
            brand: "Nivea".into(),
            category: "Heureka.sk | Drogéria | Dezodoranty".into(),
            price,
            sale_price: sale,
            available: true,
            description: String::new(),
            image: None,
            url: None,
        }
    }

    #[test]
    fn discount_derived_from_price_pair() {
        let p = convert(feed("1", "Nivea Men dezodorant", 4.0, Some(2.0)));
        assert!(p.has_discount);
        assert_eq!(p.discount_percent, 50);

        let p = convert(feed("2", "Nivea Men dezodorant", 4.0, Some(4.0)));
        assert!(!p.has_discount);
        assert_eq!(p.discount_percent, 0);
    }

    #[test]
    fn category_path_drops_marketplace_root() {
        let p = convert(feed("1", "Nivea Men dezodorant", 4.0, None));
        assert_eq!(p.category_path, vec!["Drogéria", "Dezodoranty"]);
    }

    #[test]
    fn gender_and_age_inferred_from_title() {
        let p = convert(feed("1", "Pánsky dezodorant", 4.0, None));
        assert_eq!(p.target_gender, Gender::Male);
        assert_eq!(p.target_age_group, AgeGroup::Adult);

        let p = convert(feed("2", "Detský šampón", 3.0, None));
        assert_eq!(p.target_age_group, AgeGroup::Kids);
    }

    #[test]
    fn jsonl_feed_parses_line_by_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.jsonl");
        std::fs::write(
            &path,
            "{\"id\":\"1\",\"title\":\"Nivea Men dezodorant\",\"price\":4.0}\n\n{\"id\":\"2\",\"name\":\"Dove sprchový gél\",\"price\":3.0}\n",
        )
        .unwrap();
        let mut products = Vec::new();
        read_jsonl(&path, &mut products).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[1].title, "Dove sprchový gél");
    }
}
