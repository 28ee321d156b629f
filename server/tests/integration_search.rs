use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use engine::engine::EngineConfig;
use engine::index::build_index;
use engine::product::{AgeGroup, Gender, Product};
use engine::store::{KvStore, MemoryStore, SledStore};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

fn product(id: &str, title: &str, brand: &str, gender: Gender, available: bool) -> Product {
    Product {
        id: id.into(),
        title: title.into(),
        brand: brand.into(),
        category_path: vec!["Drogéria".into(), "Dezodoranty".into()],
        category: "Drogéria | Dezodoranty".into(),
        price: 4.99,
        sale_price: None,
        has_discount: false,
        discount_percent: 0,
        available,
        description: format!("{title} 150 ml"),
        image: None,
        url: None,
        target_gender: gender,
        target_age_group: AgeGroup::Adult,
    }
}

fn catalog() -> Vec<Product> {
    let mut sale = product("p4", "Rexona dezodorant Active", "Rexona", Gender::Unisex, true);
    sale.sale_price = Some(2.49);
    sale.has_discount = true;
    sale.discount_percent = 50;
    vec![
        product("p1", "Old Spice Whitewater dezodorant", "Old Spice", Gender::Male, true),
        product("p2", "Nivea Men dezodorant", "Nivea", Gender::Male, true),
        product("p3", "Nivea Pearl Beauty dezodorant", "Nivea", Gender::Female, true),
        sale,
    ]
}

fn app_over_memory() -> Router {
    let store = Arc::new(MemoryStore::new());
    build_index(store.as_ref(), &catalog(), "2026-08-01T00:00:00Z").unwrap();
    server::build_app_with_store(store, EngineConfig::default())
}

async fn call(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = call(app_over_memory(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let (status, body) = call(
        app_over_memory(),
        "/search?q=old%20spice%20whitewater%20dezodorant",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["query"], "old spice whitewater dezodorant");
    let products = json["products"].as_array().unwrap();
    assert!(!products.is_empty());
    assert_eq!(products[0]["id"], "p1");
    assert!(json["took_s"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn vague_query_returns_clarification_question() {
    let (status, body) = call(app_over_memory(), "/search?q=dezodorant").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["needs_clarification"], true);
    assert!(json["clarification_question"].is_string());
    assert!(json["products"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn gender_filter_applies_over_http() {
    let (status, body) = call(app_over_memory(), "/search?q=dezodorant%20pre%20mu%C5%BEov").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let products = json["products"].as_array().unwrap();
    assert!(products.iter().all(|p| p["id"] != "p3"));
}

#[tokio::test]
async fn discounted_endpoint_lists_sale_items() {
    let (status, body) = call(app_over_memory(), "/discounted?limit=10").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["count"], 1);
    assert_eq!(json["products"][0]["id"], "p4");
}

#[tokio::test]
async fn categories_and_brands_endpoints_report_counts() {
    let app = app_over_memory();
    let (status, body) = call(app.clone(), "/categories").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let categories = json["categories"].as_array().unwrap();
    assert!(categories
        .iter()
        .any(|c| c["name"] == "dezodoranty" && c["count"] == 4));

    let (status, body) = call(app, "/brands").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let brands = json["brands"].as_array().unwrap();
    assert!(brands.iter().any(|b| b["name"] == "nivea" && b["count"] == 2));
}

#[tokio::test]
async fn stats_endpoint_reports_index_state() {
    let (status, body) = call(app_over_memory(), "/stats").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["product_count"], 4);
    assert_eq!(json["last_sync"], "2026-08-01T00:00:00Z");
}

#[tokio::test]
async fn missing_product_is_404() {
    let app = app_over_memory();
    let (status, _) = call(app.clone(), "/product/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = call(app, "/product/p1").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["brand"], "Old Spice");
}

#[tokio::test]
async fn serves_from_a_sled_backed_store() {
    let dir = tempdir().unwrap();
    let store: Arc<dyn KvStore> =
        Arc::new(SledStore::open(dir.path().to_str().unwrap()).unwrap());
    build_index(store.as_ref(), &catalog(), "2026-08-01T00:00:00Z").unwrap();
    let app = server::build_app_with_store(store, EngineConfig::default());

    let (status, body) = call(app, "/search?q=nivea%20dezodorant%20pre%20%C5%BEeny").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let products = json["products"].as_array().unwrap();
    assert!(products.iter().any(|p| p["id"] == "p3"));
}
