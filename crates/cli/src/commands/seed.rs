//! Seed the catalog from a YAML file.
//!
//! The file is a list of products. Field rules are the same as for
//! `POST /products/add/`; `images` holds storage paths recorded as image rows
//! in list order.
//!
//! ```yaml
//! - name: Stoneware mug
//!   price: "12.50"
//!   description: Hand-thrown, 350 ml
//!   quantity: 40
//!   images:
//!     - product_images/mug-front.jpg
//!     - product_images/mug-side.jpg
//! - name: Linen napkins
//!   price: "18.00"
//!   description: Set of four
//!   quantity: 25
//!   is_listed: false
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use bazaar_api::db::RepositoryError;
use bazaar_api::models::{NewProduct, ProductChanges};
use bazaar_api::store::{PgStore, Store};

use super::ConnectError;

/// One product entry of a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    #[serde(flatten)]
    pub fields: ProductChanges,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Validate every entry, collecting one message per invalid product.
fn validate(entries: Vec<SeedProduct>) -> Result<Vec<(NewProduct, Vec<String>)>, Vec<String>> {
    let mut products = Vec::with_capacity(entries.len());
    let mut errors = Vec::new();

    for (index, entry) in entries.into_iter().enumerate() {
        if let Some(blank) = entry.images.iter().position(|path| path.trim().is_empty()) {
            errors.push(format!("product {}: image {}: path is blank", index + 1, blank + 1));
            continue;
        }
        match NewProduct::create(entry.fields) {
            Ok(product) => products.push((product, entry.images)),
            Err(message) => errors.push(format!("product {}: {message}", index + 1)),
        }
    }

    if errors.is_empty() {
        Ok(products)
    } else {
        Err(errors)
    }
}

/// Insert the products of a YAML file in one transaction.
///
/// Nothing is written unless every entry is valid.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, an entry is
/// invalid, or the database fails.
pub async fn products(file_path: &str) -> Result<(), SeedError> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::FileNotFound(file_path.to_owned()));
    }

    info!(path = %file_path, "Loading products from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let entries: Vec<SeedProduct> = serde_yaml::from_str(&content)?;
    info!(products = entries.len(), "Parsed seed file");

    let products = validate(entries).map_err(|errors| {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        SeedError::Invalid(errors.len())
    })?;

    let store = PgStore::new(super::connect().await?);
    let mut tx = store.begin().await?;
    let mut images = 0_usize;
    for (product, paths) in &products {
        let product = tx.create_product(product).await?;
        for path in paths {
            tx.add_product_image(product.id, path).await?;
            images += 1;
        }
    }
    tx.commit().await?;

    info!("Seeding complete!");
    info!("  Products inserted: {}", products.len());
    info!("  Images inserted: {images}");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
- name: Stoneware mug
  price: "12.50"
  description: Hand-thrown
  quantity: 40
  images:
    - product_images/mug-front.jpg
- name: Linen napkins
  price: "18.00"
  description: Set of four
  quantity: 25
  is_listed: false
"#;

    #[test]
    fn test_parse_and_validate_fixture() {
        let entries: Vec<SeedProduct> = serde_yaml::from_str(FIXTURE).unwrap();
        let products = validate(entries).unwrap();

        assert_eq!(products.len(), 2);
        let (mug, mug_images) = products.first().unwrap();
        assert_eq!(mug.price.to_string(), "12.50");
        assert!(mug.is_listed);
        assert_eq!(mug_images, &vec!["product_images/mug-front.jpg".to_owned()]);

        let (napkins, napkin_images) = products.last().unwrap();
        assert!(!napkins.is_listed);
        assert!(napkin_images.is_empty());
    }

    #[test]
    fn test_validate_reports_every_bad_entry() {
        let yaml = r#"
- name: No price
  description: Missing a field
  quantity: 1
- name: Fine
  price: "1.00"
  description: ok
  quantity: 1
- name: Negative stock
  price: "1.00"
  description: bad
  quantity: -3
"#;
        let entries: Vec<SeedProduct> = serde_yaml::from_str(yaml).unwrap();
        let errors = validate(entries).unwrap_err();

        assert_eq!(errors.len(), 2);
        assert!(errors.first().unwrap().starts_with("product 1: price"));
        assert!(errors.last().unwrap().starts_with("product 3: quantity"));
    }
}
