//! Catalog domain types.

use rust_decimal::Decimal;
use serde::Deserialize;

use bazaar_core::{Price, ProductId, ProductImageId};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub is_active: bool,
    pub price: Price,
    pub description: String,
    /// Units in stock.
    pub quantity: u32,
    /// Whether the product is shown in the storefront.
    pub is_listed: bool,
}

/// A validated product about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub is_active: bool,
    pub price: Price,
    pub description: String,
    pub quantity: u32,
    pub is_listed: bool,
}

/// Raw product fields from a request body.
///
/// Every field is optional so the same shape serves create (where name, price,
/// description and quantity are required) and partial edit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub is_listed: Option<bool>,
}

const MAX_NAME: usize = 255;

impl NewProduct {
    /// Validate the fields of a new product.
    ///
    /// `is_active` and `is_listed` default to true.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first missing or invalid field.
    pub fn create(changes: ProductChanges) -> Result<Self, String> {
        let name = changes.name.ok_or("name: This field is required.")?;
        let price = changes.price.ok_or("price: This field is required.")?;
        let description = changes
            .description
            .ok_or("description: This field is required.")?;
        let quantity = changes
            .quantity
            .ok_or("quantity: This field is required.")?;

        Ok(Self {
            name: validate_name(name)?,
            is_active: changes.is_active.unwrap_or(true),
            price: validate_price(price)?,
            description,
            quantity: validate_quantity(quantity)?,
            is_listed: changes.is_listed.unwrap_or(true),
        })
    }
}

impl Product {
    /// Apply a partial update, validating every supplied field.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn apply(&self, changes: ProductChanges) -> Result<Self, String> {
        Ok(Self {
            id: self.id,
            name: match changes.name {
                Some(name) => validate_name(name)?,
                None => self.name.clone(),
            },
            is_active: changes.is_active.unwrap_or(self.is_active),
            price: match changes.price {
                Some(price) => validate_price(price)?,
                None => self.price,
            },
            description: changes
                .description
                .unwrap_or_else(|| self.description.clone()),
            quantity: match changes.quantity {
                Some(quantity) => validate_quantity(quantity)?,
                None => self.quantity,
            },
            is_listed: changes.is_listed.unwrap_or(self.is_listed),
        })
    }
}

fn validate_name(name: String) -> Result<String, String> {
    if name.trim().is_empty() {
        return Err("name: This field may not be blank.".to_owned());
    }
    if name.chars().count() > MAX_NAME {
        return Err(format!(
            "name: Ensure this field has no more than {MAX_NAME} characters."
        ));
    }
    Ok(name)
}

fn validate_price(amount: Decimal) -> Result<Price, String> {
    Price::new(amount).map_err(|e| format!("price: {e}"))
}

fn validate_quantity(quantity: i64) -> Result<u32, String> {
    if quantity < 0 {
        return Err("quantity: Ensure this value is greater than or equal to 0.".to_owned());
    }
    // Stock is stored as INTEGER
    i32::try_from(quantity)
        .ok()
        .and_then(|q| u32::try_from(q).ok())
        .ok_or_else(|| format!("quantity: Ensure this value is less than or equal to {}.", i32::MAX))
}

/// A stored image path belonging to a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product_id: ProductId,
    pub image: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn changes() -> ProductChanges {
        ProductChanges {
            name: Some("Teak stool".to_owned()),
            price: Some(Decimal::new(4999, 2)),
            description: Some("Hand finished".to_owned()),
            quantity: Some(4),
            ..ProductChanges::default()
        }
    }

    #[test]
    fn test_create_defaults_flags_to_true() {
        let product = NewProduct::create(changes()).unwrap();
        assert!(product.is_active);
        assert!(product.is_listed);
        assert_eq!(product.price.to_string(), "49.99");
    }

    #[test]
    fn test_create_requires_price() {
        let mut changes = changes();
        changes.price = None;
        assert_eq!(
            NewProduct::create(changes).unwrap_err(),
            "price: This field is required."
        );
    }

    #[test]
    fn test_create_rejects_negative_values() {
        let mut negative_price = changes();
        negative_price.price = Some(Decimal::new(-1, 0));
        assert!(NewProduct::create(negative_price).is_err());

        let mut negative_stock = changes();
        negative_stock.quantity = Some(-1);
        assert!(NewProduct::create(negative_stock).is_err());
    }

    #[test]
    fn test_create_rejects_long_name() {
        let mut changes = changes();
        changes.name = Some("x".repeat(256));
        assert!(NewProduct::create(changes).is_err());
    }

    #[test]
    fn test_apply_is_partial() {
        let new = NewProduct::create(changes()).unwrap();
        let product = Product {
            id: ProductId::new(7),
            name: new.name,
            is_active: new.is_active,
            price: new.price,
            description: new.description,
            quantity: new.quantity,
            is_listed: new.is_listed,
        };

        let updated = product
            .apply(ProductChanges {
                quantity: Some(0),
                is_listed: Some(false),
                ..ProductChanges::default()
            })
            .unwrap();
        assert_eq!(updated.quantity, 0);
        assert!(!updated.is_listed);
        assert_eq!(updated.name, product.name);
        assert_eq!(updated.price, product.price);
    }
}
