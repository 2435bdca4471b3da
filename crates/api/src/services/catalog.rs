//! Catalog service: products and their image records.

use tracing::instrument;

use bazaar_core::{Page, PageRequest, ProductId};

use super::ServiceError;
use crate::models::{NewProduct, Product, ProductChanges, ProductImage};
use crate::store::{Store, StoreTx};

const PRODUCT_NOT_FOUND: &str = "Product not found.";
const NO_IMAGE: &str = "No image found for the product.";

/// Catalog service.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// One page of products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` ("Invalid page.") for a page past the end.
    pub async fn list(&self, page: PageRequest) -> Result<Page<Product>, ServiceError> {
        let mut tx = self.store.begin().await?;
        let (products, count) = tx.list_products(page).await?;
        Ok(Page::new(page, count, products)?)
    }

    /// Get one product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    pub async fn get(&self, id: ProductId) -> Result<Product, ServiceError> {
        let mut tx = self.store.begin().await?;
        find(tx.as_mut(), id).await
    }

    /// Create a product from request fields.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidArgument` if a field is missing or invalid.
    #[instrument(skip(self, changes))]
    pub async fn create(&self, changes: ProductChanges) -> Result<Product, ServiceError> {
        let product = NewProduct::create(changes).map_err(ServiceError::invalid)?;

        let mut tx = self.store.begin().await?;
        let product = tx.create_product(&product).await?;
        tx.commit().await?;

        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Apply a partial update to a product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    /// Returns `ServiceError::InvalidArgument` if a supplied field is invalid.
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product, ServiceError> {
        let mut tx = self.store.begin().await?;
        let product = find(tx.as_mut(), id).await?;
        let product = product.apply(changes).map_err(ServiceError::invalid)?;
        let product = tx.update_product(&product).await?;
        tx.commit().await?;
        Ok(product)
    }

    /// Delete a product along with its images and cart items.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), ServiceError> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_product(id).await? {
            return Err(ServiceError::not_found(PRODUCT_NOT_FOUND));
        }
        tx.commit().await?;

        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Flip whether a product is listed.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn toggle_listing(&self, id: ProductId) -> Result<Product, ServiceError> {
        let mut tx = self.store.begin().await?;
        let mut product = find(tx.as_mut(), id).await?;
        product.is_listed = !product.is_listed;
        let product = tx.update_product(&product).await?;
        tx.commit().await?;
        Ok(product)
    }

    /// The first image of a product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product or its image is missing.
    pub async fn single_image(&self, id: ProductId) -> Result<ProductImage, ServiceError> {
        let mut tx = self.store.begin().await?;
        find(tx.as_mut(), id).await?;
        tx.list_product_images(id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found(NO_IMAGE))
    }

    /// Every image of a product, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    pub async fn all_images(&self, id: ProductId) -> Result<Vec<ProductImage>, ServiceError> {
        let mut tx = self.store.begin().await?;
        find(tx.as_mut(), id).await?;
        Ok(tx.list_product_images(id).await?)
    }
}

async fn find(tx: &mut dyn StoreTx, id: ProductId) -> Result<Product, ServiceError> {
    tx.get_product(id)
        .await?
        .ok_or_else(|| ServiceError::not_found(PRODUCT_NOT_FOUND))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::store::MemoryStore;

    fn lamp() -> ProductChanges {
        ProductChanges {
            name: Some("Lamp".to_owned()),
            price: Some(Decimal::new(2500, 2)),
            description: Some("Brass desk lamp".to_owned()),
            quantity: Some(3),
            ..ProductChanges::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);

        let created = catalog.create(lamp()).await.unwrap();
        assert!(created.is_listed);
        assert_eq!(catalog.get(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_create_invalid_is_rejected() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);

        let mut changes = lamp();
        changes.name = None;
        assert!(matches!(
            catalog.create(changes).await,
            Err(ServiceError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_list_pages() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        for _ in 0..11 {
            catalog.create(lamp()).await.unwrap();
        }

        let first = catalog.list(PageRequest::first()).await.unwrap();
        assert_eq!(first.count, 11);
        assert_eq!(first.results.len(), 10);
        assert_eq!(first.next.as_deref(), Some("?page=2"));

        let second = catalog.list(PageRequest::new(2, 10).unwrap()).await.unwrap();
        assert_eq!(second.results.len(), 1);
        assert_eq!(second.results.first().unwrap().id, ProductId::new(1));

        assert!(matches!(
            catalog.list(PageRequest::new(3, 10).unwrap()).await,
            Err(ServiceError::NotFound(ref m)) if m == "Invalid page."
        ));
    }

    #[tokio::test]
    async fn test_update_missing_and_invalid() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        let product = catalog.create(lamp()).await.unwrap();

        assert!(matches!(
            catalog
                .update(ProductId::new(42), ProductChanges::default())
                .await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            catalog
                .update(
                    product.id,
                    ProductChanges {
                        price: Some(Decimal::new(-100, 2)),
                        ..ProductChanges::default()
                    }
                )
                .await,
            Err(ServiceError::InvalidArgument(_))
        ));
        assert_eq!(catalog.get(product.id).await.unwrap(), product);
    }

    #[tokio::test]
    async fn test_toggle_listing_flips() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        let product = catalog.create(lamp()).await.unwrap();

        assert!(!catalog.toggle_listing(product.id).await.unwrap().is_listed);
        assert!(catalog.toggle_listing(product.id).await.unwrap().is_listed);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        let product = catalog.create(lamp()).await.unwrap();

        catalog.delete(product.id).await.unwrap();
        assert!(matches!(
            catalog.get(product.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            catalog.delete(product.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_images() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        let product = catalog.create(lamp()).await.unwrap();

        assert!(matches!(
            catalog.single_image(product.id).await,
            Err(ServiceError::NotFound(ref m)) if m == NO_IMAGE
        ));
        assert!(catalog.all_images(product.id).await.unwrap().is_empty());

        let mut tx = store.begin().await.unwrap();
        tx.add_product_image(product.id, "product_images/front.jpg")
            .await
            .unwrap();
        tx.add_product_image(product.id, "product_images/back.jpg")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let single = catalog.single_image(product.id).await.unwrap();
        assert_eq!(single.image, "product_images/front.jpg");
        assert_eq!(catalog.all_images(product.id).await.unwrap().len(), 2);

        assert!(matches!(
            catalog.all_images(ProductId::new(99)).await,
            Err(ServiceError::NotFound(ref m)) if m == PRODUCT_NOT_FOUND
        ));
    }
}
