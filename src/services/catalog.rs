//! Catalog administration and the shopper-facing product list.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::{Category, NewProduct, Product};
use crate::domain::pricing::{effective_price, EffectivePrice};
use crate::domain::value_objects::Offer;
use crate::store::{Store, StoreTx};
use crate::{EcommerceError, Result};

/// Fields to change on a category. `None` leaves a field as it is; the inner
/// `None` of `offer` clears the offer.
#[derive(Clone, Debug, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub offer: Option<Option<Offer>>,
}

#[derive(Clone, Debug, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub category_id: Option<Uuid>,
    pub color: Option<Option<String>>,
    pub image_urls: Option<Vec<String>>,
    pub status: Option<Option<String>>,
    pub offer: Option<Option<Offer>>,
}

/// A listed product with the price a shopper pays for it.
#[derive(Clone, Debug, Serialize)]
pub struct ProductListing {
    #[serde(flatten)]
    pub product: Product,
    pub category_name: String,
    pub effective_price: EffectivePrice,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

fn required_name(name: &str, what: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EcommerceError::validation(format!("{what} name is required")));
    }
    Ok(name.to_string())
}

fn check_product_fields(price: Decimal, quantity: i32) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(EcommerceError::validation("price must be greater than 0"));
    }
    if quantity < 0 {
        return Err(EcommerceError::validation("quantity cannot be negative"));
    }
    Ok(())
}

/// A product together with its category, if both are listed.
pub(crate) async fn listed_product(tx: &mut dyn StoreTx, product_id: Uuid) -> Result<(Product, Category)> {
    let product = tx
        .product(product_id)
        .await?
        .filter(|p| p.is_listed)
        .ok_or_else(|| EcommerceError::not_found("product"))?;
    let category = tx
        .category(product.category_id)
        .await?
        .filter(|c| c.is_listed)
        .ok_or_else(|| EcommerceError::not_found("category"))?;
    Ok((product, category))
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    pub async fn create_category(&self, name: &str, offer: Option<Offer>) -> Result<Category> {
        let category = Category::create(required_name(name, "category")?, offer);

        let mut tx = self.store.begin().await?;
        if tx.category_by_name(&category.name).await?.is_some() {
            return Err(EcommerceError::Conflict("category already exists".into()));
        }
        tx.save_category(&category).await?;
        tx.commit().await?;

        info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub async fn edit_category(&self, id: Uuid, patch: CategoryPatch) -> Result<Category> {
        let mut tx = self.store.begin().await?;
        let mut category = tx.category(id).await?.ok_or_else(|| EcommerceError::not_found("category"))?;

        if let Some(name) = patch.name {
            let name = required_name(&name, "category")?;
            if tx.category_by_name(&name).await?.is_some_and(|c| c.id != id) {
                return Err(EcommerceError::Conflict("category already exists".into()));
            }
            category.name = name;
        }
        if let Some(offer) = patch.offer {
            category.offer = offer;
        }
        category.touch();

        tx.save_category(&category).await?;
        tx.commit().await?;
        Ok(category)
    }

    pub async fn toggle_category_listing(&self, id: Uuid) -> Result<Category> {
        let mut tx = self.store.begin().await?;
        let mut category = tx.category(id).await?.ok_or_else(|| EcommerceError::not_found("category"))?;
        category.toggle_listing();
        tx.save_category(&category).await?;
        tx.commit().await?;

        info!(category_id = %id, listed = category.is_listed, "category listing changed");
        Ok(category)
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.categories().await?)
    }

    pub async fn create_product(&self, new: NewProduct) -> Result<Product> {
        let name = required_name(&new.name, "product")?;
        check_product_fields(new.price, new.quantity)?;

        let mut tx = self.store.begin().await?;
        tx.category(new.category_id).await?.ok_or_else(|| EcommerceError::not_found("category"))?;
        if tx.product_by_name(&name).await?.is_some() {
            return Err(EcommerceError::Conflict("product already exists".into()));
        }

        let product = Product::create(NewProduct { name, ..new });
        tx.save_product(&product).await?;
        tx.commit().await?;

        info!(product_id = %product.id, name = %product.name, "product created");
        Ok(product)
    }

    pub async fn edit_product(&self, id: Uuid, patch: ProductPatch) -> Result<Product> {
        let mut tx = self.store.begin().await?;
        let mut product = tx.product_for_update(id).await?.ok_or_else(|| EcommerceError::not_found("product"))?;

        if let Some(name) = patch.name {
            let name = required_name(&name, "product")?;
            if tx.product_by_name(&name).await?.is_some_and(|p| p.id != id) {
                return Err(EcommerceError::Conflict("product already exists".into()));
            }
            product.name = name;
        }
        if let Some(category_id) = patch.category_id {
            tx.category(category_id).await?.ok_or_else(|| EcommerceError::not_found("category"))?;
            product.category_id = category_id;
        }
        if let Some(description) = patch.description { product.description = description; }
        if let Some(price) = patch.price { product.price = price; }
        if let Some(quantity) = patch.quantity { product.quantity = quantity; }
        if let Some(color) = patch.color { product.color = color; }
        if let Some(image_urls) = patch.image_urls { product.image_urls = image_urls; }
        if let Some(status) = patch.status { product.status = status; }
        if let Some(offer) = patch.offer { product.offer = offer; }
        check_product_fields(product.price, product.quantity)?;
        product.touch();

        tx.save_product(&product).await?;
        tx.commit().await?;
        Ok(product)
    }

    pub async fn toggle_product_listing(&self, id: Uuid) -> Result<Product> {
        let mut tx = self.store.begin().await?;
        let mut product = tx.product_for_update(id).await?.ok_or_else(|| EcommerceError::not_found("product"))?;
        product.toggle_listing();
        tx.save_product(&product).await?;
        tx.commit().await?;

        info!(product_id = %id, listed = product.is_listed, "product listing changed");
        Ok(product)
    }

    /// Every product, listed or not.
    pub async fn all_products(&self) -> Result<Vec<Product>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.products().await?)
    }

    /// Listed products in listed categories, newest first.
    pub async fn list_products(&self) -> Result<Vec<ProductListing>> {
        let mut tx = self.store.begin().await?;
        let categories: HashMap<Uuid, Category> = tx
            .categories()
            .await?
            .into_iter()
            .filter(|c| c.is_listed)
            .map(|c| (c.id, c))
            .collect();

        Ok(tx
            .products()
            .await?
            .into_iter()
            .filter(|p| p.is_listed)
            .filter_map(|product| {
                let category = categories.get(&product.category_id)?;
                let effective_price = effective_price(&product, category);
                Some(ProductListing { category_name: category.name.clone(), effective_price, product })
            })
            .collect())
    }

    pub async fn product(&self, id: Uuid) -> Result<ProductListing> {
        let mut tx = self.store.begin().await?;
        let (product, category) = listed_product(&mut *tx, id).await?;
        let effective_price = effective_price(&product, &category);
        Ok(ProductListing { category_name: category.name, effective_price, product })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::DiscountKind;
    use crate::store::MemoryStore;

    fn dec(v: i64) -> Decimal { Decimal::new(v, 0) }

    fn service() -> CatalogService { CatalogService::new(Arc::new(MemoryStore::new())) }

    fn lamp(category_id: Uuid) -> NewProduct {
        NewProduct { name: "Desk Lamp".into(), price: dec(400), quantity: 4, category_id, ..Default::default() }
    }

    #[tokio::test]
    async fn test_category_names_are_unique_ignoring_case() {
        let catalog = service();
        catalog.create_category("Lighting", None).await.unwrap();
        let err = catalog.create_category(" lighting ", None).await.unwrap_err();
        assert!(matches!(err, EcommerceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_product_requires_category() {
        let catalog = service();
        let err = catalog.create_product(lamp(Uuid::now_v7())).await.unwrap_err();
        assert!(matches!(err, EcommerceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_product_rejects_bad_price() {
        let catalog = service();
        let category = catalog.create_category("Lighting", None).await.unwrap();
        let err = catalog
            .create_product(NewProduct { price: Decimal::ZERO, ..lamp(category.id) })
            .await
            .unwrap_err();
        assert!(matches!(err, EcommerceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_listing_hides_unlisted_and_applies_offers() {
        let catalog = service();
        let offer = Offer::new(DiscountKind::Percentage, dec(25)).unwrap();
        let category = catalog.create_category("Lighting", Some(offer)).await.unwrap();
        let desk = catalog.create_product(lamp(category.id)).await.unwrap();
        let hidden = catalog
            .create_product(NewProduct { name: "Floor Lamp".into(), ..lamp(category.id) })
            .await
            .unwrap();
        catalog.toggle_product_listing(hidden.id).await.unwrap();

        let listings = catalog.list_products().await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].product.id, desk.id);
        assert_eq!(listings[0].effective_price.price, dec(300));

        catalog.toggle_category_listing(category.id).await.unwrap();
        assert!(catalog.list_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_product_clears_offer() {
        let catalog = service();
        let category = catalog.create_category("Lighting", None).await.unwrap();
        let offer = Offer::new(DiscountKind::Fixed, dec(50)).unwrap();
        let product = catalog.create_product(NewProduct { offer: Some(offer), ..lamp(category.id) }).await.unwrap();

        let edited = catalog
            .edit_product(product.id, ProductPatch { offer: Some(None), quantity: Some(9), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(edited.offer, None);
        assert_eq!(edited.quantity, 9);
        assert_eq!(edited.price, dec(400));
    }
}
