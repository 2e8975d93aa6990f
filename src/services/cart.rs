use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::Cart;
use crate::domain::pricing::effective_price;
use crate::services::catalog::listed_product;
use crate::store::Store;
use crate::{EcommerceError, Result};

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn Store>,
}

impl CartService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    /// Add one unit of a product at its current effective price.
    pub async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid) -> Result<Cart> {
        let mut tx = self.store.begin().await?;
        tx.user(user_id).await?.ok_or_else(|| EcommerceError::not_found("user"))?;
        let (product, category) = listed_product(&mut *tx, product_id).await?;
        let unit_price = effective_price(&product, &category).price;

        let mut cart = match tx.cart_for_update(user_id).await? {
            Some(cart) => cart,
            None => Cart::for_user(user_id),
        };
        let quantity = cart.add_product(&product, unit_price)?.quantity;
        tx.save_cart(&cart).await?;
        tx.commit().await?;

        info!(%user_id, %product_id, quantity, "product added to cart");
        Ok(cart)
    }

    pub async fn remove_from_cart(&self, user_id: Uuid, product_id: Uuid) -> Result<Cart> {
        let mut tx = self.store.begin().await?;
        let mut cart = tx.cart_for_update(user_id).await?.ok_or_else(|| EcommerceError::not_found("cart"))?;
        cart.remove_product(product_id)?;
        tx.save_cart(&cart).await?;
        tx.commit().await?;

        info!(%user_id, %product_id, "product removed from cart");
        Ok(cart)
    }

    pub async fn list_cart(&self, user_id: Uuid) -> Result<Cart> {
        let mut tx = self.store.begin().await?;
        tx.cart_for_update(user_id).await?.ok_or_else(|| EcommerceError::not_found("cart"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Category, NewProduct, Product, User};
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;

    struct Fixture {
        store: Arc<MemoryStore>,
        user: User,
        product: Product,
    }

    async fn fixture(stock: i32) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let user = User::register("asha", "asha@example.com");
        store.insert_user(user.clone()).await;

        let category = Category::create("Kitchen", None);
        let product = Product::create(NewProduct {
            name: "Kettle".into(), price: Decimal::new(1200, 0), quantity: stock, category_id: category.id,
            ..Default::default()
        });
        let mut tx = store.begin().await.unwrap();
        tx.save_category(&category).await.unwrap();
        tx.save_product(&product).await.unwrap();
        tx.commit().await.unwrap();

        Fixture { store, user, product }
    }

    #[tokio::test]
    async fn test_sixth_unit_is_rejected() {
        let f = fixture(50).await;
        let carts = CartService::new(f.store.clone());
        for _ in 0..5 {
            carts.add_to_cart(f.user.id, f.product.id).await.unwrap();
        }
        let err = carts.add_to_cart(f.user.id, f.product.id).await.unwrap_err();
        assert!(matches!(err, EcommerceError::LimitExceeded(_)));

        let cart = carts.list_cart(f.user.id).await.unwrap();
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(cart.items[0].total_price, Decimal::new(6000, 0));
    }

    #[tokio::test]
    async fn test_out_of_stock() {
        let f = fixture(0).await;
        let err = CartService::new(f.store.clone()).add_to_cart(f.user.id, f.product.id).await.unwrap_err();
        assert!(matches!(err, EcommerceError::OutOfStock(_)));
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let f = fixture(3).await;
        let err = CartService::new(f.store.clone()).add_to_cart(Uuid::now_v7(), f.product.id).await.unwrap_err();
        assert!(matches!(err, EcommerceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_keeps_total_items_in_step() {
        let f = fixture(3).await;
        let carts = CartService::new(f.store.clone());
        carts.add_to_cart(f.user.id, f.product.id).await.unwrap();

        let cart = carts.remove_from_cart(f.user.id, f.product.id).await.unwrap();
        assert_eq!(cart.total_items, 0);
        assert!(cart.items.is_empty());

        let err = carts.remove_from_cart(f.user.id, f.product.id).await.unwrap_err();
        assert!(matches!(err, EcommerceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_without_cart() {
        let f = fixture(3).await;
        let err = CartService::new(f.store.clone()).list_cart(f.user.id).await.unwrap_err();
        assert!(matches!(err, EcommerceError::NotFound(_)));
    }
}
