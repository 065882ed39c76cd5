use std::sync::Arc;

use uuid::Uuid;

use super::blocking;
use crate::domain::catalog::{CartItemView, CartView, Product};
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogRepository;

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    pub async fn products(&self) -> Result<Vec<Product>, DomainError> {
        blocking(&self.catalog, |repo| repo.list_products()).await
    }

    pub async fn product(&self, id: Uuid) -> Result<Product, DomainError> {
        blocking(&self.catalog, move |repo| repo.find_product(id))
            .await?
            .ok_or_else(|| DomainError::not_found("Product"))
    }

    pub async fn cart(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        blocking(&self.catalog, move |repo| repo.cart_for(user_id))
            .await?
            .ok_or_else(|| DomainError::not_found("Cart"))
    }

    pub async fn set_cart_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartItemView, DomainError> {
        if quantity <= 0 {
            return Err(DomainError::Validation(
                "quantity must be positive".to_string(),
            ));
        }
        blocking(&self.catalog, move |repo| {
            repo.upsert_cart_item(user_id, product_id, quantity)
        })
        .await
    }

    pub async fn remove_cart_item(&self, user_id: Uuid, item_id: Uuid) -> Result<(), DomainError> {
        if blocking(&self.catalog, move |repo| repo.remove_cart_item(user_id, item_id)).await? {
            Ok(())
        } else {
            Err(DomainError::not_found("Cart item"))
        }
    }
}
