use diesel::prelude::*;
use diesel::upsert::excluded;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::{CartItemView, CartView, Product, Role};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CatalogRepository, ProfileRepository};
use crate::schema::{cart_items, carts, products, profiles};

use super::models::{CartItemRow, CartRow, NewCartItemRow, NewCartRow, ProductRow, ProfileRow};

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            stock: row.stock,
            category: row.category,
            image_urls: row.image_urls,
        }
    }
}

fn to_cart_item(item: CartItemRow, product: ProductRow) -> CartItemView {
    CartItemView {
        id: item.id,
        product_id: item.product_id,
        quantity: item.quantity,
        product_name: product.name,
        unit_price: product.price,
        stock: product.stock,
    }
}

pub struct DieselCatalogRepository {
    pool: DbPool,
}

impl DieselCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogRepository for DieselCatalogRepository {
    fn list_products(&self) -> Result<Vec<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = products::table
            .select(ProductRow::as_select())
            .order(products::created_at.desc())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    fn find_product(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(products::table
            .filter(products::id.eq(id))
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Product::from))
    }

    fn cart_for(&self, user_id: Uuid) -> Result<Option<CartView>, DomainError> {
        let mut conn = self.pool.get()?;

        let cart = carts::table
            .filter(carts::user_id.eq(user_id))
            .select(CartRow::as_select())
            .first(&mut conn)
            .optional()?;
        let Some(cart) = cart else {
            return Ok(None);
        };

        // Inner join: each line carries exactly one product.
        let lines: Vec<(CartItemRow, ProductRow)> = CartItemRow::belonging_to(&cart)
            .inner_join(products::table)
            .select((CartItemRow::as_select(), ProductRow::as_select()))
            .order(products::name.asc())
            .load(&mut conn)?;

        Ok(Some(CartView {
            id: cart.id,
            items: lines
                .into_iter()
                .map(|(item, product)| to_cart_item(item, product))
                .collect(),
        }))
    }

    fn upsert_cart_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartItemView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let product = products::table
                .filter(products::id.eq(product_id))
                .select(ProductRow::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| DomainError::not_found("Product"))?;

            diesel::insert_into(carts::table)
                .values(&NewCartRow {
                    id: Uuid::new_v4(),
                    user_id,
                })
                .on_conflict(carts::user_id)
                .do_nothing()
                .execute(conn)?;
            let cart_id: Uuid = carts::table
                .filter(carts::user_id.eq(user_id))
                .select(carts::id)
                .first(conn)?;

            let item = diesel::insert_into(cart_items::table)
                .values(&NewCartItemRow {
                    id: Uuid::new_v4(),
                    cart_id,
                    product_id,
                    quantity,
                })
                .on_conflict((cart_items::cart_id, cart_items::product_id))
                .do_update()
                .set(cart_items::quantity.eq(excluded(cart_items::quantity)))
                .returning(CartItemRow::as_returning())
                .get_result(conn)?;

            Ok(to_cart_item(item, product))
        })
    }

    fn remove_cart_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let owned_carts = carts::table
            .filter(carts::user_id.eq(user_id))
            .select(carts::id);
        let deleted = diesel::delete(
            cart_items::table
                .filter(cart_items::id.eq(item_id))
                .filter(cart_items::cart_id.eq_any(owned_carts)),
        )
        .execute(&mut conn)?;
        Ok(deleted > 0)
    }
}

impl ProfileRepository for DieselCatalogRepository {
    fn role_of(&self, user_id: Uuid) -> Result<Option<Role>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(profiles::table
            .filter(profiles::id.eq(user_id))
            .select(ProfileRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(|profile| Role::from_db(&profile.role)))
    }
}
