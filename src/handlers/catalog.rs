use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::auth::Identity;
use crate::domain::catalog::{CartItemView, CartView, Product};
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub stock: i32,
    pub category: String,
    pub image_urls: Vec<String>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price,
            stock: p.stock,
            category: p.category,
            image_urls: p.image_urls,
        }
    }
}

/// A cart line with its single product.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub product_name: String,
    pub unit_price: i64,
    pub stock: i32,
}

impl From<CartItemView> for CartItemResponse {
    fn from(i: CartItemView) -> Self {
        Self {
            id: i.id,
            product_id: i.product_id,
            quantity: i.quantity,
            product_name: i.product_name,
            unit_price: i.unit_price,
            stock: i.stock,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartResponse {
    pub id: Uuid,
    pub items: Vec<CartItemResponse>,
}

impl From<CartView> for CartResponse {
    fn from(c: CartView) -> Self {
        Self {
            id: c.id,
            items: c.items.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SetCartItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

/// GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    responses((status = 200, description = "Catalog", body = [ProductResponse])),
    tag = "catalog"
)]
pub async fn list_products(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let products = state.catalog.products().await?;
    let body: Vec<ProductResponse> = products.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/products/{id}
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Product", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "catalog"
)]
pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let product = state.catalog.product(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// GET /api/cart
#[utoipa::path(
    get,
    path = "/api/cart",
    params(("X-User-Id" = Uuid, Header, description = "Verified caller")),
    responses(
        (status = 200, description = "Caller's cart", body = CartResponse),
        (status = 404, description = "Caller has no cart yet"),
    ),
    tag = "cart"
)]
pub async fn get_cart(
    state: web::Data<AppState>,
    identity: Identity,
) -> Result<HttpResponse, AppError> {
    let cart = state.catalog.cart(identity.0).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// PUT /api/cart/items
///
/// Sets the quantity of a product in the cart, creating the cart if needed.
#[utoipa::path(
    put,
    path = "/api/cart/items",
    request_body = SetCartItemRequest,
    params(("X-User-Id" = Uuid, Header, description = "Verified caller")),
    responses(
        (status = 200, description = "Updated line", body = CartItemResponse),
        (status = 400, description = "Non-positive quantity"),
        (status = 404, description = "Product not found"),
    ),
    tag = "cart"
)]
pub async fn set_cart_item(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<SetCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let item = state
        .catalog
        .set_cart_item(identity.0, body.product_id, body.quantity)
        .await?;
    Ok(HttpResponse::Ok().json(CartItemResponse::from(item)))
}

/// DELETE /api/cart/items/{id}
#[utoipa::path(
    delete,
    path = "/api/cart/items/{id}",
    params(
        ("id" = Uuid, Path, description = "Cart item UUID"),
        ("X-User-Id" = Uuid, Header, description = "Verified caller"),
    ),
    responses(
        (status = 204, description = "Line removed"),
        (status = 404, description = "No such line in the caller's cart"),
    ),
    tag = "cart"
)]
pub async fn remove_cart_item(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state
        .catalog
        .remove_cart_item(identity.0, path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
