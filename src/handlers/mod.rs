pub mod admin;
pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod payment;
pub mod realtime;

use actix_web::web;
use utoipa::OpenApi;

use crate::errors::AppError;

#[derive(OpenApi)]
#[openapi(
    paths(
        checkout::checkout,
        checkout::resume_payment,
        payment::payment_webhook,
        orders::list_orders,
        orders::get_order,
        orders::order_status,
        orders::cancel_order,
        orders::complete_order,
        admin::list_orders,
        admin::get_order,
        admin::ship_order,
        admin::payment_logs,
        catalog::list_products,
        catalog::get_product,
        catalog::get_cart,
        catalog::set_cart_item,
        catalog::remove_cart_item,
        realtime::subscribe,
    ),
    tags(
        (name = "checkout", description = "Cart to order conversion and payment sessions"),
        (name = "payment", description = "Gateway callbacks"),
        (name = "orders", description = "Customer order lifecycle"),
        (name = "admin", description = "Fulfilment and audit"),
        (name = "catalog", description = "Products"),
        (name = "cart", description = "Per-user cart"),
        (name = "realtime", description = "Server-sent order and stock events"),
    )
)]
pub struct ApiDoc;

/// Register every `/api` route plus body/query error mapping.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _| AppError::NotFound(err.to_string()).into()),
    )
    .service(
        web::scope("/api")
            .route("/checkout", web::post().to(checkout::checkout))
            .route("/payment", web::post().to(checkout::resume_payment))
            .route("/payment-webhook", web::post().to(payment::payment_webhook))
            .route("/orders", web::get().to(orders::list_orders))
            .route("/orders/{id}", web::get().to(orders::get_order))
            .route("/orders/{id}/status", web::get().to(orders::order_status))
            .route("/orders/{id}/cancel", web::post().to(orders::cancel_order))
            .route("/orders/{id}/complete", web::post().to(orders::complete_order))
            .route("/admin/orders", web::get().to(admin::list_orders))
            .route("/admin/orders/{id}", web::get().to(admin::get_order))
            .route("/admin/orders/{id}/ship", web::post().to(admin::ship_order))
            .route(
                "/admin/orders/{id}/payment-logs",
                web::get().to(admin::payment_logs),
            )
            .route("/products", web::get().to(catalog::list_products))
            .route("/products/{id}", web::get().to(catalog::get_product))
            .route("/cart", web::get().to(catalog::get_cart))
            .route("/cart/items", web::put().to(catalog::set_cart_item))
            .route("/cart/items/{id}", web::delete().to(catalog::remove_cart_item))
            .route("/realtime/{channel}", web::get().to(realtime::subscribe)),
    );
}
