pub mod application;
pub mod client;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::catalog_service::CatalogService;
use application::checkout_service::CheckoutService;
use application::order_service::OrderService;
use application::payment_service::PaymentReconciler;
use config::AppConfig;
use infrastructure::catalog_repo::DieselCatalogRepository;
use infrastructure::midtrans::MidtransGateway;
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::realtime::{OutboxRelay, RealtimeHub};

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type MigrationError = Box<dyn std::error::Error + Send + Sync>;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), MigrationError> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    log::info!("Applied {} migration(s)", applied.len());
    Ok(())
}

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub checkout: CheckoutService,
    pub orders: OrderService,
    pub payments: PaymentReconciler,
    pub catalog: CatalogService,
    pub hub: RealtimeHub,
}

/// Wire the Postgres-backed services together. The returned relay must be
/// spawned for realtime events to reach subscribers.
pub fn build_state(pool: DbPool, config: &AppConfig) -> (AppState, OutboxRelay) {
    let orders = Arc::new(DieselOrderRepository::new(pool.clone()));
    let catalog = Arc::new(DieselCatalogRepository::new(pool));
    let gateway = Arc::new(match &config.midtrans_base_url {
        Some(base_url) => MidtransGateway::with_base_url(
            config.midtrans_server_key.clone(),
            base_url.clone(),
            config.site_url.clone(),
        ),
        None => MidtransGateway::new(
            config.midtrans_server_key.clone(),
            config.midtrans_is_production,
            config.site_url.clone(),
        ),
    });
    let hub = RealtimeHub::new();

    let state = AppState {
        checkout: CheckoutService::new(orders.clone(), gateway, config.shipping_fees),
        orders: OrderService::new(orders.clone(), catalog.clone()),
        payments: PaymentReconciler::new(orders.clone(), config.midtrans_server_key.as_str()),
        catalog: CatalogService::new(catalog),
        hub: hub.clone(),
    };
    let relay = OutboxRelay::new(orders, hub, config.outbox_relay_interval);
    (state, relay)
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let state = web::Data::new(state);
    let openapi = handlers::ApiDoc::openapi();
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(handlers::configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
