//! Mercantil API Library
//!
//! Core functionality for the Mercantil back-office API: catalog,
//! inventory control and sales.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod common;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub inventory_service: services::inventory::InventoryService,
    pub sale_service: services::sales::SaleService,
    pub product_service: services::products::ProductService,
    pub category_service: services::categories::CategoryService,
    pub customer_service: services::customers::CustomerService,
    pub supplier_service: services::suppliers::SupplierService,
    pub user_service: services::users::UserService,
}

impl AppState {
    /// Wires every service onto the shared pool and event channel.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let sender = Arc::new(event_sender.clone());
        Self {
            inventory_service: services::inventory::InventoryService::new(
                db.clone(),
                sender.clone(),
            ),
            sale_service: services::sales::SaleService::new(db.clone(), sender.clone()),
            product_service: services::products::ProductService::new(db.clone(), sender),
            category_service: services::categories::CategoryService::new(db.clone()),
            customer_service: services::customers::CustomerService::new(db.clone()),
            supplier_service: services::suppliers::SupplierService::new(db.clone()),
            user_service: services::users::UserService::new(db.clone()),
            db,
            config,
            event_sender,
        }
    }
}

/// Full v1 API surface.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/categories", handlers::categories::category_routes())
        .nest("/customers", handlers::customers::customer_routes())
        .nest("/inventory", handlers::inventory::inventory_routes())
        .nest("/products", handlers::products::product_routes())
        .nest("/sales", handlers::sales::sales_routes())
        .nest("/suppliers", handlers::suppliers::supplier_routes())
        .nest("/users", handlers::users::user_routes())
}
