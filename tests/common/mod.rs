// Not every test binary touches every helper.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

use mercantil_api::{
    config::AppConfig,
    db::{self, DbConfig},
    entities::{category, customer, inventory, product, user},
    events::{self, EventSender},
    AppState,
};

/// Test harness: application state backed by an in-memory SQLite
/// database with the full schema migrated.
pub struct TestApp {
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18080,
            "test".to_string(),
        );

        // A single connection keeps the in-memory database alive and
        // shared for the duration of the test.
        let db_cfg = DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool).await.expect("migrations failed");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, event_sender);
        Self {
            state,
            _event_task: event_task,
        }
    }

    pub async fn seed_user(&self) -> Uuid {
        let id = Uuid::new_v4();
        user::ActiveModel {
            id: Set(id),
            name: Set("Test Seller".to_string()),
            email: Set(format!("seller-{}@test.dev", id)),
            password_hash: Set("$argon2id$test-hash".to_string()),
            role: Set("SALESPERSON".to_string()),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed user");
        id
    }

    pub async fn seed_category(&self) -> Uuid {
        let id = Uuid::new_v4();
        category::ActiveModel {
            id: Set(id),
            name: Set(format!("Category {}", id)),
            description: Set(None),
            cnae: Set(None),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed category");
        id
    }

    pub async fn seed_customer(&self) -> Uuid {
        let id = Uuid::new_v4();
        customer::ActiveModel {
            id: Set(id),
            name: Set("Test Customer".to_string()),
            customer_type: Set("RETAIL".to_string()),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed customer");
        id
    }

    pub async fn seed_product(&self, category_id: Uuid, price: Decimal) -> Uuid {
        self.seed_product_with_active(category_id, price, true).await
    }

    pub async fn seed_product_with_active(
        &self,
        category_id: Uuid,
        price: Decimal,
        is_active: bool,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let code_suffix: String = id.simple().to_string()[..8].to_uppercase();
        product::ActiveModel {
            id: Set(id),
            name: Set(format!("Product {}", code_suffix)),
            description: Set(None),
            price: Set(price),
            code: Set(format!("PRD-{}", code_suffix)),
            barcode: Set(None),
            is_active: Set(is_active),
            category_id: Set(category_id),
            supplier_id: Set(None),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product");
        id
    }

    pub async fn seed_inventory(&self, product_id: Uuid, quantity: i32, min_stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        inventory::ActiveModel {
            id: Set(id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            min_stock: Set(min_stock),
            max_stock: Set(None),
            location: Set(Some("A-01".to_string())),
            last_update: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed inventory");
        id
    }
}
