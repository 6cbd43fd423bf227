mod common;

use assert_matches::assert_matches;
use common::TestApp;
use mercantil_api::entities::inventory_movement::{self, Entity as MovementEntity};
use mercantil_api::errors::ServiceError;
use mercantil_api::services::inventory::{
    CreateInventoryRequest, StockAdjustmentRequest, UpdateInventoryRequest,
};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

#[tokio::test]
async fn create_inventory_applies_defaults() {
    let app = TestApp::new().await;
    let category = app.seed_category().await;
    let product = app.seed_product(category, dec!(10.00)).await;

    let created = app
        .state
        .inventory_service
        .create_for_product(CreateInventoryRequest {
            product_id: product,
            quantity: None,
            min_stock: None,
            max_stock: None,
            location: None,
        })
        .await
        .expect("create inventory");

    assert_eq!(created.quantity, 0);
    assert_eq!(created.min_stock, 10);
    assert!(created.is_out_of_stock);
    assert!(created.is_low_stock);
}

#[tokio::test]
async fn create_inventory_rejects_duplicates_and_bad_thresholds() {
    let app = TestApp::new().await;
    let category = app.seed_category().await;
    let product = app.seed_product(category, dec!(10.00)).await;
    app.seed_inventory(product, 5, 2).await;

    let duplicate = app
        .state
        .inventory_service
        .create_for_product(CreateInventoryRequest {
            product_id: product,
            quantity: None,
            min_stock: None,
            max_stock: None,
            location: None,
        })
        .await;
    assert_matches!(duplicate, Err(ServiceError::Conflict(_)));

    let other_product = app.seed_product(category, dec!(10.00)).await;
    let inverted = app
        .state
        .inventory_service
        .create_for_product(CreateInventoryRequest {
            product_id: other_product,
            quantity: Some(1),
            min_stock: Some(10),
            max_stock: Some(5),
            location: None,
        })
        .await;
    assert_matches!(inverted, Err(ServiceError::InvalidInput(_)));

    let missing = app
        .state
        .inventory_service
        .create_for_product(CreateInventoryRequest {
            product_id: Uuid::new_v4(),
            quantity: None,
            min_stock: None,
            max_stock: None,
            location: None,
        })
        .await;
    assert_matches!(missing, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn create_inventory_rejects_inactive_product() {
    let app = TestApp::new().await;
    let category = app.seed_category().await;
    let product = app
        .seed_product_with_active(category, dec!(10.00), false)
        .await;

    let result = app
        .state
        .inventory_service
        .create_for_product(CreateInventoryRequest {
            product_id: product,
            quantity: None,
            min_stock: None,
            max_stock: None,
            location: None,
        })
        .await;
    assert_matches!(result, Err(ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn remove_stock_crosses_low_threshold_then_rejects_overdraw() {
    let app = TestApp::new().await;
    let user = app.seed_user().await;
    let category = app.seed_category().await;
    let product = app.seed_product(category, dec!(10.00)).await;
    app.seed_inventory(product, 10, 5).await;

    let after = app
        .state
        .inventory_service
        .remove_stock(product, 6, "sale".to_string(), user, None)
        .await
        .expect("first removal fits");
    assert_eq!(after.quantity, 4);
    assert!(after.is_low_stock);

    let overdraw = app
        .state
        .inventory_service
        .remove_stock(product, 5, "sale".to_string(), user, None)
        .await;
    assert_matches!(overdraw, Err(ServiceError::InvalidOperation(_)));

    // Rejected mutation leaves the stored quantity untouched.
    let check = app
        .state
        .inventory_service
        .check_stock(product)
        .await
        .unwrap();
    assert_eq!(check.quantity, 4);
}

#[tokio::test]
async fn adjust_stock_enforces_non_negative_quantity() {
    let app = TestApp::new().await;
    let user = app.seed_user().await;
    let category = app.seed_category().await;
    let product = app.seed_product(category, dec!(10.00)).await;
    app.seed_inventory(product, 3, 1).await;

    let up = app
        .state
        .inventory_service
        .adjust_stock(
            StockAdjustmentRequest {
                product_id: product,
                quantity: 7,
                reason: "cycle count".to_string(),
            },
            user,
        )
        .await
        .expect("positive adjustment");
    assert_eq!(up.quantity, 10);

    let down = app
        .state
        .inventory_service
        .adjust_stock(
            StockAdjustmentRequest {
                product_id: product,
                quantity: -10,
                reason: "cycle count".to_string(),
            },
            user,
        )
        .await
        .expect("adjustment to zero is allowed");
    assert_eq!(down.quantity, 0);
    assert!(down.is_out_of_stock);

    let negative = app
        .state
        .inventory_service
        .adjust_stock(
            StockAdjustmentRequest {
                product_id: product,
                quantity: -1,
                reason: "cycle count".to_string(),
            },
            user,
        )
        .await;
    assert_matches!(negative, Err(ServiceError::InvalidInput(_)));

    let check = app
        .state
        .inventory_service
        .check_stock(product)
        .await
        .unwrap();
    assert_eq!(check.quantity, 0);
}

#[tokio::test]
async fn every_successful_movement_writes_one_audit_row() {
    let app = TestApp::new().await;
    let user = app.seed_user().await;
    let category = app.seed_category().await;
    let product = app.seed_product(category, dec!(10.00)).await;
    app.seed_inventory(product, 10, 2).await;

    app.state
        .inventory_service
        .add_stock(product, 5, "restock".to_string(), user)
        .await
        .unwrap();
    app.state
        .inventory_service
        .remove_stock(product, 3, "sale".to_string(), user, None)
        .await
        .unwrap();
    app.state
        .inventory_service
        .adjust_stock(
            StockAdjustmentRequest {
                product_id: product,
                quantity: -2,
                reason: "cycle count".to_string(),
            },
            user,
        )
        .await
        .unwrap();

    // Failed movement must not log anything.
    let _ = app
        .state
        .inventory_service
        .remove_stock(product, 100, "sale".to_string(), user, None)
        .await;

    let movements = MovementEntity::find()
        .filter(inventory_movement::Column::ProductId.eq(product))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(movements.len(), 3);

    let types: Vec<&str> = movements
        .iter()
        .map(|m| m.movement_type.as_str())
        .collect();
    assert!(types.contains(&"IN"));
    assert!(types.contains(&"OUT"));
    assert!(types.contains(&"ADJUSTMENT"));
    // Magnitude only; direction lives in the type.
    assert!(movements.iter().all(|m| m.quantity > 0));
}

#[tokio::test]
async fn check_stock_is_idempotent_and_total_for_unknown_products() {
    let app = TestApp::new().await;
    let category = app.seed_category().await;
    let product = app.seed_product(category, dec!(10.00)).await;
    app.seed_inventory(product, 7, 3).await;

    let first = app
        .state
        .inventory_service
        .check_stock(product)
        .await
        .unwrap();
    let second = app
        .state
        .inventory_service
        .check_stock(product)
        .await
        .unwrap();
    assert_eq!(first.quantity, second.quantity);
    assert_eq!(first.available, second.available);
    assert_eq!(first.is_low_stock, second.is_low_stock);

    // No inventory row reads as empty rather than failing.
    let unknown = app
        .state
        .inventory_service
        .check_stock(Uuid::new_v4())
        .await
        .unwrap();
    assert!(!unknown.available);
    assert_eq!(unknown.quantity, 0);
    assert!(unknown.is_low_stock);

    assert!(app.state.inventory_service.has_inventory(product).await.unwrap());
    assert!(!app
        .state
        .inventory_service
        .has_inventory(Uuid::new_v4())
        .await
        .unwrap());
}

#[tokio::test]
async fn update_validates_effective_thresholds() {
    let app = TestApp::new().await;
    let user = app.seed_user().await;
    let category = app.seed_category().await;
    let product = app.seed_product(category, dec!(10.00)).await;
    let inventory_id = app.seed_inventory(product, 10, 5).await;

    // New max below the stored min is rejected.
    let inverted = app
        .state
        .inventory_service
        .update(
            inventory_id,
            UpdateInventoryRequest {
                quantity: None,
                min_stock: None,
                max_stock: Some(3),
                location: None,
            },
            user,
        )
        .await;
    assert_matches!(inverted, Err(ServiceError::InvalidInput(_)));

    let updated = app
        .state
        .inventory_service
        .update(
            inventory_id,
            UpdateInventoryRequest {
                quantity: Some(30),
                min_stock: Some(8),
                max_stock: Some(25),
                location: Some("B-12".to_string()),
            },
            user,
        )
        .await
        .unwrap();
    assert_eq!(updated.quantity, 30);
    assert_eq!(updated.min_stock, 8);
    assert_eq!(updated.max_stock, Some(25));
    assert!(updated.is_overstock);
    assert_eq!(updated.status, "OVERSTOCK");
}

#[tokio::test]
async fn reserve_stock_is_a_pure_availability_check() {
    let app = TestApp::new().await;
    let category = app.seed_category().await;
    let product = app.seed_product(category, dec!(10.00)).await;
    app.seed_inventory(product, 5, 1).await;

    assert!(app
        .state
        .inventory_service
        .reserve_stock(product, 5)
        .await
        .unwrap());
    assert!(!app
        .state
        .inventory_service
        .reserve_stock(product, 6)
        .await
        .unwrap());

    // Nothing was held: quantity is unchanged and a second caller sees
    // the same availability.
    let check = app
        .state
        .inventory_service
        .check_stock(product)
        .await
        .unwrap();
    assert_eq!(check.quantity, 5);
    assert!(app
        .state
        .inventory_service
        .reserve_stock(product, 5)
        .await
        .unwrap());
}

#[tokio::test]
async fn movement_history_filters_by_product() {
    let app = TestApp::new().await;
    let user = app.seed_user().await;
    let category = app.seed_category().await;
    let product_a = app.seed_product(category, dec!(10.00)).await;
    let product_b = app.seed_product(category, dec!(20.00)).await;
    app.seed_inventory(product_a, 10, 2).await;
    app.seed_inventory(product_b, 10, 2).await;

    for _ in 0..3 {
        app.state
            .inventory_service
            .add_stock(product_a, 1, "restock".to_string(), user)
            .await
            .unwrap();
    }
    app.state
        .inventory_service
        .add_stock(product_b, 1, "restock".to_string(), user)
        .await
        .unwrap();

    let history = app
        .state
        .inventory_service
        .get_product_movements(product_a, None)
        .await
        .unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|m| m.product_id == product_a));
}
