mod common;

use assert_matches::assert_matches;
use common::TestApp;
use mercantil_api::entities::sale::SaleStatus;
use mercantil_api::entities::sale_item::Entity as SaleItemEntity;
use mercantil_api::errors::ServiceError;
use mercantil_api::services::sales::{
    AddSaleItemRequest, CreateSaleRequest, SaleFilters, SaleItemRequest, UpdateSaleItemRequest,
    UpdateSaleRequest,
};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use uuid::Uuid;

struct SaleFixture {
    app: TestApp,
    user: Uuid,
    customer: Uuid,
    product: Uuid,
}

impl SaleFixture {
    /// One product at 19.90 with 50 units on hand.
    async fn new() -> Self {
        let app = TestApp::new().await;
        let user = app.seed_user().await;
        let customer = app.seed_customer().await;
        let category = app.seed_category().await;
        let product = app.seed_product(category, dec!(19.90)).await;
        app.seed_inventory(product, 50, 5).await;
        Self {
            app,
            user,
            customer,
            product,
        }
    }

    fn item(&self, quantity: i32) -> SaleItemRequest {
        SaleItemRequest {
            product_id: self.product,
            quantity,
            unit_price: None,
            discount: None,
        }
    }

    fn create_request(&self, items: Vec<SaleItemRequest>) -> CreateSaleRequest {
        CreateSaleRequest {
            customer_id: self.customer,
            user_id: self.user,
            notes: None,
            discount: None,
            tax: None,
            items,
        }
    }
}

#[tokio::test]
async fn create_sale_computes_total_and_starts_as_draft() {
    let fx = SaleFixture::new().await;

    let sale = fx
        .app
        .state
        .sale_service
        .create(fx.create_request(vec![fx.item(2)]))
        .await
        .expect("create sale");

    assert_eq!(sale.status, "DRAFT");
    assert_eq!(sale.total, dec!(39.80));
    assert_eq!(sale.discount, dec!(0));
    assert_eq!(sale.tax, dec!(0));
    let items = sale.items.expect("create returns items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].unit_price, dec!(19.90));
    assert_eq!(items[0].total, dec!(39.80));
}

#[tokio::test]
async fn created_sale_round_trips_through_fetch() {
    let fx = SaleFixture::new().await;

    let created = fx
        .app
        .state
        .sale_service
        .create(fx.create_request(vec![
            fx.item(2),
            SaleItemRequest {
                product_id: fx.product,
                quantity: 3,
                unit_price: Some(dec!(15.00)),
                discount: Some(dec!(5.00)),
            },
        ]))
        .await
        .unwrap();

    let fetched = fx
        .app
        .state
        .sale_service
        .find_by_id(created.id)
        .await
        .unwrap();

    let created_items = created.items.unwrap();
    let fetched_items = fetched.items.unwrap();
    assert_eq!(created_items.len(), fetched_items.len());
    for (a, b) in created_items.iter().zip(fetched_items.iter()) {
        assert_eq!(a.quantity, b.quantity);
        assert_eq!(a.unit_price, b.unit_price);
        assert_eq!(a.discount, b.discount);
        assert_eq!(a.total, b.total);
    }
    // 2 * 19.90 + (3 * 15.00 - 5.00) = 39.80 + 40.00
    assert_eq!(fetched.total, dec!(79.80));
}

#[tokio::test]
async fn create_sale_resolves_references_eagerly() {
    let fx = SaleFixture::new().await;

    let unknown_customer = fx
        .app
        .state
        .sale_service
        .create(CreateSaleRequest {
            customer_id: Uuid::new_v4(),
            user_id: fx.user,
            notes: None,
            discount: None,
            tax: None,
            items: vec![fx.item(1)],
        })
        .await;
    assert_matches!(unknown_customer, Err(ServiceError::NotFound(_)));

    let unknown_product = fx
        .app
        .state
        .sale_service
        .create(fx.create_request(vec![SaleItemRequest {
            product_id: Uuid::new_v4(),
            quantity: 1,
            unit_price: None,
            discount: None,
        }]))
        .await;
    assert_matches!(unknown_product, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn create_sale_gates_on_stock_without_deducting_it() {
    let fx = SaleFixture::new().await;

    let over_stock = fx
        .app
        .state
        .sale_service
        .create(fx.create_request(vec![fx.item(51)]))
        .await;
    assert_matches!(over_stock, Err(ServiceError::InsufficientStock(_)));

    // Nothing persisted by the failed attempt.
    let leftovers = SaleItemEntity::find().all(&*fx.app.state.db).await.unwrap();
    assert!(leftovers.is_empty());

    // A successful creation checks but does not deduct stock.
    fx.app
        .state
        .sale_service
        .create(fx.create_request(vec![fx.item(50)]))
        .await
        .expect("exactly the available quantity is accepted");
    let check = fx
        .app
        .state
        .inventory_service
        .check_stock(fx.product)
        .await
        .unwrap();
    assert_eq!(check.quantity, 50);
}

#[tokio::test]
async fn item_mutations_keep_the_total_consistent() {
    let fx = SaleFixture::new().await;
    let sale = fx
        .app
        .state
        .sale_service
        .create(fx.create_request(vec![fx.item(2)]))
        .await
        .unwrap();

    // Add: 2*19.90 + 1*10.00 = 49.80
    let sale = fx
        .app
        .state
        .sale_service
        .add_item(
            sale.id,
            AddSaleItemRequest {
                product_id: fx.product,
                quantity: 1,
                unit_price: Some(dec!(10.00)),
                discount: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(sale.total, dec!(49.80));

    let added_item = sale
        .items
        .as_ref()
        .unwrap()
        .iter()
        .find(|item| item.unit_price == dec!(10.00))
        .unwrap()
        .id;

    // Update: quantity 1 -> 4 with 2.00 off: 2*19.90 + (4*10.00 - 2.00) = 77.80
    let sale = fx
        .app
        .state
        .sale_service
        .update_item(
            sale.id,
            added_item,
            UpdateSaleItemRequest {
                quantity: Some(4),
                unit_price: None,
                discount: Some(dec!(2.00)),
            },
        )
        .await
        .unwrap();
    assert_eq!(sale.total, dec!(77.80));

    // Remove: back to 39.80
    let sale = fx
        .app
        .state
        .sale_service
        .remove_item(sale.id, added_item)
        .await
        .unwrap();
    assert_eq!(sale.total, dec!(39.80));

    let missing = fx
        .app
        .state
        .sale_service
        .remove_item(sale.id, added_item)
        .await;
    assert_matches!(missing, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn sale_update_applies_discount_and_tax_to_the_total() {
    let fx = SaleFixture::new().await;
    let sale = fx
        .app
        .state
        .sale_service
        .create(fx.create_request(vec![fx.item(2)]))
        .await
        .unwrap();

    let updated = fx
        .app
        .state
        .sale_service
        .update(
            sale.id,
            UpdateSaleRequest {
                customer_id: None,
                notes: Some("volume deal".to_string()),
                discount: Some(dec!(4.80)),
                tax: Some(dec!(1.00)),
            },
        )
        .await
        .unwrap();

    // 39.80 - 4.80 + 1.00
    assert_eq!(updated.total, dec!(36.00));
    assert_eq!(updated.notes.as_deref(), Some("volume deal"));
}

#[tokio::test]
async fn cancel_follows_the_status_rules() {
    let fx = SaleFixture::new().await;
    let sale = fx
        .app
        .state
        .sale_service
        .create(fx.create_request(vec![fx.item(1)]))
        .await
        .unwrap();

    // DRAFT -> COMPLETED is reachable through the guarded transition.
    let completed = fx
        .app
        .state
        .sale_service
        .update_status(sale.id, SaleStatus::Completed)
        .await
        .unwrap();
    assert_eq!(completed.status, "COMPLETED");

    let cancel_completed = fx.app.state.sale_service.cancel(sale.id).await;
    assert_matches!(cancel_completed, Err(ServiceError::Conflict(_)));

    let draft = fx
        .app
        .state
        .sale_service
        .create(fx.create_request(vec![fx.item(1)]))
        .await
        .unwrap();
    let cancelled = fx.app.state.sale_service.cancel(draft.id).await.unwrap();
    assert_eq!(cancelled.status, "CANCELLED");
}

#[tokio::test]
async fn terminal_states_block_edits_and_further_transitions() {
    let fx = SaleFixture::new().await;
    let sale = fx
        .app
        .state
        .sale_service
        .create(fx.create_request(vec![fx.item(1)]))
        .await
        .unwrap();

    fx.app
        .state
        .sale_service
        .update_status(sale.id, SaleStatus::Completed)
        .await
        .unwrap();

    let reopen = fx
        .app
        .state
        .sale_service
        .update_status(sale.id, SaleStatus::Pending)
        .await;
    assert_matches!(reopen, Err(ServiceError::Conflict(_)));

    let edit = fx
        .app
        .state
        .sale_service
        .update(
            sale.id,
            UpdateSaleRequest {
                customer_id: None,
                notes: Some("too late".to_string()),
                discount: None,
                tax: None,
            },
        )
        .await;
    assert_matches!(edit, Err(ServiceError::Conflict(_)));

    let add = fx
        .app
        .state
        .sale_service
        .add_item(
            sale.id,
            AddSaleItemRequest {
                product_id: fx.product,
                quantity: 1,
                unit_price: None,
                discount: None,
            },
        )
        .await;
    assert_matches!(add, Err(ServiceError::Conflict(_)));
}

#[tokio::test]
async fn empty_sale_cannot_be_finalized() {
    let fx = SaleFixture::new().await;
    let sale = fx
        .app
        .state
        .sale_service
        .create(fx.create_request(vec![]))
        .await
        .unwrap();
    assert_eq!(sale.total, dec!(0));

    let finalize = fx
        .app
        .state
        .sale_service
        .update_status(sale.id, SaleStatus::Confirmed)
        .await;
    assert_matches!(finalize, Err(ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn list_filters_by_status_and_omits_items() {
    let fx = SaleFixture::new().await;
    let draft = fx
        .app
        .state
        .sale_service
        .create(fx.create_request(vec![fx.item(1)]))
        .await
        .unwrap();
    let cancelled = fx
        .app
        .state
        .sale_service
        .create(fx.create_request(vec![fx.item(1)]))
        .await
        .unwrap();
    fx.app.state.sale_service.cancel(cancelled.id).await.unwrap();

    let drafts = fx
        .app
        .state
        .sale_service
        .find_all(
            SaleFilters {
                customer_id: Some(fx.customer),
                user_id: None,
                status: Some(SaleStatus::Draft),
            },
            1,
            20,
        )
        .await
        .unwrap();

    assert_eq!(drafts.total, 1);
    assert_eq!(drafts.sales[0].id, draft.id);
    assert!(drafts.sales[0].items.is_none());
}
