mod common;

use common::TestApp;
use rust_decimal_macros::dec;

// Two callers racing for more stock than exists: exactly one may win,
// and the stored quantity must never go negative.
#[tokio::test]
async fn concurrent_overdraw_yields_exactly_one_success() {
    let app = TestApp::new().await;
    let user = app.seed_user().await;
    let category = app.seed_category().await;
    let product = app.seed_product(category, dec!(10.00)).await;
    app.seed_inventory(product, 10, 2).await;

    let svc_a = app.state.inventory_service.clone();
    let svc_b = app.state.inventory_service.clone();

    let a = tokio::spawn(async move {
        svc_a
            .remove_stock(product, 6, "first buyer".to_string(), user, None)
            .await
            .is_ok()
    });
    let b = tokio::spawn(async move {
        svc_b
            .remove_stock(product, 6, "second buyer".to_string(), user, None)
            .await
            .is_ok()
    });

    let results = [a.await.unwrap(), b.await.unwrap()];
    let successes = results.iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one of the two removals may succeed");

    let check = app
        .state
        .inventory_service
        .check_stock(product)
        .await
        .unwrap();
    assert_eq!(check.quantity, 4);
}

#[tokio::test]
async fn concurrent_unit_removals_never_drive_stock_negative() {
    let app = TestApp::new().await;
    let user = app.seed_user().await;
    let category = app.seed_category().await;
    let product = app.seed_product(category, dec!(10.00)).await;
    app.seed_inventory(product, 10, 2).await;

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let svc = app.state.inventory_service.clone();
        tasks.push(tokio::spawn(async move {
            svc.remove_stock(product, 1, "unit sale".to_string(), user, None)
                .await
                .is_ok()
        }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await.unwrap() {
            successes += 1;
        }
    }
    assert_eq!(successes, 10, "only the stock on hand may be removed");

    let check = app
        .state
        .inventory_service
        .check_stock(product)
        .await
        .unwrap();
    assert_eq!(check.quantity, 0);
    assert!(!check.available);
}
