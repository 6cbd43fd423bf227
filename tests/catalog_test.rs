mod common;

use assert_matches::assert_matches;
use common::TestApp;
use mercantil_api::entities::user::UserRole;
use mercantil_api::errors::ServiceError;
use mercantil_api::services::categories::CreateCategoryRequest;
use mercantil_api::services::customers::{CreateCustomerRequest, UpdateCustomerRequest};
use mercantil_api::services::products::{CreateProductRequest, UpdateProductRequest};
use mercantil_api::services::users::CreateUserRequest;
use rust_decimal_macros::dec;

fn product_request(category_id: uuid::Uuid, code: &str) -> CreateProductRequest {
    CreateProductRequest {
        name: "Ground Coffee 500g".to_string(),
        description: None,
        price: dec!(24.90),
        code: code.to_string(),
        barcode: None,
        category_id,
        supplier_id: None,
    }
}

#[tokio::test]
async fn product_code_and_barcode_are_unique() {
    let app = TestApp::new().await;
    let category = app.seed_category().await;

    let first = app
        .state
        .product_service
        .create(CreateProductRequest {
            barcode: Some("7891234567895".to_string()),
            ..product_request(category, "COF-500")
        })
        .await
        .expect("first product");

    let dup_code = app
        .state
        .product_service
        .create(product_request(category, "COF-500"))
        .await;
    assert_matches!(dup_code, Err(ServiceError::Conflict(_)));

    let dup_barcode = app
        .state
        .product_service
        .create(CreateProductRequest {
            barcode: Some("7891234567895".to_string()),
            ..product_request(category, "COF-501")
        })
        .await;
    assert_matches!(dup_barcode, Err(ServiceError::Conflict(_)));

    // Soft delete, then a second delete is a conflict.
    let deactivated = app
        .state
        .product_service
        .deactivate(first.id)
        .await
        .unwrap();
    assert!(!deactivated.is_active);
    let again = app.state.product_service.deactivate(first.id).await;
    assert_matches!(again, Err(ServiceError::Conflict(_)));
}

#[tokio::test]
async fn product_requires_an_active_category() {
    let app = TestApp::new().await;
    let category = app
        .state
        .category_service
        .create(CreateCategoryRequest {
            name: "Seasonal".to_string(),
            description: None,
            cnae: None,
        })
        .await
        .unwrap();

    let product = app
        .state
        .product_service
        .create(product_request(category.id, "SEA-001"))
        .await
        .unwrap();

    // Category with an active product cannot be deactivated.
    let blocked = app.state.category_service.deactivate(category.id).await;
    assert_matches!(blocked, Err(ServiceError::Conflict(_)));

    // After retiring the product, deactivation goes through and new
    // products may no longer join the category.
    app.state
        .product_service
        .update(
            product.id,
            UpdateProductRequest {
                name: None,
                description: None,
                price: None,
                barcode: None,
                category_id: None,
                supplier_id: None,
                is_active: Some(false),
            },
        )
        .await
        .unwrap();
    app.state
        .category_service
        .deactivate(category.id)
        .await
        .unwrap();

    let rejected = app
        .state
        .product_service
        .create(product_request(category.id, "SEA-002"))
        .await;
    assert_matches!(rejected, Err(ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn user_email_is_unique_and_role_defaults_to_salesperson() {
    let app = TestApp::new().await;

    let created = app
        .state
        .user_service
        .create(CreateUserRequest {
            name: "Paula Mendes".to_string(),
            email: "paula@mercantil.dev".to_string(),
            password: "s3cret-pass".to_string(),
            role: None,
        })
        .await
        .unwrap();
    assert_eq!(created.role, "SALESPERSON");

    let duplicate = app
        .state
        .user_service
        .create(CreateUserRequest {
            name: "Other Paula".to_string(),
            email: "paula@mercantil.dev".to_string(),
            password: "another-pass".to_string(),
            role: Some(UserRole::Manager),
        })
        .await;
    assert_matches!(duplicate, Err(ServiceError::Conflict(_)));
}

#[tokio::test]
async fn customer_document_is_unique_and_deactivation_is_idempotent_guarded() {
    let app = TestApp::new().await;

    let created = app
        .state
        .customer_service
        .create(CreateCustomerRequest {
            name: "Mercearia do Centro".to_string(),
            email: None,
            phone: None,
            address: None,
            neighborhood: None,
            city: None,
            state: None,
            zip_code: None,
            document: Some("12345678000195".to_string()),
            customer_type: None,
        })
        .await
        .unwrap();
    assert_eq!(created.customer_type, "RETAIL");

    let duplicate = app
        .state
        .customer_service
        .create(CreateCustomerRequest {
            name: "Outra Mercearia".to_string(),
            email: None,
            phone: None,
            address: None,
            neighborhood: None,
            city: None,
            state: None,
            zip_code: None,
            document: Some("12345678000195".to_string()),
            customer_type: None,
        })
        .await;
    assert_matches!(duplicate, Err(ServiceError::Conflict(_)));

    app.state
        .customer_service
        .deactivate(created.id)
        .await
        .unwrap();
    let again = app.state.customer_service.deactivate(created.id).await;
    assert_matches!(again, Err(ServiceError::Conflict(_)));

    // Partial update still works on inactive customers.
    let renamed = app
        .state
        .customer_service
        .update(
            created.id,
            UpdateCustomerRequest {
                name: Some("Mercearia Central".to_string()),
                email: None,
                phone: None,
                address: None,
                neighborhood: None,
                city: None,
                state: None,
                zip_code: None,
                document: None,
                customer_type: None,
                is_active: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Mercearia Central");
    assert!(!renamed.is_active);
}
