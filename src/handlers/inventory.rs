use super::common::PaginationParams;
use crate::errors::ServiceError;
use crate::services::inventory::{
    CreateInventoryRequest, InventoryFilters, MovementFilters, StockAdjustmentRequest,
    UpdateInventoryRequest,
};
use crate::AppState;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Body for a signed stock adjustment, carrying the acting user.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustStockBody {
    pub product_id: Uuid,
    pub quantity: i32,
    pub reason: String,
    pub user_id: Uuid,
}

/// Body for directional stock movements (add/remove).
#[derive(Debug, Deserialize, ToSchema)]
pub struct StockMovementBody {
    pub product_id: Uuid,
    pub quantity: i32,
    pub reason: String,
    pub user_id: Uuid,
    pub sale_id: Option<Uuid>,
}

/// Body for threshold/location/quantity edits.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateInventoryBody {
    pub quantity: Option<i32>,
    pub min_stock: Option<i32>,
    pub max_stock: Option<i32>,
    pub location: Option<String>,
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct ReserveQuery {
    pub quantity: i32,
}

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_inventory).post(create_inventory))
        .route("/stats", get(inventory_stats))
        .route("/low-stock", get(low_stock_alert))
        .route("/out-of-stock", get(out_of_stock))
        .route("/movements", get(list_movements))
        .route("/adjust", post(adjust_stock))
        .route("/add", post(add_stock))
        .route("/remove", post(remove_stock))
        .route("/product/:product_id", get(get_by_product))
        .route("/product/:product_id/movements", get(product_movements))
        .route("/check/:product_id", get(check_stock))
        .route("/reserve/:product_id", get(reserve_stock))
        .route("/:id", get(get_inventory).put(update_inventory))
}

/// List stock records with filtering and pagination
#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    params(InventoryFilters, PaginationParams),
    responses(
        (status = 200, description = "Inventory list returned"),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(filters): Query<InventoryFilters>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = pagination.normalized();
    let list = state
        .inventory_service
        .find_many(filters, page, per_page)
        .await?;
    Ok(Json(list))
}

/// Create the stock record for a product
#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    request_body = CreateInventoryRequest,
    responses(
        (status = 201, description = "Inventory created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Inventory already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_inventory(
    State(state): State<AppState>,
    Json(payload): Json<CreateInventoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.inventory_service.create_for_product(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Fetch one stock record
#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory id")),
    responses(
        (status = 200, description = "Inventory returned"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_inventory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let inventory = state.inventory_service.find_by_id(id).await?;
    Ok(Json(inventory))
}

/// Update thresholds, location or quantity
#[utoipa::path(
    put,
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory id")),
    request_body = UpdateInventoryBody,
    responses(
        (status = 200, description = "Inventory updated"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn update_inventory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInventoryBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = UpdateInventoryRequest {
        quantity: payload.quantity,
        min_stock: payload.min_stock,
        max_stock: payload.max_stock,
        location: payload.location,
    };
    let updated = state
        .inventory_service
        .update(id, request, payload.user_id)
        .await?;
    Ok(Json(updated))
}

/// Stock record for a product
#[utoipa::path(
    get,
    path = "/api/v1/inventory/product/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Inventory returned"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_by_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let inventory = state
        .inventory_service
        .find_by_product_id(product_id)
        .await?;
    Ok(Json(inventory))
}

/// Apply a signed stock adjustment
#[utoipa::path(
    post,
    path = "/api/v1/inventory/adjust",
    request_body = AdjustStockBody,
    responses(
        (status = 200, description = "Stock adjusted"),
        (status = 400, description = "Adjustment would drive stock negative", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Json(payload): Json<AdjustStockBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = StockAdjustmentRequest {
        product_id: payload.product_id,
        quantity: payload.quantity,
        reason: payload.reason,
    };
    let updated = state
        .inventory_service
        .adjust_stock(request, payload.user_id)
        .await?;
    Ok(Json(updated))
}

/// Record an inbound stock movement
#[utoipa::path(
    post,
    path = "/api/v1/inventory/add",
    request_body = StockMovementBody,
    responses(
        (status = 200, description = "Stock added"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn add_stock(
    State(state): State<AppState>,
    Json(payload): Json<StockMovementBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state
        .inventory_service
        .add_stock(
            payload.product_id,
            payload.quantity,
            payload.reason,
            payload.user_id,
        )
        .await?;
    Ok(Json(updated))
}

/// Record an outbound stock movement
#[utoipa::path(
    post,
    path = "/api/v1/inventory/remove",
    request_body = StockMovementBody,
    responses(
        (status = 200, description = "Stock removed"),
        (status = 400, description = "Insufficient stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn remove_stock(
    State(state): State<AppState>,
    Json(payload): Json<StockMovementBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state
        .inventory_service
        .remove_stock(
            payload.product_id,
            payload.quantity,
            payload.reason,
            payload.user_id,
            payload.sale_id,
        )
        .await?;
    Ok(Json(updated))
}

/// Availability probe; never fails for unknown products
#[utoipa::path(
    get,
    path = "/api/v1/inventory/check/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product id")),
    responses((status = 200, description = "Stock check returned")),
    tag = "inventory"
)]
pub async fn check_stock(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let check = state.inventory_service.check_stock(product_id).await?;
    Ok(Json(check))
}

/// Non-binding availability check for a requested quantity
#[utoipa::path(
    get,
    path = "/api/v1/inventory/reserve/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product id"), ReserveQuery),
    responses((status = 200, description = "Reservation check returned")),
    tag = "inventory"
)]
pub async fn reserve_stock(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<ReserveQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let available = state
        .inventory_service
        .reserve_stock(product_id, query.quantity)
        .await?;
    Ok(Json(serde_json::json!({ "available": available })))
}

/// Movement history with filters
#[utoipa::path(
    get,
    path = "/api/v1/inventory/movements",
    params(MovementFilters, PaginationParams),
    responses((status = 200, description = "Movement list returned")),
    tag = "inventory"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Query(filters): Query<MovementFilters>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = pagination.normalized();
    let movements = state
        .inventory_service
        .get_movements(filters, page, per_page)
        .await?;
    Ok(Json(movements))
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct ProductMovementsQuery {
    pub limit: Option<u64>,
}

/// Recent movements for one product
#[utoipa::path(
    get,
    path = "/api/v1/inventory/product/{product_id}/movements",
    params(("product_id" = Uuid, Path, description = "Product id"), ProductMovementsQuery),
    responses((status = 200, description = "Movements returned")),
    tag = "inventory"
)]
pub async fn product_movements(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<ProductMovementsQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let movements = state
        .inventory_service
        .get_product_movements(product_id, query.limit)
        .await?;
    Ok(Json(movements))
}

/// Aggregate stock statistics
#[utoipa::path(
    get,
    path = "/api/v1/inventory/stats",
    responses((status = 200, description = "Statistics returned")),
    tag = "inventory"
)]
pub async fn inventory_stats(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let stats = state.inventory_service.get_statistics().await?;
    Ok(Json(stats))
}

/// Stock records at or below the reorder threshold
#[utoipa::path(
    get,
    path = "/api/v1/inventory/low-stock",
    responses((status = 200, description = "Low stock list returned")),
    tag = "inventory"
)]
pub async fn low_stock_alert(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let items = state.inventory_service.low_stock_alert().await?;
    Ok(Json(items))
}

/// Stock records with zero quantity
#[utoipa::path(
    get,
    path = "/api/v1/inventory/out-of-stock",
    responses((status = 200, description = "Out of stock list returned")),
    tag = "inventory"
)]
pub async fn out_of_stock(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let items = state.inventory_service.out_of_stock().await?;
    Ok(Json(items))
}
