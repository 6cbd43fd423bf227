use super::common::PaginationParams;
use crate::entities::sale::SaleStatus;
use crate::errors::ServiceError;
use crate::services::sales::{
    AddSaleItemRequest, CreateSaleRequest, SaleFilters, UpdateSaleItemRequest, UpdateSaleRequest,
};
use crate::AppState;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSaleStatusBody {
    pub status: SaleStatus,
}

pub fn sales_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route("/:id", get(get_sale).put(update_sale))
        .route("/:id/cancel", post(cancel_sale))
        .route("/:id/status", put(update_sale_status))
        .route("/:id/items", post(add_item))
        .route("/:id/items/:item_id", put(update_item).delete(remove_item))
}

/// Create a sale with its line items
#[utoipa::path(
    post,
    path = "/api/v1/sales",
    request_body = CreateSaleRequest,
    responses(
        (status = 201, description = "Sale created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Customer, user or product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn create_sale(
    State(state): State<AppState>,
    Json(payload): Json<CreateSaleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let sale = state.sale_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// Fetch one sale with items
#[utoipa::path(
    get,
    path = "/api/v1/sales/{id}",
    params(("id" = Uuid, Path, description = "Sale id")),
    responses(
        (status = 200, description = "Sale returned"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let sale = state.sale_service.find_by_id(id).await?;
    Ok(Json(sale))
}

/// Filtered, paginated sale list without line items
#[utoipa::path(
    get,
    path = "/api/v1/sales",
    params(SaleFilters, PaginationParams),
    responses((status = 200, description = "Sale list returned")),
    tag = "sales"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    Query(filters): Query<SaleFilters>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = pagination.normalized();
    let sales = state.sale_service.find_all(filters, page, per_page).await?;
    Ok(Json(sales))
}

/// Update sale-level fields while editable
#[utoipa::path(
    put,
    path = "/api/v1/sales/{id}",
    params(("id" = Uuid, Path, description = "Sale id")),
    request_body = UpdateSaleRequest,
    responses(
        (status = 200, description = "Sale updated"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Sale not editable", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn update_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSaleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let sale = state.sale_service.update(id, payload).await?;
    Ok(Json(sale))
}

/// Cancel a sale
#[utoipa::path(
    post,
    path = "/api/v1/sales/{id}/cancel",
    params(("id" = Uuid, Path, description = "Sale id")),
    responses(
        (status = 200, description = "Sale cancelled"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Sale not cancellable", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn cancel_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let sale = state.sale_service.cancel(id).await?;
    Ok(Json(sale))
}

/// Guarded status transition
#[utoipa::path(
    put,
    path = "/api/v1/sales/{id}/status",
    params(("id" = Uuid, Path, description = "Sale id")),
    request_body = UpdateSaleStatusBody,
    responses(
        (status = 200, description = "Status changed"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn update_sale_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSaleStatusBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let sale = state.sale_service.update_status(id, payload.status).await?;
    Ok(Json(sale))
}

/// Append a line item
#[utoipa::path(
    post,
    path = "/api/v1/sales/{id}/items",
    params(("id" = Uuid, Path, description = "Sale id")),
    request_body = AddSaleItemRequest,
    responses(
        (status = 200, description = "Item added"),
        (status = 404, description = "Sale or product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Sale not editable", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddSaleItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let sale = state.sale_service.add_item(id, payload).await?;
    Ok(Json(sale))
}

/// Update one line item
#[utoipa::path(
    put,
    path = "/api/v1/sales/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Sale id"),
        ("item_id" = Uuid, Path, description = "Item id")
    ),
    request_body = UpdateSaleItemRequest,
    responses(
        (status = 200, description = "Item updated"),
        (status = 404, description = "Item not found in this sale", body = crate::errors::ErrorResponse),
        (status = 409, description = "Sale not editable", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateSaleItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let sale = state.sale_service.update_item(id, item_id, payload).await?;
    Ok(Json(sale))
}

/// Remove one line item
#[utoipa::path(
    delete,
    path = "/api/v1/sales/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Sale id"),
        ("item_id" = Uuid, Path, description = "Item id")
    ),
    responses(
        (status = 200, description = "Item removed"),
        (status = 404, description = "Item not found in this sale", body = crate::errors::ErrorResponse),
        (status = 409, description = "Sale not editable", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ServiceError> {
    let sale = state.sale_service.remove_item(id, item_id).await?;
    Ok(Json(sale))
}
