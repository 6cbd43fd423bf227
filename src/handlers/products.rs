use super::common::PaginationParams;
use crate::errors::ServiceError;
use crate::services::products::{CreateProductRequest, ProductFilters, UpdateProductRequest};
use crate::AppState;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.product_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.product_service.find_by_id(id).await?;
    Ok(Json(product))
}

async fn list_products(
    State(state): State<AppState>,
    Query(filters): Query<ProductFilters>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = pagination.normalized();
    let products = state
        .product_service
        .find_many(filters, page, per_page)
        .await?;
    Ok(Json(products))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state.product_service.update(id, payload).await?;
    Ok(Json(updated))
}

async fn deactivate_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let deactivated = state.product_service.deactivate(id).await?;
    Ok(Json(deactivated))
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(deactivate_product),
        )
}
