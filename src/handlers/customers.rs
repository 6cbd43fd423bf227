use super::common::PaginationParams;
use crate::errors::ServiceError;
use crate::services::customers::{CreateCustomerRequest, CustomerFilters, UpdateCustomerRequest};
use crate::AppState;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CreateCustomerRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.customer_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.customer_service.find_by_id(id).await?;
    Ok(Json(customer))
}

async fn list_customers(
    State(state): State<AppState>,
    Query(filters): Query<CustomerFilters>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = pagination.normalized();
    let customers = state
        .customer_service
        .find_many(filters, page, per_page)
        .await?;
    Ok(Json(customers))
}

async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state.customer_service.update(id, payload).await?;
    Ok(Json(updated))
}

async fn deactivate_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let deactivated = state.customer_service.deactivate(id).await?;
    Ok(Json(deactivated))
}

pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route(
            "/:id",
            get(get_customer)
                .put(update_customer)
                .delete(deactivate_customer),
        )
}
