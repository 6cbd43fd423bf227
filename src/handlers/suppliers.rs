use super::common::PaginationParams;
use crate::errors::ServiceError;
use crate::services::suppliers::{CreateSupplierRequest, UpdateSupplierRequest};
use crate::AppState;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SupplierListQuery {
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

async fn create_supplier(
    State(state): State<AppState>,
    Json(payload): Json<CreateSupplierRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.supplier_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let supplier = state.supplier_service.find_by_id(id).await?;
    Ok(Json(supplier))
}

async fn list_suppliers(
    State(state): State<AppState>,
    Query(query): Query<SupplierListQuery>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = pagination.normalized();
    let suppliers = state
        .supplier_service
        .find_many(query.search, query.is_active, page, per_page)
        .await?;
    Ok(Json(suppliers))
}

async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSupplierRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state.supplier_service.update(id, payload).await?;
    Ok(Json(updated))
}

async fn deactivate_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let deactivated = state.supplier_service.deactivate(id).await?;
    Ok(Json(deactivated))
}

pub fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route(
            "/:id",
            get(get_supplier)
                .put(update_supplier)
                .delete(deactivate_supplier),
        )
}
