use super::common::PaginationParams;
use crate::errors::ServiceError;
use crate::services::categories::{CreateCategoryRequest, UpdateCategoryRequest};
use crate::AppState;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CategoryListQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.category_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let category = state.category_service.find_by_id(id).await?;
    Ok(Json(category))
}

async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryListQuery>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = pagination.normalized();
    let (categories, total) = state
        .category_service
        .find_many(query.search, query.include_inactive, page, per_page)
        .await?;
    Ok(Json(json!({
        "categories": categories,
        "total": total,
        "page": page,
        "per_page": per_page,
    })))
}

async fn select_options(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let options = state.category_service.select_options().await?;
    Ok(Json(options))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state.category_service.update(id, payload).await?;
    Ok(Json(updated))
}

async fn deactivate_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let deactivated = state.category_service.deactivate(id).await?;
    Ok(Json(deactivated))
}

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/select-options", get(select_options))
        .route(
            "/:id",
            get(get_category)
                .put(update_category)
                .delete(deactivate_category),
        )
}
