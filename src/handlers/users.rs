use super::common::PaginationParams;
use crate::errors::ServiceError;
use crate::services::users::{CreateUserRequest, UpdateUserRequest};
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
pub struct UserListQuery {
    pub search: Option<String>,
}

async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.user_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.user_service.find_by_id(id).await?;
    Ok(Json(user))
}

async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = pagination.normalized();
    let (users, total) = state
        .user_service
        .find_many(query.search, page, per_page)
        .await?;
    Ok(Json(json!({
        "users": users,
        "total": total,
        "page": page,
        "per_page": per_page,
    })))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state.user_service.update(id, payload).await?;
    Ok(Json(updated))
}

async fn deactivate_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let deactivated = state.user_service.deactivate(id).await?;
    Ok(Json(deactivated))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/:id",
            get(get_user).put(update_user).delete(deactivate_user),
        )
}
