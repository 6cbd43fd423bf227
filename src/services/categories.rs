use crate::{
    db::DbPool,
    entities::{
        category::{self, Entity as CategoryEntity},
        product::{self, Entity as ProductEntity},
    },
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

static CNAE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}\.\d{2}-\d-\d{2}$").unwrap());

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(regex(path = "CNAE_RE", message = "CNAE must match NN.NN-N-NN"))]
    pub cnae: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(regex(path = "CNAE_RE", message = "CNAE must match NN.NN-N-NN"))]
    pub cnae: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub cnae: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<category::Model> for CategoryResponse {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            cnae: model.cnae,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Compact entry for dropdowns and filters.
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryOption {
    pub id: Uuid,
    pub name: String,
}

#[derive(Clone)]
pub struct CategoryService {
    db_pool: Arc<DbPool>,
}

impl CategoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        request: CreateCategoryRequest,
    ) -> Result<CategoryResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let duplicate = CategoryEntity::find()
            .filter(category::Column::Name.eq(&request.name))
            .count(db)
            .await?;
        if duplicate > 0 {
            return Err(ServiceError::Conflict(
                "Category name already in use".to_string(),
            ));
        }

        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            description: Set(request.description),
            cnae: Set(request.cnae),
            is_active: Set(true),
            ..Default::default()
        };
        let created = model.insert(db).await?;
        info!(category_id = %created.id, "Category created");
        Ok(created.into())
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<CategoryResponse, ServiceError> {
        let category = CategoryEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))?;
        Ok(category.into())
    }

    #[instrument(skip(self))]
    pub async fn find_many(
        &self,
        search: Option<String>,
        include_inactive: bool,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<CategoryResponse>, u64), ServiceError> {
        let mut query = CategoryEntity::find();
        if let Some(search) = &search {
            query = query.filter(category::Column::Name.contains(search));
        }
        if !include_inactive {
            query = query.filter(category::Column::IsActive.eq(true));
        }

        let paginator = query
            .order_by_asc(category::Column::Name)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let categories = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((categories.into_iter().map(Into::into).collect(), total))
    }

    /// Active categories as id/name pairs.
    pub async fn select_options(&self) -> Result<Vec<CategoryOption>, ServiceError> {
        let categories = CategoryEntity::find()
            .filter(category::Column::IsActive.eq(true))
            .order_by_asc(category::Column::Name)
            .all(&*self.db_pool)
            .await?;
        Ok(categories
            .into_iter()
            .map(|c| CategoryOption {
                id: c.id,
                name: c.name,
            })
            .collect())
    }

    #[instrument(skip(self, request), fields(category_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateCategoryRequest,
    ) -> Result<CategoryResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let category = CategoryEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))?;

        if let Some(name) = &request.name {
            let duplicate = CategoryEntity::find()
                .filter(category::Column::Name.eq(name))
                .filter(category::Column::Id.ne(id))
                .count(db)
                .await?;
            if duplicate > 0 {
                return Err(ServiceError::Conflict(
                    "Category name already in use".to_string(),
                ));
            }
        }

        let mut active: category::ActiveModel = category.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(cnae) = request.cnae {
            active.cnae = Set(Some(cnae));
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));
        Ok(active.update(db).await?.into())
    }

    /// Retires a category. Rejected while active products still point at
    /// it.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn deactivate(&self, id: Uuid) -> Result<CategoryResponse, ServiceError> {
        let db = &*self.db_pool;
        let category = CategoryEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))?;

        let active_products = ProductEntity::find()
            .filter(product::Column::CategoryId.eq(id))
            .filter(product::Column::IsActive.eq(true))
            .count(db)
            .await?;
        if active_products > 0 {
            return Err(ServiceError::Conflict(format!(
                "Category has {} active products and cannot be deactivated",
                active_products
            )));
        }

        let mut active: category::ActiveModel = category.into();
        active.is_active = Set(false);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(db).await?;
        info!(category_id = %id, "Category deactivated");
        Ok(updated.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cnae_pattern() {
        assert!(CNAE_RE.is_match("47.11-3-01"));
        assert!(!CNAE_RE.is_match("4711301"));
        assert!(!CNAE_RE.is_match("47.11-3"));
    }
}
