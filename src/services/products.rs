use crate::{
    db::DbPool,
    entities::{
        category::Entity as CategoryEntity,
        product::{self, Entity as ProductEntity},
        supplier::Entity as SupplierEntity,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9\-_]{3,20}$").unwrap());
static BARCODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{8,14}$").unwrap());

const MAX_PRICE: Decimal = dec!(999999.99);

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 3, max = 255))]
    pub name: String,
    #[validate(length(min = 10, max = 1000))]
    pub description: Option<String>,
    pub price: Decimal,
    #[validate(regex(path = "CODE_RE", message = "Code must be 3-20 uppercase letters, digits, hyphen or underscore"))]
    pub code: String,
    #[validate(regex(path = "BARCODE_RE", message = "Barcode must be 8-14 digits"))]
    pub barcode: Option<String>,
    pub category_id: Uuid,
    pub supplier_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 3, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 10, max = 1000))]
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[validate(regex(path = "BARCODE_RE", message = "Barcode must be 8-14 digits"))]
    pub barcode: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct ProductFilters {
    /// Matches name, code or barcode
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub code: String,
    pub barcode: Option<String>,
    pub is_active: bool,
    pub category_id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            code: model.code,
            barcode: model.barcode,
            is_active: model.is_active,
            category_id: model.category_id,
            supplier_id: model.supplier_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductListResponse {
    pub products: Vec<ProductResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Catalog service for products.
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create(
        &self,
        request: CreateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        validate_price(request.price)?;

        let db = &*self.db_pool;

        let category = CategoryEntity::find_by_id(request.category_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))?;
        if !category.is_active {
            return Err(ServiceError::InvalidInput(
                "Product cannot be assigned to an inactive category".to_string(),
            ));
        }

        if let Some(supplier_id) = request.supplier_id {
            let supplier = SupplierEntity::find_by_id(supplier_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Supplier not found".to_string()))?;
            if !supplier.is_active {
                return Err(ServiceError::InvalidInput(
                    "Product cannot be assigned to an inactive supplier".to_string(),
                ));
            }
        }

        let code_taken = ProductEntity::find()
            .filter(product::Column::Code.eq(&request.code))
            .count(db)
            .await?;
        if code_taken > 0 {
            return Err(ServiceError::Conflict(
                "Product code already in use".to_string(),
            ));
        }
        if let Some(barcode) = &request.barcode {
            let barcode_taken = ProductEntity::find()
                .filter(product::Column::Barcode.eq(barcode))
                .count(db)
                .await?;
            if barcode_taken > 0 {
                return Err(ServiceError::Conflict(
                    "Product barcode already in use".to_string(),
                ));
            }
        }

        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            description: Set(request.description),
            price: Set(request.price),
            code: Set(request.code),
            barcode: Set(request.barcode),
            is_active: Set(true),
            category_id: Set(request.category_id),
            supplier_id: Set(request.supplier_id),
            ..Default::default()
        };
        let created = model.insert(db).await?;

        info!(product_id = %created.id, "Product created");
        if let Err(e) = self.event_sender.send(Event::ProductCreated(created.id)).await {
            warn!(error = %e, "Failed to send product created event");
        }

        Ok(created.into())
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<ProductResponse, ServiceError> {
        let product = ProductEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;
        Ok(product.into())
    }

    #[instrument(skip(self))]
    pub async fn find_many(
        &self,
        filters: ProductFilters,
        page: u64,
        per_page: u64,
    ) -> Result<ProductListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = ProductEntity::find();
        if let Some(search) = &filters.search {
            query = query.filter(
                product::Column::Name
                    .contains(search)
                    .or(product::Column::Code.contains(search))
                    .or(product::Column::Barcode.contains(search)),
            );
        }
        if let Some(category_id) = filters.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(supplier_id) = filters.supplier_id {
            query = query.filter(product::Column::SupplierId.eq(supplier_id));
        }
        if let Some(is_active) = filters.is_active {
            query = query.filter(product::Column::IsActive.eq(is_active));
        }

        let paginator = query
            .order_by_asc(product::Column::Name)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(ProductListResponse {
            products: products.into_iter().map(Into::into).collect(),
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, request), fields(product_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let product = ProductEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        if let Some(price) = request.price {
            validate_price(price)?;
        }
        if let Some(category_id) = request.category_id {
            let category = CategoryEntity::find_by_id(category_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))?;
            if !category.is_active {
                return Err(ServiceError::InvalidInput(
                    "Product cannot be assigned to an inactive category".to_string(),
                ));
            }
        }
        if let Some(barcode) = &request.barcode {
            let duplicate = ProductEntity::find()
                .filter(product::Column::Barcode.eq(barcode))
                .filter(product::Column::Id.ne(id))
                .count(db)
                .await?;
            if duplicate > 0 {
                return Err(ServiceError::Conflict(
                    "Product barcode already in use".to_string(),
                ));
            }
        }

        let mut active: product::ActiveModel = product.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(barcode) = request.barcode {
            active.barcode = Set(Some(barcode));
        }
        if let Some(category_id) = request.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(supplier_id) = request.supplier_id {
            active.supplier_id = Set(Some(supplier_id));
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(db).await?;

        if let Err(e) = self.event_sender.send(Event::ProductUpdated(id)).await {
            warn!(error = %e, "Failed to send product updated event");
        }

        Ok(updated.into())
    }

    /// Soft delete: products referenced by sales and movements are never
    /// removed, only retired from the catalog.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn deactivate(&self, id: Uuid) -> Result<ProductResponse, ServiceError> {
        let db = &*self.db_pool;
        let product = ProductEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        if !product.is_active {
            return Err(ServiceError::Conflict(
                "Product is already inactive".to_string(),
            ));
        }

        let mut active: product::ActiveModel = product.into();
        active.is_active = Set(false);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(db).await?;

        info!(product_id = %id, "Product deactivated");
        if let Err(e) = self.event_sender.send(Event::ProductDeactivated(id)).await {
            warn!(error = %e, "Failed to send product deactivated event");
        }

        Ok(updated.into())
    }
}

fn validate_price(price: Decimal) -> Result<(), ServiceError> {
    if price <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Price must be greater than zero".to_string(),
        ));
    }
    if price > MAX_PRICE {
        return Err(ServiceError::ValidationError(
            "Price exceeds the allowed maximum".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn price_bounds() {
        assert!(validate_price(dec!(0.01)).is_ok());
        assert!(validate_price(dec!(999999.99)).is_ok());
        assert_matches!(validate_price(dec!(0)), Err(ServiceError::ValidationError(_)));
        assert_matches!(
            validate_price(dec!(1000000.00)),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn code_pattern_accepts_sku_style_codes() {
        assert!(CODE_RE.is_match("PRD-001"));
        assert!(CODE_RE.is_match("ABC_99"));
        assert!(!CODE_RE.is_match("ab"));
        assert!(!CODE_RE.is_match("lowercase"));
        assert!(!CODE_RE.is_match("HAS SPACE"));
    }

    #[test]
    fn barcode_pattern_requires_digits_only() {
        assert!(BARCODE_RE.is_match("12345678"));
        assert!(BARCODE_RE.is_match("12345678901234"));
        assert!(!BARCODE_RE.is_match("1234567"));
        assert!(!BARCODE_RE.is_match("12345678a"));
    }
}
