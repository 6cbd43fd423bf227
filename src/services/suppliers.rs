use crate::{
    db::DbPool,
    entities::supplier::{self, Entity as SupplierEntity},
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

static CNPJ_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}$").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(\d{2}\)\s\d{4,5}-\d{4}$").unwrap());
static STATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}$").unwrap());
static ZIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}-\d{3}$").unwrap());

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 3, max = 255))]
    pub name: String,
    #[validate(length(min = 3, max = 100))]
    pub contact_person: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(regex(path = "PHONE_RE", message = "Phone must match (NN) NNNNN-NNNN"))]
    pub phone: Option<String>,
    #[validate(length(min = 10, max = 500))]
    pub address: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub city: Option<String>,
    #[validate(regex(path = "STATE_RE", message = "State must be 2 uppercase letters"))]
    pub state: Option<String>,
    #[validate(regex(path = "ZIP_RE", message = "Zip code must match NNNNN-NNN"))]
    pub zip_code: Option<String>,
    #[validate(regex(path = "CNPJ_RE", message = "CNPJ must match NN.NNN.NNN/NNNN-NN"))]
    pub cnpj: Option<String>,
    #[validate(length(max = 255))]
    pub website: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSupplierRequest {
    #[validate(length(min = 3, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 3, max = 100))]
    pub contact_person: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(regex(path = "PHONE_RE", message = "Phone must match (NN) NNNNN-NNNN"))]
    pub phone: Option<String>,
    #[validate(length(min = 10, max = 500))]
    pub address: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub city: Option<String>,
    #[validate(regex(path = "STATE_RE", message = "State must be 2 uppercase letters"))]
    pub state: Option<String>,
    #[validate(regex(path = "ZIP_RE", message = "Zip code must match NNNNN-NNN"))]
    pub zip_code: Option<String>,
    #[validate(regex(path = "CNPJ_RE", message = "CNPJ must match NN.NNN.NNN/NNNN-NN"))]
    pub cnpj: Option<String>,
    #[validate(length(max = 255))]
    pub website: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SupplierResponse {
    pub id: Uuid,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub cnpj: Option<String>,
    pub website: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<supplier::Model> for SupplierResponse {
    fn from(model: supplier::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            contact_person: model.contact_person,
            email: model.email,
            phone: model.phone,
            address: model.address,
            city: model.city,
            state: model.state,
            zip_code: model.zip_code,
            cnpj: model.cnpj,
            website: model.website,
            notes: model.notes,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SupplierListResponse {
    pub suppliers: Vec<SupplierResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone)]
pub struct SupplierService {
    db_pool: Arc<DbPool>,
}

impl SupplierService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        request: CreateSupplierRequest,
    ) -> Result<SupplierResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        if let Some(cnpj) = &request.cnpj {
            let duplicate = SupplierEntity::find()
                .filter(supplier::Column::Cnpj.eq(cnpj))
                .count(db)
                .await?;
            if duplicate > 0 {
                return Err(ServiceError::Conflict(
                    "Supplier CNPJ already registered".to_string(),
                ));
            }
        }

        let model = supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            contact_person: Set(request.contact_person),
            email: Set(request.email),
            phone: Set(request.phone),
            address: Set(request.address),
            city: Set(request.city),
            state: Set(request.state),
            zip_code: Set(request.zip_code),
            cnpj: Set(request.cnpj),
            website: Set(request.website),
            notes: Set(request.notes),
            is_active: Set(true),
            ..Default::default()
        };
        let created = model.insert(db).await?;
        info!(supplier_id = %created.id, "Supplier created");
        Ok(created.into())
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<SupplierResponse, ServiceError> {
        let supplier = SupplierEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Supplier not found".to_string()))?;
        Ok(supplier.into())
    }

    #[instrument(skip(self))]
    pub async fn find_many(
        &self,
        search: Option<String>,
        is_active: Option<bool>,
        page: u64,
        per_page: u64,
    ) -> Result<SupplierListResponse, ServiceError> {
        let mut query = SupplierEntity::find();
        if let Some(search) = &search {
            query = query.filter(
                supplier::Column::Name
                    .contains(search)
                    .or(supplier::Column::Cnpj.contains(search)),
            );
        }
        if let Some(is_active) = is_active {
            query = query.filter(supplier::Column::IsActive.eq(is_active));
        }

        let paginator = query
            .order_by_asc(supplier::Column::Name)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let suppliers = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(SupplierListResponse {
            suppliers: suppliers.into_iter().map(Into::into).collect(),
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, request), fields(supplier_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateSupplierRequest,
    ) -> Result<SupplierResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let supplier = SupplierEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Supplier not found".to_string()))?;

        if let Some(cnpj) = &request.cnpj {
            let duplicate = SupplierEntity::find()
                .filter(supplier::Column::Cnpj.eq(cnpj))
                .filter(supplier::Column::Id.ne(id))
                .count(db)
                .await?;
            if duplicate > 0 {
                return Err(ServiceError::Conflict(
                    "Supplier CNPJ already registered".to_string(),
                ));
            }
        }

        let mut active: supplier::ActiveModel = supplier.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(contact_person) = request.contact_person {
            active.contact_person = Set(Some(contact_person));
        }
        if let Some(email) = request.email {
            active.email = Set(Some(email));
        }
        if let Some(phone) = request.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(address) = request.address {
            active.address = Set(Some(address));
        }
        if let Some(city) = request.city {
            active.city = Set(Some(city));
        }
        if let Some(state) = request.state {
            active.state = Set(Some(state));
        }
        if let Some(zip_code) = request.zip_code {
            active.zip_code = Set(Some(zip_code));
        }
        if let Some(cnpj) = request.cnpj {
            active.cnpj = Set(Some(cnpj));
        }
        if let Some(website) = request.website {
            active.website = Set(Some(website));
        }
        if let Some(notes) = request.notes {
            active.notes = Set(Some(notes));
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));
        Ok(active.update(db).await?.into())
    }

    #[instrument(skip(self), fields(supplier_id = %id))]
    pub async fn deactivate(&self, id: Uuid) -> Result<SupplierResponse, ServiceError> {
        let db = &*self.db_pool;
        let supplier = SupplierEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Supplier not found".to_string()))?;

        if !supplier.is_active {
            return Err(ServiceError::Conflict(
                "Supplier is already inactive".to_string(),
            ));
        }

        let mut active: supplier::ActiveModel = supplier.into();
        active.is_active = Set(false);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(db).await?;
        info!(supplier_id = %id, "Supplier deactivated");
        Ok(updated.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cnpj_pattern() {
        assert!(CNPJ_RE.is_match("12.345.678/0001-95"));
        assert!(!CNPJ_RE.is_match("12345678000195"));
        assert!(!CNPJ_RE.is_match("12.345.678/0001"));
    }
}
