use crate::{
    db::DbPool,
    entities::{
        customer::{self, CustomerType, Entity as CustomerEntity},
        sale::{self, Entity as SaleEntity},
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

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(\d{2}\)\s\d{4,5}-\d{4}$").unwrap());
static STATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}$").unwrap());
static ZIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}-?\d{3}$").unwrap());

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 2, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(regex(path = "PHONE_RE", message = "Phone must match (NN) NNNNN-NNNN"))]
    pub phone: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub neighborhood: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(regex(path = "STATE_RE", message = "State must be 2 uppercase letters"))]
    pub state: Option<String>,
    #[validate(regex(path = "ZIP_RE", message = "Zip code must match NNNNN-NNN"))]
    pub zip_code: Option<String>,
    #[validate(length(min = 11, max = 18))]
    pub document: Option<String>,
    pub customer_type: Option<CustomerType>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 2, max = 255))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(regex(path = "PHONE_RE", message = "Phone must match (NN) NNNNN-NNNN"))]
    pub phone: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub neighborhood: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(regex(path = "STATE_RE", message = "State must be 2 uppercase letters"))]
    pub state: Option<String>,
    #[validate(regex(path = "ZIP_RE", message = "Zip code must match NNNNN-NNN"))]
    pub zip_code: Option<String>,
    #[validate(length(min = 11, max = 18))]
    pub document: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct CustomerFilters {
    /// Matches name, email or document
    pub search: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerResponse {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub document: Option<String>,
    pub customer_type: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<customer::Model> for CustomerResponse {
    fn from(model: customer::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            address: model.address,
            neighborhood: model.neighborhood,
            city: model.city,
            state: model.state,
            zip_code: model.zip_code,
            document: model.document,
            customer_type: model.customer_type,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerListResponse {
    pub customers: Vec<CustomerResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone)]
pub struct CustomerService {
    db_pool: Arc<DbPool>,
}

impl CustomerService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<CustomerResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        if let Some(document) = &request.document {
            let duplicate = CustomerEntity::find()
                .filter(customer::Column::Document.eq(document))
                .count(db)
                .await?;
            if duplicate > 0 {
                return Err(ServiceError::Conflict(
                    "Customer document already registered".to_string(),
                ));
            }
        }

        let customer_type = request.customer_type.unwrap_or(CustomerType::Retail);
        let model = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            email: Set(request.email),
            phone: Set(request.phone),
            address: Set(request.address),
            neighborhood: Set(request.neighborhood),
            city: Set(request.city),
            state: Set(request.state),
            zip_code: Set(request.zip_code),
            document: Set(request.document),
            customer_type: Set(customer_type.as_str().to_string()),
            is_active: Set(true),
            ..Default::default()
        };
        let created = model.insert(db).await?;
        info!(customer_id = %created.id, "Customer created");
        Ok(created.into())
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<CustomerResponse, ServiceError> {
        let customer = CustomerEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))?;
        Ok(customer.into())
    }

    #[instrument(skip(self))]
    pub async fn find_many(
        &self,
        filters: CustomerFilters,
        page: u64,
        per_page: u64,
    ) -> Result<CustomerListResponse, ServiceError> {
        let mut query = CustomerEntity::find();
        if let Some(search) = &filters.search {
            query = query.filter(
                customer::Column::Name
                    .contains(search)
                    .or(customer::Column::Email.contains(search))
                    .or(customer::Column::Document.contains(search)),
            );
        }
        if let Some(customer_type) = filters.customer_type {
            query = query.filter(customer::Column::CustomerType.eq(customer_type.as_str()));
        }
        if let Some(is_active) = filters.is_active {
            query = query.filter(customer::Column::IsActive.eq(is_active));
        }

        let paginator = query
            .order_by_asc(customer::Column::Name)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let customers = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(CustomerListResponse {
            customers: customers.into_iter().map(Into::into).collect(),
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, request), fields(customer_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateCustomerRequest,
    ) -> Result<CustomerResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let customer = CustomerEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))?;

        if let Some(document) = &request.document {
            let duplicate = CustomerEntity::find()
                .filter(customer::Column::Document.eq(document))
                .filter(customer::Column::Id.ne(id))
                .count(db)
                .await?;
            if duplicate > 0 {
                return Err(ServiceError::Conflict(
                    "Customer document already registered".to_string(),
                ));
            }
        }

        let mut active: customer::ActiveModel = customer.into();
        if let Some(name) = request.name {
            active.name = Set(name);
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
        if let Some(neighborhood) = request.neighborhood {
            active.neighborhood = Set(Some(neighborhood));
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
        if let Some(document) = request.document {
            active.document = Set(Some(document));
        }
        if let Some(customer_type) = request.customer_type {
            active.customer_type = Set(customer_type.as_str().to_string());
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));
        Ok(active.update(db).await?.into())
    }

    /// Customers with sale history are deactivated, never deleted.
    #[instrument(skip(self), fields(customer_id = %id))]
    pub async fn deactivate(&self, id: Uuid) -> Result<CustomerResponse, ServiceError> {
        let db = &*self.db_pool;
        let customer = CustomerEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))?;

        if !customer.is_active {
            return Err(ServiceError::Conflict(
                "Customer is already inactive".to_string(),
            ));
        }

        let sales = SaleEntity::find()
            .filter(sale::Column::CustomerId.eq(id))
            .count(db)
            .await?;
        info!(customer_id = %id, sale_count = sales, "Customer deactivated");

        let mut active: customer::ActiveModel = customer.into();
        active.is_active = Set(false);
        active.updated_at = Set(Some(Utc::now()));
        Ok(active.update(db).await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_pattern() {
        assert!(PHONE_RE.is_match("(11) 98765-4321"));
        assert!(PHONE_RE.is_match("(11) 8765-4321"));
        assert!(!PHONE_RE.is_match("11987654321"));
    }

    #[test]
    fn zip_pattern_accepts_optional_dash() {
        assert!(ZIP_RE.is_match("01310-100"));
        assert!(ZIP_RE.is_match("01310100"));
        assert!(!ZIP_RE.is_match("0131-100"));
    }
}
