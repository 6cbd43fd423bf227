use crate::{
    db::DbPool,
    entities::{
        customer::Entity as CustomerEntity,
        inventory::{self, Entity as InventoryEntity},
        product::Entity as ProductEntity,
        sale::{self, compute_total, Entity as SaleEntity, SaleStatus},
        sale_item::{self, line_total, Entity as SaleItemEntity},
        user::Entity as UserEntity,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Request/response types for the sale service

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SaleItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 10000))]
    pub quantity: i32,
    /// Defaults to the product's current price when omitted.
    pub unit_price: Option<Decimal>,
    pub discount: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSaleRequest {
    pub customer_id: Uuid,
    /// Salesperson recording the sale.
    pub user_id: Uuid,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    pub discount: Option<Decimal>,
    pub tax: Option<Decimal>,
    #[validate]
    pub items: Vec<SaleItemRequest>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSaleRequest {
    pub customer_id: Option<Uuid>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    pub discount: Option<Decimal>,
    pub tax: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddSaleItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 10000))]
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
    pub discount: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSaleItemRequest {
    #[validate(range(min = 1, max = 10000))]
    pub quantity: Option<i32>,
    pub unit_price: Option<Decimal>,
    pub discount: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct SaleFilters {
    pub customer_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub status: Option<SaleStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaleItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl From<sale_item::Model> for SaleItemResponse {
    fn from(model: sale_item::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            quantity: model.quantity,
            unit_price: model.unit_price,
            discount: model.discount,
            total: model.total,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaleResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub total: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub notes: Option<String>,
    pub sale_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Present on single-sale reads; list views omit line items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<SaleItemResponse>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaleListResponse {
    pub sales: Vec<SaleResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service managing the sale aggregate: creation, item mutation, totals
/// and status transitions.
#[derive(Clone)]
pub struct SaleService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl SaleService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a sale in DRAFT with its line items. Every item is checked
    /// against current stock; the check gates creation but deducts
    /// nothing.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id, user_id = %request.user_id, item_count = request.items.len()))]
    pub async fn create(&self, request: CreateSaleRequest) -> Result<SaleResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        let discount = non_negative_money(request.discount, "discount")?;
        let tax = non_negative_money(request.tax, "tax")?;

        let db = &*self.db_pool;

        CustomerEntity::find_by_id(request.customer_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))?;
        UserEntity::find_by_id(request.user_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let sale_id = Uuid::new_v4();
        let txn = db.begin().await?;

        // Resolve products, gate on stock, and build the line rows.
        let mut subtotal = Decimal::ZERO;
        let mut item_rows = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let product = ProductEntity::find_by_id(item.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", item.product_id))
                })?;

            let stock = InventoryEntity::find()
                .filter(inventory::Column::ProductId.eq(item.product_id))
                .one(&txn)
                .await?
                .map(|inv| inv.quantity)
                .unwrap_or(0);
            if stock < item.quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "Insufficient stock for product: {}",
                    product.name
                )));
            }

            let unit_price = match item.unit_price {
                Some(price) => positive_money(price, "unit_price")?,
                None => product.price,
            };
            let item_discount = non_negative_money(item.discount, "item discount")?;
            let total = line_total(unit_price, item.quantity, item_discount);
            subtotal += total;

            item_rows.push(sale_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                sale_id: Set(sale_id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                unit_price: Set(unit_price),
                discount: Set(item_discount),
                total: Set(total),
                ..Default::default()
            });
        }

        let sale_model = sale::ActiveModel {
            id: Set(sale_id),
            customer_id: Set(request.customer_id),
            user_id: Set(request.user_id),
            status: Set(SaleStatus::Draft.as_str().to_string()),
            total: Set(compute_total(subtotal, discount, tax)),
            discount: Set(discount),
            tax: Set(tax),
            notes: Set(request.notes),
            sale_date: Set(Utc::now()),
            ..Default::default()
        };
        let sale_model = sale_model.insert(&txn).await?;

        for row in item_rows {
            row.insert(&txn).await?;
        }

        txn.commit().await?;
        info!(sale_id = %sale_id, "Sale created");

        if let Err(e) = self.event_sender.send(Event::SaleCreated(sale_id)).await {
            warn!(error = %e, "Failed to send sale created event");
        }

        self.to_response_with_items(sale_model).await
    }

    /// Fetches a sale with its line items.
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<SaleResponse, ServiceError> {
        let sale = SaleEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Sale not found".to_string()))?;
        self.to_response_with_items(sale).await
    }

    /// Filtered, paginated list. Line items are omitted from list views.
    #[instrument(skip(self))]
    pub async fn find_all(
        &self,
        filters: SaleFilters,
        page: u64,
        per_page: u64,
    ) -> Result<SaleListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = SaleEntity::find();
        if let Some(customer_id) = filters.customer_id {
            query = query.filter(sale::Column::CustomerId.eq(customer_id));
        }
        if let Some(user_id) = filters.user_id {
            query = query.filter(sale::Column::UserId.eq(user_id));
        }
        if let Some(status) = filters.status {
            query = query.filter(sale::Column::Status.eq(status.as_str()));
        }

        let paginator = query
            .order_by_desc(sale::Column::CreatedAt)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let sales = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(SaleListResponse {
            sales: sales.into_iter().map(|s| to_response(s, None)).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Applies partial field updates and recomputes the total.
    #[instrument(skip(self, request), fields(sale_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateSaleRequest,
    ) -> Result<SaleResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let sale = self.find_sale(id).await?;
        ensure_editable(&sale)?;

        if let Some(customer_id) = request.customer_id {
            CustomerEntity::find_by_id(customer_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))?;
        }

        let txn = db.begin().await?;

        let mut active: sale::ActiveModel = sale.into();
        if let Some(customer_id) = request.customer_id {
            active.customer_id = Set(customer_id);
        }
        if let Some(notes) = request.notes {
            active.notes = Set(Some(notes));
        }
        if let Some(discount) = request.discount {
            active.discount = Set(non_negative_money(Some(discount), "discount")?);
        }
        if let Some(tax) = request.tax {
            active.tax = Set(non_negative_money(Some(tax), "tax")?);
        }
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&txn).await?;

        let updated = recalculate_total(&txn, updated).await?;
        txn.commit().await?;

        if let Err(e) = self.event_sender.send(Event::SaleUpdated(id)).await {
            warn!(error = %e, "Failed to send sale updated event");
        }

        self.to_response_with_items(updated).await
    }

    /// Cancels the sale. Stock already removed on behalf of this sale is
    /// not restored here; compensate with an inbound movement if needed.
    #[instrument(skip(self), fields(sale_id = %id))]
    pub async fn cancel(&self, id: Uuid) -> Result<SaleResponse, ServiceError> {
        let sale = self.find_sale(id).await?;
        if !sale.is_cancellable() {
            return Err(ServiceError::Conflict(format!(
                "Sale cannot be cancelled. Status: {}",
                sale.status
            )));
        }

        let old_status = sale.status.clone();
        let mut active: sale::ActiveModel = sale.into();
        active.status = Set(SaleStatus::Cancelled.as_str().to_string());
        active.updated_at = Set(Some(Utc::now()));
        let cancelled = active.update(&*self.db_pool).await?;

        info!(sale_id = %id, old_status = %old_status, "Sale cancelled");
        if let Err(e) = self.event_sender.send(Event::SaleCancelled(id)).await {
            warn!(error = %e, "Failed to send sale cancelled event");
        }

        Ok(to_response(cancelled, None))
    }

    /// Generic guarded transition. `CANCELLED` requires the sale to be
    /// cancellable; any other target requires it to still be editable.
    ///
    /// No stock side effects are attached to transitions: a caller that
    /// completes a sale is responsible for recording the outbound stock
    /// movement (`InventoryService::remove_stock` with this sale's id).
    #[instrument(skip(self), fields(sale_id = %id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        id: Uuid,
        new_status: SaleStatus,
    ) -> Result<SaleResponse, ServiceError> {
        let sale = self.find_sale(id).await?;
        let old_status = sale.status.clone();

        match new_status {
            SaleStatus::Cancelled => {
                if !sale.is_cancellable() {
                    return Err(ServiceError::Conflict(format!(
                        "Sale cannot be cancelled. Status: {}",
                        sale.status
                    )));
                }
            }
            _ => {
                if !sale.is_editable() {
                    return Err(ServiceError::Conflict(format!(
                        "Sale status can no longer change. Status: {}",
                        sale.status
                    )));
                }
            }
        }

        // A sale only becomes binding with a positive total.
        if matches!(new_status, SaleStatus::Confirmed | SaleStatus::Completed)
            && sale.total <= Decimal::ZERO
        {
            return Err(ServiceError::InvalidOperation(
                "Sale total must be positive before it can be finalized".to_string(),
            ));
        }

        let mut active: sale::ActiveModel = sale.into();
        active.status = Set(new_status.as_str().to_string());
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db_pool).await?;

        info!(sale_id = %id, old_status = %old_status, new_status = %new_status, "Sale status changed");
        if let Err(e) = self
            .event_sender
            .send(Event::SaleStatusChanged {
                sale_id: id,
                old_status,
                new_status: new_status.as_str().to_string(),
            })
            .await
        {
            warn!(error = %e, "Failed to send sale status event");
        }

        self.to_response_with_items(updated).await
    }

    /// Appends a line item. No stock gate here; availability is only
    /// enforced at sale creation.
    #[instrument(skip(self, request), fields(sale_id = %sale_id, product_id = %request.product_id))]
    pub async fn add_item(
        &self,
        sale_id: Uuid,
        request: AddSaleItemRequest,
    ) -> Result<SaleResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let sale = self.find_sale(sale_id).await?;
        ensure_editable(&sale)?;

        let product = ProductEntity::find_by_id(request.product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let unit_price = match request.unit_price {
            Some(price) => positive_money(price, "unit_price")?,
            None => product.price,
        };
        let discount = non_negative_money(request.discount, "item discount")?;
        let item_id = Uuid::new_v4();

        let txn = db.begin().await?;
        let item = sale_item::ActiveModel {
            id: Set(item_id),
            sale_id: Set(sale_id),
            product_id: Set(request.product_id),
            quantity: Set(request.quantity),
            unit_price: Set(unit_price),
            discount: Set(discount),
            total: Set(line_total(unit_price, request.quantity, discount)),
            ..Default::default()
        };
        item.insert(&txn).await?;

        let updated = recalculate_total(&txn, sale).await?;
        txn.commit().await?;

        if let Err(e) = self
            .event_sender
            .send(Event::SaleItemAdded { sale_id, item_id })
            .await
        {
            warn!(error = %e, "Failed to send item added event");
        }

        self.to_response_with_items(updated).await
    }

    /// Partially updates one line item, refreshing its total and then the
    /// sale total.
    #[instrument(skip(self, request), fields(sale_id = %sale_id, item_id = %item_id))]
    pub async fn update_item(
        &self,
        sale_id: Uuid,
        item_id: Uuid,
        request: UpdateSaleItemRequest,
    ) -> Result<SaleResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let sale = self.find_sale(sale_id).await?;
        ensure_editable(&sale)?;

        let item = SaleItemEntity::find_by_id(item_id)
            .filter(sale_item::Column::SaleId.eq(sale_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Item not found in this sale".to_string()))?;

        let quantity = request.quantity.unwrap_or(item.quantity);
        let unit_price = match request.unit_price {
            Some(price) => positive_money(price, "unit_price")?,
            None => item.unit_price,
        };
        let discount = match request.discount {
            Some(discount) => non_negative_money(Some(discount), "item discount")?,
            None => item.discount,
        };

        let txn = db.begin().await?;
        let mut active: sale_item::ActiveModel = item.into();
        active.quantity = Set(quantity);
        active.unit_price = Set(unit_price);
        active.discount = Set(discount);
        active.total = Set(line_total(unit_price, quantity, discount));
        active.updated_at = Set(Some(Utc::now()));
        active.update(&txn).await?;

        let updated = recalculate_total(&txn, sale).await?;
        txn.commit().await?;

        if let Err(e) = self
            .event_sender
            .send(Event::SaleItemUpdated { sale_id, item_id })
            .await
        {
            warn!(error = %e, "Failed to send item updated event");
        }

        self.to_response_with_items(updated).await
    }

    /// Removes one line item by identity and recomputes the total.
    #[instrument(skip(self), fields(sale_id = %sale_id, item_id = %item_id))]
    pub async fn remove_item(
        &self,
        sale_id: Uuid,
        item_id: Uuid,
    ) -> Result<SaleResponse, ServiceError> {
        let db = &*self.db_pool;
        let sale = self.find_sale(sale_id).await?;
        ensure_editable(&sale)?;

        let item = SaleItemEntity::find_by_id(item_id)
            .filter(sale_item::Column::SaleId.eq(sale_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Item not found in this sale".to_string()))?;

        let txn = db.begin().await?;
        item.delete(&txn).await?;
        let updated = recalculate_total(&txn, sale).await?;
        txn.commit().await?;

        if let Err(e) = self
            .event_sender
            .send(Event::SaleItemRemoved { sale_id, item_id })
            .await
        {
            warn!(error = %e, "Failed to send item removed event");
        }

        self.to_response_with_items(updated).await
    }

    async fn find_sale(&self, id: Uuid) -> Result<sale::Model, ServiceError> {
        SaleEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Sale not found".to_string()))
    }

    async fn to_response_with_items(
        &self,
        sale: sale::Model,
    ) -> Result<SaleResponse, ServiceError> {
        let items = SaleItemEntity::find()
            .filter(sale_item::Column::SaleId.eq(sale.id))
            .order_by_asc(sale_item::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;
        Ok(to_response(
            sale,
            Some(items.into_iter().map(Into::into).collect()),
        ))
    }
}

fn to_response(sale: sale::Model, items: Option<Vec<SaleItemResponse>>) -> SaleResponse {
    SaleResponse {
        id: sale.id,
        customer_id: sale.customer_id,
        user_id: sale.user_id,
        status: sale.status,
        total: sale.total,
        discount: sale.discount,
        tax: sale.tax,
        notes: sale.notes,
        sale_date: sale.sale_date,
        created_at: sale.created_at,
        updated_at: sale.updated_at,
        items,
    }
}

fn ensure_editable(sale: &sale::Model) -> Result<(), ServiceError> {
    if !sale.is_editable() {
        return Err(ServiceError::Conflict(format!(
            "Sale is not editable. Status: {}",
            sale.status
        )));
    }
    Ok(())
}

/// Re-derives the sale total from its stored line items:
/// `sum(item.total) - discount + tax`, truncated to money precision.
async fn recalculate_total<C: ConnectionTrait>(
    conn: &C,
    sale: sale::Model,
) -> Result<sale::Model, ServiceError> {
    let items = SaleItemEntity::find()
        .filter(sale_item::Column::SaleId.eq(sale.id))
        .all(conn)
        .await?;

    let subtotal = items
        .iter()
        .fold(Decimal::ZERO, |acc, item| acc + item.total);

    let discount = sale.discount;
    let tax = sale.tax;
    let mut active: sale::ActiveModel = sale.into();
    active.total = Set(compute_total(subtotal, discount, tax));
    active.updated_at = Set(Some(Utc::now()));
    Ok(active.update(conn).await?)
}

fn non_negative_money(value: Option<Decimal>, field: &str) -> Result<Decimal, ServiceError> {
    let value = value.unwrap_or(Decimal::ZERO);
    if value < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{} cannot be negative",
            field
        )));
    }
    Ok(value)
}

fn positive_money(value: Decimal, field: &str) -> Result<Decimal, ServiceError> {
    if value <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{} must be greater than zero",
            field
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn money_guards() {
        assert_eq!(non_negative_money(None, "discount").unwrap(), Decimal::ZERO);
        assert_eq!(
            non_negative_money(Some(dec!(3.50)), "discount").unwrap(),
            dec!(3.50)
        );
        assert_matches!(
            non_negative_money(Some(dec!(-0.01)), "discount"),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            positive_money(dec!(0), "unit_price"),
            Err(ServiceError::ValidationError(_))
        );
        assert_eq!(positive_money(dec!(19.90), "unit_price").unwrap(), dec!(19.90));
    }

    #[test]
    fn item_quantity_bounds_enforced_by_validation() {
        let request = SaleItemRequest {
            product_id: Uuid::new_v4(),
            quantity: 0,
            unit_price: None,
            discount: None,
        };
        assert!(request.validate().is_err());

        let request = SaleItemRequest {
            quantity: 10_001,
            ..request
        };
        assert!(request.validate().is_err());

        let request = SaleItemRequest {
            quantity: 10_000,
            ..request
        };
        assert!(request.validate().is_ok());
    }
}
