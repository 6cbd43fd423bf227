use crate::{
    common::to_money,
    db::DbPool,
    entities::{
        inventory::{self, Entity as InventoryEntity},
        inventory_movement::{self, Entity as MovementEntity, MovementType},
        product::{self, Entity as ProductEntity},
        user::Entity as UserEntity,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionError,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Request/response types for the inventory service

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInventoryRequest {
    pub product_id: Uuid,
    #[validate(range(min = 0))]
    pub quantity: Option<i32>,
    #[validate(range(min = 0))]
    pub min_stock: Option<i32>,
    #[validate(range(min = 0))]
    pub max_stock: Option<i32>,
    #[validate(length(min = 2, max = 100))]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateInventoryRequest {
    #[validate(range(min = 0))]
    pub quantity: Option<i32>,
    #[validate(range(min = 0))]
    pub min_stock: Option<i32>,
    #[validate(range(min = 0))]
    pub max_stock: Option<i32>,
    #[validate(length(min = 2, max = 100))]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StockAdjustmentRequest {
    pub product_id: Uuid,
    /// Signed delta; negative values shrink the stock.
    pub quantity: i32,
    #[validate(length(min = 3, max = 500))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StockMovementRequest {
    pub product_id: Uuid,
    pub movement_type: MovementType,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(min = 3, max = 500))]
    pub reason: String,
    pub sale_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct InventoryFilters {
    /// Matches product name or code
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub location: Option<String>,
    pub low_stock: Option<bool>,
    pub out_of_stock: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct MovementFilters {
    pub product_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub user_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub min_stock: i32,
    pub max_stock: Option<i32>,
    pub location: Option<String>,
    pub last_update: DateTime<Utc>,
    pub is_low_stock: bool,
    pub is_out_of_stock: bool,
    pub is_overstock: bool,
    /// Derived display state: OK, LOW, OUT or OVERSTOCK
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<inventory::Model> for InventoryResponse {
    fn from(model: inventory::Model) -> Self {
        let status = if model.is_out_of_stock() {
            "OUT"
        } else if model.is_low_stock() {
            "LOW"
        } else if model.is_overstock() {
            "OVERSTOCK"
        } else {
            "OK"
        };
        Self {
            id: model.id,
            product_id: model.product_id,
            quantity: model.quantity,
            min_stock: model.min_stock,
            max_stock: model.max_stock,
            is_low_stock: model.is_low_stock(),
            is_out_of_stock: model.is_out_of_stock(),
            is_overstock: model.is_overstock(),
            status: status.to_string(),
            location: model.location,
            last_update: model.last_update,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryListResponse {
    pub items: Vec<InventoryResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovementResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub movement_type: String,
    pub quantity: i32,
    pub reason: String,
    pub user_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<inventory_movement::Model> for MovementResponse {
    fn from(model: inventory_movement::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            movement_type: model.movement_type,
            quantity: model.quantity,
            reason: model.reason,
            user_id: model.user_id,
            sale_id: model.sale_id,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovementListResponse {
    pub movements: Vec<MovementResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Point-in-time availability snapshot. Holds no reservation: a
/// subsequent `remove_stock` may still fail if stock drained meanwhile.
#[derive(Debug, Serialize, ToSchema)]
pub struct StockCheckResponse {
    pub available: bool,
    pub quantity: i32,
    pub is_low_stock: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryStatsResponse {
    pub total_products: u64,
    pub total_value: Decimal,
    pub low_stock_count: u64,
    pub out_of_stock_count: u64,
    pub average_stock: f64,
    pub low_stock_products: Vec<InventoryResponse>,
    pub recent_movements: Vec<MovementResponse>,
}

/// Service managing per-product stock records and their audit trail.
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates the stock record for a product. One record per product.
    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn create_for_product(
        &self,
        request: CreateInventoryRequest,
    ) -> Result<InventoryResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        validate_stock_thresholds(request.min_stock.or(Some(10)), request.max_stock)?;

        let db = &*self.db_pool;

        let product = ProductEntity::find_by_id(request.product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        if !product.is_active {
            return Err(ServiceError::InvalidOperation(
                "Inactive product cannot have inventory created".to_string(),
            ));
        }

        let existing = InventoryEntity::find()
            .filter(inventory::Column::ProductId.eq(request.product_id))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Inventory already exists for this product".to_string(),
            ));
        }

        let inventory_id = Uuid::new_v4();
        let model = inventory::ActiveModel {
            id: Set(inventory_id),
            product_id: Set(request.product_id),
            quantity: Set(request.quantity.unwrap_or(0)),
            min_stock: Set(request.min_stock.unwrap_or(10)),
            max_stock: Set(request.max_stock),
            location: Set(request.location),
            ..Default::default()
        };

        let created = model.insert(db).await?;
        info!(inventory_id = %created.id, "Inventory created");

        if let Err(e) = self
            .event_sender
            .send(Event::InventoryCreated {
                inventory_id: created.id,
                product_id: created.product_id,
            })
            .await
        {
            warn!(error = %e, "Failed to send inventory created event");
        }

        Ok(created.into())
    }

    /// Lists stock records with filtering and pagination.
    #[instrument(skip(self))]
    pub async fn find_many(
        &self,
        filters: InventoryFilters,
        page: u64,
        per_page: u64,
    ) -> Result<InventoryListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = InventoryEntity::find();

        let needs_product_join = filters.search.is_some()
            || filters.category_id.is_some()
            || filters.supplier_id.is_some();
        if needs_product_join {
            query = query.join(JoinType::InnerJoin, inventory::Relation::Product.def());
            if let Some(search) = &filters.search {
                query = query.filter(
                    product::Column::Name
                        .contains(search)
                        .or(product::Column::Code.contains(search)),
                );
            }
            if let Some(category_id) = filters.category_id {
                query = query.filter(product::Column::CategoryId.eq(category_id));
            }
            if let Some(supplier_id) = filters.supplier_id {
                query = query.filter(product::Column::SupplierId.eq(supplier_id));
            }
        }
        if let Some(location) = &filters.location {
            query = query.filter(inventory::Column::Location.contains(location));
        }
        if filters.low_stock == Some(true) {
            query = query.filter(
                Expr::col(inventory::Column::Quantity)
                    .lte(Expr::col(inventory::Column::MinStock)),
            );
        }
        if filters.out_of_stock == Some(true) {
            query = query.filter(inventory::Column::Quantity.eq(0));
        }

        let paginator = query
            .order_by_asc(inventory::Column::CreatedAt)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(InventoryListResponse {
            items: items.into_iter().map(Into::into).collect(),
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<InventoryResponse, ServiceError> {
        let inventory = InventoryEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Inventory not found".to_string()))?;
        Ok(inventory.into())
    }

    #[instrument(skip(self))]
    pub async fn find_by_product_id(
        &self,
        product_id: Uuid,
    ) -> Result<InventoryResponse, ServiceError> {
        let inventory = InventoryEntity::find()
            .filter(inventory::Column::ProductId.eq(product_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("Inventory not found for this product".to_string())
            })?;
        Ok(inventory.into())
    }

    /// Updates thresholds, location and (directly) the quantity.
    #[instrument(skip(self, request), fields(inventory_id = %id, user_id = %user_id))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateInventoryRequest,
        user_id: Uuid,
    ) -> Result<InventoryResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;

        let inventory = InventoryEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Inventory not found".to_string()))?;

        let product = ProductEntity::find_by_id(inventory.product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;
        if !product.is_active {
            return Err(ServiceError::InvalidOperation(
                "Inactive product cannot have inventory updated".to_string(),
            ));
        }

        // Validate the thresholds that will actually be stored.
        let effective_min = request.min_stock.unwrap_or(inventory.min_stock);
        let effective_max = request.max_stock.or(inventory.max_stock);
        validate_stock_thresholds(Some(effective_min), effective_max)?;

        let old = (
            inventory.quantity,
            inventory.min_stock,
            inventory.max_stock,
            inventory.location.clone(),
        );

        let mut active: inventory::ActiveModel = inventory.into();
        if let Some(quantity) = request.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(min_stock) = request.min_stock {
            active.min_stock = Set(min_stock);
        }
        if let Some(max_stock) = request.max_stock {
            active.max_stock = Set(Some(max_stock));
        }
        if let Some(location) = request.location {
            active.location = Set(Some(location));
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(db).await?;

        info!(
            user_id = %user_id,
            old_quantity = old.0,
            old_min = old.1,
            new_quantity = updated.quantity,
            new_min = updated.min_stock,
            "Inventory updated"
        );

        if let Err(e) = self.event_sender.send(Event::InventoryUpdated(updated.id)).await {
            warn!(error = %e, "Failed to send inventory updated event");
        }

        Ok(updated.into())
    }

    /// Applies a signed quantity delta and records an ADJUSTMENT movement.
    /// The write is a single conditional update, so concurrent callers
    /// cannot drive the quantity negative.
    #[instrument(skip(self, request), fields(product_id = %request.product_id, delta = request.quantity))]
    pub async fn adjust_stock(
        &self,
        request: StockAdjustmentRequest,
        user_id: Uuid,
    ) -> Result<InventoryResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let delta = request.quantity;
        let outcome = self
            .apply_movement(
                request.product_id,
                delta,
                MovementType::Adjustment,
                request.reason,
                user_id,
                None,
            )
            .await?;

        if let Err(e) = self
            .event_sender
            .send(Event::StockAdjusted {
                product_id: request.product_id,
                old_quantity: outcome.quantity - delta,
                new_quantity: outcome.quantity,
            })
            .await
        {
            warn!(error = %e, "Failed to send stock adjusted event");
        }
        self.emit_low_stock_warning(&outcome).await;

        Ok(outcome.into())
    }

    /// Records an inbound movement (purchase receipt, return to shelf).
    pub async fn add_stock(
        &self,
        product_id: Uuid,
        quantity: i32,
        reason: String,
        user_id: Uuid,
    ) -> Result<InventoryResponse, ServiceError> {
        self.process_stock_movement(
            StockMovementRequest {
                product_id,
                movement_type: MovementType::In,
                quantity,
                reason,
                sale_id: None,
            },
            user_id,
        )
        .await
    }

    /// Records an outbound movement, optionally tied to a sale.
    pub async fn remove_stock(
        &self,
        product_id: Uuid,
        quantity: i32,
        reason: String,
        user_id: Uuid,
        sale_id: Option<Uuid>,
    ) -> Result<InventoryResponse, ServiceError> {
        self.process_stock_movement(
            StockMovementRequest {
                product_id,
                movement_type: MovementType::Out,
                quantity,
                reason,
                sale_id,
            },
            user_id,
        )
        .await
    }

    /// Shared path for IN/OUT movements.
    #[instrument(skip(self, request), fields(product_id = %request.product_id, movement_type = %request.movement_type, quantity = request.quantity))]
    pub async fn process_stock_movement(
        &self,
        request: StockMovementRequest,
        user_id: Uuid,
    ) -> Result<InventoryResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let delta = match request.movement_type {
            MovementType::In => request.quantity,
            MovementType::Out => -request.quantity,
            MovementType::Adjustment => {
                return Err(ServiceError::InvalidInput(
                    "Adjustments must go through the adjust operation".to_string(),
                ))
            }
        };

        let outcome = self
            .apply_movement(
                request.product_id,
                delta,
                request.movement_type,
                request.reason,
                user_id,
                request.sale_id,
            )
            .await?;

        let event = match request.movement_type {
            MovementType::In => Event::StockAdded {
                product_id: request.product_id,
                quantity: request.quantity,
            },
            _ => Event::StockRemoved {
                product_id: request.product_id,
                quantity: request.quantity,
                sale_id: request.sale_id,
            },
        };
        if let Err(e) = self.event_sender.send(event).await {
            warn!(error = %e, "Failed to send stock movement event");
        }
        self.emit_low_stock_warning(&outcome).await;

        Ok(outcome.into())
    }

    /// Availability probe. Never fails: a missing stock record reads as
    /// "unavailable, quantity 0".
    #[instrument(skip(self))]
    pub async fn check_stock(&self, product_id: Uuid) -> Result<StockCheckResponse, ServiceError> {
        let inventory = InventoryEntity::find()
            .filter(inventory::Column::ProductId.eq(product_id))
            .one(&*self.db_pool)
            .await?;

        Ok(match inventory {
            Some(inv) => StockCheckResponse {
                available: inv.quantity > 0,
                quantity: inv.quantity,
                is_low_stock: inv.is_low_stock(),
            },
            None => StockCheckResponse {
                available: false,
                quantity: 0,
                is_low_stock: true,
            },
        })
    }

    pub async fn has_inventory(&self, product_id: Uuid) -> Result<bool, ServiceError> {
        let count = InventoryEntity::find()
            .filter(inventory::Column::ProductId.eq(product_id))
            .count(&*self.db_pool)
            .await?;
        Ok(count > 0)
    }

    /// Non-binding availability check: true when the requested quantity is
    /// currently on hand. Nothing is locked or held.
    #[instrument(skip(self))]
    pub async fn reserve_stock(
        &self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<bool, ServiceError> {
        let check = self.check_stock(product_id).await?;
        Ok(check.available && quantity <= check.quantity)
    }

    /// Paginated movement history with filters.
    #[instrument(skip(self))]
    pub async fn get_movements(
        &self,
        filters: MovementFilters,
        page: u64,
        per_page: u64,
    ) -> Result<MovementListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = MovementEntity::find();
        if let Some(product_id) = filters.product_id {
            query = query.filter(inventory_movement::Column::ProductId.eq(product_id));
        }
        if let Some(movement_type) = filters.movement_type {
            query = query
                .filter(inventory_movement::Column::MovementType.eq(movement_type.as_str()));
        }
        if let Some(user_id) = filters.user_id {
            query = query.filter(inventory_movement::Column::UserId.eq(user_id));
        }
        if let Some(sale_id) = filters.sale_id {
            query = query.filter(inventory_movement::Column::SaleId.eq(sale_id));
        }
        if let Some(date_from) = filters.date_from {
            query = query.filter(inventory_movement::Column::CreatedAt.gte(date_from));
        }
        if let Some(date_to) = filters.date_to {
            query = query.filter(inventory_movement::Column::CreatedAt.lte(date_to));
        }

        let paginator = query
            .order_by_desc(inventory_movement::Column::CreatedAt)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let movements = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(MovementListResponse {
            movements: movements.into_iter().map(Into::into).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Most recent movements for one product.
    #[instrument(skip(self))]
    pub async fn get_product_movements(
        &self,
        product_id: Uuid,
        limit: Option<u64>,
    ) -> Result<Vec<MovementResponse>, ServiceError> {
        let movements = MovementEntity::find()
            .filter(inventory_movement::Column::ProductId.eq(product_id))
            .order_by_desc(inventory_movement::Column::CreatedAt)
            .limit(limit.unwrap_or(20))
            .all(&*self.db_pool)
            .await?;
        Ok(movements.into_iter().map(Into::into).collect())
    }

    /// Aggregate stock statistics for dashboards.
    #[instrument(skip(self))]
    pub async fn get_statistics(&self) -> Result<InventoryStatsResponse, ServiceError> {
        let db = &*self.db_pool;

        let inventories = InventoryEntity::find()
            .find_also_related(ProductEntity)
            .all(db)
            .await?;

        let total_products = inventories.len() as u64;
        let mut total_value = Decimal::ZERO;
        let mut quantity_sum: i64 = 0;
        let mut low_stock: Vec<inventory::Model> = Vec::new();
        let mut out_of_stock_count: u64 = 0;

        for (inv, prod) in &inventories {
            if let Some(prod) = prod {
                total_value += to_money(prod.price * Decimal::from(inv.quantity));
            }
            quantity_sum += i64::from(inv.quantity);
            if inv.is_low_stock() {
                low_stock.push(inv.clone());
            }
            if inv.is_out_of_stock() {
                out_of_stock_count += 1;
            }
        }

        let low_stock_count = low_stock.len() as u64;
        let average_stock = if total_products > 0 {
            quantity_sum as f64 / total_products as f64
        } else {
            0.0
        };

        low_stock.sort_by_key(|inv| inv.quantity);
        let low_stock_products = low_stock
            .into_iter()
            .take(10)
            .map(Into::into)
            .collect();

        let recent_movements = MovementEntity::find()
            .order_by_desc(inventory_movement::Column::CreatedAt)
            .limit(10)
            .all(db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(InventoryStatsResponse {
            total_products,
            total_value,
            low_stock_count,
            out_of_stock_count,
            average_stock,
            low_stock_products,
            recent_movements,
        })
    }

    /// All records at or below their reorder threshold.
    #[instrument(skip(self))]
    pub async fn low_stock_alert(&self) -> Result<Vec<InventoryResponse>, ServiceError> {
        let items = InventoryEntity::find()
            .filter(
                Expr::col(inventory::Column::Quantity)
                    .lte(Expr::col(inventory::Column::MinStock)),
            )
            .order_by_asc(inventory::Column::Quantity)
            .all(&*self.db_pool)
            .await?;
        Ok(items.into_iter().map(Into::into).collect())
    }

    /// All records with zero quantity.
    #[instrument(skip(self))]
    pub async fn out_of_stock(&self) -> Result<Vec<InventoryResponse>, ServiceError> {
        let items = InventoryEntity::find()
            .filter(inventory::Column::Quantity.eq(0))
            .all(&*self.db_pool)
            .await?;
        Ok(items.into_iter().map(Into::into).collect())
    }

    /// Applies a quantity delta and writes the audit row in one
    /// transaction. The quantity change is a conditional update checked by
    /// affected-row count, so a concurrent mutation that would overdraw the
    /// record makes this call fail instead of losing an update.
    async fn apply_movement(
        &self,
        product_id: Uuid,
        delta: i32,
        movement_type: MovementType,
        reason: String,
        user_id: Uuid,
        sale_id: Option<Uuid>,
    ) -> Result<inventory::Model, ServiceError> {
        let db = &*self.db_pool;

        db.transaction::<_, inventory::Model, ServiceError>(move |txn| {
            Box::pin(async move {
                let product = ProductEntity::find_by_id(product_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;
                if !product.is_active {
                    return Err(ServiceError::InvalidOperation(
                        "Inactive product cannot have stock moved".to_string(),
                    ));
                }

                let inventory = InventoryEntity::find()
                    .filter(inventory::Column::ProductId.eq(product_id))
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound("Inventory not found for this product".to_string())
                    })?;

                UserEntity::find_by_id(user_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

                apply_delta(txn, &inventory, delta, movement_type).await?;

                let movement = inventory_movement::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    inventory_id: Set(inventory.id),
                    product_id: Set(product_id),
                    movement_type: Set(movement_type.as_str().to_string()),
                    quantity: Set(delta.abs()),
                    reason: Set(reason),
                    user_id: Set(Some(user_id)),
                    sale_id: Set(sale_id),
                    ..Default::default()
                };
                movement.insert(txn).await?;

                let updated = InventoryEntity::find_by_id(inventory.id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::InternalError("Inventory row vanished mid-update".to_string())
                    })?;

                info!(
                    product_id = %product_id,
                    old_quantity = inventory.quantity,
                    new_quantity = updated.quantity,
                    movement_type = %movement_type,
                    "Stock movement processed"
                );

                Ok(updated)
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }

    async fn emit_low_stock_warning(&self, inventory: &inventory::Model) {
        if inventory.is_low_stock() {
            if let Err(e) = self
                .event_sender
                .send(Event::LowStockDetected {
                    product_id: inventory.product_id,
                    quantity: inventory.quantity,
                    min_stock: inventory.min_stock,
                })
                .await
            {
                warn!(error = %e, "Failed to send low stock event");
            }
        }
    }
}

/// Single conditional `UPDATE inventory SET quantity = quantity + delta
/// WHERE id = ? AND quantity >= needed`. Zero affected rows means the
/// guard lost to a concurrent mutation or the stock simply is not there.
async fn apply_delta(
    txn: &DatabaseTransaction,
    inventory: &inventory::Model,
    delta: i32,
    movement_type: MovementType,
) -> Result<(), ServiceError> {
    let needed = if delta < 0 { -delta } else { 0 };
    let now = Utc::now();

    let result = InventoryEntity::update_many()
        .col_expr(
            inventory::Column::Quantity,
            Expr::col(inventory::Column::Quantity).add(delta),
        )
        .col_expr(inventory::Column::LastUpdate, Expr::value(now))
        .col_expr(inventory::Column::UpdatedAt, Expr::value(now))
        .filter(inventory::Column::Id.eq(inventory.id))
        .filter(inventory::Column::Quantity.gte(needed))
        .exec(txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(match movement_type {
            MovementType::Adjustment => ServiceError::InvalidInput(
                "Adjustment would result in negative stock".to_string(),
            ),
            _ => ServiceError::InvalidOperation(
                "Insufficient stock for the operation".to_string(),
            ),
        });
    }
    Ok(())
}

fn validate_stock_thresholds(
    min_stock: Option<i32>,
    max_stock: Option<i32>,
) -> Result<(), ServiceError> {
    if let (Some(min), Some(max)) = (min_stock, max_stock) {
        if max <= min {
            return Err(ServiceError::InvalidInput(
                "Maximum stock must be greater than minimum stock".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn threshold_validation_rejects_inverted_bounds() {
        assert!(validate_stock_thresholds(Some(10), Some(20)).is_ok());
        assert!(validate_stock_thresholds(Some(10), None).is_ok());
        assert!(validate_stock_thresholds(None, Some(5)).is_ok());
        assert_matches!(
            validate_stock_thresholds(Some(10), Some(10)),
            Err(ServiceError::InvalidInput(_))
        );
        assert_matches!(
            validate_stock_thresholds(Some(10), Some(5)),
            Err(ServiceError::InvalidInput(_))
        );
    }

    #[test]
    fn movement_request_validation_bounds() {
        let request = StockMovementRequest {
            product_id: Uuid::new_v4(),
            movement_type: MovementType::Out,
            quantity: 0,
            reason: "stock count".to_string(),
            sale_id: None,
        };
        assert!(request.validate().is_err());

        let request = StockMovementRequest {
            quantity: 5,
            reason: "ab".to_string(),
            ..request
        };
        assert!(request.validate().is_err());

        let request = StockMovementRequest {
            quantity: 5,
            reason: "stock count".to_string(),
            ..request
        };
        assert!(request.validate().is_ok());
    }
}
