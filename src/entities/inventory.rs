use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-product stock record. One row per product, enforced unique.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub product_id: Uuid,
    /// Current stock on hand. Never negative.
    pub quantity: i32,
    /// Reorder threshold.
    pub min_stock: i32,
    /// Overstock threshold; must exceed `min_stock` when set.
    pub max_stock: Option<i32>,
    /// Free-text bin/shelf code.
    pub location: Option<String>,
    /// Refreshed on every mutation, including bare stock movements.
    pub last_update: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }

    pub fn is_overstock(&self) -> bool {
        matches!(self.max_stock, Some(max) if self.quantity > max)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(has_many = "super::inventory_movement::Entity")]
    Movements,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::inventory_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movements.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();
        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }
        active_model.last_update = Set(now);
        if let ActiveValue::NotSet = active_model.updated_at {
            active_model.updated_at = Set(Some(now));
        }
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(quantity: i32, min_stock: i32, max_stock: Option<i32>) -> Model {
        Model {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity,
            min_stock,
            max_stock,
            location: None,
            last_update: Utc::now(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn low_stock_includes_threshold_boundary() {
        assert!(record(5, 5, None).is_low_stock());
        assert!(record(0, 5, None).is_low_stock());
        assert!(!record(6, 5, None).is_low_stock());
    }

    #[test]
    fn out_of_stock_only_at_zero() {
        assert!(record(0, 5, None).is_out_of_stock());
        assert!(!record(1, 5, None).is_out_of_stock());
    }

    #[test]
    fn overstock_requires_configured_maximum() {
        assert!(!record(100, 5, None).is_overstock());
        assert!(!record(50, 5, Some(50)).is_overstock());
        assert!(record(51, 5, Some(50)).is_overstock());
    }
}
