use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::to_money;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    utoipa::ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Draft,
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    Refunded,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Draft => "DRAFT",
            SaleStatus::Pending => "PENDING",
            SaleStatus::Confirmed => "CONFIRMED",
            SaleStatus::Completed => "COMPLETED",
            SaleStatus::Cancelled => "CANCELLED",
            SaleStatus::Refunded => "REFUNDED",
        }
    }

    /// Item and field mutation is only allowed while the sale is a draft
    /// or still pending confirmation.
    pub fn is_editable(&self) -> bool {
        matches!(self, SaleStatus::Draft | SaleStatus::Pending)
    }

    pub fn is_cancellable(&self) -> bool {
        !matches!(self, SaleStatus::Cancelled | SaleStatus::Completed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    /// Salesperson who recorded the sale.
    pub user_id: Uuid,
    pub status: String,
    pub total: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub notes: Option<String>,
    pub sale_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn status(&self) -> SaleStatus {
        self.status.parse().unwrap_or(SaleStatus::Draft)
    }

    pub fn is_editable(&self) -> bool {
        self.status().is_editable()
    }

    pub fn is_cancellable(&self) -> bool {
        self.status().is_cancellable()
    }
}

/// Final total: item subtotal minus order-level discount plus tax,
/// truncated to money precision at each step.
pub fn compute_total(subtotal: Decimal, discount: Decimal, tax: Decimal) -> Decimal {
    to_money(to_money(subtotal - discount) + tax)
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(has_many = "super::sale_item::Entity")]
    Items,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::sale_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
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
            if let ActiveValue::NotSet = active_model.sale_date {
                active_model.sale_date = Set(now);
            }
        }
        if let ActiveValue::NotSet = active_model.updated_at {
            active_model.updated_at = Set(Some(now));
        }
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn editable_only_while_draft_or_pending() {
        assert!(SaleStatus::Draft.is_editable());
        assert!(SaleStatus::Pending.is_editable());
        assert!(!SaleStatus::Confirmed.is_editable());
        assert!(!SaleStatus::Completed.is_editable());
        assert!(!SaleStatus::Cancelled.is_editable());
        assert!(!SaleStatus::Refunded.is_editable());
    }

    #[test]
    fn cancellable_unless_terminal() {
        assert!(SaleStatus::Draft.is_cancellable());
        assert!(SaleStatus::Pending.is_cancellable());
        assert!(SaleStatus::Confirmed.is_cancellable());
        assert!(SaleStatus::Refunded.is_cancellable());
        assert!(!SaleStatus::Completed.is_cancellable());
        assert!(!SaleStatus::Cancelled.is_cancellable());
    }

    #[test]
    fn total_applies_discount_then_tax() {
        assert_eq!(compute_total(dec!(100.00), dec!(10.00), dec!(5.00)), dec!(95.00));
        assert_eq!(compute_total(dec!(0), dec!(0), dec!(0)), dec!(0));
    }

    #[test]
    fn status_round_trips_through_storage_string() {
        for status in [
            SaleStatus::Draft,
            SaleStatus::Pending,
            SaleStatus::Confirmed,
            SaleStatus::Completed,
            SaleStatus::Cancelled,
            SaleStatus::Refunded,
        ] {
            assert_eq!(status.as_str().parse::<SaleStatus>().unwrap(), status);
        }
    }
}
