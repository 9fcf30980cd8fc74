use chrono::Utc;
use sea_orm::{ActiveValue, FromJsonQueryResult, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{shipping::ShippingAddress, totals::OrderTotals},
    models::{OrderItem, PaymentResult},
};

/// Line item snapshots embedded in the order row.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize, FromJsonQueryResult)]
pub struct LineItems(pub Vec<OrderItem>);

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub user_id: Uuid,
    #[sea_orm(column_type = "JsonBinary")]
    pub items: LineItems,
    #[sea_orm(column_type = "JsonBinary")]
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub payment_result: Option<PaymentResult>,
    pub items_price: i64,
    pub tax_price: i64,
    pub shipping_price: i64,
    pub total_price: i64,
    pub status: String,
    pub is_paid: bool,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTimeWithTimeZone>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    /// Totals are always derived from the embedded items, whatever the
    /// caller put in `items_price` / `total_price`.
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let Some(totals) = recompute_totals(&self)? {
            self.items_price = ActiveValue::Set(totals.items_price);
            self.total_price = ActiveValue::Set(totals.total_price);
        }
        if !insert {
            self.updated_at = ActiveValue::Set(Utc::now().into());
        }
        Ok(self)
    }
}

fn recompute_totals(model: &ActiveModel) -> Result<Option<OrderTotals>, DbErr> {
    let items = match &model.items {
        ActiveValue::Set(items) | ActiveValue::Unchanged(items) => items,
        ActiveValue::NotSet => return Ok(None),
    };
    if items.0.is_empty() {
        return Ok(None);
    }

    let tax_price = current_or_zero(&model.tax_price);
    let shipping_price = current_or_zero(&model.shipping_price);
    OrderTotals::compute(
        items.0.iter().map(|item| (item.price, item.quantity)),
        tax_price,
        shipping_price,
    )
    .map(Some)
    .map_err(|err| DbErr::Custom(format!("invalid order totals: {err}")))
}

fn current_or_zero(value: &ActiveValue<i64>) -> i64 {
    match value {
        ActiveValue::Set(v) | ActiveValue::Unchanged(v) => *v,
        ActiveValue::NotSet => 0,
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::ActiveValue::{NotSet, Set};
    use uuid::Uuid;

    use super::*;

    fn item(price: i64, quantity: i32) -> OrderItem {
        OrderItem {
            product: Uuid::new_v4(),
            name: "Widget".into(),
            price,
            quantity,
            image: "/img/widget.png".into(),
            sku: None,
        }
    }

    #[test]
    fn recomputes_from_items_ignoring_supplied_totals() {
        let model = ActiveModel {
            items: Set(LineItems(vec![item(1000, 2), item(250, 1)])),
            tax_price: Set(100),
            shipping_price: Set(599),
            items_price: Set(1),
            total_price: Set(1),
            ..Default::default()
        };
        let totals = recompute_totals(&model).unwrap().unwrap();
        assert_eq!(totals.items_price, 2250);
        assert_eq!(totals.total_price, 2250 + 100 + 599);
    }

    #[test]
    fn leaves_orders_without_items_alone() {
        let model = ActiveModel {
            items: Set(LineItems::default()),
            ..Default::default()
        };
        assert_eq!(recompute_totals(&model).unwrap(), None);

        let model = ActiveModel {
            items: NotSet,
            ..Default::default()
        };
        assert_eq!(recompute_totals(&model).unwrap(), None);
    }
}
