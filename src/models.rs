use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Unit price in the smallest currency unit.
    pub price: i64,
    pub stock: i32,
    pub category_id: Option<Uuid>,
    /// Floor of the mean comment vote; NULL while the product has no comments.
    pub avg_score: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub public_id: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub vote: i32,
    pub vote_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address: String,
    pub city: String,
    pub country: String,
    pub pin_code: String,
    pub payment_method: String,
    pub items_price: i64,
    pub tax_price: i64,
    pub shipping_charges: i64,
    pub total_amount: i64,
    pub payment_txn_id: Option<String>,
    pub payment_status: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub status: String,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A line item is a snapshot of the product at order-creation time;
/// later product edits never alter a placed order.
#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub price: i64,
    pub quantity: i32,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PaymentMethod {
    #[serde(rename = "COD")]
    Cod,
    #[serde(rename = "ONLINE")]
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "COD",
            PaymentMethod::Online => "ONLINE",
        }
    }

    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "COD" => Ok(PaymentMethod::Cod),
            "ONLINE" => Ok(PaymentMethod::Online),
            other => Err(AppError::Validation(format!(
                "unknown payment method '{other}'"
            ))),
        }
    }
}

/// Order fulfillment state machine. Transitions are strictly sequential:
/// Preparing -> Shipped -> Delivered, admin-driven, no skips or reversals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    Preparing,
    Shipped,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Preparing => "Preparing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
        }
    }

    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "Preparing" => Ok(OrderStatus::Preparing),
            "Shipped" => Ok(OrderStatus::Shipped),
            "Delivered" => Ok(OrderStatus::Delivered),
            other => Err(AppError::Internal(anyhow::anyhow!(
                "order has unknown status '{other}'"
            ))),
        }
    }

    /// The single legal successor state, or None at the terminal state.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Preparing => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_advances_one_step_at_a_time() {
        assert_eq!(OrderStatus::Preparing.next(), Some(OrderStatus::Shipped));
        assert_eq!(OrderStatus::Shipped.next(), Some(OrderStatus::Delivered));
        assert_eq!(OrderStatus::Delivered.next(), None);
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [
            OrderStatus::Preparing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(OrderStatus::parse("Cancelled").is_err());
    }

    #[test]
    fn payment_method_uses_wire_names() {
        assert_eq!(PaymentMethod::parse("COD").unwrap(), PaymentMethod::Cod);
        assert_eq!(
            PaymentMethod::parse("ONLINE").unwrap(),
            PaymentMethod::Online
        );
        assert!(PaymentMethod::parse("cheque").is_err());
    }
}
