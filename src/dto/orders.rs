use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ShippingInfo {
    pub address: String,
    pub city: String,
    pub country: String,
    pub pin_code: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub shipping_info: ShippingInfo,
    pub order_items: Vec<OrderItemRequest>,
    /// "COD" or "ONLINE".
    pub payment_method: String,
    /// Client-computed totals; rejected outright if they disagree with the
    /// server-side recomputation.
    pub items_price: i64,
    pub tax_price: i64,
    pub shipping_charges: i64,
    pub total_amount: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessPaymentRequest {
    /// Amount in the smallest currency unit.
    pub total_amount: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentReference {
    pub client_secret: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderPlaced {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// Present only for ONLINE orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentReference>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

/// A product ranked by historical ordered volume.
#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct ProductVolume {
    pub product_id: Uuid,
    pub name: String,
    pub total_ordered: i64,
    pub last_ordered_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductVolumeList {
    pub items: Vec<ProductVolume>,
}
