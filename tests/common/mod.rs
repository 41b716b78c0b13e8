#![allow(dead_code)]

use std::sync::Arc;

use axum_storefront_api::{
    db::create_pool,
    dto::orders::{CreateOrderRequest, OrderItemRequest, ShippingInfo},
    middleware::auth::AuthUser,
    payments::PaymentGateway,
    state::AppState,
};
use uuid::Uuid;

/// Build an AppState against the test database, or None when no database is
/// configured so the caller can skip.
pub async fn setup_state(
    gateway: Arc<dyn PaymentGateway>,
) -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(Some(AppState {
        pool,
        payments: gateway,
        currency: "usd".into(),
    }))
}

pub async fn create_user(state: &AppState, role: &str) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, password_hash, role) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(format!("{role}-{id}@example.com"))
        .bind("dummy")
        .bind(role)
        .execute(&state.pool)
        .await?;
    Ok(AuthUser {
        user_id: id,
        role: role.into(),
    })
}

pub async fn create_product(
    state: &AppState,
    price: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO products (id, name, description, price, stock) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(format!("Test Widget {id}"))
    .bind("A product for testing")
    .bind(price)
    .bind(stock)
    .execute(&state.pool)
    .await?;
    Ok(id)
}

pub async fn product_stock(state: &AppState, id: Uuid) -> anyhow::Result<i32> {
    let (stock,): (i32,) = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
        .bind(id)
        .fetch_one(&state.pool)
        .await?;
    Ok(stock)
}

/// A single-line-item order request with client totals computed the same way
/// the server computes them (so it is accepted unless a test skews it).
pub fn order_request(
    product_id: Uuid,
    quantity: i32,
    unit_price: i64,
    tax_price: i64,
    shipping_charges: i64,
    payment_method: &str,
) -> CreateOrderRequest {
    let items_price = unit_price * i64::from(quantity);
    CreateOrderRequest {
        shipping_info: ShippingInfo {
            address: "1 Test Lane".into(),
            city: "Testville".into(),
            country: "Testland".into(),
            pin_code: "12345".into(),
        },
        order_items: vec![OrderItemRequest {
            product_id,
            quantity,
        }],
        payment_method: payment_method.into(),
        items_price,
        tax_price,
        shipping_charges,
        total_amount: items_price + tax_price + shipping_charges,
    }
}
