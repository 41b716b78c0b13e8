//! Order lifecycle manager.
//!
//! Owns the order state machine and orchestrates pricing, stock reservation
//! and payment intent creation. Order creation is one transaction: either
//! the order is durably stored with its stock decrements, or nothing is.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{
        CreateOrderRequest, OrderList, OrderPlaced, OrderWithItems, PaymentReference,
        ProcessPaymentRequest, ProductVolume, ProductVolumeList,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem, OrderStatus, PaymentMethod},
    payments::{INTENT_STATUS_FAILED, INTENT_STATUS_SUCCEEDED},
    pricing,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, Pagination, SortOrder},
    state::AppState,
    stock::{self, Reservation},
};

#[derive(Debug, sqlx::FromRow)]
struct PricedProduct {
    id: Uuid,
    name: String,
    price: i64,
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderPlaced>> {
    let payment_method = PaymentMethod::parse(&payload.payment_method)?;

    if payload.order_items.is_empty() {
        return Err(AppError::Validation("order has no line items".into()));
    }
    let mut seen: Vec<Uuid> = payload.order_items.iter().map(|i| i.product_id).collect();
    seen.sort();
    seen.dedup();
    if seen.len() != payload.order_items.len() {
        return Err(AppError::Validation(
            "order lists the same product more than once".into(),
        ));
    }

    let mut tx = state.pool.begin().await?;

    let product_ids: Vec<Uuid> = payload.order_items.iter().map(|i| i.product_id).collect();
    let products: Vec<PricedProduct> =
        sqlx::query_as("SELECT id, name, price FROM products WHERE id = ANY($1)")
            .bind(&product_ids)
            .fetch_all(&mut *tx)
            .await?;

    let by_id: HashMap<Uuid, &PricedProduct> = products.iter().map(|p| (p.id, p)).collect();
    for item in &payload.order_items {
        if !by_id.contains_key(&item.product_id) {
            return Err(AppError::Validation(format!(
                "unknown product {}",
                item.product_id
            )));
        }
    }

    // First image per product for the line-item snapshot.
    #[derive(sqlx::FromRow)]
    struct FirstImage {
        product_id: Uuid,
        url: String,
    }
    let images: Vec<FirstImage> = sqlx::query_as(
        r#"
        SELECT DISTINCT ON (product_id) product_id, url
        FROM product_images
        WHERE product_id = ANY($1)
        ORDER BY product_id, created_at
        "#,
    )
    .bind(&product_ids)
    .fetch_all(&mut *tx)
    .await?;
    let image_by_id: HashMap<Uuid, String> =
        images.into_iter().map(|i| (i.product_id, i.url)).collect();

    // Authoritative totals from stored prices; client totals are compared,
    // never trusted. A mismatch is a hard rejection, not an auto-correction.
    let pairs: Vec<(i64, i32)> = payload
        .order_items
        .iter()
        .map(|item| (by_id[&item.product_id].price, item.quantity))
        .collect();
    let totals = pricing::compute_totals(&pairs, payload.tax_price, payload.shipping_charges)?;

    if totals.items_price != payload.items_price || totals.total_amount != payload.total_amount {
        return Err(AppError::PriceMismatch);
    }

    // Reserve before the (potentially slow) gateway call so a stalled payment
    // cannot cause overselling.
    let reservations: Vec<Reservation> = payload
        .order_items
        .iter()
        .map(|item| Reservation {
            product_id: item.product_id,
            quantity: item.quantity,
        })
        .collect();
    stock::reserve(&mut tx, &reservations).await?;

    let mut payment_ref = None;
    let mut payment_txn_id: Option<String> = None;
    let mut payment_status: Option<String> = None;

    if payment_method == PaymentMethod::Online {
        match state
            .payments
            .create_intent(totals.total_amount, &state.currency)
            .await
        {
            Ok(intent) => {
                payment_txn_id = Some(intent.id.clone());
                payment_status = Some(intent.status.clone());
                payment_ref = Some(PaymentReference {
                    client_secret: intent.client_secret,
                });
            }
            Err(err) => {
                // Stock was already decremented in this transaction; roll it
                // back and surface the rollback failure rather than leaving
                // inventory silently inconsistent.
                if let Err(rb_err) = tx.rollback().await {
                    tracing::error!(
                        error = %rb_err,
                        gateway_error = %err,
                        "stock reservation rollback failed after gateway error"
                    );
                    return Err(AppError::Internal(anyhow::anyhow!(
                        "rollback failed after gateway error: {rb_err}"
                    )));
                }
                return Err(err.into());
            }
        }
    }

    let order_id = Uuid::new_v4();
    let order: Order = sqlx::query_as(
        r#"
        INSERT INTO orders (
            id, user_id, address, city, country, pin_code, payment_method,
            items_price, tax_price, shipping_charges, total_amount,
            payment_txn_id, payment_status, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(user.user_id)
    .bind(&payload.shipping_info.address)
    .bind(&payload.shipping_info.city)
    .bind(&payload.shipping_info.country)
    .bind(&payload.shipping_info.pin_code)
    .bind(payment_method.as_str())
    .bind(totals.items_price)
    .bind(totals.tax_price)
    .bind(totals.shipping_charges)
    .bind(totals.total_amount)
    .bind(&payment_txn_id)
    .bind(&payment_status)
    .bind(OrderStatus::Preparing.as_str())
    .fetch_one(&mut *tx)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(payload.order_items.len());
    for item in &payload.order_items {
        let product = by_id[&item.product_id];
        let row: OrderItem = sqlx::query_as(
            r#"
            INSERT INTO order_items (id, order_id, product_id, name, price, quantity, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order.id)
        .bind(product.id)
        .bind(&product.name)
        .bind(product.price)
        .bind(item.quantity)
        .bind(image_by_id.get(&item.product_id))
        .fetch_one(&mut *tx)
        .await?;
        items.push(row);
    }

    tx.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_created",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order.id,
            "payment_method": payment_method.as_str(),
            "total_amount": order.total_amount,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order placed",
        OrderPlaced {
            order,
            items,
            payment: payment_ref,
        },
        Some(Meta::empty()),
    ))
}

/// Create a standalone payment intent for an amount and hand the client
/// secret back to the caller.
pub async fn process_payment(
    state: &AppState,
    user: &AuthUser,
    payload: ProcessPaymentRequest,
) -> AppResult<ApiResponse<PaymentReference>> {
    let intent = state
        .payments
        .create_intent(payload.total_amount, &state.currency)
        .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "payment_intent_created",
        Some("orders"),
        Some(serde_json::json!({ "intent_id": intent.id, "amount": intent.amount })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment intent created",
        PaymentReference {
            client_secret: intent.client_secret,
        },
        Some(Meta::empty()),
    ))
}

/// Record the gateway's settlement outcome for an ONLINE order. On success
/// the order is stamped with the confirmation time.
pub async fn confirm_payment(
    state: &AppState,
    order_id: Uuid,
    succeeded: bool,
) -> AppResult<ApiResponse<Order>> {
    let mut tx = state.pool.begin().await?;

    let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    if order.payment_txn_id.is_none() {
        return Err(AppError::BadRequest(
            "Order has no payment record to confirm".into(),
        ));
    }
    if order.payment_status.as_deref() == Some(INTENT_STATUS_SUCCEEDED) {
        return Err(AppError::BadRequest("Order already paid".into()));
    }

    let new_status = if succeeded {
        INTENT_STATUS_SUCCEEDED
    } else {
        INTENT_STATUS_FAILED
    };
    let paid_at = succeeded.then(Utc::now);

    let order: Order = sqlx::query_as(
        "UPDATE orders SET payment_status = $2, paid_at = COALESCE($3, paid_at) WHERE id = $1 RETURNING *",
    )
    .bind(order.id)
    .bind(new_status)
    .bind(paid_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(ApiResponse::success(
        "Payment recorded",
        order,
        Some(Meta::empty()),
    ))
}

pub async fn my_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = pagination.normalize();

    let orders: Vec<Order> = sqlx::query_as(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT count(*) FROM orders WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn admin_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();
    let status = query.status.filter(|s| !s.is_empty());
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let sql = format!(
        "SELECT * FROM orders WHERE ($1::text IS NULL OR status = $1) \
         ORDER BY created_at {} LIMIT $2 OFFSET $3",
        sort_order.as_sql()
    );
    let orders: Vec<Order> = sqlx::query_as(&sql)
        .bind(&status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await?;

    let total: (i64,) =
        sqlx::query_as("SELECT count(*) FROM orders WHERE ($1::text IS NULL OR status = $1)")
            .bind(&status)
            .fetch_one(&state.pool)
            .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn order_details(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    // Owner or admin only.
    if order.user_id != user.user_id && user.role != "admin" {
        return Err(AppError::Forbidden);
    }

    let items: Vec<OrderItem> =
        sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY created_at")
            .bind(order.id)
            .fetch_all(&state.pool)
            .await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}

/// Advance an order exactly one step along Preparing -> Shipped -> Delivered.
/// The predecessor state is checked under a row lock, so a repeated or
/// out-of-order request is rejected instead of double-advancing.
pub async fn advance_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let mut tx = state.pool.begin().await?;
    let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let current = OrderStatus::parse(&order.status)?;
    let next = match current.next() {
        Some(next) => next,
        None => return Err(AppError::BadRequest("Order already delivered".into())),
    };

    let delivered_at = (next == OrderStatus::Delivered).then(Utc::now);
    let order: Order = sqlx::query_as(
        "UPDATE orders SET status = $2, delivered_at = COALESCE($3, delivered_at) \
         WHERE id = $1 RETURNING *",
    )
    .bind(order.id)
    .bind(next.as_str())
    .bind(delivered_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_status_advanced",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": order.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order updated",
        order,
        Some(Meta::empty()),
    ))
}

/// Products ranked by historical ordered volume, derived from line-item
/// snapshots.
pub async fn products_by_volume(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductVolumeList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let items: Vec<ProductVolume> = sqlx::query_as(
        r#"
        SELECT oi.product_id,
               p.name,
               SUM(oi.quantity)::bigint AS total_ordered,
               MAX(oi.created_at) AS last_ordered_at
        FROM order_items oi
        JOIN products p ON p.id = oi.product_id
        GROUP BY oi.product_id, p.name
        ORDER BY total_ordered DESC, last_ordered_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) =
        sqlx::query_as("SELECT count(DISTINCT product_id) FROM order_items")
            .fetch_one(&state.pool)
            .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Products by order volume",
        ProductVolumeList { items },
        Some(meta),
    ))
}
