//! Stock ledger: all-or-nothing inventory reservation for an order.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy)]
pub struct Reservation {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Decrement stock for every line item inside the caller's transaction.
///
/// Each decrement is conditional (`stock >= quantity` in the UPDATE itself),
/// never a read-then-write pair, so concurrent reservations against the same
/// product cannot lose updates. The first insufficient item fails the whole
/// reservation; the caller's transaction rollback discards any decrements
/// already applied.
pub async fn reserve(
    tx: &mut Transaction<'_, Postgres>,
    items: &[Reservation],
) -> AppResult<()> {
    // Stable lock order across concurrent orders touching the same products.
    let mut items: Vec<Reservation> = items.to_vec();
    items.sort_by_key(|r| r.product_id);

    for item in &items {
        if item.quantity <= 0 {
            return Err(AppError::Validation(format!(
                "quantity must be at least 1, got {}",
                item.quantity
            )));
        }

        let result = sqlx::query(
            "UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2",
        )
        .bind(item.product_id)
        .bind(item.quantity)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InsufficientStock {
                product_id: item.product_id,
            });
        }
    }

    Ok(())
}
