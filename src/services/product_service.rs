use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{
        AddCommentRequest, CreateProductRequest, ProductDetails, ProductList,
        UpdateProductRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Comment, Product, ProductImage},
    rating,
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let keyword = query
        .q
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));

    let items: Vec<Product> = sqlx::query_as(
        "SELECT * FROM products WHERE ($1::text IS NULL OR name ILIKE $1) \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(&keyword)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) =
        sqlx::query_as("SELECT count(*) FROM products WHERE ($1::text IS NULL OR name ILIKE $1)")
            .bind(&keyword)
            .fetch_one(&state.pool)
            .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn product_details(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<ProductDetails>> {
    let product: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let images: Vec<ProductImage> =
        sqlx::query_as("SELECT * FROM product_images WHERE product_id = $1 ORDER BY created_at")
            .bind(id)
            .fetch_all(&state.pool)
            .await?;

    let comments: Vec<Comment> =
        sqlx::query_as("SELECT * FROM comments WHERE product_id = $1 ORDER BY created_at")
            .bind(id)
            .fetch_all(&state.pool)
            .await?;

    Ok(ApiResponse::success(
        "Product",
        ProductDetails {
            product,
            images,
            comments,
        },
        Some(Meta::empty()),
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if payload.price < 0 {
        return Err(AppError::Validation("price must be non-negative".into()));
    }
    if payload.stock < 0 {
        return Err(AppError::Validation("stock must be non-negative".into()));
    }

    let mut tx = state.pool.begin().await?;

    let product: Product = sqlx::query_as(
        r#"
        INSERT INTO products (id, name, description, price, stock, category_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.price)
    .bind(payload.stock)
    .bind(payload.category_id)
    .fetch_one(&mut *tx)
    .await?;

    for image in &payload.images {
        sqlx::query(
            "INSERT INTO product_images (id, product_id, public_id, url) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(product.id)
        .bind(&image.public_id)
        .bind(&image.url)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_created",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if payload.price.is_some_and(|p| p < 0) {
        return Err(AppError::Validation("price must be non-negative".into()));
    }
    if payload.stock.is_some_and(|s| s < 0) {
        return Err(AppError::Validation("stock must be non-negative".into()));
    }

    let existing: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let name = payload.name.unwrap_or(existing.name);
    let description = payload.description.or(existing.description);
    let price = payload.price.unwrap_or(existing.price);
    let stock = payload.stock.unwrap_or(existing.stock);
    let category_id = payload.category_id.or(existing.category_id);

    let product: Product = sqlx::query_as(
        r#"
        UPDATE products
        SET name = $2, description = $3, price = $4, stock = $5, category_id = $6
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(price)
    .bind(stock)
    .bind(category_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Updated",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Append a comment and recompute the product's derived score in the same
/// transaction. The product row is locked first, so concurrent appends to
/// the same product serialize and the stored score can never be read stale
/// relative to the stored comments.
pub async fn add_comment(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: AddCommentRequest,
) -> AppResult<ApiResponse<Product>> {
    if !(0..=5).contains(&payload.vote) {
        return Err(AppError::Validation(format!(
            "vote must be between 0 and 5, got {}",
            payload.vote
        )));
    }
    if payload.comment.trim().is_empty() {
        return Err(AppError::Validation("comment must not be empty".into()));
    }

    let mut tx = state.pool.begin().await?;

    let locked: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;
    if locked.is_none() {
        return Err(AppError::NotFound);
    }

    let author: Option<(String,)> = sqlx::query_as("SELECT email FROM users WHERE id = $1")
        .bind(user.user_id)
        .fetch_optional(&mut *tx)
        .await?;
    let vote_by = author
        .map(|(email,)| email)
        .unwrap_or_else(|| user.user_id.to_string());

    sqlx::query(
        r#"
        INSERT INTO comments (id, product_id, user_id, body, vote, vote_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(product_id)
    .bind(user.user_id)
    .bind(payload.comment.trim())
    .bind(payload.vote)
    .bind(&vote_by)
    .execute(&mut *tx)
    .await?;

    let votes: Vec<(i32,)> = sqlx::query_as("SELECT vote FROM comments WHERE product_id = $1")
        .bind(product_id)
        .fetch_all(&mut *tx)
        .await?;
    let votes: Vec<i32> = votes.into_iter().map(|(v,)| v).collect();
    let avg_score = rating::average_score(&votes);

    let product: Product =
        sqlx::query_as("UPDATE products SET avg_score = $2 WHERE id = $1 RETURNING *")
            .bind(product_id)
            .bind(avg_score)
            .fetch_one(&mut *tx)
            .await?;

    tx.commit().await?;

    Ok(ApiResponse::success(
        "Comment added",
        product,
        Some(Meta::empty()),
    ))
}
