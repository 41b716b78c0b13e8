mod common;

use std::sync::Arc;

use axum_storefront_api::{
    error::AppError,
    payments::{AlwaysFailGateway, InProcessGateway},
    routes::params::Pagination,
    services::order_service,
};

// COD happy path: totals recomputed server-side, line items snapshotted,
// order starts Preparing, owner can read it back.
#[tokio::test]
async fn cod_order_settles_with_recomputed_totals() -> anyhow::Result<()> {
    let Some(state) = common::setup_state(Arc::new(InProcessGateway)).await? else {
        return Ok(());
    };

    let user = common::create_user(&state, "user").await?;
    let product_id = common::create_product(&state, 100, 10).await?;

    let resp = order_service::create_order(
        &state,
        &user,
        common::order_request(product_id, 2, 100, 10, 5, "COD"),
    )
    .await?;
    let placed = resp.data.unwrap();

    assert_eq!(placed.order.items_price, 200);
    assert_eq!(placed.order.total_amount, 215);
    assert_eq!(
        placed.order.total_amount,
        placed.order.items_price + placed.order.tax_price + placed.order.shipping_charges
    );
    assert_eq!(placed.order.status, "Preparing");
    assert!(placed.order.paid_at.is_none());
    assert!(placed.order.payment_txn_id.is_none());
    assert!(placed.payment.is_none());

    // Snapshot fields come from the product row, not the request.
    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].price, 100);
    assert_eq!(placed.items[0].quantity, 2);

    assert_eq!(common::product_stock(&state, product_id).await?, 8);

    let mine = order_service::my_orders(&state, &user, Pagination::default()).await?;
    assert!(
        mine.data
            .unwrap()
            .items
            .iter()
            .any(|o| o.id == placed.order.id)
    );

    let details = order_service::order_details(&state, &user, placed.order.id).await?;
    assert_eq!(details.data.unwrap().items.len(), 1);

    // A different non-admin caller must not see it.
    let stranger = common::create_user(&state, "user").await?;
    let err = order_service::order_details(&state, &stranger, placed.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    Ok(())
}

#[tokio::test]
async fn client_total_mismatch_is_rejected_without_effect() -> anyhow::Result<()> {
    let Some(state) = common::setup_state(Arc::new(InProcessGateway)).await? else {
        return Ok(());
    };

    let user = common::create_user(&state, "user").await?;
    let product_id = common::create_product(&state, 100, 10).await?;

    // Server computes 215; client claims 200.
    let mut payload = common::order_request(product_id, 2, 100, 10, 5, "COD");
    payload.total_amount = 200;

    let err = order_service::create_order(&state, &user, payload)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PriceMismatch));
    assert_eq!(common::product_stock(&state, product_id).await?, 10);

    Ok(())
}

#[tokio::test]
async fn insufficient_stock_fails_whole_order() -> anyhow::Result<()> {
    let Some(state) = common::setup_state(Arc::new(InProcessGateway)).await? else {
        return Ok(());
    };

    let user = common::create_user(&state, "user").await?;
    let product_id = common::create_product(&state, 100, 1).await?;

    let err = order_service::create_order(
        &state,
        &user,
        common::order_request(product_id, 2, 100, 0, 0, "COD"),
    )
    .await
    .unwrap_err();
    match err {
        AppError::InsufficientStock { product_id: named } => assert_eq!(named, product_id),
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(common::product_stock(&state, product_id).await?, 1);

    Ok(())
}

// Stock is reserved before the gateway call; a gateway failure must leave it
// exactly as it was.
#[tokio::test]
async fn gateway_failure_rolls_back_reservation() -> anyhow::Result<()> {
    let Some(state) = common::setup_state(Arc::new(AlwaysFailGateway)).await? else {
        return Ok(());
    };

    let user = common::create_user(&state, "user").await?;
    let product_id = common::create_product(&state, 100, 10).await?;

    let err = order_service::create_order(
        &state,
        &user,
        common::order_request(product_id, 3, 100, 0, 0, "ONLINE"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::PaymentGateway(_)));
    assert_eq!(common::product_stock(&state, product_id).await?, 10);

    let mine = order_service::my_orders(&state, &user, Pagination::default()).await?;
    assert!(mine.data.unwrap().items.is_empty());

    Ok(())
}

#[tokio::test]
async fn online_order_records_intent_and_confirmation_stamps_paid_at() -> anyhow::Result<()> {
    let Some(state) = common::setup_state(Arc::new(InProcessGateway)).await? else {
        return Ok(());
    };

    let user = common::create_user(&state, "user").await?;
    let product_id = common::create_product(&state, 500, 5).await?;

    let resp = order_service::create_order(
        &state,
        &user,
        common::order_request(product_id, 1, 500, 50, 25, "ONLINE"),
    )
    .await?;
    let placed = resp.data.unwrap();

    assert!(placed.payment.is_some(), "expected a client secret");
    assert!(placed.order.payment_txn_id.is_some());
    assert_eq!(placed.order.payment_status.as_deref(), Some("pending"));
    assert!(placed.order.paid_at.is_none());

    let confirmed = order_service::confirm_payment(&state, placed.order.id, true).await?;
    let order = confirmed.data.unwrap();
    assert_eq!(order.payment_status.as_deref(), Some("succeeded"));
    assert!(order.paid_at.is_some());

    // Confirming twice is rejected.
    let err = order_service::confirm_payment(&state, order.id, true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

// With stock = N, N+k concurrent single-unit orders succeed exactly N times.
#[tokio::test]
async fn concurrent_orders_never_oversell() -> anyhow::Result<()> {
    let Some(state) = common::setup_state(Arc::new(InProcessGateway)).await? else {
        return Ok(());
    };

    let user = common::create_user(&state, "user").await?;
    let product_id = common::create_product(&state, 100, 5).await?;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let state = state.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            order_service::create_order(
                &state,
                &user,
                common::order_request(product_id, 1, 100, 0, 0, "COD"),
            )
            .await
        }));
    }

    let mut ok = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => ok += 1,
            Err(AppError::InsufficientStock { .. }) => out_of_stock += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(ok, 5, "exactly stock-many orders should succeed");
    assert_eq!(out_of_stock, 3);
    assert_eq!(common::product_stock(&state, product_id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn status_only_advances_one_step_and_stops_at_delivered() -> anyhow::Result<()> {
    let Some(state) = common::setup_state(Arc::new(InProcessGateway)).await? else {
        return Ok(());
    };

    let user = common::create_user(&state, "user").await?;
    let admin = common::create_user(&state, "admin").await?;
    let product_id = common::create_product(&state, 100, 10).await?;

    let resp = order_service::create_order(
        &state,
        &user,
        common::order_request(product_id, 1, 100, 0, 0, "COD"),
    )
    .await?;
    let order_id = resp.data.unwrap().order.id;

    // Non-admin cannot drive the state machine.
    let err = order_service::advance_status(&state, &user, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let shipped = order_service::advance_status(&state, &admin, order_id).await?;
    let shipped = shipped.data.unwrap();
    assert_eq!(shipped.status, "Shipped");
    assert!(shipped.delivered_at.is_none());

    let delivered = order_service::advance_status(&state, &admin, order_id).await?;
    let delivered = delivered.data.unwrap();
    assert_eq!(delivered.status, "Delivered");
    assert!(delivered.delivered_at.is_some());

    let err = order_service::advance_status(&state, &admin, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn volume_listing_is_admin_only_and_ranks_ordered_products() -> anyhow::Result<()> {
    let Some(state) = common::setup_state(Arc::new(InProcessGateway)).await? else {
        return Ok(());
    };

    let user = common::create_user(&state, "user").await?;
    let admin = common::create_user(&state, "admin").await?;
    let product_id = common::create_product(&state, 100, 20).await?;

    order_service::create_order(
        &state,
        &user,
        common::order_request(product_id, 4, 100, 0, 0, "COD"),
    )
    .await?;

    let err = order_service::products_by_volume(&state, &user, Pagination::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let listing = order_service::products_by_volume(
        &state,
        &admin,
        Pagination {
            page: Some(1),
            per_page: Some(100),
        },
    )
    .await?;
    let entry = listing
        .data
        .unwrap()
        .items
        .into_iter()
        .find(|p| p.product_id == product_id)
        .expect("ordered product should appear in volume listing");
    assert_eq!(entry.total_ordered, 4);

    Ok(())
}
