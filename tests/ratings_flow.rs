mod common;

use std::sync::Arc;

use axum_storefront_api::{
    dto::products::AddCommentRequest,
    error::AppError,
    payments::InProcessGateway,
    services::product_service,
};

// Appending comments recomputes the derived score inside the same
// transaction; the stored score always matches the stored comments.
#[tokio::test]
async fn comment_append_recomputes_floor_of_mean() -> anyhow::Result<()> {
    let Some(state) = common::setup_state(Arc::new(InProcessGateway)).await? else {
        return Ok(());
    };

    let user = common::create_user(&state, "user").await?;
    let product_id = common::create_product(&state, 100, 10).await?;

    // No comments yet: no defined score.
    let details = product_service::product_details(&state, product_id).await?;
    let details = details.data.unwrap();
    assert!(details.comments.is_empty());
    assert!(details.product.avg_score.is_none());

    let mut last_score = None;
    for vote in [5, 4, 3, 2] {
        let resp = product_service::add_comment(
            &state,
            &user,
            product_id,
            AddCommentRequest {
                comment: format!("vote {vote}"),
                vote,
            },
        )
        .await?;
        last_score = resp.data.unwrap().avg_score;
    }

    // floor((5+4+3+2) / 4) == 3
    assert_eq!(last_score, Some(3));

    let details = product_service::product_details(&state, product_id).await?;
    let details = details.data.unwrap();
    assert_eq!(details.comments.len(), 4);
    assert_eq!(details.product.avg_score, Some(3));

    Ok(())
}

#[tokio::test]
async fn out_of_range_vote_is_rejected() -> anyhow::Result<()> {
    let Some(state) = common::setup_state(Arc::new(InProcessGateway)).await? else {
        return Ok(());
    };

    let user = common::create_user(&state, "user").await?;
    let product_id = common::create_product(&state, 100, 10).await?;

    for vote in [-1, 6] {
        let err = product_service::add_comment(
            &state,
            &user,
            product_id,
            AddCommentRequest {
                comment: "out of range".into(),
                vote,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    let details = product_service::product_details(&state, product_id).await?;
    let details = details.data.unwrap();
    assert!(details.comments.is_empty());
    assert!(details.product.avg_score.is_none());

    Ok(())
}

#[tokio::test]
async fn comment_on_missing_product_is_not_found() -> anyhow::Result<()> {
    let Some(state) = common::setup_state(Arc::new(InProcessGateway)).await? else {
        return Ok(());
    };

    let user = common::create_user(&state, "user").await?;
    let err = product_service::add_comment(
        &state,
        &user,
        uuid::Uuid::new_v4(),
        AddCommentRequest {
            comment: "ghost".into(),
            vote: 3,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}
