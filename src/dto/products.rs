use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Comment, Product, ProductImage};

/// An already-persisted image reference from the upload layer; the core
/// never sees raw file bytes.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ImageRef {
    pub public_id: String,
    pub url: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub stock: i32,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    pub category_id: Option<uuid::Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i32>,
    pub category_id: Option<uuid::Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCommentRequest {
    pub comment: String,
    /// Integer vote in [0,5].
    pub vote: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetails {
    pub product: Product,
    pub images: Vec<ProductImage>,
    pub comments: Vec<Comment>,
}
