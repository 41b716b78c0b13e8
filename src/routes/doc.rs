use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        orders::{
            CreateOrderRequest, OrderItemRequest, OrderList, OrderPlaced, OrderWithItems,
            PaymentReference, ProcessPaymentRequest, ProductVolume, ProductVolumeList,
            ShippingInfo,
        },
        products::{
            AddCommentRequest, CreateProductRequest, ImageRef, ProductDetails, ProductList,
            UpdateProductRequest,
        },
    },
    models::{Comment, Order, OrderItem, OrderStatus, PaymentMethod, Product, ProductImage, User},
    response::{ApiResponse, Meta},
    routes::{auth, health, orders, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        products::list_products,
        products::product_details,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::add_comment,
        orders::create_order,
        orders::process_payment,
        orders::my_orders,
        orders::admin_orders,
        orders::products_by_volume,
        orders::order_details,
        orders::advance_status
    ),
    components(
        schemas(
            User,
            Product,
            ProductImage,
            Comment,
            Order,
            OrderItem,
            OrderStatus,
            PaymentMethod,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            UpdateProductRequest,
            AddCommentRequest,
            ImageRef,
            ProductList,
            ProductDetails,
            ShippingInfo,
            OrderItemRequest,
            CreateOrderRequest,
            ProcessPaymentRequest,
            PaymentReference,
            OrderPlaced,
            OrderWithItems,
            OrderList,
            ProductVolume,
            ProductVolumeList,
            params::Pagination,
            params::SortOrder,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductDetails>,
            ApiResponse<ProductList>,
            ApiResponse<OrderPlaced>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<ProductVolumeList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Product and comment endpoints"),
        (name = "Orders", description = "Order settlement endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
