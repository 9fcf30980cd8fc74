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
    domain::{
        category::Category,
        order_status::OrderStatus,
        payment_method::PaymentMethod,
        role::Role,
        shipping::{ShippingAddress, ShippingAddressInput},
    },
    dto::{
        auth::{AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest},
        cart::{AddToCartRequest, CartItemView, CartView, UpdateCartItemRequest},
        orders::{
            CreateOrderRequest, MarkPaidRequest, OrderItemRequest, OrderList, OrderStats,
            StatusCount, UpdateOrderStatusRequest,
        },
        payments::{
            CreatePaymentIntentRequest, CreateSetupIntentRequest, PaymentIntentResponse,
            PaymentMethodsResponse, SetupIntentResponse, WebhookAck,
        },
        products::{
            CategoryList, CreateProductRequest, ProductList, StockUpdateRequest,
            UpdateProductRequest,
        },
    },
    models::{Order, OrderItem, PaymentResult, Product, User},
    response::{ApiResponse, Meta},
    routes::{auth, cart, health, orders, params, payments, products},
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
        auth::me,
        auth::update_profile,
        products::list_products,
        products::featured_products,
        products::sale_products,
        products::list_categories,
        products::products_by_category,
        products::search_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::update_stock,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        orders::create_order,
        orders::my_orders,
        orders::get_order,
        orders::cancel_order,
        orders::list_all_orders,
        orders::order_stats,
        orders::orders_by_status,
        orders::mark_paid,
        orders::mark_delivered,
        orders::update_status,
        payments::create_payment_intent,
        payments::get_payment_intent,
        payments::payment_methods,
        payments::create_setup_intent,
        payments::webhook
    ),
    components(
        schemas(
            User,
            Role,
            Product,
            Category,
            Order,
            OrderItem,
            OrderStatus,
            PaymentMethod,
            PaymentResult,
            ShippingAddress,
            ShippingAddressInput,
            RegisterRequest,
            LoginRequest,
            UpdateProfileRequest,
            AuthResponse,
            CreateProductRequest,
            UpdateProductRequest,
            StockUpdateRequest,
            ProductList,
            CategoryList,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartView,
            CartItemView,
            CreateOrderRequest,
            OrderItemRequest,
            UpdateOrderStatusRequest,
            MarkPaidRequest,
            OrderList,
            OrderStats,
            StatusCount,
            CreatePaymentIntentRequest,
            PaymentIntentResponse,
            PaymentMethodsResponse,
            CreateSetupIntentRequest,
            SetupIntentResponse,
            WebhookAck,
            params::ProductSort,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<CartView>,
            ApiResponse<AuthResponse>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and profile"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Server-held shopping cart"),
        (name = "Orders", description = "Checkout and order history"),
        (name = "Admin", description = "Order administration"),
        (name = "Payments", description = "Stripe payment intents and webhooks"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
