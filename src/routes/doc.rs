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
    dto::{admin, auth as auth_dto, cart as cart_dto, chats as chat_dto, disputes as dispute_dto, orders as order_dto, products as product_dto, settings as settings_dto, shipping as shipping_dto, users as user_dto},
    models::{
        AuditLog, CartItem, Chat, ChatMessage, Dispute, DisputeStatus, Order, OrderItem,
        OrderStatus, PaymentMethod, PaymentStatus, Product, Role, Settings, ShippingStatus,
        ShippingTracking, TrackingEvent, User,
    },
    response::{ApiResponse, Meta},
    routes::{
        admin as admin_routes, auth, cart, chats, disputes, health, orders, params, products,
        settings, shipping, users,
    },
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
        auth::update_me,
        auth::change_password,
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        products::list_products,
        products::list_categories,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        orders::list_order,
        orders::create_order,
        orders::checkout,
        orders::get_order,
        orders::cancel_order,
        orders::pay_order,
        admin_routes::list_all_orders,
        admin_routes::get_order_admin,
        admin_routes::update_order_status,
        admin_routes::list_low_stock,
        admin_routes::adjust_inventory,
        admin_routes::stats,
        admin_routes::list_audit_logs,
        chats::start_chat,
        chats::list_chats,
        chats::unread_count,
        chats::get_chat,
        chats::send_message,
        chats::mark_read,
        chats::delete_chat,
        shipping::create_tracking,
        shipping::list_trackings,
        shipping::my_trackings,
        shipping::get_tracking,
        shipping::get_by_order,
        shipping::assign_shipper,
        shipping::update_status,
        settings::get_settings,
        settings::update_settings,
        disputes::create_dispute,
        disputes::list_disputes,
        disputes::get_dispute,
        disputes::update_dispute,
        disputes::delete_dispute
    ),
    components(
        schemas(
            User,
            Role,
            Product,
            CartItem,
            Order,
            OrderItem,
            OrderStatus,
            PaymentStatus,
            PaymentMethod,
            Chat,
            ChatMessage,
            ShippingTracking,
            ShippingStatus,
            TrackingEvent,
            Settings,
            Dispute,
            DisputeStatus,
            AuditLog,
            Meta,
            health::HealthData,
            params::Pagination,
            params::ProductQuery,
            params::SortOrder,
            params::ProductSortBy,
            auth_dto::RegisterRequest,
            auth_dto::LoginRequest,
            auth_dto::LoginResponse,
            auth_dto::UpdateProfileRequest,
            auth_dto::ChangePasswordRequest,
            user_dto::CreateUserRequest,
            user_dto::UpdateUserRequest,
            user_dto::UserList,
            product_dto::CreateProductRequest,
            product_dto::UpdateProductRequest,
            product_dto::ProductList,
            product_dto::CategoryList,
            cart_dto::AddToCartRequest,
            cart_dto::UpdateCartItemRequest,
            cart_dto::CartView,
            cart_dto::CartItemDto,
            order_dto::OrderLineRequest,
            order_dto::CreateOrderRequest,
            order_dto::CheckoutRequest,
            order_dto::UpdateOrderStatusRequest,
            order_dto::OrderWithItems,
            order_dto::OrderList,
            admin::InventoryAdjustRequest,
            admin::LowStockList,
            admin::AuditLogList,
            admin::DashboardStats,
            chat_dto::StartChatRequest,
            chat_dto::SendMessageRequest,
            chat_dto::ChatWithMessages,
            chat_dto::ChatList,
            chat_dto::UnreadCount,
            shipping_dto::CreateTrackingRequest,
            shipping_dto::AssignShipperRequest,
            shipping_dto::UpdateTrackingStatusRequest,
            shipping_dto::TrackingWithEvents,
            shipping_dto::TrackingList,
            settings_dto::UpdateSettingsRequest,
            dispute_dto::CreateDisputeRequest,
            dispute_dto::UpdateDisputeRequest,
            dispute_dto::DisputeList,
            ApiResponse<Product>,
            ApiResponse<product_dto::ProductList>,
            ApiResponse<order_dto::OrderWithItems>,
            ApiResponse<order_dto::OrderList>,
            ApiResponse<admin::LowStockList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and profile"),
        (name = "Users", description = "User management"),
        (name = "Products", description = "Furniture catalogue"),
        (name = "Cart", description = "Shopping cart"),
        (name = "Orders", description = "Customer orders"),
        (name = "Admin", description = "Back-office orders, inventory and reports"),
        (name = "Chats", description = "Customer support chat"),
        (name = "Shipping", description = "Parcel tracking"),
        (name = "Settings", description = "Store settings"),
        (name = "Disputes", description = "Order disputes"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_area() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/products/categories",
            "/api/orders/{id}/cancel",
            "/api/admin/stats",
            "/api/chats/{id}/messages",
            "/api/shipping/order/{order_id}",
            "/api/settings",
            "/api/disputes/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let schemes = doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
