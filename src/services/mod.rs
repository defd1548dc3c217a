pub mod admin_service;
pub mod auth_service;
pub mod cart_service;
pub mod chat_service;
pub mod dispute_service;
pub mod mapping;
pub mod order_service;
pub mod product_service;
pub mod settings_service;
pub mod shipping_service;
pub mod user_service;
