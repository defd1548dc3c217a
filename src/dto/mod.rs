pub mod admin;
pub mod auth;
pub mod cart;
pub mod chats;
pub mod disputes;
pub mod orders;
pub mod products;
pub mod settings;
pub mod shipping;
pub mod users;
