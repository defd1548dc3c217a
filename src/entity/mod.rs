pub mod audit_logs;
pub mod cart_items;
pub mod chat_messages;
pub mod chats;
pub mod disputes;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod settings;
pub mod shipping_trackings;
pub mod tracking_events;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use chat_messages::Entity as ChatMessages;
pub use chats::Entity as Chats;
pub use disputes::Entity as Disputes;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use settings::Entity as SettingsTable;
pub use shipping_trackings::Entity as ShippingTrackings;
pub use tracking_events::Entity as TrackingEvents;
pub use users::Entity as Users;
