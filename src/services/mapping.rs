use chrono::Utc;

use crate::{
    entity::{
        audit_logs, chat_messages, chats, disputes, order_items, orders, products, settings,
        shipping_trackings, tracking_events, users,
    },
    models::{
        AuditLog, Chat, ChatMessage, Dispute, Order, OrderItem, Product, Settings,
        ShippingTracking, TrackingEvent, User,
    },
};

pub fn user_from_entity(model: users::Model) -> User {
    User {
        id: model.id,
        name: model.name,
        email: model.email,
        phone: model.phone,
        address: model.address,
        role: model.role,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn product_from_entity(model: products::Model) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        discount_price: model.discount_price,
        category: model.category,
        material: model.material,
        color: model.color,
        dimensions: model.dimensions,
        images: serde_json::from_value(model.images).unwrap_or_default(),
        stock: model.stock,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn order_from_entity(model: orders::Model) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        order_number: model.order_number,
        subtotal: model.subtotal,
        shipping_fee: model.shipping_fee,
        total_amount: model.total_amount,
        status: model.status,
        payment_status: model.payment_status,
        payment_method: model.payment_method,
        shipping_address: model.shipping_address,
        phone: model.phone,
        notes: model.notes,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn order_item_from_entity(model: order_items::Model) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        product_name: model.product_name,
        quantity: model.quantity,
        unit_price: model.unit_price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn chat_from_entity(model: chats::Model) -> Chat {
    Chat {
        id: model.id,
        customer_id: model.customer_id,
        staff_id: model.staff_id,
        last_message: model.last_message,
        last_message_at: model.last_message_at.map(|dt| dt.with_timezone(&Utc)),
        is_read_by_customer: model.is_read_by_customer,
        is_read_by_staff: model.is_read_by_staff,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn chat_message_from_entity(model: chat_messages::Model) -> ChatMessage {
    ChatMessage {
        id: model.id,
        chat_id: model.chat_id,
        sender_id: model.sender_id,
        sender_role: model.sender_role,
        content: model.content,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn tracking_from_entity(model: shipping_trackings::Model) -> ShippingTracking {
    ShippingTracking {
        id: model.id,
        order_id: model.order_id,
        shipper_id: model.shipper_id,
        tracking_number: model.tracking_number,
        status: model.status,
        current_location: model.current_location,
        estimated_delivery: model.estimated_delivery.map(|dt| dt.with_timezone(&Utc)),
        delivered_at: model.delivered_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn tracking_event_from_entity(model: tracking_events::Model) -> TrackingEvent {
    TrackingEvent {
        id: model.id,
        tracking_id: model.tracking_id,
        status: model.status,
        location: model.location,
        note: model.note,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn settings_from_entity(model: settings::Model) -> Settings {
    Settings {
        store_name: model.store_name,
        contact_email: model.contact_email,
        contact_phone: model.contact_phone,
        address: model.address,
        currency: model.currency,
        shipping_fee: model.shipping_fee,
        free_shipping_threshold: model.free_shipping_threshold,
        maintenance_mode: model.maintenance_mode,
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn dispute_from_entity(model: disputes::Model) -> Dispute {
    Dispute {
        id: model.id,
        order_id: model.order_id,
        customer_id: model.customer_id,
        reason: model.reason,
        description: model.description,
        status: model.status,
        resolution: model.resolution,
        handled_by: model.handled_by,
        resolved_at: model.resolved_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn audit_log_from_entity(model: audit_logs::Model) -> AuditLog {
    AuditLog {
        id: model.id,
        user_id: model.user_id,
        action: model.action,
        resource: model.resource,
        metadata: model.metadata,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
