use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Declares a text-backed enum: serde/OpenAPI in snake_case, `as_str`, `Display` and `FromStr`.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("invalid {}: {other}", stringify!($name))),
                }
            }
        }
    };
}

text_enum!(Role {
    Customer => "customer",
    Employee => "employee",
    Manager => "manager",
    Shipper => "shipper",
    Admin => "admin",
});

impl Role {
    /// Back-office roles that process orders and products.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Employee | Role::Manager | Role::Admin)
    }

    /// Manager or admin.
    pub fn is_management(&self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }
}

text_enum!(OrderStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Processing => "processing",
    Shipping => "shipping",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

text_enum!(PaymentStatus {
    Unpaid => "unpaid",
    Paid => "paid",
    Refunded => "refunded",
});

text_enum!(PaymentMethod {
    Cod => "cod",
    BankTransfer => "bank_transfer",
    Card => "card",
});

text_enum!(ShippingStatus {
    Pending => "pending",
    PickedUp => "picked_up",
    InTransit => "in_transit",
    OutForDelivery => "out_for_delivery",
    Delivered => "delivered",
    Failed => "failed",
    Returned => "returned",
});

impl ShippingStatus {
    /// Order status mirrored when a tracking moves to this status.
    pub fn order_status(&self) -> Option<OrderStatus> {
        match self {
            ShippingStatus::PickedUp
            | ShippingStatus::InTransit
            | ShippingStatus::OutForDelivery => Some(OrderStatus::Shipping),
            ShippingStatus::Delivered => Some(OrderStatus::Delivered),
            ShippingStatus::Pending | ShippingStatus::Failed | ShippingStatus::Returned => None,
        }
    }
}

text_enum!(DisputeStatus {
    Open => "open",
    InReview => "in_review",
    Resolved => "resolved",
    Rejected => "rejected",
});

impl DisputeStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, DisputeStatus::Resolved | DisputeStatus::Rejected)
    }
}

text_enum!(SenderRole {
    Customer => "customer",
    Staff => "staff",
});

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub discount_price: Option<i64>,
    pub category: String,
    pub material: Option<String>,
    pub color: Option<String>,
    pub dimensions: Option<String>,
    pub images: Vec<String>,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn effective_price(&self) -> i64 {
        self.discount_price.unwrap_or(self.price)
    }

    /// Effective price times `quantity`; `None` when it does not fit in an i64.
    pub fn line_total(&self, quantity: i32) -> Option<i64> {
        self.effective_price().checked_mul(i64::from(quantity))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_number: String,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub total_amount: i64,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub shipping_address: String,
    pub phone: String,
    pub notes: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Chat {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub staff_id: Option<Uuid>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub is_read_by_customer: bool,
    pub is_read_by_staff: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub sender_role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShippingTracking {
    pub id: Uuid,
    pub order_id: Uuid,
    pub shipper_id: Option<Uuid>,
    pub tracking_number: String,
    pub status: String,
    pub current_location: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrackingEvent {
    pub id: Uuid,
    pub tracking_id: Uuid,
    pub status: String,
    pub location: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Settings {
    pub store_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub address: String,
    pub currency: String,
    pub shipping_fee: i64,
    pub free_shipping_threshold: i64,
    pub maintenance_mode: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Dispute {
    pub id: Uuid,
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub reason: String,
    pub description: String,
    pub status: String,
    pub resolution: Option<String>,
    pub handled_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_and_classify() {
        assert_eq!("shipper".parse::<Role>(), Ok(Role::Shipper));
        assert!("superuser".parse::<Role>().is_err());
        assert!(Role::Employee.is_staff());
        assert!(!Role::Shipper.is_staff());
        assert!(!Role::Customer.is_staff());
        assert!(Role::Manager.is_management());
        assert!(!Role::Employee.is_management());
    }

    #[test]
    fn enums_round_trip_through_text() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipping,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert_eq!(
            serde_json::to_value(PaymentMethod::BankTransfer).expect("serialize"),
            "bank_transfer"
        );
        assert_eq!(ShippingStatus::OutForDelivery.to_string(), "out_for_delivery");
    }

    #[test]
    fn shipping_status_mirrors_into_order_status() {
        assert_eq!(
            ShippingStatus::InTransit.order_status(),
            Some(OrderStatus::Shipping)
        );
        assert_eq!(
            ShippingStatus::Delivered.order_status(),
            Some(OrderStatus::Delivered)
        );
        assert_eq!(ShippingStatus::Failed.order_status(), None);
    }

    #[test]
    fn effective_price_prefers_discount() {
        let now = Utc::now();
        let mut product = Product {
            id: Uuid::new_v4(),
            name: "Oak Table".into(),
            description: None,
            price: 4_500_000,
            discount_price: Some(3_990_000),
            category: "tables".into(),
            material: Some("oak".into()),
            color: None,
            dimensions: None,
            images: vec![],
            stock: 3,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(product.effective_price(), 3_990_000);
        assert_eq!(product.line_total(2), Some(7_980_000));
        product.discount_price = None;
        assert_eq!(product.effective_price(), 4_500_000);

        product.price = i64::MAX / 2 + 1;
        assert_eq!(product.line_total(2), None);
    }
}
