use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    pub store_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub currency: Option<String>,
    pub shipping_fee: Option<i64>,
    pub free_shipping_threshold: Option<i64>,
    pub maintenance_mode: Option<bool>,
}
