use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, Set,
    sea_query::OnConflict,
};

use crate::{
    audit,
    dto::settings::UpdateSettingsRequest,
    entity::settings::{ActiveModel as SettingsActive, Column, Entity as SettingsTable, Model as SettingsModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Settings,
    response::{ApiResponse, Meta},
    services::{auth_service::require_text, mapping::settings_from_entity},
    state::AppState,
};

pub const SETTINGS_KEY: &str = "global";

pub const DEFAULT_SHIPPING_FEE: i64 = 30_000;
pub const DEFAULT_FREE_SHIPPING_THRESHOLD: i64 = 5_000_000;

pub fn default_settings() -> SettingsActive {
    SettingsActive {
        id: Set(SETTINGS_KEY.to_string()),
        store_name: Set("FurniMart".to_string()),
        contact_email: Set("support@furnimart.vn".to_string()),
        contact_phone: Set("1900 0000".to_string()),
        address: Set(String::new()),
        currency: Set("VND".to_string()),
        shipping_fee: Set(DEFAULT_SHIPPING_FEE),
        free_shipping_threshold: Set(DEFAULT_FREE_SHIPPING_THRESHOLD),
        maintenance_mode: Set(false),
        updated_at: Set(Utc::now().into()),
    }
}

/// Shipping is free once the subtotal reaches a positive threshold.
pub fn shipping_fee_for(subtotal: i64, shipping_fee: i64, free_shipping_threshold: i64) -> i64 {
    if free_shipping_threshold > 0 && subtotal >= free_shipping_threshold {
        0
    } else {
        shipping_fee
    }
}

/// Returns the settings row, inserting the defaults first when it does not exist yet.
pub async fn ensure_settings<C: ConnectionTrait>(conn: &C) -> AppResult<SettingsModel> {
    if let Some(found) = SettingsTable::find_by_id(SETTINGS_KEY).one(conn).await? {
        return Ok(found);
    }

    SettingsTable::insert(default_settings())
        .on_conflict(OnConflict::column(Column::Id).do_nothing().to_owned())
        .exec_without_returning(conn)
        .await?;
    tracing::info!("default settings created");

    SettingsTable::find_by_id(SETTINGS_KEY)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("Settings"))
}

pub async fn get_settings(state: &AppState) -> AppResult<ApiResponse<Settings>> {
    let settings = ensure_settings(&state.orm).await?;
    Ok(ApiResponse::success(
        "Settings",
        settings_from_entity(settings),
        Some(Meta::empty()),
    ))
}

pub async fn update_settings(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateSettingsRequest,
) -> AppResult<ApiResponse<Settings>> {
    ensure_admin(user)?;
    let existing = ensure_settings(&state.orm).await?;

    let mut active: SettingsActive = existing.into();
    if let Some(store_name) = payload.store_name {
        active.store_name = Set(require_text("store_name", &store_name)?);
    }
    if let Some(contact_email) = payload.contact_email {
        active.contact_email = Set(contact_email.trim().to_string());
    }
    if let Some(contact_phone) = payload.contact_phone {
        active.contact_phone = Set(contact_phone.trim().to_string());
    }
    if let Some(address) = payload.address {
        active.address = Set(address.trim().to_string());
    }
    if let Some(currency) = payload.currency {
        active.currency = Set(require_text("currency", &currency)?.to_uppercase());
    }
    if let Some(shipping_fee) = payload.shipping_fee {
        if shipping_fee < 0 {
            return Err(AppError::BadRequest("shipping_fee must not be negative".into()));
        }
        active.shipping_fee = Set(shipping_fee);
    }
    if let Some(threshold) = payload.free_shipping_threshold {
        if threshold < 0 {
            return Err(AppError::BadRequest(
                "free_shipping_threshold must not be negative".into(),
            ));
        }
        active.free_shipping_threshold = Set(threshold);
    }
    if let Some(maintenance_mode) = payload.maintenance_mode {
        active.maintenance_mode = Set(maintenance_mode);
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "settings_update",
        "settings",
        serde_json::json!({ "shipping_fee": updated.shipping_fee, "maintenance_mode": updated.maintenance_mode }),
    )
    .await;

    Ok(ApiResponse::success(
        "Settings updated",
        settings_from_entity(updated),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipping_is_waived_at_threshold() {
        assert_eq!(shipping_fee_for(4_999_999, 30_000, 5_000_000), 30_000);
        assert_eq!(shipping_fee_for(5_000_000, 30_000, 5_000_000), 0);
        assert_eq!(shipping_fee_for(9_000_000, 30_000, 5_000_000), 0);
    }

    #[test]
    fn zero_threshold_never_waives() {
        assert_eq!(shipping_fee_for(10_000_000, 25_000, 0), 25_000);
    }

    #[test]
    fn defaults_are_keyed_globally() {
        let defaults = default_settings();
        assert_eq!(defaults.id.as_ref(), SETTINGS_KEY);
        assert_eq!(defaults.shipping_fee.as_ref(), &DEFAULT_SHIPPING_FEE);
        assert_eq!(defaults.currency.as_ref(), "VND");
        assert_eq!(defaults.maintenance_mode.as_ref(), &false);
    }
}
