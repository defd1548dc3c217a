use sea_orm::entity::prelude::*;

/// Single-row store configuration keyed by `id = "global"`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub store_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub address: String,
    pub currency: String,
    pub shipping_fee: i64,
    pub free_shipping_threshold: i64,
    pub maintenance_mode: bool,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
