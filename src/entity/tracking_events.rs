use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tracking_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tracking_id: Uuid,
    pub status: String,
    pub location: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shipping_trackings::Entity",
        from = "Column::TrackingId",
        to = "super::shipping_trackings::Column::Id"
    )]
    ShippingTrackings,
}

impl Related<super::shipping_trackings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShippingTrackings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
