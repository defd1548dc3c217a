use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::{ShippingStatus, ShippingTracking, TrackingEvent};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTrackingRequest {
    pub order_id: Uuid,
    pub shipper_id: Option<Uuid>,
    pub estimated_delivery: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignShipperRequest {
    pub shipper_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTrackingStatusRequest {
    pub status: ShippingStatus,
    pub location: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrackingListQuery {
    pub status: Option<ShippingStatus>,
    pub shipper_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackingWithEvents {
    pub tracking: ShippingTracking,
    pub events: Vec<TrackingEvent>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct TrackingList {
    #[schema(value_type = Vec<ShippingTracking>)]
    pub items: Vec<ShippingTracking>,
}
