use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::{Dispute, DisputeStatus};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDisputeRequest {
    pub order_id: Uuid,
    pub reason: String,
    pub description: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDisputeRequest {
    pub status: Option<DisputeStatus>,
    pub resolution: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DisputeListQuery {
    pub status: Option<DisputeStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct DisputeList {
    #[schema(value_type = Vec<Dispute>)]
    pub items: Vec<Dispute>,
}
