use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::shipping::{
        AssignShipperRequest, CreateTrackingRequest, TrackingList, TrackingListQuery,
        TrackingWithEvents, UpdateTrackingStatusRequest,
    },
    entity::{
        orders::{ActiveModel as OrderActive, Entity as Orders, Model as OrderModel},
        shipping_trackings::{
            ActiveModel as TrackingActive, Column as TrackingCol, Entity as ShippingTrackings,
            Model as TrackingModel,
        },
        tracking_events::{ActiveModel as EventActive, Column as EventCol, Entity as TrackingEvents},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_role, ensure_staff},
    models::{OrderStatus, PaymentMethod, PaymentStatus, Role, ShippingStatus, TrackingEvent},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::mapping::{tracking_event_from_entity, tracking_from_entity},
    state::AppState,
};

const TRACKING_EXISTS: &str = "Tracking already exists for this order";

pub fn build_tracking_number(id: Uuid) -> String {
    let hex = id.simple().to_string().to_uppercase();
    format!("TRK-{}", &hex[..12])
}

/// Staff, the assigned shipper and the ordering customer may follow a parcel.
pub fn can_view(tracking: &TrackingModel, order_owner: Uuid, user: &AuthUser) -> bool {
    user.is_staff() || tracking.shipper_id == Some(user.user_id) || order_owner == user.user_id
}

pub fn can_update(tracking: &TrackingModel, user: &AuthUser) -> bool {
    user.is_staff() || (user.role == Role::Shipper && tracking.shipper_id == Some(user.user_id))
}

/// Order changes implied by a tracking status, as `(status, mark_paid)`.
pub fn order_changes(status: ShippingStatus, order: &OrderModel) -> Option<(OrderStatus, bool)> {
    let order_status = status.order_status()?;
    let mark_paid = order_status == OrderStatus::Delivered
        && order.payment_method == PaymentMethod::Cod.as_str()
        && order.payment_status != PaymentStatus::Paid.as_str();
    Some((order_status, mark_paid))
}

async fn validate_shipper<C: ConnectionTrait>(conn: &C, shipper_id: Uuid) -> AppResult<()> {
    let shipper = Users::find_by_id(shipper_id).one(conn).await?;
    match shipper {
        Some(u) if u.is_active && u.role == Role::Shipper.as_str() => Ok(()),
        _ => Err(AppError::BadRequest(
            "shipper_id must reference an active shipper".into(),
        )),
    }
}

async fn add_event<C: ConnectionTrait>(
    conn: &C,
    tracking_id: Uuid,
    status: ShippingStatus,
    location: Option<String>,
    note: Option<String>,
) -> AppResult<()> {
    EventActive {
        id: Set(Uuid::new_v4()),
        tracking_id: Set(tracking_id),
        status: Set(status.as_str().into()),
        location: Set(location),
        note: Set(note),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(())
}

async fn events_of<C: ConnectionTrait>(conn: &C, tracking_id: Uuid) -> AppResult<Vec<TrackingEvent>> {
    let events = TrackingEvents::find()
        .filter(EventCol::TrackingId.eq(tracking_id))
        .order_by_asc(EventCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(tracking_event_from_entity)
        .collect();
    Ok(events)
}

async fn with_events<C: ConnectionTrait>(conn: &C, tracking: TrackingModel) -> AppResult<TrackingWithEvents> {
    let events = events_of(conn, tracking.id).await?;
    Ok(TrackingWithEvents {
        tracking: tracking_from_entity(tracking),
        events,
    })
}

fn cleaned(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn create_tracking(
    state: &AppState,
    user: &AuthUser,
    payload: CreateTrackingRequest,
) -> AppResult<ApiResponse<TrackingWithEvents>> {
    ensure_staff(user)?;

    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id(payload.order_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    if order.status == OrderStatus::Cancelled.as_str() {
        return Err(AppError::BadRequest("Order is cancelled".into()));
    }

    let exists = ShippingTrackings::find()
        .filter(TrackingCol::OrderId.eq(order.id))
        .count(&txn)
        .await?;
    if exists > 0 {
        return Err(AppError::Conflict(TRACKING_EXISTS.into()));
    }

    if let Some(shipper_id) = payload.shipper_id {
        validate_shipper(&txn, shipper_id).await?;
    }

    let id = Uuid::new_v4();
    let tracking = TrackingActive {
        id: Set(id),
        order_id: Set(order.id),
        shipper_id: Set(payload.shipper_id),
        tracking_number: Set(build_tracking_number(id)),
        status: Set(ShippingStatus::Pending.as_str().into()),
        current_location: Set(None),
        estimated_delivery: Set(payload.estimated_delivery.map(Into::into)),
        delivered_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|err| AppError::conflict_on_constraint(err, TRACKING_EXISTS))?;

    add_event(
        &txn,
        tracking.id,
        ShippingStatus::Pending,
        None,
        Some("Tracking created".into()),
    )
    .await?;

    let data = with_events(&txn, tracking).await?;
    txn.commit().await?;

    tracing::info!(
        tracking_number = %data.tracking.tracking_number,
        order_id = %data.tracking.order_id,
        "tracking created"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "tracking_create",
        "shipping_trackings",
        serde_json::json!({ "tracking_id": data.tracking.id, "order_id": data.tracking.order_id }),
    )
    .await;

    Ok(ApiResponse::created("Tracking created", data))
}

async fn paginate(
    state: &AppState,
    condition: Condition,
    pagination: Pagination,
) -> AppResult<ApiResponse<TrackingList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = ShippingTrackings::find()
        .filter(condition)
        .order_by_desc(TrackingCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(tracking_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Trackings",
        TrackingList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn list_trackings(
    state: &AppState,
    user: &AuthUser,
    query: TrackingListQuery,
    pagination: Pagination,
) -> AppResult<ApiResponse<TrackingList>> {
    ensure_staff(user)?;
    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(TrackingCol::Status.eq(status.as_str()));
    }
    if let Some(shipper_id) = query.shipper_id {
        condition = condition.add(TrackingCol::ShipperId.eq(shipper_id));
    }
    paginate(state, condition, pagination).await
}

pub async fn my_trackings(
    state: &AppState,
    user: &AuthUser,
    query: TrackingListQuery,
    pagination: Pagination,
) -> AppResult<ApiResponse<TrackingList>> {
    ensure_role(user, &[Role::Shipper])?;
    let mut condition = Condition::all().add(TrackingCol::ShipperId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(TrackingCol::Status.eq(status.as_str()));
    }
    paginate(state, condition, pagination).await
}

async fn viewable(state: &AppState, user: &AuthUser, tracking: TrackingModel) -> AppResult<ApiResponse<TrackingWithEvents>> {
    let order = Orders::find_by_id(tracking.order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    if !can_view(&tracking, order.user_id, user) {
        return Err(AppError::Forbidden);
    }

    let data = with_events(&state.orm, tracking).await?;
    Ok(ApiResponse::success("Tracking", data, Some(Meta::empty())))
}

pub async fn get_tracking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<TrackingWithEvents>> {
    let tracking = ShippingTrackings::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Tracking"))?;
    viewable(state, user, tracking).await
}

pub async fn get_by_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<TrackingWithEvents>> {
    let tracking = ShippingTrackings::find()
        .filter(TrackingCol::OrderId.eq(order_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Tracking"))?;
    viewable(state, user, tracking).await
}

pub async fn assign_shipper(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AssignShipperRequest,
) -> AppResult<ApiResponse<TrackingWithEvents>> {
    ensure_staff(user)?;
    validate_shipper(&state.orm, payload.shipper_id).await?;

    let tracking = ShippingTrackings::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Tracking"))?;

    let mut active: TrackingActive = tracking.into();
    active.shipper_id = Set(Some(payload.shipper_id));
    active.updated_at = Set(Utc::now().into());
    let tracking = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "tracking_assign",
        "shipping_trackings",
        serde_json::json!({ "tracking_id": tracking.id, "shipper_id": payload.shipper_id }),
    )
    .await;

    let data = with_events(&state.orm, tracking).await?;
    Ok(ApiResponse::success("Shipper assigned", data, Some(Meta::empty())))
}

pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateTrackingStatusRequest,
) -> AppResult<ApiResponse<TrackingWithEvents>> {
    let location = cleaned(payload.location);
    let note = cleaned(payload.note);

    let txn = state.orm.begin().await?;
    let tracking = ShippingTrackings::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Tracking"))?;
    if !can_update(&tracking, user) {
        return Err(AppError::Forbidden);
    }

    let order = Orders::find_by_id(tracking.order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    if order.status == OrderStatus::Cancelled.as_str() {
        return Err(AppError::BadRequest("Order is cancelled".into()));
    }

    let now = Utc::now();
    let mut active: TrackingActive = tracking.into();
    active.status = Set(payload.status.as_str().into());
    if let Some(location) = &location {
        active.current_location = Set(Some(location.clone()));
    }
    if payload.status == ShippingStatus::Delivered {
        active.delivered_at = Set(Some(now.into()));
    }
    active.updated_at = Set(now.into());
    let tracking = active.update(&txn).await?;

    add_event(&txn, tracking.id, payload.status, location, note).await?;

    if let Some((order_status, mark_paid)) = order_changes(payload.status, &order) {
        let order_id = order.id;
        let mut order: OrderActive = order.into();
        order.status = Set(order_status.as_str().into());
        if mark_paid {
            order.payment_status = Set(PaymentStatus::Paid.as_str().into());
            order.paid_at = Set(Some(now.into()));
        }
        order.updated_at = Set(now.into());
        order.update(&txn).await?;
        tracing::info!(order_id = %order_id, status = %order_status, mark_paid, "order synced from tracking");
    }

    let data = with_events(&txn, tracking).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "tracking_status_update",
        "shipping_trackings",
        serde_json::json!({ "tracking_id": id, "status": payload.status }),
    )
    .await;

    Ok(ApiResponse::success("Tracking updated", data, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(method: PaymentMethod, payment: PaymentStatus) -> OrderModel {
        let now = Utc::now().into();
        OrderModel {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            order_number: "FM-20260101-abcdef12".into(),
            subtotal: 1_000_000,
            shipping_fee: 30_000,
            total_amount: 1_030_000,
            status: OrderStatus::Processing.as_str().into(),
            payment_status: payment.as_str().into(),
            payment_method: method.as_str().into(),
            shipping_address: "1 Hang Bai".into(),
            phone: "0900000000".into(),
            notes: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn tracking(shipper_id: Option<Uuid>) -> TrackingModel {
        let now = Utc::now().into();
        TrackingModel {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            shipper_id,
            tracking_number: "TRK-000000000000".into(),
            status: ShippingStatus::Pending.as_str().into(),
            current_location: None,
            estimated_delivery: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn tracking_number_is_twelve_upper_hex() {
        let number = build_tracking_number(Uuid::new_v4());
        let suffix = number.strip_prefix("TRK-").expect("prefix");
        assert_eq!(suffix.len(), 12);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn delivery_pays_cash_on_delivery_orders() {
        let cod = order(PaymentMethod::Cod, PaymentStatus::Unpaid);
        assert_eq!(
            order_changes(ShippingStatus::Delivered, &cod),
            Some((OrderStatus::Delivered, true))
        );

        let card = order(PaymentMethod::Card, PaymentStatus::Paid);
        assert_eq!(
            order_changes(ShippingStatus::Delivered, &card),
            Some((OrderStatus::Delivered, false))
        );
    }

    #[test]
    fn transit_statuses_move_order_to_shipping() {
        let cod = order(PaymentMethod::Cod, PaymentStatus::Unpaid);
        assert_eq!(
            order_changes(ShippingStatus::PickedUp, &cod),
            Some((OrderStatus::Shipping, false))
        );
        assert_eq!(order_changes(ShippingStatus::Failed, &cod), None);
    }

    #[test]
    fn only_assigned_shipper_or_staff_may_update() {
        let shipper = caller(Role::Shipper);
        let assigned = tracking(Some(shipper.user_id));
        assert!(can_update(&assigned, &shipper));
        assert!(can_update(&assigned, &caller(Role::Employee)));
        assert!(!can_update(&assigned, &caller(Role::Shipper)));
        assert!(!can_update(&tracking(None), &shipper));
    }

    #[test]
    fn order_owner_can_view_tracking() {
        let customer = caller(Role::Customer);
        let parcel = tracking(None);
        assert!(can_view(&parcel, customer.user_id, &customer));
        assert!(!can_view(&parcel, Uuid::new_v4(), &customer));
        assert!(can_view(&parcel, Uuid::new_v4(), &caller(Role::Manager)));
    }
}
