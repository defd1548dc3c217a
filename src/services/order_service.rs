use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait,
    DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{
        CheckoutRequest, CreateOrderRequest, OrderLineRequest, OrderList, OrderListQuery,
        OrderWithItems,
    },
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{OrderItem, OrderStatus, PaymentMethod, PaymentStatus},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, SortOrder},
    services::{
        auth_service::require_text,
        mapping::{order_from_entity, order_item_from_entity, product_from_entity},
        settings_service::{ensure_settings, shipping_fee_for},
    },
    state::AppState,
};

/// Delivery details shared by direct orders and cart checkout.
struct OrderDetails {
    shipping_address: String,
    phone: String,
    payment_method: PaymentMethod,
    notes: Option<String>,
}

impl OrderDetails {
    fn new(
        shipping_address: &str,
        phone: &str,
        payment_method: PaymentMethod,
        notes: Option<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            shipping_address: require_text("shipping_address", shipping_address)?,
            phone: require_text("phone", phone)?,
            payment_method,
            notes: notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        })
    }
}

/// Validates quantities and merges repeated products into one line each.
pub fn merge_lines(items: &[OrderLineRequest]) -> AppResult<Vec<(Uuid, i32)>> {
    if items.is_empty() {
        return Err(AppError::BadRequest("Order has no items".into()));
    }

    let mut merged: BTreeMap<Uuid, i32> = BTreeMap::new();
    for item in items {
        if item.quantity <= 0 {
            return Err(AppError::BadRequest("quantity must be greater than 0".into()));
        }
        let entry = merged.entry(item.product_id).or_insert(0);
        *entry = entry
            .checked_add(item.quantity)
            .ok_or_else(|| AppError::BadRequest("quantity is too large".into()))?;
    }
    Ok(merged.into_iter().collect())
}

pub fn build_order_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = order_id.simple().to_string();
    let short = &suffix[..8];
    format!("FM-{}-{}", date, short)
}

pub fn order_total(subtotal: i64, shipping_fee: i64) -> AppResult<i64> {
    subtotal
        .checked_add(shipping_fee)
        .ok_or_else(AppError::amount_too_large)
}

/// Decrements stock, writes the order and its lines. Caller owns the transaction.
async fn place_order(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    lines: &[(Uuid, i32)],
    details: OrderDetails,
) -> AppResult<OrderWithItems> {
    let settings = ensure_settings(txn).await?;
    let order_id = Uuid::new_v4();

    let mut subtotal: i64 = 0;
    let mut priced: Vec<(Uuid, String, i32, i64)> = Vec::with_capacity(lines.len());
    for &(product_id, quantity) in lines {
        let product = Products::find_by_id(product_id)
            .one(txn)
            .await?
            .filter(|p| p.is_active)
            .ok_or(AppError::NotFound("Product"))?;

        // conditional decrement: no row updated means not enough stock
        let updated = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(quantity))
            .col_expr(ProdCol::UpdatedAt, Expr::current_timestamp().into())
            .filter(ProdCol::Id.eq(product_id))
            .filter(ProdCol::Stock.gte(quantity))
            .exec(txn)
            .await?;
        if updated.rows_affected == 0 {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for {}",
                product.name
            )));
        }

        let product = product_from_entity(product);
        let unit_price = product.effective_price();
        subtotal = product
            .line_total(quantity)
            .and_then(|line| subtotal.checked_add(line))
            .ok_or_else(AppError::amount_too_large)?;
        priced.push((product_id, product.name, quantity, unit_price));
    }

    let shipping_fee = shipping_fee_for(
        subtotal,
        settings.shipping_fee,
        settings.free_shipping_threshold,
    );
    let total_amount = order_total(subtotal, shipping_fee)?;

    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user_id),
        order_number: Set(build_order_number(order_id)),
        subtotal: Set(subtotal),
        shipping_fee: Set(shipping_fee),
        total_amount: Set(total_amount),
        status: Set(OrderStatus::Pending.as_str().into()),
        payment_status: Set(PaymentStatus::Unpaid.as_str().into()),
        payment_method: Set(details.payment_method.as_str().into()),
        shipping_address: Set(details.shipping_address),
        phone: Set(details.phone),
        notes: Set(details.notes),
        paid_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(txn)
    .await?;

    let mut order_items: Vec<OrderItem> = Vec::with_capacity(priced.len());
    for (product_id, product_name, quantity, unit_price) in priced {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product_id),
            product_name: Set(product_name),
            quantity: Set(quantity),
            unit_price: Set(unit_price),
            created_at: NotSet,
        }
        .insert(txn)
        .await?;

        order_items.push(order_item_from_entity(item));
    }

    tracing::info!(
        order_id = %order.id,
        user_id = %user_id,
        total = order.total_amount,
        "order placed"
    );

    Ok(OrderWithItems {
        order: order_from_entity(order),
        items: order_items,
    })
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let lines = merge_lines(&payload.items)?;
    let details = OrderDetails::new(
        &payload.shipping_address,
        &payload.phone,
        payload.payment_method,
        payload.notes,
    )?;

    let txn = state.orm.begin().await?;
    let placed = place_order(&txn, user.user_id, &lines, details).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "order_create",
        "orders",
        serde_json::json!({ "order_id": placed.order.id }),
    )
    .await;

    Ok(ApiResponse::created("Order created", placed))
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let details = OrderDetails::new(
        &payload.shipping_address,
        &payload.phone,
        payload.payment_method,
        payload.notes,
    )?;

    let txn = state.orm.begin().await?;

    let cart = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    if cart.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let requested: Vec<OrderLineRequest> = cart
        .iter()
        .map(|line| OrderLineRequest {
            product_id: line.product_id,
            quantity: line.quantity,
        })
        .collect();
    let lines = merge_lines(&requested)?;

    let placed = place_order(&txn, user.user_id, &lines, details).await?;

    // clear cart
    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "checkout",
        "orders",
        serde_json::json!({ "order_id": placed.order.id }),
    )
    .await;

    Ok(ApiResponse::created("Checkout success", placed))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

async fn own_order<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
    id: Uuid,
    lock: bool,
) -> AppResult<OrderModel> {
    let mut finder = Orders::find().filter(
        Condition::all()
            .add(OrderCol::UserId.eq(user.user_id))
            .add(OrderCol::Id.eq(id)),
    );
    if lock {
        finder = finder.lock(LockType::Update);
    }
    finder.one(conn).await?.ok_or(AppError::NotFound("Order"))
}

pub(crate) async fn items_of<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Vec<OrderItem>> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();
    Ok(items)
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = own_order(&state.orm, user, id, false).await?;
    let items = items_of(&state.orm, order.id).await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;
    let order = own_order(&txn, user, id, true).await?;

    if order.status != OrderStatus::Pending.as_str() {
        return Err(AppError::BadRequest(
            "Only pending orders can be cancelled".into(),
        ));
    }

    let items = items_of(&txn, order.id).await?;
    for item in &items {
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(item.quantity))
            .filter(ProdCol::Id.eq(item.product_id))
            .exec(&txn)
            .await?;
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, "order cancelled by customer");
    audit::record(
        &state.pool,
        user.user_id,
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order cancelled",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn pay_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;
    let order = own_order(&txn, user, id, true).await?;

    if order.payment_status == PaymentStatus::Paid.as_str() {
        return Err(AppError::BadRequest("Order already paid".into()));
    }
    if order.status == OrderStatus::Cancelled.as_str() {
        return Err(AppError::BadRequest("Order is cancelled".into()));
    }

    let mut active: OrderActive = order.into();
    active.payment_status = Set(PaymentStatus::Paid.as_str().into());
    active.paid_at = Set(Some(Utc::now().into()));
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    let items = items_of(&txn, order.id).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "order_paid",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment recorded",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: Uuid, quantity: i32) -> OrderLineRequest {
        OrderLineRequest {
            product_id,
            quantity,
        }
    }

    #[test]
    fn duplicate_products_are_merged() {
        let sofa = Uuid::new_v4();
        let lamp = Uuid::new_v4();
        let lines = merge_lines(&[line(sofa, 1), line(lamp, 2), line(sofa, 3)]).expect("valid");
        assert_eq!(lines.len(), 2);
        assert!(lines.contains(&(sofa, 4)));
        assert!(lines.contains(&(lamp, 2)));
    }

    #[test]
    fn empty_or_non_positive_lines_are_rejected() {
        assert!(merge_lines(&[]).is_err());
        assert!(merge_lines(&[line(Uuid::new_v4(), 0)]).is_err());
        assert!(merge_lines(&[line(Uuid::new_v4(), -1)]).is_err());
    }

    #[test]
    fn total_adds_shipping_and_rejects_overflow() {
        assert_eq!(order_total(3_600_000, 30_000).expect("total"), 3_630_000);
        let err = order_total(i64::MAX, 30_000).unwrap_err();
        assert_eq!(err.to_string(), "amount too large");
    }

    #[test]
    fn order_number_has_date_and_short_id() {
        let id = Uuid::new_v4();
        let number = build_order_number(id);
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "FM");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2], &id.simple().to_string()[..8]);
    }

    #[test]
    fn details_require_address_and_phone() {
        assert!(OrderDetails::new("  ", "0900", PaymentMethod::Cod, None).is_err());
        assert!(OrderDetails::new("12 Le Loi", "", PaymentMethod::Cod, None).is_err());
        let details =
            OrderDetails::new(" 12 Le Loi ", "0900", PaymentMethod::Card, Some("  ".into()))
                .expect("valid");
        assert_eq!(details.shipping_address, "12 Le Loi");
        assert!(details.notes.is_none());
    }
}
