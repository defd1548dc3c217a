use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, Set,
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::cart::{AddToCartRequest, CartItemDto, CartView, UpdateCartItemRequest},
    entity::{
        cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems, Model as CartModel},
        products::{Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartItem, Product},
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(FromRow)]
struct CartWithProductRow {
    cart_id: Uuid,
    quantity: i32,
    product_id: Uuid,
    name: String,
    description: Option<String>,
    price: i64,
    discount_price: Option<i64>,
    category: String,
    material: Option<String>,
    color: Option<String>,
    dimensions: Option<String>,
    images: serde_json::Value,
    stock: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartWithProductRow> for CartItemDto {
    type Error = AppError;

    fn try_from(row: CartWithProductRow) -> AppResult<Self> {
        let product = Product {
            id: row.product_id,
            name: row.name,
            description: row.description,
            price: row.price,
            discount_price: row.discount_price,
            category: row.category,
            material: row.material,
            color: row.color,
            dimensions: row.dimensions,
            images: serde_json::from_value(row.images).unwrap_or_default(),
            stock: row.stock,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        };
        let line_total = product
            .line_total(row.quantity)
            .ok_or_else(AppError::amount_too_large)?;
        Ok(CartItemDto {
            id: row.cart_id,
            product,
            quantity: row.quantity,
            line_total,
        })
    }
}

/// Sums line totals and quantities.
pub fn summarize(items: Vec<CartItemDto>) -> AppResult<CartView> {
    let subtotal = items
        .iter()
        .try_fold(0i64, |acc, item| acc.checked_add(item.line_total))
        .ok_or_else(AppError::amount_too_large)?;
    let total_items = items.iter().map(|item| i64::from(item.quantity)).sum();
    Ok(CartView {
        items,
        total_items,
        subtotal,
    })
}

pub(crate) async fn load_cart(pool: &DbPool, user_id: Uuid) -> AppResult<Vec<CartItemDto>> {
    let rows = sqlx::query_as::<_, CartWithProductRow>(
        r#"
        SELECT ci.id AS cart_id, ci.quantity,
               p.id AS product_id, p.name, p.description, p.price, p.discount_price,
               p.category, p.material, p.color, p.dimensions, p.images, p.stock,
               p.is_active, p.created_at, p.updated_at
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(CartItemDto::try_from).collect()
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let items = load_cart(&state.pool, user.user_id).await?;
    Ok(ApiResponse::success("OK", summarize(items)?, Some(Meta::empty())))
}

async fn active_product(state: &AppState, product_id: Uuid) -> AppResult<ProductModel> {
    Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .filter(|p| p.is_active)
        .ok_or(AppError::NotFound("Product"))
}

async fn find_line(state: &AppState, user_id: Uuid, product_id: Uuid) -> AppResult<Option<CartModel>> {
    let line = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .filter(CartCol::ProductId.eq(product_id))
        .one(&state.orm)
        .await?;
    Ok(line)
}

fn check_stock(product: &ProductModel, quantity: i32) -> AppResult<()> {
    if quantity > product.stock {
        return Err(AppError::BadRequest(format!(
            "Only {} item(s) of {} left in stock",
            product.stock, product.name
        )));
    }
    Ok(())
}

fn cart_item_from_entity(model: CartModel) -> CartItem {
    CartItem {
        id: model.id,
        product_id: model.product_id,
        user_id: model.user_id,
        quantity: model.quantity,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product = active_product(state, payload.product_id).await?;

    let cart_item = match find_line(state, user.user_id, payload.product_id).await? {
        Some(item) => {
            let quantity = item.quantity.saturating_add(payload.quantity);
            check_stock(&product, quantity)?;
            let mut active: CartActive = item.into();
            active.quantity = Set(quantity);
            active.update(&state.orm).await?
        }
        None => {
            check_stock(&product, payload.quantity)?;
            CartActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                product_id: Set(payload.product_id),
                quantity: Set(payload.quantity),
                created_at: NotSet,
            }
            .insert(&state.orm)
            .await
            .map_err(|err| AppError::conflict_on_constraint(err, "Product is already in the cart"))?
        }
    };

    audit::record(
        &state.pool,
        user.user_id,
        "cart_update",
        "cart_items",
        serde_json::json!({ "product_id": payload.product_id, "quantity": cart_item.quantity }),
    )
    .await;

    Ok(ApiResponse::success("OK", cart_item_from_entity(cart_item), None))
}

pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let item = find_line(state, user.user_id, product_id)
        .await?
        .ok_or(AppError::NotFound("Cart item"))?;
    let product = active_product(state, product_id).await?;
    check_stock(&product, payload.quantity)?;

    let mut active: CartActive = item.into();
    active.quantity = Set(payload.quantity);
    let updated = active.update(&state.orm).await?;

    Ok(ApiResponse::success("OK", cart_item_from_entity(updated), None))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = CartItems::delete_many()
        .filter(CartCol::ProductId.eq(product_id))
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Cart item"));
    }

    audit::record(
        &state.pool,
        user.user_id,
        "cart_remove",
        "cart_items",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Cart cleared",
        serde_json::json!({ "removed": result.rows_affected }),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(price: i64, discount: Option<i64>, quantity: i32) -> CartWithProductRow {
        let now = Utc::now();
        CartWithProductRow {
            cart_id: Uuid::new_v4(),
            quantity,
            product_id: Uuid::new_v4(),
            name: "Armchair".into(),
            description: None,
            price,
            discount_price: discount,
            category: "chairs".into(),
            material: None,
            color: None,
            dimensions: None,
            images: serde_json::json!(["https://cdn.example.com/a.jpg"]),
            stock: 10,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(price: i64, discount: Option<i64>, quantity: i32) -> CartItemDto {
        CartItemDto::try_from(row(price, discount, quantity)).expect("line")
    }

    #[test]
    fn line_total_uses_discounted_price() {
        let item = line(2_000_000, Some(1_500_000), 2);
        assert_eq!(item.line_total, 3_000_000);
        assert_eq!(item.product.images, vec!["https://cdn.example.com/a.jpg"]);
    }

    #[test]
    fn summary_adds_up_lines() {
        let view = summarize(vec![line(100, None, 2), line(50, Some(40), 3)]).expect("summary");
        assert_eq!(view.subtotal, 320);
        assert_eq!(view.total_items, 5);
        assert_eq!(view.items.len(), 2);
    }

    #[test]
    fn empty_cart_summary_is_zero() {
        let view = summarize(Vec::new()).expect("summary");
        assert_eq!(view.subtotal, 0);
        assert_eq!(view.total_items, 0);
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        let err = CartItemDto::try_from(row(i64::MAX / 2 + 1, None, 2)).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "amount too large");

        let err = summarize(vec![line(i64::MAX / 2, None, 1), line(i64::MAX / 2, None, 1), line(2, None, 1)])
            .unwrap_err();
        assert_eq!(err.to_string(), "amount too large");
    }
}
