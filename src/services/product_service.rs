use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, Func, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{CategoryList, CreateProductRequest, ProductList, UpdateProductRequest},
    entity::products::{ActiveModel, Column, Entity as Products},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_management, ensure_staff},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{Pagination, ProductQuery, ProductSortBy, SortOrder},
    services::{auth_service::require_text, mapping::product_from_entity},
    state::AppState,
};

/// Builds the catalogue filter from query parameters.
pub fn product_filter(query: &ProductQuery, include_inactive: bool) -> AppResult<Condition> {
    if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
        if min > max {
            return Err(AppError::BadRequest(
                "min_price must not exceed max_price".into(),
            ));
        }
    }

    let mut condition = Condition::all();

    if !include_inactive {
        condition = condition.add(Column::IsActive.eq(true));
    }

    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(category) = query.category.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        condition = condition
            .add(Expr::expr(Func::lower(Expr::col(Column::Category))).eq(category.to_lowercase()));
    }

    if let Some(material) = query.material.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        condition = condition
            .add(Expr::expr(Func::lower(Expr::col(Column::Material))).eq(material.to_lowercase()));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    if query.in_stock == Some(true) {
        condition = condition.add(Column::Stock.gt(0));
    }

    Ok(condition)
}

pub async fn list_products(
    state: &AppState,
    user: Option<&AuthUser>,
    query: ProductQuery,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = pagination.normalize();
    let include_inactive =
        query.include_inactive == Some(true) && user.is_some_and(AuthUser::is_staff);
    let condition = product_filter(&query, include_inactive)?;

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
        ProductSortBy::Stock => Column::Stock,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    let data = ProductList { items };
    Ok(ApiResponse::success("Products", data, Some(meta)))
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items: Vec<String> = Products::find()
        .select_only()
        .column(Column::Category)
        .distinct()
        .filter(Column::IsActive.eq(true))
        .order_by_asc(Column::Category)
        .into_tuple()
        .all(&state.orm)
        .await?;

    Ok(ApiResponse::success("Categories", CategoryList { items }, None))
}

pub async fn get_product(
    state: &AppState,
    user: Option<&AuthUser>,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    let result = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .filter(|p| p.is_active || user.is_some_and(AuthUser::is_staff))
        .map(product_from_entity);
    let result = match result {
        Some(p) => p,
        None => return Err(AppError::NotFound("Product")),
    };
    Ok(ApiResponse::success("Product", result, None))
}

fn validate_pricing(price: i64, discount_price: Option<i64>, stock: i32) -> AppResult<()> {
    if price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if stock < 0 {
        return Err(AppError::BadRequest("stock must not be negative".into()));
    }
    if let Some(discount) = discount_price {
        if discount < 0 || discount > price {
            return Err(AppError::BadRequest(
                "discount_price must be between 0 and price".into(),
            ));
        }
    }
    Ok(())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_staff(user)?;
    let name = require_text("name", &payload.name)?;
    let category = require_text("category", &payload.category)?;
    validate_pricing(payload.price, payload.discount_price, payload.stock)?;

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(trimmed(payload.description)),
        price: Set(payload.price),
        discount_price: Set(payload.discount_price),
        category: Set(category),
        material: Set(trimmed(payload.material)),
        color: Set(trimmed(payload.color)),
        dimensions: Set(trimmed(payload.dimensions)),
        images: Set(serde_json::json!(payload.images)),
        stock: Set(payload.stock),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    tracing::info!(product_id = %product.id, "product created");
    audit::record(
        &state.pool,
        user.user_id,
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::created("Product created", product_from_entity(product)))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_staff(user)?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound("Product")),
    };

    let price = payload.price.unwrap_or(existing.price);
    let discount_price = payload.discount_price.unwrap_or(existing.discount_price);
    let stock = payload.stock.unwrap_or(existing.stock);
    validate_pricing(price, discount_price, stock)?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(require_text("name", &name)?);
    }
    if let Some(category) = payload.category {
        active.category = Set(require_text("category", &category)?);
    }
    if let Some(description) = payload.description {
        active.description = Set(trimmed(Some(description)));
    }
    if let Some(material) = payload.material {
        active.material = Set(trimmed(Some(material)));
    }
    if let Some(color) = payload.color {
        active.color = Set(trimmed(Some(color)));
    }
    if let Some(dimensions) = payload.dimensions {
        active.dimensions = Set(trimmed(Some(dimensions)));
    }
    if let Some(images) = payload.images {
        active.images = Set(serde_json::json!(images));
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.price = Set(price);
    active.discount_price = Set(discount_price);
    active.stock = Set(stock);
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

/// Soft delete: the product stays referenced by orders but leaves the catalogue.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_management(user)?;
    let result = Products::update_many()
        .col_expr(Column::IsActive, Expr::value(false))
        .col_expr(Column::UpdatedAt, Expr::current_timestamp().into())
        .filter(Column::Id.eq(id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Product"));
    }

    audit::record(
        &state.pool,
        user.user_id,
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use sea_orm::{DbBackend, QueryTrait};

    use super::*;

    fn sql_for(query: &ProductQuery, include_inactive: bool) -> String {
        let condition = product_filter(query, include_inactive).expect("filter");
        Products::find()
            .filter(condition)
            .build(DbBackend::Postgres)
            .to_string()
    }

    #[test]
    fn default_filter_only_shows_active_products() {
        let sql = sql_for(&ProductQuery::default(), false);
        assert!(sql.contains("\"is_active\" = TRUE"), "{sql}");
        assert!(!sql.contains("ILIKE"), "{sql}");
    }

    #[test]
    fn staff_listing_can_include_inactive() {
        let sql = sql_for(&ProductQuery::default(), true);
        assert!(!sql.contains("\"is_active\" ="), "{sql}");
    }

    #[test]
    fn filter_combines_search_category_and_price() {
        let query = ProductQuery {
            q: Some("sofa".into()),
            category: Some("Living Room".into()),
            min_price: Some(1_000_000),
            max_price: Some(9_000_000),
            in_stock: Some(true),
            ..Default::default()
        };
        let sql = sql_for(&query, false);
        assert!(sql.contains("ILIKE '%sofa%'"), "{sql}");
        assert!(sql.contains("'living room'"), "{sql}");
        assert!(sql.contains(">= 1000000"), "{sql}");
        assert!(sql.contains("<= 9000000"), "{sql}");
        assert!(sql.contains("\"stock\" > 0"), "{sql}");
    }

    #[test]
    fn blank_search_is_ignored() {
        let query = ProductQuery {
            q: Some("   ".into()),
            ..Default::default()
        };
        assert!(!sql_for(&query, false).contains("ILIKE"));
    }

    #[test]
    fn inverted_price_range_is_rejected() {
        let query = ProductQuery {
            min_price: Some(10),
            max_price: Some(5),
            ..Default::default()
        };
        assert!(matches!(
            product_filter(&query, false),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn discount_must_not_exceed_price() {
        assert!(validate_pricing(100, Some(80), 1).is_ok());
        assert!(validate_pricing(100, Some(120), 1).is_err());
        assert!(validate_pricing(-1, None, 1).is_err());
        assert!(validate_pricing(100, None, -2).is_err());
    }
}
