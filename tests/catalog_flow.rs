use furnimart_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::{
        auth::{RegisterRequest, UpdateProfileRequest},
        chats::StartChatRequest,
        orders::{CreateOrderRequest, OrderLineRequest},
        products::{CreateProductRequest, UpdateProductRequest},
        settings::UpdateSettingsRequest,
        users::UpdateUserRequest,
    },
    entity::users::ActiveModel as UserActive,
    error::AppError,
    middleware::auth::AuthUser,
    models::{PaymentMethod, Product, Role},
    routes::params::{Pagination, ProductQuery, ProductSortBy, SortOrder},
    services::{
        auth_service, chat_service, order_service, product_service, settings_service,
        user_service,
    },
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

// Catalogue, settings and account maintenance against a real database.
#[tokio::test]
async fn catalogue_settings_and_accounts_flow() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let admin = create_user(&state, Role::Admin, "admin@catalog.test").await?;
    let employee = create_user(&state, Role::Employee, "employee@catalog.test").await?;
    let customer = create_user(&state, Role::Customer, "customer@catalog.test").await?;

    // Settings are created with defaults on first read.
    let settings = settings_service::get_settings(&state).await?.data.expect("settings");
    assert_eq!(settings.store_name, "FurniMart");
    assert_eq!(settings.shipping_fee, 30_000);
    assert_eq!(settings.free_shipping_threshold, 5_000_000);

    let settings = settings_service::update_settings(
        &state,
        &admin,
        UpdateSettingsRequest {
            store_name: None,
            contact_email: None,
            contact_phone: Some("1900 1234".into()),
            address: None,
            currency: None,
            shipping_fee: Some(45_000),
            free_shipping_threshold: None,
            maintenance_mode: None,
        },
    )
    .await?
    .data
    .expect("settings");
    assert_eq!(settings.shipping_fee, 45_000);
    assert_eq!(settings.contact_phone, "1900 1234");
    assert_eq!(settings.store_name, "FurniMart");
    assert_eq!(settings.free_shipping_threshold, 5_000_000);

    // Two finishes of the same model share a name.
    let natural = create_product(&state, &employee, "Oak Chair", "Dining Room", 1_500_000, 8).await?;
    let walnut = create_product(&state, &employee, "Oak Chair", "Dining Room", 1_700_000, 0).await?;
    assert_ne!(natural.id, walnut.id);
    let sofa = create_product(&state, &employee, "Linen Sofa", "Living Room", 12_000_000, 2).await?;

    // Update merges only the supplied fields; an explicit null clears the discount.
    let discounted = product_service::update_product(
        &state,
        &employee,
        sofa.id,
        update_request(serde_json::json!({ "discount_price": 10_500_000 })),
    )
    .await?
    .data
    .expect("product");
    assert_eq!(discounted.discount_price, Some(10_500_000));
    assert_eq!(discounted.price, 12_000_000);
    assert_eq!(discounted.name, "Linen Sofa");

    let renamed = product_service::update_product(
        &state,
        &employee,
        sofa.id,
        update_request(serde_json::json!({ "name": "Linen Sofa 3-seat", "stock": 4 })),
    )
    .await?
    .data
    .expect("product");
    assert_eq!(renamed.name, "Linen Sofa 3-seat");
    assert_eq!(renamed.stock, 4);
    assert_eq!(renamed.discount_price, Some(10_500_000));
    assert_eq!(renamed.category, "Living Room");

    let cleared = product_service::update_product(
        &state,
        &employee,
        sofa.id,
        update_request(serde_json::json!({ "discount_price": null })),
    )
    .await?
    .data
    .expect("product");
    assert_eq!(cleared.discount_price, None);
    assert_eq!(cleared.name, "Linen Sofa 3-seat");

    // Filters, sorting and pagination.
    let dining = product_service::list_products(
        &state,
        None,
        ProductQuery {
            category: Some("dining room".into()),
            sort_by: Some(ProductSortBy::Price),
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        },
        Pagination::new(1, 1),
    )
    .await?;
    let meta = dining.meta.expect("meta");
    assert_eq!(meta.total, Some(2));
    assert_eq!(meta.per_page, Some(1));
    let first_page = dining.data.expect("products").items;
    assert_eq!(first_page.len(), 1);
    assert_eq!(first_page[0].id, natural.id);

    let in_stock = product_service::list_products(
        &state,
        None,
        ProductQuery {
            q: Some("oak".into()),
            in_stock: Some(true),
            ..Default::default()
        },
        Pagination::default(),
    )
    .await?
    .data
    .expect("products")
    .items;
    assert_eq!(ids(&in_stock), vec![natural.id]);

    // Soft-deleted products leave the public catalogue but stay visible to staff.
    product_service::delete_product(&state, &admin, sofa.id).await?;
    let err = product_service::get_product(&state, Some(&customer), sofa.id)
        .await
        .expect_err("inactive product hidden");
    assert!(matches!(err, AppError::NotFound(_)));
    let staff_view = product_service::get_product(&state, Some(&employee), sofa.id)
        .await?
        .data
        .expect("product");
    assert!(!staff_view.is_active);

    let public = product_service::list_products(
        &state,
        Some(&customer),
        ProductQuery {
            include_inactive: Some(true),
            ..Default::default()
        },
        Pagination::default(),
    )
    .await?
    .data
    .expect("products")
    .items;
    assert!(!ids(&public).contains(&sofa.id));
    let back_office = product_service::list_products(
        &state,
        Some(&employee),
        ProductQuery {
            include_inactive: Some(true),
            ..Default::default()
        },
        Pagination::default(),
    )
    .await?
    .data
    .expect("products")
    .items;
    assert!(ids(&back_office).contains(&sofa.id));

    let categories = product_service::list_categories(&state)
        .await?
        .data
        .expect("categories")
        .items;
    assert_eq!(categories, vec!["Dining Room".to_string()]);

    // Profile and admin updates merge.
    let profile = auth_service::update_profile(
        &state,
        &customer,
        UpdateProfileRequest {
            name: None,
            phone: None,
            address: Some("5 Le Loi, District 3".into()),
        },
    )
    .await?
    .data
    .expect("user");
    assert_eq!(profile.address.as_deref(), Some("5 Le Loi, District 3"));
    assert_eq!(profile.name, "Catalog customer");

    let promoted = user_service::update_user(
        &state,
        &admin,
        employee.user_id,
        UpdateUserRequest {
            name: None,
            phone: Some("0909000111".into()),
            address: None,
            role: Some(Role::Manager),
            is_active: None,
        },
    )
    .await?
    .data
    .expect("user");
    assert_eq!(promoted.role, "manager");
    assert_eq!(promoted.phone.as_deref(), Some("0909000111"));
    assert_eq!(promoted.name, "Catalog employee");
    assert!(promoted.is_active);

    // Concurrent registrations with one email: exactly one wins, the other conflicts.
    let (left, right) = tokio::join!(
        auth_service::register_user(&state, register_request("race@catalog.test")),
        auth_service::register_user(&state, register_request("race@catalog.test")),
    );
    let outcomes = [left.map(|_| ()), right.map(|_| ())];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(AppError::Conflict(_)))));

    // Concurrent chat starts land on the same conversation.
    let (left, right) = tokio::join!(
        chat_service::start_chat(&state, &customer, StartChatRequest { message: None }),
        chat_service::start_chat(&state, &customer, StartChatRequest { message: None }),
    );
    let (left, right) = (left?, right?);
    let left_id = left.data.as_ref().expect("chat").chat.id;
    let right_id = right.data.as_ref().expect("chat").chat.id;
    assert_eq!(left_id, right_id);
    let statuses = [left.status_code, right.status_code];
    assert!(statuses.contains(&201) && statuses.contains(&200));

    // A customer with order history cannot be hard-deleted.
    order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            items: vec![OrderLineRequest {
                product_id: natural.id,
                quantity: 1,
            }],
            shipping_address: "5 Le Loi, District 3".into(),
            phone: "0901234567".into(),
            payment_method: PaymentMethod::Cod,
            notes: None,
        },
    )
    .await?;
    let err = user_service::delete_user(&state, &admin, customer.user_id)
        .await
        .expect_err("order history blocks deletion");
    assert!(matches!(err, AppError::Conflict(_)));
    user_service::get_user(&state, &admin, customer.user_id).await?;

    Ok(())
}

fn ids(products: &[Product]) -> Vec<Uuid> {
    products.iter().map(|p| p.id).collect()
}

fn update_request(json: serde_json::Value) -> UpdateProductRequest {
    serde_json::from_value(json).expect("update request")
}

fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        name: "Racer".into(),
        email: email.into(),
        password: "secret123".into(),
        phone: None,
    }
}

async fn create_product(
    state: &AppState,
    staff: &AuthUser,
    name: &str,
    category: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<Product> {
    let created = product_service::create_product(
        state,
        staff,
        CreateProductRequest {
            name: name.into(),
            description: Some(format!("{name} in solid wood")),
            price,
            discount_price: None,
            category: category.into(),
            material: Some("oak".into()),
            color: None,
            dimensions: None,
            images: vec![],
            stock,
        },
    )
    .await?;
    assert_eq!(created.status_code, 201);
    Ok(created.data.expect("product"))
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;

    sqlx::query(
        "TRUNCATE TABLE tracking_events, shipping_trackings, disputes, chat_messages, chats, \
         order_items, orders, cart_items, audit_logs, products, users, settings CASCADE",
    )
    .execute(&pool)
    .await?;

    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "catalog-test-secret".into(),
        jwt_expires_hours: 1,
        cors_origin: None,
    };
    Ok(AppState::new(pool, config))
}

async fn create_user(state: &AppState, role: Role, email: &str) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Catalog {role}")),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        phone: Set(None),
        address: Set(None),
        role: Set(role.as_str().into()),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role,
    })
}
