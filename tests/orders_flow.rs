use furnimart_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::{
        admin::LowStockQuery,
        cart::AddToCartRequest,
        chats::{SendMessageRequest, StartChatRequest},
        disputes::CreateDisputeRequest,
        orders::{CheckoutRequest, CreateOrderRequest, OrderLineRequest, UpdateOrderStatusRequest},
        shipping::{CreateTrackingRequest, UpdateTrackingStatusRequest},
    },
    entity::{
        products::{ActiveModel as ProductActive, Entity as Products},
        users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::{OrderStatus, PaymentMethod, Role, ShippingStatus},
    routes::params::Pagination,
    services::{
        admin_service, cart_service, chat_service, dispute_service, order_service,
        shipping_service,
    },
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

// Integration flow: cart -> checkout -> tracking -> delivery, plus cancel, disputes and chat.
#[tokio::test]
async fn checkout_ship_and_support_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
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

    let customer = create_user(&state, Role::Customer, "customer@flow.test").await?;
    let employee = create_user(&state, Role::Employee, "employee@flow.test").await?;
    let manager = create_user(&state, Role::Manager, "manager@flow.test").await?;
    let shipper = create_user(&state, Role::Shipper, "shipper@flow.test").await?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set("Flow Test Armchair".into()),
        description: Set(Some("Velvet armchair".into())),
        price: Set(2_000_000),
        discount_price: Set(Some(1_800_000)),
        category: Set("Living Room".into()),
        material: Set(Some("velvet".into())),
        color: Set(None),
        dimensions: Set(None),
        images: Set(serde_json::json!([])),
        stock: Set(5),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    // Cart totals use the discounted price.
    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: product.id,
            quantity: 2,
        },
    )
    .await?;
    let cart = cart_service::get_cart(&state, &customer).await?.data.expect("cart");
    assert_eq!(cart.subtotal, 3_600_000);
    assert_eq!(cart.total_items, 2);

    // Checkout below the free-shipping threshold pays the default fee and empties the cart.
    let placed = order_service::checkout(
        &state,
        &customer,
        CheckoutRequest {
            shipping_address: "12 Nguyen Hue, District 1".into(),
            phone: "0901234567".into(),
            payment_method: PaymentMethod::Cod,
            notes: None,
        },
    )
    .await?;
    assert_eq!(placed.status_code, 201);
    let order = placed.data.expect("order").order;
    assert_eq!(order.subtotal, 3_600_000);
    assert_eq!(order.shipping_fee, 30_000);
    assert_eq!(order.total_amount, 3_630_000);
    assert_eq!(order.status, "pending");
    assert!(order.order_number.starts_with("FM-"));

    let cart = cart_service::get_cart(&state, &customer).await?.data.expect("cart");
    assert!(cart.items.is_empty());
    assert_eq!(stock_of(&state, product.id).await?, 3);

    // Over-ordering fails and leaves stock untouched.
    let err = order_service::create_order(&state, &customer, order_request(product.id, 10))
        .await
        .expect_err("insufficient stock");
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(stock_of(&state, product.id).await?, 3);

    // Cancelling a pending order restores stock; a second cancel is refused.
    let second = order_service::create_order(&state, &customer, order_request(product.id, 1))
        .await?
        .data
        .expect("order")
        .order;
    assert_eq!(stock_of(&state, product.id).await?, 2);
    order_service::cancel_order(&state, &customer, second.id).await?;
    assert_eq!(stock_of(&state, product.id).await?, 3);
    assert!(order_service::cancel_order(&state, &customer, second.id).await.is_err());

    // Staff confirm and hand the first order to a shipper.
    admin_service::update_order_status(
        &state,
        &employee,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Confirmed,
        },
    )
    .await?;
    let tracking = shipping_service::create_tracking(
        &state,
        &employee,
        CreateTrackingRequest {
            order_id: order.id,
            shipper_id: Some(shipper.user_id),
            estimated_delivery: None,
        },
    )
    .await?
    .data
    .expect("tracking");
    assert_eq!(tracking.tracking.status, "pending");
    assert_eq!(tracking.events.len(), 1);
    assert!(tracking.tracking.tracking_number.starts_with("TRK-"));

    let duplicate = shipping_service::create_tracking(
        &state,
        &employee,
        CreateTrackingRequest {
            order_id: order.id,
            shipper_id: None,
            estimated_delivery: None,
        },
    )
    .await
    .expect_err("one tracking per order");
    assert!(matches!(duplicate, AppError::Conflict(_)));

    // Delivery by the assigned shipper completes a COD order.
    let delivered = shipping_service::update_status(
        &state,
        &shipper,
        tracking.tracking.id,
        UpdateTrackingStatusRequest {
            status: ShippingStatus::Delivered,
            location: Some("District 1".into()),
            note: None,
        },
    )
    .await?
    .data
    .expect("tracking");
    assert_eq!(delivered.events.len(), 2);
    assert_eq!(delivered.tracking.current_location.as_deref(), Some("District 1"));
    assert!(delivered.tracking.delivered_at.is_some());

    let synced = order_service::get_order(&state, &customer, order.id)
        .await?
        .data
        .expect("order")
        .order;
    assert_eq!(synced.status, "delivered");
    assert_eq!(synced.payment_status, "paid");
    assert!(order_service::pay_order(&state, &customer, order.id).await.is_err());

    // One unresolved dispute per order.
    let dispute = dispute_service::create_dispute(&state, &customer, dispute_request(order.id))
        .await?
        .data
        .expect("dispute");
    assert_eq!(dispute.status, "open");
    let again = dispute_service::create_dispute(&state, &customer, dispute_request(order.id))
        .await
        .expect_err("unresolved dispute exists");
    assert!(matches!(again, AppError::Conflict(_)));

    // Chat read flags follow the last sender.
    let chat = chat_service::start_chat(
        &state,
        &customer,
        StartChatRequest {
            message: Some("Is the armchair available in green?".into()),
        },
    )
    .await?
    .data
    .expect("chat");
    assert!(!chat.chat.is_read_by_staff);
    assert_eq!(chat.messages.len(), 1);

    chat_service::send_message(
        &state,
        &employee,
        chat.chat.id,
        SendMessageRequest {
            content: "Yes, we can order it in.".into(),
        },
    )
    .await?;
    let reloaded = chat_service::get_chat(&state, &customer, chat.chat.id)
        .await?
        .data
        .expect("chat");
    assert_eq!(reloaded.chat.staff_id, Some(employee.user_id));
    assert!(!reloaded.chat.is_read_by_customer);
    assert!(reloaded.chat.is_read_by_staff);
    let unread = chat_service::unread_count(&state, &customer)
        .await?
        .data
        .expect("count");
    assert_eq!(unread.unread, 1);

    // Stock of 3 is at or below the default threshold.
    let low = admin_service::list_low_stock(
        &state,
        &manager,
        LowStockQuery { threshold: None },
        Pagination::new(1, 20),
    )
    .await?;
    assert!(
        low.data.expect("low stock").items.iter().any(|p| p.id == product.id),
        "expected product to appear in low-stock list"
    );

    Ok(())
}

fn order_request(product_id: Uuid, quantity: i32) -> CreateOrderRequest {
    CreateOrderRequest {
        items: vec![OrderLineRequest {
            product_id,
            quantity,
        }],
        shipping_address: "12 Nguyen Hue, District 1".into(),
        phone: "0901234567".into(),
        payment_method: PaymentMethod::BankTransfer,
        notes: None,
    }
}

fn dispute_request(order_id: Uuid) -> CreateDisputeRequest {
    CreateDisputeRequest {
        order_id,
        reason: "Damaged".into(),
        description: "Scratch on the left armrest".into(),
    }
}

async fn stock_of(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product missing"))?;
    Ok(product.stock)
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;

    // Clean tables between runs
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
        jwt_secret: "flow-test-secret".into(),
        jwt_expires_hours: 1,
        cors_origin: None,
    };
    Ok(AppState::new(pool, config))
}

async fn create_user(state: &AppState, role: Role, email: &str) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Flow {role}")),
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
