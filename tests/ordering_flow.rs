use restaurant_ordering_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    domain::{OrderStatus, Role},
    dto::{
        auth::{LoginRequest, RegisterRequest},
        cart::AddToCartRequest,
        dishes::{CreateDishRequest, UpdateDishRequest},
        orders::{CheckoutRequest, OrderLineRequest, PlaceOrderRequest, UpdateOrderStatusRequest},
        restaurants::{CreateRestaurantRequest, UpdateRestaurantRequest},
    },
    entity::{OrderItems, Orders, order_items, orders},
    error::AppError,
    middleware::auth::{AuthUser, decode_token},
    routes::params::{DishQuery, OrderListQuery, RestaurantQuery},
    services::{
        auth_service, cart_service, dish_service, order_service, restaurant_service,
    },
    state::AppState,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

// Integration flows run against a real Postgres; they skip when no DB is configured.
async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    let state = AppState::new(
        pool,
        AppConfig {
            database_url,
            jwt_secret: "test-secret".into(),
            token_ttl_hours: 1,
            host: "127.0.0.1".into(),
            port: 0,
        },
    );
    run_migrations(&state.orm).await?;
    Ok(Some(state))
}

async fn register(state: &AppState, role: Role) -> anyhow::Result<AuthUser> {
    let resp = auth_service::register_user(
        state,
        RegisterRequest {
            email: format!("{}-{}@example.com", role, Uuid::new_v4()),
            password: "correct horse".into(),
            full_name: Some("Test User".into()),
            role,
        },
    )
    .await?;
    let profile = resp.data.ok_or_else(|| anyhow::anyhow!("missing profile"))?;
    Ok(AuthUser {
        user_id: profile.id,
        role: profile.role,
    })
}

struct Menu {
    restaurant_id: Uuid,
    noodles: Uuid,
    salad: Uuid,
}

async fn open_restaurant(state: &AppState, seller: &AuthUser) -> anyhow::Result<Menu> {
    let restaurant = restaurant_service::create_restaurant(
        state,
        seller,
        CreateRestaurantRequest {
            name: "Test Kitchen".into(),
            description: Some("Integration test restaurant".into()),
            address: Some("1 Test Street".into()),
            phone: None,
            image_url: None,
            is_active: None,
        },
    )
    .await?
    .data
    .ok_or_else(|| anyhow::anyhow!("missing restaurant"))?;

    let mut dish_ids = Vec::new();
    for (name, price) in [("Dan Dan Noodles", 999), ("Cucumber Salad", 500)] {
        let dish = dish_service::create_dish(
            state,
            seller,
            restaurant.id,
            CreateDishRequest {
                name: name.into(),
                description: None,
                price,
                image_url: None,
                category: Some("Mains".into()),
                is_available: None,
            },
        )
        .await?
        .data
        .ok_or_else(|| anyhow::anyhow!("missing dish"))?;
        dish_ids.push(dish.id);
    }

    Ok(Menu {
        restaurant_id: restaurant.id,
        noodles: dish_ids[0],
        salad: dish_ids[1],
    })
}

fn order_request(items: &[(Uuid, i32)]) -> PlaceOrderRequest {
    PlaceOrderRequest {
        delivery_address: "221B Baker Street".into(),
        notes: None,
        items: items
            .iter()
            .map(|(dish_id, quantity)| OrderLineRequest {
                dish_id: *dish_id,
                quantity: *quantity,
            })
            .collect(),
    }
}

async fn order_count(state: &AppState, customer_id: Uuid) -> anyhow::Result<u64> {
    Ok(Orders::find()
        .filter(orders::Column::CustomerId.eq(customer_id))
        .count(&state.orm)
        .await?)
}

#[tokio::test]
async fn register_then_login_issues_token_for_role() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let email = format!("login-{}@example.com", Uuid::new_v4());
    auth_service::register_user(
        &state,
        RegisterRequest {
            email: email.to_uppercase(),
            password: "correct horse".into(),
            full_name: None,
            role: Role::Seller,
        },
    )
    .await?;

    let duplicate = auth_service::register_user(
        &state,
        RegisterRequest {
            email: email.clone(),
            password: "correct horse".into(),
            full_name: None,
            role: Role::Customer,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

    let login = auth_service::login_user(
        &state,
        LoginRequest {
            email: email.clone(),
            password: "correct horse".into(),
        },
    )
    .await?
    .data
    .ok_or_else(|| anyhow::anyhow!("missing login"))?;
    let token = login
        .token
        .strip_prefix("Bearer ")
        .ok_or_else(|| anyhow::anyhow!("token is not a bearer token"))?;
    let caller = decode_token(token, &state.config.jwt_secret)?;
    assert_eq!(caller.user_id, login.user_id);
    assert_eq!(caller.role, Role::Seller);

    let wrong = auth_service::login_user(
        &state,
        LoginRequest {
            email,
            password: "wrong password".into(),
        },
    )
    .await;
    assert!(wrong.is_err());
    Ok(())
}

#[tokio::test]
async fn placed_order_snapshots_prices() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = register(&state, Role::Seller).await?;
    let customer = register(&state, Role::Customer).await?;
    let menu = open_restaurant(&state, &seller).await?;

    let placed = order_service::place_order(
        &state,
        &customer,
        order_request(&[(menu.noodles, 2), (menu.salad, 1)]),
    )
    .await?
    .data
    .ok_or_else(|| anyhow::anyhow!("missing order"))?;
    assert_eq!(placed.order.total_amount, 2498);
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(placed.order.restaurant_id, menu.restaurant_id);
    assert_eq!(placed.items.len(), 2);
    assert_eq!(placed.allowed_transitions, vec![OrderStatus::Cancelled]);

    dish_service::update_dish(
        &state,
        &seller,
        menu.noodles,
        UpdateDishRequest {
            price: Some(1500),
            ..Default::default()
        },
    )
    .await?;

    let fetched = order_service::get_order(&state, &customer, placed.order.id)
        .await?
        .data
        .ok_or_else(|| anyhow::anyhow!("missing order"))?;
    assert_eq!(fetched.order.total_amount, 2498);
    let noodles = fetched
        .items
        .iter()
        .find(|item| item.dish_id == menu.noodles)
        .ok_or_else(|| anyhow::anyhow!("missing noodles line"))?;
    assert_eq!(noodles.price, 999);
    assert_eq!(noodles.quantity, 2);
    Ok(())
}

#[tokio::test]
async fn failed_placement_leaves_nothing_behind() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = register(&state, Role::Seller).await?;
    let customer = register(&state, Role::Customer).await?;
    let menu = open_restaurant(&state, &seller).await?;

    let unknown = order_service::place_order(
        &state,
        &customer,
        order_request(&[(menu.noodles, 1), (Uuid::new_v4(), 1)]),
    )
    .await;
    assert!(matches!(unknown, Err(AppError::BadRequest(_))));

    let zero = order_service::place_order(
        &state,
        &customer,
        order_request(&[(menu.noodles, 0)]),
    )
    .await;
    assert!(matches!(zero, Err(AppError::BadRequest(_))));

    let mut blank = order_request(&[(menu.noodles, 1)]);
    blank.delivery_address = "   ".into();
    let blank = order_service::place_order(&state, &customer, blank).await;
    assert!(matches!(blank, Err(AppError::BadRequest(_))));

    let as_seller =
        order_service::place_order(&state, &seller, order_request(&[(menu.noodles, 1)])).await;
    assert!(matches!(as_seller, Err(AppError::Forbidden)));

    assert_eq!(order_count(&state, customer.user_id).await?, 0);
    assert_eq!(order_count(&state, seller.user_id).await?, 0);
    let items = OrderItems::find()
        .filter(order_items::Column::DishId.is_in([menu.noodles, menu.salad]))
        .count(&state.orm)
        .await?;
    assert_eq!(items, 0);
    Ok(())
}

#[tokio::test]
async fn negative_price_is_rejected() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = register(&state, Role::Seller).await?;
    let menu = open_restaurant(&state, &seller).await?;

    let created = dish_service::create_dish(
        &state,
        &seller,
        menu.restaurant_id,
        CreateDishRequest {
            name: "Free Lunch".into(),
            description: None,
            price: -1,
            image_url: None,
            category: None,
            is_available: None,
        },
    )
    .await;
    assert!(matches!(created, Err(AppError::BadRequest(_))));

    let updated = dish_service::update_dish(
        &state,
        &seller,
        menu.salad,
        UpdateDishRequest {
            price: Some(-1),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(updated, Err(AppError::BadRequest(_))));
    Ok(())
}

#[tokio::test]
async fn inactive_restaurant_is_hidden_from_the_public() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = register(&state, Role::Seller).await?;
    let customer = register(&state, Role::Customer).await?;
    let menu = open_restaurant(&state, &seller).await?;

    restaurant_service::update_restaurant(
        &state,
        &seller,
        menu.restaurant_id,
        UpdateRestaurantRequest {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await?;

    let hidden = restaurant_service::get_restaurant(&state, None, menu.restaurant_id).await;
    assert!(matches!(hidden, Err(AppError::NotFound)));
    let hidden = restaurant_service::get_restaurant(&state, Some(&customer), menu.restaurant_id).await;
    assert!(matches!(hidden, Err(AppError::NotFound)));
    let dish = dish_service::get_dish(&state, None, menu.noodles).await;
    assert!(matches!(dish, Err(AppError::NotFound)));

    restaurant_service::get_restaurant(&state, Some(&seller), menu.restaurant_id).await?;
    let mine = restaurant_service::list_restaurants(
        &state,
        Some(&seller),
        RestaurantQuery {
            mine: Some(true),
            ..Default::default()
        },
    )
    .await?
    .data
    .ok_or_else(|| anyhow::anyhow!("missing list"))?;
    assert!(mine.items.iter().any(|r| r.id == menu.restaurant_id));

    let menu_for_owner = dish_service::list_dishes(
        &state,
        Some(&seller),
        Some(menu.restaurant_id),
        DishQuery::default(),
    )
    .await?
    .data
    .ok_or_else(|| anyhow::anyhow!("missing dishes"))?;
    assert_eq!(menu_for_owner.items.len(), 2);

    let public_menu =
        dish_service::list_dishes(&state, None, Some(menu.restaurant_id), DishQuery::default())
            .await;
    assert!(matches!(public_menu, Err(AppError::NotFound)));

    let ordered =
        order_service::place_order(&state, &customer, order_request(&[(menu.noodles, 1)])).await;
    assert!(matches!(ordered, Err(AppError::BadRequest(_))));

    let updated_by_stranger = restaurant_service::update_restaurant(
        &state,
        &register(&state, Role::Seller).await?,
        menu.restaurant_id,
        UpdateRestaurantRequest {
            is_active: Some(true),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(updated_by_stranger, Err(AppError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn status_changes_follow_the_state_machine() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = register(&state, Role::Seller).await?;
    let customer = register(&state, Role::Customer).await?;
    let menu = open_restaurant(&state, &seller).await?;

    let order_id = order_service::place_order(
        &state,
        &customer,
        order_request(&[(menu.noodles, 1)]),
    )
    .await?
    .data
    .ok_or_else(|| anyhow::anyhow!("missing order"))?
    .order
    .id;

    let set = |status: &str| UpdateOrderStatusRequest {
        status: status.into(),
    };

    let skipped = order_service::update_order_status(&state, &seller, order_id, set("ready")).await;
    assert!(matches!(skipped, Err(AppError::BadRequest(_))));

    let by_customer =
        order_service::update_order_status(&state, &customer, order_id, set("confirmed")).await;
    assert!(matches!(by_customer, Err(AppError::BadRequest(_))));

    let stranger = register(&state, Role::Customer).await?;
    let hidden =
        order_service::update_order_status(&state, &stranger, order_id, set("cancelled")).await;
    assert!(matches!(hidden, Err(AppError::NotFound)));

    for next in ["confirmed", "preparing", "ready"] {
        let resp = order_service::update_order_status(&state, &seller, order_id, set(next))
            .await?
            .data
            .ok_or_else(|| anyhow::anyhow!("missing order"))?;
        assert_eq!(resp.order.status.as_str(), next);
    }

    let late_cancel =
        order_service::update_order_status(&state, &customer, order_id, set("cancelled")).await;
    assert!(matches!(late_cancel, Err(AppError::BadRequest(_))));

    let delivered =
        order_service::update_order_status(&state, &seller, order_id, set("delivered"))
            .await?
            .data
            .ok_or_else(|| anyhow::anyhow!("missing order"))?;
    assert_eq!(delivered.order.status, OrderStatus::Delivered);
    assert!(delivered.allowed_transitions.is_empty());

    let after_terminal =
        order_service::update_order_status(&state, &seller, order_id, set("cancelled")).await;
    assert!(matches!(after_terminal, Err(AppError::BadRequest(_))));

    let unknown =
        order_service::update_order_status(&state, &seller, order_id, set("shipped")).await;
    assert!(matches!(unknown, Err(AppError::BadRequest(_))));

    let seller_view = order_service::list_orders(
        &state,
        &seller,
        OrderListQuery {
            status: Some("delivered".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .ok_or_else(|| anyhow::anyhow!("missing list"))?;
    assert!(seller_view.items.iter().any(|o| o.id == order_id));

    let stranger_view = order_service::list_orders(&state, &stranger, OrderListQuery::default())
        .await?
        .data
        .ok_or_else(|| anyhow::anyhow!("missing list"))?;
    assert!(stranger_view.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn cart_checkout_places_order_and_clears_cart() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = register(&state, Role::Seller).await?;
    let customer = register(&state, Role::Customer).await?;
    let menu = open_restaurant(&state, &seller).await?;

    let as_seller = cart_service::get_cart(&state, &seller).await;
    assert!(matches!(as_seller, Err(AppError::Forbidden)));

    let empty = cart_service::checkout(
        &state,
        &customer,
        CheckoutRequest {
            delivery_address: "221B Baker Street".into(),
            notes: None,
        },
    )
    .await;
    assert!(matches!(empty, Err(AppError::BadRequest(_))));

    for (dish_id, quantity) in [(menu.noodles, 1), (menu.salad, 1), (menu.noodles, 1)] {
        cart_service::add_to_cart(&state, &customer, AddToCartRequest { dish_id, quantity })
            .await?;
    }
    let cart = cart_service::get_cart(&state, &customer)
        .await?
        .data
        .ok_or_else(|| anyhow::anyhow!("missing cart"))?;
    assert_eq!(cart.subtotal, 2498);
    assert_eq!(cart.restaurant_id, Some(menu.restaurant_id));

    let unknown = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            dish_id: Uuid::new_v4(),
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(unknown, Err(AppError::BadRequest(_))));

    let placed = cart_service::checkout(
        &state,
        &customer,
        CheckoutRequest {
            delivery_address: "221B Baker Street".into(),
            notes: Some("ring twice".into()),
        },
    )
    .await?
    .data
    .ok_or_else(|| anyhow::anyhow!("missing order"))?;
    assert_eq!(placed.order.total_amount, 2498);
    assert_eq!(placed.order.notes.as_deref(), Some("ring twice"));
    assert!(state.carts.get(customer.user_id).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn dishes_on_orders_cannot_be_deleted() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = register(&state, Role::Seller).await?;
    let customer = register(&state, Role::Customer).await?;
    let menu = open_restaurant(&state, &seller).await?;

    order_service::place_order(&state, &customer, order_request(&[(menu.noodles, 1)])).await?;

    let by_customer = dish_service::delete_dish(&state, &customer, menu.salad).await;
    assert!(matches!(by_customer, Err(AppError::Forbidden)));

    let ordered = dish_service::delete_dish(&state, &seller, menu.noodles).await;
    assert!(matches!(ordered, Err(AppError::BadRequest(_))));
    let restaurant = restaurant_service::delete_restaurant(&state, &seller, menu.restaurant_id).await;
    assert!(matches!(restaurant, Err(AppError::BadRequest(_))));

    dish_service::delete_dish(&state, &seller, menu.salad).await?;
    let gone = dish_service::get_dish(&state, Some(&seller), menu.salad).await;
    assert!(matches!(gone, Err(AppError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn concurrent_registrations_with_one_email_yield_one_account() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let email = format!("race-{}@example.com", Uuid::new_v4());
    let request = || RegisterRequest {
        email: email.clone(),
        password: "correct horse".into(),
        full_name: None,
        role: Role::Customer,
    };

    let (first, second) = tokio::join!(
        auth_service::register_user(&state, request()),
        auth_service::register_user(&state, request()),
    );

    let mut created = 0;
    for attempt in [first, second] {
        match attempt {
            Ok(_) => created += 1,
            Err(AppError::BadRequest(message)) => assert_eq!(message, "Email is already taken"),
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(created, 1);
    Ok(())
}

#[tokio::test]
async fn deleting_restaurant_while_ordering_never_fails_with_server_error() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let seller = register(&state, Role::Seller).await?;
    let customer = register(&state, Role::Customer).await?;
    let menu = open_restaurant(&state, &seller).await?;

    let (placed, deleted) = tokio::join!(
        order_service::place_order(&state, &customer, order_request(&[(menu.noodles, 1)])),
        restaurant_service::delete_restaurant(&state, &seller, menu.restaurant_id),
    );

    for err in [placed.as_ref().err(), deleted.as_ref().err()].into_iter().flatten() {
        assert!(!err.status().is_server_error(), "unexpected error: {err:?}");
    }
    // Exactly one side wins: either the order exists and the restaurant stays,
    // or the restaurant is gone and no order was written.
    assert!(placed.is_ok() != deleted.is_ok());
    assert_eq!(
        order_count(&state, customer.user_id).await?,
        u64::from(placed.is_ok())
    );
    Ok(())
}

