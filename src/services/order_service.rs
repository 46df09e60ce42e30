use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, ActiveValue::NotSet,
};
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    authz::{self, DishView, Operation, OrderView, RestaurantView},
    domain::{OrderStatus, Party, order_total},
    dto::{
        optional, required,
        orders::{
            OrderLineRequest, OrderList, OrderWithItems, PlaceOrderRequest,
            UpdateOrderStatusRequest,
        },
    },
    entity::{
        dishes::{Column as DishCol, Entity as Dishes, Model as DishModel},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        restaurants::{Entity as Restaurants, Model as RestaurantModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

const MENU_CHANGED: &str = "restaurant or dish was removed while placing the order";

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(authz::order_scope(user));
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        let status: OrderStatus = status.parse()?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }
    if let Some(restaurant_id) = query.restaurant_id {
        condition = condition.add(OrderCol::RestaurantId.eq(restaurant_id));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
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
        .map(Order::from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let (order, restaurant) = find_visible(&state.orm, user, id, false).await?;
    let view = OrderView::new(&order, &restaurant);
    authz::require(
        authz::check_order_item(Some(user), Operation::Select, &view),
        Operation::Select,
    )?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        with_items(user, &view, order, items)?,
        Some(Meta::empty()),
    ))
}

/// Places an order and all of its line items in one transaction.
///
/// Prices come from the dishes as read inside the transaction and are copied
/// onto the line items, so later menu changes never touch placed orders.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let delivery_address = required("delivery_address", &payload.delivery_address)?;
    let lines = merge_lines(&payload.items)?;

    let txn = state.orm.begin().await?;

    let dish_ids: Vec<Uuid> = lines.iter().map(|(dish_id, _)| *dish_id).collect();
    let found: HashMap<Uuid, (DishModel, RestaurantModel)> = Dishes::find()
        .filter(DishCol::Id.is_in(dish_ids))
        .find_also_related(Restaurants)
        .all(&txn)
        .await?
        .into_iter()
        .filter_map(|(dish, restaurant)| restaurant.map(|r| (dish.id, (dish, r))))
        .collect();

    let mut priced = Vec::with_capacity(lines.len());
    let mut restaurant: Option<RestaurantModel> = None;
    for (dish_id, quantity) in &lines {
        let (dish, dish_restaurant) = found
            .get(dish_id)
            .filter(|(dish, r)| {
                authz::check_dish(Some(user), Operation::Select, &DishView::new(dish, r))
                    .is_allowed()
            })
            .ok_or_else(|| AppError::BadRequest(format!("dish {dish_id} not found")))?;

        if !dish.is_available || !dish_restaurant.is_active {
            return Err(AppError::BadRequest(format!(
                "dish {} is not available",
                dish.name
            )));
        }
        match restaurant.as_ref().map(|r| r.id) {
            Some(id) if id != dish_restaurant.id => {
                return Err(AppError::bad_request(
                    "all dishes in an order must come from one restaurant",
                ));
            }
            Some(_) => {}
            None => restaurant = Some(dish_restaurant.clone()),
        }
        priced.push((dish.id, dish.price, *quantity));
    }
    let restaurant = restaurant.ok_or_else(|| AppError::bad_request("order has no items"))?;

    let view = OrderView {
        customer_id: user.user_id,
        restaurant: RestaurantView::from(&restaurant),
    };
    authz::require(
        authz::check_order(Some(user), Operation::Insert, &view),
        Operation::Insert,
    )?;

    let total_amount = order_total(priced.iter().map(|(_, price, qty)| (*price, *qty)))?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(user.user_id),
        restaurant_id: Set(restaurant.id),
        total_amount: Set(total_amount),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        delivery_address: Set(delivery_address),
        notes: Set(optional(payload.notes)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|err| AppError::on_conflict(err, MENU_CHANGED))?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(priced.len());
    for (dish_id, price, quantity) in priced {
        authz::require(
            authz::check_order_item(Some(user), Operation::Insert, &view),
            Operation::Insert,
        )?;
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            dish_id: Set(dish_id),
            quantity: Set(quantity),
            price: Set(price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await
        .map_err(|err| AppError::on_conflict(err, MENU_CHANGED))?;
        items.push(item.into());
    }

    txn.commit()
        .await
        .map_err(|err| AppError::on_conflict(err, MENU_CHANGED))?;

    tracing::info!(
        order_id = %order.id,
        customer_id = %user.user_id,
        restaurant_id = %restaurant.id,
        total_amount,
        "order placed"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "order_place",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_amount": total_amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order placed",
        with_items(user, &view, order, items)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let next: OrderStatus = payload.status.trim().parse()?;

    let txn = state.orm.begin().await?;
    let (order, restaurant) = find_visible(&txn, user, id, true).await?;
    let view = OrderView::new(&order, &restaurant);
    authz::require(
        authz::check_order(Some(user), Operation::Update, &view),
        Operation::Update,
    )?;

    let current: OrderStatus = order.status.parse()?;
    let party = party_of(user, &view);
    if !current.can_transition(next, party) {
        return Err(AppError::BadRequest(format!(
            "cannot move order from {current} to {next}"
        )));
    }

    let mut active: OrderActive = order.into();
    active.status = Set(next.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(&txn)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    txn.commit().await?;

    tracing::info!(order_id = %order.id, from = %current, to = %next, "order status changed");
    audit::record(
        &state.pool,
        user.user_id,
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "from": current, "to": next }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        with_items(user, &view, order, items)?,
        Some(Meta::empty()),
    ))
}

/// Sums repeated dishes into one line and rejects non-positive quantities.
pub fn merge_lines(items: &[OrderLineRequest]) -> AppResult<Vec<(Uuid, i32)>> {
    if items.is_empty() {
        return Err(AppError::bad_request("order has no items"));
    }
    let mut lines: Vec<(Uuid, i32)> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity <= 0 {
            return Err(AppError::bad_request("quantity must be greater than 0"));
        }
        match lines.iter_mut().find(|(dish_id, _)| *dish_id == item.dish_id) {
            Some((_, quantity)) => {
                *quantity = quantity
                    .checked_add(item.quantity)
                    .ok_or_else(|| AppError::bad_request("quantity is too large"))?;
            }
            None => lines.push((item.dish_id, item.quantity)),
        }
    }
    Ok(lines)
}

fn party_of(user: &AuthUser, view: &OrderView) -> Party {
    if user.is(view.customer_id) {
        Party::Customer
    } else {
        Party::Seller
    }
}

fn with_items(
    user: &AuthUser,
    view: &OrderView,
    order: OrderModel,
    items: Vec<OrderItem>,
) -> AppResult<OrderWithItems> {
    let order = Order::from_entity(order)?;
    let allowed_transitions = order.status.next_for(party_of(user, view));
    Ok(OrderWithItems {
        order,
        items,
        allowed_transitions,
    })
}

async fn find_visible<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
    id: Uuid,
    for_update: bool,
) -> AppResult<(OrderModel, RestaurantModel)> {
    let mut finder = Orders::find_by_id(id);
    if for_update {
        finder = finder.lock(LockType::Update);
    }
    let order = finder.one(conn).await?.ok_or(AppError::NotFound)?;
    let restaurant = Restaurants::find_by_id(order.restaurant_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    authz::require(
        authz::check_order(Some(user), Operation::Select, &OrderView::new(&order, &restaurant)),
        Operation::Select,
    )?;
    Ok((order, restaurant))
}
