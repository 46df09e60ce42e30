use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, ActiveValue::NotSet,
};
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;

use crate::{
    audit,
    authz::{self, DishView, Operation, RestaurantView},
    dto::{
        dishes::{CreateDishRequest, DishList, UpdateDishRequest, validate_price},
        optional, required,
    },
    entity::{
        dishes::{ActiveModel, Column, Entity as Dishes, Model as DishModel},
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        restaurants::{Entity as Restaurants, Model as RestaurantModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Dish,
    response::{ApiResponse, Meta, Removed},
    routes::params::{DishQuery, DishSortBy, SortOrder},
    services::restaurant_service,
    state::AppState,
};

const ON_ORDERS: &str = "dish appears on orders; mark it unavailable instead";

/// Lists dishes the caller may see, optionally within one restaurant.
pub async fn list_dishes(
    state: &AppState,
    user: Option<&AuthUser>,
    restaurant_id: Option<Uuid>,
    query: DishQuery,
) -> AppResult<ApiResponse<DishList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(authz::dish_scope(user));

    if let Some(restaurant_id) = restaurant_id {
        restaurant_service::find_visible(&state.orm, user, restaurant_id).await?;
        condition = condition.add(Column::RestaurantId.eq(restaurant_id));
    }

    if let Some(category) = query.category.as_ref().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        condition = condition.add(Column::Category.eq(category));
    }

    if query.available_only.unwrap_or(false) {
        condition = condition.add(Column::IsAvailable.eq(true));
    }

    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    let sort_col = match query.sort_by.unwrap_or(DishSortBy::Name) {
        DishSortBy::CreatedAt => Column::CreatedAt,
        DishSortBy::Price => Column::Price,
        DishSortBy::Name => Column::Name,
    };

    let mut finder = Dishes::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Asc) {
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
        .map(Dish::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Dishes", DishList { items }, Some(meta)))
}

pub async fn get_dish(
    state: &AppState,
    user: Option<&AuthUser>,
    id: Uuid,
) -> AppResult<ApiResponse<Dish>> {
    let (dish, _) = find_visible(&state.orm, user, id).await?;
    Ok(ApiResponse::success("Dish", dish.into(), None))
}

pub async fn create_dish(
    state: &AppState,
    user: &AuthUser,
    restaurant_id: Uuid,
    payload: CreateDishRequest,
) -> AppResult<ApiResponse<Dish>> {
    let restaurant =
        restaurant_service::find_visible(&state.orm, Some(user), restaurant_id).await?;
    let is_available = payload.is_available.unwrap_or(true);
    let view = DishView {
        is_available,
        restaurant: RestaurantView::from(&restaurant),
    };
    authz::require(
        authz::check_dish(Some(user), Operation::Insert, &view),
        Operation::Insert,
    )?;
    validate_price(payload.price)?;

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        restaurant_id: Set(restaurant.id),
        name: Set(required("name", &payload.name)?),
        description: Set(optional(payload.description)),
        price: Set(payload.price),
        image_url: Set(optional(payload.image_url)),
        category: Set(optional(payload.category)),
        is_available: Set(is_available),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let dish = active.insert(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "dish_create",
        "dishes",
        serde_json::json!({ "dish_id": dish.id, "restaurant_id": restaurant.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Dish created",
        dish.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_dish(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateDishRequest,
) -> AppResult<ApiResponse<Dish>> {
    let (existing, restaurant) = find_visible(&state.orm, Some(user), id).await?;
    authz::require(
        authz::check_dish(
            Some(user),
            Operation::Update,
            &DishView::new(&existing, &restaurant),
        ),
        Operation::Update,
    )?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(required("name", &name)?);
    }
    if payload.description.is_some() {
        active.description = Set(optional(payload.description));
    }
    if let Some(price) = payload.price {
        validate_price(price)?;
        active.price = Set(price);
    }
    if payload.image_url.is_some() {
        active.image_url = Set(optional(payload.image_url));
    }
    if payload.category.is_some() {
        active.category = Set(optional(payload.category));
    }
    if let Some(is_available) = payload.is_available {
        active.is_available = Set(is_available);
    }
    active.updated_at = Set(Utc::now().into());

    let dish = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "dish_update",
        "dishes",
        serde_json::json!({ "dish_id": dish.id, "price": dish.price }),
    )
    .await;

    Ok(ApiResponse::success("Updated", dish.into(), Some(Meta::empty())))
}

pub async fn delete_dish(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Removed>> {
    let txn = state.orm.begin().await?;
    let (existing, restaurant) = find_visible(&txn, Some(user), id).await?;
    authz::require(
        authz::check_dish(
            Some(user),
            Operation::Delete,
            &DishView::new(&existing, &restaurant),
        ),
        Operation::Delete,
    )?;

    // Row lock so no order line can reference the dish between the count and the delete.
    Dishes::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let ordered = OrderItems::find()
        .filter(OrderItemCol::DishId.eq(id))
        .count(&txn)
        .await?;
    if ordered > 0 {
        return Err(AppError::bad_request(ON_ORDERS));
    }

    let result = Dishes::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(|err| AppError::on_conflict(err, ON_ORDERS))?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    txn.commit()
        .await
        .map_err(|err| AppError::on_conflict(err, ON_ORDERS))?;

    audit::record(
        &state.pool,
        user.user_id,
        "dish_delete",
        "dishes",
        serde_json::json!({ "dish_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        Removed { id },
        Some(Meta::empty()),
    ))
}

/// Loads a dish and its restaurant if the caller may see the dish.
pub(crate) async fn find_visible<C: ConnectionTrait>(
    conn: &C,
    user: Option<&AuthUser>,
    id: Uuid,
) -> AppResult<(DishModel, RestaurantModel)> {
    let (dish, restaurant) = Dishes::find_by_id(id)
        .find_also_related(Restaurants)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    let restaurant = restaurant.ok_or(AppError::NotFound)?;
    authz::require(
        authz::check_dish(user, Operation::Select, &DishView::new(&dish, &restaurant)),
        Operation::Select,
    )?;
    Ok((dish, restaurant))
}
