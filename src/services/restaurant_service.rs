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
    authz::{self, Operation, RestaurantView},
    dto::{
        optional,
        required,
        restaurants::{CreateRestaurantRequest, RestaurantList, UpdateRestaurantRequest},
    },
    entity::{
        orders::{Column as OrderCol, Entity as Orders},
        restaurants::{ActiveModel, Column, Entity as Restaurants, Model as RestaurantModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Restaurant,
    response::{ApiResponse, Meta, Removed},
    routes::params::{RestaurantQuery, RestaurantSortBy, SortOrder},
    state::AppState,
};

const HAS_ORDERS: &str = "restaurant has orders; deactivate it instead";

pub async fn list_restaurants(
    state: &AppState,
    user: Option<&AuthUser>,
    query: RestaurantQuery,
) -> AppResult<ApiResponse<RestaurantList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(authz::restaurant_scope(user));

    if query.mine.unwrap_or(false) {
        let user = user
            .ok_or_else(|| AppError::Unauthorized("Sign in to list your restaurants".into()))?;
        condition = condition.add(Column::SellerId.eq(user.user_id));
    }

    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    let sort_col = match query.sort_by.unwrap_or(RestaurantSortBy::CreatedAt) {
        RestaurantSortBy::CreatedAt => Column::CreatedAt,
        RestaurantSortBy::Name => Column::Name,
    };

    let mut finder = Restaurants::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
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
        .map(Restaurant::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Restaurants",
        RestaurantList { items },
        Some(meta),
    ))
}

pub async fn get_restaurant(
    state: &AppState,
    user: Option<&AuthUser>,
    id: Uuid,
) -> AppResult<ApiResponse<Restaurant>> {
    let restaurant = find_visible(&state.orm, user, id).await?;
    Ok(ApiResponse::success("Restaurant", restaurant.into(), None))
}

pub async fn create_restaurant(
    state: &AppState,
    user: &AuthUser,
    payload: CreateRestaurantRequest,
) -> AppResult<ApiResponse<Restaurant>> {
    let view = RestaurantView {
        seller_id: user.user_id,
        is_active: payload.is_active.unwrap_or(true),
    };
    authz::require(
        authz::check_restaurant(Some(user), Operation::Insert, &view),
        Operation::Insert,
    )?;

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        seller_id: Set(user.user_id),
        name: Set(required("name", &payload.name)?),
        description: Set(optional(payload.description)),
        address: Set(optional(payload.address)),
        phone: Set(optional(payload.phone)),
        image_url: Set(optional(payload.image_url)),
        is_active: Set(view.is_active),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let restaurant = active.insert(&state.orm).await?;

    tracing::info!(restaurant_id = %restaurant.id, seller_id = %user.user_id, "restaurant created");
    audit::record(
        &state.pool,
        user.user_id,
        "restaurant_create",
        "restaurants",
        serde_json::json!({ "restaurant_id": restaurant.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Restaurant created",
        restaurant.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_restaurant(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateRestaurantRequest,
) -> AppResult<ApiResponse<Restaurant>> {
    let existing = find_visible(&state.orm, Some(user), id).await?;
    authz::require(
        authz::check_restaurant(Some(user), Operation::Update, &(&existing).into()),
        Operation::Update,
    )?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(required("name", &name)?);
    }
    if payload.description.is_some() {
        active.description = Set(optional(payload.description));
    }
    if payload.address.is_some() {
        active.address = Set(optional(payload.address));
    }
    if payload.phone.is_some() {
        active.phone = Set(optional(payload.phone));
    }
    if payload.image_url.is_some() {
        active.image_url = Set(optional(payload.image_url));
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());

    let restaurant = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "restaurant_update",
        "restaurants",
        serde_json::json!({ "restaurant_id": restaurant.id, "is_active": restaurant.is_active }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        restaurant.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_restaurant(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Removed>> {
    let txn = state.orm.begin().await?;
    let existing = Restaurants::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    authz::require(
        authz::check_restaurant(Some(user), Operation::Select, &(&existing).into()),
        Operation::Select,
    )?;
    authz::require(
        authz::check_restaurant(Some(user), Operation::Delete, &(&existing).into()),
        Operation::Delete,
    )?;

    let order_count = Orders::find()
        .filter(OrderCol::RestaurantId.eq(id))
        .count(&txn)
        .await?;
    if order_count > 0 {
        return Err(AppError::bad_request(HAS_ORDERS));
    }

    let result = Restaurants::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(|err| AppError::on_conflict(err, HAS_ORDERS))?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    txn.commit()
        .await
        .map_err(|err| AppError::on_conflict(err, HAS_ORDERS))?;

    audit::record(
        &state.pool,
        user.user_id,
        "restaurant_delete",
        "restaurants",
        serde_json::json!({ "restaurant_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        Removed { id },
        Some(Meta::empty()),
    ))
}

/// Loads a restaurant the caller may see; hidden and missing rows both read as not found.
pub(crate) async fn find_visible<C: ConnectionTrait>(
    conn: &C,
    user: Option<&AuthUser>,
    id: Uuid,
) -> AppResult<RestaurantModel> {
    let restaurant = Restaurants::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    authz::require(
        authz::check_restaurant(user, Operation::Select, &(&restaurant).into()),
        Operation::Select,
    )?;
    Ok(restaurant)
}
