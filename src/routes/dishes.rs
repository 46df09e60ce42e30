use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::dishes::{DishList, UpdateDishRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Dish,
    response::{ApiResponse, Removed},
    routes::params::DishQuery,
    services::dish_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_dishes))
        .route(
            "/{id}",
            get(get_dish).put(update_dish).delete(delete_dish),
        )
}

#[utoipa::path(
    get,
    path = "/api/dishes",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20, max 100"),
        ("q" = Option<String>, Query, description = "Search in name and description"),
        ("category" = Option<String>, Query, description = "Exact category"),
        ("available_only" = Option<bool>, Query, description = "Hide unavailable dishes"),
        ("sort_by" = Option<String>, Query, description = "created_at | price | name"),
        ("sort_order" = Option<String>, Query, description = "asc | desc"),
    ),
    responses(
        (status = 200, description = "Visible dishes across restaurants", body = ApiResponse<DishList>)
    ),
    tag = "Dishes"
)]
pub async fn list_dishes(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Query(query): Query<DishQuery>,
) -> AppResult<Json<ApiResponse<DishList>>> {
    let resp = dish_service::list_dishes(&state, user.as_ref(), None, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/dishes/{id}",
    params(
        ("id" = Uuid, Path, description = "Dish ID")
    ),
    responses(
        (status = 200, description = "Get dish", body = ApiResponse<Dish>),
        (status = 404, description = "Dish not found"),
    ),
    tag = "Dishes"
)]
pub async fn get_dish(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Dish>>> {
    let resp = dish_service::get_dish(&state, user.as_ref(), id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/dishes/{id}",
    params(
        ("id" = Uuid, Path, description = "Dish ID")
    ),
    request_body = UpdateDishRequest,
    responses(
        (status = 200, description = "Updated dish", body = ApiResponse<Dish>),
        (status = 403, description = "Caller does not own the restaurant"),
        (status = 404, description = "Dish not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Dishes"
)]
pub async fn update_dish(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDishRequest>,
) -> AppResult<Json<ApiResponse<Dish>>> {
    let resp = dish_service::update_dish(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/dishes/{id}",
    params(
        ("id" = Uuid, Path, description = "Dish ID")
    ),
    responses(
        (status = 200, description = "Deleted dish", body = ApiResponse<Removed>),
        (status = 400, description = "Dish appears on orders"),
        (status = 403, description = "Caller does not own the restaurant")
    ),
    security(("bearer_auth" = [])),
    tag = "Dishes"
)]
pub async fn delete_dish(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Removed>>> {
    let resp = dish_service::delete_dish(&state, &user, id).await?;
    Ok(Json(resp))
}
