use uuid::Uuid;

use crate::{
    cart::CartLine,
    dto::{
        cart::{AddToCartRequest, CartView, UpdateCartItemRequest},
        orders::{CheckoutRequest, OrderLineRequest, OrderWithItems, PlaceOrderRequest},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    response::{ApiResponse, Meta, Removed},
    services::{dish_service, order_service},
    state::AppState,
};

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    ensure_customer(user)?;
    let cart = state.carts.get(user.user_id).await;
    Ok(ApiResponse::success(
        "OK",
        CartView::from(&cart),
        Some(Meta::empty()),
    ))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    ensure_customer(user)?;
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let (dish, restaurant) =
        match dish_service::find_visible(&state.orm, Some(user), payload.dish_id).await {
            Ok(found) => found,
            Err(AppError::NotFound) => {
                return Err(AppError::BadRequest("dish not found".to_string()));
            }
            Err(err) => return Err(err),
        };
    if !dish.is_available || !restaurant.is_active {
        return Err(AppError::BadRequest(format!(
            "dish {} is not available",
            dish.name
        )));
    }

    let cart = state
        .carts
        .add(
            user.user_id,
            CartLine {
                dish_id: dish.id,
                restaurant_id: restaurant.id,
                name: dish.name,
                unit_price: dish.price,
                quantity: payload.quantity,
            },
        )
        .await?;

    tracing::debug!(customer_id = %user.user_id, dish_id = %payload.dish_id, "cart updated");
    Ok(ApiResponse::success("OK", CartView::from(&cart), None))
}

pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    dish_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    ensure_customer(user)?;
    let cart = state
        .carts
        .set_quantity(user.user_id, dish_id, payload.quantity)
        .await?;
    Ok(ApiResponse::success("OK", CartView::from(&cart), None))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    dish_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    ensure_customer(user)?;
    let cart = state.carts.remove(user.user_id, dish_id).await?;
    Ok(ApiResponse::success(
        "Removed from cart",
        CartView::from(&cart),
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Removed>> {
    ensure_customer(user)?;
    if !state.carts.clear(user.user_id).await {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::success(
        "Cart cleared",
        Removed { id: user.user_id },
        Some(Meta::empty()),
    ))
}

/// Turns the session cart into an order; the cart is dropped only once the order commits.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_customer(user)?;
    let cart = state.carts.get(user.user_id).await;
    if cart.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let request = PlaceOrderRequest {
        delivery_address: payload.delivery_address,
        notes: payload.notes,
        items: cart
            .lines()
            .iter()
            .map(|line| OrderLineRequest {
                dish_id: line.dish_id,
                quantity: line.quantity,
            })
            .collect(),
    };
    let resp = order_service::place_order(state, user, request).await?;

    state.carts.clear_if(user.user_id, &cart).await;

    Ok(ApiResponse {
        message: "Checkout success".into(),
        ..resp
    })
}
