use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    cart::CartLine,
    domain::{OrderStatus, Role},
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, CartView, UpdateCartItemRequest},
        dishes::{CreateDishRequest, DishList, UpdateDishRequest},
        orders::{
            CheckoutRequest, OrderLineRequest, OrderList, OrderWithItems, PlaceOrderRequest,
            UpdateOrderStatusRequest,
        },
        profiles::UpdateProfileRequest,
        restaurants::{CreateRestaurantRequest, RestaurantList, UpdateRestaurantRequest},
    },
    models::{Dish, Order, OrderItem, Profile, Restaurant},
    response::{ApiResponse, Meta, Removed},
    routes::{auth, cart, dishes, health, orders, params, profiles, restaurants},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        auth::register,
        auth::login,
        profiles::get_my_profile,
        profiles::update_my_profile,
        restaurants::list_restaurants,
        restaurants::get_restaurant,
        restaurants::create_restaurant,
        restaurants::update_restaurant,
        restaurants::delete_restaurant,
        restaurants::list_menu,
        restaurants::create_dish,
        dishes::list_dishes,
        dishes::get_dish,
        dishes::update_dish,
        dishes::delete_dish,
        cart::cart_view,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        cart::checkout,
        orders::list_orders,
        orders::get_order,
        orders::place_order,
        orders::update_order_status
    ),
    components(
        schemas(
            Role,
            OrderStatus,
            Profile,
            Restaurant,
            Dish,
            Order,
            OrderItem,
            CartLine,
            CartView,
            Removed,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UpdateProfileRequest,
            CreateRestaurantRequest,
            UpdateRestaurantRequest,
            RestaurantList,
            CreateDishRequest,
            UpdateDishRequest,
            DishList,
            AddToCartRequest,
            UpdateCartItemRequest,
            OrderLineRequest,
            PlaceOrderRequest,
            CheckoutRequest,
            UpdateOrderStatusRequest,
            OrderList,
            OrderWithItems,
            params::Pagination,
            params::RestaurantQuery,
            params::DishQuery,
            params::OrderListQuery,
            Meta,
            health::HealthData,
            health::ReadinessData,
            ApiResponse<Profile>,
            ApiResponse<Restaurant>,
            ApiResponse<Dish>,
            ApiResponse<RestaurantList>,
            ApiResponse<DishList>,
            ApiResponse<CartView>,
            ApiResponse<OrderList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<Removed>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and login"),
        (name = "Profiles", description = "Profile of the signed-in user"),
        (name = "Restaurants", description = "Restaurant endpoints"),
        (name = "Dishes", description = "Menu endpoints"),
        (name = "Cart", description = "Session cart of a customer"),
        (name = "Orders", description = "Order placement and fulfilment"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
