pub mod auth_service;
pub mod cart_service;
pub mod dish_service;
pub mod order_service;
pub mod profile_service;
pub mod restaurant_service;
