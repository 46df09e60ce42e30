//! Row-level authorization.
//!
//! Every read and write on the five domain tables passes through one of the
//! `check_*` predicates below. They see only the caller and a view of the row's
//! ownership chain, so they hold no storage details. List endpoints use the
//! matching `*_scope` conditions, which select exactly the rows the `Select`
//! predicate allows.

use sea_orm::{ColumnTrait, Condition, sea_query::Query};
use uuid::Uuid;

use crate::{
    domain::Role,
    entity::{dishes, orders, restaurants},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    fn from_bool(allowed: bool) -> Self {
        if allowed { Decision::Allow } else { Decision::Deny }
    }

    pub fn is_allowed(&self) -> bool {
        *self == Decision::Allow
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RestaurantView {
    pub seller_id: Uuid,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct DishView {
    pub is_available: bool,
    pub restaurant: RestaurantView,
}

#[derive(Debug, Clone, Copy)]
pub struct OrderView {
    pub customer_id: Uuid,
    pub restaurant: RestaurantView,
}

impl From<&restaurants::Model> for RestaurantView {
    fn from(model: &restaurants::Model) -> Self {
        Self {
            seller_id: model.seller_id,
            is_active: model.is_active,
        }
    }
}

impl DishView {
    pub fn new(dish: &dishes::Model, restaurant: &restaurants::Model) -> Self {
        Self {
            is_available: dish.is_available,
            restaurant: restaurant.into(),
        }
    }
}

impl OrderView {
    pub fn new(order: &orders::Model, restaurant: &restaurants::Model) -> Self {
        Self {
            customer_id: order.customer_id,
            restaurant: restaurant.into(),
        }
    }
}

fn is_caller(caller: Option<&AuthUser>, id: Uuid) -> bool {
    caller.is_some_and(|c| c.user_id == id)
}

fn has_role(caller: Option<&AuthUser>, role: Role) -> bool {
    caller.is_some_and(|c| c.role == role)
}

pub fn check_profile(caller: Option<&AuthUser>, op: Operation, profile_id: Uuid) -> Decision {
    match op {
        Operation::Select | Operation::Insert | Operation::Update => {
            Decision::from_bool(is_caller(caller, profile_id))
        }
        Operation::Delete => Decision::Deny,
    }
}

pub fn check_restaurant(
    caller: Option<&AuthUser>,
    op: Operation,
    restaurant: &RestaurantView,
) -> Decision {
    let owner = is_caller(caller, restaurant.seller_id);
    match op {
        Operation::Select => Decision::from_bool(restaurant.is_active || owner),
        Operation::Insert => Decision::from_bool(owner && has_role(caller, Role::Seller)),
        Operation::Update | Operation::Delete => Decision::from_bool(owner),
    }
}

pub fn check_dish(caller: Option<&AuthUser>, op: Operation, dish: &DishView) -> Decision {
    let owner = is_caller(caller, dish.restaurant.seller_id);
    match op {
        Operation::Select => {
            Decision::from_bool((dish.is_available && dish.restaurant.is_active) || owner)
        }
        Operation::Insert | Operation::Update | Operation::Delete => Decision::from_bool(owner),
    }
}

pub fn check_order(caller: Option<&AuthUser>, op: Operation, order: &OrderView) -> Decision {
    let customer = is_caller(caller, order.customer_id);
    let seller = is_caller(caller, order.restaurant.seller_id);
    match op {
        Operation::Select | Operation::Update => Decision::from_bool(customer || seller),
        Operation::Insert => Decision::from_bool(customer && has_role(caller, Role::Customer)),
        Operation::Delete => Decision::Deny,
    }
}

/// Line items are immutable once written.
pub fn check_order_item(caller: Option<&AuthUser>, op: Operation, order: &OrderView) -> Decision {
    let customer = is_caller(caller, order.customer_id);
    let seller = is_caller(caller, order.restaurant.seller_id);
    match op {
        Operation::Select => Decision::from_bool(customer || seller),
        Operation::Insert => Decision::from_bool(customer),
        Operation::Update | Operation::Delete => Decision::Deny,
    }
}

/// Turns a denial into the error the caller sees. Hidden rows look missing.
pub fn require(decision: Decision, op: Operation) -> AppResult<()> {
    match (decision, op) {
        (Decision::Allow, _) => Ok(()),
        (Decision::Deny, Operation::Select) => Err(AppError::NotFound),
        (Decision::Deny, _) => Err(AppError::Forbidden),
    }
}

fn owned_restaurant_ids(seller_id: Uuid) -> sea_orm::sea_query::SelectStatement {
    Query::select()
        .column(restaurants::Column::Id)
        .from(restaurants::Entity)
        .and_where(restaurants::Column::SellerId.eq(seller_id))
        .to_owned()
}

fn active_restaurant_ids() -> sea_orm::sea_query::SelectStatement {
    Query::select()
        .column(restaurants::Column::Id)
        .from(restaurants::Entity)
        .and_where(restaurants::Column::IsActive.eq(true))
        .to_owned()
}

pub fn restaurant_scope(caller: Option<&AuthUser>) -> Condition {
    let mut scope = Condition::any().add(restaurants::Column::IsActive.eq(true));
    if let Some(caller) = caller {
        scope = scope.add(restaurants::Column::SellerId.eq(caller.user_id));
    }
    scope
}

pub fn dish_scope(caller: Option<&AuthUser>) -> Condition {
    let mut scope = Condition::any().add(
        Condition::all()
            .add(dishes::Column::IsAvailable.eq(true))
            .add(dishes::Column::RestaurantId.in_subquery(active_restaurant_ids())),
    );
    if let Some(caller) = caller {
        scope = scope.add(
            dishes::Column::RestaurantId.in_subquery(owned_restaurant_ids(caller.user_id)),
        );
    }
    scope
}

pub fn order_scope(caller: &AuthUser) -> Condition {
    Condition::any()
        .add(orders::Column::CustomerId.eq(caller.user_id))
        .add(orders::Column::RestaurantId.in_subquery(owned_restaurant_ids(caller.user_id)))
}
