use restaurant_ordering_api::{
    authz::{
        self, Decision, DishView, Operation, OrderView, RestaurantView, check_dish, check_order,
        check_order_item, check_profile, check_restaurant,
    },
    domain::Role,
    entity::{Dishes, Orders, Restaurants},
    error::AppError,
    middleware::auth::AuthUser,
};
use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};
use uuid::Uuid;

fn customer() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: Role::Customer,
    }
}

fn seller() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: Role::Seller,
    }
}

fn restaurant_of(owner: &AuthUser, is_active: bool) -> RestaurantView {
    RestaurantView {
        seller_id: owner.user_id,
        is_active,
    }
}

#[test]
fn profile_is_private_to_its_owner() {
    let me = customer();
    let other = customer();

    for op in [Operation::Select, Operation::Insert, Operation::Update] {
        assert_eq!(check_profile(Some(&me), op, me.user_id), Decision::Allow);
        assert_eq!(check_profile(Some(&other), op, me.user_id), Decision::Deny);
        assert_eq!(check_profile(None, op, me.user_id), Decision::Deny);
    }
    assert_eq!(
        check_profile(Some(&me), Operation::Delete, me.user_id),
        Decision::Deny
    );
}

#[test]
fn inactive_restaurant_is_visible_only_to_its_seller() {
    let owner = seller();
    let active = restaurant_of(&owner, true);
    let inactive = restaurant_of(&owner, false);

    assert!(check_restaurant(None, Operation::Select, &active).is_allowed());
    assert!(check_restaurant(Some(&customer()), Operation::Select, &active).is_allowed());

    assert!(!check_restaurant(None, Operation::Select, &inactive).is_allowed());
    assert!(!check_restaurant(Some(&customer()), Operation::Select, &inactive).is_allowed());
    assert!(!check_restaurant(Some(&seller()), Operation::Select, &inactive).is_allowed());
    assert!(check_restaurant(Some(&owner), Operation::Select, &inactive).is_allowed());
}

#[test]
fn only_sellers_create_restaurants_they_own() {
    let owner = seller();
    let buyer = customer();

    assert!(check_restaurant(Some(&owner), Operation::Insert, &restaurant_of(&owner, true)).is_allowed());
    // A seller cannot create a restaurant on someone else's behalf.
    assert!(
        !check_restaurant(Some(&owner), Operation::Insert, &restaurant_of(&seller(), true))
            .is_allowed()
    );
    assert!(!check_restaurant(Some(&buyer), Operation::Insert, &restaurant_of(&buyer, true)).is_allowed());
    assert!(!check_restaurant(None, Operation::Insert, &restaurant_of(&owner, true)).is_allowed());
}

#[test]
fn only_owner_updates_or_deletes_restaurant() {
    let owner = seller();
    let view = restaurant_of(&owner, true);

    for op in [Operation::Update, Operation::Delete] {
        assert!(check_restaurant(Some(&owner), op, &view).is_allowed());
        assert!(!check_restaurant(Some(&seller()), op, &view).is_allowed());
        assert!(!check_restaurant(Some(&customer()), op, &view).is_allowed());
        assert!(!check_restaurant(None, op, &view).is_allowed());
    }
}

#[test]
fn dish_needs_available_and_active_restaurant_for_public_view() {
    let owner = seller();
    let cases = [
        (true, true, true),
        (false, true, false),
        (true, false, false),
        (false, false, false),
    ];

    for (is_available, is_active, public) in cases {
        let dish = DishView {
            is_available,
            restaurant: restaurant_of(&owner, is_active),
        };
        assert_eq!(check_dish(None, Operation::Select, &dish).is_allowed(), public);
        assert_eq!(
            check_dish(Some(&customer()), Operation::Select, &dish).is_allowed(),
            public
        );
        assert!(check_dish(Some(&owner), Operation::Select, &dish).is_allowed());
    }
}

#[test]
fn dish_writes_follow_restaurant_ownership() {
    let owner = seller();
    let dish = DishView {
        is_available: true,
        restaurant: restaurant_of(&owner, true),
    };

    for op in [Operation::Insert, Operation::Update, Operation::Delete] {
        assert!(check_dish(Some(&owner), op, &dish).is_allowed());
        assert!(!check_dish(Some(&seller()), op, &dish).is_allowed());
        assert!(!check_dish(Some(&customer()), op, &dish).is_allowed());
    }
}

#[test]
fn order_is_visible_to_its_customer_and_the_restaurant_seller() {
    let buyer = customer();
    let owner = seller();
    let order = OrderView {
        customer_id: buyer.user_id,
        restaurant: restaurant_of(&owner, true),
    };

    for op in [Operation::Select, Operation::Update] {
        assert!(check_order(Some(&buyer), op, &order).is_allowed());
        assert!(check_order(Some(&owner), op, &order).is_allowed());
        assert!(!check_order(Some(&customer()), op, &order).is_allowed());
        assert!(!check_order(Some(&seller()), op, &order).is_allowed());
        assert!(!check_order(None, op, &order).is_allowed());
    }
    assert!(!check_order(Some(&buyer), Operation::Delete, &order).is_allowed());
    assert!(!check_order(Some(&owner), Operation::Delete, &order).is_allowed());
}

#[test]
fn orders_are_placed_by_customers_for_themselves() {
    let buyer = customer();
    let restaurant = restaurant_of(&seller(), true);

    let own = OrderView {
        customer_id: buyer.user_id,
        restaurant,
    };
    assert!(check_order(Some(&buyer), Operation::Insert, &own).is_allowed());

    let someone_else = OrderView {
        customer_id: Uuid::new_v4(),
        restaurant,
    };
    assert!(!check_order(Some(&buyer), Operation::Insert, &someone_else).is_allowed());

    let as_seller = seller();
    let seller_order = OrderView {
        customer_id: as_seller.user_id,
        restaurant,
    };
    assert!(!check_order(Some(&as_seller), Operation::Insert, &seller_order).is_allowed());
}

#[test]
fn order_items_are_immutable() {
    let buyer = customer();
    let owner = seller();
    let order = OrderView {
        customer_id: buyer.user_id,
        restaurant: restaurant_of(&owner, true),
    };

    assert!(check_order_item(Some(&buyer), Operation::Select, &order).is_allowed());
    assert!(check_order_item(Some(&owner), Operation::Select, &order).is_allowed());
    assert!(check_order_item(Some(&buyer), Operation::Insert, &order).is_allowed());
    assert!(!check_order_item(Some(&owner), Operation::Insert, &order).is_allowed());
    for op in [Operation::Update, Operation::Delete] {
        assert!(!check_order_item(Some(&buyer), op, &order).is_allowed());
        assert!(!check_order_item(Some(&owner), op, &order).is_allowed());
    }
}

#[test]
fn denied_reads_look_missing_and_denied_writes_are_forbidden() {
    assert!(authz::require(Decision::Allow, Operation::Delete).is_ok());
    assert!(matches!(
        authz::require(Decision::Deny, Operation::Select),
        Err(AppError::NotFound)
    ));
    for op in [Operation::Insert, Operation::Update, Operation::Delete] {
        assert!(matches!(
            authz::require(Decision::Deny, op),
            Err(AppError::Forbidden)
        ));
    }
}

#[test]
fn anonymous_restaurant_scope_only_selects_active_rows() {
    let sql = Restaurants::find()
        .filter(authz::restaurant_scope(None))
        .build(DbBackend::Postgres)
        .to_string();
    let filter = sql.split(" WHERE ").nth(1).unwrap_or_default();
    assert!(filter.contains(r#""is_active" = TRUE"#), "{sql}");
    assert!(!filter.contains("seller_id"), "{sql}");
}

#[test]
fn signed_in_scopes_include_owned_rows() {
    let owner = seller();

    let sql = Restaurants::find()
        .filter(authz::restaurant_scope(Some(&owner)))
        .build(DbBackend::Postgres)
        .to_string();
    assert!(sql.contains(&owner.user_id.to_string()), "{sql}");
    assert!(sql.contains(" OR "), "{sql}");

    let sql = Dishes::find()
        .filter(authz::dish_scope(Some(&owner)))
        .build(DbBackend::Postgres)
        .to_string();
    assert!(sql.contains(r#""is_available" = TRUE"#), "{sql}");
    assert!(sql.contains(&owner.user_id.to_string()), "{sql}");

    let sql = Orders::find()
        .filter(authz::order_scope(&owner))
        .build(DbBackend::Postgres)
        .to_string();
    assert!(sql.contains(r#""customer_id""#), "{sql}");
    assert!(sql.contains(r#""restaurant_id" IN (SELECT"#), "{sql}");
}
