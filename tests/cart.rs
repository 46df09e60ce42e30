use restaurant_ordering_api::{
    cart::{Cart, CartLine, CartStore},
    domain::order_total,
    dto::{
        cart::CartView,
        dishes::{MAX_PRICE, validate_price},
        orders::OrderLineRequest,
    },
    error::AppError,
    services::order_service::merge_lines,
};
use uuid::Uuid;

fn line(restaurant_id: Uuid, dish_id: Uuid, unit_price: i64, quantity: i32) -> CartLine {
    CartLine {
        dish_id,
        restaurant_id,
        name: "Dan Dan Noodles".into(),
        unit_price,
        quantity,
    }
}

#[test]
fn order_total_multiplies_and_sums() {
    assert_eq!(order_total([(999, 2), (500, 1)]).ok(), Some(2498));
    assert_eq!(order_total(Vec::new()).ok(), Some(0));
}

#[test]
fn order_total_rejects_bad_lines() {
    assert!(matches!(order_total([(999, 0)]), Err(AppError::BadRequest(_))));
    assert!(matches!(order_total([(-1, 1)]), Err(AppError::BadRequest(_))));
    assert!(matches!(
        order_total([(i64::MAX, 2)]),
        Err(AppError::BadRequest(_))
    ));
}

#[test]
fn merge_lines_sums_repeated_dishes() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let merged = merge_lines(&[
        OrderLineRequest { dish_id: a, quantity: 1 },
        OrderLineRequest { dish_id: b, quantity: 3 },
        OrderLineRequest { dish_id: a, quantity: 2 },
    ])
    .expect("valid lines");
    assert_eq!(merged, vec![(a, 3), (b, 3)]);
}

#[test]
fn merge_lines_rejects_empty_and_zero_quantity() {
    assert!(matches!(merge_lines(&[]), Err(AppError::BadRequest(_))));
    assert!(matches!(
        merge_lines(&[OrderLineRequest {
            dish_id: Uuid::new_v4(),
            quantity: 0
        }]),
        Err(AppError::BadRequest(_))
    ));
}

#[test]
fn cart_keeps_one_restaurant() {
    let restaurant = Uuid::new_v4();
    let mut cart = Cart::default();
    cart.add(line(restaurant, Uuid::new_v4(), 999, 2)).expect("first add");
    cart.add(line(restaurant, Uuid::new_v4(), 500, 1)).expect("same restaurant");

    let err = cart.add(line(Uuid::new_v4(), Uuid::new_v4(), 100, 1));
    assert!(matches!(err, Err(AppError::BadRequest(_))));
    assert_eq!(cart.lines().len(), 2);
    assert_eq!(cart.restaurant_id(), Some(restaurant));
    assert_eq!(cart.subtotal(), 2498);
}

#[test]
fn cart_add_sums_quantities_and_rejects_zero() {
    let restaurant = Uuid::new_v4();
    let dish = Uuid::new_v4();
    let mut cart = Cart::default();
    cart.add(line(restaurant, dish, 999, 1)).expect("add");
    cart.add(line(restaurant, dish, 999, 2)).expect("add again");
    assert_eq!(cart.lines().len(), 1);
    assert_eq!(cart.lines()[0].quantity, 3);

    assert!(matches!(
        cart.add(line(restaurant, dish, 999, 0)),
        Err(AppError::BadRequest(_))
    ));
}

#[test]
fn cart_set_quantity_zero_removes_line() {
    let restaurant = Uuid::new_v4();
    let dish = Uuid::new_v4();
    let mut cart = Cart::default();
    cart.add(line(restaurant, dish, 999, 2)).expect("add");

    cart.set_quantity(dish, 5).expect("set");
    assert_eq!(cart.subtotal(), 4995);

    assert!(matches!(cart.set_quantity(dish, -1), Err(AppError::BadRequest(_))));
    cart.set_quantity(dish, 0).expect("remove by zero");
    assert!(cart.is_empty());
    assert!(matches!(cart.remove(dish), Err(AppError::NotFound)));
}

#[tokio::test]
async fn store_drops_cart_when_emptied() {
    let store = CartStore::default();
    let customer = Uuid::new_v4();
    let restaurant = Uuid::new_v4();
    let dish = Uuid::new_v4();

    assert!(store.get(customer).await.is_empty());
    store.add(customer, line(restaurant, dish, 999, 1)).await.expect("add");
    assert_eq!(store.session_count().await, 1);

    let cart = store.remove(customer, dish).await.expect("remove");
    assert!(cart.is_empty());
    assert_eq!(store.session_count().await, 0);
    assert!(matches!(
        store.set_quantity(customer, dish, 2).await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn failed_add_does_not_leave_empty_session() {
    let store = CartStore::default();
    let customer = Uuid::new_v4();

    let result = store.add(customer, line(Uuid::new_v4(), Uuid::new_v4(), 999, 0)).await;
    assert!(result.is_err());
    assert_eq!(store.session_count().await, 0);
}

#[tokio::test]
async fn carts_are_isolated_per_customer() {
    let store = CartStore::default();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let restaurant = Uuid::new_v4();

    store.add(alice, line(restaurant, Uuid::new_v4(), 999, 1)).await.expect("add");
    assert!(store.get(bob).await.is_empty());
    assert!(!store.clear(bob).await);
    assert!(store.clear(alice).await);
    assert!(store.get(alice).await.is_empty());
}

#[tokio::test]
async fn clear_if_keeps_cart_edited_during_checkout() {
    let store = CartStore::default();
    let customer = Uuid::new_v4();
    let restaurant = Uuid::new_v4();

    let snapshot = store
        .add(customer, line(restaurant, Uuid::new_v4(), 999, 1))
        .await
        .expect("add");
    store
        .add(customer, line(restaurant, Uuid::new_v4(), 500, 1))
        .await
        .expect("add during checkout");

    assert!(!store.clear_if(customer, &snapshot).await);
    assert_eq!(store.get(customer).await.lines().len(), 2);

    let current = store.get(customer).await;
    assert!(store.clear_if(customer, &current).await);
    assert_eq!(store.session_count().await, 0);
}

#[test]
fn cart_rejects_lines_whose_total_overflows() {
    let restaurant = Uuid::new_v4();
    let dish = Uuid::new_v4();
    let mut cart = Cart::default();

    let huge = line(restaurant, dish, i64::MAX / 2 + 1, 2);
    assert!(matches!(cart.add(huge), Err(AppError::BadRequest(_))));
    assert!(cart.is_empty());

    cart.add(line(restaurant, dish, i64::MAX / 2 + 1, 1)).expect("fits once");
    assert!(matches!(
        cart.add(line(restaurant, Uuid::new_v4(), i64::MAX / 2 + 1, 1)),
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(cart.set_quantity(dish, 2), Err(AppError::BadRequest(_))));
    assert_eq!(cart.lines().len(), 1);
    assert_eq!(cart.lines()[0].quantity, 1);
    assert_eq!(cart.subtotal(), i64::MAX / 2 + 1);
}

#[tokio::test]
async fn store_keeps_cart_view_readable_after_overflowing_add() {
    let store = CartStore::default();
    let customer = Uuid::new_v4();
    let restaurant = Uuid::new_v4();

    let result = store
        .add(customer, line(restaurant, Uuid::new_v4(), i64::MAX / 2 + 1, 2))
        .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert_eq!(store.session_count().await, 0);

    store
        .add(customer, line(restaurant, Uuid::new_v4(), 999, 2))
        .await
        .expect("normal add");
    let view = CartView::from(&store.get(customer).await);
    assert_eq!(view.subtotal, 1998);
}

#[test]
fn dish_price_has_an_upper_bound() {
    assert!(validate_price(0).is_ok());
    assert!(validate_price(MAX_PRICE).is_ok());
    assert!(matches!(validate_price(-1), Err(AppError::BadRequest(_))));
    assert!(matches!(
        validate_price(MAX_PRICE + 1),
        Err(AppError::BadRequest(_))
    ));
}
