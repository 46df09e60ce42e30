//! Per-customer shopping carts.
//!
//! Carts live only in memory for the lifetime of the customer's session: a cart
//! is created by the first add, and dropped when it is cleared, emptied, or
//! checked out. Nothing here touches the database.

use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::order_total,
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CartLine {
    pub dish_id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    /// Price shown when the dish was added; checkout re-reads the current price.
    pub unit_price: i64,
    pub quantity: i32,
}

impl CartLine {
    pub fn line_total(&self) -> i64 {
        self.unit_price.saturating_mul(i64::from(self.quantity))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The restaurant every line belongs to.
    pub fn restaurant_id(&self) -> Option<Uuid> {
        self.lines.first().map(|line| line.restaurant_id)
    }

    /// Never overflows: `add` and `set_quantity` refuse edits whose total would not fit.
    pub fn subtotal(&self) -> i64 {
        self.lines
            .iter()
            .fold(0_i64, |total, line| total.saturating_add(line.line_total()))
    }

    fn checked_subtotal(&self) -> AppResult<i64> {
        order_total(self.lines.iter().map(|l| (l.unit_price, l.quantity)))
    }

    /// Applies `edit` to a copy and keeps it only if the cart total still fits.
    fn commit<F>(&mut self, edit: F) -> AppResult<()>
    where
        F: FnOnce(&mut Cart) -> AppResult<()>,
    {
        let mut next = self.clone();
        edit(&mut next)?;
        next.checked_subtotal()?;
        *self = next;
        Ok(())
    }

    pub fn add(&mut self, line: CartLine) -> AppResult<()> {
        self.commit(|cart| cart.push_line(line))
    }

    fn push_line(&mut self, line: CartLine) -> AppResult<()> {
        if line.quantity <= 0 {
            return Err(AppError::bad_request("quantity must be greater than 0"));
        }
        if let Some(restaurant_id) = self.restaurant_id() {
            if restaurant_id != line.restaurant_id {
                return Err(AppError::bad_request(
                    "cart already holds dishes from another restaurant",
                ));
            }
        }

        match self.lines.iter_mut().find(|l| l.dish_id == line.dish_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| AppError::bad_request("quantity is too large"))?;
                existing.unit_price = line.unit_price;
                existing.name = line.name;
            }
            None => self.lines.push(line),
        }
        Ok(())
    }

    /// Setting a quantity of zero removes the line.
    pub fn set_quantity(&mut self, dish_id: Uuid, quantity: i32) -> AppResult<()> {
        self.commit(|cart| cart.apply_quantity(dish_id, quantity))
    }

    fn apply_quantity(&mut self, dish_id: Uuid, quantity: i32) -> AppResult<()> {
        if quantity < 0 {
            return Err(AppError::bad_request("quantity must not be negative"));
        }
        if quantity == 0 {
            return self.remove(dish_id);
        }
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.dish_id == dish_id)
            .ok_or(AppError::NotFound)?;
        line.quantity = quantity;
        Ok(())
    }

    pub fn remove(&mut self, dish_id: Uuid) -> AppResult<()> {
        let before = self.lines.len();
        self.lines.retain(|l| l.dish_id != dish_id);
        if self.lines.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Carts keyed by customer id.
#[derive(Debug, Clone, Default)]
pub struct CartStore {
    carts: Arc<RwLock<HashMap<Uuid, Cart>>>,
}

impl CartStore {
    /// Snapshot of the customer's cart; empty when no session cart exists.
    pub async fn get(&self, customer_id: Uuid) -> Cart {
        self.carts
            .read()
            .await
            .get(&customer_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn add(&self, customer_id: Uuid, line: CartLine) -> AppResult<Cart> {
        let mut carts = self.carts.write().await;
        let cart = carts.entry(customer_id).or_default();
        let result = cart.add(line);
        let snapshot = cart.clone();
        if snapshot.is_empty() {
            carts.remove(&customer_id);
        }
        result.map(|_| snapshot)
    }

    pub async fn set_quantity(
        &self,
        customer_id: Uuid,
        dish_id: Uuid,
        quantity: i32,
    ) -> AppResult<Cart> {
        self.modify(customer_id, |cart| cart.set_quantity(dish_id, quantity))
            .await
    }

    pub async fn remove(&self, customer_id: Uuid, dish_id: Uuid) -> AppResult<Cart> {
        self.modify(customer_id, |cart| cart.remove(dish_id)).await
    }

    /// Drops the session cart. Returns whether one existed.
    pub async fn clear(&self, customer_id: Uuid) -> bool {
        self.carts.write().await.remove(&customer_id).is_some()
    }

    /// Drops the session cart only if it still matches `expected`, so edits made
    /// while an order was being placed survive.
    pub async fn clear_if(&self, customer_id: Uuid, expected: &Cart) -> bool {
        let mut carts = self.carts.write().await;
        if carts.get(&customer_id) == Some(expected) {
            carts.remove(&customer_id);
            return true;
        }
        false
    }

    pub async fn session_count(&self) -> usize {
        self.carts.read().await.len()
    }

    async fn modify<F>(&self, customer_id: Uuid, f: F) -> AppResult<Cart>
    where
        F: FnOnce(&mut Cart) -> AppResult<()>,
    {
        let mut carts = self.carts.write().await;
        let cart = carts.get_mut(&customer_id).ok_or(AppError::NotFound)?;
        f(cart)?;
        let snapshot = cart.clone();
        if snapshot.is_empty() {
            carts.remove(&customer_id);
        }
        Ok(snapshot)
    }
}
