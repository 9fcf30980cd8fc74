//! Shopping cart transitions.
//!
//! Each transition mutates the in-memory [`Cart`] and returns the single
//! [`CartChange`] that persistence has to apply, so the rules can be
//! exercised without a database.

use thiserror::Error;
use uuid::Uuid;

use super::totals::{self, TotalsError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    Upsert { product_id: Uuid, quantity: i32 },
    Remove { product_id: Uuid },
    Clear,
    Unchanged,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error("Quantity is too large")]
    QuantityTooLarge,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn quantity_of(&self, product_id: Uuid) -> Option<i32> {
        self.lines
            .iter()
            .find(|line| line.product_id == product_id)
            .map(|line| line.quantity)
    }

    /// Adding a product already in the cart increases its quantity.
    pub fn add(
        &mut self,
        product_id: Uuid,
        quantity: i32,
        unit_price: i64,
    ) -> Result<CartChange, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = line
                .quantity
                .checked_add(quantity)
                .ok_or(CartError::QuantityTooLarge)?;
            line.unit_price = unit_price;
            return Ok(CartChange::Upsert {
                product_id,
                quantity: line.quantity,
            });
        }

        self.lines.push(CartLine {
            product_id,
            quantity,
            unit_price,
        });
        Ok(CartChange::Upsert {
            product_id,
            quantity,
        })
    }

    /// A quantity of zero or less removes the line. Unknown products are
    /// left alone.
    pub fn set_quantity(&mut self, product_id: Uuid, quantity: i32) -> CartChange {
        if quantity <= 0 {
            return self.remove(product_id);
        }
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) if line.quantity == quantity => CartChange::Unchanged,
            Some(line) => {
                line.quantity = quantity;
                CartChange::Upsert {
                    product_id,
                    quantity,
                }
            }
            None => CartChange::Unchanged,
        }
    }

    pub fn remove(&mut self, product_id: Uuid) -> CartChange {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id != product_id);
        if self.lines.len() == before {
            CartChange::Unchanged
        } else {
            CartChange::Remove { product_id }
        }
    }

    pub fn clear(&mut self) -> CartChange {
        if self.lines.is_empty() {
            return CartChange::Unchanged;
        }
        self.lines.clear();
        CartChange::Clear
    }

    pub fn total_items(&self) -> i64 {
        self.lines.iter().map(|line| i64::from(line.quantity)).sum()
    }

    pub fn subtotal(&self) -> Result<i64, TotalsError> {
        totals::items_price(self.lines.iter().map(|l| (l.unit_price, l.quantity)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_new_line() {
        let mut cart = Cart::default();
        let id = Uuid::new_v4();
        let change = cart.add(id, 2, 1000).unwrap();
        assert_eq!(
            change,
            CartChange::Upsert {
                product_id: id,
                quantity: 2
            }
        );
        assert_eq!(cart.total_items(), 2);
        assert_eq!(cart.subtotal(), Ok(2000));
    }

    #[test]
    fn add_existing_line_merges() {
        let mut cart = Cart::default();
        let id = Uuid::new_v4();
        cart.add(id, 1, 500).unwrap();
        let change = cart.add(id, 3, 500).unwrap();
        assert_eq!(
            change,
            CartChange::Upsert {
                product_id: id,
                quantity: 4
            }
        );
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn add_rejects_non_positive_quantity() {
        let mut cart = Cart::default();
        assert_eq!(
            cart.add(Uuid::new_v4(), 0, 100),
            Err(CartError::InvalidQuantity)
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn zero_quantity_removes_line() {
        let mut cart = Cart::default();
        let id = Uuid::new_v4();
        cart.add(id, 2, 100).unwrap();
        assert_eq!(cart.set_quantity(id, 0), CartChange::Remove { product_id: id });
        assert!(cart.is_empty());
    }

    #[test]
    fn set_quantity_on_unknown_product_is_noop() {
        let mut cart = Cart::default();
        assert_eq!(cart.set_quantity(Uuid::new_v4(), 3), CartChange::Unchanged);
    }

    #[test]
    fn clear_empties_cart() {
        let mut cart = Cart::default();
        cart.add(Uuid::new_v4(), 1, 100).unwrap();
        cart.add(Uuid::new_v4(), 1, 200).unwrap();
        assert_eq!(cart.clear(), CartChange::Clear);
        assert_eq!(cart.clear(), CartChange::Unchanged);
    }
}
