//! Order price arithmetic. Amounts are integer cents.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TotalsError {
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("{0} cannot be negative")]
    Negative(&'static str),
    #[error("order total is too large")]
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub items_price: i64,
    pub tax_price: i64,
    pub shipping_price: i64,
    pub total_price: i64,
}

impl OrderTotals {
    /// `lines` yields `(unit_price, quantity)` pairs.
    pub fn compute<I>(lines: I, tax_price: i64, shipping_price: i64) -> Result<Self, TotalsError>
    where
        I: IntoIterator<Item = (i64, i32)>,
    {
        if tax_price < 0 {
            return Err(TotalsError::Negative("taxPrice"));
        }
        if shipping_price < 0 {
            return Err(TotalsError::Negative("shippingPrice"));
        }

        let items_price = items_price(lines)?;
        let total_price = items_price
            .checked_add(tax_price)
            .and_then(|sum| sum.checked_add(shipping_price))
            .ok_or(TotalsError::Overflow)?;

        Ok(Self {
            items_price,
            tax_price,
            shipping_price,
            total_price,
        })
    }
}

pub fn items_price<I>(lines: I) -> Result<i64, TotalsError>
where
    I: IntoIterator<Item = (i64, i32)>,
{
    lines.into_iter().try_fold(0i64, |acc, (price, quantity)| {
        if quantity < 1 {
            return Err(TotalsError::InvalidQuantity);
        }
        if price < 0 {
            return Err(TotalsError::Negative("price"));
        }
        price
            .checked_mul(i64::from(quantity))
            .and_then(|line| acc.checked_add(line))
            .ok_or(TotalsError::Overflow)
    })
}
