use serde::{Deserialize, Serialize};

use stockwise_core::{DomainError, DomainResult, ProductId};

/// A voucher line as submitted by a caller, before pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineInput {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g. cents).
    pub unit_price: i64,
}

impl LineInput {
    pub fn new(product_id: ProductId, quantity: i64, unit_price: i64) -> Self {
        Self {
            product_id,
            quantity,
            unit_price,
        }
    }
}

/// A committed voucher line. `subtotal == quantity * unit_price` always.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementLine {
    product_id: ProductId,
    /// Product name as it was when the line was recorded.
    product_name: String,
    quantity: i64,
    unit_price: i64,
    subtotal: i64,
}

impl MovementLine {
    pub fn priced(input: &LineInput, product_name: impl Into<String>) -> DomainResult<Self> {
        validate_line(input)?;
        let subtotal = subtotal(input.quantity, input.unit_price)?;
        Ok(Self {
            product_id: input.product_id,
            product_name: product_name.into(),
            quantity: input.quantity,
            unit_price: input.unit_price,
            subtotal,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_price(&self) -> i64 {
        self.unit_price
    }

    pub fn subtotal(&self) -> i64 {
        self.subtotal
    }

    pub(crate) fn is_consistent(&self) -> bool {
        self.quantity.checked_mul(self.unit_price) == Some(self.subtotal)
    }
}

/// Validate a whole submitted line set before any IO happens.
pub fn validate_line_inputs(lines: &[LineInput]) -> DomainResult<()> {
    if lines.is_empty() {
        return Err(DomainError::validation("a voucher needs at least one line"));
    }
    let mut total: i64 = 0;
    for line in lines {
        validate_line(line)?;
        total = total
            .checked_add(subtotal(line.quantity, line.unit_price)?)
            .ok_or_else(|| DomainError::validation("voucher total overflows"))?;
    }
    Ok(())
}

fn validate_line(line: &LineInput) -> DomainResult<()> {
    if line.quantity <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    if line.unit_price < 0 {
        return Err(DomainError::validation("unit price cannot be negative"));
    }
    Ok(())
}

fn subtotal(quantity: i64, unit_price: i64) -> DomainResult<i64> {
    quantity
        .checked_mul(unit_price)
        .ok_or_else(|| DomainError::validation("line subtotal overflows"))
}
