use serde::{Deserialize, Serialize};

use stockwise_core::{DomainError, DomainResult, Entity, ProductId};

/// Apply a signed delta to an on-hand quantity, flooring at zero.
///
/// The clamp is lossy: `clamp_quantity(clamp_quantity(q, d), -d)` is only `q`
/// when the first step did not hit zero.
pub fn clamp_quantity(current: i64, delta: i64) -> i64 {
    current.saturating_add(delta).max(0)
}

/// Outcome of one ledger adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub before: i64,
    pub delta: i64,
    pub after: i64,
}

impl StockChange {
    /// True when the floor at zero swallowed part of the delta.
    pub fn clamped(&self) -> bool {
        self.before.saturating_add(self.delta) < 0
    }

    /// Quantity lost to the clamp (0 when the delta applied in full).
    pub fn shortfall(&self) -> i64 {
        if self.clamped() {
            -(self.before.saturating_add(self.delta))
        } else {
            0
        }
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    /// Price in smallest currency unit (e.g. cents).
    pub unit_price: i64,
    /// Opening stock.
    pub quantity: i64,
    #[serde(default)]
    pub description: String,
}

/// Patch of the non-quantity fields. Stock never changes through this path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    pub name: Option<String>,
    pub unit_price: Option<i64>,
    pub description: Option<String>,
}

/// A Product Ledger entry, as persisted in the `products` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: ProductId,
    name: String,
    unit_price: i64,
    quantity: i64,
    #[serde(default)]
    description: String,
}

impl Product {
    pub fn create(id: ProductId, input: NewProduct) -> DomainResult<Self> {
        validate_name(&input.name)?;
        validate_price(input.unit_price)?;
        if input.quantity < 0 {
            return Err(DomainError::validation("opening quantity cannot be negative"));
        }

        Ok(Self {
            id,
            name: input.name.trim().to_string(),
            unit_price: input.unit_price,
            quantity: input.quantity,
            description: input.description,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit_price(&self) -> i64 {
        self.unit_price
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }

    /// Move stock by `delta`, flooring at zero.
    pub fn apply_delta(&mut self, delta: i64) -> StockChange {
        let before = self.quantity;
        self.quantity = clamp_quantity(before, delta);
        StockChange {
            before,
            delta,
            after: self.quantity,
        }
    }

    /// Overwrite name/price/description. Quantity is left alone.
    pub fn update_details(&mut self, details: ProductDetails) -> DomainResult<()> {
        if let Some(name) = &details.name {
            validate_name(name)?;
        }
        if let Some(price) = details.unit_price {
            validate_price(price)?;
        }

        if let Some(name) = details.name {
            self.name = name.trim().to_string();
        }
        if let Some(price) = details.unit_price {
            self.unit_price = price;
        }
        if let Some(description) = details.description {
            self.description = description;
        }
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn validate_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("product name cannot be empty"));
    }
    Ok(())
}

fn validate_price(price: i64) -> DomainResult<()> {
    if price < 0 {
        return Err(DomainError::validation("unit price cannot be negative"));
    }
    Ok(())
}
