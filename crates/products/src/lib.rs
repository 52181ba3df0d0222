//! Product module: the Product Ledger entry and its adjustment rules.
//!
//! A product's `quantity` is the on-hand stock level. It only moves through
//! [`Product::apply_delta`] (or the equivalent [`plan_effects`] used by the
//! reconciliation flows), which floors the result at zero.

pub mod effect;
pub mod product;

pub use effect::{EffectOrigin, EffectPlan, PlannedAdjustment, StockEffect, plan_effects};
pub use product::{NewProduct, Product, ProductDetails, StockChange, clamp_quantity};
