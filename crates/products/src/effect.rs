//! Pure planning of ledger adjustments.
//!
//! A reconciliation step produces an ordered list of [`StockEffect`]s
//! (reversals of the old line set first, then the new lines). Planning folds
//! them, in order, over the quantities read from the ledger, flooring at zero
//! after every step. Effects on products that were not found are collected
//! as skipped instead of failing the plan.

use std::collections::{BTreeMap, HashMap};

use stockwise_core::ProductId;

use crate::product::{StockChange, clamp_quantity};

/// Why an effect is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectOrigin {
    /// Undoing what an earlier version of a document did.
    Reversal,
    /// Applying the current version of a document.
    Application,
}

/// One signed quantity movement for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockEffect {
    pub product_id: ProductId,
    pub delta: i64,
    pub origin: EffectOrigin,
}

impl StockEffect {
    pub fn apply(product_id: ProductId, delta: i64) -> Self {
        Self {
            product_id,
            delta,
            origin: EffectOrigin::Application,
        }
    }

    pub fn reverse(product_id: ProductId, delta: i64) -> Self {
        Self {
            product_id,
            delta,
            origin: EffectOrigin::Reversal,
        }
    }
}

/// Net outcome for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAdjustment {
    pub product_id: ProductId,
    pub before: i64,
    pub after: i64,
    pub steps: Vec<StockChange>,
}

impl PlannedAdjustment {
    pub fn clamped(&self) -> bool {
        self.steps.iter().any(StockChange::clamped)
    }

    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

/// Result of folding effects over ledger quantities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectPlan {
    adjustments: BTreeMap<ProductId, PlannedAdjustment>,
    skipped: Vec<StockEffect>,
}

impl EffectPlan {
    /// Adjustments keyed by product, in product id order.
    pub fn adjustments(&self) -> impl Iterator<Item = &PlannedAdjustment> {
        self.adjustments.values()
    }

    pub fn adjustment(&self, product_id: &ProductId) -> Option<&PlannedAdjustment> {
        self.adjustments.get(product_id)
    }

    /// Effects dropped because their product was not in the ledger.
    pub fn skipped(&self) -> &[StockEffect] {
        &self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.adjustments.is_empty() && self.skipped.is_empty()
    }
}

/// Fold `effects` in order over `current` (product id -> on-hand quantity).
pub fn plan_effects(
    current: &HashMap<ProductId, i64>,
    effects: impl IntoIterator<Item = StockEffect>,
) -> EffectPlan {
    let mut plan = EffectPlan::default();

    for effect in effects {
        let Some(&base) = current.get(&effect.product_id) else {
            plan.skipped.push(effect);
            continue;
        };

        let entry = plan
            .adjustments
            .entry(effect.product_id)
            .or_insert_with(|| PlannedAdjustment {
                product_id: effect.product_id,
                before: base,
                after: base,
                steps: Vec::new(),
            });

        let before = entry.after;
        let after = clamp_quantity(before, effect.delta);
        entry.steps.push(StockChange {
            before,
            delta: effect.delta,
            after,
        });
        entry.after = after;
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn effects_on_one_product_are_applied_sequentially() {
        let p = ProductId::new();
        let current = HashMap::from([(p, 5)]);

        // Reverse an old outgoing of 8, then apply a new outgoing of 2.
        let plan = plan_effects(
            &current,
            [StockEffect::reverse(p, 8), StockEffect::apply(p, -2)],
        );

        let adj = plan.adjustment(&p).unwrap();
        assert_eq!(adj.before, 5);
        assert_eq!(adj.after, 11);
        assert_eq!(adj.steps.len(), 2);
        assert!(!adj.clamped());
    }

    #[test]
    fn clamp_is_evaluated_after_each_step() {
        let p = ProductId::new();
        let current = HashMap::from([(p, 5)]);

        let plan = plan_effects(&current, [StockEffect::apply(p, -8), StockEffect::apply(p, 8)]);

        let adj = plan.adjustment(&p).unwrap();
        assert_eq!(adj.after, 8);
        assert!(adj.clamped());
    }

    #[test]
    fn missing_products_are_skipped_not_fatal() {
        let known = ProductId::new();
        let gone = ProductId::new();
        let current = HashMap::from([(known, 1)]);

        let plan = plan_effects(
            &current,
            [StockEffect::reverse(gone, 4), StockEffect::apply(known, 2)],
        );

        assert_eq!(plan.skipped(), &[StockEffect::reverse(gone, 4)]);
        assert_eq!(plan.adjustment(&known).unwrap().after, 3);
        assert!(plan.adjustment(&gone).is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: applying effects then their reversals nets to zero when
        /// no step clamps.
        #[test]
        fn apply_then_reverse_is_identity_without_clamp(
            start in 1_000i64..10_000,
            deltas in prop::collection::vec(-100i64..100, 1..10)
        ) {
            let p = ProductId::new();
            let current = HashMap::from([(p, start)]);
            let forward = deltas.iter().map(|d| StockEffect::apply(p, *d));
            let backward = deltas.iter().map(|d| StockEffect::reverse(p, -*d));

            let plan = plan_effects(&current, forward.chain(backward));
            let adj = plan.adjustment(&p).unwrap();

            prop_assert!(!adj.clamped());
            prop_assert_eq!(adj.after, start);
        }

        /// Property: the planned quantity is never negative.
        #[test]
        fn planned_quantity_never_negative(
            start in 0i64..50,
            deltas in prop::collection::vec(-100i64..100, 1..10)
        ) {
            let p = ProductId::new();
            let current = HashMap::from([(p, start)]);
            let plan = plan_effects(&current, deltas.into_iter().map(|d| StockEffect::apply(p, d)));
            for step in &plan.adjustment(&p).unwrap().steps {
                prop_assert!(step.after >= 0);
            }
        }
    }
}
