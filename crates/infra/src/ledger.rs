//! Product Ledger: the per-product on-hand quantity, stored in the
//! `products` collection.
//!
//! Every write is a compare-and-swap on the version that was read, retried
//! on conflict. Quantity changes floor at zero, so a sequence of deltas that
//! nets to zero only restores the starting quantity if no step clamped.

use std::collections::{BTreeSet, HashMap};

use tracing::{info, instrument, warn};

use stockwise_core::ProductId;
use stockwise_products::{EffectPlan, NewProduct, Product, ProductDetails, StockChange};

use crate::collections::PRODUCTS;
use crate::config::StockwiseConfig;
use crate::document_store::{DocumentStore, OrderBy, Versioned, WriteBatch};
use crate::error::{ReconcileError, ReconcileResult};
use crate::retry::with_retry;

#[derive(Debug)]
pub struct ProductLedger<S> {
    store: S,
    max_commit_attempts: u32,
}

impl<S> ProductLedger<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, &StockwiseConfig::default())
    }

    pub fn with_config(store: S, config: &StockwiseConfig) -> Self {
        Self {
            store,
            max_commit_attempts: config.reconciliation.max_commit_attempts,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> ProductLedger<S>
where
    S: DocumentStore,
{
    #[instrument(skip(self), fields(product = %id), err)]
    pub async fn get(&self, id: ProductId) -> ReconcileResult<Product> {
        Ok(self.read(id).await?.value)
    }

    /// All products, by name.
    pub async fn list(&self) -> ReconcileResult<Vec<Product>> {
        Ok(PRODUCTS
            .list(&self.store, Some(OrderBy::asc("name")))
            .await?
            .into_iter()
            .map(|v| v.value)
            .collect())
    }

    #[instrument(skip(self, input), fields(name = %input.name), err)]
    pub async fn create_product(&self, input: NewProduct) -> ReconcileResult<Product> {
        let product = Product::create(ProductId::new(), input)?;
        PRODUCTS.insert_entity(&self.store, &product).await?;
        info!(product = %product.id_typed(), quantity = product.quantity(), "product created");
        Ok(product)
    }

    /// Change name, price or description. The quantity is never touched here.
    #[instrument(skip(self, details), fields(product = %id), err)]
    pub async fn update_details(
        &self,
        id: ProductId,
        details: ProductDetails,
    ) -> ReconcileResult<Product> {
        let details = &details;
        with_retry(self.max_commit_attempts, "update_details", move || async move {
            let mut current = self.read(id).await?;
            current.value.update_details(details.clone())?;
            PRODUCTS
                .replace(&self.store, &current.id, &current.value, current.expected())
                .await?;
            Ok(current.value)
        })
        .await
    }

    /// Read, add `delta` floored at zero, write back.
    #[instrument(skip(self), fields(product = %id), err)]
    pub async fn apply_delta(&self, id: ProductId, delta: i64) -> ReconcileResult<StockChange> {
        let change = with_retry(self.max_commit_attempts, "apply_delta", move || async move {
            let mut current = self.read(id).await?;
            let change = current.value.apply_delta(delta);
            PRODUCTS
                .replace(&self.store, &current.id, &current.value, current.expected())
                .await?;
            Ok(change)
        })
        .await?;

        if change.clamped() {
            warn!(
                product = %id,
                before = change.before,
                delta,
                shortfall = change.shortfall(),
                "stock clamped at zero"
            );
        }
        Ok(change)
    }

    /// Remove a product. Vouchers that reference it are left as they are;
    /// their later reversals skip it.
    #[instrument(skip(self), fields(product = %id), err)]
    pub async fn delete_product(&self, id: ProductId) -> ReconcileResult<()> {
        with_retry(self.max_commit_attempts, "delete_product", move || async move {
            let current = self.read(id).await?;
            PRODUCTS
                .remove(&self.store, &current.id, current.expected())
                .await?;
            Ok(())
        })
        .await?;
        info!(product = %id, "product deleted");
        Ok(())
    }

    async fn read(&self, id: ProductId) -> ReconcileResult<Versioned<Product>> {
        PRODUCTS
            .get(&self.store, &id.key())
            .await?
            .ok_or_else(|| ReconcileError::not_found(format!("product {id}")))
    }
}

/// Products read during one reconciliation attempt, with the versions they
/// were read at. Products that do not exist are simply absent.
#[derive(Debug, Default)]
pub(crate) struct LedgerSnapshot {
    products: HashMap<ProductId, Versioned<Product>>,
}

impl LedgerSnapshot {
    pub(crate) async fn read<S>(
        store: &S,
        ids: impl IntoIterator<Item = ProductId>,
    ) -> ReconcileResult<Self>
    where
        S: DocumentStore + ?Sized,
    {
        let unique: BTreeSet<ProductId> = ids.into_iter().collect();
        let mut products = HashMap::with_capacity(unique.len());
        for id in unique {
            if let Some(found) = PRODUCTS.get(store, &id.key()).await? {
                products.insert(id, found);
            }
        }
        Ok(Self { products })
    }

    pub(crate) fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id).map(|v| &v.value)
    }

    pub(crate) fn require(&self, id: ProductId) -> ReconcileResult<&Product> {
        self.product(id)
            .ok_or_else(|| ReconcileError::not_found(format!("product {id}")))
    }

    pub(crate) fn quantities(&self) -> HashMap<ProductId, i64> {
        self.products
            .iter()
            .map(|(id, v)| (*id, v.value.quantity()))
            .collect()
    }

    /// Stage the planned quantity of every adjusted product, guarded by the
    /// version it was read at.
    pub(crate) fn stage(&self, plan: &EffectPlan, batch: &mut WriteBatch) -> ReconcileResult<()> {
        for adjustment in plan.adjustments() {
            let Some(read) = self.products.get(&adjustment.product_id) else {
                continue;
            };
            let mut product = read.value.clone();
            product.apply_delta(adjustment.after - adjustment.before);
            PRODUCTS.put(batch, &read.id, &product, read.expected())?;
        }
        Ok(())
    }
}
