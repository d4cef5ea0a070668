//! Transition Engine - Validates and applies every storefront transition
//!
//! The catalog, every buyer's escrow list and the audit trail live in one
//! [`LedgerState`] behind a single `RwLock`. Each command holds the write
//! guard from its first check until its last mutation, custody call
//! included, so transitions apply one at a time in a single global order and
//! the inventory check and decrement of a purchase are indivisible. Queries
//! take the read guard and hand out cloned snapshots.
//!
//! Every check runs before any mutation. Custody is called only after all
//! checks pass and local state is mutated only after custody succeeds, so a
//! failing operation leaves no trace.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    catalog::Catalog,
    error::StorefrontError,
    escrow_ledger::EscrowLedger,
    models::{
        Amount, Escrow, EscrowIndex, EscrowState, Identity, LedgerEvent, LedgerEventKind, Product,
        ProductId,
    },
    settlement::SettlementAsset,
    EscrowResult,
};

/// Configuration for the transition engine
#[derive(Debug, Clone)]
pub struct TransitionEngineConfig {
    /// Identity allowed to add products
    pub owner: Identity,
    /// Recipient of released escrow funds
    pub seller: Identity,
    /// Time after purchase before a refund may be requested
    pub refund_window: Duration,
}

impl Default for TransitionEngineConfig {
    fn default() -> Self {
        Self {
            owner: Identity::from("owner"),
            seller: Identity::from("owner"),
            refund_window: crate::models::refund_window(),
        }
    }
}

/// All mutable shared state, written only by the engine
#[derive(Debug)]
struct LedgerState {
    catalog: Catalog,
    escrows: EscrowLedger,
    events: Vec<LedgerEvent>,
}

impl LedgerState {
    fn record_event(
        &mut self,
        kind: LedgerEventKind,
        actor: &Identity,
        escrow: Option<&Escrow>,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) {
        let event = LedgerEvent {
            id: Uuid::new_v4(),
            sequence: self.events.len() as u64,
            kind,
            actor: actor.clone(),
            buyer: escrow.map(|e| e.buyer.clone()),
            product_id: Some(product_id),
            escrow_index: escrow.map(|e| e.index),
            amount: escrow.map(|e| e.amount),
            recorded_at: now,
        };

        self.events.push(event);
    }
}

/// Summary of how settlement is wired, for presentation layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementInfo {
    pub owner: Identity,
    pub seller: Identity,
    pub refund_window_secs: i64,
}

/// Single entry point for storefront transitions
pub struct TransitionEngine {
    config: TransitionEngineConfig,
    state: Arc<RwLock<LedgerState>>,
    custody: Arc<dyn SettlementAsset>,
}

impl TransitionEngine {
    /// Create a new engine with an empty catalog and ledger
    pub fn new(config: TransitionEngineConfig, custody: Arc<dyn SettlementAsset>) -> Self {
        let state = LedgerState {
            catalog: Catalog::new(config.owner.clone()),
            escrows: EscrowLedger::new(),
            events: Vec::new(),
        };

        Self {
            config,
            state: Arc::new(RwLock::new(state)),
            custody,
        }
    }

    /// List a new product (owner only)
    pub async fn add_product(
        &self,
        caller: &Identity,
        name: &str,
        unit_price: Amount,
        inventory: u64,
        now: DateTime<Utc>,
    ) -> EscrowResult<Product> {
        let mut state = self.state.write().await;

        let id = state
            .catalog
            .add_product(caller, name, unit_price, inventory)
            .map_err(|e| {
                warn!("Rejected product '{}' from {}: {}", name, caller, e);
                e
            })?;
        let product = state.catalog.get_product(id)?.clone();

        state.record_event(LedgerEventKind::ProductAdded, caller, None, id, now);

        info!(
            "Added product {} '{}' (price {}, inventory {})",
            id, product.name, unit_price, inventory
        );

        Ok(product)
    }

    /// Buy `quantity` units, locking payment in escrow
    pub async fn purchase(
        &self,
        buyer: &Identity,
        product_id: ProductId,
        quantity: u64,
        now: DateTime<Utc>,
    ) -> EscrowResult<Escrow> {
        info!(
            "Purchase of {} x product {} by {}",
            quantity, product_id, buyer
        );

        let mut state = self.state.write().await;

        let (amount, deadline) = state
            .catalog
            .get_product(product_id)
            .and_then(|product| self.validate_purchase(product, quantity, now))
            .map_err(|e| {
                warn!("Rejected purchase by {}: {}", buyer, e);
                e
            })?;

        // Nothing has been mutated yet; a custody failure leaves no trace.
        self.custody.lock(buyer, amount).await.map_err(|e| {
            warn!("Payment of {} by {} failed: {}", amount, buyer, e);
            e
        })?;

        state.catalog.take_inventory(product_id, quantity)?;
        let index = state
            .escrows
            .record_purchase(buyer, product_id, quantity, amount, now, deadline);
        let escrow = state.escrows.get(buyer, index)?.clone();

        state.record_event(
            LedgerEventKind::Purchased,
            buyer,
            Some(&escrow),
            product_id,
            now,
        );

        info!(
            "Escrow {} created for {}: {} locked until {}",
            index, buyer, amount, escrow.deadline
        );

        Ok(escrow)
    }

    /// Confirm delivery, releasing the escrowed amount to the seller.
    /// Allowed at any time, deadline or not, while the escrow is open.
    pub async fn confirm_delivery(
        &self,
        caller: &Identity,
        buyer: &Identity,
        index: EscrowIndex,
        now: DateTime<Utc>,
    ) -> EscrowResult<Escrow> {
        info!("Confirming delivery of escrow {} for {}", index, buyer);

        let mut state = self.state.write().await;

        let (amount, product_id) = state
            .escrows
            .get(buyer, index)
            .and_then(|escrow| {
                self.validate_open_escrow(caller, escrow, EscrowState::can_confirm)?;
                Ok((escrow.amount, escrow.product_id))
            })
            .map_err(|e| {
                warn!("Rejected delivery confirmation by {}: {}", caller, e);
                e
            })?;

        // The delivered flag is set only once the seller has been paid.
        self.custody
            .release(&self.config.seller, amount)
            .await
            .map_err(|e| {
                warn!(
                    "Release of {} to {} failed: {}",
                    amount, self.config.seller, e
                );
                e
            })?;

        let escrow = state.escrows.mark_delivered(buyer, index)?.clone();
        state.record_event(
            LedgerEventKind::DeliveryConfirmed,
            caller,
            Some(&escrow),
            product_id,
            now,
        );

        info!(
            "Delivered escrow {} for {}: {} released to {}",
            index, buyer, amount, self.config.seller
        );

        Ok(escrow)
    }

    /// Refund an open escrow whose deadline has passed
    pub async fn refund(
        &self,
        caller: &Identity,
        buyer: &Identity,
        index: EscrowIndex,
        now: DateTime<Utc>,
    ) -> EscrowResult<Escrow> {
        info!("Refund requested for escrow {} of {}", index, buyer);

        let mut state = self.state.write().await;

        let (amount, product_id) = state
            .escrows
            .get(buyer, index)
            .and_then(|escrow| {
                self.validate_open_escrow(caller, escrow, EscrowState::can_refund)?;
                Self::validate_deadline(escrow, now)?;
                Ok((escrow.amount, escrow.product_id))
            })
            .map_err(|e| {
                warn!("Rejected refund by {}: {}", caller, e);
                e
            })?;

        self.custody.restore(buyer, amount).await.map_err(|e| {
            warn!("Restore of {} to {} failed: {}", amount, buyer, e);
            e
        })?;

        let escrow = state.escrows.mark_refunded(buyer, index)?.clone();
        state.record_event(
            LedgerEventKind::Refunded,
            caller,
            Some(&escrow),
            product_id,
            now,
        );

        info!("Refunded escrow {} for {}: {} returned", index, buyer, amount);

        Ok(escrow)
    }

    /// Get a product by id
    pub async fn get_product(&self, id: ProductId) -> EscrowResult<Product> {
        debug!("Looking up product {}", id);
        self.state.read().await.catalog.get_product(id).cloned()
    }

    /// All products in id order
    pub async fn list_products(&self) -> Vec<Product> {
        self.state.read().await.catalog.list_products().to_vec()
    }

    pub async fn product_count(&self) -> u64 {
        self.state.read().await.catalog.product_count()
    }

    /// A buyer's escrows in creation order
    pub async fn list_escrows(&self, buyer: &Identity) -> Vec<Escrow> {
        debug!("Listing escrows for {}", buyer);
        self.state.read().await.escrows.list_escrows(buyer)
    }

    /// Audit trail of accepted transitions, in global order
    pub async fn events(&self) -> Vec<LedgerEvent> {
        self.state.read().await.events.clone()
    }

    pub fn settlement_info(&self) -> SettlementInfo {
        SettlementInfo {
            owner: self.config.owner.clone(),
            seller: self.config.seller.clone(),
            refund_window_secs: self.config.refund_window.num_seconds(),
        }
    }

    /// Check quantity, stock and totals, returning the amount to escrow and
    /// its refund deadline
    fn validate_purchase(
        &self,
        product: &Product,
        quantity: u64,
        now: DateTime<Utc>,
    ) -> EscrowResult<(Amount, DateTime<Utc>)> {
        if quantity == 0 {
            return Err(StorefrontError::invalid_argument(
                "Quantity must be at least 1",
            ));
        }

        if quantity > product.inventory {
            return Err(StorefrontError::InsufficientInventory {
                product_id: product.id,
                requested: quantity,
                available: product.inventory,
            });
        }

        let amount = product
            .unit_price
            .checked_mul(Amount::from(quantity))
            .ok_or_else(|| {
                StorefrontError::invalid_argument(format!(
                    "Total for {} x {} overflows",
                    quantity, product.unit_price
                ))
            })?;

        let deadline = now
            .checked_add_signed(self.config.refund_window)
            .ok_or_else(|| {
                StorefrontError::invalid_argument(format!(
                    "Refund deadline after {} is out of range",
                    now
                ))
            })?;

        Ok((amount, deadline))
    }

    /// Escrow must still allow the transition and belong to the caller
    fn validate_open_escrow(
        &self,
        caller: &Identity,
        escrow: &Escrow,
        allowed: fn(&EscrowState) -> bool,
    ) -> EscrowResult<()> {
        if !allowed(&escrow.state()) {
            return Err(StorefrontError::AlreadyFinalized {
                buyer: escrow.buyer.clone(),
                index: escrow.index,
                state: escrow.state(),
            });
        }

        if caller != &escrow.buyer {
            return Err(StorefrontError::unauthorized(format!(
                "Only buyer {} may settle escrow {}",
                escrow.buyer, escrow.index
            )));
        }

        Ok(())
    }

    fn validate_deadline(escrow: &Escrow, now: DateTime<Utc>) -> EscrowResult<()> {
        if !escrow.deadline_reached(now) {
            return Err(StorefrontError::DeadlineNotReached {
                deadline: escrow.deadline,
            });
        }

        Ok(())
    }
}
