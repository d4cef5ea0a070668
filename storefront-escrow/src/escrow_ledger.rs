//! Escrow ledger - append-only escrow lists per buyer
//!
//! Storage only: the transition engine validates quantities, amounts,
//! deadlines and terminal states before calling in here. Indexes are positions in the
//! buyer's list and never move once assigned.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{
    error::StorefrontError,
    models::{Amount, Escrow, EscrowIndex, Identity, ProductId},
    EscrowResult,
};

#[derive(Debug, Clone, Default)]
pub struct EscrowLedger {
    escrows: HashMap<Identity, Vec<Escrow>>,
}

impl EscrowLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new escrow for `buyer` and return its index
    pub fn record_purchase(
        &mut self,
        buyer: &Identity,
        product_id: ProductId,
        quantity: u64,
        amount: Amount,
        now: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> EscrowIndex {
        let list = self.escrows.entry(buyer.clone()).or_default();
        let index = list.len();

        list.push(Escrow {
            index,
            buyer: buyer.clone(),
            product_id,
            quantity,
            amount,
            created_at: now,
            deadline,
            delivered: false,
            refunded: false,
        });

        index
    }

    /// Snapshot of the buyer's escrows in creation order
    pub fn list_escrows(&self, buyer: &Identity) -> Vec<Escrow> {
        self.escrows.get(buyer).cloned().unwrap_or_default()
    }

    pub fn get(&self, buyer: &Identity, index: EscrowIndex) -> EscrowResult<&Escrow> {
        self.escrows
            .get(buyer)
            .and_then(|list| list.get(index))
            .ok_or_else(|| StorefrontError::EscrowNotFound {
                buyer: buyer.clone(),
                index,
            })
    }

    pub fn mark_delivered(&mut self, buyer: &Identity, index: EscrowIndex) -> EscrowResult<&Escrow> {
        let escrow = self.get_mut(buyer, index)?;
        escrow.delivered = true;
        Ok(&*escrow)
    }

    pub fn mark_refunded(&mut self, buyer: &Identity, index: EscrowIndex) -> EscrowResult<&Escrow> {
        let escrow = self.get_mut(buyer, index)?;
        escrow.refunded = true;
        Ok(&*escrow)
    }

    /// Number of escrows across all buyers
    pub fn total_escrows(&self) -> usize {
        self.escrows.values().map(Vec::len).sum()
    }

    fn get_mut(&mut self, buyer: &Identity, index: EscrowIndex) -> EscrowResult<&mut Escrow> {
        self.escrows
            .get_mut(buyer)
            .and_then(|list| list.get_mut(index))
            .ok_or_else(|| StorefrontError::EscrowNotFound {
                buyer: buyer.clone(),
                index,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, models::refund_window};

    fn record(ledger: &mut EscrowLedger, buyer: &Identity, product_id: ProductId) -> EscrowIndex {
        let now = Utc::now();
        ledger.record_purchase(buyer, product_id, 1, 10, now, now + refund_window())
    }

    #[test]
    fn test_indexes_are_per_buyer() {
        let mut ledger = EscrowLedger::default();
        let alice = Identity::from("alice");
        let bob = Identity::from("bob");

        assert_eq!(record(&mut ledger, &alice, 1), 0);
        assert_eq!(record(&mut ledger, &alice, 2), 1);
        assert_eq!(record(&mut ledger, &bob, 1), 0);

        let listed = ledger.list_escrows(&alice);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].product_id, 2);
        assert_eq!(listed[0].deadline, listed[0].created_at + refund_window());
        assert_eq!(ledger.total_escrows(), 3);
    }

    #[test]
    fn test_listing_is_a_snapshot() {
        let mut ledger = EscrowLedger::default();
        let alice = Identity::from("alice");
        record(&mut ledger, &alice, 1);

        let before = ledger.list_escrows(&alice);
        ledger.mark_delivered(&alice, 0).unwrap();

        assert!(!before[0].delivered);
        assert!(ledger.list_escrows(&alice)[0].delivered);
    }

    #[test]
    fn test_mark_out_of_range() {
        let mut ledger = EscrowLedger::default();
        let alice = Identity::from("alice");

        assert!(ledger.list_escrows(&alice).is_empty());
        let err = ledger.mark_refunded(&alice, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
