//! Core data models for the storefront
//!
//! Products, escrow records, the derived escrow state machine and the audit
//! trail of accepted transitions.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sequential product identifier, starting at 1
pub type ProductId = u64;

/// Position of an escrow within its buyer's list
pub type EscrowIndex = usize;

/// Value in the smallest unit of the settlement asset
pub type Amount = u128;

/// Seconds in the default refund window (7 days)
pub const REFUND_WINDOW_SECS: u64 = 7 * 24 * 60 * 60;

/// Time after purchase before a refund may be requested
pub fn refund_window() -> Duration {
    Duration::seconds(REFUND_WINDOW_SECS as i64)
}

/// Unforgeable caller identity as handed over by the identity primitive
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Product listed in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Amount,
    pub inventory: u64,
}

/// Escrow state machine, derived from the delivered/refunded flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowState {
    /// Payment locked, awaiting confirmation or refund
    Created,
    /// Buyer confirmed delivery, funds released to the seller
    Delivered,
    /// Funds returned to the buyer after the deadline
    Refunded,
}

impl EscrowState {
    /// Check if this state allows delivery confirmation
    pub fn can_confirm(&self) -> bool {
        matches!(self, Self::Created)
    }

    /// Check if this state allows a refund (the deadline is checked separately)
    pub fn can_refund(&self) -> bool {
        matches!(self, Self::Created)
    }
}

/// Escrowed purchase held for a buyer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    pub index: EscrowIndex,
    pub buyer: Identity,
    pub product_id: ProductId,
    pub quantity: u64,
    /// Snapshot of `unit_price * quantity` at purchase time
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub delivered: bool,
    pub refunded: bool,
}

impl Escrow {
    pub fn state(&self) -> EscrowState {
        if self.delivered {
            EscrowState::Delivered
        } else if self.refunded {
            EscrowState::Refunded
        } else {
            EscrowState::Created
        }
    }

    /// Whether a refund may be requested at `now`
    pub fn deadline_reached(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }
}

/// Kind of accepted transition recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEventKind {
    ProductAdded,
    Purchased,
    DeliveryConfirmed,
    Refunded,
}

/// Audit trail entry, one per accepted transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub id: Uuid,
    /// Position in the global order of accepted transitions
    pub sequence: u64,
    pub kind: LedgerEventKind,
    pub actor: Identity,
    pub buyer: Option<Identity>,
    pub product_id: Option<ProductId>,
    pub escrow_index: Option<EscrowIndex>,
    pub amount: Option<Amount>,
    pub recorded_at: DateTime<Utc>,
}
