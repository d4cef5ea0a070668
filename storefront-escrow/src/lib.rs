//! Escrow-settled storefront ledger
//!
//! A buyer's payment is locked in escrow at purchase time and released to the
//! seller once the buyer confirms delivery, or returned to the buyer once the
//! refund window has elapsed. This crate implements:
//! - the product catalog and per-buyer escrow ledger
//! - the transition engine that serializes every purchase, delivery and refund
//! - custody, clock and configuration seams around it

pub mod catalog;
pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod escrow_ledger;
pub mod models;
pub mod settlement;
pub mod storefront;

use error::StorefrontError;

pub use clock::{Clock, ManualClock, SystemClock};
pub use command::{Command, Outcome, Query};
pub use crate::config::StorefrontConfig;
pub use engine::{TransitionEngine, TransitionEngineConfig};
pub use models::{Amount, Escrow, EscrowIndex, EscrowState, Identity, Product, ProductId};
pub use settlement::{SettlementAsset, TokenVault};
pub use storefront::Storefront;

/// Result type alias for storefront operations
pub type EscrowResult<T> = Result<T, StorefrontError>;
