//! Error types for the storefront escrow ledger
//!
//! Every rejected operation surfaces as one typed [`StorefrontError`]. All
//! checks run before any state is touched, so an error always means the
//! operation had no effect.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{EscrowIndex, EscrowState, Identity, ProductId};

/// Main error type for storefront operations
#[derive(Error, Debug)]
pub enum StorefrontError {
    /// Caller lacks the required role or ownership
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Product id was never assigned
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    /// Escrow index is out of range for the buyer
    #[error("Escrow {index} not found for buyer {buyer}")]
    EscrowNotFound { buyer: Identity, index: EscrowIndex },

    /// Malformed quantity, price, name or amount
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Purchase exceeds remaining stock
    #[error(
        "Insufficient inventory for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientInventory {
        product_id: ProductId,
        requested: u64,
        available: u64,
    },

    /// Settlement asset rejected the custody transfer
    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    /// Transition attempted on a terminal escrow
    #[error("Escrow {index} for buyer {buyer} is already finalized ({state:?})")]
    AlreadyFinalized {
        buyer: Identity,
        index: EscrowIndex,
        state: EscrowState,
    },

    /// Refund requested before the refund window elapsed
    #[error("Refund deadline not reached: available from {deadline}")]
    DeadlineNotReached { deadline: DateTime<Utc> },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure taxonomy exposed to presentation layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    InvalidArgument,
    InsufficientInventory,
    PaymentFailed,
    AlreadyFinalized,
    DeadlineNotReached,
    Config,
    Serialization,
}

impl StorefrontError {
    /// Create an authorization error
    pub fn unauthorized<S: Into<String>>(msg: S) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a payment error
    pub fn payment<S: Into<String>>(msg: S) -> Self {
        Self::PaymentFailed(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Classify this error into the failure taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::ProductNotFound(_) | Self::EscrowNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InsufficientInventory { .. } => ErrorKind::InsufficientInventory,
            Self::PaymentFailed(_) => ErrorKind::PaymentFailed,
            Self::AlreadyFinalized { .. } => ErrorKind::AlreadyFinalized,
            Self::DeadlineNotReached { .. } => ErrorKind::DeadlineNotReached,
            Self::Config(_) => ErrorKind::Config,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }
}

impl From<config::ConfigError> for StorefrontError {
    fn from(value: config::ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}
