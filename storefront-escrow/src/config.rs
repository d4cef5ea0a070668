//! Storefront configuration
//!
//! Settings come from an optional TOML/JSON file layered under `STOREFRONT_*`
//! environment variables, e.g. `STOREFRONT_OWNER=0xabc`.

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{
    error::StorefrontError,
    models::{Identity, REFUND_WINDOW_SECS},
    settlement::MAX_DECIMALS,
    EscrowResult,
};

/// Longest accepted refund window (1000 years), well inside chrono's range
pub const MAX_REFUND_WINDOW_SECS: u64 = 1000 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// Identity allowed to add products
    #[serde(default = "default_owner")]
    pub owner: Identity,
    /// Recipient of released escrow funds; the owner when unset
    #[serde(default)]
    pub seller: Option<Identity>,
    /// Seconds after purchase before a refund may be requested
    #[serde(default = "default_refund_window_secs")]
    pub refund_window_secs: u64,
    #[serde(default = "default_asset_symbol")]
    pub asset_symbol: String,
    #[serde(default = "default_asset_decimals")]
    pub asset_decimals: u32,
}

fn default_owner() -> Identity {
    Identity::from("owner")
}

fn default_refund_window_secs() -> u64 {
    REFUND_WINDOW_SECS
}

fn default_asset_symbol() -> String {
    "USDC".to_string()
}

fn default_asset_decimals() -> u32 {
    6
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            seller: None,
            refund_window_secs: default_refund_window_secs(),
            asset_symbol: default_asset_symbol(),
            asset_decimals: default_asset_decimals(),
        }
    }
}

impl StorefrontConfig {
    /// Load from `path` (if given) and the environment, then validate
    pub fn load(path: Option<&Path>) -> EscrowResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: Self = builder
            .add_source(config::Environment::with_prefix("STOREFRONT").try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EscrowResult<()> {
        if self.owner.is_empty() {
            return Err(StorefrontError::config("Owner identity cannot be empty"));
        }

        if matches!(&self.seller, Some(seller) if seller.is_empty()) {
            return Err(StorefrontError::config("Seller identity cannot be empty"));
        }

        if self.refund_window_secs == 0 || self.refund_window_secs > MAX_REFUND_WINDOW_SECS {
            return Err(StorefrontError::config(format!(
                "Invalid refund window: {} seconds (must be 1..={})",
                self.refund_window_secs, MAX_REFUND_WINDOW_SECS
            )));
        }

        if self.asset_decimals > MAX_DECIMALS {
            return Err(StorefrontError::config(format!(
                "Asset decimals {} exceeds maximum {}",
                self.asset_decimals, MAX_DECIMALS
            )));
        }

        Ok(())
    }

    /// Recipient of released funds
    pub fn seller(&self) -> &Identity {
        self.seller.as_ref().unwrap_or(&self.owner)
    }

    pub fn refund_window(&self) -> Duration {
        Duration::seconds(self.refund_window_secs.min(MAX_REFUND_WINDOW_SECS) as i64)
    }
}
