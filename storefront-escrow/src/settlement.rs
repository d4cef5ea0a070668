//! Settlement asset - custody of escrowed funds
//!
//! The transition engine moves value only through [`SettlementAsset`]. Each
//! call either completes fully or fails with `PaymentFailed` and leaves every
//! balance untouched. [`TokenVault`] is an in-memory fungible token ledger
//! with ERC-20 style allowances, used by the CLI and the test-suite.

use std::{collections::HashMap, str::FromStr, sync::Arc};

use async_trait::async_trait;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{
    error::StorefrontError,
    models::{Amount, Identity},
    EscrowResult,
};

/// Largest scale a `Decimal` can carry
pub const MAX_DECIMALS: u32 = 28;

/// Value-custody primitive consumed by purchase, delivery and refund
#[async_trait]
pub trait SettlementAsset: Send + Sync {
    /// Move `amount` from the buyer into escrow custody
    async fn lock(&self, buyer: &Identity, amount: Amount) -> EscrowResult<()>;

    /// Pay `amount` out of custody to the seller
    async fn release(&self, seller: &Identity, amount: Amount) -> EscrowResult<()>;

    /// Return `amount` out of custody to the buyer
    async fn restore(&self, buyer: &Identity, amount: Amount) -> EscrowResult<()>;
}

#[derive(Debug, Default)]
struct VaultState {
    balances: HashMap<Identity, Amount>,
    /// Spending allowance each holder granted the storefront
    allowances: HashMap<Identity, Amount>,
    escrowed: Amount,
}

/// In-memory token ledger with allowance-gated custody
#[derive(Debug, Clone, Default)]
pub struct TokenVault {
    state: Arc<RwLock<VaultState>>,
}

impl TokenVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit freshly issued tokens to `to`, returning the new balance
    pub async fn mint(&self, to: &Identity, amount: Amount) -> EscrowResult<Amount> {
        let mut state = self.state.write().await;
        let balance = state.balances.get(to).copied().unwrap_or(0);
        let updated = balance
            .checked_add(amount)
            .ok_or_else(|| StorefrontError::invalid_argument("Mint overflows balance"))?;

        state.balances.insert(to.clone(), updated);
        debug!("Minted {} to {} (balance {})", amount, to, updated);

        Ok(updated)
    }

    /// Set the allowance `holder` grants the storefront, replacing any previous one
    pub async fn approve(&self, holder: &Identity, amount: Amount) {
        self.state
            .write()
            .await
            .allowances
            .insert(holder.clone(), amount);
        debug!("{} approved {} for escrow", holder, amount);
    }

    pub async fn balance_of(&self, holder: &Identity) -> Amount {
        self.state
            .read()
            .await
            .balances
            .get(holder)
            .copied()
            .unwrap_or(0)
    }

    pub async fn allowance(&self, holder: &Identity) -> Amount {
        self.state
            .read()
            .await
            .allowances
            .get(holder)
            .copied()
            .unwrap_or(0)
    }

    /// Funds currently held in escrow custody
    pub async fn escrowed(&self) -> Amount {
        self.state.read().await.escrowed
    }

    async fn pay_out(&self, to: &Identity, amount: Amount) -> EscrowResult<()> {
        let mut state = self.state.write().await;

        let escrowed = state.escrowed.checked_sub(amount).ok_or_else(|| {
            StorefrontError::payment(format!(
                "Custody holds {} but {} was requested",
                state.escrowed, amount
            ))
        })?;
        let balance = state
            .balances
            .get(to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or_else(|| StorefrontError::payment(format!("Balance of {} overflows", to)))?;

        state.escrowed = escrowed;
        state.balances.insert(to.clone(), balance);

        Ok(())
    }
}

#[async_trait]
impl SettlementAsset for TokenVault {
    async fn lock(&self, buyer: &Identity, amount: Amount) -> EscrowResult<()> {
        let mut state = self.state.write().await;

        let allowance = state.allowances.get(buyer).copied().unwrap_or(0);
        if allowance < amount {
            warn!("Lock of {} from {} exceeds allowance {}", amount, buyer, allowance);
            return Err(StorefrontError::payment(format!(
                "Allowance {} is below the required {}",
                allowance, amount
            )));
        }

        let balance = state.balances.get(buyer).copied().unwrap_or(0);
        if balance < amount {
            warn!("Lock of {} from {} exceeds balance {}", amount, buyer, balance);
            return Err(StorefrontError::payment(format!(
                "Balance {} is below the required {}",
                balance, amount
            )));
        }

        let escrowed = state
            .escrowed
            .checked_add(amount)
            .ok_or_else(|| StorefrontError::payment("Escrow custody overflows"))?;

        state.allowances.insert(buyer.clone(), allowance - amount);
        state.balances.insert(buyer.clone(), balance - amount);
        state.escrowed = escrowed;

        Ok(())
    }

    async fn release(&self, seller: &Identity, amount: Amount) -> EscrowResult<()> {
        self.pay_out(seller, amount).await
    }

    async fn restore(&self, buyer: &Identity, amount: Amount) -> EscrowResult<()> {
        self.pay_out(buyer, amount).await
    }
}

/// Express a raw amount as a decimal with `decimals` fractional digits
pub fn to_decimal(amount: Amount, decimals: u32) -> EscrowResult<Decimal> {
    let mantissa = i128::try_from(amount)
        .map_err(|_| StorefrontError::invalid_argument(format!("Amount {} out of range", amount)))?;

    Decimal::try_from_i128_with_scale(mantissa, decimals)
        .map_err(|e| StorefrontError::invalid_argument(format!("Amount {}: {}", amount, e)))
}

/// Display form used for prices: two decimal places
pub fn format_amount(amount: Amount, decimals: u32) -> EscrowResult<String> {
    Ok(to_decimal(amount, decimals)?.round_dp(2).to_string())
}

/// Parse a human price such as `"199.00"` into raw units, truncating below
/// the smallest unit
pub fn parse_amount(text: &str, decimals: u32) -> EscrowResult<Amount> {
    let value = Decimal::from_str(text.trim())
        .map_err(|e| StorefrontError::invalid_argument(format!("Invalid amount '{}': {}", text, e)))?;

    if value.is_sign_negative() {
        return Err(StorefrontError::invalid_argument(format!(
            "Amount '{}' cannot be negative",
            text
        )));
    }

    let mut scaled = value;
    for _ in 0..decimals {
        scaled = scaled.checked_mul(Decimal::TEN).ok_or_else(|| {
            StorefrontError::invalid_argument(format!("Amount '{}' is too large", text))
        })?;
    }

    scaled
        .trunc()
        .to_u128()
        .ok_or_else(|| StorefrontError::invalid_argument(format!("Amount '{}' out of range", text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_lock_requires_allowance() {
        let vault = TokenVault::new();
        let buyer = Identity::from("buyer");
        vault.mint(&buyer, 1_000).await.unwrap();

        let err = vault.lock(&buyer, 500).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PaymentFailed);
        assert_eq!(vault.balance_of(&buyer).await, 1_000);
        assert_eq!(vault.escrowed().await, 0);

        vault.approve(&buyer, 500).await;
        vault.lock(&buyer, 500).await.unwrap();
        assert_eq!(vault.balance_of(&buyer).await, 500);
        assert_eq!(vault.allowance(&buyer).await, 0);
        assert_eq!(vault.escrowed().await, 500);
    }

    #[tokio::test]
    async fn test_lock_requires_balance() {
        let vault = TokenVault::new();
        let buyer = Identity::from("buyer");
        vault.mint(&buyer, 100).await.unwrap();
        vault.approve(&buyer, 1_000).await;

        let err = vault.lock(&buyer, 101).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PaymentFailed);
        assert_eq!(vault.allowance(&buyer).await, 1_000);
    }

    #[tokio::test]
    async fn test_release_and_restore_drain_custody() {
        let vault = TokenVault::new();
        let buyer = Identity::from("buyer");
        let seller = Identity::from("seller");
        vault.mint(&buyer, 300).await.unwrap();
        vault.approve(&buyer, 300).await;
        vault.lock(&buyer, 300).await.unwrap();

        vault.release(&seller, 200).await.unwrap();
        vault.restore(&buyer, 100).await.unwrap();

        assert_eq!(vault.balance_of(&seller).await, 200);
        assert_eq!(vault.balance_of(&buyer).await, 100);
        assert_eq!(vault.escrowed().await, 0);

        let err = vault.release(&seller, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PaymentFailed);
    }

    #[test]
    fn test_amount_formatting() {
        assert_eq!(format_amount(199_000_000, 6).unwrap(), "199.00");
        assert_eq!(format_amount(398_000_000, 6).unwrap(), "398.00");
        assert_eq!(to_decimal(1_500_000, 6).unwrap(), Decimal::new(15, 1));
    }

    #[test]
    fn test_amount_parsing() {
        assert_eq!(parse_amount("199.00", 6).unwrap(), 199_000_000);
        assert_eq!(parse_amount(" 0.1234567 ", 6).unwrap(), 123_456);
        assert_eq!(parse_amount("42", 0).unwrap(), 42);

        assert_eq!(
            parse_amount("-1", 6).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            parse_amount("ten", 6).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }
}
