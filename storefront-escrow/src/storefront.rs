//! Storefront - High-level API for the escrow-settled store
//!
//! Wires configuration, the settlement asset and the clock into a
//! [`TransitionEngine`] and exposes the command and query surfaces. The clock
//! is sampled once per command, here rather than by the caller, so buyers
//! cannot report their own time.

use std::sync::Arc;

use tracing::info;

use crate::{
    clock::Clock,
    command::{Command, Outcome, Query},
    config::StorefrontConfig,
    engine::{SettlementInfo, TransitionEngine, TransitionEngineConfig},
    models::{Amount, Escrow, EscrowIndex, Identity, LedgerEvent, Product, ProductId},
    settlement::{format_amount, SettlementAsset},
    EscrowResult,
};

pub struct Storefront {
    config: StorefrontConfig,
    engine: TransitionEngine,
    clock: Arc<dyn Clock>,
}

impl Storefront {
    /// Create a storefront with an empty catalog
    pub fn new(
        config: StorefrontConfig,
        custody: Arc<dyn SettlementAsset>,
        clock: Arc<dyn Clock>,
    ) -> EscrowResult<Self> {
        config.validate()?;

        info!(
            "Initializing storefront (owner {}, seller {}, settling in {})",
            config.owner,
            config.seller(),
            config.asset_symbol
        );

        let engine = TransitionEngine::new(
            TransitionEngineConfig {
                owner: config.owner.clone(),
                seller: config.seller().clone(),
                refund_window: config.refund_window(),
            },
            custody,
        );

        Ok(Self {
            config,
            engine,
            clock,
        })
    }

    pub async fn add_product(
        &self,
        caller: &Identity,
        name: &str,
        unit_price: Amount,
        inventory: u64,
    ) -> EscrowResult<Product> {
        self.engine
            .add_product(caller, name, unit_price, inventory, self.clock.now())
            .await
    }

    pub async fn purchase(
        &self,
        buyer: &Identity,
        product_id: ProductId,
        quantity: u64,
    ) -> EscrowResult<Escrow> {
        self.engine
            .purchase(buyer, product_id, quantity, self.clock.now())
            .await
    }

    pub async fn confirm_delivery(
        &self,
        caller: &Identity,
        buyer: &Identity,
        index: EscrowIndex,
    ) -> EscrowResult<Escrow> {
        self.engine
            .confirm_delivery(caller, buyer, index, self.clock.now())
            .await
    }

    pub async fn refund(
        &self,
        caller: &Identity,
        buyer: &Identity,
        index: EscrowIndex,
    ) -> EscrowResult<Escrow> {
        self.engine
            .refund(caller, buyer, index, self.clock.now())
            .await
    }

    pub async fn get_product(&self, id: ProductId) -> EscrowResult<Product> {
        self.engine.get_product(id).await
    }

    pub async fn list_products(&self) -> Vec<Product> {
        self.engine.list_products().await
    }

    pub async fn product_count(&self) -> u64 {
        self.engine.product_count().await
    }

    pub async fn list_escrows(&self, buyer: &Identity) -> Vec<Escrow> {
        self.engine.list_escrows(buyer).await
    }

    pub async fn events(&self) -> Vec<LedgerEvent> {
        self.engine.events().await
    }

    pub fn settlement_info(&self) -> SettlementInfo {
        self.engine.settlement_info()
    }

    /// Price in display form, e.g. `"199.00 USDC"`
    pub fn display_amount(&self, amount: Amount) -> EscrowResult<String> {
        Ok(format!(
            "{} {}",
            format_amount(amount, self.config.asset_decimals)?,
            self.config.asset_symbol
        ))
    }

    /// Apply a command from the outward command surface
    pub async fn execute(&self, command: Command) -> EscrowResult<Outcome> {
        match command {
            Command::AddProduct {
                caller,
                name,
                unit_price,
                inventory,
            } => self
                .add_product(&caller, &name, unit_price, inventory)
                .await
                .map(Outcome::Product),
            Command::Purchase {
                buyer,
                product_id,
                quantity,
            } => self
                .purchase(&buyer, product_id, quantity)
                .await
                .map(Outcome::Escrow),
            Command::ConfirmDelivery {
                caller,
                buyer,
                index,
            } => self
                .confirm_delivery(&caller, &buyer, index)
                .await
                .map(Outcome::Escrow),
            Command::Refund {
                caller,
                buyer,
                index,
            } => self
                .refund(&caller, &buyer, index)
                .await
                .map(Outcome::Escrow),
        }
    }

    /// Answer a query from the outward query surface
    pub async fn query(&self, query: Query) -> EscrowResult<Outcome> {
        Ok(match query {
            Query::ListProducts => Outcome::Products(self.list_products().await),
            Query::GetProduct { id } => Outcome::Product(self.get_product(id).await?),
            Query::ListEscrows { buyer } => Outcome::Escrows(self.list_escrows(&buyer).await),
            Query::Events => Outcome::Events(self.events().await),
            Query::SettlementInfo => Outcome::Settlement(self.settlement_info()),
        })
    }
}
