//! Request and response shapes of the outward command and query surfaces
//!
//! Tagged with an `op` field so presentation layers and replay scripts can
//! submit them as JSON, e.g. `{"op": "purchase", "buyer": "0xb", "product_id": 1, "quantity": 2}`.

use serde::{Deserialize, Serialize};

use crate::{
    engine::SettlementInfo,
    models::{Amount, Escrow, EscrowIndex, Identity, LedgerEvent, Product, ProductId},
};

/// State-changing operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    AddProduct {
        caller: Identity,
        name: String,
        unit_price: Amount,
        inventory: u64,
    },
    Purchase {
        buyer: Identity,
        product_id: ProductId,
        quantity: u64,
    },
    ConfirmDelivery {
        caller: Identity,
        buyer: Identity,
        index: EscrowIndex,
    },
    Refund {
        caller: Identity,
        buyer: Identity,
        index: EscrowIndex,
    },
}

/// Read-only operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Query {
    ListProducts,
    GetProduct { id: ProductId },
    ListEscrows { buyer: Identity },
    Events,
    SettlementInfo,
}

/// Updated or requested view returned on success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", content = "data", rename_all = "snake_case")]
pub enum Outcome {
    Product(Product),
    Products(Vec<Product>),
    Escrow(Escrow),
    Escrows(Vec<Escrow>),
    Events(Vec<LedgerEvent>),
    Settlement(SettlementInfo),
}
