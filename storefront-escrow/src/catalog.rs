//! Catalog - product records keyed by sequential id
//!
//! Products live in an append-only arena: product `n` sits at slot `n - 1`.
//! Only the owner identity may list new products; inventory is only ever
//! decremented, by accepted purchases.

use crate::{
    error::StorefrontError,
    models::{Amount, Identity, Product, ProductId},
    EscrowResult,
};

#[derive(Debug, Clone)]
pub struct Catalog {
    owner: Identity,
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(owner: Identity) -> Self {
        Self {
            owner,
            products: Vec::new(),
        }
    }

    /// Add a product, returning its newly assigned id
    pub fn add_product(
        &mut self,
        caller: &Identity,
        name: &str,
        unit_price: Amount,
        inventory: u64,
    ) -> EscrowResult<ProductId> {
        if caller != &self.owner {
            return Err(StorefrontError::unauthorized(format!(
                "{} is not the store owner",
                caller
            )));
        }

        if name.trim().is_empty() {
            return Err(StorefrontError::invalid_argument(
                "Product name cannot be empty",
            ));
        }

        let id = self.products.len() as ProductId + 1;
        self.products.push(Product {
            id,
            name: name.to_string(),
            unit_price,
            inventory,
        });

        Ok(id)
    }

    pub fn get_product(&self, id: ProductId) -> EscrowResult<&Product> {
        id.checked_sub(1)
            .and_then(|slot| self.products.get(slot as usize))
            .ok_or(StorefrontError::ProductNotFound(id))
    }

    pub fn list_products(&self) -> &[Product] {
        &self.products
    }

    pub fn product_count(&self) -> u64 {
        self.products.len() as u64
    }

    /// Remove `quantity` units from stock; rejected rather than clamped
    pub fn take_inventory(&mut self, id: ProductId, quantity: u64) -> EscrowResult<&Product> {
        let product = id
            .checked_sub(1)
            .and_then(|slot| self.products.get_mut(slot as usize))
            .ok_or(StorefrontError::ProductNotFound(id))?;

        product.inventory = product.inventory.checked_sub(quantity).ok_or(
            StorefrontError::InsufficientInventory {
                product_id: id,
                requested: quantity,
                available: product.inventory,
            },
        )?;

        Ok(&*product)
    }
}
