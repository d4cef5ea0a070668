use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use storefront_escrow::{
    error::{ErrorKind, StorefrontError},
    Amount, EscrowState, Identity, SettlementAsset, TokenVault, TransitionEngine,
    TransitionEngineConfig,
};

const HEADPHONES_PRICE: Amount = 199_000_000;

struct Store {
    engine: TransitionEngine,
    vault: TokenVault,
    owner: Identity,
    t0: DateTime<Utc>,
}

async fn store() -> Store {
    let vault = TokenVault::new();
    let engine = TransitionEngine::new(
        TransitionEngineConfig::default(),
        Arc::new(vault.clone()) as Arc<dyn SettlementAsset>,
    );
    let owner = Identity::from("owner");
    let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

    engine
        .add_product(&owner, "Headphones", HEADPHONES_PRICE, 10, t0)
        .await
        .unwrap();

    Store {
        engine,
        vault,
        owner,
        t0,
    }
}

async fn funded(vault: &TokenVault, name: &str, amount: Amount) -> Identity {
    let who = Identity::from(name);
    vault.mint(&who, amount).await.unwrap();
    vault.approve(&who, amount).await;
    who
}

fn kind<T: std::fmt::Debug>(result: Result<T, StorefrontError>) -> ErrorKind {
    result.unwrap_err().kind()
}

#[tokio::test]
async fn purchase_creates_escrow() {
    let s = store().await;
    let b = funded(&s.vault, "B", 1_000_000_000).await;

    let escrow = s.engine.purchase(&b, 1, 2, s.t0).await.unwrap();

    assert_eq!(escrow.index, 0);
    assert_eq!(escrow.amount, 398_000_000);
    assert_eq!(escrow.created_at, s.t0);
    assert_eq!(escrow.deadline, s.t0 + Duration::days(7));
    assert!(!escrow.delivered && !escrow.refunded);
    assert_eq!(s.engine.get_product(1).await.unwrap().inventory, 8);
}

#[tokio::test]
async fn confirmed_escrow_cannot_be_refunded() {
    let s = store().await;
    let b = funded(&s.vault, "B", 1_000_000_000).await;
    s.engine.purchase(&b, 1, 2, s.t0).await.unwrap();

    let escrow = s
        .engine
        .confirm_delivery(&b, &b, 0, s.t0 + Duration::hours(1))
        .await
        .unwrap();
    assert!(escrow.delivered);

    let result = s.engine.refund(&b, &b, 0, s.t0 + Duration::days(8)).await;
    assert_eq!(kind(result), ErrorKind::AlreadyFinalized);
    assert_eq!(s.vault.balance_of(&s.owner).await, 398_000_000);
}

#[tokio::test]
async fn refund_waits_for_deadline() {
    let s = store().await;
    let b = funded(&s.vault, "B", 1_000_000_000).await;
    s.engine.purchase(&b, 1, 2, s.t0).await.unwrap();

    let result = s.engine.refund(&b, &b, 0, s.t0 + Duration::hours(1)).await;
    assert_eq!(kind(result), ErrorKind::DeadlineNotReached);
    assert_eq!(s.engine.list_escrows(&b).await[0].state(), EscrowState::Created);

    let escrow = s
        .engine
        .refund(&b, &b, 0, s.t0 + Duration::days(7) + Duration::seconds(1))
        .await
        .unwrap();
    assert!(escrow.refunded);
    assert!(!escrow.delivered);
    assert_eq!(s.vault.balance_of(&b).await, 1_000_000_000);
}

#[tokio::test]
async fn oversized_purchase_changes_nothing() {
    let s = store().await;
    let b = funded(&s.vault, "B", 1_000_000_000).await;
    s.engine.purchase(&b, 1, 2, s.t0).await.unwrap();
    let c = funded(&s.vault, "C", 10_000_000_000).await;

    let result = s.engine.purchase(&c, 1, 9, s.t0).await;

    assert_eq!(kind(result), ErrorKind::InsufficientInventory);
    assert_eq!(s.engine.get_product(1).await.unwrap().inventory, 8);
    assert!(s.engine.list_escrows(&c).await.is_empty());
    assert_eq!(s.vault.balance_of(&c).await, 10_000_000_000);
}

#[tokio::test]
async fn non_owner_cannot_add_products() {
    let s = store().await;
    let before = s.engine.list_products().await;

    let result = s
        .engine
        .add_product(&Identity::from("mallory"), "Knockoff", 1, 1, s.t0)
        .await;

    assert_eq!(kind(result), ErrorKind::Unauthorized);
    assert_eq!(s.engine.list_products().await, before);
    assert_eq!(s.engine.product_count().await, 1);
}

#[tokio::test]
async fn inventory_tracks_every_purchase_and_never_underflows() {
    let s = store().await;
    let b = funded(&s.vault, "B", 100 * HEADPHONES_PRICE).await;
    let mut expected = 10;

    for quantity in [3, 4, 5, 2, 1, 1] {
        let result = s.engine.purchase(&b, 1, quantity, s.t0).await;
        if quantity <= expected {
            assert!(result.is_ok());
            expected -= quantity;
        } else {
            assert_eq!(kind(result), ErrorKind::InsufficientInventory);
        }
        assert_eq!(s.engine.get_product(1).await.unwrap().inventory, expected);
    }

    assert_eq!(expected, 0);
    assert_eq!(s.engine.list_escrows(&b).await.len(), 4);
}

#[tokio::test]
async fn delivered_and_refunded_stay_mutually_exclusive() {
    let s = store().await;
    let b = funded(&s.vault, "B", 10 * HEADPHONES_PRICE).await;
    for _ in 0..4 {
        s.engine.purchase(&b, 1, 1, s.t0).await.unwrap();
    }
    let late = s.t0 + Duration::days(10);

    s.engine.confirm_delivery(&b, &b, 0, late).await.unwrap();
    s.engine.refund(&b, &b, 1, late).await.unwrap();
    s.engine.refund(&b, &b, 2, late).await.unwrap();
    s.engine
        .confirm_delivery(&b, &b, 3, s.t0 + Duration::minutes(5))
        .await
        .unwrap();

    for index in 0..4 {
        for _ in 0..2 {
            assert_eq!(
                kind(s.engine.confirm_delivery(&b, &b, index, late).await),
                ErrorKind::AlreadyFinalized
            );
            assert_eq!(
                kind(s.engine.refund(&b, &b, index, late).await),
                ErrorKind::AlreadyFinalized
            );
        }
    }

    let escrows = s.engine.list_escrows(&b).await;
    assert!(escrows.iter().all(|e| !(e.delivered && e.refunded)));
    assert_eq!(
        escrows.iter().map(|e| e.state()).collect::<Vec<_>>(),
        vec![
            EscrowState::Delivered,
            EscrowState::Refunded,
            EscrowState::Refunded,
            EscrowState::Delivered,
        ]
    );
    assert_eq!(s.vault.escrowed().await, 0);
}

#[tokio::test]
async fn escrow_amount_is_a_purchase_time_snapshot() {
    let s = store().await;
    let b = funded(&s.vault, "B", 10 * HEADPHONES_PRICE).await;
    s.engine.purchase(&b, 1, 1, s.t0).await.unwrap();
    s.engine
        .add_product(&s.owner, "Headphones v2", 2 * HEADPHONES_PRICE, 5, s.t0)
        .await
        .unwrap();
    s.engine.purchase(&b, 2, 1, s.t0).await.unwrap();

    let escrows = s.engine.list_escrows(&b).await;
    assert_eq!(escrows[0].amount, HEADPHONES_PRICE);
    assert_eq!(escrows[1].amount, 2 * HEADPHONES_PRICE);
}
