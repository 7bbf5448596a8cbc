//! Shared fixtures for the engine integration tests.
// Not every test binary uses every fixture
#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use slip_payment_engine::{
    db_types::{ChatUserId, NewOrder, Order, OrderId},
    traits::{SlipOutcome, SlipVerdict, SlipVerifier, VerificationError},
    OrderManagementApi,
    SqliteDatabase,
};
use spg_common::Baht;

/// A fresh in-memory database. One connection, so the pool never silently spawns a second,
/// empty in-memory instance.
pub async fn new_test_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("Error creating in-memory database")
}

pub fn payer() -> ChatUserId {
    ChatUserId::from("U-test-payer")
}

pub async fn seed_order(db: &SqliteDatabase, order_id: &str, price: Baht, payer: Option<&ChatUserId>) -> Order {
    let api = OrderManagementApi::new(db.clone(), Default::default());
    let mut order = NewOrder::new(OrderId::from(order_id.to_string()), "Somchai", "volunteer-hours", price);
    if let Some(p) = payer {
        order = order.with_chat_user(p.clone());
    }
    let (order, inserted) = api.process_new_order(order).await.expect("Error seeding order");
    assert!(inserted, "order {order_id} was already present");
    order
}

/// A verifier that always returns the same verdict and counts how often it was consulted.
#[derive(Clone)]
pub struct ScriptedVerifier {
    verdict: SlipVerdict,
    calls: Arc<AtomicUsize>,
}

impl ScriptedVerifier {
    pub fn valid(amount: f64) -> Self {
        let amount = Baht::try_from(amount).expect("bad test amount");
        Self {
            verdict: SlipVerdict::new(SlipOutcome::Valid { amount, transaction_time: None }),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn rejecting(outcome: SlipOutcome) -> Self {
        Self { verdict: SlipVerdict::new(outcome), calls: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SlipVerifier for ScriptedVerifier {
    async fn verify_slip(&self, _image: &[u8], _expected: Option<Baht>) -> Result<SlipVerdict, VerificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.verdict.clone())
    }
}

/// A verifier standing in for a down oracle.
#[derive(Clone)]
pub struct UnavailableVerifier;

impl SlipVerifier for UnavailableVerifier {
    async fn verify_slip(&self, _image: &[u8], _expected: Option<Baht>) -> Result<SlipVerdict, VerificationError> {
        Err(VerificationError::Unavailable("connection refused".to_string()))
    }
}

pub fn slip_image() -> Vec<u8> {
    b"\xff\xd8\xff not really a jpeg".to_vec()
}
