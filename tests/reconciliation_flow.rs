//! Integration tests for event reconciliation.
//!
//! These tests drive verified gateway events through the full handler stack:
//! 1. Processed-event log gate
//! 2. Classification
//! 3. Order insert and FIFO allocation, or subscription mirroring
//! 4. Outcome recording
//!
//! Uses the in-memory adapters so no database or gateway is needed.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Barrier;

use league_ledger::adapters::in_memory::{
    InMemoryCustomerDirectory, InMemoryLedgerRepository, InMemoryOrderRepository,
    InMemoryPaymentGateway, InMemorySubscriptionMirrorRepository, InMemoryWebhookEventRepository,
};
use league_ledger::application::{
    AllocatePaymentCommand, AllocatePaymentHandler, HandleGatewayEventCommand,
    HandleGatewayEventHandler, HandleGatewayEventResult, RecordOrderHandler,
    SyncSubscriptionHandler,
};
use league_ledger::domain::billing::{GatewayEvent, GatewaySubscription, SubscriptionStatus};
use league_ledger::domain::foundation::{LedgerEntryId, UserId};
use league_ledger::domain::ledger::{LedgerEntry, LedgerStatus};
use league_ledger::ports::{
    LedgerRepository, OrderRepository, PaymentError, ProcessingResult,
    SubscriptionMirrorRepository, WebhookEventRepository,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Harness {
    handler: Arc<HandleGatewayEventHandler>,
    events: Arc<InMemoryWebhookEventRepository>,
    ledger: Arc<InMemoryLedgerRepository>,
    orders: Arc<InMemoryOrderRepository>,
    mirrors: Arc<InMemorySubscriptionMirrorRepository>,
    customers: Arc<InMemoryCustomerDirectory>,
    gateway: Arc<InMemoryPaymentGateway>,
}

impl Harness {
    fn new() -> Self {
        let events = Arc::new(InMemoryWebhookEventRepository::new());
        let ledger = Arc::new(InMemoryLedgerRepository::new());
        let orders = Arc::new(InMemoryOrderRepository::new());
        let mirrors = Arc::new(InMemorySubscriptionMirrorRepository::new());
        let customers = Arc::new(InMemoryCustomerDirectory::new());
        let gateway = Arc::new(InMemoryPaymentGateway::new());

        let handler = Arc::new(HandleGatewayEventHandler::new(
            events.clone(),
            SyncSubscriptionHandler::new(gateway.clone(), mirrors.clone()),
            RecordOrderHandler::new(orders.clone()),
            AllocatePaymentHandler::new(customers.clone(), ledger.clone()),
        ));

        Self {
            handler,
            events,
            ledger,
            orders,
            mirrors,
            customers,
            gateway,
        }
    }

    async fn deliver(&self, event: GatewayEvent) -> HandleGatewayEventResult {
        self.handler
            .handle(HandleGatewayEventCommand { event })
            .await
            .expect("reconciliation should succeed")
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// An open entry created before its due date, so it starts `pending`.
fn open_entry(user_id: UserId, due: Decimal, due_date: NaiveDate) -> LedgerEntry {
    LedgerEntry::new(
        LedgerEntryId::new(),
        user_id,
        due,
        Some(due_date),
        date(2024, 12, 1),
    )
    .unwrap()
}

fn checkout_event(event_id: &str, session_id: &str, amount_total: i64) -> GatewayEvent {
    serde_json::from_value(json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "created": 1735689600,
        "livemode": false,
        "data": {
            "object": {
                "id": session_id,
                "object": "checkout.session",
                "mode": "payment",
                "customer": "cus_member",
                "payment_intent": "pi_123",
                "payment_status": "paid",
                "amount_subtotal": amount_total,
                "amount_total": amount_total,
                "currency": "USD",
                "metadata": {}
            }
        }
    }))
    .unwrap()
}

fn subscription_event(event_id: &str) -> GatewayEvent {
    serde_json::from_value(json!({
        "id": event_id,
        "type": "customer.subscription.updated",
        "created": 1735689600,
        "data": {
            "object": {"id": "sub_1", "object": "subscription", "customer": "cus_member", "status": "active"}
        }
    }))
    .unwrap()
}

fn dollars(n: i64) -> Decimal {
    Decimal::from(n)
}

// =============================================================================
// One-time payments
// =============================================================================

#[tokio::test]
async fn payment_settles_oldest_entry_first() {
    let h = Harness::new();
    let user = UserId::new();
    h.customers.link("cus_member", user).await;
    let first = open_entry(user, dollars(150), date(2025, 1, 1));
    let second = open_entry(user, dollars(75), date(2025, 2, 1));
    let (first_id, second_id) = (first.id, second.id);
    // Inserted newest first to show ordering comes from due dates.
    h.ledger.insert(second).await;
    h.ledger.insert(first).await;

    let result = h.deliver(checkout_event("evt_1", "cs_1", 20_000)).await;

    let HandleGatewayEventResult::PaymentAllocated { allocation, .. } = result else {
        panic!("expected PaymentAllocated, got {:?}", result);
    };
    assert_eq!(allocation.allocation.leftover, Decimal::ZERO);
    assert!(allocation.allocation.credit.is_none());

    let first = h.ledger.find_by_id(&first_id).await.unwrap().unwrap();
    let second = h.ledger.find_by_id(&second_id).await.unwrap().unwrap();
    assert_eq!(first.status, LedgerStatus::Paid);
    assert_eq!(first.amount_paid, dollars(150));
    assert_eq!(second.status, LedgerStatus::Partial);
    assert_eq!(second.amount_paid, dollars(50));
}

#[tokio::test]
async fn exact_payment_marks_entry_paid() {
    let h = Harness::new();
    let user = UserId::new();
    h.customers.link("cus_member", user).await;
    let entry = open_entry(user, dollars(75), date(2025, 2, 1));
    let id = entry.id;
    h.ledger.insert(entry).await;

    h.deliver(checkout_event("evt_1", "cs_1", 7_500)).await;

    let stored = h.ledger.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, LedgerStatus::Paid);
    assert_eq!(stored.notes.len(), 1);
    assert_eq!(stored.notes[0].order_ref, "cs_1");
}

#[tokio::test]
async fn payment_without_obligations_becomes_credit() {
    let h = Harness::new();
    let user = UserId::new();
    h.customers.link("cus_member", user).await;

    let result = h.deliver(checkout_event("evt_1", "cs_1", 4_250)).await;

    let HandleGatewayEventResult::PaymentAllocated { allocation, .. } = result else {
        panic!("expected PaymentAllocated");
    };
    assert!(allocation.allocation.applied_entries.is_empty());
    assert_eq!(allocation.allocation.leftover, Decimal::new(4250, 2));

    let credits = h.ledger.find_credits_by_user(&user).await.unwrap();
    assert_eq!(credits.len(), 1);
    assert_eq!(credits[0].amount, Decimal::new(4250, 2));
    assert_eq!(credits[0].currency, "usd");
}

#[tokio::test]
async fn replayed_delivery_allocates_once() {
    let h = Harness::new();
    let user = UserId::new();
    h.customers.link("cus_member", user).await;
    h.ledger
        .insert(open_entry(user, dollars(500), date(2025, 1, 1)))
        .await;
    let event = checkout_event("evt_1", "cs_1", 10_000);

    h.deliver(event.clone()).await;
    let replay = h.deliver(event).await;
    // Same checkout under a new event id, as after a gateway resend.
    let resent = h.deliver(checkout_event("evt_2", "cs_1", 10_000)).await;

    assert!(matches!(replay, HandleGatewayEventResult::AlreadyProcessed));
    assert!(matches!(
        resent,
        HandleGatewayEventResult::DuplicateOrder { ref session_id } if session_id == "cs_1"
    ));
    assert_eq!(h.orders.len().await, 1);
    assert!(h.orders.find_by_session_id("cs_1").await.unwrap().is_some());

    let paid: Decimal = h.ledger.entries().await.iter().map(|e| e.amount_paid).sum();
    assert_eq!(paid, dollars(100));
}

#[tokio::test]
async fn unmapped_customer_is_recorded_as_failed() {
    let h = Harness::new();

    let result = h
        .handler
        .handle(HandleGatewayEventCommand {
            event: checkout_event("evt_1", "cs_1", 1_000),
        })
        .await;

    assert!(result.is_err());
    let record = h.events.find_by_event_id("evt_1").await.unwrap().unwrap();
    assert_eq!(record.result, ProcessingResult::Failed);
    assert!(record.error_message.unwrap().contains("cus_member"));
    assert_eq!(record.payload["id"], "evt_1");
}

#[tokio::test]
async fn unpaid_checkout_is_ignored() {
    let h = Harness::new();
    let mut event = checkout_event("evt_1", "cs_1", 1_000);
    event.data.object["payment_status"] = json!("unpaid");

    let result = h.deliver(event).await;

    assert!(matches!(result, HandleGatewayEventResult::Ignored(_)));
    assert!(h.orders.is_empty().await);
    let record = h.events.find_by_event_id("evt_1").await.unwrap().unwrap();
    assert_eq!(record.result, ProcessingResult::Ignored);
}

// =============================================================================
// Subscriptions
// =============================================================================

#[tokio::test]
async fn subscription_events_keep_one_mirror_row() {
    let h = Harness::new();
    h.gateway
        .set_subscription(
            "cus_member",
            GatewaySubscription {
                subscription_id: "sub_1".to_string(),
                status: SubscriptionStatus::Active,
                price_id: Some("price_season".to_string()),
                current_period_start: None,
                current_period_end: None,
                cancel_at_period_end: false,
                card: None,
            },
        )
        .await;

    for i in 0..3 {
        h.deliver(subscription_event(&format!("evt_{}", i))).await;
    }

    assert_eq!(h.mirrors.len().await, 1);
    let mirror = h.mirrors.find_by_customer("cus_member").await.unwrap().unwrap();
    assert_eq!(mirror.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn failed_sync_is_retried_on_redelivery() {
    let h = Harness::new();
    h.gateway.fail_with(PaymentError::network("connection reset")).await;

    let first = h
        .handler
        .handle(HandleGatewayEventCommand {
            event: subscription_event("evt_1"),
        })
        .await;
    assert!(first.is_err());

    h.gateway.clear_failure().await;
    let second = h.deliver(subscription_event("evt_1")).await;

    assert!(matches!(
        second,
        HandleGatewayEventResult::SubscriptionSynced { ref status, .. }
            if *status == SubscriptionStatus::NotStarted
    ));
    let record = h.events.find_by_event_id("evt_1").await.unwrap().unwrap();
    assert_eq!(record.result, ProcessingResult::Success);
    assert_eq!(h.gateway.calls().await, 2);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_allocations_never_double_count() {
    let ledger = Arc::new(InMemoryLedgerRepository::new());
    let customers = Arc::new(InMemoryCustomerDirectory::new());
    let user = UserId::new();
    customers.link("cus_member", user).await;
    ledger
        .insert(open_entry(user, dollars(150), date(2025, 1, 1)))
        .await;

    let workers = 4;
    let barrier = Arc::new(Barrier::new(workers));
    let mut handles = Vec::new();
    for i in 0..workers {
        let handler = AllocatePaymentHandler::new(customers.clone(), ledger.clone());
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            handler
                .handle(AllocatePaymentCommand {
                    customer_id: "cus_member".to_string(),
                    amount: dollars(100),
                    currency: "usd".to_string(),
                    league_id: None,
                    order_ref: format!("cs_{}", i),
                })
                .await
        }));
    }

    let mut applied = Decimal::ZERO;
    let mut leftover = Decimal::ZERO;
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        applied += result
            .allocation
            .applied_entries
            .iter()
            .map(|a| a.applied)
            .sum::<Decimal>();
        leftover += result.allocation.leftover;
    }

    let entry = &ledger.entries().await[0];
    assert_eq!(entry.amount_paid, dollars(150));
    assert_eq!(applied, dollars(150));
    assert_eq!(applied + leftover, dollars(400));

    let credited: Decimal = ledger
        .find_credits_by_user(&user)
        .await
        .unwrap()
        .iter()
        .map(|c| c.amount)
        .sum();
    assert_eq!(credited, dollars(250));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deliveries_of_one_checkout_allocate_once() {
    let h = Harness::new();
    let user = UserId::new();
    h.customers.link("cus_member", user).await;
    let entry = open_entry(user, dollars(300), date(2025, 1, 1));
    let id = entry.id;
    h.ledger.insert(entry).await;

    let workers = 4;
    let barrier = Arc::new(Barrier::new(workers));
    let mut handles = Vec::new();
    for _ in 0..workers {
        let handler = h.handler.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            handler
                .handle(HandleGatewayEventCommand {
                    event: checkout_event("evt_1", "cs_1", 10_000),
                })
                .await
        }));
    }

    let mut allocated = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            HandleGatewayEventResult::PaymentAllocated { .. } => allocated += 1,
            HandleGatewayEventResult::DuplicateOrder { .. }
            | HandleGatewayEventResult::AlreadyProcessed => {}
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    assert_eq!(allocated, 1);
    assert_eq!(h.orders.len().await, 1);
    let stored = h.ledger.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(stored.amount_paid, dollars(100));
    assert_eq!(stored.notes.len(), 1);
    assert!(h.ledger.find_credits_by_user(&user).await.unwrap().is_empty());
    let record = h.events.find_by_event_id("evt_1").await.unwrap().unwrap();
    assert_eq!(record.result, ProcessingResult::Success);
}
