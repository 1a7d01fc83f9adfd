mod common;

use chrono::Local;
use common::{FakeTransport, FlakyStore};
use esl_price_sync::{
    format_price, Error, FailureKind, LabelManager, LabelPanel, LabelStatus, MemoryStore,
    MessageKind, PricePayload, ProductSeed, SyncConfig,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

fn price(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn config() -> SyncConfig {
    SyncConfig::default().with_scan_window(Duration::from_millis(10))
}

async fn manager(
    transport: Arc<FakeTransport>,
    store: Arc<MemoryStore>,
    config: SyncConfig,
) -> LabelManager {
    let manager = LabelManager::new(config, transport, store);
    manager.start().await.unwrap();
    manager
}

#[tokio::test]
async fn seeded_history_drives_current_price() {
    let catalog = vec![ProductSeed::new(
        "LABEL-1",
        "Product A",
        price("24.98"),
        price("29.76"),
    )];
    let store = Arc::new(MemoryStore::new());
    let manager = manager(
        FakeTransport::with_online(&[]),
        store.clone(),
        config().with_catalog(catalog),
    )
    .await;

    let history = manager.ledger().history("LABEL-1").await.unwrap();
    assert_eq!(history.len(), 90);
    let latest = history.latest().unwrap();
    assert_eq!(latest.day, Local::now().date_naive());
    assert!(latest.price >= price("24.98") && latest.price <= price("29.76"));

    let view = manager.render("LABEL-1").await.unwrap();
    assert_eq!(view.product, "Product A");
    assert_eq!(view.current_price_display, format_price(latest.price));
    assert_eq!(view.last_contact_display, "Never");
}

#[tokio::test]
async fn offline_label_cannot_send() {
    let transport = FakeTransport::with_online(&["LABEL-2"]);
    let store = Arc::new(MemoryStore::new());
    let manager = manager(transport.clone(), store.clone(), config()).await;
    let before = store.get("LABEL-1").unwrap();

    manager.on_draft_change("LABEL-1", "12.50").await.unwrap();
    let view = manager.render("LABEL-1").await.unwrap();
    assert_eq!(view.status, LabelStatus::Offline);
    assert!(!view.send_enabled);

    let view = manager.on_send("LABEL-1").await.unwrap();
    assert_eq!(view.message.unwrap().kind, MessageKind::Error);
    assert_eq!(view.draft_value, "12.50");
    assert!(transport.writes().is_empty());
    assert_eq!(store.get("LABEL-1").unwrap(), before);
}

#[tokio::test]
async fn successful_send_updates_ledger_and_clears_draft() {
    let transport = FakeTransport::with_online(&["LABEL-1"]);
    let store = Arc::new(MemoryStore::new());
    let manager = manager(transport.clone(), store.clone(), config()).await;

    manager.on_draft_change("LABEL-1", "12.50").await.unwrap();
    assert!(manager.render("LABEL-1").await.unwrap().send_enabled);

    let started = Local::now().naive_local();
    let view = manager.on_send("LABEL-1").await.unwrap();
    let finished = Local::now().naive_local();

    assert_eq!(view.message.as_ref().unwrap().kind, MessageKind::Success);
    assert_eq!(view.current_price_display, "R$ 12,50");

    let writes = transport.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, "addr-LABEL-1");
    let payload = PricePayload::parse(&writes[0].1).unwrap();
    assert_eq!(payload.product, "Rice 5kg");
    assert_eq!(payload.price, price("12.50"));

    let today = Local::now().date_naive();
    let history = manager.ledger().history("LABEL-1").await.unwrap();
    assert_eq!(history.get(today).unwrap().price, price("12.50"));
    assert_eq!(history.len(), 90);

    let last_contact = manager.ledger().last_contact("LABEL-1").await.unwrap().unwrap();
    assert!(last_contact >= started - chrono::Duration::seconds(1));
    assert!(last_contact <= finished);

    let next = manager.render("LABEL-1").await.unwrap();
    assert_eq!(next.draft_value, "");
    assert_eq!(next.current_price_display, "R$ 12,50");
    assert!(!next.send_enabled);
}

#[tokio::test]
async fn failed_write_keeps_draft_and_ledger() {
    let transport = FakeTransport::with_online(&["LABEL-1"]);
    transport.fail_writes(true);
    let store = Arc::new(MemoryStore::new());
    let manager = manager(transport.clone(), store.clone(), config()).await;
    let before = store.get("LABEL-1").unwrap();

    manager.on_draft_change("LABEL-1", "12.50").await.unwrap();
    let view = manager.on_send("LABEL-1").await.unwrap();

    let message = view.message.unwrap();
    assert_eq!(message.kind, MessageKind::Error);
    assert!(message.text.contains("no acknowledgement"));
    assert_eq!(view.draft_value, "12.50");
    assert_eq!(store.get("LABEL-1").unwrap(), before);

    let next = manager.render("LABEL-1").await.unwrap();
    assert_eq!(next.draft_value, "12.50");
    assert!(next.send_enabled);
}

#[tokio::test]
async fn two_sends_same_day_leave_one_entry() {
    let transport = FakeTransport::with_online(&["LABEL-3"]);
    let store = Arc::new(MemoryStore::new());
    let manager = manager(transport.clone(), store.clone(), config()).await;
    let today = Local::now().date_naive();

    for draft in ["5.10", "6.20"] {
        manager.on_draft_change("LABEL-3", draft).await.unwrap();
        manager.on_send("LABEL-3").await.unwrap();
        manager.render("LABEL-3").await.unwrap();
    }

    let doc = store.get("LABEL-3").unwrap();
    let todays: Vec<_> = doc
        .history_list
        .iter()
        .filter(|entry| entry.day == today)
        .collect();
    assert_eq!(todays.len(), 1);
    assert_eq!(todays[0].price, price("6.20"));
    assert_eq!(transport.writes().len(), 2);
}

#[tokio::test]
async fn malformed_draft_never_connects() {
    let transport = FakeTransport::with_online(&["LABEL-1"]);
    let store = Arc::new(MemoryStore::new());
    let manager = manager(transport.clone(), store, config()).await;

    for bad in ["abc", "-1", "1000000"] {
        manager.on_draft_change("LABEL-1", bad).await.unwrap();
        let view = manager.on_send("LABEL-1").await.unwrap();
        assert_eq!(view.message.unwrap().kind, MessageKind::Error);
        assert_eq!(view.draft_value, bad);
    }
    assert!(transport.writes().is_empty());
}

#[tokio::test]
async fn ledger_failure_after_write_is_reported_as_divergence() {
    let transport = FakeTransport::with_online(&["LABEL-1"]);
    let store = Arc::new(FlakyStore::default());
    let manager = LabelManager::new(config(), transport.clone(), store.clone());
    manager.start().await.unwrap();

    store.set_down(true);
    manager.on_draft_change("LABEL-1", "12.50").await.unwrap();
    let view = manager.on_send("LABEL-1").await.unwrap();

    let message = view.message.unwrap();
    assert_eq!(message.kind, MessageKind::Warning);
    assert!(message.text.contains("LABEL-1"));
    assert_eq!(view.current_price_display, "R$ 12,50");
    assert_eq!(transport.writes().len(), 1);

    store.set_down(false);
    let today = Local::now().date_naive();
    let doc = store.inner.get("LABEL-1").unwrap();
    assert_ne!(doc.history_list.get(today).unwrap().price, price("12.50"));
    assert_eq!(doc.last_contact, None);
}

#[tokio::test]
async fn reconciler_returns_typed_divergence() {
    let transport = FakeTransport::with_online(&["LABEL-1"]);
    let store = Arc::new(FlakyStore::default());
    let connection = Arc::new(esl_price_sync::ConnectionManager::new(transport.clone()));
    let ledger = Arc::new(esl_price_sync::PriceLedger::new(store.clone()));
    let reconciler =
        esl_price_sync::SessionReconciler::new(connection, ledger, price("99999.99"));

    let cache = esl_price_sync::DiscoveryCache::new(transport, Duration::from_secs(30));
    let expected = ["LABEL-1".to_string()].into_iter().collect();
    let discovery = cache.discover(&expected, Duration::from_millis(10)).await;

    let mut panel = LabelPanel::new("LABEL-1", "Rice 5kg");
    panel.on_draft_change("7");
    store.set_down(true);

    let err = reconciler.send(&mut panel, &discovery).await.unwrap_err();
    assert!(matches!(err, Error::LedgerDiverged { .. }));
    assert_eq!(err.kind(), FailureKind::Diverged);
    assert_eq!(panel.current_price(), price("7"));
    assert!(panel.is_clear_pending());
}

#[tokio::test]
async fn refresh_reuses_discovery_within_ttl() {
    let transport = FakeTransport::with_online(&["LABEL-1", "LABEL-2", "INTRUDER"]);
    let store = Arc::new(MemoryStore::new());
    let manager = manager(transport.clone(), store, config()).await;

    let first = manager.refresh().await;
    let second = manager.refresh().await;
    assert_eq!(transport.scans(), 1);
    assert_eq!(first, second);

    let statuses: Vec<_> = first.iter().map(|v| (v.name.as_str(), v.status)).collect();
    assert_eq!(
        statuses,
        vec![
            ("LABEL-1", LabelStatus::Online),
            ("LABEL-2", LabelStatus::Online),
            ("LABEL-3", LabelStatus::Offline),
        ]
    );

    let discovery = manager.discover().await;
    assert!(!discovery.is_online("INTRUDER"));

    manager.rescan().await;
    assert_eq!(transport.scans(), 2);
}

#[tokio::test(start_paused = true)]
async fn hanging_scan_yields_no_labels() {
    let transport = FakeTransport::with_online(&["LABEL-1"]);
    transport.hang_scans(Duration::from_secs(600));
    let store = Arc::new(MemoryStore::new());
    let manager = manager(
        transport.clone(),
        store,
        SyncConfig::default().with_seed_days(1),
    )
    .await;

    let discovery = manager.discover().await;
    assert!(discovery.is_empty());
    assert!(!manager.render("LABEL-1").await.unwrap().send_enabled);
}

#[tokio::test]
async fn sends_to_different_labels_run_concurrently() {
    let transport = FakeTransport::with_online(&["LABEL-1", "LABEL-2"]);
    let store = Arc::new(MemoryStore::new());
    let manager = manager(transport.clone(), store.clone(), config()).await;

    manager.on_draft_change("LABEL-1", "20").await.unwrap();
    manager.on_draft_change("LABEL-2", "3,33").await.unwrap();

    let (a, b) = tokio::join!(manager.on_send("LABEL-1"), manager.on_send("LABEL-2"));
    assert_eq!(a.unwrap().current_price_display, "R$ 20,00");
    assert_eq!(b.unwrap().current_price_display, "R$ 3,33");
    assert_eq!(transport.writes().len(), 2);

    let today = Local::now().date_naive();
    assert_eq!(
        store.get("LABEL-2").unwrap().history_list.get(today).unwrap().price,
        price("3.33")
    );
}

#[tokio::test]
async fn price_history_report_covers_all_labels() {
    let store = Arc::new(MemoryStore::new());
    let manager = manager(
        FakeTransport::with_online(&[]),
        store,
        config().with_seed_days(10),
    )
    .await;

    let report = manager.price_history().await.unwrap();
    assert_eq!(report.len(), 30);
    assert_eq!(report[0].product, "Beans 1kg");
    assert!(report.windows(2).all(|w| {
        (w[0].product.as_str(), w[0].day) < (w[1].product.as_str(), w[1].day)
    }));
}
