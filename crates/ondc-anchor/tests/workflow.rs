//! End-to-end workflow scenarios against in-process ledgers.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use ondc_anchor::core::{address_of, AnchorId};
use ondc_anchor::ledger::{
    AnchorRole, Call, ConnectionError, Ledger, MemoryLedger, MemoryLedgerConfig,
};
use ondc_anchor::{execute, run, FailureReason, RunReport, WorkflowConfig, WorkflowError};
use ondc_anchor_testkit::{FaultyLedger, StalledLedger};

fn config(products: usize, orders: usize, ratings: usize) -> WorkflowConfig {
    WorkflowConfig {
        product_count: products,
        order_count: orders,
        rating_count: ratings,
        rng_seed: Some(2022),
        ..Default::default()
    }
}

fn memory_ledger() -> Arc<MemoryLedger> {
    Arc::new(MemoryLedger::new("scenario", MemoryLedgerConfig::default()))
}

async fn complete_run(config: WorkflowConfig) -> (Arc<MemoryLedger>, RunReport) {
    let ledger = memory_ledger();
    let (_shutdown, rx) = watch::channel(false);
    let report = execute(ledger.clone(), config, rx).await.unwrap();
    (ledger, report)
}

#[tokio::test]
async fn test_schema_then_product() {
    let (ledger, report) = complete_run(config(1, 0, 0)).await;

    let schema = ledger.schema(&report.schema_id).await.unwrap();
    let product = &report.products.anchored[0];
    assert_eq!(product.record.creator, schema.controller);
    let participants = ondc_anchor::Participants::derive(&Default::default()).unwrap();
    assert_eq!(
        product.record.submitted_by,
        participants.product_owner.anchor.account_id()
    );
    assert_ne!(product.record.submitted_by, product.record.creator);
    assert_eq!(product.record.link, None);
    assert_eq!(product.stream.link(), None);
    assert_eq!(product.record.cid, address_of(&product.stream.to_bytes()));
    assert_eq!(product.record.price, None);

    let entry = ledger.anchor(&product.id()).await.unwrap();
    assert_eq!(entry.role, AnchorRole::Product);
    assert_eq!(entry.cid, product.record.cid);
}

#[tokio::test]
async fn test_listing_links_its_product() {
    let (_, report) = complete_run(config(2, 0, 0)).await;
    assert_eq!(report.listings.anchored.len(), 2);

    for (product, listing) in report
        .products
        .anchored
        .iter()
        .zip(&report.listings.anchored)
    {
        assert_eq!(listing.stream.link(), Some(product.id()));
        assert_eq!(listing.record.link, Some(product.id()));
        assert_eq!(listing.stream.content(), product.stream.content());
        assert_ne!(listing.record.cid, product.record.cid);

        let bytes = listing.stream.to_bytes();
        let link = product.id();
        assert!(bytes.windows(32).any(|w| w == link.as_bytes()));

        assert_eq!(listing.record.price, Some(135_000));
        assert!(listing.record.store_id.is_some());
    }
}

#[tokio::test]
async fn test_orders_sample_listings() {
    let (_, report) = complete_run(config(3, 8, 0)).await;
    let listing_ids: HashSet<AnchorId> = report.listings.ids().into_iter().collect();
    assert_eq!(listing_ids.len(), 3);

    let participants = ondc_anchor::Participants::derive(&Default::default()).unwrap();
    assert_eq!(report.orders.attempted, 8);
    assert_eq!(report.orders.anchored.len(), 8);
    for order in &report.orders.anchored {
        let link = order.record.link.unwrap();
        assert!(listing_ids.contains(&link));
        assert_eq!(order.record.creator, participants.buyer_one.account_id());
        assert_eq!(order.record.submitted_by, participants.network_author.account_id());
    }

    let distinct: HashSet<AnchorId> = report.orders.ids().into_iter().collect();
    assert_eq!(distinct.len(), 8);
}

#[tokio::test]
async fn test_rejected_product_is_excluded() {
    let inner = memory_ledger();
    let ledger = Arc::new(FaultyLedger::new(inner.clone()).reject_product(1));
    let (_shutdown, rx) = watch::channel(false);
    let report = execute(ledger, config(5, 2, 1), rx).await.unwrap();

    assert_eq!(report.products.attempted, 5);
    let indices: Vec<usize> = report.products.anchored.iter().map(|p| p.index).collect();
    assert_eq!(indices, vec![0, 2, 3, 4]);

    assert_eq!(report.products.failures.len(), 1);
    let failure = &report.products.failures[0];
    assert_eq!(failure.index, 1);
    match &failure.reason {
        FailureReason::Rejected(e) => assert_eq!(e.name, "Unauthorized"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(report.products.summary(), "4 of 5 products anchored");

    let product_ids: HashSet<AnchorId> = report.products.ids().into_iter().collect();
    assert_eq!(report.listings.attempted, 4);
    for listing in &report.listings.anchored {
        assert!(product_ids.contains(&listing.record.link.unwrap()));
    }
    assert_eq!(inner.anchor_count(AnchorRole::Product).await, 4);
}

#[tokio::test]
async fn test_interrupt_before_any_submission() {
    let ledger = memory_ledger();
    let (shutdown, rx) = watch::channel(false);
    shutdown.send(true).unwrap();

    let err = execute(ledger.clone(), config(3, 2, 1), rx).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Interrupted { attempted: 0 }));
    assert_eq!(err.exit_code(), 130);
    assert!(ledger.submissions().await.is_empty());
    assert!(!ledger.is_connected());
}

fn interrupt_after(delay: Duration) -> watch::Receiver<bool> {
    let (shutdown, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = shutdown.send(true);
    });
    rx
}

#[tokio::test]
async fn test_interrupt_during_schema_setup_exits_nonzero() {
    let ledger = Arc::new(StalledLedger::new());
    let rx = interrupt_after(Duration::from_millis(50));

    let err = execute(ledger.clone(), config(3, 2, 1), rx).await.unwrap_err();
    // The only submission was the schema registration.
    assert_eq!(ledger.submitted(), 1);
    assert!(matches!(err, WorkflowError::Interrupted { attempted: 0 }));
    assert_ne!(err.exit_code(), 0);
    assert!(!ledger.is_connected());
}

#[tokio::test]
async fn test_interrupt_during_anchoring_exits_cleanly() {
    // Schema calls are acknowledged at once; anchors wait for a block.
    let ledger = Arc::new(MemoryLedger::new(
        "slow-blocks",
        MemoryLedgerConfig {
            block_time: Duration::from_secs(30),
            ..Default::default()
        },
    ));
    let rx = interrupt_after(Duration::from_millis(50));

    let err = execute(ledger.clone(), config(3, 2, 1), rx).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Interrupted { attempted: 1 }));
    assert_eq!(err.exit_code(), 0);
    assert_eq!(ledger.submissions().await.len(), 3);
    assert!(!ledger.is_connected());
}

#[tokio::test]
async fn test_rejected_schema_ends_run() {
    let inner = memory_ledger();
    let ledger = Arc::new(FaultyLedger::new(inner.clone()).reject_schema());
    let (_shutdown, rx) = watch::channel(false);

    let err = execute(ledger.clone(), config(3, 2, 1), rx).await.unwrap_err();
    match &err {
        WorkflowError::SchemaRegistration(e) => assert_eq!(e.name, "DuplicateSchema"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(err.exit_code(), 1);
    assert_eq!(ledger.forwarded(), 0);
    assert!(inner.submissions().await.is_empty());
    assert!(!inner.is_connected());
}

#[tokio::test]
async fn test_rejected_delegation_fails_listings_only() {
    let inner = memory_ledger();
    let ledger = Arc::new(FaultyLedger::new(inner.clone()).reject_delegation());
    let (_shutdown, rx) = watch::channel(false);

    let report = execute(ledger, config(3, 2, 1), rx).await.unwrap();
    match &report.delegation {
        Some(e) => assert_eq!(e.name, "Unauthorized"),
        None => panic!("delegation should have been rejected"),
    }
    assert!(inner.schema(&report.schema_id).await.is_some());

    assert_eq!(report.products.anchored.len(), 3);
    assert_eq!(report.listings.attempted, 3);
    assert!(report.listings.anchored.is_empty());
    assert_eq!(report.listings.failures.len(), 3);
    for failure in &report.listings.failures {
        match &failure.reason {
            FailureReason::Rejected(e) => assert_eq!(e.name, "Unauthorized"),
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(report.orders.attempted, 0);
    assert_eq!(report.ratings.attempted, 0);
    assert_eq!(inner.anchor_count(AnchorRole::Listing).await, 0);
}

#[tokio::test]
async fn test_connection_loss_is_fatal() {
    let inner = memory_ledger();
    // Schema, delegation and two products get through.
    let ledger = Arc::new(FaultyLedger::new(inner.clone()).disconnect_after(4));
    let (_shutdown, rx) = watch::channel(false);

    let err = execute(ledger.clone(), config(5, 2, 1), rx).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Connection(ConnectionError::Unreachable(_))
    ));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(ledger.forwarded(), 4);
    assert_eq!(inner.anchor_count(AnchorRole::Product).await, 2);
    assert!(!inner.is_connected());
}

#[tokio::test]
async fn test_links_only_point_backwards() {
    let (ledger, report) = complete_run(config(4, 6, 4)).await;
    assert_eq!(report.ratings.anchored.len(), 4);

    let mut seen = HashSet::new();
    for submission in ledger.submissions().await {
        let Call::Anchor(draft) = submission.call else {
            continue;
        };
        if let Some(link) = draft.link {
            assert!(seen.contains(&link), "{:?} links forward to {:?}", draft.id, link);
        }
        if submission.outcome.is_ok() {
            assert!(seen.insert(draft.id));
        }
    }
    assert_eq!(seen.len(), 4 + 4 + 6 + 4);
}

#[tokio::test]
async fn test_ratings_link_orders_with_bounded_scores() {
    let mut cfg = config(2, 3, 6);
    cfg.rating_min = 3;
    cfg.rating_max = 4;
    let (_, report) = complete_run(cfg).await;

    let order_ids: HashSet<AnchorId> = report.orders.ids().into_iter().collect();
    for rating in &report.ratings.anchored {
        assert!(order_ids.contains(&rating.record.link.unwrap()));
        let score = rating.record.rating.unwrap();
        assert!((3..=4).contains(&score));
    }
}

#[tokio::test]
async fn test_remote_endpoint_unreachable() {
    let cfg = WorkflowConfig {
        endpoint: "wss://staging.cord.network".into(),
        ..config(1, 1, 1)
    };
    let (_shutdown, rx) = watch::channel(false);
    let err = run(cfg, rx).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Connection(_)));
    assert_ne!(err.exit_code(), 0);
}
