//! Configuration files and overrides.

use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;
use tokio::sync::watch;

use ondc_anchor::ledger::{MemoryLedger, MemoryLedgerConfig};
use ondc_anchor::{execute, Args, FailureReason, WorkflowConfig, WorkflowError};

fn write_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_file(
        r#"
        endpoint = "memory://test"
        product_count = 2
        order_count = 3
        rating_count = 1
        store_name = "XYZ Store"
        price = 99
        rng_seed = 5
        "#,
    );

    let config = WorkflowConfig::load(file.path()).unwrap();
    assert_eq!(config.endpoint, "memory://test");
    assert_eq!(config.product_count, 2);
    assert_eq!(config.store_name, "XYZ Store");
    assert_eq!(config.price, 99);
    assert_eq!(config.ack_timeout_secs, 120);
}

#[test]
fn test_flags_override_file() {
    let file = write_file("product_count = 2\norder_count = 3\n");
    let args = Args {
        config: Some(file.path().to_path_buf()),
        orders: Some(1),
        ..Default::default()
    };
    let config = args.resolve().unwrap();
    assert_eq!(config.product_count, 2);
    assert_eq!(config.order_count, 1);
}

#[test]
fn test_invalid_file_is_config_error() {
    let file = write_file("rating_min = 5\nrating_max = 1\n");
    let args = Args {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let err = args.resolve().unwrap_err();
    assert!(matches!(err, WorkflowError::Config(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_missing_file_is_config_error() {
    let args = Args {
        config: Some("/nonexistent/ondc-anchor.toml".into()),
        ..Default::default()
    };
    assert!(matches!(args.resolve(), Err(WorkflowError::Config(_))));
}

#[tokio::test]
async fn test_custom_schema_file() {
    let schema = write_file(
        r#"{
            "name": "Grocery",
            "properties": {
                "name": { "type": "string" },
                "description": { "type": "string" },
                "countryOfOrigin": { "type": "string" },
                "gtin": { "type": "string" },
                "brand": { "type": "string" },
                "manufacturer": { "type": "string" },
                "model": { "type": "string" },
                "sku": { "type": "string" }
            }
        }"#,
    );
    let config = WorkflowConfig {
        product_count: 1,
        order_count: 1,
        rating_count: 1,
        rng_seed: Some(1),
        schema_path: Some(schema.path().to_path_buf()),
        ..Default::default()
    };

    let ledger = Arc::new(MemoryLedger::new("custom", MemoryLedgerConfig::default()));
    let (_shutdown, rx) = watch::channel(false);
    let report = execute(ledger, config, rx).await.unwrap();
    assert!(report.schema_name.starts_with("Grocery:"));
    assert_eq!(report.ratings.anchored.len(), 1);
}

#[tokio::test]
async fn test_nonconforming_schema_fails_items_not_run() {
    let schema = write_file(
        r#"{ "name": "Strict", "properties": { "name": { "type": "integer" } } }"#,
    );
    let config = WorkflowConfig {
        product_count: 2,
        rng_seed: Some(1),
        schema_path: Some(schema.path().to_path_buf()),
        ..Default::default()
    };

    let ledger = Arc::new(MemoryLedger::new("strict", MemoryLedgerConfig::default()));
    let (_shutdown, rx) = watch::channel(false);
    let report = execute(ledger, config, rx).await.unwrap();
    assert_eq!(report.products.attempted, 2);
    assert!(report.products.anchored.is_empty());
    assert!(report
        .products
        .failures
        .iter()
        .all(|f| matches!(f.reason, FailureReason::Validation(_))));
    assert_eq!(report.listings.attempted, 0);
}
