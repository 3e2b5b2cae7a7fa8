//! Workflow configuration.
//!
//! Defaults reproduce the reference commerce run. A TOML file may override
//! any subset of fields, and command-line flags override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use ondc_anchor_core::SchemaDefinition;
use ondc_anchor_ledger::memory::RATING_RANGE;
use ondc_anchor_ledger::{MemoryLedgerConfig, SubmitterConfig};

use crate::error::{Result, WorkflowError};

/// Built-in product schema definition.
pub const PRODUCT_SCHEMA_JSON: &str = include_str!("../res/prod-schema.json");

/// Dev URIs of the run's participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParticipantUris {
    /// Pays for and signs listing, order and rating transactions.
    pub network_author: String,
    /// Controls the product schema and creates products.
    pub product_owner: String,
    pub seller_one: String,
    pub seller_two: String,
    pub buyer_one: String,
}

impl Default for ParticipantUris {
    fn default() -> Self {
        Self {
            network_author: "//Alice".into(),
            product_owner: "//Bob".into(),
            seller_one: "//SellerOne".into(),
            seller_two: "//SellerTwo".into(),
            buyer_one: "//BuyerOne".into(),
        }
    }
}

/// Configuration for one workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Ledger endpoint, `memory://<name>` or `ws(s)://…`.
    pub endpoint: String,
    pub product_count: usize,
    pub order_count: usize,
    pub rating_count: usize,
    /// Store name hashed with the seller into the store key.
    pub store_name: String,
    /// Listing price in minor currency units.
    pub price: u32,
    pub rating_min: u8,
    pub rating_max: u8,
    /// Upper bound on each acknowledgement wait, in seconds.
    pub ack_timeout_secs: u64,
    /// Block interval of the in-process ledger, in milliseconds.
    pub block_time_ms: u64,
    /// Seed for order/rating sampling and stream nonces. Entropy when absent.
    pub rng_seed: Option<u64>,
    /// JSON schema definition; the built-in product schema when absent.
    pub schema_path: Option<PathBuf>,
    pub participants: ParticipantUris,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            endpoint: "memory://local".into(),
            product_count: 10,
            order_count: 8,
            rating_count: 5,
            store_name: "ABC Store".into(),
            price: 135_000,
            rating_min: 1,
            rating_max: 5,
            ack_timeout_secs: 120,
            block_time_ms: 0,
            rng_seed: None,
            schema_path: None,
            participants: ParticipantUris::default(),
        }
    }
}

impl WorkflowConfig {
    /// Parse a configuration from TOML text. Missing fields take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| WorkflowError::Config(e.to_string()))
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| WorkflowError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Check the configuration is usable before connecting.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(WorkflowError::Config("endpoint must not be empty".into()));
        }
        if self.store_name.trim().is_empty() {
            return Err(WorkflowError::Config("store_name must not be empty".into()));
        }
        if self.ack_timeout_secs == 0 {
            return Err(WorkflowError::Config(
                "ack_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.rating_min > self.rating_max {
            return Err(WorkflowError::Config(format!(
                "rating_min {} exceeds rating_max {}",
                self.rating_min, self.rating_max
            )));
        }
        if !RATING_RANGE.contains(&self.rating_min) || !RATING_RANGE.contains(&self.rating_max) {
            return Err(WorkflowError::Config(format!(
                "rating range {}..={} outside {}..={}",
                self.rating_min,
                self.rating_max,
                RATING_RANGE.start(),
                RATING_RANGE.end()
            )));
        }
        Ok(())
    }

    /// The schema definition to register, before its per-run name suffix.
    pub fn schema_definition(&self) -> Result<SchemaDefinition> {
        match &self.schema_path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| WorkflowError::Config(format!("{}: {}", path.display(), e)))?;
                Ok(SchemaDefinition::from_json(&text)?)
            }
            None => Ok(SchemaDefinition::from_json(PRODUCT_SCHEMA_JSON)?),
        }
    }

    pub fn submitter_config(&self) -> SubmitterConfig {
        SubmitterConfig {
            ack_timeout: Duration::from_secs(self.ack_timeout_secs),
        }
    }

    pub fn ledger_config(&self) -> MemoryLedgerConfig {
        MemoryLedgerConfig {
            block_time: Duration::from_millis(self.block_time_ms),
            ..Default::default()
        }
    }
}

/// ondc-anchor - anchor a product, listing, order and rating run on a ledger
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ondc-anchor")]
#[command(about = "Anchor ONDC commerce records as linked content streams")]
pub struct Args {
    /// TOML configuration file
    #[arg(long, short = 'c', env = "ONDC_ANCHOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ledger endpoint (memory://<name>, ws://, wss://)
    #[arg(long, env = "ONDC_ANCHOR_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Number of products to create
    #[arg(long)]
    pub products: Option<usize>,

    /// Number of orders to place
    #[arg(long)]
    pub orders: Option<usize>,

    /// Number of ratings to give
    #[arg(long)]
    pub ratings: Option<usize>,

    /// Seed for reproducible sampling
    #[arg(long, env = "ONDC_ANCHOR_SEED")]
    pub seed: Option<u64>,

    /// JSON schema definition replacing the built-in product schema
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Acknowledgement timeout in seconds
    #[arg(long, env = "ONDC_ANCHOR_ACK_TIMEOUT")]
    pub ack_timeout: Option<u64>,
}

impl Args {
    /// Resolve the effective configuration: file, then flags.
    pub fn resolve(&self) -> Result<WorkflowConfig> {
        let mut config = match &self.config {
            Some(path) => WorkflowConfig::load(path)?,
            None => WorkflowConfig::default(),
        };

        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(n) = self.products {
            config.product_count = n;
        }
        if let Some(n) = self.orders {
            config.order_count = n;
        }
        if let Some(n) = self.ratings {
            config.rating_count = n;
        }
        if let Some(seed) = self.seed {
            config.rng_seed = Some(seed);
        }
        if let Some(path) = &self.schema {
            config.schema_path = Some(path.clone());
        }
        if let Some(secs) = self.ack_timeout {
            config.ack_timeout_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }
}
