//! The workflow orchestrator.
//!
//! Drives one commerce run through its stages, each fully materialized
//! before the next starts:
//!
//! ```text
//! identities -> schema -> products -> listings -> orders -> ratings
//! ```
//!
//! Exactly one submission is in flight at a time, so every `link` a record
//! carries refers to an anchor whose disposition is already known. A
//! rejected item is recorded in its stage report and left out of later
//! stages; a connection failure or shutdown request ends the run.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use ondc_anchor_core::{
    AnchorId, Content, ContentRecord, ContentStream, ContentStreamBuilder, Identity, KeyKind,
    RoleKeys, Schema, SchemaId, StoreId, ValidationError, Value, NONCE_LEN,
};
use ondc_anchor_ledger::{
    connect, AckLevel, AnchorDraft, AnchorRole, AnchorSubmitter, AnchoredRecord, Ledger,
    SubmissionError, SubmitError,
};

use crate::config::{ParticipantUris, WorkflowConfig};
use crate::error::{Result, WorkflowError};

/// The identities taking part in a run.
#[derive(Debug, Clone)]
pub struct Participants {
    /// Signs and pays for listing, order and rating transactions.
    pub network_author: Identity,
    /// Its authentication key controls the product schema and authors
    /// products; its anchor key submits them.
    pub product_owner: RoleKeys,
    /// Schema delegate; authors every listing.
    pub seller_one: Identity,
    pub seller_two: Identity,
    /// Authors every order and rating.
    pub buyer_one: Identity,
}

impl Participants {
    /// Derive all participants as Sr25519 identities.
    pub fn derive(uris: &ParticipantUris) -> std::result::Result<Self, ValidationError> {
        let derive = |uri: &str| Identity::derive(uri, KeyKind::Sr25519);
        Ok(Self {
            network_author: derive(&uris.network_author)?,
            product_owner: RoleKeys::from_uri(&uris.product_owner, KeyKind::Sr25519)?,
            seller_one: derive(&uris.seller_one)?,
            seller_two: derive(&uris.seller_two)?,
            buyer_one: derive(&uris.buyer_one)?,
        })
    }
}

/// A stream the ledger acknowledged, with the position it was built at.
#[derive(Debug, Clone)]
pub struct Anchored {
    pub index: usize,
    pub stream: ContentStream,
    pub record: AnchoredRecord,
}

impl Anchored {
    /// On-chain id, the value later records link to.
    pub fn id(&self) -> AnchorId {
        self.record.id
    }
}

/// Why a stage item was not anchored.
#[derive(Debug)]
pub enum FailureReason {
    /// The content or stream could not be built.
    Validation(ValidationError),
    /// The ledger rejected the transaction.
    Rejected(SubmissionError),
    /// The link does not reference an anchor made earlier in this run.
    DanglingLink,
}

/// One item that did not make it into a stage's output.
#[derive(Debug)]
pub struct ItemFailure {
    pub index: usize,
    /// The intended link target.
    pub link: Option<AnchorId>,
    pub reason: FailureReason,
}

/// Per-item outcomes of one stage.
#[derive(Debug)]
pub struct StageReport {
    pub role: AnchorRole,
    pub attempted: usize,
    pub anchored: Vec<Anchored>,
    pub failures: Vec<ItemFailure>,
}

impl StageReport {
    fn new(role: AnchorRole) -> Self {
        Self {
            role,
            attempted: 0,
            anchored: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// "N of M <role>s anchored".
    pub fn summary(&self) -> String {
        format!(
            "{} of {} {}s anchored",
            self.anchored.len(),
            self.attempted,
            self.role
        )
    }

    /// On-chain ids of the anchored items, in submission order.
    pub fn ids(&self) -> Vec<AnchorId> {
        self.anchored.iter().map(Anchored::id).collect()
    }

    fn invalid(&mut self, index: usize, link: Option<AnchorId>, err: ValidationError) {
        warn!(role = %self.role, index, link = ?link, error = %err, "Could not build stream");
        self.failures.push(ItemFailure {
            index,
            link,
            reason: FailureReason::Validation(err),
        });
    }
}

/// Outcome of a complete run.
#[derive(Debug)]
pub struct RunReport {
    pub schema_id: SchemaId,
    pub schema_name: String,
    /// Set when delegating the schema to the seller was rejected.
    pub delegation: Option<SubmissionError>,
    pub products: StageReport,
    pub listings: StageReport,
    pub orders: StageReport,
    pub ratings: StageReport,
}

impl RunReport {
    pub fn stages(&self) -> [&StageReport; 4] {
        [&self.products, &self.listings, &self.orders, &self.ratings]
    }

    /// Human-readable summary, one line per stage.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("schema {} anchored", self.schema_name)];
        lines.extend(self.stages().iter().map(|s| s.summary()));
        lines
    }
}

/// One workflow run over a ledger connection.
pub struct Workflow {
    submitter: AnchorSubmitter,
    config: WorkflowConfig,
    participants: Participants,
    rng: StdRng,
    shutdown: watch::Receiver<bool>,
    /// Ids anchored so far in this run; every link must be in here.
    anchored: HashSet<AnchorId>,
    /// Anchor submissions started so far. Schema setup does not count.
    attempted: usize,
}

impl Workflow {
    /// Set up a run: validate the configuration and derive identities.
    pub fn new(
        ledger: Arc<dyn Ledger>,
        config: WorkflowConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        config.validate()?;
        let participants = Participants::derive(&config.participants)?;

        info!(
            network_author = %participants.network_author.address(),
            product_owner = %participants.product_owner.authentication.address(),
            product_anchor = %participants.product_owner.anchor.address(),
            product_delegation = %participants.product_owner.delegation.address(),
            product_box_key = %hex::encode(participants.product_owner.encryption.public_key()),
            seller_one = %participants.seller_one.address(),
            seller_two = %participants.seller_two.address(),
            buyer_one = %participants.buyer_one.address(),
            "Identities created"
        );

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            submitter: AnchorSubmitter::new(ledger, config.submitter_config()),
            config,
            participants,
            rng,
            shutdown,
            anchored: HashSet::new(),
            attempted: 0,
        })
    }

    pub fn participants(&self) -> &Participants {
        &self.participants
    }

    /// Number of anchor submissions started so far.
    pub fn attempted(&self) -> usize {
        self.attempted
    }

    /// Run every stage in order.
    pub async fn run(&mut self) -> Result<RunReport> {
        self.check_shutdown()?;

        let (schema, delegation) = self.register_schema().await?;
        let products = self.anchor_products(&schema).await?;
        let listings = self.anchor_listings(&schema, &products.anchored).await?;
        let orders = self.place_orders(&schema, &listings.anchored).await?;
        let ratings = self.give_ratings(&schema, &orders.anchored).await?;

        Ok(RunReport {
            schema_id: schema.id(),
            schema_name: schema.name().to_owned(),
            delegation,
            products,
            listings,
            orders,
            ratings,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stages
    // ─────────────────────────────────────────────────────────────────────────

    /// Register the product schema and delegate it to seller one.
    ///
    /// A rejected registration ends the run; a rejected delegation is
    /// returned for the report and the run goes on.
    pub async fn register_schema(&mut self) -> Result<(Schema, Option<SubmissionError>)> {
        let suffix = self.next_uuid().to_string();
        let definition = self.config.schema_definition()?.with_name_suffix(&suffix);
        let owner = self.participants.product_owner.authentication.clone();
        let schema = Schema::new(definition, owner.account_id())?;

        info!(
            schema = %schema.id(),
            name = %schema.name(),
            cid = %schema.cid(),
            controller = %owner.address(),
            "Anchoring schema"
        );

        self.check_shutdown()?;
        let outcome = until_shutdown(
            &self.shutdown,
            self.submitter
                .register_schema(&schema, &owner, AckLevel::Accepted),
        )
        .await;
        match self.interrupted_if_none(outcome)? {
            Ok(ack) => info!(schema = %schema.id(), tx = %ack.tx_hash.to_hex(), "Schema created"),
            Err(SubmitError::Rejected(e)) => {
                error!(code = e.code, name = %e.name, "Schema registration rejected: {}", e.message);
                return Err(WorkflowError::SchemaRegistration(e));
            }
            Err(SubmitError::Connection(e)) => return Err(e.into()),
        }

        let delegate = self.participants.seller_one.account_id();
        self.check_shutdown()?;
        let outcome = until_shutdown(
            &self.shutdown,
            self.submitter
                .add_delegate(&schema, delegate, &owner, AckLevel::Accepted),
        )
        .await;
        let delegation = match self.interrupted_if_none(outcome)? {
            Ok(_) => {
                info!(schema = %schema.id(), delegate = %self.participants.seller_one.address(), "Schema delegation added");
                None
            }
            Err(SubmitError::Rejected(e)) => {
                warn!(code = e.code, name = %e.name, "Schema delegation rejected: {}", e.message);
                Some(e)
            }
            Err(SubmitError::Connection(e)) => return Err(e.into()),
        };

        Ok((schema, delegation))
    }

    /// Create the configured number of products, authored by the product
    /// owner and submitted with its anchor key.
    pub async fn anchor_products(&mut self, schema: &Schema) -> Result<StageReport> {
        let owner = self.participants.product_owner.authentication.clone();
        let anchor_key = self.participants.product_owner.anchor.clone();
        let mut report = StageReport::new(AnchorRole::Product);
        info!(count = self.config.product_count, "Anchoring products");

        for index in 0..self.config.product_count {
            report.attempted += 1;
            let content = self.product_content();
            let stream = match self.build_stream(schema, content, &owner, None) {
                Ok(stream) => stream,
                Err(e) => {
                    report.invalid(index, None, e);
                    continue;
                }
            };
            let draft = AnchorDraft::from_stream(AnchorRole::Product, &stream);
            self.submit_anchor(&mut report, index, stream, draft, &anchor_key)
                .await?;
        }

        info!("{}", report.summary());
        Ok(report)
    }

    /// List every anchored product: authored by seller one, submitted by
    /// the network author.
    pub async fn anchor_listings(
        &mut self,
        schema: &Schema,
        products: &[Anchored],
    ) -> Result<StageReport> {
        let seller = self.participants.seller_one.clone();
        let author = self.participants.network_author.clone();
        let store_id = StoreId::derive(&self.config.store_name, &seller.account_id());
        let price = self.config.price;
        let mut report = StageReport::new(AnchorRole::Listing);
        info!(count = products.len(), store = %store_id, price, "Listing products");

        for (index, product) in products.iter().enumerate() {
            report.attempted += 1;
            let link = product.id();
            let content = product.stream.content().clone();
            let stream = match self.build_stream(schema, content, &seller, Some(link)) {
                Ok(stream) => stream,
                Err(e) => {
                    report.invalid(index, Some(link), e);
                    continue;
                }
            };
            let draft =
                AnchorDraft::from_stream(AnchorRole::Listing, &stream).with_store(store_id, price);
            self.submit_anchor(&mut report, index, stream, draft, &author)
                .await?;
        }

        info!("{}", report.summary());
        Ok(report)
    }

    /// Place orders against uniformly sampled listings, with replacement.
    pub async fn place_orders(
        &mut self,
        schema: &Schema,
        listings: &[Anchored],
    ) -> Result<StageReport> {
        let buyer = self.participants.buyer_one.clone();
        let author = self.participants.network_author.clone();
        let mut report = StageReport::new(AnchorRole::Order);

        if listings.is_empty() {
            warn!("No listings anchored, skipping orders");
            return Ok(report);
        }
        info!(count = self.config.order_count, pool = listings.len(), "Placing orders");

        for index in 0..self.config.order_count {
            report.attempted += 1;
            let listing = &listings[self.rng.gen_range(0..listings.len())];
            let link = listing.id();
            let content = listing.stream.content().clone();
            let stream = match self.build_stream(schema, content, &buyer, Some(link)) {
                Ok(stream) => stream,
                Err(e) => {
                    report.invalid(index, Some(link), e);
                    continue;
                }
            };
            let mut draft = AnchorDraft::from_stream(AnchorRole::Order, &stream);
            if let Some(store_id) = listing.record.store_id {
                draft = draft.with_store(store_id, listing.record.price.unwrap_or(self.config.price));
            }
            self.submit_anchor(&mut report, index, stream, draft, &author)
                .await?;
        }

        info!("{}", report.summary());
        Ok(report)
    }

    /// Rate uniformly sampled orders, with replacement.
    ///
    /// The rating record carries the content of the order it rates.
    pub async fn give_ratings(
        &mut self,
        schema: &Schema,
        orders: &[Anchored],
    ) -> Result<StageReport> {
        let buyer = self.participants.buyer_one.clone();
        let author = self.participants.network_author.clone();
        let scores = self.config.rating_min..=self.config.rating_max;
        let mut report = StageReport::new(AnchorRole::Rating);

        if orders.is_empty() {
            warn!("No orders anchored, skipping ratings");
            return Ok(report);
        }
        info!(count = self.config.rating_count, pool = orders.len(), "Giving ratings");

        for index in 0..self.config.rating_count {
            report.attempted += 1;
            let order = &orders[self.rng.gen_range(0..orders.len())];
            let link = order.id();
            let content = order.stream.content().clone();
            let stream = match self.build_stream(schema, content, &buyer, Some(link)) {
                Ok(stream) => stream,
                Err(e) => {
                    report.invalid(index, Some(link), e);
                    continue;
                }
            };
            let score = self.rng.gen_range(scores.clone());
            let mut draft = AnchorDraft::from_stream(AnchorRole::Rating, &stream).with_rating(score);
            if let Some(store_id) = order.record.store_id {
                draft = draft.with_store(store_id, order.record.price.unwrap_or(self.config.price));
            }
            self.submit_anchor(&mut report, index, stream, draft, &author)
                .await?;
        }

        info!("{}", report.summary());
        Ok(report)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    /// Submit one anchor and record its disposition in `report`.
    async fn submit_anchor(
        &mut self,
        report: &mut StageReport,
        index: usize,
        stream: ContentStream,
        draft: AnchorDraft,
        signer: &Identity,
    ) -> Result<()> {
        let role = draft.role;
        let link = draft.link;

        if let Some(target) = link {
            if !self.anchored.contains(&target) {
                error!(role = %role, index, link = %target, "Link does not reference an earlier anchor");
                report.failures.push(ItemFailure {
                    index,
                    link,
                    reason: FailureReason::DanglingLink,
                });
                return Ok(());
            }
        }

        self.begin_submission()?;
        debug!(role = %role, index, cid = %draft.cid, signer = %signer.address(), "Submitting anchor");
        let outcome = until_shutdown(
            &self.shutdown,
            self.submitter.submit(draft, signer, AckLevel::Included),
        )
        .await;

        match self.interrupted_if_none(outcome)? {
            Ok(record) => {
                info!(
                    role = %role,
                    index,
                    id = %record.id,
                    cid = %record.cid,
                    link = ?record.link,
                    "Anchored"
                );
                self.anchored.insert(record.id);
                report.anchored.push(Anchored {
                    index,
                    stream,
                    record,
                });
            }
            Err(SubmitError::Rejected(e)) => {
                warn!(
                    role = %role,
                    index,
                    link = ?link,
                    code = e.code,
                    name = %e.name,
                    "Anchor rejected: {}",
                    e.message
                );
                report.failures.push(ItemFailure {
                    index,
                    link,
                    reason: FailureReason::Rejected(e),
                });
            }
            Err(SubmitError::Connection(e)) => {
                error!(role = %role, index, error = %e, "Ledger connection lost");
                return Err(e.into());
            }
        }
        Ok(())
    }

    fn build_stream(
        &mut self,
        schema: &Schema,
        content: Content,
        holder: &Identity,
        link: Option<AnchorId>,
    ) -> std::result::Result<ContentStream, ValidationError> {
        let record = ContentRecord::new(schema, content, holder.account_id())?;
        let mut builder = ContentStreamBuilder::new(record).nonce(self.rng.gen::<[u8; NONCE_LEN]>());
        if let Some(link) = link {
            builder = builder.link(link);
        }
        builder.sign(holder)
    }

    fn product_content(&mut self) -> Content {
        let mut content = Content::new();
        content.insert("name".into(), Value::from("Sony OLED 55 Inch Television"));
        content.insert("description".into(), Value::from("Best Television in the World"));
        content.insert("countryOfOrigin".into(), Value::from("India"));
        content.insert("gtin".into(), Value::from(self.next_uuid().to_string()));
        content.insert("brand".into(), Value::from("Sony OLED"));
        content.insert("manufacturer".into(), Value::from("Sony"));
        content.insert("model".into(), Value::from("2022"));
        content.insert("sku".into(), Value::from(self.next_uuid().to_string()));
        content
    }

    fn next_uuid(&mut self) -> Uuid {
        uuid::Builder::from_random_bytes(self.rng.gen()).into_uuid()
    }

    fn check_shutdown(&self) -> Result<()> {
        if *self.shutdown.borrow() {
            info!(attempted = self.attempted, "Shutdown requested");
            return Err(WorkflowError::Interrupted {
                attempted: self.attempted,
            });
        }
        Ok(())
    }

    fn begin_submission(&mut self) -> Result<()> {
        self.check_shutdown()?;
        self.attempted += 1;
        Ok(())
    }

    fn interrupted_if_none<T>(&self, outcome: Option<T>) -> Result<T> {
        outcome.ok_or_else(|| {
            info!(attempted = self.attempted, "Shutdown requested, abandoning submission");
            WorkflowError::Interrupted {
                attempted: self.attempted,
            }
        })
    }
}

/// Drive `fut` unless shutdown is requested first.
async fn until_shutdown<F: Future>(shutdown: &watch::Receiver<bool>, fut: F) -> Option<F::Output> {
    let mut shutdown = shutdown.clone();
    tokio::select! {
        biased;
        _ = wait_for_shutdown(&mut shutdown) => None,
        out = fut => Some(out),
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            // Sender dropped: no request can arrive any more.
            std::future::pending::<()>().await;
        }
    }
}

/// Run a workflow over an open connection, then release the connection
/// whatever the outcome.
pub async fn execute(
    ledger: Arc<dyn Ledger>,
    config: WorkflowConfig,
    shutdown: watch::Receiver<bool>,
) -> Result<RunReport> {
    let result = match Workflow::new(ledger.clone(), config, shutdown) {
        Ok(mut workflow) => workflow.run().await,
        Err(e) => Err(e),
    };

    ledger.disconnect().await;
    info!("Ledger connection released");
    result
}

/// Connect to the configured endpoint and execute a run.
pub async fn run(config: WorkflowConfig, shutdown: watch::Receiver<bool>) -> Result<RunReport> {
    config.validate()?;
    let ledger = connect(&config.endpoint, config.ledger_config()).await?;
    execute(ledger, config, shutdown).await
}
