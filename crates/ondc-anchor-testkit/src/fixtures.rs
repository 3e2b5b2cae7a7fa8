//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use ondc_anchor_core::{
    AnchorId, Content, ContentRecord, ContentStream, ContentStreamBuilder, Identity, KeyKind,
    Schema, SchemaDefinition, Value,
};
use ondc_anchor_ledger::{
    AckLevel, AnchorSubmitter, MemoryLedger, MemoryLedgerConfig, SubmitterConfig,
};

/// A small product schema.
pub const TEST_SCHEMA_JSON: &str = r#"{
    "name": "Test Product",
    "description": "Product schema for tests",
    "properties": {
        "name": { "type": "string" },
        "gtin": { "type": "string" },
        "price": { "type": "integer" }
    },
    "required": ["name"]
}"#;

/// A schema, its controller and a seller delegate.
pub struct TestFixture {
    pub owner: Identity,
    pub seller: Identity,
    pub schema: Schema,
}

impl TestFixture {
    /// Controller `//Bob`, seller `//SellerOne`, Sr25519 keys.
    pub fn new() -> Self {
        Self::with_kind(KeyKind::Sr25519)
    }

    /// Same participants with a chosen key kind.
    pub fn with_kind(kind: KeyKind) -> Self {
        let owner = Identity::derive("//Bob", kind).expect("dev uri");
        let seller = Identity::derive("//SellerOne", kind).expect("dev uri");
        let definition = SchemaDefinition::from_json(TEST_SCHEMA_JSON).expect("test schema");
        let schema = Schema::new(definition, owner.account_id()).expect("valid schema");
        Self {
            owner,
            seller,
            schema,
        }
    }

    /// A product stream authored by the owner.
    pub fn product(&self, name: &str) -> ContentStream {
        self.stream(&self.owner, product_content(name), None)
    }

    /// A stream over the fixture schema.
    pub fn stream(
        &self,
        holder: &Identity,
        content: Content,
        link: Option<AnchorId>,
    ) -> ContentStream {
        ContentStream::build(&self.schema, content, holder, link).expect("valid stream")
    }

    /// A stream with an explicit nonce.
    pub fn stream_with_nonce(
        &self,
        holder: &Identity,
        content: Content,
        link: Option<AnchorId>,
        nonce: [u8; 16],
    ) -> ContentStream {
        let record =
            ContentRecord::new(&self.schema, content, holder.account_id()).expect("valid record");
        let mut builder = ContentStreamBuilder::new(record).nonce(nonce);
        if let Some(link) = link {
            builder = builder.link(link);
        }
        builder.sign(holder).expect("holder signs")
    }

    /// An in-process ledger with the schema registered and delegated to
    /// the seller.
    pub async fn registered_ledger(&self) -> (Arc<MemoryLedger>, AnchorSubmitter) {
        let ledger = Arc::new(MemoryLedger::new("fixture", MemoryLedgerConfig::default()));
        let submitter = AnchorSubmitter::new(ledger.clone(), SubmitterConfig::default());
        submitter
            .register_schema(&self.schema, &self.owner, AckLevel::Accepted)
            .await
            .expect("schema registers");
        submitter
            .add_delegate(
                &self.schema,
                self.seller.account_id(),
                &self.owner,
                AckLevel::Accepted,
            )
            .await
            .expect("delegate added");
        (ledger, submitter)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Product content conforming to [`TEST_SCHEMA_JSON`].
pub fn product_content(name: &str) -> Content {
    let mut content = Content::new();
    content.insert("name".into(), Value::from(name));
    content.insert("gtin".into(), Value::from(format!("gtin-{name}")));
    content
}

/// Distinct identities for multi-party tests.
pub fn participants(count: usize) -> Vec<Identity> {
    (0..count)
        .map(|i| Identity::derive(&format!("//Party{i}"), KeyKind::Sr25519).expect("dev uri"))
        .collect()
}
