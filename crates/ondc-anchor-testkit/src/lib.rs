//! # ONDC Anchor Testkit
//!
//! Testing utilities for ONDC anchoring.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: known canonical encodings and CIDs
//! - **Generators**: proptest strategies for content values
//! - **Fixtures**: a schema, its controller and stream helpers
//! - **Ledger doubles**: ledgers that reject chosen items, drop the
//!   connection or never acknowledge
//!
//! ## Golden Vectors
//!
//! ```rust
//! use ondc_anchor_testkit::vectors::{all_vectors, verify_all_vectors};
//!
//! assert!(verify_all_vectors().is_ok());
//! for vector in all_vectors() {
//!     println!("{}: {}", vector.name, vector.expected_hex);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use ondc_anchor_core::{address_of, canonical_content};
//! use ondc_anchor_testkit::generators::content;
//!
//! proptest! {
//!     #[test]
//!     fn address_is_deterministic(c in content()) {
//!         prop_assert_eq!(
//!             address_of(&canonical_content(&c)),
//!             address_of(&canonical_content(&c))
//!         );
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use ondc_anchor_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let stream = fixture.product("Sony OLED 55");
//! assert!(stream.link().is_none());
//! ```

pub mod faulty;
pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use faulty::{FaultyLedger, StalledLedger};
pub use fixtures::{participants, product_content, TestFixture, TEST_SCHEMA_JSON};
pub use generators::{content, value};
pub use vectors::{all_vectors, empty_input_cid, verify_all_vectors, GoldenVector};
