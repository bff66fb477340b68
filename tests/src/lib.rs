//! # Validator-Chain Test Suite
//!
//! Cross-crate tests that run whole validator clusters in one process.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # SimCluster, forged proposals and votes
//! ├── integration/      # Scenario tests
//! │   ├── agreement.rs
//! │   ├── membership.rs
//! │   └── catch_up.rs
//! └── properties/       # proptest suites
//!     ├── safety.rs
//!     ├── idempotence.rs
//!     ├── monotonic.rs
//!     └── tie_break.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p vc-tests
//! cargo test -p vc-tests properties::
//! ```

pub mod harness;
pub mod integration;
pub mod properties;
