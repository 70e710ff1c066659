//! Framework-agnostic personalization logic, one module per component.
//!
//! Configs feed validation and pricing; submissions are validated and priced
//! on every write, frozen into snapshots, and replayed from reusable setups.

/// Seller-defined personalization slots per listing
pub mod registry;
/// Checks a submission against its config
pub mod validation;
/// Incremental price of personalization choices
pub mod pricing;
/// Buyer submissions and their lock-guarded updates
pub mod submission;
/// Freezing submissions into versioned snapshots
pub mod snapshot;
/// Saved personalization bundles for repeat purchases
pub mod reusable_setup;
