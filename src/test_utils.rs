//! Shared test utilities for the personalization core.
//!
//! This module provides common helper functions for setting up test databases
//! and creating configs and submissions with sensible defaults.

use crate::{
    core::{
        registry::{self, NewConfig},
        submission::{self, NewSubmission},
    },
    entities::{Submission, SubmissionColumn, personalization_config, personalization_submission},
    errors::Result,
    models::{
        LivePreviewMode, LockStage, PersonalizationType, PriceImpact, SubmissionPayload,
        TextConfig, ValidationErrors, ValidationStatus,
    },
};
use sea_orm::{DatabaseConnection, prelude::*, sea_query::Expr};
use tracing_subscriber::EnvFilter;

/// Listing used by most tests.
pub const TEST_LISTING: &str = "listing-mug";
/// Buyer used by most tests.
pub const TEST_CUSTOMER: &str = "customer-1";
/// Seller used by snapshot tests.
pub const TEST_PROVIDER: &str = "provider-1";

/// Installs a test-writer subscriber at `trace` unless `RUST_LOG` says otherwise.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace")))
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// An unsaved config model for pure validation and pricing tests.
///
/// # Defaults
/// * `id`: 1, on [`TEST_LISTING`]
/// * enabled, no sub-configs, no price impact, locks at add-to-cart
pub fn config_model(
    personalization_type: PersonalizationType,
    is_required: bool,
) -> personalization_config::Model {
    let now = chrono::Utc::now();
    personalization_config::Model {
        id: 1,
        listing_id: TEST_LISTING.to_string(),
        label: "Test slot".to_string(),
        personalization_type,
        is_enabled: true,
        is_required,
        text_config: None,
        image_upload_config: None,
        font_config: None,
        color_config: None,
        live_preview_mode: LivePreviewMode::default(),
        price_impact: PriceImpact::None,
        lock_after_stage: LockStage::AddToCart,
        display_order: 0,
        help_text: None,
        created_at: now,
        updated_at: now,
    }
}

/// An unsaved text submission for config 1, for mocked database tests.
///
/// # Defaults
/// * `id`: 7, by [`TEST_CUSTOMER`] on [`TEST_LISTING`], not attached to a cart item
/// * revision 1; `is_locked` also sets the lock stage and time
pub fn submission_model(is_locked: bool) -> personalization_submission::Model {
    let now = chrono::Utc::now();
    personalization_submission::Model {
        id: 7,
        customer_id: TEST_CUSTOMER.to_string(),
        listing_id: TEST_LISTING.to_string(),
        config_id: 1,
        submission_type: PersonalizationType::Text,
        payload: SubmissionPayload::text("Sam"),
        cart_item_id: None,
        booking_id: None,
        production_order_id: None,
        calculated_price_impact: 0.0,
        validation_status: ValidationStatus::Valid,
        validation_errors: ValidationErrors::default(),
        is_locked,
        locked_at: is_locked.then_some(now),
        locked_reason: is_locked.then_some(LockStage::AddToCart),
        revision: 1,
        created_at: now,
        updated_at: now,
    }
}

/// A text config ready to be passed to [`registry::create_config`].
pub fn text_config_spec(label: &str, is_required: bool, max_length: u32) -> NewConfig {
    let mut config = NewConfig::new(label, PersonalizationType::Text);
    config.is_required = is_required;
    config.text_config = Some(TextConfig {
        max_length,
        ..Default::default()
    });
    config
}

/// Creates an "Engraving" text config on [`TEST_LISTING`].
pub async fn create_test_text_config(
    db: &DatabaseConnection,
    is_required: bool,
    max_length: u32,
) -> Result<personalization_config::Model> {
    registry::create_config(db, TEST_LISTING, text_config_spec("Engraving", is_required, max_length))
        .await
}

/// Creates an optional text config with the given price rule.
pub async fn create_priced_text_config(
    db: &DatabaseConnection,
    price_impact: PriceImpact,
) -> Result<personalization_config::Model> {
    let mut config = text_config_spec("Engraving", false, 50);
    config.price_impact = price_impact;
    registry::create_config(db, TEST_LISTING, config).await
}

/// Creates a draft text submission by [`TEST_CUSTOMER`] for `config`.
pub async fn create_test_submission(
    db: &DatabaseConnection,
    config: &personalization_config::Model,
    text: &str,
) -> Result<personalization_submission::Model> {
    submission::create_submission(
        db,
        TEST_CUSTOMER,
        &config.listing_id,
        NewSubmission::new(config.id, SubmissionPayload::text(text)),
        None,
    )
    .await
}

/// Marks a submission locked directly in the table, as a freeze would.
pub async fn lock_submission_for_test(db: &DatabaseConnection, submission_id: i64) -> Result<()> {
    Submission::update_many()
        .col_expr(SubmissionColumn::IsLocked, Expr::value(true))
        .col_expr(SubmissionColumn::LockedReason, Expr::value(LockStage::AddToCart))
        .col_expr(SubmissionColumn::LockedAt, Expr::value(chrono::Utc::now()))
        .filter(SubmissionColumn::Id.eq(submission_id))
        .exec(db)
        .await?;
    Ok(())
}
