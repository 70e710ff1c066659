//! Personalization submission entity - one buyer's value for one config.
//!
//! A submission moves `draft -> attached -> locked` and never back. Once
//! `is_locked` is set no column may change; see [`crate::core::submission`].

use crate::models::{
    LockStage, PersonalizationType, SubmissionPayload, ValidationErrors, ValidationStatus,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Personalization submission database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "personalization_submissions")]
pub struct Model {
    /// Unique identifier for the submission
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Buyer who owns the submission
    pub customer_id: String,
    /// Listing being personalized
    pub listing_id: String,
    /// Config slot this submission answers
    pub config_id: i64,
    /// Mirrors the payload variant, kept as a column for filtering
    pub submission_type: PersonalizationType,
    /// The buyer's values
    #[sea_orm(column_type = "Json")]
    pub payload: SubmissionPayload,
    /// Cart line, set once and never reassigned
    pub cart_item_id: Option<String>,
    /// Booking, when the submission was created against one directly
    pub booking_id: Option<String>,
    /// Production order, when created against one directly
    pub production_order_id: Option<String>,
    /// Incremental price computed on the last write
    pub calculated_price_impact: f64,
    /// Outcome of the last validation pass
    pub validation_status: ValidationStatus,
    /// User-facing messages from the last validation pass
    #[sea_orm(column_type = "Json")]
    pub validation_errors: ValidationErrors,
    /// Frozen flag
    pub is_locked: bool,
    /// When the submission was frozen
    pub locked_at: Option<DateTimeUtc>,
    /// Stage that froze the submission
    pub locked_reason: Option<LockStage>,
    /// Incremented on every accepted write
    pub revision: i32,
    /// When the submission was created
    pub created_at: DateTimeUtc,
    /// When the submission was last written
    pub updated_at: DateTimeUtc,
}

/// Where a submission sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    /// Unlocked, not yet on a cart line
    Draft,
    /// Unlocked, attached to a cart line
    Attached,
    /// Frozen into a snapshot
    Locked,
}

impl Model {
    /// Derives the lifecycle state from the lock flag and cart link.
    #[must_use]
    pub const fn state(&self) -> SubmissionState {
        if self.is_locked {
            SubmissionState::Locked
        } else if self.cart_item_id.is_some() {
            SubmissionState::Attached
        } else {
            SubmissionState::Draft
        }
    }
}

/// Submissions carry their config id but no foreign key (see the config entity).
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
