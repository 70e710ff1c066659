//! Unified error types for the personalization core.
//!
//! Validation problems are not errors here: they are returned as data by
//! [`crate::core::validation`]. The variants below are hard failures of the
//! current operation and are surfaced to the caller verbatim.

use thiserror::Error;

/// All errors produced by the personalization core.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file or environment problem
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Underlying store failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Caller supplied an argument that can never succeed
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Human readable reason
        message: String,
    },

    /// A config, submission, snapshot or setup referenced by id does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record that was looked up
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// A write was attempted against a frozen submission
    #[error("Submission {submission_id} is locked and cannot be modified")]
    LockedSubmission {
        /// The locked submission
        submission_id: i64,
    },

    /// The caller edited from an outdated copy of the submission
    #[error(
        "Submission {submission_id} was modified concurrently (expected revision {expected}, found {actual})"
    )]
    StaleRevision {
        /// The contested submission
        submission_id: i64,
        /// Revision the caller based its edit on
        expected: i32,
        /// Revision currently stored
        actual: i32,
    },

    /// A submission is already attached to another cart item
    #[error("Submission {submission_id} is already linked to cart item {cart_item_id}")]
    AlreadyLinked {
        /// The submission being linked
        submission_id: i64,
        /// Cart item it is already attached to
        cart_item_id: String,
    },

    /// Freeze-time revalidation failed; nothing was written
    #[error("Cannot freeze personalization for cart item {cart_item_id}: {}", .errors.join("; "))]
    FreezeIntegrity {
        /// Cart item whose submissions were being frozen
        cart_item_id: String,
        /// Itemized reasons
        errors: Vec<String>,
    },

    /// The active snapshot already belongs to a different order
    #[error("Snapshot for cart item {cart_item_id} was already transferred to booking {booking_id}")]
    SnapshotAlreadyTransferred {
        /// Cart item of the snapshot
        cart_item_id: String,
        /// Booking it was transferred to
        booking_id: String,
    },

    /// The order already names a different production order
    #[error(
        "Snapshot for cart item {cart_item_id} is already attached to production order {production_order_id}"
    )]
    ProductionOrderConflict {
        /// Cart item of the snapshot
        cart_item_id: String,
        /// Production order it is attached to
        production_order_id: String,
    },

    /// A config cannot be hard-deleted while submissions reference it
    #[error("Config {config_id} is referenced by {submissions} submission(s); disable it instead")]
    ConfigInUse {
        /// The config that was targeted
        config_id: i64,
        /// Number of referencing submissions
        submissions: u64,
    },
}

impl Error {
    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`Error::InvalidInput`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
