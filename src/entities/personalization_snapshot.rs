//! Personalization snapshot entity - the frozen truth for one cart item.
//!
//! A cart item may accumulate several versions; exactly one is `active`.
//! `active_cart_item_id` mirrors `cart_item_id` only while the snapshot is
//! active, so the unique index on it allows a single active row per cart item.

use crate::models::{
    ConfigSnapshot, FrozenSubmission, FrozenSubmissions, ImageReferences, LockStage,
    PreviewRenders, SnapshotStatus,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Personalization snapshot database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "personalization_snapshots")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub cart_item_id: String,
    /// Equal to `cart_item_id` while active, NULL once superseded
    #[sea_orm(unique)]
    pub active_cart_item_id: Option<String>,
    pub customer_id: String,
    pub listing_id: String,
    /// Seller fulfilling the order
    pub provider_id: String,
    /// Booking the snapshot was transferred to
    pub booking_id: Option<String>,
    /// Production order the snapshot was transferred to
    pub production_order_id: Option<String>,
    /// Submissions at freeze time
    #[sea_orm(column_type = "Json")]
    pub snapshot_data: FrozenSubmissions,
    /// Configs at freeze time, kept for audit
    #[sea_orm(column_type = "Json")]
    pub config_snapshot: ConfigSnapshot,
    #[sea_orm(column_type = "Json")]
    pub uploaded_images: ImageReferences,
    #[sea_orm(column_type = "Json")]
    pub preview_renders: PreviewRenders,
    /// Sum of the frozen submissions' price impacts
    pub total_price_impact: f64,
    /// 1 for the first snapshot of a cart item, +1 per supersession
    pub snapshot_version: i32,
    pub status: SnapshotStatus,
    /// Stage that triggered the freeze
    pub lock_stage: LockStage,
    pub finalized_at: DateTimeUtc,
    pub superseded_at: Option<DateTimeUtc>,
    pub transferred_at: Option<DateTimeUtc>,
}

impl Model {
    /// Whether downstream systems reference this snapshot.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SnapshotStatus::Active
    }

    /// Whether the snapshot has been handed to an order.
    #[must_use]
    pub const fn is_transferred(&self) -> bool {
        self.booking_id.is_some()
    }

    /// The frozen copy of one submission.
    #[must_use]
    pub fn frozen_submission(&self, submission_id: i64) -> Option<&FrozenSubmission> {
        self.snapshot_data
            .0
            .iter()
            .find(|s| s.submission_id == submission_id)
    }

    /// The frozen value for a config slot, paired with the config as it was.
    #[must_use]
    pub fn frozen_slot(
        &self,
        config_id: i64,
    ) -> Option<(&FrozenSubmission, Option<&super::personalization_config::Model>)> {
        let frozen = self.snapshot_data.0.iter().find(|s| s.config_id == config_id)?;
        Some((frozen, self.config_snapshot.config(config_id)))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
