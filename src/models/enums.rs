//! Lifecycle and classification enums, stored as string columns.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of customization a config slot offers (and a submission answers).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum PersonalizationType {
    /// Free text (engraving, printed message)
    #[sea_orm(string_value = "text")]
    Text,
    /// Buyer uploads an image
    #[sea_orm(string_value = "image_upload")]
    ImageUpload,
    /// Buyer picks one of the seller's preset images
    #[sea_orm(string_value = "image_selection")]
    ImageSelection,
    /// Buyer picks a font
    #[sea_orm(string_value = "font_selection")]
    FontSelection,
    /// Buyer picks a color
    #[sea_orm(string_value = "color_selection")]
    ColorSelection,
    /// Buyer positions the design on a zone
    #[sea_orm(string_value = "placement_selection")]
    PlacementSelection,
    /// Buyer picks a template
    #[sea_orm(string_value = "template_selection")]
    TemplateSelection,
    /// Several facets at once
    #[sea_orm(string_value = "combined")]
    Combined,
}

/// How the storefront renders a live preview for a config.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum LivePreviewMode {
    #[default]
    #[sea_orm(string_value = "enabled")]
    Enabled,
    #[sea_orm(string_value = "constrained")]
    Constrained,
    #[sea_orm(string_value = "downgraded")]
    Downgraded,
    #[sea_orm(string_value = "disabled")]
    Disabled,
}

/// Order lifecycle point at which a submission becomes immutable.
///
/// Stages are ordered: `AddToCart < Checkout < OrderReceived < ProofApproved`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum LockStage {
    #[default]
    #[sea_orm(string_value = "add_to_cart")]
    AddToCart,
    #[sea_orm(string_value = "checkout")]
    Checkout,
    #[sea_orm(string_value = "order_received")]
    OrderReceived,
    #[sea_orm(string_value = "proof_approved")]
    ProofApproved,
}

impl LockStage {
    const fn rank(self) -> u8 {
        match self {
            Self::AddToCart => 0,
            Self::Checkout => 1,
            Self::OrderReceived => 2,
            Self::ProofApproved => 3,
        }
    }

    /// Whether a config locking after `self` must be frozen once `current` is reached.
    #[must_use]
    pub const fn is_reached_by(self, current: Self) -> bool {
        self.rank() <= current.rank()
    }
}

/// Result of the last validation pass over a submission.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "valid")]
    Valid,
    #[sea_orm(string_value = "invalid")]
    Invalid,
    #[sea_orm(string_value = "needs_review")]
    NeedsReview,
}

/// Whether a snapshot is the one downstream systems reference.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    /// Latest snapshot for its cart item
    #[sea_orm(string_value = "active")]
    Active,
    /// Replaced by a newer version; kept for audit
    #[sea_orm(string_value = "superseded")]
    Superseded,
}
