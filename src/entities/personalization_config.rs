//! Personalization config entity - one customizable slot on a listing.
//!
//! Configs are owned by the seller. Buyers only read them, and they are
//! soft-disabled rather than deleted once submissions reference them.

use crate::models::{
    ColorConfig, FontConfig, ImageUploadConfig, LivePreviewMode, LockStage, PersonalizationType,
    PriceImpact, TextConfig,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Personalization config database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "personalization_configs")]
pub struct Model {
    /// Unique identifier for the config
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Listing this slot belongs to
    pub listing_id: String,
    /// Label shown above the input (e.g., "Engraving")
    pub label: String,
    /// Which kind of customization the slot offers
    pub personalization_type: PersonalizationType,
    /// Disabled configs are hidden from buyers but kept for existing submissions
    pub is_enabled: bool,
    /// Whether the buyer must fill the slot in
    pub is_required: bool,
    /// Text constraints
    #[sea_orm(column_type = "Json", nullable)]
    pub text_config: Option<TextConfig>,
    /// Image constraints and presets
    #[sea_orm(column_type = "Json", nullable)]
    pub image_upload_config: Option<ImageUploadConfig>,
    /// Font constraints
    #[sea_orm(column_type = "Json", nullable)]
    pub font_config: Option<FontConfig>,
    /// Color palette
    #[sea_orm(column_type = "Json", nullable)]
    pub color_config: Option<ColorConfig>,
    /// Preview behaviour in the storefront
    pub live_preview_mode: LivePreviewMode,
    /// Pricing rule for this slot
    #[sea_orm(column_type = "Json")]
    pub price_impact: PriceImpact,
    /// Lifecycle stage after which submissions for this slot are frozen
    pub lock_after_stage: LockStage,
    /// Seller-defined position (ascending)
    pub display_order: i32,
    /// Optional guidance shown to the buyer
    pub help_text: Option<String>,
    /// When the config was created
    pub created_at: DateTimeUtc,
    /// When the config was last edited
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Text sub-config, if present and enabled.
    #[must_use]
    pub fn active_text_config(&self) -> Option<&TextConfig> {
        self.text_config.as_ref().filter(|c| c.enabled)
    }

    /// Image sub-config, if present and enabled.
    #[must_use]
    pub fn active_image_config(&self) -> Option<&ImageUploadConfig> {
        self.image_upload_config.as_ref().filter(|c| c.enabled)
    }

    /// Font sub-config, if present and enabled.
    #[must_use]
    pub fn active_font_config(&self) -> Option<&FontConfig> {
        self.font_config.as_ref().filter(|c| c.enabled)
    }

    /// Color sub-config, if present and enabled.
    #[must_use]
    pub fn active_color_config(&self) -> Option<&ColorConfig> {
        self.color_config.as_ref().filter(|c| c.enabled)
    }
}

/// Submissions reference configs by id without a foreign key so that a
/// replayed setup can still be stored after its config is gone.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
