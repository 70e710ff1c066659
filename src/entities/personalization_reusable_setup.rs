//! Reusable setup entity - a named bundle of past personalization a buyer
//! can replay onto a new purchase.

use crate::models::SetupItems;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Reusable setup database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "personalization_reusable_setups")]
pub struct Model {
    /// Unique identifier for the setup
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Buyer who owns the setup
    pub customer_id: String,
    /// Listing the setup was captured from
    pub listing_id: String,
    /// Buyer-chosen name (e.g., "Mom's birthday mug")
    pub name: String,
    /// Snapshot the content was copied from
    pub source_snapshot_id: Option<i64>,
    /// Booking the content was copied from
    pub source_booking_id: Option<String>,
    /// Copied payloads, free of submission ids
    #[sea_orm(column_type = "Json")]
    pub setup_data: SetupItems,
    /// Number of times the setup was applied
    pub use_count: i32,
    /// When the setup was last applied
    pub last_used_at: Option<DateTimeUtc>,
    /// Pinned to the top of the buyer's list
    pub is_favorite: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Setups copy their content and hold no live references.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
