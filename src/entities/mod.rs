//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the personalization tables. Each entity has a
//! Model struct for data and an Entity struct for operations.

pub mod personalization_config;
pub mod personalization_reusable_setup;
pub mod personalization_snapshot;
pub mod personalization_submission;

// Re-export specific types to avoid conflicts
pub use personalization_config::{
    Column as ConfigColumn, Entity as PersonalizationConfig, Model as ConfigModel,
};
pub use personalization_reusable_setup::{
    Column as ReusableSetupColumn, Entity as ReusableSetup, Model as ReusableSetupModel,
};
pub use personalization_snapshot::{
    Column as SnapshotColumn, Entity as Snapshot, Model as SnapshotModel,
};
pub use personalization_submission::{
    Column as SubmissionColumn, Entity as Submission, Model as SubmissionModel, SubmissionState,
};
