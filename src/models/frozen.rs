//! Contents stored inside snapshots and reusable setups.
//!
//! These are copies, never references: a snapshot keeps its submissions and
//! configs as they were at freeze time, and a setup keeps bare payloads with
//! no submission ids.

use super::enums::{LockStage, ValidationStatus};
use super::payload::SubmissionPayload;
use crate::entities::{personalization_config, personalization_submission};
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// One submission as it was when its snapshot was taken.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrozenSubmission {
    pub submission_id: i64,
    pub config_id: i64,
    pub payload: SubmissionPayload,
    pub calculated_price_impact: f64,
    pub validation_status: ValidationStatus,
    pub locked_reason: Option<LockStage>,
    pub revision: i32,
}

impl From<&personalization_submission::Model> for FrozenSubmission {
    fn from(submission: &personalization_submission::Model) -> Self {
        Self {
            submission_id: submission.id,
            config_id: submission.config_id,
            payload: submission.payload.clone(),
            calculated_price_impact: submission.calculated_price_impact,
            validation_status: submission.validation_status,
            locked_reason: submission.locked_reason,
            revision: submission.revision,
        }
    }
}

/// `snapshot_data` column.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct FrozenSubmissions(pub Vec<FrozenSubmission>);

/// `config_snapshot` column: the configs exactly as the seller had them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ConfigSnapshot(pub Vec<personalization_config::Model>);

impl ConfigSnapshot {
    /// The frozen copy of a config.
    #[must_use]
    pub fn config(&self, config_id: i64) -> Option<&personalization_config::Model> {
        self.0.iter().find(|c| c.id == config_id)
    }
}

/// An image used by a frozen submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    pub submission_id: i64,
    /// Upload URL, or the preset's URL when a preset was chosen
    pub url: String,
    #[serde(default)]
    pub preset_id: Option<String>,
    #[serde(default)]
    pub permanent_url: Option<String>,
    #[serde(default)]
    pub content_hash: Option<String>,
}

/// `uploaded_images` column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ImageReferences(pub Vec<ImageReference>);

/// `preview_renders` column: URLs of renders produced outside this crate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct PreviewRenders(pub Vec<String>);

/// A replayable submission inside a reusable setup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetupItem {
    pub config_id: i64,
    pub payload: SubmissionPayload,
}

/// `setup_data` column.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct SetupItems(pub Vec<SetupItem>);

/// `validation_errors` column: user-facing messages from the last validation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ValidationErrors(pub Vec<String>);
