//! Typed value objects shared by the entities and the core logic.
//!
//! Sub-configs, payloads and frozen snapshot contents are stored in JSON
//! columns; the lifecycle enums are stored as strings.

/// Lifecycle and classification enums stored as string columns
pub mod enums;
/// Seller-defined sub-configs and price-impact rules
pub mod rules;
/// Buyer-supplied submission payloads
pub mod payload;
/// Frozen snapshot and reusable-setup contents
pub mod frozen;

pub use enums::{LivePreviewMode, LockStage, PersonalizationType, SnapshotStatus, ValidationStatus};
pub use frozen::{
    ConfigSnapshot, FrozenSubmission, FrozenSubmissions, ImageReference, ImageReferences,
    PreviewRenders, SetupItem, SetupItems, ValidationErrors,
};
pub use payload::{
    ColorData, CombinedPayload, Dimensions, FontData, ImageData, PlacementData,
    SubmissionPayload, TemplateData,
};
pub use rules::{
    ColorConfig, ColorOption, FontConfig, FontOption, ImageUploadConfig, PresetImage,
    PriceImpact, Resolution, TextConfig,
};
