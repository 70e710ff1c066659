//! Buyer-supplied personalization values.
//!
//! A submission carries exactly one [`SubmissionPayload`] variant, keyed by
//! `submission_type`. `Combined` is the only variant with several facets.

use super::enums::PersonalizationType;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pixel dimensions of an uploaded image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// An uploaded image or a chosen preset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    /// Durable URL returned by object storage for an upload
    #[serde(default)]
    pub uploaded_url: Option<String>,
    /// Seller preset chosen instead of an upload
    #[serde(default)]
    pub preset_id: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    /// Upload size in bytes
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    /// Immutable copy made for production, if object storage provides one
    #[serde(default)]
    pub permanent_url: Option<String>,
    /// Content hash reported by object storage
    #[serde(default)]
    pub content_hash: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

impl ImageData {
    /// Upload URL, ignoring blank strings.
    #[must_use]
    pub fn uploaded_url(&self) -> Option<&str> {
        non_empty(self.uploaded_url.as_ref())
    }

    /// Preset id, ignoring blank strings.
    #[must_use]
    pub fn preset_id(&self) -> Option<&str> {
        non_empty(self.preset_id.as_ref())
    }

    /// Whether either an upload or a preset is present.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.uploaded_url().is_some() || self.preset_id().is_some()
    }

    /// Lowercase file extension of the uploaded filename.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let name = non_empty(self.filename.as_ref())?;
        let (_, ext) = name.rsplit_once('.')?;
        Some(ext.to_ascii_lowercase())
    }
}

/// A chosen font.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontData {
    #[serde(default)]
    pub font_id: Option<String>,
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default)]
    pub font_size: Option<u32>,
}

impl FontData {
    /// Font id, ignoring blank strings.
    #[must_use]
    pub fn font_id(&self) -> Option<&str> {
        non_empty(self.font_id.as_ref())
    }
}

/// A chosen color, as hex (`#RRGGBB`) or an `rgba(...)` string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorData {
    #[serde(default)]
    pub hex: Option<String>,
    #[serde(default)]
    pub rgba: Option<String>,
    /// Palette name when picked from the seller palette
    #[serde(default)]
    pub name: Option<String>,
}

impl ColorData {
    /// Whether any color value is present.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        non_empty(self.hex.as_ref()).is_some() || non_empty(self.rgba.as_ref()).is_some()
    }
}

const fn default_scale() -> f64 {
    1.0
}

/// Where the design sits on the product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacementData {
    #[serde(default)]
    pub zone_id: Option<String>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    /// Degrees clockwise
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

impl Default for PlacementData {
    fn default() -> Self {
        Self {
            zone_id: None,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            rotation: 0.0,
            scale: default_scale(),
        }
    }
}

/// A chosen template and the values for its named fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateData {
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

/// Facets of a `combined` submission. Any subset may be filled in.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedPayload {
    #[serde(default)]
    pub text_value: Option<String>,
    #[serde(default)]
    pub image: Option<ImageData>,
    #[serde(default)]
    pub font: Option<FontData>,
    #[serde(default)]
    pub color: Option<ColorData>,
    #[serde(default)]
    pub placement: Option<PlacementData>,
    #[serde(default)]
    pub template: Option<TemplateData>,
}

/// The value a buyer entered for one config slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(tag = "submission_type", rename_all = "snake_case")]
pub enum SubmissionPayload {
    Text { text_value: String },
    ImageUpload { image: ImageData },
    ImageSelection { image: ImageData },
    FontSelection { font: FontData },
    ColorSelection { color: ColorData },
    PlacementSelection { placement: PlacementData },
    TemplateSelection { template: TemplateData },
    Combined(CombinedPayload),
}

impl SubmissionPayload {
    /// The personalization type this payload answers.
    #[must_use]
    pub const fn submission_type(&self) -> PersonalizationType {
        match self {
            Self::Text { .. } => PersonalizationType::Text,
            Self::ImageUpload { .. } => PersonalizationType::ImageUpload,
            Self::ImageSelection { .. } => PersonalizationType::ImageSelection,
            Self::FontSelection { .. } => PersonalizationType::FontSelection,
            Self::ColorSelection { .. } => PersonalizationType::ColorSelection,
            Self::PlacementSelection { .. } => PersonalizationType::PlacementSelection,
            Self::TemplateSelection { .. } => PersonalizationType::TemplateSelection,
            Self::Combined(_) => PersonalizationType::Combined,
        }
    }

    /// Text facet, if this payload carries one.
    #[must_use]
    pub fn text_value(&self) -> Option<&str> {
        match self {
            Self::Text { text_value } => Some(text_value.as_str()),
            Self::Combined(c) => c.text_value.as_deref(),
            _ => None,
        }
    }

    /// Image facet, if this payload carries one.
    #[must_use]
    pub const fn image(&self) -> Option<&ImageData> {
        match self {
            Self::ImageUpload { image } | Self::ImageSelection { image } => Some(image),
            Self::Combined(c) => c.image.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub const fn font(&self) -> Option<&FontData> {
        match self {
            Self::FontSelection { font } => Some(font),
            Self::Combined(c) => c.font.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub const fn color(&self) -> Option<&ColorData> {
        match self {
            Self::ColorSelection { color } => Some(color),
            Self::Combined(c) => c.color.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub const fn placement(&self) -> Option<&PlacementData> {
        match self {
            Self::PlacementSelection { placement } => Some(placement),
            Self::Combined(c) => c.placement.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub const fn template(&self) -> Option<&TemplateData> {
        match self {
            Self::TemplateSelection { template } => Some(template),
            Self::Combined(c) => c.template.as_ref(),
            _ => None,
        }
    }

    /// Number of images (uploaded or preset) carried by this payload.
    #[must_use]
    pub fn image_count(&self) -> u32 {
        u32::from(self.image().is_some_and(ImageData::is_present))
    }

    /// Whether the buyer has filled in anything at all.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.text_value().is_some_and(|t| !t.trim().is_empty())
            || self.image().is_some_and(ImageData::is_present)
            || self.font().and_then(FontData::font_id).is_some()
            || self.color().is_some_and(ColorData::is_selected)
            || self.placement().is_some()
            || self
                .template()
                .and_then(|t| t.template_id.as_deref())
                .is_some_and(|id| !id.trim().is_empty())
    }

    /// Convenience constructor for a text payload.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            text_value: value.into(),
        }
    }
}
