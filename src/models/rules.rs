//! Seller-defined constraints for a personalization slot.
//!
//! Each sub-config carries its own `enabled` flag. Only the sub-config that
//! matches the slot's [`PersonalizationType`](super::PersonalizationType) is
//! meaningful, except for `combined` slots where any subset may be active.

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

const fn default_true() -> bool {
    true
}

/// Constraints on free-text input. Length bounds of 0 mean unbounded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct TextConfig {
    /// Whether text is collected for this slot
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Minimum number of characters (0 = unbounded)
    #[serde(default)]
    pub min_length: u32,
    /// Maximum number of characters (0 = unbounded)
    #[serde(default)]
    pub max_length: u32,
    /// Pattern the whole value must match
    #[serde(default)]
    pub validation_regex: Option<String>,
    /// Hint shown in the empty input
    #[serde(default)]
    pub placeholder: Option<String>,
}

/// Minimum pixel size of an uploaded image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Minimum width in pixels
    pub width: u32,
    /// Minimum height in pixels
    pub height: u32,
}

/// A seller-provided image a buyer can choose instead of uploading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PresetImage {
    /// Stable identifier referenced by `ImageData::preset_id`
    pub id: String,
    /// Display name
    pub name: String,
    /// Where the preset image lives
    pub url: String,
    /// Extra charge added on top of the slot's own price impact
    #[serde(default)]
    pub price_modifier: f64,
}

/// Constraints on uploaded or selected images.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ImageUploadConfig {
    /// Whether an image is collected for this slot
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Upload size limit in megabytes (0 = unbounded)
    #[serde(default)]
    pub max_file_size_mb: f64,
    /// Minimum accepted resolution
    #[serde(default)]
    pub min_resolution: Option<Resolution>,
    /// Lowercase file extensions accepted for uploads; empty accepts any
    #[serde(default)]
    pub allowed_formats: Vec<String>,
    /// Seller images available for `image_selection`
    #[serde(default)]
    pub presets: Vec<PresetImage>,
}

impl ImageUploadConfig {
    /// Upload size limit in bytes, if one is configured.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn max_file_size_bytes(&self) -> Option<u64> {
        (self.max_file_size_mb > 0.0).then(|| (self.max_file_size_mb * 1024.0 * 1024.0) as u64)
    }

    /// Looks up a preset by id.
    #[must_use]
    pub fn preset(&self, preset_id: &str) -> Option<&PresetImage> {
        self.presets.iter().find(|p| p.id == preset_id)
    }
}

/// A font a buyer may choose.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontOption {
    pub id: String,
    pub family: String,
}

/// Constraints on font selection. Size bounds of 0 mean unbounded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct FontConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fonts on offer; empty accepts any font id
    #[serde(default)]
    pub allowed_fonts: Vec<FontOption>,
    #[serde(default)]
    pub min_size: u32,
    #[serde(default)]
    pub max_size: u32,
    #[serde(default)]
    pub default_size: Option<u32>,
}

/// A named palette color.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorOption {
    pub name: String,
    pub hex: String,
}

/// Constraints on color selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ColorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seller palette; a color outside it is "custom"
    #[serde(default)]
    pub palette: Vec<ColorOption>,
    #[serde(default)]
    pub allow_custom_colors: bool,
}

impl ColorConfig {
    /// Whether `hex` is one of the palette colors (case-insensitive).
    #[must_use]
    pub fn in_palette(&self, hex: &str) -> bool {
        self.palette.iter().any(|c| c.hex.eq_ignore_ascii_case(hex))
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_length: 0,
            max_length: 0,
            validation_regex: None,
            placeholder: None,
        }
    }
}

impl Default for ImageUploadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_file_size_mb: 0.0,
            min_resolution: None,
            allowed_formats: Vec::new(),
            presets: Vec::new(),
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_fonts: Vec::new(),
            min_size: 0,
            max_size: 0,
            default_size: None,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            palette: Vec::new(),
            allow_custom_colors: false,
        }
    }
}

/// How a slot contributes to the item price.
///
/// `Percentage` is expressed in whole percent of the listing's base price.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PriceImpact {
    #[default]
    None,
    Fixed { amount: f64 },
    Percentage { percentage: f64 },
    PerCharacter { per_character: f64 },
    PerImage { per_image: f64 },
}

impl PriceImpact {
    /// The configured rate or amount, if any.
    #[must_use]
    pub const fn rate(&self) -> Option<f64> {
        match self {
            Self::None => None,
            Self::Fixed { amount } => Some(*amount),
            Self::Percentage { percentage } => Some(*percentage),
            Self::PerCharacter { per_character } => Some(*per_character),
            Self::PerImage { per_image } => Some(*per_image),
        }
    }
}
