//! Validation engine - checks a submission against its config.
//!
//! Validation never fails as an operation: problems come back as
//! user-facing messages in a [`ValidationOutcome`]. Every enabled sub-config
//! is checked regardless of the slot's type, which is what lets `combined`
//! slots validate several facets at once; messages accumulate across facets.

use crate::{
    entities::personalization_config,
    models::{
        ColorConfig, FontConfig, ImageUploadConfig, PersonalizationType, SubmissionPayload,
        TextConfig, ValidationStatus,
    },
};
use regex::Regex;
use sea_orm::ActiveEnum;
use std::collections::HashMap;
use tracing::warn;

/// Message for a required slot left empty.
pub const REQUIRED_MESSAGE: &str = "This field is required";
/// Message for a submission whose config is gone, disabled, or foreign.
pub const UNAVAILABLE_MESSAGE: &str = "This personalization option is no longer available";

/// Pass/fail plus itemized, user-facing errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// True iff `errors` is empty
    pub valid: bool,
    /// Messages to render next to the field
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Status to persist on the submission.
    #[must_use]
    pub const fn status(&self) -> ValidationStatus {
        if self.valid {
            ValidationStatus::Valid
        } else {
            ValidationStatus::Invalid
        }
    }
}

/// Whether a payload variant may answer a slot of the given type.
fn type_accepts(config_type: PersonalizationType, payload_type: PersonalizationType) -> bool {
    let is_image = |t: PersonalizationType| {
        matches!(
            t,
            PersonalizationType::ImageUpload | PersonalizationType::ImageSelection
        )
    };
    config_type == PersonalizationType::Combined
        || config_type == payload_type
        || (is_image(config_type) && is_image(payload_type))
}

fn check_text(text_config: &TextConfig, required: bool, value: Option<&str>, errors: &mut Vec<String>) {
    let value = value.unwrap_or_default();
    if value.trim().is_empty() {
        if required {
            errors.push(REQUIRED_MESSAGE.to_string());
        }
        return;
    }

    let length = value.chars().count();
    let min = text_config.min_length as usize;
    let max = text_config.max_length as usize;
    if min > 0 && length < min {
        errors.push(format!("Text must be at least {min} characters"));
    }
    if max > 0 && length > max {
        errors.push(format!("Text must be {max} characters or fewer"));
    }

    if let Some(pattern) = text_config.validation_regex.as_deref() {
        match Regex::new(&format!("^(?:{pattern})$")) {
            Ok(re) if re.is_match(value) => {}
            Ok(_) => errors.push("Text does not match the required format".to_string()),
            Err(e) => warn!(pattern, error = %e, "Ignoring invalid text validation pattern"),
        }
    }
}

fn check_image(
    image_config: &ImageUploadConfig,
    required: bool,
    payload: &SubmissionPayload,
    errors: &mut Vec<String>,
) {
    let Some(image) = payload.image().filter(|i| i.is_present()) else {
        if required {
            errors.push("Please upload or select an image".to_string());
        }
        return;
    };

    if image.uploaded_url().is_none() {
        if let Some(preset_id) = image.preset_id() {
            if image_config.preset(preset_id).is_none() {
                errors.push("The selected image is no longer available".to_string());
            }
        }
    }

    if let (Some(size), Some(max_bytes)) = (image.file_size, image_config.max_file_size_bytes()) {
        if size > max_bytes {
            errors.push(format!(
                "Image must be {}MB or smaller",
                image_config.max_file_size_mb
            ));
        }
    }

    if let (Some(dimensions), Some(min)) = (image.dimensions, image_config.min_resolution) {
        if dimensions.width < min.width || dimensions.height < min.height {
            errors.push(format!(
                "Image must be at least {}x{} pixels",
                min.width, min.height
            ));
        }
    }

    if !image_config.allowed_formats.is_empty() {
        if let Some(extension) = image.extension() {
            let allowed = image_config
                .allowed_formats
                .iter()
                .any(|f| f.eq_ignore_ascii_case(&extension));
            if !allowed {
                errors.push(format!(
                    "Image format must be one of: {}",
                    image_config.allowed_formats.join(", ")
                ));
            }
        }
    }
}

fn check_font(
    font_config: &FontConfig,
    required: bool,
    payload: &SubmissionPayload,
    errors: &mut Vec<String>,
) {
    let Some((font, font_id)) = payload
        .font()
        .and_then(|f| f.font_id().map(|id| (f, id)))
    else {
        if required {
            errors.push("Please select a font".to_string());
        }
        return;
    };

    if !font_config.allowed_fonts.is_empty()
        && !font_config.allowed_fonts.iter().any(|f| f.id == font_id)
    {
        errors.push("The selected font is not available".to_string());
    }

    if let Some(size) = font.font_size {
        if font_config.min_size > 0 && size < font_config.min_size {
            errors.push(format!("Font size must be at least {}", font_config.min_size));
        }
        if font_config.max_size > 0 && size > font_config.max_size {
            errors.push(format!("Font size must be at most {}", font_config.max_size));
        }
    }
}

fn check_color(
    color_config: &ColorConfig,
    required: bool,
    payload: &SubmissionPayload,
    errors: &mut Vec<String>,
) {
    let Some(color) = payload.color().filter(|c| c.is_selected()) else {
        if required {
            errors.push("Please select a color".to_string());
        }
        return;
    };

    // Without a palette every color counts as a palette color.
    if color_config.allow_custom_colors || color_config.palette.is_empty() {
        return;
    }
    let in_palette = color
        .hex
        .as_deref()
        .is_some_and(|hex| color_config.in_palette(hex));
    if !in_palette {
        errors.push("Custom colors are not allowed".to_string());
    }
}

/// Validates a payload against its config.
#[must_use]
pub fn validate(
    payload: &SubmissionPayload,
    config: &personalization_config::Model,
) -> ValidationOutcome {
    let mut errors = Vec::new();
    let required = config.is_required;

    if !type_accepts(config.personalization_type, payload.submission_type()) {
        errors.push(format!(
            "Expected {} input for this option",
            config.personalization_type.to_value().replace('_', " ")
        ));
    }

    if let Some(text_config) = config.active_text_config() {
        check_text(text_config, required, payload.text_value(), &mut errors);
    }
    if let Some(image_config) = config.active_image_config() {
        check_image(image_config, required, payload, &mut errors);
    }
    if let Some(font_config) = config.active_font_config() {
        check_font(font_config, required, payload, &mut errors);
    }
    if let Some(color_config) = config.active_color_config() {
        check_color(color_config, required, payload, &mut errors);
    }

    if required {
        match config.personalization_type {
            PersonalizationType::PlacementSelection if payload.placement().is_none() => {
                errors.push("Please choose a placement".to_string());
            }
            PersonalizationType::TemplateSelection
                if payload
                    .template()
                    .and_then(|t| t.template_id.as_deref())
                    .is_none_or(|id| id.trim().is_empty()) =>
            {
                errors.push("Please choose a template".to_string());
            }
            _ => {}
        }
    }

    ValidationOutcome::from_errors(errors)
}

/// Validates a stored or replayed payload whose config may have changed.
///
/// A missing or disabled config, or one that belongs to another listing,
/// yields a single "no longer available" error so the buyer is prompted to
/// correct the personalization instead of failing silently.
#[must_use]
pub fn validate_against(
    payload: &SubmissionPayload,
    config: Option<&personalization_config::Model>,
    listing_id: &str,
) -> ValidationOutcome {
    match config {
        Some(config) if config.is_enabled && config.listing_id == listing_id => {
            validate(payload, config)
        }
        _ => ValidationOutcome::from_errors(vec![UNAVAILABLE_MESSAGE.to_string()]),
    }
}

/// Outcome of validating all of a listing's slots together.
#[derive(Debug, Clone, Default)]
pub struct ListingValidation {
    /// True when every slot passed and no required slot is missing
    pub valid: bool,
    /// Per-config outcome for each submitted slot
    pub outcomes: HashMap<i64, ValidationOutcome>,
    /// Required configs with no submission at all
    pub missing_required: Vec<i64>,
}

/// Validates a whole personalization form: every submitted slot, plus
/// required slots that were never filled in.
#[must_use]
pub fn validate_listing(
    configs: &[personalization_config::Model],
    submissions: &[(i64, &SubmissionPayload)],
) -> ListingValidation {
    let mut outcomes = HashMap::new();
    for (config_id, payload) in submissions {
        let config = configs.iter().find(|c| c.id == *config_id);
        let listing_id = config.map_or("", |c| c.listing_id.as_str());
        outcomes.insert(*config_id, validate_against(payload, config, listing_id));
    }

    let missing_required: Vec<i64> = configs
        .iter()
        .filter(|c| c.is_enabled && c.is_required && !outcomes.contains_key(&c.id))
        .map(|c| c.id)
        .collect();

    let valid = missing_required.is_empty() && outcomes.values().all(|o| o.valid);
    ListingValidation {
        valid,
        outcomes,
        missing_required,
    }
}
