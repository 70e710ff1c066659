//! Seller personalization catalog loading from a TOML file
//!
//! The catalog lists, per listing, the personalization configs a seller
//! offers. It is used to seed the registry for listings that have no configs
//! yet; later edits go through [`crate::core::registry`].

use crate::core::registry::NewConfig;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_CATALOG_PATH: &str = "personalization.toml";

/// Structure of the whole catalog file
#[derive(Debug, Default, Deserialize)]
pub struct Catalog {
    /// Listings with their personalization slots
    #[serde(default)]
    pub listings: Vec<ListingCatalog>,
}

/// Personalization slots for one listing
#[derive(Debug, Deserialize, Clone)]
pub struct ListingCatalog {
    /// Listing the configs belong to
    pub listing_id: String,
    /// Slots in the order the seller wrote them
    #[serde(default)]
    pub configs: Vec<NewConfig>,
}

/// Parses a catalog from TOML text.
///
/// # Errors
/// Returns [`Error::Config`] if the TOML is invalid or a required field is missing.
pub fn parse_catalog(contents: &str) -> Result<Catalog> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse personalization catalog: {e}"),
    })
}

/// Loads a catalog from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading personalization catalog from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read catalog file {}: {e}", path_ref.display()),
    })?;
    parse_catalog(&contents)
}

/// Path of the catalog file: `PERSONALIZATION_CONFIG` or `./personalization.toml`.
#[must_use]
pub fn default_catalog_path() -> String {
    std::env::var("PERSONALIZATION_CONFIG").unwrap_or_else(|_| DEFAULT_CATALOG_PATH.to_string())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::models::{LockStage, PersonalizationType, PriceImpact};

    #[test]
    fn test_parse_catalog() {
        let toml_str = r##"
            [[listings]]
            listing_id = "mug-001"

            [[listings.configs]]
            label = "Engraving"
            personalization_type = "text"
            is_required = true
            display_order = 1
            price_impact = { type = "per_character", per_character = 0.5 }
            text_config = { max_length = 20 }

            [[listings.configs]]
            label = "Ink color"
            personalization_type = "color_selection"
            lock_after_stage = "checkout"
            display_order = 2

            [listings.configs.color_config]
            allow_custom_colors = false
            palette = [
                { name = "Black", hex = "#000000" },
                { name = "Gold", hex = "#D4AF37" },
            ]
        "##;

        let catalog = parse_catalog(toml_str).unwrap();
        assert_eq!(catalog.listings.len(), 1);
        let listing = &catalog.listings[0];
        assert_eq!(listing.listing_id, "mug-001");
        assert_eq!(listing.configs.len(), 2);

        let engraving = &listing.configs[0];
        assert_eq!(engraving.personalization_type, PersonalizationType::Text);
        assert!(engraving.is_required);
        assert!(engraving.is_enabled);
        assert_eq!(engraving.text_config.as_ref().unwrap().max_length, 20);
        assert_eq!(
            engraving.price_impact,
            PriceImpact::PerCharacter { per_character: 0.5 }
        );
        assert_eq!(engraving.lock_after_stage, LockStage::AddToCart);

        let ink = &listing.configs[1];
        assert_eq!(ink.lock_after_stage, LockStage::Checkout);
        assert_eq!(ink.color_config.as_ref().unwrap().palette.len(), 2);
        assert_eq!(ink.price_impact, PriceImpact::None);
    }

    #[test]
    fn test_parse_catalog_rejects_unknown_type() {
        let toml_str = r#"
            [[listings]]
            listing_id = "mug-001"

            [[listings.configs]]
            label = "Engraving"
            personalization_type = "hologram"
        "#;
        assert!(matches!(parse_catalog(toml_str), Err(Error::Config { .. })));
    }
}
