//! Config registry - seller-defined personalization slots per listing.
//!
//! Buyers only ever see enabled configs, in the seller's display order. A
//! listing without configs simply has no personalization; that is not an
//! error. Configs referenced by submissions are soft-disabled, never deleted.

use crate::{
    config::catalog::Catalog,
    entities::{
        ConfigColumn, PersonalizationConfig, Submission, SubmissionColumn,
        personalization_config,
    },
    errors::{Error, Result},
    models::{
        ColorConfig, FontConfig, ImageUploadConfig, LivePreviewMode, LockStage,
        PersonalizationType, PriceImpact, TextConfig,
    },
};
use regex::Regex;
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument, warn};

const fn default_true() -> bool {
    true
}

/// Everything a seller specifies when creating a config.
#[derive(Debug, Clone, Deserialize)]
pub struct NewConfig {
    pub label: String,
    pub personalization_type: PersonalizationType,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub text_config: Option<TextConfig>,
    #[serde(default)]
    pub image_upload_config: Option<ImageUploadConfig>,
    #[serde(default)]
    pub font_config: Option<FontConfig>,
    #[serde(default)]
    pub color_config: Option<ColorConfig>,
    #[serde(default)]
    pub live_preview_mode: LivePreviewMode,
    #[serde(default)]
    pub price_impact: PriceImpact,
    #[serde(default)]
    pub lock_after_stage: LockStage,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub help_text: Option<String>,
}

impl NewConfig {
    /// An enabled, optional slot with no sub-configs and no price impact.
    pub fn new(label: impl Into<String>, personalization_type: PersonalizationType) -> Self {
        Self {
            label: label.into(),
            personalization_type,
            is_enabled: true,
            is_required: false,
            text_config: None,
            image_upload_config: None,
            font_config: None,
            color_config: None,
            live_preview_mode: LivePreviewMode::default(),
            price_impact: PriceImpact::None,
            lock_after_stage: LockStage::default(),
            display_order: 0,
            help_text: None,
        }
    }
}

impl From<&personalization_config::Model> for NewConfig {
    fn from(model: &personalization_config::Model) -> Self {
        Self {
            label: model.label.clone(),
            personalization_type: model.personalization_type,
            is_enabled: model.is_enabled,
            is_required: model.is_required,
            text_config: model.text_config.clone(),
            image_upload_config: model.image_upload_config.clone(),
            font_config: model.font_config.clone(),
            color_config: model.color_config.clone(),
            live_preview_mode: model.live_preview_mode,
            price_impact: model.price_impact.clone(),
            lock_after_stage: model.lock_after_stage,
            display_order: model.display_order,
            help_text: model.help_text.clone(),
        }
    }
}

/// A seller edit. `None` leaves the attribute unchanged; for the optional
/// sub-configs, `Some(None)` removes the sub-config.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub label: Option<String>,
    pub is_required: Option<bool>,
    pub text_config: Option<Option<TextConfig>>,
    pub image_upload_config: Option<Option<ImageUploadConfig>>,
    pub font_config: Option<Option<FontConfig>>,
    pub color_config: Option<Option<ColorConfig>>,
    pub live_preview_mode: Option<LivePreviewMode>,
    pub price_impact: Option<PriceImpact>,
    pub lock_after_stage: Option<LockStage>,
    pub display_order: Option<i32>,
    pub help_text: Option<Option<String>>,
}

impl ConfigUpdate {
    fn apply_to(self, config: &mut NewConfig) {
        if let Some(label) = self.label {
            config.label = label;
        }
        if let Some(is_required) = self.is_required {
            config.is_required = is_required;
        }
        if let Some(text_config) = self.text_config {
            config.text_config = text_config;
        }
        if let Some(image_upload_config) = self.image_upload_config {
            config.image_upload_config = image_upload_config;
        }
        if let Some(font_config) = self.font_config {
            config.font_config = font_config;
        }
        if let Some(color_config) = self.color_config {
            config.color_config = color_config;
        }
        if let Some(live_preview_mode) = self.live_preview_mode {
            config.live_preview_mode = live_preview_mode;
        }
        if let Some(price_impact) = self.price_impact {
            config.price_impact = price_impact;
        }
        if let Some(lock_after_stage) = self.lock_after_stage {
            config.lock_after_stage = lock_after_stage;
        }
        if let Some(display_order) = self.display_order {
            config.display_order = display_order;
        }
        if let Some(help_text) = self.help_text {
            config.help_text = help_text;
        }
    }
}

fn check_amount(what: &str, amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::invalid(format!(
            "{what} must be a non-negative number, got {amount}"
        )));
    }
    Ok(())
}

/// Checks a config for contradictions a buyer could never satisfy.
///
/// # Errors
/// Returns [`Error::InvalidInput`] describing the first problem found.
pub fn check_config_rules(config: &NewConfig) -> Result<()> {
    if config.label.trim().is_empty() {
        return Err(Error::invalid("Config label cannot be empty"));
    }

    let missing = match config.personalization_type {
        PersonalizationType::Text => config.text_config.is_none().then_some("text_config"),
        PersonalizationType::ImageUpload | PersonalizationType::ImageSelection => config
            .image_upload_config
            .is_none()
            .then_some("image_upload_config"),
        PersonalizationType::FontSelection => config.font_config.is_none().then_some("font_config"),
        PersonalizationType::ColorSelection => {
            config.color_config.is_none().then_some("color_config")
        }
        PersonalizationType::Combined => (config.text_config.is_none()
            && config.image_upload_config.is_none()
            && config.font_config.is_none()
            && config.color_config.is_none())
        .then_some("at least one sub-config"),
        PersonalizationType::PlacementSelection | PersonalizationType::TemplateSelection => None,
    };
    if let Some(missing) = missing {
        return Err(Error::invalid(format!(
            "{missing} is required for {} personalization",
            config.personalization_type.to_value()
        )));
    }

    if let Some(text) = &config.text_config {
        if text.max_length > 0 && text.min_length > text.max_length {
            return Err(Error::invalid(format!(
                "Text min_length ({}) exceeds max_length ({})",
                text.min_length, text.max_length
            )));
        }
        if let Some(pattern) = &text.validation_regex {
            Regex::new(pattern)
                .map_err(|e| Error::invalid(format!("Invalid validation_regex: {e}")))?;
        }
    }

    if let Some(image) = &config.image_upload_config {
        check_amount("max_file_size_mb", image.max_file_size_mb)?;
        for preset in &image.presets {
            check_amount("Preset price_modifier", preset.price_modifier)?;
        }
        if config.personalization_type == PersonalizationType::ImageSelection
            && image.presets.is_empty()
        {
            return Err(Error::invalid(
                "image_selection personalization needs at least one preset image",
            ));
        }
    }

    if let Some(font) = &config.font_config {
        if font.max_size > 0 && font.min_size > font.max_size {
            return Err(Error::invalid(format!(
                "Font min_size ({}) exceeds max_size ({})",
                font.min_size, font.max_size
            )));
        }
    }

    if let Some(rate) = config.price_impact.rate() {
        check_amount("Price impact", rate)?;
    }

    Ok(())
}

fn active_model(listing_id: &str, config: NewConfig) -> personalization_config::ActiveModel {
    let now = chrono::Utc::now();
    personalization_config::ActiveModel {
        listing_id: Set(listing_id.to_string()),
        label: Set(config.label.trim().to_string()),
        personalization_type: Set(config.personalization_type),
        is_enabled: Set(config.is_enabled),
        is_required: Set(config.is_required),
        text_config: Set(config.text_config),
        image_upload_config: Set(config.image_upload_config),
        font_config: Set(config.font_config),
        color_config: Set(config.color_config),
        live_preview_mode: Set(config.live_preview_mode),
        price_impact: Set(config.price_impact),
        lock_after_stage: Set(config.lock_after_stage),
        display_order: Set(config.display_order),
        help_text: Set(config.help_text),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
}

/// Returns the enabled configs of a listing in display order.
///
/// An empty list means the listing offers no personalization.
pub async fn get_configs_for_listing<C>(
    db: &C,
    listing_id: &str,
) -> Result<Vec<personalization_config::Model>>
where
    C: ConnectionTrait,
{
    PersonalizationConfig::find()
        .filter(ConfigColumn::ListingId.eq(listing_id))
        .filter(ConfigColumn::IsEnabled.eq(true))
        .order_by_asc(ConfigColumn::DisplayOrder)
        .order_by_asc(ConfigColumn::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Returns every config of a listing, including disabled ones (seller view).
pub async fn get_all_configs_for_listing<C>(
    db: &C,
    listing_id: &str,
) -> Result<Vec<personalization_config::Model>>
where
    C: ConnectionTrait,
{
    PersonalizationConfig::find()
        .filter(ConfigColumn::ListingId.eq(listing_id))
        .order_by_asc(ConfigColumn::DisplayOrder)
        .order_by_asc(ConfigColumn::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a config by id, enabled or not.
pub async fn get_config_by_id<C>(
    db: &C,
    config_id: i64,
) -> Result<Option<personalization_config::Model>>
where
    C: ConnectionTrait,
{
    PersonalizationConfig::find_by_id(config_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a config on a listing after checking it for contradictions.
pub async fn create_config<C>(
    db: &C,
    listing_id: &str,
    config: NewConfig,
) -> Result<personalization_config::Model>
where
    C: ConnectionTrait,
{
    if listing_id.trim().is_empty() {
        return Err(Error::invalid("Listing id cannot be empty"));
    }
    check_config_rules(&config)?;
    active_model(listing_id, config)
        .insert(db)
        .await
        .map_err(Into::into)
}

/// Applies a seller edit. Existing snapshots keep their own copy of the
/// config, so edits never alter frozen orders.
#[instrument(skip(db, update))]
pub async fn update_config(
    db: &DatabaseConnection,
    config_id: i64,
    update: ConfigUpdate,
) -> Result<personalization_config::Model> {
    let existing = get_config_by_id(db, config_id)
        .await?
        .ok_or_else(|| Error::not_found("Config", config_id))?;

    let mut merged = NewConfig::from(&existing);
    update.apply_to(&mut merged);
    check_config_rules(&merged)?;

    let mut model: personalization_config::ActiveModel = existing.into();
    model.label = Set(merged.label.trim().to_string());
    model.is_required = Set(merged.is_required);
    model.text_config = Set(merged.text_config);
    model.image_upload_config = Set(merged.image_upload_config);
    model.font_config = Set(merged.font_config);
    model.color_config = Set(merged.color_config);
    model.live_preview_mode = Set(merged.live_preview_mode);
    model.price_impact = Set(merged.price_impact);
    model.lock_after_stage = Set(merged.lock_after_stage);
    model.display_order = Set(merged.display_order);
    model.help_text = Set(merged.help_text);
    model.updated_at = Set(chrono::Utc::now());

    model.update(db).await.map_err(Into::into)
}

/// Soft-enables or soft-disables a config.
pub async fn set_config_enabled(
    db: &DatabaseConnection,
    config_id: i64,
    enabled: bool,
) -> Result<personalization_config::Model> {
    let mut model: personalization_config::ActiveModel = get_config_by_id(db, config_id)
        .await?
        .ok_or_else(|| Error::not_found("Config", config_id))?
        .into();

    model.is_enabled = Set(enabled);
    model.updated_at = Set(chrono::Utc::now());
    model.update(db).await.map_err(Into::into)
}

/// Hard-deletes a config that no submission has ever referenced.
///
/// # Errors
/// Returns [`Error::ConfigInUse`] when submissions reference the config;
/// disable it with [`set_config_enabled`] instead.
pub async fn delete_config(db: &DatabaseConnection, config_id: i64) -> Result<()> {
    let config = get_config_by_id(db, config_id)
        .await?
        .ok_or_else(|| Error::not_found("Config", config_id))?;

    let submissions = Submission::find()
        .filter(SubmissionColumn::ConfigId.eq(config_id))
        .count(db)
        .await?;
    if submissions > 0 {
        return Err(Error::ConfigInUse {
            config_id,
            submissions,
        });
    }

    config.delete(db).await?;
    Ok(())
}

/// Seeds catalog configs for every listing that has none yet.
///
/// Returns the number of configs inserted. Each listing is seeded in its own
/// transaction, so a bad entry leaves that listing untouched.
pub async fn seed_catalog(db: &DatabaseConnection, catalog: &Catalog) -> Result<usize> {
    let mut inserted = 0;

    for listing in &catalog.listings {
        let existing = PersonalizationConfig::find()
            .filter(ConfigColumn::ListingId.eq(listing.listing_id.as_str()))
            .count(db)
            .await?;
        if existing > 0 {
            warn!(
                listing_id = %listing.listing_id,
                existing, "Listing already has personalization configs, skipping seed"
            );
            continue;
        }

        let txn = db.begin().await?;
        for config in &listing.configs {
            create_config(&txn, &listing.listing_id, config.clone()).await?;
        }
        txn.commit().await?;

        info!(
            listing_id = %listing.listing_id,
            count = listing.configs.len(),
            "Seeded personalization configs"
        );
        inserted += listing.configs.len();
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::config::catalog::ListingCatalog;
    use crate::test_utils::*;
    use assert_matches::assert_matches;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_config_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        // Empty label
        let result = create_config(&db, "mug", NewConfig::new("  ", PersonalizationType::Text)).await;
        assert_matches!(result, Err(Error::InvalidInput { .. }));

        // Text slot without a text sub-config
        let result = create_config(&db, "mug", NewConfig::new("Name", PersonalizationType::Text)).await;
        assert_matches!(result, Err(Error::InvalidInput { .. }));

        // Inverted length bounds
        let mut config = text_config_spec("Name", false, 10);
        config.text_config.as_mut().unwrap().min_length = 12;
        let result = create_config(&db, "mug", config).await;
        assert_matches!(result, Err(Error::InvalidInput { .. }));

        // Regex that does not compile
        let mut config = text_config_spec("Name", false, 10);
        config.text_config.as_mut().unwrap().validation_regex = Some("([a-z".to_string());
        let result = create_config(&db, "mug", config).await;
        assert_matches!(result, Err(Error::InvalidInput { .. }));

        // Negative price impact
        let mut config = text_config_spec("Name", false, 10);
        config.price_impact = PriceImpact::Fixed { amount: -1.0 };
        let result = create_config(&db, "mug", config).await;
        assert_matches!(result, Err(Error::InvalidInput { .. }));

        // Preset selection with no presets
        let mut config = NewConfig::new("Motif", PersonalizationType::ImageSelection);
        config.image_upload_config = Some(ImageUploadConfig::default());
        let result = create_config(&db, "mug", config).await;
        assert_matches!(result, Err(Error::InvalidInput { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_get_configs_for_listing_orders_and_filters() -> Result<()> {
        let db = setup_test_db().await?;

        let mut second = text_config_spec("Second", false, 10);
        second.display_order = 2;
        let mut first = text_config_spec("First", false, 10);
        first.display_order = 1;
        let mut hidden = text_config_spec("Hidden", false, 10);
        hidden.is_enabled = false;

        create_config(&db, TEST_LISTING, second).await?;
        create_config(&db, TEST_LISTING, first).await?;
        create_config(&db, TEST_LISTING, hidden).await?;
        create_config(&db, "other-listing", text_config_spec("Elsewhere", false, 10)).await?;

        let configs = get_configs_for_listing(&db, TEST_LISTING).await?;
        let labels: Vec<_> = configs.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["First", "Second"]);

        let all = get_all_configs_for_listing(&db, TEST_LISTING).await?;
        assert_eq!(all.len(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_listing_without_configs_is_empty() -> Result<()> {
        let db = setup_test_db().await?;
        let configs = get_configs_for_listing(&db, "no-personalization").await?;
        assert!(configs.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_config() -> Result<()> {
        let db = setup_test_db().await?;
        let config = create_test_text_config(&db, true, 20).await?;

        let updated = update_config(
            &db,
            config.id,
            ConfigUpdate {
                label: Some("Monogram".to_string()),
                price_impact: Some(PriceImpact::Fixed { amount: 4.0 }),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.label, "Monogram");
        assert_eq!(updated.price_impact, PriceImpact::Fixed { amount: 4.0 });
        assert_eq!(updated.text_config, config.text_config);

        // Removing the only sub-config of a text slot is refused
        let result = update_config(
            &db,
            config.id,
            ConfigUpdate {
                text_config: Some(None),
                ..Default::default()
            },
        )
        .await;
        assert_matches!(result, Err(Error::InvalidInput { .. }));

        let result = update_config(&db, 999, ConfigUpdate::default()).await;
        assert_matches!(result, Err(Error::NotFound { entity: "Config", .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_soft_disable_hides_config() -> Result<()> {
        let db = setup_test_db().await?;
        let config = create_test_text_config(&db, true, 20).await?;

        let disabled = set_config_enabled(&db, config.id, false).await?;
        assert!(!disabled.is_enabled);
        assert!(get_configs_for_listing(&db, TEST_LISTING).await?.is_empty());
        assert!(get_config_by_id(&db, config.id).await?.is_some());

        set_config_enabled(&db, config.id, true).await?;
        assert_eq!(get_configs_for_listing(&db, TEST_LISTING).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_config_refused_while_referenced() -> Result<()> {
        let db = setup_test_db().await?;
        let unused = create_test_text_config(&db, false, 20).await?;
        let used = create_test_text_config(&db, false, 20).await?;
        create_test_submission(&db, &used, "Hi").await?;

        delete_config(&db, unused.id).await?;
        assert!(get_config_by_id(&db, unused.id).await?.is_none());

        let result = delete_config(&db, used.id).await;
        assert_matches!(
            result,
            Err(Error::ConfigInUse { config_id, submissions: 1 }) if config_id == used.id
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_catalog_skips_configured_listings() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_text_config(&db, false, 20).await?;

        let catalog = Catalog {
            listings: vec![
                ListingCatalog {
                    listing_id: TEST_LISTING.to_string(),
                    configs: vec![text_config_spec("Ignored", false, 5)],
                },
                ListingCatalog {
                    listing_id: "tote-bag".to_string(),
                    configs: vec![
                        text_config_spec("Front text", true, 30),
                        text_config_spec("Back text", false, 30),
                    ],
                },
            ],
        };

        let inserted = seed_catalog(&db, &catalog).await?;
        assert_eq!(inserted, 2);
        assert_eq!(get_configs_for_listing(&db, TEST_LISTING).await?.len(), 1);
        assert_eq!(get_configs_for_listing(&db, "tote-bag").await?.len(), 2);

        // Running it again is a no-op
        assert_eq!(seed_catalog(&db, &catalog).await?, 0);
        Ok(())
    }
}
