//! Price impact calculator - the incremental price of personalization.
//!
//! The listing's base price belongs to the pricing collaborator; it is only
//! passed in here for `percentage` rules. All amounts are rounded to cents,
//! and sums are taken in whole cents so totals never drift.

use crate::{
    entities::personalization_config,
    models::{PriceImpact, SubmissionPayload},
};

/// Rounds a currency amount to two decimal places.
#[must_use]
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[allow(clippy::cast_possible_truncation)]
fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Sums amounts in whole cents.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sum_amounts<I>(amounts: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let cents: i64 = amounts.into_iter().map(to_cents).sum();
    cents as f64 / 100.0
}

/// Computes one config's price impact from raw inputs.
///
/// * `text_value` - text entered for the slot, if any
/// * `image_count` - number of images supplied for the slot
/// * `base_price` - listing base price, used only by `percentage` rules
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate(
    config: &personalization_config::Model,
    text_value: Option<&str>,
    image_count: u32,
    base_price: Option<f64>,
) -> f64 {
    let impact = match &config.price_impact {
        PriceImpact::None => 0.0,
        PriceImpact::Fixed { amount } => *amount,
        PriceImpact::Percentage { percentage } => base_price.unwrap_or(0.0) * percentage / 100.0,
        PriceImpact::PerCharacter { per_character } => {
            text_value.map_or(0, |t| t.chars().count()) as f64 * per_character
        }
        PriceImpact::PerImage { per_image } => f64::from(image_count) * per_image,
    };
    round_to_cents(impact)
}

/// Computes the price impact of a submission payload.
///
/// An empty payload costs nothing. A chosen preset image adds its own
/// `price_modifier` on top of the slot's rule.
#[must_use]
pub fn calculate_for_submission(
    config: &personalization_config::Model,
    payload: &SubmissionPayload,
    base_price: Option<f64>,
) -> f64 {
    if !payload.has_content() {
        return 0.0;
    }

    let rule_impact = calculate(
        config,
        payload.text_value(),
        payload.image_count(),
        base_price,
    );

    let preset_modifier = payload
        .image()
        .filter(|image| image.uploaded_url().is_none())
        .and_then(|image| image.preset_id())
        .and_then(|preset_id| {
            config
                .image_upload_config
                .as_ref()
                .and_then(|c| c.preset(preset_id))
        })
        .map_or(0.0, |preset| preset.price_modifier);

    sum_amounts([rule_impact, preset_modifier])
}

/// Per-config price impacts and their total for one listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceBreakdown {
    /// `(config_id, impact)` in the order submissions were given
    pub items: Vec<(i64, f64)>,
    /// Sum of all items
    pub total: f64,
}

/// Sums each submission's independently computed impact. Submissions whose
/// config is not among `configs` contribute nothing.
#[must_use]
pub fn calculate_listing_total(
    configs: &[personalization_config::Model],
    submissions: &[(i64, &SubmissionPayload)],
    base_price: Option<f64>,
) -> PriceBreakdown {
    let items: Vec<(i64, f64)> = submissions
        .iter()
        .filter_map(|(config_id, payload)| {
            let config = configs.iter().find(|c| c.id == *config_id)?;
            Some((
                *config_id,
                calculate_for_submission(config, payload, base_price),
            ))
        })
        .collect();
    let total = sum_amounts(items.iter().map(|(_, impact)| *impact));
    PriceBreakdown { items, total }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::models::{CombinedPayload, ImageData, ImageUploadConfig, PersonalizationType, PresetImage};
    use crate::test_utils::config_model;

    fn priced(impact: PriceImpact) -> personalization_config::Model {
        let mut config = config_model(PersonalizationType::Combined, false);
        config.price_impact = impact;
        config
    }

    #[test]
    fn test_rules() {
        assert_eq!(calculate(&priced(PriceImpact::None), Some("abc"), 1, Some(50.0)), 0.0);
        assert_eq!(
            calculate(&priced(PriceImpact::Fixed { amount: 3.0 }), None, 0, None),
            3.0
        );
        assert_eq!(
            calculate(
                &priced(PriceImpact::Percentage { percentage: 10.0 }),
                None,
                0,
                Some(24.99)
            ),
            2.5
        );
        assert_eq!(
            calculate(
                &priced(PriceImpact::Percentage { percentage: 10.0 }),
                None,
                0,
                None
            ),
            0.0
        );
        assert_eq!(
            calculate(
                &priced(PriceImpact::PerImage { per_image: 1.25 }),
                None,
                3,
                None
            ),
            3.75
        );
    }

    #[test]
    fn test_per_character() {
        let config = priced(PriceImpact::PerCharacter { per_character: 0.50 });
        assert_eq!(calculate(&config, Some("0123456789"), 0, None), 5.00);
        assert_eq!(calculate(&config, None, 0, None), 0.0);
        // Characters, not bytes
        assert_eq!(calculate(&config, Some("ñandú"), 0, None), 2.5);
    }

    #[test]
    fn test_empty_submission_costs_nothing() {
        let config = priced(PriceImpact::Fixed { amount: 5.0 });
        let empty = SubmissionPayload::Combined(CombinedPayload::default());
        assert_eq!(calculate_for_submission(&config, &empty, None), 0.0);
        assert_eq!(
            calculate_for_submission(&config, &SubmissionPayload::text("Hi"), None),
            5.0
        );
    }

    #[test]
    fn test_preset_modifier_is_added() {
        let mut config = priced(PriceImpact::PerImage { per_image: 2.0 });
        config.image_upload_config = Some(ImageUploadConfig {
            presets: vec![PresetImage {
                id: "heart".to_string(),
                name: "Heart".to_string(),
                url: "https://cdn.example/heart.png".to_string(),
                price_modifier: 1.5,
            }],
            ..Default::default()
        });

        let preset = SubmissionPayload::ImageSelection {
            image: ImageData {
                preset_id: Some("heart".to_string()),
                ..Default::default()
            },
        };
        assert_eq!(calculate_for_submission(&config, &preset, None), 3.5);

        let upload = SubmissionPayload::ImageUpload {
            image: ImageData {
                uploaded_url: Some("https://cdn.example/u/1.png".to_string()),
                ..Default::default()
            },
        };
        assert_eq!(calculate_for_submission(&config, &upload, None), 2.0);
    }

    #[test]
    fn test_listing_total_sums_configs() {
        let mut engraving = priced(PriceImpact::PerCharacter { per_character: 0.1 });
        engraving.id = 1;
        let mut gift_wrap = priced(PriceImpact::Fixed { amount: 0.2 });
        gift_wrap.id = 2;

        let text = SubmissionPayload::text("abc");
        let note = SubmissionPayload::text("x");
        let orphan = SubmissionPayload::text("ignored");
        let breakdown = calculate_listing_total(
            &[engraving, gift_wrap],
            &[(1, &text), (2, &note), (99, &orphan)],
            None,
        );
        assert_eq!(breakdown.items, vec![(1, 0.3), (2, 0.2)]);
        assert_eq!(breakdown.total, 0.5);
    }

    #[test]
    fn test_sum_amounts_has_no_drift() {
        assert_eq!(sum_amounts([0.1, 0.2]), 0.3);
        assert_eq!(sum_amounts([2.00, 3.50]), 5.50);
        assert_eq!(sum_amounts(std::iter::repeat_n(0.01, 1000)), 10.0);
    }
}
