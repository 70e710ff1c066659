//! Submission store - buyer values for personalization slots.
//!
//! Every write re-validates and re-prices the submission; invalid drafts are
//! still saved, with their errors recorded. A locked submission is never
//! written again: updates go through a conditional `UPDATE ... WHERE
//! is_locked = false` so a late edit cannot slip past a concurrent freeze.

use crate::{
    core::{pricing, registry, snapshot, validation},
    entities::{Submission, SubmissionColumn, personalization_submission},
    errors::{Error, Result},
    models::{SubmissionPayload, ValidationErrors},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, info, instrument};

/// A submission as first entered by the buyer.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    /// Config slot being answered
    pub config_id: i64,
    /// The buyer's values
    pub payload: SubmissionPayload,
    /// Cart line, when the form is filled in from the cart
    pub cart_item_id: Option<String>,
    /// Booking, when personalizing an existing booking
    pub booking_id: Option<String>,
    /// Production order, when personalizing an existing production order
    pub production_order_id: Option<String>,
}

impl NewSubmission {
    /// A draft submission not yet attached to anything.
    #[must_use]
    pub const fn new(config_id: i64, payload: SubmissionPayload) -> Self {
        Self {
            config_id,
            payload,
            cart_item_id: None,
            booking_id: None,
            production_order_id: None,
        }
    }
}

/// An edit to an unlocked submission.
#[derive(Debug, Clone)]
pub struct SubmissionPatch {
    /// Replacement values
    pub payload: SubmissionPayload,
    /// Revision the edit was based on; `None` means last write wins
    pub expected_revision: Option<i32>,
}

impl SubmissionPatch {
    /// Last-write-wins edit.
    #[must_use]
    pub const fn new(payload: SubmissionPayload) -> Self {
        Self {
            payload,
            expected_revision: None,
        }
    }
}

/// Validation outcome and price impact of a payload against its stored config.
pub(crate) async fn evaluate<C>(
    db: &C,
    listing_id: &str,
    config_id: i64,
    payload: &SubmissionPayload,
    base_price: Option<f64>,
) -> Result<(validation::ValidationOutcome, f64)>
where
    C: ConnectionTrait,
{
    let config = registry::get_config_by_id(db, config_id).await?;
    let outcome = validation::validate_against(payload, config.as_ref(), listing_id);
    let price = config
        .as_ref()
        .filter(|c| c.is_enabled && c.listing_id == listing_id)
        .map_or(0.0, |c| pricing::calculate_for_submission(c, payload, base_price));
    Ok((outcome, price))
}

/// Inserts a submission without requiring its config to exist. Used directly
/// when replaying saved setups, whose configs may have been removed since.
pub(crate) async fn insert_submission<C>(
    db: &C,
    customer_id: &str,
    listing_id: &str,
    submission: NewSubmission,
    base_price: Option<f64>,
) -> Result<personalization_submission::Model>
where
    C: ConnectionTrait,
{
    let (outcome, price) = evaluate(
        db,
        listing_id,
        submission.config_id,
        &submission.payload,
        base_price,
    )
    .await?;

    let now = chrono::Utc::now();
    let model = personalization_submission::ActiveModel {
        customer_id: Set(customer_id.to_string()),
        listing_id: Set(listing_id.to_string()),
        config_id: Set(submission.config_id),
        submission_type: Set(submission.payload.submission_type()),
        payload: Set(submission.payload),
        cart_item_id: Set(submission.cart_item_id),
        booking_id: Set(submission.booking_id),
        production_order_id: Set(submission.production_order_id),
        calculated_price_impact: Set(price),
        validation_status: Set(outcome.status()),
        validation_errors: Set(ValidationErrors(outcome.errors)),
        is_locked: Set(false),
        locked_at: Set(None),
        locked_reason: Set(None),
        revision: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Refuses new personalization on a cart line whose values are already frozen.
///
/// # Errors
/// - [`Error::SnapshotAlreadyTransferred`] if its snapshot belongs to an order
/// - [`Error::InvalidInput`] if it has an active snapshot or locked submissions
pub(crate) async fn ensure_cart_item_open<C>(db: &C, cart_item_id: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    if let Some(active) = snapshot::get_active_snapshot(db, cart_item_id).await? {
        return Err(match active.booking_id {
            Some(booking_id) => Error::SnapshotAlreadyTransferred {
                cart_item_id: cart_item_id.to_string(),
                booking_id,
            },
            None => Error::invalid(format!(
                "Cart item {cart_item_id} already has a frozen personalization snapshot"
            )),
        });
    }
    let locked = Submission::find()
        .filter(SubmissionColumn::CartItemId.eq(cart_item_id))
        .filter(SubmissionColumn::IsLocked.eq(true))
        .count(db)
        .await?;
    if locked > 0 {
        return Err(Error::invalid(format!(
            "Cart item {cart_item_id} already has locked personalization"
        )));
    }
    Ok(())
}

/// Creates a submission for a customer and listing.
///
/// The submission is validated and priced immediately; validation problems
/// are recorded on the record rather than rejected.
///
/// # Errors
/// Returns [`Error::NotFound`] if the config does not exist and
/// [`Error::InvalidInput`] for blank customer or listing ids. A submission
/// created straight onto a cart item fails as [`ensure_cart_item_open`] does.
pub async fn create_submission(
    db: &DatabaseConnection,
    customer_id: &str,
    listing_id: &str,
    submission: NewSubmission,
    base_price: Option<f64>,
) -> Result<personalization_submission::Model> {
    if customer_id.trim().is_empty() || listing_id.trim().is_empty() {
        return Err(Error::invalid("Customer and listing ids are required"));
    }
    if registry::get_config_by_id(db, submission.config_id)
        .await?
        .is_none()
    {
        return Err(Error::not_found("Config", submission.config_id));
    }
    if let Some(cart_item_id) = submission.cart_item_id.as_deref() {
        ensure_cart_item_open(db, cart_item_id).await?;
    }

    let created = insert_submission(db, customer_id, listing_id, submission, base_price).await?;
    debug!(
        submission_id = created.id,
        status = ?created.validation_status,
        "Created personalization submission"
    );
    Ok(created)
}

/// Finds a submission by id.
pub async fn get_submission<C>(
    db: &C,
    submission_id: i64,
) -> Result<Option<personalization_submission::Model>>
where
    C: ConnectionTrait,
{
    Submission::find_by_id(submission_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// All submissions attached to a cart line, oldest first.
pub async fn get_submissions_for_cart_item<C>(
    db: &C,
    cart_item_id: &str,
) -> Result<Vec<personalization_submission::Model>>
where
    C: ConnectionTrait,
{
    Submission::find()
        .filter(SubmissionColumn::CartItemId.eq(cart_item_id))
        .order_by_asc(SubmissionColumn::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// A customer's unattached, unlocked submissions for a listing.
pub async fn get_draft_submissions(
    db: &DatabaseConnection,
    customer_id: &str,
    listing_id: &str,
) -> Result<Vec<personalization_submission::Model>> {
    Submission::find()
        .filter(SubmissionColumn::CustomerId.eq(customer_id))
        .filter(SubmissionColumn::ListingId.eq(listing_id))
        .filter(SubmissionColumn::CartItemId.is_null())
        .filter(SubmissionColumn::IsLocked.eq(false))
        .order_by_asc(SubmissionColumn::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Explains why a guarded write touched no row.
fn write_refusal(
    current: Option<&personalization_submission::Model>,
    submission_id: i64,
    expected: Option<i32>,
) -> Error {
    match current {
        None => Error::not_found("Submission", submission_id),
        Some(s) if s.is_locked => Error::LockedSubmission { submission_id },
        Some(s) => Error::StaleRevision {
            submission_id,
            expected: expected.unwrap_or(s.revision),
            actual: s.revision,
        },
    }
}

/// Replaces the values of an unlocked submission.
///
/// # Errors
/// - [`Error::LockedSubmission`] if the submission is (or becomes) locked, or
///   its cart item's snapshot already belongs to an order; the stored record
///   is left unchanged
/// - [`Error::StaleRevision`] if `expected_revision` no longer matches
/// - [`Error::NotFound`] if the submission does not exist
#[instrument(skip(db, patch))]
pub async fn update_submission(
    db: &DatabaseConnection,
    submission_id: i64,
    patch: SubmissionPatch,
    base_price: Option<f64>,
) -> Result<personalization_submission::Model> {
    let existing = get_submission(db, submission_id).await?;
    let existing = match existing {
        Some(s) if !s.is_locked && patch.expected_revision.is_none_or(|r| r == s.revision) => s,
        other => {
            return Err(write_refusal(
                other.as_ref(),
                submission_id,
                patch.expected_revision,
            ));
        }
    };
    if let Some(cart_item_id) = existing.cart_item_id.as_deref() {
        let ordered = snapshot::get_active_snapshot(db, cart_item_id)
            .await?
            .is_some_and(|s| s.is_transferred());
        if ordered {
            return Err(Error::LockedSubmission { submission_id });
        }
    }

    let (outcome, price) = evaluate(
        db,
        &existing.listing_id,
        existing.config_id,
        &patch.payload,
        base_price,
    )
    .await?;

    let changes = personalization_submission::ActiveModel {
        submission_type: Set(patch.payload.submission_type()),
        payload: Set(patch.payload),
        calculated_price_impact: Set(price),
        validation_status: Set(outcome.status()),
        validation_errors: Set(ValidationErrors(outcome.errors)),
        updated_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let mut guarded = Submission::update_many()
        .set(changes)
        .col_expr(
            SubmissionColumn::Revision,
            Expr::col(SubmissionColumn::Revision).add(1),
        )
        .filter(SubmissionColumn::Id.eq(submission_id))
        .filter(SubmissionColumn::IsLocked.eq(false));
    if let Some(expected) = patch.expected_revision {
        guarded = guarded.filter(SubmissionColumn::Revision.eq(expected));
    }
    let result = guarded.exec(db).await?;

    let current = get_submission(db, submission_id).await?;
    if result.rows_affected == 0 {
        return Err(write_refusal(
            current.as_ref(),
            submission_id,
            patch.expected_revision,
        ));
    }
    current.ok_or_else(|| Error::not_found("Submission", submission_id))
}

/// Checks whether a submission may be attached to `cart_item_id`.
/// Returns `false` when it is already attached to that same cart item.
fn check_linkable(submission: &personalization_submission::Model, cart_item_id: &str) -> Result<bool> {
    if submission.is_locked {
        return Err(Error::LockedSubmission {
            submission_id: submission.id,
        });
    }
    match submission.cart_item_id.as_deref() {
        None => Ok(true),
        Some(existing) if existing == cart_item_id => Ok(false),
        Some(existing) => Err(Error::AlreadyLinked {
            submission_id: submission.id,
            cart_item_id: existing.to_string(),
        }),
    }
}

/// Attaches draft submissions to a cart line.
///
/// The association is made once: linking to the same cart item again is a
/// no-op, linking to a different one fails. Either every submission is
/// linked or none is. New submissions cannot join a cart item that is
/// already frozen.
#[instrument(skip(db))]
pub async fn link_to_cart_item(
    db: &DatabaseConnection,
    submission_ids: &[i64],
    cart_item_id: &str,
) -> Result<Vec<personalization_submission::Model>> {
    if submission_ids.is_empty() {
        return Err(Error::invalid("No submissions to link"));
    }
    if cart_item_id.trim().is_empty() {
        return Err(Error::invalid("Cart item id cannot be empty"));
    }

    let mut ids = submission_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let txn = db.begin().await?;

    let found = Submission::find()
        .filter(SubmissionColumn::Id.is_in(ids.iter().copied()))
        .order_by_asc(SubmissionColumn::Id)
        .all(&txn)
        .await?;

    let mut to_link = Vec::new();
    for id in &ids {
        let submission = found
            .iter()
            .find(|s| s.id == *id)
            .ok_or_else(|| Error::not_found("Submission", id))?;
        if check_linkable(submission, cart_item_id)? {
            to_link.push(*id);
        }
    }

    let customers: std::collections::HashSet<_> = found
        .iter()
        .map(|s| (s.customer_id.as_str(), s.listing_id.as_str()))
        .collect();
    if customers.len() > 1 {
        return Err(Error::invalid(
            "Submissions linked to one cart item must share customer and listing",
        ));
    }

    if !to_link.is_empty() {
        ensure_cart_item_open(&txn, cart_item_id).await?;
        let result = Submission::update_many()
            .col_expr(SubmissionColumn::CartItemId, Expr::value(cart_item_id))
            .col_expr(SubmissionColumn::UpdatedAt, Expr::value(chrono::Utc::now()))
            .col_expr(
                SubmissionColumn::Revision,
                Expr::col(SubmissionColumn::Revision).add(1),
            )
            .filter(SubmissionColumn::Id.is_in(to_link.iter().copied()))
            .filter(SubmissionColumn::CartItemId.is_null())
            .filter(SubmissionColumn::IsLocked.eq(false))
            .exec(&txn)
            .await?;

        if result.rows_affected != to_link.len() as u64 {
            let current = Submission::find()
                .filter(SubmissionColumn::Id.is_in(to_link.iter().copied()))
                .all(&txn)
                .await?;
            for submission in &current {
                check_linkable(submission, cart_item_id)?;
            }
            return Err(Error::invalid("Submissions changed while linking"));
        }
    }

    let linked = Submission::find()
        .filter(SubmissionColumn::Id.is_in(ids.iter().copied()))
        .order_by_asc(SubmissionColumn::Id)
        .all(&txn)
        .await?;
    txn.commit().await?;

    info!(
        cart_item_id,
        linked = to_link.len(),
        "Linked personalization submissions to cart item"
    );
    Ok(linked)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::SubmissionState;
    use crate::models::{PersonalizationType, PriceImpact, ValidationStatus};
    use crate::test_utils::*;
    use assert_matches::assert_matches;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_create_submission_validates_and_prices() -> Result<()> {
        let db = setup_test_db().await?;
        let config = create_priced_text_config(&db, PriceImpact::PerCharacter { per_character: 0.5 })
            .await?;

        let valid = create_test_submission(&db, &config, "0123456789").await?;
        assert_eq!(valid.validation_status, ValidationStatus::Valid);
        assert!(valid.validation_errors.0.is_empty());
        assert_eq!(valid.calculated_price_impact, 5.0);
        assert_eq!(valid.revision, 1);
        assert_eq!(valid.state(), SubmissionState::Draft);

        // Invalid drafts are still saved
        let required = create_test_text_config(&db, true, 20).await?;
        let invalid = create_test_submission(&db, &required, "").await?;
        assert_eq!(invalid.validation_status, ValidationStatus::Invalid);
        assert_eq!(invalid.validation_errors.0, vec!["This field is required".to_string()]);
        assert_eq!(invalid.calculated_price_impact, 0.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_submission_requires_config() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_submission(
            &db,
            TEST_CUSTOMER,
            TEST_LISTING,
            NewSubmission::new(42, SubmissionPayload::text("Hi")),
            None,
        )
        .await;
        assert_matches!(result, Err(Error::NotFound { entity: "Config", .. }));

        let result = create_submission(
            &db,
            " ",
            TEST_LISTING,
            NewSubmission::new(42, SubmissionPayload::text("Hi")),
            None,
        )
        .await;
        assert_matches!(result, Err(Error::InvalidInput { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_submission_revalidates() -> Result<()> {
        let db = setup_test_db().await?;
        let config = create_test_text_config(&db, true, 20).await?;
        let draft = create_test_submission(&db, &config, "").await?;
        assert_eq!(draft.validation_status, ValidationStatus::Invalid);

        let updated = update_submission(
            &db,
            draft.id,
            SubmissionPatch::new(SubmissionPayload::text("Happy Birthday!!")),
            None,
        )
        .await?;
        assert_eq!(updated.validation_status, ValidationStatus::Valid);
        assert_eq!(updated.payload.text_value(), Some("Happy Birthday!!"));
        assert_eq!(updated.revision, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_locked_submission_fails() -> Result<()> {
        let db = setup_test_db().await?;
        let config = create_test_text_config(&db, true, 20).await?;
        let submission = create_test_submission(&db, &config, "Original").await?;
        lock_submission_for_test(&db, submission.id).await?;

        let result = update_submission(
            &db,
            submission.id,
            SubmissionPatch::new(SubmissionPayload::text("x")),
            None,
        )
        .await;
        assert_matches!(
            result,
            Err(Error::LockedSubmission { submission_id }) if submission_id == submission.id
        );

        let stored = get_submission(&db, submission.id).await?.unwrap();
        assert_eq!(stored.payload.text_value(), Some("Original"));
        assert_eq!(stored.revision, submission.revision);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_with_stale_revision_fails() -> Result<()> {
        let db = setup_test_db().await?;
        let config = create_test_text_config(&db, false, 20).await?;
        let submission = create_test_submission(&db, &config, "one").await?;

        // Device A edits from revision 1
        update_submission(
            &db,
            submission.id,
            SubmissionPatch {
                payload: SubmissionPayload::text("two"),
                expected_revision: Some(1),
            },
            None,
        )
        .await?;

        // Device B still holds revision 1
        let result = update_submission(
            &db,
            submission.id,
            SubmissionPatch {
                payload: SubmissionPayload::text("three"),
                expected_revision: Some(1),
            },
            None,
        )
        .await;
        assert_matches!(
            result,
            Err(Error::StaleRevision { expected: 1, actual: 2, .. })
        );

        let stored = get_submission(&db, submission.id).await?.unwrap();
        assert_eq!(stored.payload.text_value(), Some("two"));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_submission() -> Result<()> {
        let db = setup_test_db().await?;
        let result = update_submission(
            &db,
            404,
            SubmissionPatch::new(SubmissionPayload::text("x")),
            None,
        )
        .await;
        assert_matches!(result, Err(Error::NotFound { entity: "Submission", .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_link_to_cart_item_is_one_time() -> Result<()> {
        let db = setup_test_db().await?;
        let config = create_test_text_config(&db, false, 20).await?;
        let a = create_test_submission(&db, &config, "A").await?;
        let b = create_test_submission(&db, &config, "B").await?;

        let linked = link_to_cart_item(&db, &[a.id, b.id], "cart-1").await?;
        assert_eq!(linked.len(), 2);
        assert!(linked.iter().all(|s| s.cart_item_id.as_deref() == Some("cart-1")));
        assert!(linked.iter().all(|s| s.state() == SubmissionState::Attached));

        // Same cart item again is a no-op
        let again = link_to_cart_item(&db, &[a.id], "cart-1").await?;
        assert_eq!(again[0].revision, linked[0].revision);

        // A different cart item is refused
        let result = link_to_cart_item(&db, &[a.id], "cart-2").await;
        assert_matches!(
            result,
            Err(Error::AlreadyLinked { cart_item_id, .. }) if cart_item_id == "cart-1"
        );

        assert!(get_draft_submissions(&db, TEST_CUSTOMER, TEST_LISTING).await?.is_empty());
        assert_eq!(get_submissions_for_cart_item(&db, "cart-1").await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_link_is_all_or_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let config = create_test_text_config(&db, false, 20).await?;
        let free = create_test_submission(&db, &config, "free").await?;
        let taken = create_test_submission(&db, &config, "taken").await?;
        link_to_cart_item(&db, &[taken.id], "cart-1").await?;

        let result = link_to_cart_item(&db, &[free.id, taken.id], "cart-2").await;
        assert_matches!(result, Err(Error::AlreadyLinked { .. }));
        let free_now = get_submission(&db, free.id).await?.unwrap();
        assert!(free_now.cart_item_id.is_none());

        let result = link_to_cart_item(&db, &[free.id, 999], "cart-2").await;
        assert_matches!(result, Err(Error::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_link_locked_submission_fails() -> Result<()> {
        let db = setup_test_db().await?;
        let config = create_test_text_config(&db, false, 20).await?;
        let submission = create_test_submission(&db, &config, "A").await?;
        lock_submission_for_test(&db, submission.id).await?;

        let result = link_to_cart_item(&db, &[submission.id], "cart-1").await;
        assert_matches!(result, Err(Error::LockedSubmission { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_locked_between_read_and_write() -> Result<()> {
        // Freeze lands after the read but before the guarded write
        let unlocked = submission_model(false);
        let locked = submission_model(true);
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([vec![unlocked.clone()]])
            .append_query_results([vec![config_model(PersonalizationType::Text, false)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![locked]])
            .into_connection();

        let result = update_submission(
            &db,
            unlocked.id,
            SubmissionPatch::new(SubmissionPayload::text("late edit")),
            None,
        )
        .await;
        assert_matches!(
            result,
            Err(Error::LockedSubmission { submission_id }) if submission_id == unlocked.id
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_link_ignores_repeated_ids() -> Result<()> {
        let db = setup_test_db().await?;
        let config = create_test_text_config(&db, false, 20).await?;
        let submission = create_test_submission(&db, &config, "A").await?;

        let linked = link_to_cart_item(&db, &[submission.id, submission.id], "cart-1").await?;
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].cart_item_id.as_deref(), Some("cart-1"));
        assert_eq!(linked[0].revision, submission.revision + 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_frozen_cart_item_refuses_new_submissions() -> Result<()> {
        let db = setup_test_db().await?;
        let config = create_test_text_config(&db, false, 20).await?;
        let first = create_test_submission(&db, &config, "A").await?;
        link_to_cart_item(&db, &[first.id], "cart-1").await?;
        snapshot::create_snapshot(
            &db,
            snapshot::CreateSnapshotArgs::add_to_cart(
                "cart-1",
                TEST_CUSTOMER,
                TEST_LISTING,
                TEST_PROVIDER,
            ),
        )
        .await?;

        let mut onto_cart = NewSubmission::new(config.id, SubmissionPayload::text("B"));
        onto_cart.cart_item_id = Some("cart-1".to_string());
        let result =
            create_submission(&db, TEST_CUSTOMER, TEST_LISTING, onto_cart.clone(), None).await;
        assert_matches!(result, Err(Error::InvalidInput { .. }));

        let late = create_test_submission(&db, &config, "C").await?;
        let result = link_to_cart_item(&db, &[late.id], "cart-1").await;
        assert_matches!(result, Err(Error::InvalidInput { .. }));
        assert!(get_submission(&db, late.id).await?.unwrap().cart_item_id.is_none());

        snapshot::transfer_to_order(&db, "cart-1", "booking-1", None).await?;
        let result = create_submission(&db, TEST_CUSTOMER, TEST_LISTING, onto_cart, None).await;
        assert_matches!(
            result,
            Err(Error::SnapshotAlreadyTransferred { booking_id, .. }) if booking_id == "booking-1"
        );
        assert_eq!(get_submissions_for_cart_item(&db, "cart-1").await?.len(), 1);
        Ok(())
    }
}
