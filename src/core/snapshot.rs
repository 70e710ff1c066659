//! Snapshot engine - freezes a cart item's submissions and hands them to an order.
//!
//! A freeze is all-or-nothing: submissions are re-validated, locked and copied
//! into a new snapshot inside one transaction. Re-freezing a cart item
//! supersedes its active snapshot instead of editing it.

use crate::{
    core::{pricing, registry, submission, validation},
    entities::{
        Snapshot, SnapshotColumn, Submission, SubmissionColumn, personalization_config,
        personalization_snapshot, personalization_submission,
    },
    errors::{Error, Result},
    models::{
        ConfigSnapshot, FrozenSubmission, FrozenSubmissions, ImageReference, ImageReferences,
        LockStage, PreviewRenders, SnapshotStatus,
    },
};
use sea_orm::{DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, info, instrument, warn};

/// Who and what a snapshot is being taken for.
#[derive(Debug, Clone)]
pub struct CreateSnapshotArgs {
    pub cart_item_id: String,
    pub customer_id: String,
    pub listing_id: String,
    /// Seller fulfilling the order
    pub provider_id: String,
    /// Lifecycle point that triggered the freeze
    pub stage: LockStage,
    /// Preview render URLs produced by the caller, if any
    pub preview_renders: Vec<String>,
}

impl CreateSnapshotArgs {
    /// Arguments for the freeze that happens when an item is added to the cart.
    pub fn add_to_cart(
        cart_item_id: impl Into<String>,
        customer_id: impl Into<String>,
        listing_id: impl Into<String>,
        provider_id: impl Into<String>,
    ) -> Self {
        Self {
            cart_item_id: cart_item_id.into(),
            customer_id: customer_id.into(),
            listing_id: listing_id.into(),
            provider_id: provider_id.into(),
            stage: LockStage::AddToCart,
            preview_renders: Vec::new(),
        }
    }

    /// Same target, different trigger stage.
    #[must_use]
    pub fn at_stage(mut self, stage: LockStage) -> Self {
        self.stage = stage;
        self
    }
}

/// The active snapshot of a cart item, if any.
pub async fn get_active_snapshot<C>(
    db: &C,
    cart_item_id: &str,
) -> Result<Option<personalization_snapshot::Model>>
where
    C: ConnectionTrait,
{
    Snapshot::find()
        .filter(SnapshotColumn::ActiveCartItemId.eq(cart_item_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Every snapshot taken for a cart item, oldest version first.
pub async fn get_snapshot_history<C>(
    db: &C,
    cart_item_id: &str,
) -> Result<Vec<personalization_snapshot::Model>>
where
    C: ConnectionTrait,
{
    Snapshot::find()
        .filter(SnapshotColumn::CartItemId.eq(cart_item_id))
        .order_by_asc(SnapshotColumn::SnapshotVersion)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The snapshot transferred to a booking.
pub async fn get_snapshot_for_booking(
    db: &DatabaseConnection,
    booking_id: &str,
) -> Result<Option<personalization_snapshot::Model>> {
    Snapshot::find()
        .filter(SnapshotColumn::BookingId.eq(booking_id))
        .filter(SnapshotColumn::Status.eq(SnapshotStatus::Active))
        .one(db)
        .await
        .map_err(Into::into)
}

/// The snapshot transferred to a production order.
pub async fn get_snapshot_for_production_order(
    db: &DatabaseConnection,
    production_order_id: &str,
) -> Result<Option<personalization_snapshot::Model>> {
    Snapshot::find()
        .filter(SnapshotColumn::ProductionOrderId.eq(production_order_id))
        .filter(SnapshotColumn::Status.eq(SnapshotStatus::Active))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Re-validates the unlocked submissions about to be frozen.
/// Locked ones were checked when they were first frozen.
fn freeze_errors(
    submissions: &[personalization_submission::Model],
    configs: &[personalization_config::Model],
    listing_id: &str,
) -> Vec<String> {
    submissions
        .iter()
        .filter(|s| !s.is_locked)
        .flat_map(|s| {
            let config = configs.iter().find(|c| c.id == s.config_id);
            let label = config.map_or_else(|| format!("Config {}", s.config_id), |c| c.label.clone());
            validation::validate_against(&s.payload, config, listing_id)
                .errors
                .into_iter()
                .map(move |e| format!("{label}: {e}"))
        })
        .collect()
}

/// Images used by the frozen submissions. Presets resolve to their catalog URL.
fn image_references(
    submissions: &[personalization_submission::Model],
    configs: &[personalization_config::Model],
) -> Vec<ImageReference> {
    submissions
        .iter()
        .filter_map(|s| {
            let image = s.payload.image()?;
            let preset_id = image.preset_id().map(str::to_string);
            let url = match image.uploaded_url() {
                Some(url) => url.to_string(),
                None => {
                    let preset = configs
                        .iter()
                        .find(|c| c.id == s.config_id)
                        .and_then(|c| c.image_upload_config.as_ref())
                        .and_then(|c| c.preset(preset_id.as_deref()?))?;
                    preset.url.clone()
                }
            };
            Some(ImageReference {
                submission_id: s.id,
                url,
                preset_id,
                permanent_url: image.permanent_url.clone(),
                content_hash: image.content_hash.clone(),
            })
        })
        .collect()
}

/// Unlocked submissions whose live values no longer match their frozen copy.
fn diverged_from(
    snapshot: &personalization_snapshot::Model,
    submissions: &[personalization_submission::Model],
) -> Vec<String> {
    submissions
        .iter()
        .filter(|s| !s.is_locked)
        .filter_map(|s| match snapshot.frozen_submission(s.id) {
            Some(frozen) if frozen.payload == s.payload && frozen.revision == s.revision => None,
            Some(_) => Some(format!("Submission {} changed after it was frozen", s.id)),
            None => Some(format!("Submission {} is not in the frozen snapshot", s.id)),
        })
        .collect()
}

/// Locks the remaining submissions of an ordered snapshot that `args.stage`
/// has reached. The snapshot itself is left as the order received it, so
/// every locked value must still equal its frozen copy.
async fn lock_in_place(
    txn: &DatabaseTransaction,
    args: &CreateSnapshotArgs,
    snapshot: &personalization_snapshot::Model,
    submissions: &[personalization_submission::Model],
) -> Result<usize> {
    let errors = diverged_from(snapshot, submissions);
    if !errors.is_empty() {
        warn!(count = errors.len(), "Submissions diverged from the ordered snapshot");
        return Err(Error::FreezeIntegrity {
            cart_item_id: args.cart_item_id.clone(),
            errors,
        });
    }

    // Lock stages follow the configs the order was placed with
    let to_lock: Vec<i64> = submissions
        .iter()
        .filter(|s| !s.is_locked)
        .filter(|s| {
            snapshot
                .config_snapshot
                .config(s.config_id)
                .is_some_and(|c| c.lock_after_stage.is_reached_by(args.stage))
        })
        .map(|s| s.id)
        .collect();
    lock_submissions(txn, &args.cart_item_id, &to_lock, args.stage).await?;
    Ok(to_lock.len())
}

/// Locks exactly `ids`, failing if any of them was locked or moved meanwhile.
async fn lock_submissions(
    txn: &DatabaseTransaction,
    cart_item_id: &str,
    ids: &[i64],
    stage: LockStage,
) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let now = chrono::Utc::now();
    let result = Submission::update_many()
        .col_expr(SubmissionColumn::IsLocked, Expr::value(true))
        .col_expr(SubmissionColumn::LockedAt, Expr::value(now))
        .col_expr(SubmissionColumn::LockedReason, Expr::value(stage))
        .col_expr(SubmissionColumn::UpdatedAt, Expr::value(now))
        .filter(SubmissionColumn::Id.is_in(ids.iter().copied()))
        .filter(SubmissionColumn::IsLocked.eq(false))
        .filter(SubmissionColumn::CartItemId.eq(cart_item_id))
        .exec(txn)
        .await?;
    if result.rows_affected != ids.len() as u64 {
        return Err(Error::FreezeIntegrity {
            cart_item_id: cart_item_id.to_string(),
            errors: vec!["Submissions changed while being frozen".to_string()],
        });
    }
    Ok(())
}

/// Freezes every submission linked to a cart item into a new active snapshot.
///
/// Submissions whose config locks at or before `args.stage` are locked; the
/// rest stay editable and a later call at a later stage supersedes the
/// snapshot. If everything is already locked and an active snapshot exists,
/// that snapshot is returned unchanged. Once the snapshot belongs to an
/// order it is never superseded: a later stage only locks the submissions
/// it reaches, and the ordered snapshot is returned.
///
/// # Errors
/// - [`Error::FreezeIntegrity`] if any unlocked submission fails
///   re-validation; nothing is locked or written
/// - [`Error::FreezeIntegrity`] if the active snapshot already belongs to an
///   order and a submission no longer matches its frozen copy
/// - [`Error::InvalidInput`] if the cart item has no submissions, or they
///   belong to another customer or listing
#[instrument(skip(db, args), fields(cart_item_id = %args.cart_item_id, stage = ?args.stage))]
pub async fn create_snapshot(
    db: &DatabaseConnection,
    args: CreateSnapshotArgs,
) -> Result<personalization_snapshot::Model> {
    if args.cart_item_id.trim().is_empty() {
        return Err(Error::invalid("Cart item id cannot be empty"));
    }

    let txn = db.begin().await?;

    let submissions = submission::get_submissions_for_cart_item(&txn, &args.cart_item_id).await?;
    if submissions.is_empty() {
        return Err(Error::invalid(format!(
            "No personalization submitted for cart item {}",
            args.cart_item_id
        )));
    }
    if let Some(foreign) = submissions
        .iter()
        .find(|s| s.customer_id != args.customer_id || s.listing_id != args.listing_id)
    {
        return Err(Error::invalid(format!(
            "Submission {} belongs to another customer or listing",
            foreign.id
        )));
    }

    let active = get_active_snapshot(&txn, &args.cart_item_id).await?;
    let all_frozen = submissions.iter().all(|s| s.is_locked);
    if let Some(active) = active.as_ref().filter(|_| all_frozen) {
        debug!(snapshot_id = active.id, "All submissions already frozen");
        return Ok(active.clone());
    }
    if let Some(ordered) = active.as_ref().filter(|s| s.is_transferred()) {
        let locked = lock_in_place(&txn, &args, ordered, &submissions).await?;
        txn.commit().await?;
        info!(snapshot_id = ordered.id, locked, "Locked submissions into ordered snapshot");
        return Ok(ordered.clone());
    }

    let configs = registry::get_all_configs_for_listing(&txn, &args.listing_id).await?;

    let errors = freeze_errors(&submissions, &configs, &args.listing_id);
    if !errors.is_empty() {
        warn!(count = errors.len(), "Freeze-time revalidation failed");
        return Err(Error::FreezeIntegrity {
            cart_item_id: args.cart_item_id,
            errors,
        });
    }

    let to_lock: Vec<i64> = submissions
        .iter()
        .filter(|s| !s.is_locked)
        .filter(|s| {
            configs
                .iter()
                .find(|c| c.id == s.config_id)
                .is_some_and(|c| c.lock_after_stage.is_reached_by(args.stage))
        })
        .map(|s| s.id)
        .collect();

    lock_submissions(&txn, &args.cart_item_id, &to_lock, args.stage).await?;
    let now = chrono::Utc::now();

    // Re-read so the snapshot carries the lock state it just applied
    let frozen = submission::get_submissions_for_cart_item(&txn, &args.cart_item_id).await?;
    if frozen.len() != submissions.len() {
        return Err(Error::FreezeIntegrity {
            cart_item_id: args.cart_item_id,
            errors: vec!["Submissions changed while being frozen".to_string()],
        });
    }

    let previous_version = Snapshot::find()
        .filter(SnapshotColumn::CartItemId.eq(args.cart_item_id.as_str()))
        .order_by_desc(SnapshotColumn::SnapshotVersion)
        .one(&txn)
        .await?
        .map_or(0, |s| s.snapshot_version);

    if let Some(active) = active.as_ref() {
        let result = Snapshot::update_many()
            .col_expr(SnapshotColumn::Status, Expr::value(SnapshotStatus::Superseded))
            .col_expr(SnapshotColumn::ActiveCartItemId, Expr::value(Option::<String>::None))
            .col_expr(SnapshotColumn::SupersededAt, Expr::value(now))
            .filter(SnapshotColumn::Id.eq(active.id))
            .filter(SnapshotColumn::Status.eq(SnapshotStatus::Active))
            .filter(SnapshotColumn::BookingId.is_null())
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(Error::FreezeIntegrity {
                cart_item_id: args.cart_item_id,
                errors: vec!["The active snapshot changed while being superseded".to_string()],
            });
        }
        debug!(snapshot_id = active.id, "Superseded snapshot");
    }

    let used_configs: Vec<_> = configs
        .iter()
        .filter(|c| frozen.iter().any(|s| s.config_id == c.id))
        .cloned()
        .collect();
    let total = pricing::sum_amounts(frozen.iter().map(|s| s.calculated_price_impact));
    let images = image_references(&frozen, &configs);

    let snapshot = personalization_snapshot::ActiveModel {
        cart_item_id: Set(args.cart_item_id.clone()),
        active_cart_item_id: Set(Some(args.cart_item_id.clone())),
        customer_id: Set(args.customer_id),
        listing_id: Set(args.listing_id),
        provider_id: Set(args.provider_id),
        booking_id: Set(None),
        production_order_id: Set(None),
        snapshot_data: Set(FrozenSubmissions(frozen.iter().map(FrozenSubmission::from).collect())),
        config_snapshot: Set(ConfigSnapshot(used_configs)),
        uploaded_images: Set(ImageReferences(images)),
        preview_renders: Set(PreviewRenders(args.preview_renders)),
        total_price_impact: Set(total),
        snapshot_version: Set(previous_version + 1),
        status: Set(SnapshotStatus::Active),
        lock_stage: Set(args.stage),
        finalized_at: Set(now),
        superseded_at: Set(None),
        transferred_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(
        snapshot_id = snapshot.id,
        version = snapshot.snapshot_version,
        locked = to_lock.len(),
        total_price_impact = snapshot.total_price_impact,
        "Created personalization snapshot"
    );
    Ok(snapshot)
}

/// Reports an order link that contradicts the one already on the snapshot.
fn transfer_conflict(
    snapshot: &personalization_snapshot::Model,
    booking_id: &str,
    production_order_id: Option<&str>,
) -> Option<Error> {
    if let Some(existing) = snapshot.booking_id.as_deref().filter(|b| *b != booking_id) {
        return Some(Error::SnapshotAlreadyTransferred {
            cart_item_id: snapshot.cart_item_id.clone(),
            booking_id: existing.to_string(),
        });
    }
    match (snapshot.production_order_id.as_deref(), production_order_id) {
        (Some(existing), Some(requested)) if existing != requested => {
            Some(Error::ProductionOrderConflict {
                cart_item_id: snapshot.cart_item_id.clone(),
                production_order_id: existing.to_string(),
            })
        }
        _ => None,
    }
}

/// Associates a cart item's active snapshot with the resulting order.
///
/// Idempotent: repeating the call with the same booking returns the same
/// snapshot. A production order id may be supplied on a later call if the
/// first one had none.
///
/// # Errors
/// - [`Error::NotFound`] if the cart item has no active snapshot
/// - [`Error::FreezeIntegrity`] if a still-editable submission changed since
///   the snapshot was taken; freeze again first
/// - [`Error::SnapshotAlreadyTransferred`] if it went to a different booking
/// - [`Error::ProductionOrderConflict`] if it names a different production order
#[instrument(skip(db))]
pub async fn transfer_to_order(
    db: &DatabaseConnection,
    cart_item_id: &str,
    booking_id: &str,
    production_order_id: Option<&str>,
) -> Result<personalization_snapshot::Model> {
    if booking_id.trim().is_empty() {
        return Err(Error::invalid("Booking id cannot be empty"));
    }

    let snapshot = get_active_snapshot(db, cart_item_id)
        .await?
        .ok_or_else(|| Error::not_found("Snapshot", cart_item_id))?;
    if let Some(conflict) = transfer_conflict(&snapshot, booking_id, production_order_id) {
        return Err(conflict);
    }

    if snapshot.booking_id.is_none() {
        // The order must receive what the customer currently sees
        let submissions = submission::get_submissions_for_cart_item(db, cart_item_id).await?;
        let errors = diverged_from(&snapshot, &submissions);
        if !errors.is_empty() {
            warn!(count = errors.len(), "Snapshot is stale, refusing transfer");
            return Err(Error::FreezeIntegrity {
                cart_item_id: cart_item_id.to_string(),
                errors,
            });
        }
        let result = Snapshot::update_many()
            .col_expr(SnapshotColumn::BookingId, Expr::value(booking_id))
            .col_expr(SnapshotColumn::TransferredAt, Expr::value(chrono::Utc::now()))
            .filter(SnapshotColumn::Id.eq(snapshot.id))
            .filter(SnapshotColumn::BookingId.is_null())
            .exec(db)
            .await?;
        if result.rows_affected > 0 {
            info!(snapshot_id = snapshot.id, "Transferred snapshot to order");
        }
    }
    if let Some(production_order_id) =
        production_order_id.filter(|_| snapshot.production_order_id.is_none())
    {
        Snapshot::update_many()
            .col_expr(
                SnapshotColumn::ProductionOrderId,
                Expr::value(production_order_id),
            )
            .filter(SnapshotColumn::Id.eq(snapshot.id))
            .filter(SnapshotColumn::BookingId.eq(booking_id))
            .filter(SnapshotColumn::ProductionOrderId.is_null())
            .exec(db)
            .await?;
    }

    // Re-read: a concurrent transfer may have won either write
    let current = Snapshot::find_by_id(snapshot.id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Snapshot", snapshot.id))?;
    if let Some(conflict) = transfer_conflict(&current, booking_id, production_order_id) {
        return Err(conflict);
    }
    Ok(current)
}
