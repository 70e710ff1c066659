//! Reusable setups - named bundles of past personalization a buyer can replay.
//!
//! A setup stores copies of frozen payloads, never submission ids, so editing
//! or re-freezing the source has no effect on it, and every apply produces
//! brand-new submissions.

use crate::{
    core::{snapshot, submission},
    entities::{
        ReusableSetup, ReusableSetupColumn, Snapshot, personalization_reusable_setup,
        personalization_submission,
    },
    errors::{Error, Result},
    models::{SetupItem, SetupItems},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, instrument};

/// What to save and where to copy it from.
///
/// One of `source_snapshot_id` or `source_booking_id` is required; the
/// snapshot id wins when both are given.
#[derive(Debug, Clone)]
pub struct SaveSetupArgs {
    pub customer_id: String,
    pub listing_id: String,
    pub name: String,
    pub source_snapshot_id: Option<i64>,
    pub source_booking_id: Option<String>,
}

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid("Setup name cannot be empty"));
    }
    Ok(name.to_string())
}

/// Loads a setup, treating other customers' setups as missing.
async fn get_owned_setup<C>(
    db: &C,
    setup_id: i64,
    customer_id: &str,
) -> Result<personalization_reusable_setup::Model>
where
    C: ConnectionTrait,
{
    ReusableSetup::find_by_id(setup_id)
        .one(db)
        .await?
        .filter(|s| s.customer_id == customer_id)
        .ok_or_else(|| Error::not_found("ReusableSetup", setup_id))
}

/// Saves the content of a frozen snapshot as a named setup.
///
/// # Errors
/// - [`Error::NotFound`] if the source snapshot does not exist or belongs to
///   another customer
/// - [`Error::InvalidInput`] for a blank name, no source, or a source from
///   another listing
pub async fn save_setup(
    db: &DatabaseConnection,
    args: SaveSetupArgs,
) -> Result<personalization_reusable_setup::Model> {
    let name = clean_name(&args.name)?;

    let source = match (args.source_snapshot_id, args.source_booking_id.as_deref()) {
        (Some(snapshot_id), _) => Snapshot::find_by_id(snapshot_id)
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("Snapshot", snapshot_id))?,
        (None, Some(booking_id)) => snapshot::get_snapshot_for_booking(db, booking_id)
            .await?
            .ok_or_else(|| Error::not_found("Snapshot", booking_id))?,
        (None, None) => {
            return Err(Error::invalid(
                "A setup needs a source snapshot or booking",
            ));
        }
    };

    if source.customer_id != args.customer_id {
        return Err(Error::not_found("Snapshot", source.id));
    }
    if source.listing_id != args.listing_id {
        return Err(Error::invalid(format!(
            "Snapshot {} is for a different listing",
            source.id
        )));
    }

    let items: Vec<SetupItem> = source
        .snapshot_data
        .0
        .iter()
        .map(|frozen| SetupItem {
            config_id: frozen.config_id,
            payload: frozen.payload.clone(),
        })
        .collect();

    let now = chrono::Utc::now();
    let setup = personalization_reusable_setup::ActiveModel {
        customer_id: Set(args.customer_id),
        listing_id: Set(args.listing_id),
        name: Set(name),
        source_snapshot_id: Set(Some(source.id)),
        source_booking_id: Set(source.booking_id.clone().or(args.source_booking_id)),
        setup_data: Set(SetupItems(items)),
        use_count: Set(0),
        last_used_at: Set(None),
        is_favorite: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        setup_id = setup.id,
        snapshot_id = source.id,
        items = setup.setup_data.0.len(),
        "Saved reusable setup"
    );
    Ok(setup)
}

/// Replays a setup onto a new cart item as fresh submissions.
///
/// Each item becomes a new submission linked to `cart_item_id`, validated
/// and priced against the listing's current configs. Items whose config was
/// disabled or removed are still created and come back invalid, so the
/// buyer can correct them.
///
/// # Errors
/// - [`Error::NotFound`] if the setup does not exist or is someone else's
/// - [`Error::InvalidInput`] if the cart item already has personalization
/// - [`Error::SnapshotAlreadyTransferred`] if the cart item was already ordered
#[instrument(skip(db))]
pub async fn apply_setup(
    db: &DatabaseConnection,
    setup_id: i64,
    cart_item_id: &str,
    customer_id: &str,
    listing_id: &str,
    base_price: Option<f64>,
) -> Result<Vec<personalization_submission::Model>> {
    if cart_item_id.trim().is_empty() {
        return Err(Error::invalid("Cart item id cannot be empty"));
    }

    let txn = db.begin().await?;
    let setup = get_owned_setup(&txn, setup_id, customer_id).await?;
    submission::ensure_cart_item_open(&txn, cart_item_id).await?;
    if !submission::get_submissions_for_cart_item(&txn, cart_item_id)
        .await?
        .is_empty()
    {
        return Err(Error::invalid(format!(
            "Cart item {cart_item_id} already has personalization"
        )));
    }

    let mut created = Vec::with_capacity(setup.setup_data.0.len());
    for item in &setup.setup_data.0 {
        let new = submission::NewSubmission {
            cart_item_id: Some(cart_item_id.to_string()),
            ..submission::NewSubmission::new(item.config_id, item.payload.clone())
        };
        created
            .push(submission::insert_submission(&txn, customer_id, listing_id, new, base_price).await?);
    }

    let now = chrono::Utc::now();
    ReusableSetup::update_many()
        .col_expr(
            ReusableSetupColumn::UseCount,
            Expr::col(ReusableSetupColumn::UseCount).add(1),
        )
        .col_expr(ReusableSetupColumn::LastUsedAt, Expr::value(now))
        .col_expr(ReusableSetupColumn::UpdatedAt, Expr::value(now))
        .filter(ReusableSetupColumn::Id.eq(setup_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    info!(
        created = created.len(),
        "Applied reusable setup to cart item"
    );
    Ok(created)
}

/// A customer's setups, favorites first, then most recently used.
pub async fn list_setups(
    db: &DatabaseConnection,
    customer_id: &str,
    listing_id: Option<&str>,
) -> Result<Vec<personalization_reusable_setup::Model>> {
    let mut query = ReusableSetup::find().filter(ReusableSetupColumn::CustomerId.eq(customer_id));
    if let Some(listing_id) = listing_id {
        query = query.filter(ReusableSetupColumn::ListingId.eq(listing_id));
    }
    query
        .order_by_desc(ReusableSetupColumn::IsFavorite)
        .order_by_desc(ReusableSetupColumn::LastUsedAt)
        .order_by_desc(ReusableSetupColumn::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Pins or unpins a setup.
pub async fn set_favorite(
    db: &DatabaseConnection,
    setup_id: i64,
    customer_id: &str,
    is_favorite: bool,
) -> Result<personalization_reusable_setup::Model> {
    let mut setup: personalization_reusable_setup::ActiveModel =
        get_owned_setup(db, setup_id, customer_id).await?.into();
    setup.is_favorite = Set(is_favorite);
    setup.updated_at = Set(chrono::Utc::now());
    setup.update(db).await.map_err(Into::into)
}

/// Renames a setup.
pub async fn rename_setup(
    db: &DatabaseConnection,
    setup_id: i64,
    customer_id: &str,
    name: &str,
) -> Result<personalization_reusable_setup::Model> {
    let name = clean_name(name)?;
    let mut setup: personalization_reusable_setup::ActiveModel =
        get_owned_setup(db, setup_id, customer_id).await?.into();
    setup.name = Set(name);
    setup.updated_at = Set(chrono::Utc::now());
    setup.update(db).await.map_err(Into::into)
}

/// Deletes a setup at the buyer's request.
pub async fn delete_setup(db: &DatabaseConnection, setup_id: i64, customer_id: &str) -> Result<()> {
    let setup = get_owned_setup(db, setup_id, customer_id).await?;
    ReusableSetup::delete_by_id(setup.id).exec(db).await?;
    info!(setup_id, "Deleted reusable setup");
    Ok(())
}
