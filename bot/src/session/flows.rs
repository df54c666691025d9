//! Spawned remote flows
//!
//! The slow multi-call conversations with the ad service and the advisory
//! service. Each flow takes a snapshot of its inputs (including the version
//! token via [`Versioned`]), performs its remote calls without touching any
//! session state, and returns an outcome that the actor applies only after
//! re-checking the session epoch. None of these retry on failure.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::advisory::AdvisoryService;
use crate::event::PhotoPayload;
use crate::market::{AdService, AttributeSpec, DeliveryOptions, DraftFields, ListingPayload, Versioned};

use super::messages::{CategoryOutcome, CreatedBundle, FlowError, FlowFailure, PublishOutcome};

/// Analyze the first photo, create the remote draft, upload the batch and
/// commit the seeded fields. Exactly one `create_draft` call per batch.
///
/// An analysis failure aborts before anything is created, so no draft is
/// left half-made; a failure after creation leaves an orphan remote draft,
/// which the ad service garbage-collects and we only report.
pub async fn create_draft(
    market: Arc<dyn AdService>,
    advisory: Arc<dyn AdvisoryService>,
    photos: Vec<PhotoPayload>,
) -> Result<CreatedBundle, FlowError> {
    let first = photos
        .first()
        .and_then(|p| p.largest())
        .ok_or_else(|| FlowError::Other("photo carried no usable image data".to_string()))?;

    let analysis = advisory.analyze_image(&first.data, &first.mime).await?;

    let caption = photos.first().and_then(|p| p.caption.clone());
    let title = analysis.title;
    let description = match caption {
        Some(caption) if !caption.trim().is_empty() => format!("{}\n\n{}", caption.trim(), analysis.description),
        _ => analysis.description,
    };

    let created = market.create_draft().await?;
    let mut remote = Versioned::new(created.id, created.token);
    debug!(draft = %remote.id(), photos = photos.len(), "create_draft: remote draft created");

    let mut images = Vec::with_capacity(photos.len());
    for photo in &photos {
        if let Some(variant) = photo.largest() {
            images.push(market.upload_image(remote.id(), &variant.data).await?);
        }
    }

    remote
        .patch(
            &*market,
            &DraftFields {
                title: Some(title.clone()),
                description: Some(description.clone()),
                images: Some(images.clone()),
                ..Default::default()
            },
        )
        .await?;

    let candidates = market.category_predictions(remote.id()).await?;

    // Opportunistic: a failed or unconfident pick degrades to the manual list
    let advisor_pick = match advisory.select_category(&title, &description, &candidates).await {
        Ok(pick) => pick,
        Err(e) => {
            warn!(error = %e, "create_draft: category advice failed, falling back to manual selection");
            None
        }
    };

    Ok(CreatedBundle {
        remote,
        title,
        description,
        images,
        candidates,
        advisor_pick,
    })
}

/// Commit the chosen category, fetch its attributes and let the advisor
/// resolve the ones it may. Attributes named in `manual_only` are never
/// offered to the advisor. A failure after the category patch landed still
/// returns the advanced token via [`FlowFailure`].
pub async fn commit_category(
    market: Arc<dyn AdService>,
    advisory: Arc<dyn AdvisoryService>,
    mut remote: Versioned,
    category: String,
    title: String,
    description: String,
    manual_only: Vec<String>,
) -> Result<CategoryOutcome, FlowFailure> {
    if let Err(e) = remote
        .patch(
            &*market,
            &DraftFields {
                category: Some(category.clone()),
                ..Default::default()
            },
        )
        .await
    {
        return Err(FlowFailure::new(remote, e));
    }

    let bundle = match market.attributes(remote.id()).await {
        Ok(bundle) => bundle,
        Err(e) => return Err(FlowFailure::new(remote, e)),
    };
    let catalog = bundle.attributes;

    let askable: Vec<AttributeSpec> = catalog
        .iter()
        .filter(|a| !manual_only.contains(&a.name))
        .cloned()
        .collect();

    let prefilled = match advisory.select_attributes(&title, &description, &askable).await {
        Ok(values) => values,
        Err(e) => {
            warn!(error = %e, "commit_category: attribute advice failed, asking the user for everything");
            Default::default()
        }
    };

    // Whatever the advisor left open is asked in catalog order
    let required: Vec<AttributeSpec> = catalog
        .iter()
        .filter(|a| !prefilled.contains_key(&a.name))
        .cloned()
        .collect();

    debug!(
        category = %category,
        total = catalog.len(),
        prefilled = prefilled.len(),
        required = required.len(),
        "commit_category: attributes resolved"
    );

    Ok(CategoryOutcome {
        remote,
        category,
        catalog,
        required,
        prefilled,
    })
}

/// Final update, delivery options, publish. The token advances once (the
/// full update); `set_delivery_options` and `publish` key on the draft id.
/// A failure after the update landed still returns the advanced token via
/// [`FlowFailure`], so a retried publish presents the current one.
pub async fn publish(
    market: Arc<dyn AdService>,
    mut remote: Versioned,
    listing: ListingPayload,
    shipping: bool,
) -> Result<PublishOutcome, FlowFailure> {
    if let Err(e) = remote.update(&*market, &listing).await {
        return Err(FlowFailure::new(remote, e));
    }

    if let Err(e) = market
        .set_delivery_options(remote.id(), &DeliveryOptions { shipping })
        .await
    {
        return Err(FlowFailure::new(remote, e));
    }

    let order_id = match market.publish(remote.id()).await {
        Ok(order_id) => order_id,
        Err(e) => return Err(FlowFailure::new(remote, e)),
    };
    debug!(draft = %remote.id(), %order_id, "publish: listing published");

    Ok(PublishOutcome { remote, order_id })
}
