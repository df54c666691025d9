//! Session actor event loop
//!
//! One task per user. Every event for that user, whether inbound from the
//! platform or generated internally (album timers, flow completions, status
//! ticks), passes through this loop one at a time. Slow remote flows are
//! spawned with a snapshot of their inputs and post their result back into
//! the mailbox tagged with the epoch they started under; a reset in the
//! meantime bumps the epoch and the late result is discarded.

use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

use crate::album::AlbumBatch;
use crate::chat::Choice;
use crate::draft::machine::{self, AfterCategory, AfterShipping, POSTAL_PROMPT, PRICE_PROMPT, TextOutcome};
use crate::draft::{BusyOp, Draft, DraftState};
use crate::event::{InboundEvent, PhotoPayload, UserId};
use crate::market::{DraftFields, MarketError};

use super::Deps;
use super::flows;
use super::handle::Envelope;
use super::messages::{FlowDone, FlowError, FlowOutcome, SessionEvent};
use super::state::Session;

const HELP: &str = "Send photos of the item you want to sell and I'll draft the listing.\n\n\
    /status - where we are\n\
    /category - pick the category again\n\
    /attributes - redo the item details\n\
    /publish - publish the finished listing\n\
    /cancel - drop the current listing";

pub(super) async fn actor_loop(
    mut session: Session,
    deps: Deps,
    mut rx: mpsc::Receiver<Envelope>,
    self_tx: mpsc::Sender<Envelope>,
) {
    debug!(user = %session.user, "session actor started");
    while let Some(envelope) = rx.recv().await {
        handle_event(&mut session, &deps, &self_tx, envelope.event).await;
        if let Some(ack) = envelope.ack {
            let _ = ack.send(());
        }
    }
    debug!(user = %session.user, "session actor stopped");
}

async fn handle_event(session: &mut Session, deps: &Deps, self_tx: &mpsc::Sender<Envelope>, event: SessionEvent) {
    match event {
        SessionEvent::Inbound(inbound) => {
            if !authorized(session, deps) {
                if !session.refusal_sent {
                    session.refusal_sent = true;
                    say(deps, session.user, "Sorry, this bot is private.").await;
                }
                return;
            }
            match inbound {
                InboundEvent::Text { text, reply_to } => handle_text(session, deps, self_tx, &text, reply_to).await,
                InboundEvent::Photo(photo) => handle_photo(session, deps, self_tx, photo).await,
                InboundEvent::Callback { data } => handle_callback(session, deps, self_tx, &data).await,
            }
        }
        SessionEvent::AlbumElapsed { batch } => handle_album_elapsed(session, deps, self_tx, batch).await,
        SessionEvent::StatusTick { epoch } => handle_status_tick(session, deps, self_tx, epoch).await,
        SessionEvent::Flow(done) => apply_flow(session, deps, self_tx, done).await,
        SessionEvent::Inspect(reply) => {
            let _ = reply.send(session.view());
        }
    }
}

fn authorized(session: &Session, deps: &Deps) -> bool {
    let allowed = &deps.config.platform.allowed_users;
    allowed.is_empty() || allowed.contains(&session.user.0)
}

// ---------------------------------------------------------------------------
// Inbound text

async fn handle_text(
    session: &mut Session,
    deps: &Deps,
    self_tx: &mpsc::Sender<Envelope>,
    text: &str,
    reply_to: Option<crate::chat::MessageId>,
) {
    let trimmed = text.trim();
    if let Some(command) = trimmed.strip_prefix('/') {
        let command = command.split_whitespace().next().unwrap_or("");
        match command {
            "start" | "help" => say(deps, session.user, HELP).await,
            "status" => report_status(session, deps).await,
            "cancel" => cancel(session, deps).await,
            "category" => reselect_category(session, deps).await,
            "attributes" => restart_attributes(session, deps).await,
            "publish" => start_publish(session, deps, self_tx).await,
            _ => say(deps, session.user, HELP).await,
        }
        return;
    }

    handle_plain_text(session, deps, trimmed, reply_to).await;
}

async fn handle_plain_text(
    session: &mut Session,
    deps: &Deps,
    text: &str,
    reply_to: Option<crate::chat::MessageId>,
) {
    let user = session.user;
    let Some(draft) = session.draft.as_mut() else {
        if session.creating || session.album.is_some() {
            say(deps, user, "One moment, I'm still setting up your listing.").await;
        } else {
            say(deps, user, "Send photos of the item you want to list.").await;
        }
        return;
    };

    // The publish flow already snapshotted the listing text; an edit now
    // would be confirmed but never reach the published ad
    if draft.busy == Some(BusyOp::Publishing)
        && reply_to.is_some_and(|id| draft.title_msg == Some(id) || draft.description_msg == Some(id))
    {
        say(deps, user, "Publishing is already underway; the current text is what goes out.").await;
        return;
    }

    let busy = draft.busy.is_some();
    let outcome = machine::handle_text(draft, text, reply_to);
    match outcome {
        TextOutcome::TitleEdited => say(deps, user, "Title updated.").await,
        TextOutcome::DescriptionEdited => say(deps, user, "Description updated.").await,
        TextOutcome::AttributeAccepted { done: false } => {
            if let Some(prompt) = session.draft.as_ref().and_then(machine::attribute_prompt) {
                say(deps, user, &prompt).await;
            }
        }
        TextOutcome::AttributeAccepted { done: true } => say(deps, user, PRICE_PROMPT).await,
        TextOutcome::AttributeRejected => {
            let prompt = session
                .draft
                .as_ref()
                .and_then(machine::attribute_prompt)
                .unwrap_or_default();
            say(deps, user, &format!("That's not one of the options. {prompt}")).await;
        }
        TextOutcome::PriceAccepted => ask_shipping(session, deps).await,
        TextOutcome::PriceRejected => {
            say(
                deps,
                user,
                "I couldn't make out a price. Try for example \"50€\", \"99,99€\" or \"annetaan\".",
            )
            .await;
        }
        TextOutcome::PostalAccepted(code) => {
            session.postal_code = Some(code);
            send_summary(session, deps).await;
        }
        TextOutcome::PostalRejected => {
            say(deps, user, "A postal code is five digits, for example 00100.").await;
        }
        TextOutcome::NotHandled => {
            if busy {
                say(deps, user, "Hold on, still working on the previous step.").await;
                return;
            }
            let hint = match session.draft.as_ref().map(|d| d.state) {
                Some(DraftState::AwaitingCategory) => "Pick a category with the buttons, or /cancel.",
                Some(DraftState::AwaitingShipping) => "Use the buttons to choose whether you offer shipping.",
                Some(DraftState::ReadyToPublish) => "Everything is set. /publish to go live, /cancel to drop it.",
                _ => HELP,
            };
            say(deps, user, hint).await;
        }
    }
}

async fn ask_shipping(session: &Session, deps: &Deps) {
    let intro = match session.draft.as_ref() {
        Some(d) if d.price == Some(0) => "Marked as a give-away. Do you offer shipping?",
        _ => "Got it. Do you offer shipping?",
    };
    send_choices(
        deps,
        session.user,
        intro,
        &[Choice::new("Yes", "ship:yes"), Choice::new("No", "ship:no")],
    )
    .await;
}

async fn send_summary(session: &Session, deps: &Deps) {
    let Some(draft) = session.draft.as_ref() else { return };
    let postal = session.postal_code.as_deref().unwrap_or("-");
    let text = format!("Here's your listing:\n\n{}\n\nPublish it?", draft.summary(postal));
    send_choices(
        deps,
        session.user,
        &text,
        &[Choice::new("Publish", "publish"), Choice::new("Cancel", "cancel")],
    )
    .await;
}

async fn report_status(session: &Session, deps: &Deps) {
    let text = if session.creating {
        "Setting up your listing from the photos…".to_string()
    } else if let Some(draft) = session.draft.as_ref() {
        match draft.busy {
            Some(BusyOp::CommittingCategory) => "Checking the category details…".to_string(),
            Some(BusyOp::Publishing) => "Publishing the listing…".to_string(),
            None => format!(
                "Your listing is {} ({} photo(s) attached).",
                draft.state.describe(),
                draft.images.len()
            ),
        }
    } else {
        "No listing in progress. Send photos to start one.".to_string()
    };
    say(deps, session.user, &text).await;
}

async fn cancel(session: &mut Session, deps: &Deps) {
    if session.draft.is_none() && !session.creating && session.album.is_none() {
        say(deps, session.user, "Nothing to cancel.").await;
        return;
    }
    let was_publishing = session
        .draft
        .as_ref()
        .is_some_and(|d| d.busy == Some(BusyOp::Publishing));

    info!(user = %session.user, was_publishing, "session cancelled");
    session.reset();

    if was_publishing {
        say(
            deps,
            session.user,
            "Cancelled here. Publishing was already underway; if the service completed it, the ad is live.",
        )
        .await;
    } else {
        say(deps, session.user, "Listing cancelled. Send photos to start a new one.").await;
    }
}

async fn reselect_category(session: &mut Session, deps: &Deps) {
    let user = session.user;
    let Some(draft) = session.draft.as_mut() else {
        say(deps, user, "No listing in progress.").await;
        return;
    };
    if draft.busy.is_some() {
        say(deps, user, "Hold on, still working on the previous step.").await;
        return;
    }
    draft.rewind_to_category();
    present_candidates(session, deps).await;
}

async fn restart_attributes(session: &mut Session, deps: &Deps) {
    let user = session.user;
    let Some(draft) = session.draft.as_mut() else {
        say(deps, user, "No listing in progress.").await;
        return;
    };
    if draft.busy.is_some() {
        say(deps, user, "Hold on, still working on the previous step.").await;
        return;
    }
    if draft.category.is_none() {
        say(deps, user, "Pick a category first.").await;
        return;
    }
    draft.restart_attributes();
    if draft.required.is_empty() {
        draft.state = DraftState::AwaitingPrice;
        say(deps, user, PRICE_PROMPT).await;
    } else {
        draft.state = DraftState::AwaitingAttribute { index: 0 };
        if let Some(prompt) = session.draft.as_ref().and_then(machine::attribute_prompt) {
            say(deps, user, &prompt).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Photos and album aggregation

async fn handle_photo(session: &mut Session, deps: &Deps, self_tx: &mpsc::Sender<Envelope>, photo: PhotoPayload) {
    // A flow in flight holds the only valid version token; photos wait
    // until it lands and are replayed in order
    if session.creating || session.draft.as_ref().is_some_and(|d| d.busy.is_some()) {
        debug!(user = %session.user, queued = session.pending_photos.len() + 1, "photo queued behind a flow");
        session.pending_photos.push(photo);
        return;
    }

    if session.draft.is_some() {
        let count = {
            // draft is Some, checked above
            let Some(draft) = session.draft.as_mut() else { return };
            append_photo(deps, draft, photo).await
        };
        match count {
            Ok(total) => say(deps, session.user, &format!("Photo added ({total} total).")).await,
            Err(e) => report_append_failure(deps, session.user, &e).await,
        }
        return;
    }

    match session.album.as_mut() {
        Some(batch) => {
            batch.push(photo);
            debug!(user = %session.user, batch = batch.id(), photos = batch.len(), "photo joined album batch");
        }
        None => {
            let id = session.next_batch_id();
            debug!(user = %session.user, batch = id, "album batch opened");
            session.album = Some(AlbumBatch::new(id, photo));
            schedule_album_elapsed(deps, self_tx, id);
        }
    }
}

/// Upload one photo and commit the extended image list. The local list is
/// only updated once the remote accepted the patch.
async fn append_photo(deps: &Deps, draft: &mut Draft, photo: PhotoPayload) -> Result<usize, MarketError> {
    let Some(variant) = photo.largest() else {
        // nothing to upload; not an error worth surfacing
        return Ok(draft.images.len());
    };
    let image = deps.market.upload_image(draft.remote.id(), &variant.data).await?;
    let mut images = draft.images.clone();
    images.push(image);
    draft
        .remote
        .patch(
            &*deps.market,
            &DraftFields {
                images: Some(images.clone()),
                ..Default::default()
            },
        )
        .await?;
    draft.images = images;
    Ok(draft.images.len())
}

async fn report_append_failure(deps: &Deps, user: UserId, error: &MarketError) {
    warn!(user = %user, error = %error, "photo append failed");
    if error.is_conflict() {
        say(deps, user, "The listing changed elsewhere; the photo was not added.").await;
    } else {
        say(deps, user, &format!("Couldn't add the photo: {error}")).await;
    }
}

fn schedule_album_elapsed(deps: &Deps, self_tx: &mpsc::Sender<Envelope>, batch: u64) {
    let window = Duration::from_millis(deps.config.session.album_window_ms);
    let tx = self_tx.clone();
    tokio::spawn(async move {
        sleep(window).await;
        let _ = tx
            .send(Envelope {
                event: SessionEvent::AlbumElapsed { batch },
                ack: None,
            })
            .await;
    });
}

async fn handle_album_elapsed(session: &mut Session, deps: &Deps, self_tx: &mpsc::Sender<Envelope>, batch: u64) {
    if !session.album.as_ref().is_some_and(|a| a.id() == batch) {
        debug!(user = %session.user, batch, "stale album timer ignored");
        return;
    }
    let Some(album) = session.album.take() else { return };
    let photos = album.into_photos();
    session.creating = true;
    info!(user = %session.user, photos = photos.len(), "album window closed, creating draft");
    say(
        deps,
        session.user,
        &format!("Got {} photo(s). Setting up your listing…", photos.len()),
    )
    .await;

    let epoch = session.epoch;
    let market = deps.market.clone();
    let advisory = deps.advisory.clone();
    let tx = self_tx.clone();
    tokio::spawn(async move {
        let outcome = FlowOutcome::DraftCreated(flows::create_draft(market, advisory, photos).await);
        post_flow(tx, epoch, outcome).await;
    });
    schedule_status_tick(deps, self_tx, epoch);
}

// ---------------------------------------------------------------------------
// Callbacks

async fn handle_callback(session: &mut Session, deps: &Deps, self_tx: &mpsc::Sender<Envelope>, data: &str) {
    if let Some(category) = data.strip_prefix("cat:") {
        start_category(session, deps, self_tx, category.to_string()).await;
    } else if let Some(answer) = data.strip_prefix("ship:") {
        apply_shipping(session, deps, answer == "yes").await;
    } else if data == "publish" {
        start_publish(session, deps, self_tx).await;
    } else if data == "cancel" {
        cancel(session, deps).await;
    } else {
        debug!(user = %session.user, data, "unknown callback ignored");
    }
}

async fn start_category(session: &mut Session, deps: &Deps, self_tx: &mpsc::Sender<Envelope>, category: String) {
    let user = session.user;
    let Some(draft) = session.draft.as_mut() else {
        say(deps, user, "No listing in progress.").await;
        return;
    };
    if draft.busy.is_some() {
        say(deps, user, "Hold on, still working on the previous step.").await;
        return;
    }
    // A press on an old keyboard re-selects: anything collected for the
    // previous category no longer applies
    if draft.state != DraftState::AwaitingCategory {
        draft.rewind_to_category();
    }

    let label = draft
        .candidates
        .iter()
        .find(|c| c.id == category)
        .map(|c| c.label.clone())
        .unwrap_or_else(|| category.clone());

    draft.busy = Some(BusyOp::CommittingCategory);
    let remote = draft.remote.clone();
    let title = draft.title.clone();
    let description = draft.description.clone();
    let manual_only = deps.config.advisory.manual_attributes.clone();
    let epoch = session.epoch;

    say(deps, user, &format!("Category: {label}. Checking its details…")).await;

    let market = deps.market.clone();
    let advisory = deps.advisory.clone();
    let tx = self_tx.clone();
    tokio::spawn(async move {
        let outcome = FlowOutcome::CategoryResolved(
            flows::commit_category(market, advisory, remote, category, title, description, manual_only).await,
        );
        post_flow(tx, epoch, outcome).await;
    });
    schedule_status_tick(deps, self_tx, epoch);
}

async fn apply_shipping(session: &mut Session, deps: &Deps, shipping: bool) {
    let postal_on_file = session.postal_code.is_some();
    let after = match session.draft.as_mut() {
        Some(draft) if draft.busy.is_none() && draft.state == DraftState::AwaitingShipping => {
            machine::record_shipping(draft, shipping, postal_on_file)
        }
        _ => {
            debug!(user = %session.user, "stale shipping callback ignored");
            return;
        }
    };
    match after {
        AfterShipping::AskPostalCode => say(deps, session.user, POSTAL_PROMPT).await,
        AfterShipping::Ready => send_summary(session, deps).await,
    }
}

async fn start_publish(session: &mut Session, deps: &Deps, self_tx: &mpsc::Sender<Envelope>) {
    let user = session.user;
    let postal = session.postal_code.clone();
    let Some(draft) = session.draft.as_mut() else {
        say(deps, user, "Nothing to publish. Send photos to start a listing.").await;
        return;
    };
    if draft.busy.is_some() {
        say(deps, user, "Hold on, still working on the previous step.").await;
        return;
    }
    if draft.state != DraftState::ReadyToPublish {
        say(deps, user, &format!("Not ready yet: {}.", draft.state.describe())).await;
        return;
    }
    let Some(postal) = postal else {
        draft.state = DraftState::AwaitingPostalCode;
        say(deps, user, POSTAL_PROMPT).await;
        return;
    };

    draft.busy = Some(BusyOp::Publishing);
    let listing = machine::build_listing(draft, &postal);
    let shipping = draft.shipping.unwrap_or(false);
    let remote = draft.remote.clone();
    let epoch = session.epoch;

    say(deps, user, "Publishing…").await;

    let market = deps.market.clone();
    let tx = self_tx.clone();
    tokio::spawn(async move {
        let outcome = FlowOutcome::PublishDone(flows::publish(market, remote, listing, shipping).await);
        post_flow(tx, epoch, outcome).await;
    });
    schedule_status_tick(deps, self_tx, epoch);
}

// ---------------------------------------------------------------------------
// Flow completions

async fn post_flow(tx: mpsc::Sender<Envelope>, epoch: u64, outcome: FlowOutcome) {
    let _ = tx
        .send(Envelope {
            event: SessionEvent::Flow(FlowDone { epoch, outcome }),
            ack: None,
        })
        .await;
}

async fn apply_flow(session: &mut Session, deps: &Deps, self_tx: &mpsc::Sender<Envelope>, done: FlowDone) {
    if done.epoch != session.epoch {
        // The session was reset while this flow ran; its result must not
        // resurrect state the user already dropped
        debug!(user = %session.user, flow_epoch = done.epoch, epoch = session.epoch, "stale flow result discarded");
        return;
    }

    match done.outcome {
        FlowOutcome::DraftCreated(Ok(bundle)) => {
            session.creating = false;
            let user = session.user;
            let mut draft = Draft::new(bundle.remote, bundle.title, bundle.description);
            draft.images = bundle.images;
            draft.candidates = bundle.candidates;
            debug!(user = %user, draft = %draft.remote.id(), "draft installed");

            match deps.chat.send_text(user, &draft.title).await {
                Ok(id) => draft.title_msg = Some(id),
                Err(e) => warn!(user = %user, error = %e, "title breadcrumb failed"),
            }
            match deps.chat.send_text(user, &draft.description).await {
                Ok(id) => draft.description_msg = Some(id),
                Err(e) => warn!(user = %user, error = %e, "description breadcrumb failed"),
            }
            say(deps, user, "Reply to either message above to edit it.").await;

            session.draft = Some(draft);
            replay_pending(session, deps).await;

            match bundle.advisor_pick {
                Some(pick) => start_category(session, deps, self_tx, pick).await,
                None => present_candidates(session, deps).await,
            }
        }
        FlowOutcome::DraftCreated(Err(e)) => {
            session.creating = false;
            session.pending_photos.clear();
            warn!(user = %session.user, error = %e, "draft creation failed");
            say(
                deps,
                session.user,
                &format!("Couldn't set up the listing: {e}. Send the photos again to retry."),
            )
            .await;
        }
        FlowOutcome::CategoryResolved(Ok(outcome)) => {
            let after = {
                let Some(draft) = session.draft.as_mut() else { return };
                draft.busy = None;
                machine::apply_category_outcome(draft, outcome)
            };
            replay_pending(session, deps).await;
            match after {
                AfterCategory::AskAttribute => {
                    if let Some(prompt) = session.draft.as_ref().and_then(machine::attribute_prompt) {
                        say(deps, session.user, &prompt).await;
                    }
                }
                AfterCategory::AskPrice => say(deps, session.user, PRICE_PROMPT).await,
            }
        }
        FlowOutcome::CategoryResolved(Err(failure)) => {
            {
                let Some(draft) = session.draft.as_mut() else { return };
                draft.busy = None;
                // The category patch may have landed before the failure;
                // keep tracking whatever version the flow reached
                draft.remote = failure.remote;
                draft.rewind_to_category();
            }
            let e = failure.error;
            warn!(user = %session.user, error = %e, "category commit failed");
            let text = if is_conflict(&e) {
                "The listing changed elsewhere while setting the category. Pick one again.".to_string()
            } else {
                format!("Couldn't set the category: {e}. Pick one again.")
            };
            say(deps, session.user, &text).await;
            replay_pending(session, deps).await;
            present_candidates(session, deps).await;
        }
        FlowOutcome::PublishDone(Ok(outcome)) => {
            info!(user = %session.user, order = %outcome.order_id, "listing published");
            say(
                deps,
                session.user,
                &format!("Published! Confirmation {}.", outcome.order_id),
            )
            .await;
            session.draft = None;

            // Photos that arrived mid-publish start the next listing
            if !session.pending_photos.is_empty() {
                let mut photos = std::mem::take(&mut session.pending_photos);
                let first = photos.remove(0);
                let id = session.next_batch_id();
                let mut album = AlbumBatch::new(id, first);
                for photo in photos {
                    album.push(photo);
                }
                session.album = Some(album);
                schedule_album_elapsed(deps, self_tx, id);
            }
        }
        FlowOutcome::PublishDone(Err(failure)) => {
            {
                let Some(draft) = session.draft.as_mut() else { return };
                draft.busy = None;
                // The final update may have landed even though publishing
                // failed; a retry must present the advanced token
                draft.remote = failure.remote;
            }
            let e = failure.error;
            warn!(user = %session.user, error = %e, "publish failed");
            let text = if is_conflict(&e) {
                "The listing changed while publishing, so nothing went out. /publish to try again.".to_string()
            } else {
                format!("Publishing failed: {e}. /publish to try again.")
            };
            say(deps, session.user, &text).await;
            replay_pending(session, deps).await;
        }
    }
}

fn is_conflict(error: &FlowError) -> bool {
    matches!(error, FlowError::Market(m) if m.is_conflict())
}

/// Attach photos that queued up behind a flow, in arrival order
async fn replay_pending(session: &mut Session, deps: &Deps) {
    if session.pending_photos.is_empty() {
        return;
    }
    let photos = std::mem::take(&mut session.pending_photos);
    let user = session.user;
    let Some(draft) = session.draft.as_mut() else { return };

    let mut added = 0usize;
    for photo in photos {
        match append_photo(deps, draft, photo).await {
            Ok(_) => added += 1,
            Err(e) => {
                report_append_failure(deps, user, &e).await;
                break;
            }
        }
    }
    if added > 0 {
        debug!(user = %user, added, "queued photos attached");
        say(deps, user, &format!("Added {added} queued photo(s).")).await;
    }
}

async fn present_candidates(session: &Session, deps: &Deps) {
    let Some(draft) = session.draft.as_ref() else { return };
    if draft.candidates.is_empty() {
        say(
            deps,
            session.user,
            "The service offered no category suggestions. /cancel and try clearer photos.",
        )
        .await;
        return;
    }
    let choices: Vec<Choice> = draft
        .candidates
        .iter()
        .map(|c| Choice::new(&c.label, format!("cat:{}", c.id)))
        .collect();
    send_choices(deps, session.user, "Which category fits best?", &choices).await;
}

// ---------------------------------------------------------------------------
// Outbound helpers; chat failures are logged, never fatal

async fn say(deps: &Deps, user: UserId, text: &str) {
    if let Err(e) = deps.chat.send_text(user, text).await {
        warn!(user = %user, error = %e, "chat send failed");
    }
}

async fn send_choices(deps: &Deps, user: UserId, text: &str, choices: &[Choice]) {
    if let Err(e) = deps.chat.send_choices(user, text, choices).await {
        warn!(user = %user, error = %e, "chat send failed");
    }
}

fn schedule_status_tick(deps: &Deps, self_tx: &mpsc::Sender<Envelope>, epoch: u64) {
    let delay = Duration::from_millis(deps.config.session.status_tick_ms);
    let tx = self_tx.clone();
    tokio::spawn(async move {
        sleep(delay).await;
        let _ = tx
            .send(Envelope {
                event: SessionEvent::StatusTick { epoch },
                ack: None,
            })
            .await;
    });
}

/// While a flow is in flight the user sees a typing indicator every tick;
/// the tick re-arms itself and dies off once nothing is running
async fn handle_status_tick(session: &Session, deps: &Deps, self_tx: &mpsc::Sender<Envelope>, epoch: u64) {
    if epoch != session.epoch {
        return;
    }
    let busy = session.creating || session.draft.as_ref().is_some_and(|d| d.busy.is_some());
    if !busy {
        return;
    }
    if let Err(e) = deps.chat.send_status(session.user).await {
        warn!(user = %session.user, error = %e, "status signal failed");
    }
    schedule_status_tick(deps, self_tx, epoch);
}
