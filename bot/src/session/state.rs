//! Session-owned state
//!
//! Everything here is mutated only from inside the session actor's event
//! loop; the actor itself is the serialization boundary, so no field needs
//! its own lock. The creation-in-progress marker and the epoch are plain
//! fields for the same reason.

use crate::album::AlbumBatch;
use crate::draft::Draft;
use crate::event::{PhotoPayload, UserId};
use crate::session::messages::SessionView;

/// All mutable state for one user
pub struct Session {
    pub user: UserId,

    /// Bumped on every reset; flow results carrying an older epoch are
    /// discarded instead of resurrecting state the user already dropped
    pub epoch: u64,

    /// At most one draft per session
    pub draft: Option<Draft>,

    /// Open album batch, if a photo burst is being aggregated
    pub album: Option<AlbumBatch>,
    next_batch_id: u64,

    /// Draft creation flow in flight; photos arriving now are queued
    pub creating: bool,

    /// Photos queued while creation or another draft flow is in flight,
    /// replayed against the draft when the flow completes
    pub pending_photos: Vec<PhotoPayload>,

    /// Postal code remembered from a previous draft in this session
    pub postal_code: Option<String>,

    /// The unauthorized notice has been sent; don't repeat it per event
    pub refusal_sent: bool,
}

impl Session {
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            epoch: 0,
            draft: None,
            album: None,
            next_batch_id: 0,
            creating: false,
            pending_photos: Vec::new(),
            postal_code: None,
            refusal_sent: false,
        }
    }

    /// Allocate an id for a new album batch
    pub fn next_batch_id(&mut self) -> u64 {
        self.next_batch_id += 1;
        self.next_batch_id
    }

    /// Drop the draft and all in-progress work; the postal code survives.
    /// Bumping the epoch invalidates every in-flight flow and timer.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.draft = None;
        self.album = None;
        self.creating = false;
        self.pending_photos.clear();
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            has_draft: self.draft.is_some(),
            state: self.draft.as_ref().map(|d| d.state),
            busy: self.draft.as_ref().and_then(|d| d.busy),
            creating: self.creating,
            image_count: self.draft.as_ref().map(|d| d.images.len()).unwrap_or(0),
            pending_photos: self.pending_photos.len(),
            album_photos: self.album.as_ref().map(|a| a.len()).unwrap_or(0),
            version_token: self.draft.as_ref().map(|d| d.remote.token().0.clone()),
            epoch: self.epoch,
        }
    }
}
