//! Album batching
//!
//! A user dragging several photos into the chat produces near-simultaneous
//! photo events. Photos arriving within the aggregation window of the first
//! one are grouped into one [`AlbumBatch`] so that exactly one remote draft
//! is created for the group. The batch id ties the elapsed-timer event to
//! the batch it was scheduled for; a batch consumed or replaced in the
//! meantime makes the stale timer a no-op.

use crate::event::PhotoPayload;

/// Photos collected for one user action
#[derive(Debug)]
pub struct AlbumBatch {
    id: u64,
    photos: Vec<PhotoPayload>,
}

impl AlbumBatch {
    /// Open a new batch with its first photo
    pub fn new(id: u64, first: PhotoPayload) -> Self {
        Self { id, photos: vec![first] }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn push(&mut self, photo: PhotoPayload) {
        self.photos.push(photo);
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    /// Hand the collected photos to the creation flow
    pub fn into_photos(self) -> Vec<PhotoPayload> {
        self.photos
    }
}
