//! Session mailbox message types

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::advisory::AdvisoryError;
use crate::draft::{BusyOp, DraftState};
use crate::event::InboundEvent;
use crate::market::{AttributeSpec, CategoryCandidate, ImageRef, MarketError, Versioned};

/// Everything a session actor can find in its mailbox
#[derive(Debug)]
pub enum SessionEvent {
    /// Event delivered by the chat platform
    Inbound(InboundEvent),
    /// The aggregation window of an album batch elapsed
    AlbumElapsed { batch: u64 },
    /// Periodic nudge while a long remote flow is in flight
    StatusTick { epoch: u64 },
    /// A spawned remote flow finished
    Flow(FlowDone),
    /// State snapshot request (tests and `/status`)
    Inspect(oneshot::Sender<SessionView>),
}

/// Result of a spawned remote flow, tagged with the epoch it started under
#[derive(Debug)]
pub struct FlowDone {
    pub epoch: u64,
    pub outcome: FlowOutcome,
}

#[derive(Debug)]
pub enum FlowOutcome {
    DraftCreated(Result<CreatedBundle, FlowError>),
    CategoryResolved(Result<CategoryOutcome, FlowFailure>),
    PublishDone(Result<PublishOutcome, FlowFailure>),
}

/// Failure of a flow operating on an existing draft. Calls completing
/// before the failure may have advanced the version token, so the failure
/// carries the [`Versioned`] as far as the flow got; the actor adopts it
/// before reporting the error, keeping later mutations off stale tokens.
#[derive(Debug)]
pub struct FlowFailure {
    pub remote: Versioned,
    pub error: FlowError,
}

impl FlowFailure {
    pub fn new(remote: Versioned, error: impl Into<FlowError>) -> Self {
        Self {
            remote,
            error: error.into(),
        }
    }
}

/// Everything the draft-creation flow produced
#[derive(Debug)]
pub struct CreatedBundle {
    pub remote: Versioned,
    pub title: String,
    pub description: String,
    pub images: Vec<ImageRef>,
    pub candidates: Vec<CategoryCandidate>,
    /// Category the advisor confidently pre-selected, if any
    pub advisor_pick: Option<String>,
}

/// Result of committing a category and resolving its attributes
#[derive(Debug)]
pub struct CategoryOutcome {
    /// Token advanced by the category patch
    pub remote: Versioned,
    pub category: String,
    /// Every attribute the category defines, in service order
    pub catalog: Vec<AttributeSpec>,
    /// The subset still requiring user input
    pub required: Vec<AttributeSpec>,
    /// Values the advisor resolved, name -> option id
    pub prefilled: HashMap<String, String>,
}

#[derive(Debug)]
pub struct PublishOutcome {
    pub remote: Versioned,
    pub order_id: String,
}

/// Failure of a remote flow, reported to the user verbatim
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("advisory service: {0}")]
    Advisory(#[from] AdvisoryError),

    #[error("ad service: {0}")]
    Market(#[from] MarketError),

    #[error("{0}")]
    Other(String),
}

/// Snapshot of a session's observable state
#[derive(Debug, Clone)]
pub struct SessionView {
    pub has_draft: bool,
    pub state: Option<DraftState>,
    pub busy: Option<BusyOp>,
    pub creating: bool,
    pub image_count: usize,
    pub pending_photos: usize,
    pub album_photos: usize,
    pub version_token: Option<String>,
    pub epoch: u64,
}
