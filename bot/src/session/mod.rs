//! Per-user session actors
//!
//! Each user gets one actor task owning all of that user's mutable state.
//! Events for one user are processed strictly one at a time in arrival
//! order; slow remote flows run as spawned tasks that post their result
//! back into the same mailbox, tagged with the session epoch they were
//! started under so results that outlived a cancel are discarded.

use std::sync::Arc;

mod actor;
mod flows;
mod handle;
mod messages;
mod state;

pub use handle::SessionHandle;
pub use messages::{CategoryOutcome, FlowError, SessionEvent, SessionView};
pub use state::Session;

use crate::advisory::AdvisoryService;
use crate::chat::ChatPort;
use crate::config::Config;
use crate::market::AdService;

/// Shared collaborators handed to every session actor
#[derive(Clone)]
pub struct Deps {
    pub market: Arc<dyn AdService>,
    pub advisory: Arc<dyn AdvisoryService>,
    pub chat: Arc<dyn ChatPort>,
    pub config: Arc<Config>,
}
