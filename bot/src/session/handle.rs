//! SessionHandle - Client interface to a session actor

use eyre::{Result, eyre};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::event::{InboundEvent, UserId};

use super::actor;
use super::messages::{SessionEvent, SessionView};
use super::state::Session;
use super::Deps;

/// An event plus an optional completion signal, fired once the actor has
/// fully processed it
pub(super) struct Envelope {
    pub event: SessionEvent,
    pub ack: Option<oneshot::Sender<()>>,
}

/// Handle to one user's session actor
///
/// Cloneable; the dispatcher keeps one per user and the platform poller
/// submits through it. Dropping every handle does not stop the actor, it
/// also holds a sender for its own timers and flow results.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Envelope>,
    user: UserId,
}

impl SessionHandle {
    /// Spawn the actor task for `user` and return its handle
    pub fn spawn(user: UserId, deps: Deps) -> Self {
        debug!(user = user.0, "SessionHandle::spawn: called");
        let (tx, rx) = mpsc::channel(deps.config.session.mailbox_capacity);
        let session = Session::new(user);
        tokio::spawn(actor::actor_loop(session, deps, rx, tx.clone()));
        Self { tx, user }
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    /// Queue an inbound platform event
    pub async fn submit(&self, event: InboundEvent) -> Result<()> {
        debug!(user = self.user.0, "SessionHandle::submit: called");
        self.tx
            .send(Envelope {
                event: SessionEvent::Inbound(event),
                ack: None,
            })
            .await
            .map_err(|_| eyre!("session actor gone"))
    }

    /// Queue an inbound event and wait until the actor has processed it
    pub async fn submit_and_wait(&self, event: InboundEvent) -> Result<()> {
        debug!(user = self.user.0, "SessionHandle::submit_and_wait: called");
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                event: SessionEvent::Inbound(event),
                ack: Some(ack_tx),
            })
            .await
            .map_err(|_| eyre!("session actor gone"))?;
        ack_rx.await.map_err(|_| eyre!("session actor gone"))
    }

    /// Snapshot the session's observable state
    pub async fn inspect(&self) -> Result<SessionView> {
        debug!(user = self.user.0, "SessionHandle::inspect: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                event: SessionEvent::Inspect(reply_tx),
                ack: None,
            })
            .await
            .map_err(|_| eyre!("session actor gone"))?;
        reply_rx.await.map_err(|_| eyre!("session actor gone"))
    }
}
