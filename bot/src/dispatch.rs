//! Per-user event routing
//!
//! The platform poller funnels every inbound event through the dispatcher,
//! which owns one [`SessionHandle`] per user and creates actors lazily on
//! first contact. Sessions are never evicted; the working set is one actor
//! per user the bot has ever heard from in this process.

use std::collections::HashMap;

use eyre::Result;
use tokio::sync::Mutex;
use tracing::debug;

use crate::event::{InboundEvent, UserId};
use crate::session::{Deps, SessionHandle};

pub struct Dispatcher {
    deps: Deps,
    sessions: Mutex<HashMap<UserId, SessionHandle>>,
}

impl Dispatcher {
    pub fn new(deps: Deps) -> Self {
        Self {
            deps,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Deliver one inbound event to its user's session actor
    pub async fn route(&self, user: UserId, event: InboundEvent) -> Result<()> {
        self.session(user).await.submit(event).await
    }

    /// The handle for `user`, spawning the actor on first contact
    pub async fn session(&self, user: UserId) -> SessionHandle {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(user)
            .or_insert_with(|| {
                debug!(%user, "Dispatcher::session: spawning actor");
                SessionHandle::spawn(user, self.deps.clone())
            })
            .clone()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::advisory::StubAdvisor;
    use crate::chat::tests::NullChat;
    use crate::config::Config;
    use crate::market::InMemoryMarket;

    fn deps() -> Deps {
        Deps {
            market: Arc::new(InMemoryMarket::new()),
            advisory: Arc::new(StubAdvisor::new()),
            chat: Arc::new(NullChat),
            config: Arc::new(Config::default()),
        }
    }

    #[tokio::test]
    async fn test_one_actor_per_user() {
        let dispatcher = Dispatcher::new(deps());

        dispatcher
            .route(UserId(1), InboundEvent::Text { text: "/status".into(), reply_to: None })
            .await
            .unwrap();
        dispatcher
            .route(UserId(1), InboundEvent::Text { text: "/status".into(), reply_to: None })
            .await
            .unwrap();
        dispatcher
            .route(UserId(2), InboundEvent::Text { text: "/status".into(), reply_to: None })
            .await
            .unwrap();

        assert_eq!(dispatcher.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let dispatcher = Dispatcher::new(deps());
        let a = dispatcher.session(UserId(1)).await;
        let b = dispatcher.session(UserId(2)).await;

        let view_a = a.inspect().await.unwrap();
        let view_b = b.inspect().await.unwrap();
        assert!(!view_a.has_draft);
        assert!(!view_b.has_draft);
    }
}
