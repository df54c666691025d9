//! Kirppu - chat bot that drafts marketplace listings from photos
//!
//! A user sends photos of an item; the bot creates a draft listing on the
//! marketplace, fills in what a vision model can tell, and walks the user
//! through category, attributes, price and shipping until the listing is
//! published.
//!
//! # Core Concepts
//!
//! - **One actor per user**: every event for a user flows through a single
//!   mailbox and is processed strictly in order; there is no shared lock
//! - **Optimistic concurrency**: each marketplace mutation presents the
//!   last-seen version token and stores the fresh one; a stale token is a
//!   conflict surfaced to the user, never retried silently
//! - **Epoch-tagged flows**: slow remote work runs in spawned tasks that
//!   post results back into the mailbox; a cancel bumps the session epoch
//!   and late results are discarded
//! - **Advisory, not authoritative**: the vision/LLM collaborator only
//!   proposes; every failure degrades to asking the user
//!
//! # Modules
//!
//! - [`session`] - per-user actor, flows and state
//! - [`draft`] - draft model, state machine and input grammars
//! - [`market`] - marketplace ad service client and version tokens
//! - [`advisory`] - vision/LLM advisor
//! - [`platform`] - chat platform adapter
//! - [`dispatch`] - inbound event routing
//! - [`config`] - configuration types and loading

pub mod advisory;
pub mod album;
pub mod chat;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod draft;
pub mod event;
pub mod market;
pub mod platform;
pub mod session;

// Re-export commonly used types
pub use advisory::{AdvisoryError, AdvisoryService, ItemAnalysis, LlmAdvisor, StubAdvisor};
pub use chat::{ChatError, ChatPort, Choice, MessageId};
pub use config::Config;
pub use dispatch::Dispatcher;
pub use draft::{Draft, DraftState, PriceInput, parse_postal_code, parse_price};
pub use event::{InboundEvent, PhotoPayload, PhotoVariant, UserId};
pub use market::{AdService, InMemoryMarket, MarketClient, MarketError, Versioned};
pub use platform::Telegram;
pub use session::{Deps, SessionHandle, SessionView};
