//! Chat platform adapters
//!
//! Inbound updates become [`crate::event::InboundEvent`]s before anything
//! else sees them; outbound traffic goes through [`crate::chat::ChatPort`].
//! The rest of the crate never touches platform wire formats.

mod telegram;

pub use telegram::Telegram;
