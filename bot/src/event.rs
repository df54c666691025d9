//! Inbound event vocabulary
//!
//! Platform updates are abstracted into three external event kinds (text,
//! photo, button callback) before they reach the dispatcher. Timer and flow
//! completion events are generated inside the session actor and share the
//! same mailbox so that everything a session does is serialized through one
//! queue.

use crate::chat::MessageId;

/// External identity of a chat user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One resolution of an uploaded photo
#[derive(Debug, Clone)]
pub struct PhotoVariant {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub mime: String,
}

/// A photo message: the same image at multiple resolutions
#[derive(Debug, Clone)]
pub struct PhotoPayload {
    pub variants: Vec<PhotoVariant>,
    pub caption: Option<String>,
}

impl PhotoPayload {
    /// The variant with the largest pixel area; photos always carry at
    /// least one variant by construction of the platform adapter
    pub fn largest(&self) -> Option<&PhotoVariant> {
        self.variants.iter().max_by_key(|v| u64::from(v.width) * u64::from(v.height))
    }
}

/// An event produced by the chat platform for one user
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// Plain text message, possibly a reply to one of the bot's messages
    Text {
        text: String,
        reply_to: Option<MessageId>,
    },
    /// Photo upload
    Photo(PhotoPayload),
    /// Button press on one of the bot's choice prompts
    Callback { data: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(width: u32, height: u32) -> PhotoVariant {
        PhotoVariant {
            width,
            height,
            data: vec![0u8; 4],
            mime: "image/jpeg".to_string(),
        }
    }

    #[test]
    fn test_largest_variant_by_area() {
        let photo = PhotoPayload {
            variants: vec![variant(90, 90), variant(1280, 960), variant(320, 240)],
            caption: None,
        };
        let largest = photo.largest().unwrap();
        assert_eq!((largest.width, largest.height), (1280, 960));
    }

    #[test]
    fn test_largest_of_empty_is_none() {
        let photo = PhotoPayload {
            variants: vec![],
            caption: None,
        };
        assert!(photo.largest().is_none());
    }
}
