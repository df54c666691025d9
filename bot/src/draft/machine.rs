//! Draft state machine transitions
//!
//! The transitions here are pure with respect to I/O: they mutate the
//! [`Draft`] and tell the caller what happened, and the session actor turns
//! outcomes into chat messages and spawned remote flows. That keeps every
//! state change inside the actor's serialized execution and makes the
//! machine testable without collaborators.

use tracing::debug;

use crate::chat::MessageId;
use crate::market::{ListingPayload, TradeType};
use crate::session::CategoryOutcome;

use super::model::{Draft, DraftState};
use super::price::{PriceInput, parse_postal_code, parse_price};

/// What a free-text reply did to the draft
#[derive(Debug, PartialEq, Eq)]
pub enum TextOutcome {
    /// Reply to a breadcrumb updated the title
    TitleEdited,
    /// Reply to a breadcrumb updated the description
    DescriptionEdited,
    /// Attribute value recorded; `done` when the list is exhausted
    AttributeAccepted { done: bool },
    /// Reply did not match any option label; same attribute re-prompts
    AttributeRejected,
    /// Price recorded, moving on to shipping
    PriceAccepted,
    PriceRejected,
    /// Postal code recorded; draft is ready for the summary
    PostalAccepted(String),
    PostalRejected,
    /// Text means nothing in the draft's current state
    NotHandled,
}

/// Next step after the category flow resolved
#[derive(Debug, PartialEq, Eq)]
pub enum AfterCategory {
    /// Ask for the attribute now at the head of the required list
    AskAttribute,
    /// No attributes left; ask for the price
    AskPrice,
}

/// Next step after the shipping choice
#[derive(Debug, PartialEq, Eq)]
pub enum AfterShipping {
    AskPostalCode,
    Ready,
}

/// Apply a free-text reply to the draft in its current state
pub fn handle_text(draft: &mut Draft, text: &str, reply_to: Option<MessageId>) -> TextOutcome {
    if let Some(target) = reply_to {
        if let Some(edited) = apply_edit(draft, target, text) {
            return edited;
        }
    }

    match draft.state {
        DraftState::AwaitingAttribute { index } => handle_attribute_reply(draft, index, text),
        DraftState::AwaitingPrice => handle_price_reply(draft, text),
        DraftState::AwaitingPostalCode => match parse_postal_code(text) {
            Some(code) => {
                draft.state = DraftState::ReadyToPublish;
                TextOutcome::PostalAccepted(code.to_string())
            }
            None => TextOutcome::PostalRejected,
        },
        _ => TextOutcome::NotHandled,
    }
}

/// A reply targeted at a breadcrumb edits that field locally; the change
/// reaches the remote draft with the final update at publish time
fn apply_edit(draft: &mut Draft, target: MessageId, text: &str) -> Option<TextOutcome> {
    if draft.title_msg == Some(target) {
        draft.title = text.trim().to_string();
        debug!("draft title edited via reply");
        return Some(TextOutcome::TitleEdited);
    }
    if draft.description_msg == Some(target) {
        draft.description = text.trim().to_string();
        debug!("draft description edited via reply");
        return Some(TextOutcome::DescriptionEdited);
    }
    None
}

/// Case-insensitive exact match against the current attribute's option
/// labels; anything else re-prompts without advancing the index
fn handle_attribute_reply(draft: &mut Draft, index: usize, text: &str) -> TextOutcome {
    let Some(attribute) = draft.required.get(index) else {
        return TextOutcome::NotHandled;
    };

    let reply = text.trim();
    let Some(option) = attribute.options.iter().find(|o| o.label.eq_ignore_ascii_case(reply)) else {
        return TextOutcome::AttributeRejected;
    };

    let name = attribute.name.clone();
    let value = option.id.clone();
    draft.values.insert(name, value);

    let next = index + 1;
    if next < draft.required.len() {
        draft.state = DraftState::AwaitingAttribute { index: next };
        TextOutcome::AttributeAccepted { done: false }
    } else {
        draft.state = DraftState::AwaitingPrice;
        TextOutcome::AttributeAccepted { done: true }
    }
}

fn handle_price_reply(draft: &mut Draft, text: &str) -> TextOutcome {
    match parse_price(text) {
        Some(PriceInput::Amount(amount)) => {
            draft.price = Some(amount);
            draft.trade_type = TradeType::Sell;
            draft.state = DraftState::AwaitingShipping;
            TextOutcome::PriceAccepted
        }
        Some(PriceInput::GiveAway) => {
            draft.price = Some(0);
            draft.trade_type = TradeType::GiveAway;
            draft.state = DraftState::AwaitingShipping;
            TextOutcome::PriceAccepted
        }
        None => TextOutcome::PriceRejected,
    }
}

/// Install the result of the category flow and pick the next prompt
pub fn apply_category_outcome(draft: &mut Draft, outcome: CategoryOutcome) -> AfterCategory {
    draft.remote = outcome.remote;
    draft.category = Some(outcome.category);
    draft.values.extend(outcome.prefilled);
    draft.set_attributes(outcome.catalog, outcome.required);

    if draft.required.is_empty() {
        draft.state = DraftState::AwaitingPrice;
        AfterCategory::AskPrice
    } else {
        draft.state = DraftState::AwaitingAttribute { index: 0 };
        AfterCategory::AskAttribute
    }
}

/// Record the shipping choice; the postal code question only appears when
/// none is on file for the session
pub fn record_shipping(draft: &mut Draft, shipping: bool, postal_on_file: bool) -> AfterShipping {
    draft.shipping = Some(shipping);
    if postal_on_file {
        draft.state = DraftState::ReadyToPublish;
        AfterShipping::Ready
    } else {
        draft.state = DraftState::AwaitingPostalCode;
        AfterShipping::AskPostalCode
    }
}

/// The full payload committed right before publishing
pub fn build_listing(draft: &Draft, postal_code: &str) -> ListingPayload {
    ListingPayload {
        title: draft.title.clone(),
        description: draft.description.clone(),
        category: draft.category.clone().unwrap_or_default(),
        trade_type: draft.trade_type,
        price: draft.price.unwrap_or(0),
        attributes: draft.values.clone(),
        images: draft.images.clone(),
        postal_code: postal_code.to_string(),
    }
}

/// Prompt for the attribute currently awaiting input
pub fn attribute_prompt(draft: &Draft) -> Option<String> {
    let attribute = draft.current_attribute()?;
    let options = attribute
        .options
        .iter()
        .map(|o| o.label.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!("{}? Reply with one of: {}", attribute.label, options))
}

/// Prompt shown when entering the price step
pub const PRICE_PROMPT: &str = "What price do you want to ask? Reply with an amount (e.g. 50€) or \"annetaan\" to give it away.";

/// Prompt shown when entering the postal code step
pub const POSTAL_PROMPT: &str = "What is your postal code? (five digits)";
