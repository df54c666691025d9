//! Draft data model
//!
//! One [`Draft`] per session at most. The draft mirrors the remote ad-draft
//! resource (id plus version token via [`Versioned`]) and carries everything
//! collected locally that is only committed remotely at publish time.

use std::collections::HashMap;

use crate::chat::MessageId;
use crate::market::{AttributeSpec, CategoryCandidate, ImageRef, TradeType, Versioned};

/// Lifecycle position of an in-progress draft
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    /// Waiting for the user (or advisor) to pick a category
    AwaitingCategory,
    /// Waiting for the value of the required attribute at `index`
    AwaitingAttribute { index: usize },
    /// Waiting for a price or a give-away token
    AwaitingPrice,
    /// Waiting for the shipping yes/no choice
    AwaitingShipping,
    /// Waiting for a postal code (only when none is on file)
    AwaitingPostalCode,
    /// Everything collected; waiting for the publish command
    ReadyToPublish,
}

impl DraftState {
    /// Human-facing name used in `/status` replies and logs
    pub fn describe(&self) -> &'static str {
        match self {
            DraftState::AwaitingCategory => "choosing a category",
            DraftState::AwaitingAttribute { .. } => "filling in details",
            DraftState::AwaitingPrice => "waiting for a price",
            DraftState::AwaitingShipping => "choosing shipping",
            DraftState::AwaitingPostalCode => "waiting for a postal code",
            DraftState::ReadyToPublish => "ready to publish",
        }
    }
}

/// A slow remote flow currently running for this draft; button presses
/// that would start another one are refused until it completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyOp {
    CommittingCategory,
    Publishing,
}

/// One in-progress listing
#[derive(Debug)]
pub struct Draft {
    /// Remote identity and version-token bookkeeping
    pub remote: Versioned,
    pub state: DraftState,

    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub trade_type: TradeType,
    /// Whole euros; `Some(0)` for give-aways
    pub price: Option<u32>,
    pub shipping: Option<bool>,

    /// Collected attribute values, name -> option id
    pub values: HashMap<String, String>,
    /// Every attribute the category defines, in service order; kept so
    /// re-selection can restart the attribute loop from scratch
    pub catalog: Vec<AttributeSpec>,
    /// Attributes still requiring user input, in order
    pub required: Vec<AttributeSpec>,

    /// Images committed to the remote draft
    pub images: Vec<ImageRef>,
    /// Category predictions fetched at creation time
    pub candidates: Vec<CategoryCandidate>,

    /// Breadcrumbs: replying to these messages edits title/description
    pub title_msg: Option<MessageId>,
    pub description_msg: Option<MessageId>,

    /// Remote flow currently in flight for this draft, if any
    pub busy: Option<BusyOp>,
}

impl Draft {
    pub fn new(remote: Versioned, title: String, description: String) -> Self {
        Self {
            remote,
            state: DraftState::AwaitingCategory,
            title,
            description,
            category: None,
            trade_type: TradeType::Sell,
            price: None,
            shipping: None,
            values: HashMap::new(),
            catalog: Vec::new(),
            required: Vec::new(),
            images: Vec::new(),
            candidates: Vec::new(),
            title_msg: None,
            description_msg: None,
            busy: None,
        }
    }

    /// The attribute currently awaiting input, when in the attribute loop
    pub fn current_attribute(&self) -> Option<&AttributeSpec> {
        match self.state {
            DraftState::AwaitingAttribute { index } => self.required.get(index),
            _ => None,
        }
    }

    /// Install the fetched catalog and the subset still needing input
    pub fn set_attributes(&mut self, catalog: Vec<AttributeSpec>, required: Vec<AttributeSpec>) {
        self.catalog = catalog;
        self.required = required;
    }

    /// Drop collected values and restart the attribute loop over the full
    /// catalog; used by re-selection
    pub fn restart_attributes(&mut self) {
        self.values.clear();
        self.required = self.catalog.clone();
    }

    /// Rewind to category selection, clearing everything category-specific
    pub fn rewind_to_category(&mut self) {
        self.category = None;
        self.values.clear();
        self.catalog.clear();
        self.required.clear();
        self.state = DraftState::AwaitingCategory;
    }

    /// One-line summary shown before publishing
    pub fn summary(&self, postal_code: &str) -> String {
        let price = match (self.trade_type, self.price) {
            (TradeType::GiveAway, _) => "give-away".to_string(),
            (TradeType::Sell, Some(p)) => format!("{p} €"),
            (TradeType::Sell, None) => "-".to_string(),
        };
        let shipping = match self.shipping {
            Some(true) => "yes",
            Some(false) => "no",
            None => "-",
        };
        format!(
            "{}\n{}\n\nCategory: {}\nPrice: {}\nShipping: {}\nPostal code: {}\nPhotos: {}",
            self.title,
            self.description,
            self.category.as_deref().unwrap_or("-"),
            price,
            shipping,
            postal_code,
            self.images.len(),
        )
    }
}
