//! Draft lifecycle: model, state machine and input grammars

pub mod machine;
mod model;
mod price;

pub use machine::{AfterCategory, AfterShipping, TextOutcome};
pub use model::{BusyOp, Draft, DraftState};
pub use price::{PriceInput, parse_postal_code, parse_price};
