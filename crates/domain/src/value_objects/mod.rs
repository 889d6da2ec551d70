//! Value objects - Immutable objects defined by their attributes

mod currency;
mod names;

pub use currency::{Currency, CURRENCY_CAP};
pub use names::{Description, DisplayName};
