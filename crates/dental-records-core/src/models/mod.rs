//! Domain models for the dental records system.

mod form;
mod patient;
mod validation;

pub use form::*;
pub use patient::*;
pub use validation::*;

pub(crate) use patient::{from_cents, to_cents};
