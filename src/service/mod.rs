//! Entity controllers and their payload validation.

mod controller;
mod validation;
pub use controller::{EntityController, UpdateOutcome};
pub use validation::RequestValidator;
