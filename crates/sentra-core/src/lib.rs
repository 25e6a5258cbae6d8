//! Sentra Core — Domain models, error taxonomy, and collaborator
//! traits shared across all crates.

pub mod clock;
pub mod error;
pub mod models;
pub mod repository;

pub use clock::{Clock, SystemClock};
pub use error::{SentraError, SentraResult};
