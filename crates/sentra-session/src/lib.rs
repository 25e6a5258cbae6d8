//! Sentra Session — Authoritative session store and orchestration.
//!
//! Wires the token service, device trust registry, anomaly detector,
//! tenant guard, and policy engine into the session lifecycle:
//! creation, validation, refresh, activity scoring, quarantine,
//! termination, and tenant switching.

pub mod config;
pub mod events;
pub mod service;

pub use config::SessionConfig;
pub use events::{SessionEvents, SessionNotification};
pub use service::{
    ActivityInput, ActivityOutcome, CreateSessionInput, SessionCreationResult, SessionService,
    SessionValidation,
};
