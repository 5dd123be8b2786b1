//! Outbound HTTP: pacing gate and retrying client

mod client;
mod pacing;

pub use client::{FetchClient, FetchError, FetchErrorKind, FetchResponse};
pub use pacing::PacingGate;
