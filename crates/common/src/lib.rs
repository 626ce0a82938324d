//! Shared types for the KIS client workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
