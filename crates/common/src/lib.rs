//! Common types for the session token service

mod secret;
mod error;

pub use secret::Secret;
pub use error::{Error, Result};
