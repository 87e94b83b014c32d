#![warn(clippy::indexing_slicing, clippy::unwrap_used, clippy::dbg_macro, clippy::undocumented_unsafe_blocks)]
//! This crate provides the route definitions and gateway settings of relaygate from various backends.

/// re-export relaygate_model
pub mod model {
    pub use relaygate_model::*;
}
/// Locator, repository and listener traits
pub mod service;

pub use model::*;
pub use service::*;
