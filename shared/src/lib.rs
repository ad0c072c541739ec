//! Shared types and models for apparel operations
//!
//! This crate contains the domain models and pure calculations shared between
//! the backend and the point-of-sale front end (via WASM).

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
