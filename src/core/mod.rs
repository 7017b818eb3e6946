//! Core types shared across AutoCrew: the error taxonomy and its
//! user-facing rendering.

pub mod error;

pub use error::{AutocrewError, ErrorContext, user_friendly_error};
