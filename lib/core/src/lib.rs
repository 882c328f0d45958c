//! Core types shared across the cartpal backend.
//!
//! This crate provides the `Result` alias used with rootcause reports and
//! the strongly-typed identifiers the identity layer hands out.

pub mod id;

pub use id::{ParseIdError, SessionId};

/// Result alias carrying a rootcause report of a crate-specific error enum.
///
/// Fallible async boundaries (identity provider calls, session storage)
/// return this so callers can attach context as the error travels up.
pub type Result<T, C = ()> = std::result::Result<T, rootcause::Report<C>>;
