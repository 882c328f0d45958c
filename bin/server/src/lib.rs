//! cartpal web backend.
//!
//! This crate provides the HTTP identity layer of the cartpal backend:
//! bearer and session authentication, the session lifecycle endpoints,
//! login redirects and role guards, plus the sample API they protect.

pub mod api;
pub mod auth;
pub mod config;
