//! # Middleware
//!
//! Cross-cutting layers applied around the router, outermost first:
//! [`recovery`], [`access_log`], [`cors`], then authentication (in
//! [`crate::auth`]), then [`timeout`].

pub mod access_log;
pub mod cors;
pub mod recovery;
pub mod timeout;
