//! Bot matcher: resolves guest messages to canned replies.
//!
//! Trigger rules pair a case-insensitive pattern with a reply and optional
//! variations. The matcher walks active rules from highest priority down and
//! the first rule whose pattern matches wins. Malformed patterns are logged
//! and skipped.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
