//! Step definitions for support desk behaviour scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
