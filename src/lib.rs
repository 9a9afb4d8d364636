//! Switchboard: routing and real-time fan-out core for live support chat.
//!
//! Anonymous website guests talk to a bot first; when the bot cannot help,
//! the conversation is escalated and handed to a human agent. Every
//! committed change is fanned out to dashboards and guest widgets.
//!
//! # Architecture
//!
//! Each subsystem follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (in-memory stores)
//!
//! # Modules
//!
//! - [`session`]: Guest sessions with a sliding expiry
//! - [`conversation`]: Conversation state machine, messages and metrics
//! - [`bot`]: Trigger-rule matching with confidence scoring
//! - [`routing`]: Bot-versus-human decision for each guest message
//! - [`broadcast`]: Per-channel event fan-out to listeners
//! - [`agent`]: Staff directory used for auto-assignment
//! - [`desk`]: Guest and agent channel facade with access control
//! - [`config`]: Layered configuration
//! - [`telemetry`]: Logging setup

pub mod agent;
pub mod bot;
pub mod broadcast;
pub mod config;
pub mod conversation;
pub mod desk;
pub mod routing;
pub mod session;
pub mod telemetry;

#[cfg(test)]
mod test_support;
