//! Event system for tenancy actions.
//!
//! Events are fired from all lifecycle actions. If no listeners are
//! registered, they are silently ignored (zero overhead). Delivery concerns
//! such as sending invitation emails hang off listeners: dispatch is
//! fire-and-forget and listener failures must be handled (typically logged)
//! inside the listener.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use bailiwick::register_event_listeners;
//! use bailiwick::events::listeners::LoggingListener;
//!
//! fn main() {
//!     // register listeners at startup
//!     register_event_listeners(|registry| {
//!         registry.listen(LoggingListener::new());
//!     });
//!
//!     // events will now be logged
//! }
//! ```
//!
//! # Custom Listeners
//!
//! Implement the [`Listener`] trait to create custom event handlers:
//!
//! ```rust,ignore
//! use bailiwick::events::{TenancyEvent, Listener};
//! use async_trait::async_trait;
//!
//! struct InvitationMailer;
//!
//! #[async_trait]
//! impl Listener for InvitationMailer {
//!     async fn handle(&self, event: &TenancyEvent) {
//!         if let TenancyEvent::InvitationCreated { email, .. } = event {
//!             // look up the pending invitation and send the link
//!         }
//!     }
//! }
//! ```

mod event;
mod listener;
mod registry;

pub mod listeners;

pub use event::TenancyEvent;
pub use listener::Listener;
pub use registry::{dispatch, register_event_listeners};
