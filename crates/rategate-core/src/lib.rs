//! Core infrastructure for rategate.
//!
//! This crate provides the pieces shared by every rategate component:
//! - [`DomainKey`], the identifier of one externally rate-limited endpoint family
//! - The event system used for observability ([`events`])
//! - The adaptive delay rules and their tuning constants ([`aimd`])

pub mod aimd;
pub mod domain;
pub mod events;

pub use aimd::{AdaptiveConfig, DelayAdjustment, DelayState};
pub use domain::DomainKey;
pub use events::{DomainEvent, EventListener, EventListeners, FnListener};
