//! # carhub-app
//!
//! Application layer — the event space, the automation engine, and **port
//! definitions** (traits).
//!
//! ## Responsibilities
//! - Provide the two in-process stores (`Settings`, durable; `Session`,
//!   ephemeral) with publish/subscribe, significance filtering and bounded
//!   fan-out ([`event_store`])
//! - Define **mailboxes**, the capacity-1 channels consumers read from
//! - Run **components** that map observed and configured state to on/off
//!   hardware actions ([`component`])
//! - Derive signals from raw ones (door aggregation, voltage scaling)
//! - Define **port traits** that adapters implement:
//!   - `Persistence` — durable write-through for Settings
//!   - `CommandSink` — delivery of commands to hardware
//!
//! ## Dependency rule
//! Depends on `carhub-domain` only (plus `tokio` for tasks and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod component;
pub mod derived;
pub mod event_store;
pub mod mailbox;
pub mod ports;
