//! # carhub-domain
//!
//! Pure domain model for the carhub vehicle hub.
//!
//! ## Responsibilities
//! - Foundational types: topics, tagged values, error conventions, timestamps
//! - Define **Messages** (what a subscriber receives on its mailbox)
//! - Define **Overrides** and **power states** consumed by the automation engine
//! - Contain the **significance rules** deciding whether a session write is
//!   worth a notification (equality and GPS distance)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod component;
pub mod gps;
pub mod message;
pub mod significance;
pub mod stats;
pub mod topic;
pub mod value;
