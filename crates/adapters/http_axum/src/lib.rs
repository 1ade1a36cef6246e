//! # carhub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Read and write the Session and Settings stores (`/session`, `/settings`)
//! - Forward raw commands to the serial devices (`/serial/{command}`)
//! - Stream Session updates as server-sent events (`/session/stream`)
//!
//! Every handler answers with the same JSON envelope:
//!
//! ```json
//! { "output": ..., "status": "success", "ok": true }
//! ```
//!
//! Failures carry `"status": "fail"`, `"ok": false` and the error text as
//! `output`.
//!
//! ## Dependency rule
//! Depends on `carhub-app` (stores and port traits) and `carhub-domain`.
//! Never leaks axum types into the core.

pub mod api;
pub mod error;
pub mod response;
pub mod router;
pub mod state;

pub use response::JsonResponse;
pub use router::build;
pub use state::AppState;
