//! # carhub-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `Persistence` port from `carhub-app::ports` for the
//!   durable Settings store
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between stored JSON text and domain values
//!
//! ## Dependency rule
//! Depends on `carhub-app` (for port traits) and `carhub-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod pool;
pub mod settings_repo;

pub use pool::{Config, Database};
pub use settings_repo::SqliteSettingsRepository;
