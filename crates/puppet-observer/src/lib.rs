//! Monitoring and control HTTP API for the Puppet Engine.
//!
//! An Axum server exposing engine status, agent views and state, manual
//! post creation, agent stop/start, event submission and driver loop
//! pause/resume. Handlers call straight into the shared
//! [`Engine`](puppet_core::Engine); there is no separate snapshot to keep
//! in sync.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
