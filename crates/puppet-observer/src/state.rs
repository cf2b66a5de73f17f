//! Shared application state for the observer API.

use std::sync::Arc;

use puppet_core::{Engine, RunControl};

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. Every
/// read goes through the engine's own views, which take per-agent locks
/// briefly and never wait on a collaborator.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The engine being observed.
    pub engine: Arc<Engine>,
    /// Driver loop control (present when the loop is running).
    pub control: Option<Arc<RunControl>>,
}

impl AppState {
    /// State for an engine without a driver loop.
    pub const fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            control: None,
        }
    }

    /// State with driver loop control attached.
    pub const fn with_control(engine: Arc<Engine>, control: Arc<RunControl>) -> Self {
        Self {
            engine,
            control: Some(control),
        }
    }
}
