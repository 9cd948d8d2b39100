use std::sync::Arc;

use smoke_events::VerdictSource;

use crate::engine::RunEngine;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Verdict source that handlers report into and runs aggregate from.
    pub feed: Arc<dyn VerdictSource>,
    /// Builds one coordinator per entry-endpoint request.
    pub engine: Arc<RunEngine>,
}
