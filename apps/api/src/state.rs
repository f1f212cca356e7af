use std::sync::Arc;

use crate::config::Config;
use crate::dispatch::ProcessingDispatcher;
use crate::storage::{BlobStore, TrackingStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub tracking: Arc<dyn TrackingStore>,
    pub blobs: Arc<dyn BlobStore>,
    /// Hand-off to the processing side. In-process task or Redis queue, chosen at startup.
    pub dispatcher: Arc<dyn ProcessingDispatcher>,
    pub config: Config,
}
