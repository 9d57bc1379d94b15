use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend_client::BackendClient;
use crate::config::Config;
use crate::ingestion::FileIngestionPipeline;
use crate::session::Workspace;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub backend: BackendClient,
    pub pipeline: FileIngestionPipeline,
    /// Never held across an `.await`.
    pub workspace: Arc<RwLock<Workspace>>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, backend: BackendClient, pipeline: FileIngestionPipeline) -> Self {
        Self {
            backend,
            pipeline,
            workspace: Arc::new(RwLock::new(Workspace::default())),
            config,
        }
    }
}
