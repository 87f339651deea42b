use crate::analysis::Analyzer;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Read-only after startup; cloning shares the analyzer's generator.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Analyzer,
    pub config: Config,
}
