//! Builders to construct admission controllers from configuration.

use std::sync::Arc;

use crate::config::AdmissionConfig;
use crate::core::{AdmissionController, AdmissionError, AdmissionStore, CourseDirectory, Notifier};
use crate::infra::store::InMemoryAdmissionStore;

/// Build a controller over an existing store after validating `cfg`.
pub fn build_controller<S, D, N>(
    cfg: &AdmissionConfig,
    store: Arc<S>,
    directory: D,
    notifier: N,
) -> Result<AdmissionController<S, D, N>, AdmissionError>
where
    S: AdmissionStore,
    D: CourseDirectory,
    N: Notifier,
{
    cfg.validate()
        .map_err(|e| AdmissionError::Validation(format!("config invalid: {e}")))?;
    tracing::debug!(
        concurrency = ?cfg.concurrency,
        timeout_ms = cfg.transaction_timeout_ms,
        max_attempts = cfg.retry.max_attempts,
        "building admission controller"
    );
    Ok(AdmissionController::new(cfg.clone(), store, directory, notifier))
}

/// Build a controller backed by an [`InMemoryAdmissionStore`] configured from `cfg`.
pub fn build_in_memory<D, N>(
    cfg: &AdmissionConfig,
    directory: D,
    notifier: N,
) -> Result<AdmissionController<InMemoryAdmissionStore, D, N>, AdmissionError>
where
    D: CourseDirectory,
    N: Notifier,
{
    let store = Arc::new(InMemoryAdmissionStore::from_config(cfg));
    build_controller(cfg, store, directory, notifier)
}
