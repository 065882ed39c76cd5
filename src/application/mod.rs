pub mod catalog_service;
pub mod checkout_service;
pub mod order_service;
pub mod payment_service;

#[cfg(test)]
pub(crate) mod memory;

use std::sync::Arc;

use crate::domain::errors::DomainError;

/// Run a blocking repository call on the blocking thread pool.
pub(crate) async fn blocking<R, T, F>(repo: &Arc<R>, f: F) -> Result<T, DomainError>
where
    R: ?Sized + Send + Sync + 'static,
    T: Send + 'static,
    F: FnOnce(&R) -> Result<T, DomainError> + Send + 'static,
{
    let repo = Arc::clone(repo);
    tokio::task::spawn_blocking(move || f(repo.as_ref()))
        .await
        .map_err(|e| DomainError::Internal(e.to_string()))?
}
