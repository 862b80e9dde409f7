//! Endpoint failover and the signing session bound to the active endpoint.

pub mod manager;
pub mod session;

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tracing::warn;

use crate::antelope::LedgerApi;

pub use manager::EndpointManager;
pub use session::{MinerIdentity, PushError, Session};

/// Run `op` against each client in order and return the first success
/// together with its index. Failures are logged and skipped; `None` means
/// every client failed.
pub async fn first_success<T, E, F, Fut>(
    what: &str,
    clients: &[Arc<dyn LedgerApi>],
    mut op: F,
) -> Option<(usize, T)>
where
    F: FnMut(Arc<dyn LedgerApi>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    for (index, client) in clients.iter().enumerate() {
        let endpoint = client.endpoint().to_string();
        match op(client.clone()).await {
            Ok(value) => return Some((index, value)),
            Err(e) => warn!("{} failed on {}: {}", what, endpoint, e),
        }
    }
    None
}
