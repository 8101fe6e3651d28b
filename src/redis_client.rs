use redis::aio::ConnectionManager;

use crate::runner::BenchError;

/// Opens a `ConnectionManager` that auto-reconnects on failure.
///
/// `ConnectionManager` is cheaply cloneable; every clone shares the same
/// multiplexed TCP connection, which is all a sequential benchmark needs.
pub async fn connect(url: &str) -> Result<ConnectionManager, BenchError> {
    let client = redis::Client::open(url).map_err(|e| BenchError::Connect {
        url: url.to_owned(),
        source: e,
    })?;

    ConnectionManager::new(client)
        .await
        .map_err(|e| BenchError::Connect {
            url: url.to_owned(),
            source: e,
        })
}
