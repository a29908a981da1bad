//! Periodic keep-alive pings.

use std::future::Future;
use std::time::Duration;

use arxiv_assistant_shared::{AssistantError, Result};
use reqwest::Client;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Send one `GET` to `url`. Non-2xx is an error.
pub async fn ping(client: &Client, url: &str) -> Result<u16> {
    let response = client
        .get(url)
        .timeout(PING_TIMEOUT)
        .send()
        .await
        .map_err(|e| AssistantError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AssistantError::Network(format!("{url}: HTTP {status}")));
    }
    Ok(status.as_u16())
}

/// Ping `url` every `interval` until `shutdown` resolves.
///
/// The first ping goes out immediately. Failures are logged and never end the
/// loop. Returns the number of pings attempted.
#[instrument(skip(client, shutdown))]
pub async fn run<S>(client: &Client, url: &str, interval: Duration, shutdown: S) -> u64
where
    S: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut attempts = 0u64;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(attempts, "keep-alive stopped");
                return attempts;
            }
            _ = ticker.tick() => {
                attempts += 1;
                match ping(client, url).await {
                    Ok(status) => debug!(status, "keep-alive ok"),
                    Err(e) => warn!(error = %e, "keep-alive ping failed"),
                }
            }
        }
    }
}
