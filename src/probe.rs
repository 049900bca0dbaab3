//! Target-server readiness probe
//!
//! The web server under test is started by a separate process before
//! this runner is invoked; the probe only confirms it is answering so
//! that a cold target shows up in the log rather than as a mysterious
//! navigation timeout. The runner treats a probe failure as advisory.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{SmokeError, SmokeResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Poll the base URL until it answers or the timeout elapses.
///
/// Any HTTP response counts as reachable; the status code is logged but
/// not judged, since readiness is all the probe is for.
pub async fn wait_for_server(base_url: &str, timeout: Duration) -> SmokeResult<()> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    let start = std::time::Instant::now();
    let mut attempts = 0;

    while start.elapsed() < timeout {
        attempts += 1;

        match client.get(base_url).send().await {
            Ok(resp) => {
                if !resp.status().is_success() {
                    warn!("Target responded with {}", resp.status());
                }
                return Ok(());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for target server at {}...", base_url);
                }
                // Connection refused is expected while the server is starting
                if !e.is_connect() {
                    warn!("Probe error: {}", e);
                }
            }
        }

        sleep(POLL_INTERVAL).await;
    }

    Err(SmokeError::ServerUnreachable(attempts))
}
