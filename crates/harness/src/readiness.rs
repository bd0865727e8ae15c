use tracing::info;

use crate::endpoints;
use crate::error::ProbeError;
use crate::retry::{retry_with_policy, RetryPolicy};
use crate::session::ApiClient;

/// Waits until the backend answers HTTP at all; gateway errors and connection
/// failures are retried per `policy`. Any other status (401 included) means ready.
pub async fn wait_for_backend(
    client: &ApiClient,
    policy: &RetryPolicy,
) -> Result<(), ProbeError> {
    let resp = retry_with_policy(policy, || async {
        let resp = client.get(endpoints::AUTH_ME).await?;
        if matches!(resp.status_code(), 502..=504) {
            return Err(resp.status_error(401));
        }
        Ok(resp)
    })
    .await?;
    info!(
        event = "backend_ready",
        base_url = client.base_url(),
        status = resp.status_code(),
        "backend reachable"
    );
    Ok(())
}
