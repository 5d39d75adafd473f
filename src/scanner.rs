use serde_json::Value;
use tracing::debug;

use crate::client::{ClientError, HttpClient};

/// Fetch a vulnerability report for an image from the scanner service. The
/// report body is passed through as opaque JSON; its schema belongs to the
/// scanner.
pub(crate) async fn analysis(
    client: &HttpClient,
    scanner: &str,
    registry: &str,
    image: &str,
    reference: &str,
) -> Result<Value, ClientError> {
    let url = format!("{scanner}/v1/{image}/analysis?realm={registry}&reference={reference}");

    debug!("Requesting analysis from {url}");

    client.get_json(&url).await
}
