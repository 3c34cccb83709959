//! Small helpers shared by the HTTP clients.

/// Longest slice of a response body kept in errors and logs.
const BODY_PREVIEW_CHARS: usize = 200;

/// Truncate a response body for logging. Image payloads and HTML error
/// pages are never worth printing in full.
pub(crate) fn body_preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

/// Drain a response into its status and body text.
pub(crate) async fn read_body(
    response: reqwest::Response,
) -> Result<(reqwest::StatusCode, String), reqwest::Error> {
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}
