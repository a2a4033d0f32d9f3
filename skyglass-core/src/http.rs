use reqwest::{Client, Response};

use crate::config::HttpConfig;

/// Shared client carrying the configured user agent and request timeout.
pub fn client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent.as_str())
        .build()
}

/// Read the body of a response, turning non-success statuses into an error message.
pub(crate) async fn read_success_body(res: Response, what: &str) -> Result<String, String> {
    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|e| format!("failed to read {what} response body: {e}"))?;

    if !status.is_success() {
        return Err(format!(
            "{what} request failed with status {}: {}",
            status,
            truncate_body(&body)
        ));
    }

    Ok(body)
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
