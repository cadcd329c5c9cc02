//! Shared HTTP plumbing for the adapters.

use colloquy_error::{ProviderError, ProviderErrorKind};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use tracing::{debug, error};

/// Build the HTTP client used by one adapter.
pub(crate) fn http_client(provider: &'static str) -> Result<Client, ProviderError> {
    Client::builder()
        .user_agent(concat!("colloquy/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ProviderError::new(provider, ProviderErrorKind::ClientCreation(e.to_string())))
}

/// Read an API key from the environment.
pub(crate) fn api_key_from_env(provider: &'static str, var: &str) -> Result<String, ProviderError> {
    std::env::var(var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| ProviderError::new(provider, ProviderErrorKind::MissingApiKey(var.into())))
}

/// POST a JSON body and decode the JSON reply.
///
/// Non-success statuses become `Http` errors carrying the response body so
/// keyword classification can see the provider's own error text.
pub(crate) async fn post_json<T: Serialize + ?Sized>(
    provider: &'static str,
    request: RequestBuilder,
    body: &T,
) -> Result<serde_json::Value, ProviderError> {
    let response = request.json(body).send().await.map_err(|e| {
        error!(provider, error = ?e, "Request failed before a response arrived");
        ProviderError::new(provider, ProviderErrorKind::Transport(e.to_string()))
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        debug!(provider, status = %status, body = %body, "Provider returned error status");
        return Err(ProviderError::new(
            provider,
            ProviderErrorKind::Http {
                status_code: status.as_u16(),
                message: body,
            },
        ));
    }

    response.json::<serde_json::Value>().await.map_err(|e| {
        error!(provider, error = ?e, "Failed to decode provider response");
        ProviderError::new(provider, ProviderErrorKind::Parse(e.to_string()))
    })
}

/// Surface an `{"error": ...}` object in a 2xx body as an API error.
pub(crate) fn reject_error_body(
    provider: &'static str,
    body: &serde_json::Value,
) -> Result<(), ProviderError> {
    match body.get("error") {
        Some(error) if !error.is_null() => Err(ProviderError::new(
            provider,
            ProviderErrorKind::Api(error.to_string()),
        )),
        _ => Ok(()),
    }
}
