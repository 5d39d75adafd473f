use std::collections::HashMap;

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use reqwest::header::{AUTHORIZATION, HeaderValue, WWW_AUTHENTICATE};
use reqwest::{Request, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub(crate) enum ClientError {
    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("failed to decode upstream response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("failed to fetch bearer token: {0}")]
    TokenExchange(#[source] reqwest::Error),
    #[error("bearer token is not usable as a header value")]
    TokenInvalid(#[source] reqwest::header::InvalidHeaderValue),
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
pub(crate) struct UpstreamLabels {
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Shared upstream HTTP client. Certificate validation and response
/// compression are disabled on the whole client, not per request, so that
/// every consumer talks to self-signed registries the same way.
#[derive(Clone)]
pub(crate) struct HttpClient {
    http: reqwest::Client,
    requests: Family<UpstreamLabels, Counter>,
}

impl HttpClient {
    pub fn new(requests: Family<UpstreamLabels, Counter>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent("registry-ui")
            .danger_accept_invalid_certs(true)
            .no_gzip()
            .no_brotli()
            .no_deflate()
            .build()
            .map_err(ClientError::Transport)?;

        Ok(Self { http, requests })
    }

    /// GET a JSON document, re-authenticating once if the upstream answers
    /// with a bearer challenge.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        let response = self.get(url).await?;
        response.json().await.map_err(ClientError::Decode)
    }

    /// One GET with a single 401 retry. Statuses other than 401 are handed
    /// back untouched for the caller to deal with.
    pub async fn get(&self, url: &str) -> Result<Response, ClientError> {
        let request = self.http.get(url).build().map_err(ClientError::Transport)?;
        let retry = request.try_clone();

        let response = self.execute(request).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        // A GET has no body, so the clone always exists. Fall through to the
        // original response rather than panic if that ever stops holding.
        let Some(mut retry) = retry else {
            return Ok(response);
        };

        let Some(challenge) = bearer_challenge(&response) else {
            warn!("401 from {url} without a usable bearer challenge, passing the response through");
            return Ok(response);
        };

        let token = self.fetch_token(&challenge).await?;

        let value =
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(ClientError::TokenInvalid)?;
        retry.headers_mut().insert(AUTHORIZATION, value);

        self.execute(retry).await
    }

    async fn execute(&self, request: Request) -> Result<Response, ClientError> {
        let response = self
            .http
            .execute(request)
            .await
            .map_err(ClientError::Transport)?;

        self.requests
            .get_or_create(&UpstreamLabels {
                status: response.status().as_str().to_string(),
            })
            .inc();

        Ok(response)
    }

    async fn fetch_token(&self, challenge: &HashMap<String, String>) -> Result<String, ClientError> {
        let realm = challenge.get("realm").map(String::as_str).unwrap_or_default();
        let service = challenge
            .get("service")
            .map(String::as_str)
            .unwrap_or_default();
        let scope = challenge.get("scope").map(String::as_str).unwrap_or_default();

        debug!("Exchanging bearer challenge at {realm} for service {service}");

        let response = self
            .http
            .get(realm)
            .query(&[("service", service), ("scope", scope)])
            .send()
            .await
            .map_err(ClientError::TokenExchange)?;

        let token: TokenResponse = response.json().await.map_err(ClientError::TokenExchange)?;

        Ok(token.token)
    }
}

fn bearer_challenge(response: &Response) -> Option<HashMap<String, String>> {
    let header = response.headers().get(WWW_AUTHENTICATE)?.to_str().ok()?;
    parse_challenge(header)
}

/// Parse a `Www-Authenticate` bearer challenge. The header must split into
/// exactly two whitespace-separated fields with the first equal to `Bearer`;
/// anything else means there is no usable challenge. Parameter pairs without
/// exactly one `=` are skipped.
fn parse_challenge(header: &str) -> Option<HashMap<String, String>> {
    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() != 2 || fields[0] != "Bearer" {
        return None;
    }

    let mut params = HashMap::new();

    for pair in fields[1].split(',') {
        let parts: Vec<&str> = pair.split('=').collect();
        if parts.len() != 2 {
            continue;
        }

        params.insert(
            parts[0].trim_matches(|c| c == '"' || c == ' ').to_string(),
            parts[1].trim_matches(|c| c == '"' || c == ' ').to_string(),
        );
    }

    Some(params)
}
