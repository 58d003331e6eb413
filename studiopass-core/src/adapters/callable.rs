//! HTTPS callable-functions gateway client
//!
//! Implements the ServiceGateway port over the serverless callable-function
//! wire convention: each procedure is invoked as
//! `POST {base}/{name}` with a JSON body `{ "data": <payload> }`, and the
//! response is either `{ "result": <value> }` or
//! `{ "error": { "status": "...", "message": "..." } }`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::domain::result::{Error, Result};
use crate::ports::ServiceGateway;

/// Default production functions URL
const CALLABLE_PRODUCTION_URL: &str = "https://us-central1-studiopass.cloudfunctions.net";

/// Environment variable to override the callable-functions base URL.
/// Set this to use an emulator or staging environment for testing.
pub const CALLABLE_BASE_URL_ENV: &str = "STUDIOPASS_FUNCTIONS_URL";

/// Get the callable base URL, checking the environment variable first
pub fn get_base_url() -> String {
    std::env::var(CALLABLE_BASE_URL_ENV).unwrap_or_else(|_| CALLABLE_PRODUCTION_URL.to_string())
}

/// Wire shape of a callable-function response
#[derive(Debug, Deserialize)]
struct CallableResponse {
    #[serde(default)]
    result: Option<JsonValue>,
    #[serde(default)]
    error: Option<CallableError>,
}

#[derive(Debug, Deserialize)]
struct CallableError {
    #[allow(dead_code)]
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the callable-functions gateway
pub struct HttpsCallableGateway {
    client: reqwest::Client,
    base_url: String,
    /// Bearer token of the signed-in user, forwarded so the backend can
    /// authorize the call
    id_token: Option<String>,
}

impl HttpsCallableGateway {
    pub fn new(id_token: Option<String>) -> Result<Self> {
        Self::with_base_url(get_base_url(), id_token)
    }

    pub fn with_base_url(base_url: impl Into<String>, id_token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            id_token,
        })
    }
}

#[async_trait]
impl ServiceGateway for HttpsCallableGateway {
    async fn call(&self, name: &str, payload: JsonValue) -> Result<JsonValue> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), name);

        let mut request = self.client.post(&url).json(&json!({ "data": payload }));
        if let Some(token) = &self.id_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(format!("call to '{}' failed: {}", name, e)))?;

        let status = response.status();
        let body: CallableResponse = response
            .json()
            .await
            .map_err(|e| Error::transport(format!("invalid response from '{}': {}", name, e)))?;

        if let Some(error) = body.error {
            return Err(Error::ServiceCall {
                name: name.to_string(),
                message: error
                    .message
                    .unwrap_or_else(|| format!("status {}", status)),
            });
        }
        if !status.is_success() {
            return Err(Error::transport(format!(
                "call to '{}' returned HTTP {}",
                name, status
            )));
        }

        Ok(body.result.unwrap_or(JsonValue::Null))
    }
}
