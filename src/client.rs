use std::env;
use std::time::{Duration, Instant};

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{ErrorResponse, GenerateContentRequest, GenerateContentResponse, Model};

/// Default base URL for the generative-language API.
pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Produces a completion for a single prompt.
///
/// One request, one full-text response; nothing is streamed and no earlier
/// turns are sent.  Any failure (network, status, payload) is an error.
///
/// # Examples
///
/// ```
/// use nexus::{Complete, Result};
///
/// struct Echo;
///
/// #[async_trait::async_trait]
/// impl Complete for Echo {
///     async fn complete(&self, prompt: &str) -> Result<String> {
///         Ok(format!("You said: {prompt}"))
///     }
/// }
///
/// # tokio_test::block_on(async {
/// assert_eq!(Echo.complete("hi").await.unwrap(), "You said: hi");
/// # });
/// ```
#[async_trait::async_trait]
pub trait Complete: Send + Sync {
    /// Returns the completion text for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Client for the Gemini generative-language API.
#[derive(Debug, Clone)]
pub struct Gemini {
    api_key: String,
    client: ReqwestClient,
    base_url: Url,
    model: Model,
    timeout: Duration,
}

impl Gemini {
    /// Create a new Gemini client for `model`.
    ///
    /// The API key can be provided directly or read from the `GEMINI_API_KEY`
    /// or `GOOGLE_API_KEY` environment variables, in that order.
    pub fn new(api_key: Option<String>, model: Model) -> Result<Self> {
        Self::with_options(api_key, model, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_key: Option<String>,
        model: Model,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = match api_key {
            Some(key) => key,
            None => resolve_api_key()?,
        };
        if api_key.trim().is_empty() {
            return Err(Error::authentication("API key is empty"));
        }

        let mut base = base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            client,
            base_url,
            model,
            timeout,
        })
    }

    /// Returns the model requests are sent to.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Changes the model used for subsequent requests.
    pub fn set_model(&mut self, model: Model) {
        self.model = model;
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// URL of the `generateContent` endpoint for the current model.
    ///
    /// The key travels in the `x-goog-api-key` header rather than the query
    /// string so it never shows up in logged URLs.
    pub fn endpoint(&self) -> Result<Url> {
        let path = format!("models/{}:generateContent", self.model.id());
        Ok(self.base_url.join(&path)?)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| Error::authentication("API key contains invalid header characters"))?;
        headers.insert("x-goog-api-key", key);
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let parsed = serde_json::from_str::<ErrorResponse>(&error_body).ok();
        let error_type = parsed.as_ref().and_then(|e| e.error.status.clone());
        let error_message = parsed
            .and_then(|e| e.error.message)
            .unwrap_or(error_body);

        match status_code {
            400 => Error::bad_request(error_message),
            401 => Error::authentication(error_message),
            403 => Error::permission(error_message),
            404 => Error::not_found(error_message),
            408 => Error::timeout(error_message, None),
            429 => Error::rate_limit(error_message, retry_after),
            500 => Error::internal_server(error_message),
            502..=504 => Error::service_unavailable(error_message, retry_after),
            _ => Error::api(status_code, error_type, error_message),
        }
    }

    /// Send a single-turn request and return the parsed response.
    pub async fn generate(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.endpoint()?;
        debug!(model = %self.model, "sending generateContent request");

        let response = self
            .client
            .post(url)
            .headers(self.default_headers()?)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {}", e),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
                }
            })?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        let body = response.text().await.map_err(|e| {
            Error::http_client(
                format!("Failed to read response: {}", e),
                Some(Box::new(e)),
            )
        })?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait::async_trait]
impl Complete for Gemini {
    async fn complete(&self, prompt: &str) -> Result<String> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = self
            .generate(&GenerateContentRequest::single_turn(prompt))
            .await
            .and_then(|response| {
                response
                    .first_text()
                    .ok_or_else(|| Error::empty_completion("response carried no candidate text"))
            });
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        if let Err(err) = &result {
            CLIENT_REQUEST_ERRORS.click();
            warn!(model = %self.model, error = %err, "completion failed");
        }
        result
    }
}

fn resolve_api_key() -> Result<String> {
    API_KEY_VARS
        .iter()
        .find_map(|var| env::var(var).ok().filter(|key| !key.trim().is_empty()))
        .ok_or_else(|| {
            Error::authentication(
                "API key not provided and neither GEMINI_API_KEY nor GOOGLE_API_KEY is set",
            )
        })
}
