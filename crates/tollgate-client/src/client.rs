//! Tollgate HTTP client implementation.

use reqwest::Client;
use std::time::Duration;

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, BalanceResponse, ConsumeOutcome, ConsumeRequest, EntriesResponse,
    GrantRequest, OperationResponse,
};

/// Tollgate API client.
///
/// Provides methods for consuming credits, granting credits (with an admin
/// key), and reading balances and ledger history.
#[derive(Debug, Clone)]
pub struct TollgateClient {
    client: Client,
    base_url: String,
    api_key: String,
    admin_key: Option<String>,
    tool_name: String,
}

impl TollgateClient {
    /// Create a new tollgate client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the tollgate service (e.g., `"http://tollgate:8080"`)
    /// * `api_key` - Tool API key for authentication
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with
    /// default settings).
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_options(base_url, api_key, ClientOptions::default())
    }

    /// Create a new tollgate client with custom options.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with
    /// default settings).
    #[must_use]
    pub fn with_options(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        options: ClientOptions,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            admin_key: options.admin_key,
            tool_name: options.tool_name,
        }
    }

    /// Consume credits from an account.
    ///
    /// Retries with the same `idempotency_key` are safe; the server replays
    /// the recorded outcome instead of double-charging.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an
    /// error, including `ClientError::InsufficientCredits` when the account
    /// cannot cover the debit.
    pub async fn consume(&self, request: ConsumeRequest) -> Result<OperationResponse, ClientError> {
        let url = format!("{}/v1/credits/consume", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("x-tool-name", &self.tool_name)
            .json(&request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Consume credits, treating an insufficient balance as an outcome
    /// rather than an error.
    ///
    /// # Errors
    ///
    /// Returns an error for every failure except `insufficient_credits`.
    pub async fn try_consume(&self, request: ConsumeRequest) -> Result<ConsumeOutcome, ClientError> {
        match self.consume(request).await {
            Ok(response) => Ok(ConsumeOutcome::Applied(response)),
            Err(ClientError::InsufficientCredits {
                balance,
                required,
                shortfall,
            }) => Ok(ConsumeOutcome::InsufficientCredits {
                balance,
                required,
                shortfall,
            }),
            Err(err) => Err(err),
        }
    }

    /// Grant credits to an account. Requires a configured admin key.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` when no admin key is set, or
    /// the server's error otherwise.
    pub async fn grant(&self, request: GrantRequest) -> Result<OperationResponse, ClientError> {
        let admin_key = self
            .admin_key
            .as_ref()
            .ok_or_else(|| ClientError::Configuration("no admin key configured".into()))?;

        let url = format!("{}/v1/credits/grant", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-admin-key", admin_key)
            .json(&request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get an account's current balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn balance(&self, account_id: &str) -> Result<BalanceResponse, ClientError> {
        let url = format!("{}/v1/credits/balance/{account_id}", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// List an account's ledger entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn entries(
        &self,
        account_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<EntriesResponse, ClientError> {
        let url = format!(
            "{}/v1/credits/entries/{account_id}?limit={limit}&offset={offset}",
            self.base_url
        );

        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        // Try to parse error response
        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let code = api_error.error.code.as_str();
                let message = api_error.error.message;

                let detail = |key: &str| {
                    api_error
                        .error
                        .details
                        .as_ref()
                        .and_then(|d| d.get(key))
                        .and_then(serde_json::Value::as_i64)
                        .unwrap_or(0)
                };

                // Map specific error codes to typed errors
                match code {
                    "insufficient_credits" => Err(ClientError::InsufficientCredits {
                        balance: detail("current_balance"),
                        required: detail("required"),
                        shortfall: detail("shortfall"),
                    }),
                    "concurrency_timeout" => Err(ClientError::ConcurrencyTimeout(message)),
                    "not_found" if message.contains("account") => {
                        Err(ClientError::AccountNotFound {
                            account_id: message.replace("account not found: ", ""),
                        })
                    }
                    _ => Err(ClientError::Api {
                        code: code.to_string(),
                        message,
                        status: status.as_u16(),
                    }),
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Tool name to include in requests.
    pub tool_name: String,
    /// Admin key for grant operations (optional).
    pub admin_key: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            tool_name: "unknown".to_string(),
            admin_key: None,
        }
    }
}

impl ClientOptions {
    /// Create options with a tool name.
    #[must_use]
    pub fn with_tool_name(name: impl Into<String>) -> Self {
        Self {
            tool_name: name.into(),
            ..Self::default()
        }
    }

    /// Set the admin key for grant operations.
    #[must_use]
    pub fn admin_key(mut self, key: impl Into<String>) -> Self {
        self.admin_key = Some(key.into());
        self
    }
}

/// Generate an idempotency key from caller-chosen parts.
///
/// Appends the current unix timestamp (hex) and a random suffix, so two
/// calls with the same parts still produce distinct keys. Use a stored key,
/// not a fresh one, when retrying a failed request.
#[must_use]
pub fn generate_idempotency_key(parts: &[&str]) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let suffix: u32 = rand::random();
    let mut key = parts.join("-");
    if !key.is_empty() {
        key.push('-');
    }
    key.push_str(&format!("{timestamp:x}-{suffix:08x}"));
    key
}
