//! Remote command gateway over HTTP
//!
//! Each command is a `POST {base_url}/commands/{command}` carrying the
//! argument object as its JSON body. Read-only commands are retried on
//! transient failures; writes and uploads are sent exactly once.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::gateway::{Command, CommandGateway, GatewayError};
use crate::config::SyncConfig;
use crate::utils::http::{with_retry, RetryConfig};

pub struct HttpGateway {
    client: Client,
    base_url: String,
    token: Option<String>,
    retry: RetryConfig,
}

impl HttpGateway {
    pub fn new(config: &SyncConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(client, config))
    }

    /// Create a gateway with an existing reqwest client
    pub fn with_client(client: Client, config: &SyncConfig) -> Self {
        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: None,
            retry: config.retry.clone(),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn command_url(&self, command: Command) -> String {
        format!("{}/commands/{}", self.base_url, command.as_str())
    }

    async fn send_once(&self, command: Command, args: &Value) -> Result<Value, GatewayError> {
        let mut request = self.client.post(self.command_url(command)).json(args);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                status: Some(status.as_u16()),
                message,
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| GatewayError::rejected(format!("response is not JSON: {}", e)))
    }
}

#[async_trait]
impl CommandGateway for HttpGateway {
    async fn invoke(&self, command: Command, args: Value) -> Result<Value, GatewayError> {
        debug!("Invoking {} over HTTP", command);

        if !command.is_read_only() {
            return self.send_once(command, &args).await;
        }

        with_retry(
            &self.retry,
            command.as_str(),
            || self.send_once(command, &args),
            GatewayError::is_transient,
        )
        .await
    }
}
