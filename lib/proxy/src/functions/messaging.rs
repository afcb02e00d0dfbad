//! Outbound messages through a messaging gateway.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::fmt;
use tracing::info;

use crate::envelope::{Caller, ProxyRequest, required};
use crate::error::ProxyError;
use crate::function::{ActionSpec, ProxyFunction};
use crate::upstream::UpstreamClient;

const SERVICE: &str = "messaging";

const ACTIONS: &[ActionSpec] = &[ActionSpec::admin("send_message")];

const MAX_TEXT_LEN: usize = 4096;

/// Settings for the messaging gateway.
#[derive(Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    pub base_url: String,
    /// Bearer token for the gateway.
    pub token: String,
    /// Sender number or id registered with the gateway.
    pub sender: String,
}

impl fmt::Debug for MessagingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagingConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("sender", &self.sender)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct SendMessageFields {
    to: String,
    text: String,
}

/// Normalizes a phone number to `+` and 8 to 15 digits.
fn normalize_recipient(raw: &str) -> Result<String, ProxyError> {
    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    let digits = digits.strip_prefix('+').unwrap_or(&digits);
    if (8..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(format!("+{digits}"))
    } else {
        Err(ProxyError::invalid_request(
            "`to` must be a phone number in international format",
        ))
    }
}

/// The `messaging` proxy function.
#[derive(Debug, Clone)]
pub struct MessagingFunction {
    config: MessagingConfig,
    upstream: UpstreamClient,
}

impl MessagingFunction {
    /// Creates the function.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: MessagingConfig) -> Result<Self, ProxyError> {
        let upstream = UpstreamClient::new(SERVICE, config.base_url.clone())?;
        Ok(Self { config, upstream })
    }
}

#[async_trait]
impl ProxyFunction for MessagingFunction {
    fn name(&self) -> &'static str {
        "messaging"
    }

    fn actions(&self) -> &'static [ActionSpec] {
        ACTIONS
    }

    async fn invoke(
        &self,
        caller: &Caller,
        request: &ProxyRequest,
    ) -> Result<JsonValue, ProxyError> {
        if request.action() != "send_message" {
            return Err(ProxyError::UnknownAction {
                action: request.action().to_string(),
            });
        }

        let fields: SendMessageFields = request.params_as()?;
        let to = normalize_recipient(&fields.to)?;
        let text = required(&fields.text, "text")?;
        if text.chars().count() > MAX_TEXT_LEN {
            return Err(ProxyError::invalid_request(format!(
                "`text` exceeds {MAX_TEXT_LEN} characters"
            )));
        }

        let response = self
            .upstream
            .send_json(
                self.upstream
                    .request(Method::POST, "/messages")
                    .bearer_auth(&self.config.token)
                    .json(&json!({ "from": self.config.sender, "to": to, "text": text })),
            )
            .await?;

        let message_id = response
            .get("id")
            .or_else(|| response.pointer("/messages/0/id"))
            .cloned()
            .unwrap_or(JsonValue::Null);
        info!(sent_by = %caller.identity().id(), "message sent");
        Ok(json!({ "sent": true, "message_id": message_id }))
    }
}
