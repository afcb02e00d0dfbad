//! Transactional email through an email provider.

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

const SERVICE: &str = "email";

const ACTIONS: &[ActionSpec] = &[ActionSpec::admin("send_email")];

const MAX_RECIPIENTS: usize = 50;

fn default_base_url() -> String {
    "https://api.resend.com".to_string()
}

/// Settings for the email provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_key: String,
    /// Sender address, e.g. `People Team <people@example.com>`.
    pub from: String,
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("from", &self.from)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(address) => vec![address],
            Self::Many(addresses) => addresses,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendEmailFields {
    to: Recipients,
    subject: String,
    html: Option<String>,
    text: Option<String>,
}

fn validate_recipients(recipients: Vec<String>) -> Result<Vec<String>, ProxyError> {
    let recipients: Vec<String> = recipients
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();

    if recipients.is_empty() {
        return Err(ProxyError::invalid_request("`to` is required"));
    }
    if recipients.len() > MAX_RECIPIENTS {
        return Err(ProxyError::invalid_request(format!(
            "at most {MAX_RECIPIENTS} recipients are allowed"
        )));
    }
    if let Some(bad) = recipients.iter().find(|r| !looks_like_address(r)) {
        return Err(ProxyError::invalid_request(format!(
            "invalid recipient address: {bad}"
        )));
    }
    Ok(recipients)
}

fn looks_like_address(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !address.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// The `email` proxy function.
#[derive(Debug, Clone)]
pub struct EmailFunction {
    config: EmailConfig,
    upstream: UpstreamClient,
}

impl EmailFunction {
    /// Creates the function.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: EmailConfig) -> Result<Self, ProxyError> {
        let upstream = UpstreamClient::new(SERVICE, config.base_url.clone())?;
        Ok(Self { config, upstream })
    }
}

#[async_trait]
impl ProxyFunction for EmailFunction {
    fn name(&self) -> &'static str {
        "email"
    }

    fn actions(&self) -> &'static [ActionSpec] {
        ACTIONS
    }

    async fn invoke(
        &self,
        caller: &Caller,
        request: &ProxyRequest,
    ) -> Result<JsonValue, ProxyError> {
        if request.action() != "send_email" {
            return Err(ProxyError::UnknownAction {
                action: request.action().to_string(),
            });
        }

        let fields: SendEmailFields = request.params_as()?;
        let to = validate_recipients(fields.to.into_vec())?;
        let subject = required(&fields.subject, "subject")?;
        if fields.html.is_none() && fields.text.is_none() {
            return Err(ProxyError::invalid_request("one of `html` or `text` is required"));
        }

        let mut body = json!({
            "from": self.config.from,
            "to": to,
            "subject": subject,
        });
        if let Some(html) = &fields.html {
            body["html"] = json!(html);
        }
        if let Some(text) = &fields.text {
            body["text"] = json!(text);
        }

        let response = self
            .upstream
            .send_json(
                self.upstream
                    .request(Method::POST, "/emails")
                    .bearer_auth(&self.config.api_key)
                    .json(&body),
            )
            .await?;

        info!(sent_by = %caller.identity().id(), recipients = to.len(), "email sent");
        Ok(json!({ "id": response.get("id").cloned().unwrap_or(JsonValue::Null) }))
    }
}
