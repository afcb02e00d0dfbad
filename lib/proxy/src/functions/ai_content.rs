//! AI-assisted HR content generation over an OpenAI-compatible chat API.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::fmt;
use tracing::debug;

use crate::ai_json::extract_json_object;
use crate::envelope::{Caller, ProxyRequest, required};
use crate::error::ProxyError;
use crate::function::{ActionSpec, ProxyFunction};
use crate::upstream::UpstreamClient;

const SERVICE: &str = "ai";

const ACTIONS: &[ActionSpec] = &[
    ActionSpec::authenticated("job_description"),
    ActionSpec::authenticated("onboarding_plan"),
    ActionSpec::authenticated("announcement"),
    ActionSpec::authenticated("complaint_summary"),
];

const SYSTEM_PROMPT: &str = "You are an assistant for an HR team. \
Answer with a single JSON object and nothing else.";

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.4
}

/// Settings for the language-model provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct AiContentConfig {
    /// Base URL of the chat-completions API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl fmt::Debug for AiContentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiContentConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl AiContentConfig {
    /// Creates a config with default endpoint and model.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            api_key: api_key.into(),
            model: default_model(),
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JobDescriptionFields {
    title: String,
    department: Option<String>,
    seniority: Option<String>,
    #[serde(default)]
    highlights: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OnboardingPlanFields {
    employee_name: String,
    role: String,
    start_date: Option<String>,
    #[serde(default = "default_weeks")]
    weeks: u8,
}

fn default_weeks() -> u8 {
    4
}

#[derive(Debug, Deserialize)]
struct AnnouncementFields {
    topic: String,
    audience: Option<String>,
    tone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ComplaintSummaryFields {
    description: String,
}

/// Builds the user prompt for `request`.
fn build_prompt(request: &ProxyRequest) -> Result<String, ProxyError> {
    match request.action() {
        "job_description" => {
            let fields: JobDescriptionFields = request.params_as()?;
            let title = required(&fields.title, "title")?;
            let mut prompt = format!("Write a job description for the position \"{title}\"");
            if let Some(department) = &fields.department {
                prompt.push_str(&format!(" in the {department} department"));
            }
            if let Some(seniority) = &fields.seniority {
                prompt.push_str(&format!(" at {seniority} level"));
            }
            prompt.push('.');
            if !fields.highlights.is_empty() {
                prompt.push_str(&format!(" Emphasize: {}.", fields.highlights.join("; ")));
            }
            prompt.push_str(
                " Respond as {\"title\": string, \"summary\": string, \
                 \"responsibilities\": [string], \"requirements\": [string]}.",
            );
            Ok(prompt)
        }
        "onboarding_plan" => {
            let fields: OnboardingPlanFields = request.params_as()?;
            let name = required(&fields.employee_name, "employee_name")?;
            let role = required(&fields.role, "role")?;
            if !(1..=12).contains(&fields.weeks) {
                return Err(ProxyError::invalid_request("`weeks` must be between 1 and 12"));
            }
            let start = fields
                .start_date
                .as_deref()
                .map(|d| format!(" starting on {d}"))
                .unwrap_or_default();
            Ok(format!(
                "Create a {weeks}-week onboarding plan for {name}, joining as {role}{start}. \
                 Respond as {{\"weeks\": [{{\"week\": number, \"goals\": [string], \
                 \"activities\": [string]}}]}}.",
                weeks = fields.weeks,
            ))
        }
        "announcement" => {
            let fields: AnnouncementFields = request.params_as()?;
            let topic = required(&fields.topic, "topic")?;
            let audience = fields.audience.as_deref().unwrap_or("all employees");
            let tone = fields.tone.as_deref().unwrap_or("friendly and professional");
            Ok(format!(
                "Write an internal announcement about \"{topic}\" for {audience}, \
                 in a {tone} tone. Respond as {{\"subject\": string, \"body\": string}}."
            ))
        }
        "complaint_summary" => {
            let fields: ComplaintSummaryFields = request.params_as()?;
            let description = required(&fields.description, "description")?;
            Ok(format!(
                "Summarize this workplace complaint for the ombudsman without adding \
                 names that are not in the text. Respond as {{\"summary\": string, \
                 \"category\": string, \"severity\": \"low\" | \"medium\" | \"high\"}}.\n\n\
                 Complaint:\n{description}"
            ))
        }
        other => Err(ProxyError::UnknownAction {
            action: other.to_string(),
        }),
    }
}

/// The `ai-content` proxy function.
#[derive(Debug, Clone)]
pub struct AiContentFunction {
    config: AiContentConfig,
    upstream: UpstreamClient,
}

impl AiContentFunction {
    /// Creates the function.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: AiContentConfig) -> Result<Self, ProxyError> {
        let upstream = UpstreamClient::new(SERVICE, config.base_url.clone())?;
        Ok(Self { config, upstream })
    }

    async fn complete(&self, prompt: String) -> Result<String, ProxyError> {
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        });
        let response = self
            .upstream
            .send_json(
                self.upstream
                    .request(Method::POST, "/chat/completions")
                    .bearer_auth(&self.config.api_key)
                    .json(&body),
            )
            .await?;

        response["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProxyError::InvalidUpstreamResponse {
                service: SERVICE.to_string(),
                reason: "missing choices[0].message.content".to_string(),
            })
    }
}

#[async_trait]
impl ProxyFunction for AiContentFunction {
    fn name(&self) -> &'static str {
        "ai-content"
    }

    fn actions(&self) -> &'static [ActionSpec] {
        ACTIONS
    }

    async fn invoke(
        &self,
        _caller: &Caller,
        request: &ProxyRequest,
    ) -> Result<JsonValue, ProxyError> {
        let prompt = build_prompt(request)?;
        let content = self.complete(prompt).await?;
        debug!(action = request.action(), chars = content.len(), "model output received");
        Ok(JsonValue::Object(extract_json_object(&content)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peoplehub_access::Identity;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn caller() -> Caller {
        Caller::new(Identity::new("u1", None), false)
    }

    fn function(server: &MockServer) -> AiContentFunction {
        let mut config = AiContentConfig::new("sk-test");
        config.base_url = server.uri();
        AiContentFunction::new(config).unwrap()
    }

    fn completion(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
    }

    fn request(body: JsonValue) -> ProxyRequest {
        ProxyRequest::from_value(body).unwrap()
    }

    #[test]
    fn job_description_prompt_mentions_inputs() {
        let prompt = build_prompt(&request(json!({
            "action": "job_description",
            "title": "Payroll Analyst",
            "department": "Finance",
            "highlights": ["remote", "SAP"]
        })))
        .unwrap();

        assert!(prompt.contains("\"Payroll Analyst\""));
        assert!(prompt.contains("Finance department"));
        assert!(prompt.contains("remote; SAP"));
    }

    #[test]
    fn blank_required_field_is_rejected() {
        let err = build_prompt(&request(json!({ "action": "announcement", "topic": "  " })))
            .unwrap_err();
        assert_eq!(err.message(), "`topic` is required");
    }

    #[test]
    fn onboarding_weeks_are_bounded() {
        let err = build_prompt(&request(json!({
            "action": "onboarding_plan",
            "employee_name": "Ana",
            "role": "Recruiter",
            "weeks": 40
        })))
        .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn fenced_model_output_is_recovered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
            .respond_with(completion(
                "```json\n{\"subject\": \"Office move\", \"body\": \"We move on Monday.\"}\n```",
            ))
            .mount(&server)
            .await;

        let result = function(&server)
            .invoke(
                &caller(),
                &request(json!({ "action": "announcement", "topic": "Office move" })),
            )
            .await
            .unwrap();

        assert_eq!(
            result,
            json!({ "subject": "Office move", "body": "We move on Monday." })
        );
    }

    #[tokio::test]
    async fn unparseable_model_output_is_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(completion("I cannot help with that."))
            .mount(&server)
            .await;

        let err = function(&server)
            .invoke(
                &caller(),
                &request(json!({ "action": "complaint_summary", "description": "Noise" })),
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_body(), json!({ "error": "invalid AI response" }));
        assert_eq!(err.status_code(), reqwest::StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn provider_rate_limit_is_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "20"))
            .mount(&server)
            .await;

        let err = function(&server)
            .invoke(
                &caller(),
                &request(json!({ "action": "announcement", "topic": "Holidays" })),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err.to_body(),
            json!({ "error": "ai rate limit reached, retry later", "retry_after_secs": 20 })
        );
    }

    #[test]
    fn config_defaults_apply_when_deserialized() {
        let config: AiContentConfig = serde_json::from_value(json!({ "api_key": "k" })).unwrap();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-4o-mini");
    }
}
