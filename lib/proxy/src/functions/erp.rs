//! ERP report access for admin dashboards.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::fmt;

use crate::envelope::{Caller, ProxyRequest, path_segment};
use crate::error::ProxyError;
use crate::function::{ActionSpec, ProxyFunction};
use crate::upstream::UpstreamClient;

const SERVICE: &str = "erp";

const ACTIONS: &[ActionSpec] = &[
    ActionSpec::admin("list_reports"),
    ActionSpec::admin("fetch_report"),
];

/// Settings for the ERP API.
#[derive(Clone, Serialize, Deserialize)]
pub struct ErpConfig {
    pub base_url: String,
    pub api_key: String,
}

impl fmt::Debug for ErpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErpConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct FetchReportFields {
    report_id: String,
    period: Option<String>,
}

/// The `erp` proxy function.
#[derive(Debug, Clone)]
pub struct ErpFunction {
    config: ErpConfig,
    upstream: UpstreamClient,
}

impl ErpFunction {
    /// Creates the function.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ErpConfig) -> Result<Self, ProxyError> {
        let upstream = UpstreamClient::new(SERVICE, config.base_url.clone())?;
        Ok(Self { config, upstream })
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<JsonValue, ProxyError> {
        self.upstream
            .send_json(
                self.upstream
                    .request(Method::GET, path)
                    .bearer_auth(&self.config.api_key)
                    .query(query),
            )
            .await
    }
}

#[async_trait]
impl ProxyFunction for ErpFunction {
    fn name(&self) -> &'static str {
        "erp"
    }

    fn actions(&self) -> &'static [ActionSpec] {
        ACTIONS
    }

    async fn invoke(
        &self,
        _caller: &Caller,
        request: &ProxyRequest,
    ) -> Result<JsonValue, ProxyError> {
        match request.action() {
            "list_reports" => {
                let reports = self.get("/reports", &[]).await?;
                Ok(json!({ "reports": reports }))
            }
            "fetch_report" => {
                let fields: FetchReportFields = request.params_as()?;
                let report_id = path_segment(&fields.report_id, "report_id")?;
                let query: Vec<(&str, &str)> = fields
                    .period
                    .as_deref()
                    .map(|period| vec![("period", period)])
                    .unwrap_or_default();
                let report = self.get(&format!("/reports/{report_id}"), &query).await?;
                Ok(json!({ "report": report }))
            }
            other => Err(ProxyError::UnknownAction {
                action: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peoplehub_access::Identity;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn admin() -> Caller {
        Caller::new(Identity::new("admin-1", None), true)
    }

    fn function(server: &MockServer) -> ErpFunction {
        ErpFunction::new(ErpConfig {
            base_url: server.uri(),
            api_key: "erp-key".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn list_reports_wraps_upstream_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reports"))
            .and(header("authorization", "Bearer erp-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "id": "headcount" }])),
            )
            .mount(&server)
            .await;

        let result = function(&server)
            .invoke(
                &admin(),
                &ProxyRequest::from_value(json!({ "action": "list_reports" })).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(result, json!({ "reports": [{ "id": "headcount" }] }));
    }

    #[tokio::test]
    async fn fetch_report_forwards_period() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reports/turnover"))
            .and(query_param("period", "2024-Q1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rate": 0.04 })))
            .mount(&server)
            .await;

        let result = function(&server)
            .invoke(
                &admin(),
                &ProxyRequest::from_value(json!({
                    "action": "fetch_report",
                    "report_id": "turnover",
                    "period": "2024-Q1"
                }))
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(result["report"]["rate"], 0.04);
    }

    #[tokio::test]
    async fn report_id_cannot_escape_the_path() {
        let server = MockServer::start().await;
        let err = function(&server)
            .invoke(
                &admin(),
                &ProxyRequest::from_value(json!({
                    "action": "fetch_report",
                    "report_id": "../users"
                }))
                .unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidRequest { .. }));
    }

    #[test]
    fn every_action_is_admin_only() {
        let function = ErpFunction::new(ErpConfig {
            base_url: "http://localhost".to_string(),
            api_key: "k".to_string(),
        })
        .unwrap();
        assert!(
            function
                .actions()
                .iter()
                .all(|a| a.requirement == peoplehub_access::AccessRequirement::Admin)
        );
    }
}
