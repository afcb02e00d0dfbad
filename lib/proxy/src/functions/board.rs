//! Task board access (boards, cards) for onboarding checklists.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::fmt;

use crate::envelope::{Caller, ProxyRequest, path_segment, required};
use crate::error::ProxyError;
use crate::function::{ActionSpec, ProxyFunction};
use crate::upstream::UpstreamClient;

const SERVICE: &str = "board";

const ACTIONS: &[ActionSpec] = &[
    ActionSpec::authenticated("list_boards"),
    ActionSpec::authenticated("list_cards"),
    ActionSpec::authenticated("create_card"),
];

fn default_base_url() -> String {
    "https://api.trello.com/1".to_string()
}

/// Settings for the board API.
#[derive(Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub key: String,
    pub token: String,
}

impl fmt::Debug for BoardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardConfig")
            .field("base_url", &self.base_url)
            .field("key", &"<redacted>")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ListCardsFields {
    board_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateCardFields {
    list_id: String,
    name: String,
    #[serde(default)]
    description: String,
    due: Option<String>,
}

/// The `board` proxy function.
#[derive(Debug, Clone)]
pub struct BoardFunction {
    config: BoardConfig,
    upstream: UpstreamClient,
}

impl BoardFunction {
    /// Creates the function.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: BoardConfig) -> Result<Self, ProxyError> {
        let upstream = UpstreamClient::new(SERVICE, config.base_url.clone())?;
        Ok(Self { config, upstream })
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<JsonValue, ProxyError> {
        let auth = [
            ("key", self.config.key.as_str()),
            ("token", self.config.token.as_str()),
        ];
        self.upstream
            .send_json(
                self.upstream
                    .request(method, path)
                    .query(&auth)
                    .query(params),
            )
            .await
    }
}

#[async_trait]
impl ProxyFunction for BoardFunction {
    fn name(&self) -> &'static str {
        "board"
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
            "list_boards" => {
                let boards = self
                    .call(
                        Method::GET,
                        "/members/me/boards",
                        &[("fields", "name,url,closed")],
                    )
                    .await?;
                Ok(json!({ "boards": boards }))
            }
            "list_cards" => {
                let fields: ListCardsFields = request.params_as()?;
                let board_id = path_segment(&fields.board_id, "board_id")?;
                let cards = self
                    .call(
                        Method::GET,
                        &format!("/boards/{board_id}/cards"),
                        &[("fields", "name,desc,due,idList,url")],
                    )
                    .await?;
                Ok(json!({ "cards": cards }))
            }
            "create_card" => {
                let fields: CreateCardFields = request.params_as()?;
                let list_id = path_segment(&fields.list_id, "list_id")?;
                let name = required(&fields.name, "name")?;
                let mut params = vec![
                    ("idList", list_id),
                    ("name", name),
                    ("desc", fields.description.as_str()),
                ];
                if let Some(due) = fields.due.as_deref() {
                    params.push(("due", due));
                }
                let card = self.call(Method::POST, "/cards", &params).await?;
                Ok(json!({ "card": card }))
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
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn function(server: &MockServer) -> BoardFunction {
        BoardFunction::new(BoardConfig {
            base_url: server.uri(),
            key: "board-key".to_string(),
            token: "board-token".to_string(),
        })
        .unwrap()
    }

    fn employee() -> Caller {
        Caller::new(Identity::new("emp-1", None), false)
    }

    fn request(body: JsonValue) -> ProxyRequest {
        ProxyRequest::from_value(body).unwrap()
    }

    #[test]
    fn debug_hides_credentials() {
        let function = BoardFunction::new(BoardConfig {
            base_url: "http://localhost".to_string(),
            key: "board-key".to_string(),
            token: "board-token".to_string(),
        })
        .unwrap();
        let rendered = format!("{function:?}");
        assert!(!rendered.contains("board-key"));
        assert!(!rendered.contains("board-token"));
    }

    #[tokio::test]
    async fn list_boards_sends_credentials_as_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/members/me/boards"))
            .and(query_param("key", "board-key"))
            .and(query_param("token", "board-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "id": "b1", "name": "Onboarding" }])),
            )
            .mount(&server)
            .await;

        let result = function(&server)
            .invoke(&employee(), &request(json!({ "action": "list_boards" })))
            .await
            .unwrap();

        assert_eq!(result["boards"][0]["name"], "Onboarding");
    }

    #[tokio::test]
    async fn create_card_maps_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cards"))
            .and(query_param("idList", "list-9"))
            .and(query_param("name", "Laptop setup"))
            .and(query_param("desc", "Order and configure"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "c1" })))
            .expect(1)
            .mount(&server)
            .await;

        let result = function(&server)
            .invoke(
                &employee(),
                &request(json!({
                    "action": "create_card",
                    "list_id": "list-9",
                    "name": "Laptop setup",
                    "description": "Order and configure"
                })),
            )
            .await
            .unwrap();

        assert_eq!(result, json!({ "card": { "id": "c1" } }));
    }

    #[tokio::test]
    async fn list_cards_requires_board_id() {
        let server = MockServer::start().await;
        let err = function(&server)
            .invoke(&employee(), &request(json!({ "action": "list_cards" })))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn board_rate_limit_surfaces_as_429() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/boards/b1/cards"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = function(&server)
            .invoke(
                &employee(),
                &request(json!({ "action": "list_cards", "board_id": "b1" })),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProxyError::RateLimited {
                service: "board".to_string(),
                retry_after_secs: None
            }
        );
    }
}
