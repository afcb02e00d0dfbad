//! Table reads through the platform's REST interface.

use async_trait::async_trait;
use peoplehub_access::{QueryError, TableQuery, TableSource};
use peoplehub_core::Result;
use reqwest::Method;
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

use crate::client::{PlatformClient, read_json};
use crate::error::BackendError;

/// [`TableSource`] backed by `GET /rest/v1/<table>`.
#[derive(Debug, Clone)]
pub struct RestTableClient {
    client: PlatformClient,
    access_token: Option<String>,
}

impl RestTableClient {
    /// Creates a client reading with the public key only.
    #[must_use]
    pub fn new(client: PlatformClient) -> Self {
        Self {
            client,
            access_token: None,
        }
    }

    /// Reads as the holder of `access_token`.
    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    /// Fetches the rows matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a JSON array.
    #[instrument(skip(self), fields(table = %query.table))]
    pub async fn fetch_rows(&self, query: &TableQuery) -> Result<Vec<JsonValue>, BackendError> {
        if !is_valid_table_name(&query.table) {
            return Err(BackendError::InvalidConfig {
                details: format!("invalid table name '{}'", query.table),
            }
            .into());
        }

        let bearer = self
            .access_token
            .as_deref()
            .unwrap_or_else(|| self.client.config().anon_key());

        let response = self
            .client
            .request(Method::GET, &format!("/rest/v1/{}", query.table))
            .bearer_auth(bearer)
            .query(&query_params(query))
            .send()
            .await
            .map_err(|e| BackendError::request(&e))?;

        let rows: Vec<JsonValue> = read_json(response).await?;
        debug!(rows = rows.len(), "table read complete");
        Ok(rows)
    }
}

fn is_valid_table_name(table: &str) -> bool {
    !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn query_params(query: &TableQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(
        query
            .filters
            .iter()
            .map(|(column, value)| (column.clone(), format!("eq.{}", value))),
    );
    if let Some((column, ascending)) = &query.order {
        let direction = if *ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", column, direction)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

#[async_trait]
impl TableSource for RestTableClient {
    async fn select(&self, query: &TableQuery) -> std::result::Result<Vec<JsonValue>, QueryError> {
        self.fetch_rows(query)
            .await
            .map_err(|report| QueryError::Unavailable {
                table: query.table.clone(),
                reason: report.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::PlatformConfig;
    use peoplehub_access::{PortalTable, QueryCell, QueryKey, QueryState, load_table};
    use serde::Deserialize;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tables(server: &MockServer) -> RestTableClient {
        let config = PlatformConfig::new(server.uri(), "anon-key").unwrap();
        RestTableClient::new(PlatformClient::new(config).unwrap())
    }

    #[test]
    fn params_encode_filters_order_and_limit() {
        let query = TableQuery::table("time_bank_entries")
            .eq("employee_id", "e-1")
            .order_by("entry_date", false)
            .limit(20);

        assert_eq!(
            query_params(&query),
            vec![
                ("select".to_string(), "*".to_string()),
                ("employee_id".to_string(), "eq.e-1".to_string()),
                ("order".to_string(), "entry_date.desc".to_string()),
                ("limit".to_string(), "20".to_string()),
            ]
        );
    }

    #[test]
    fn table_names_are_restricted() {
        assert!(is_valid_table_name("ombudsman_tickets"));
        assert!(!is_valid_table_name("employees?select=salary"));
        assert!(!is_valid_table_name("../auth"));
        assert!(!is_valid_table_name(""));
    }

    #[tokio::test]
    async fn select_returns_rows_with_user_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/employees"))
            .and(query_param("select", "*"))
            .and(query_param("department", "eq.HR"))
            .and(header("authorization", "Bearer user-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "id": 1, "name": "Ana" }])),
            )
            .mount(&server)
            .await;

        let rows = tables(&server)
            .with_access_token("user-token")
            .select(&TableQuery::portal(PortalTable::Employees).eq("department", "HR"))
            .await
            .unwrap();

        assert_eq!(rows, vec![json!({ "id": 1, "name": "Ana" })]);
    }

    #[tokio::test]
    async fn failure_maps_to_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/employees"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = tables(&server)
            .select(&TableQuery::portal(PortalTable::Employees))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Unavailable { ref table, .. } if table == "employees"));
    }

    #[tokio::test]
    async fn drives_a_view_cell() {
        #[derive(Debug, Clone, PartialEq, Deserialize)]
        struct Ticket {
            subject: String,
        }

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/ombudsman_tickets"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "subject": "Parking" }])),
            )
            .mount(&server)
            .await;

        let cell: QueryCell<Ticket> = QueryCell::new(QueryKey::new("ombudsman"));
        let source = tables(&server);
        load_table(&cell, &source, &TableQuery::portal(PortalTable::OmbudsmanTickets)).await;

        assert_eq!(
            cell.state(),
            QueryState::Ready(vec![Ticket {
                subject: "Parking".to_string()
            }])
        );
    }
}
