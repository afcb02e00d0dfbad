//! Data-bound view state.
//!
//! A view declares a remote read by logical key and renders whatever state
//! its [`QueryCell`] is in. Reads that resolve after the view was torn down,
//! or after a newer read was started, are dropped instead of overwriting the
//! cell.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::error::QueryError;

/// Logical name of a remote read, e.g. `"employees"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(String);

impl QueryKey {
    /// Creates a query key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote tables backing the portal's views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortalTable {
    Employees,
    OnboardingTracks,
    TimeBankEntries,
    OmbudsmanTickets,
    UserRoles,
}

impl PortalTable {
    /// Returns the table name on the hosted database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employees => "employees",
            Self::OnboardingTracks => "onboarding_tracks",
            Self::TimeBankEntries => "time_bank_entries",
            Self::OmbudsmanTickets => "ombudsman_tickets",
            Self::UserRoles => "user_roles",
        }
    }
}

/// A filtered read against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub table: String,
    /// Equality filters as `(column, value)`.
    pub filters: Vec<(String, String)>,
    /// Ordering column and whether it is ascending.
    pub order: Option<(String, bool)>,
    pub limit: Option<u32>,
}

impl TableQuery {
    /// Selects every row of `table`.
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Selects from one of the portal's tables.
    #[must_use]
    pub fn portal(table: PortalTable) -> Self {
        Self::table(table.as_str())
    }

    /// Adds an equality filter.
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    /// Orders by `column`.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some((column.into(), ascending));
        self
    }

    /// Caps the number of rows returned.
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Something that can execute a [`TableQuery`].
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Returns matching rows as JSON objects.
    ///
    /// # Errors
    ///
    /// Returns an error if the read could not be completed.
    async fn select(&self, query: &TableQuery) -> Result<Vec<JsonValue>, QueryError>;
}

/// What a data-bound view renders.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    /// A read is in flight.
    Loading,
    /// The read succeeded with no rows.
    Empty,
    /// The read failed; the message is meant for an inline indicator.
    Failed(String),
    /// The read succeeded with at least one row.
    Ready(Vec<T>),
}

impl<T: Clone> QueryState<T> {
    /// Returns the rows, or an empty list for every other state.
    #[must_use]
    pub fn data_or_default(&self) -> Vec<T> {
        match self {
            Self::Ready(rows) => rows.clone(),
            _ => Vec::new(),
        }
    }

    /// Returns true while a read is pending.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Proof that a read was started; only the latest ticket can settle a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTicket(u64);

struct CellInner<T> {
    state: QueryState<T>,
    generation: u64,
    torn_down: bool,
}

/// State holder for one view's remote read.
pub struct QueryCell<T> {
    key: QueryKey,
    inner: Mutex<CellInner<T>>,
}

impl<T: Clone> QueryCell<T> {
    /// Creates a cell in the loading state.
    #[must_use]
    pub fn new(key: QueryKey) -> Self {
        Self {
            key,
            inner: Mutex::new(CellInner {
                state: QueryState::Loading,
                generation: 0,
                torn_down: false,
            }),
        }
    }

    /// Returns the cell's query key.
    #[must_use]
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    fn inner(&self) -> MutexGuard<'_, CellInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a read. Returns `None` once the view has been torn down.
    pub fn begin(&self) -> Option<QueryTicket> {
        let mut inner = self.inner();
        if inner.torn_down {
            return None;
        }
        inner.generation += 1;
        inner.state = QueryState::Loading;
        Some(QueryTicket(inner.generation))
    }

    /// Applies a read result if `ticket` is still current.
    ///
    /// Returns false when the result was dropped as stale.
    pub fn settle(&self, ticket: QueryTicket, result: Result<Vec<T>, QueryError>) -> bool {
        let mut inner = self.inner();
        if inner.torn_down || inner.generation != ticket.0 {
            debug!(key = %self.key, "dropping stale query result");
            return false;
        }
        inner.state = match result {
            Ok(rows) if rows.is_empty() => QueryState::Empty,
            Ok(rows) => QueryState::Ready(rows),
            Err(e) => {
                warn!(key = %self.key, error = %e, "query failed");
                QueryState::Failed(e.inline_message())
            }
        };
        true
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> QueryState<T> {
        self.inner().state.clone()
    }

    /// Marks the view as gone; later results are ignored.
    pub fn teardown(&self) {
        self.inner().torn_down = true;
    }

    /// Returns true once [`teardown`](Self::teardown) was called.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.inner().torn_down
    }
}

impl<T> fmt::Debug for QueryCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCell")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Runs `query` against `source` and settles `cell` with decoded rows.
///
/// Returns false if the cell was torn down or superseded meanwhile.
pub async fn load_table<T>(cell: &QueryCell<T>, source: &dyn TableSource, query: &TableQuery) -> bool
where
    T: Clone + DeserializeOwned,
{
    let Some(ticket) = cell.begin() else {
        return false;
    };

    let result = source.select(query).await.and_then(|rows| {
        rows.into_iter()
            .map(|row| {
                serde_json::from_value::<T>(row).map_err(|e| QueryError::Decode {
                    table: query.table.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<T>, QueryError>>()
    });

    cell.settle(ticket, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Notify;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Employee {
        name: String,
        department: String,
    }

    struct StaticSource(Result<Vec<JsonValue>, QueryError>);

    #[async_trait]
    impl TableSource for StaticSource {
        async fn select(&self, _query: &TableQuery) -> Result<Vec<JsonValue>, QueryError> {
            self.0.clone()
        }
    }

    /// Source that blocks until released, to simulate a slow read.
    struct GatedSource {
        release: Arc<Notify>,
        rows: Vec<JsonValue>,
    }

    #[async_trait]
    impl TableSource for GatedSource {
        async fn select(&self, _query: &TableQuery) -> Result<Vec<JsonValue>, QueryError> {
            self.release.notified().await;
            Ok(self.rows.clone())
        }
    }

    fn employees_cell() -> QueryCell<Employee> {
        QueryCell::new(QueryKey::new("employees"))
    }

    #[tokio::test]
    async fn rows_become_ready() {
        let cell = employees_cell();
        let source = StaticSource(Ok(vec![json!({"name": "Ana", "department": "HR"})]));

        assert!(load_table(&cell, &source, &TableQuery::portal(PortalTable::Employees)).await);

        assert_eq!(
            cell.state(),
            QueryState::Ready(vec![Employee {
                name: "Ana".to_string(),
                department: "HR".to_string()
            }])
        );
    }

    #[tokio::test]
    async fn no_rows_is_empty() {
        let cell = employees_cell();
        load_table(&cell, &StaticSource(Ok(vec![])), &TableQuery::table("employees")).await;
        assert_eq!(cell.state(), QueryState::Empty);
        assert!(cell.state().data_or_default().is_empty());
    }

    #[tokio::test]
    async fn failure_becomes_inline_indicator() {
        let cell = employees_cell();
        let source = StaticSource(Err(QueryError::Unavailable {
            table: "employees".to_string(),
            reason: "timeout".to_string(),
        }));

        load_table(&cell, &source, &TableQuery::table("employees")).await;

        assert_eq!(
            cell.state(),
            QueryState::Failed("Could not load employees".to_string())
        );
        assert!(cell.state().data_or_default().is_empty());
    }

    #[tokio::test]
    async fn undecodable_row_fails_the_read() {
        let cell = employees_cell();
        let source = StaticSource(Ok(vec![json!({"name": 7})]));

        load_table(&cell, &source, &TableQuery::table("employees")).await;

        assert!(matches!(cell.state(), QueryState::Failed(_)));
    }

    #[tokio::test]
    async fn result_after_teardown_is_dropped() {
        let cell = Arc::new(employees_cell());
        let release = Arc::new(Notify::new());
        let source = Arc::new(GatedSource {
            release: release.clone(),
            rows: vec![json!({"name": "Ana", "department": "HR"})],
        });

        let task = {
            let cell = cell.clone();
            let source = source.clone();
            tokio::spawn(async move {
                load_table(cell.as_ref(), source.as_ref(), &TableQuery::table("employees")).await
            })
        };

        tokio::task::yield_now().await;
        cell.teardown();
        release.notify_one();

        assert!(!task.await.expect("task completes"));
        assert!(cell.state().is_loading());
        assert!(cell.begin().is_none());
    }

    #[test]
    fn superseded_ticket_cannot_settle() {
        let cell = employees_cell();
        let first = cell.begin().expect("ticket");
        let second = cell.begin().expect("ticket");

        assert!(!cell.settle(first, Ok(vec![])));
        assert!(cell.state().is_loading());
        assert!(cell.settle(second, Ok(vec![])));
        assert_eq!(cell.state(), QueryState::Empty);
    }

    #[test]
    fn table_query_builder() {
        let query = TableQuery::portal(PortalTable::TimeBankEntries)
            .eq("employee_id", "e-1")
            .order_by("entry_date", false)
            .limit(50);

        assert_eq!(query.table, "time_bank_entries");
        assert_eq!(
            query.filters,
            vec![("employee_id".to_string(), "e-1".to_string())]
        );
        assert_eq!(query.order, Some(("entry_date".to_string(), false)));
        assert_eq!(query.limit, Some(50));
    }
}
