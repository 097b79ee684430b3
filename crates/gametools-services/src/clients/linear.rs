//! Linear GraphQL client

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use gametools_core::{AppError, AppResult, Config, Ticket};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::http::{Auth, HttpClient};
use crate::traits::{IssueTracker, TicketPage, TicketQuery};

const SERVICE: &str = "Linear";

const ISSUES_QUERY: &str = r#"query LaunchIssues($filter: IssueFilter, $first: Int!, $after: String) {
  issues(filter: $filter, first: $first, after: $after) {
    nodes { id identifier title url dueDate state { name } }
    pageInfo { hasNextPage endCursor }
  }
}"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<IssuesData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct IssuesData {
    issues: IssueConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueConnection {
    nodes: Vec<IssueNode>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueNode {
    id: String,
    #[serde(default)]
    identifier: String,
    title: String,
    url: Option<String>,
    due_date: Option<NaiveDate>,
    state: Option<StateNode>,
}

#[derive(Debug, Deserialize)]
struct StateNode {
    name: String,
}

/// Build the `IssueFilter` object for a query
fn issue_filter(query: &TicketQuery) -> Value {
    let mut filter = Map::new();

    if let Some(date) = query.due_date {
        filter.insert(
            "dueDate".to_string(),
            json!({ "eq": date.format("%Y-%m-%d").to_string() }),
        );
    }
    if let Some(label) = &query.label {
        filter.insert("labels".to_string(), json!({ "name": { "eq": label } }));
    }

    let mut state_name = Map::new();
    if let Some(state) = &query.state {
        state_name.insert("eq".to_string(), json!(state));
    }
    if !query.excluded_states.is_empty() {
        state_name.insert("nin".to_string(), json!(query.excluded_states));
    }
    if !state_name.is_empty() {
        filter.insert("state".to_string(), json!({ "name": state_name }));
    }

    Value::Object(filter)
}

pub struct LinearClient {
    http: HttpClient,
    api_url: String,
    issue_url_base: String,
}

impl fmt::Debug for LinearClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearClient")
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl LinearClient {
    pub fn new(api_url: &str, issue_url_base: &str, timeout_secs: u64) -> AppResult<Self> {
        Ok(Self {
            http: HttpClient::new(SERVICE, timeout_secs)?,
            api_url: api_url.to_string(),
            issue_url_base: issue_url_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            &config.linear_api_url,
            &config.linear_issue_url_base,
            config.http_timeout_secs,
        )
    }

    fn to_ticket(&self, node: IssueNode) -> Ticket {
        let url = node
            .url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| format!("{}/{}", self.issue_url_base, node.id));
        Ticket {
            id: node.id,
            identifier: node.identifier,
            title: node.title,
            url,
            due_date: node.due_date,
            state: node.state.map(|s| s.name).unwrap_or_default(),
        }
    }
}

#[async_trait]
impl IssueTracker for LinearClient {
    async fn fetch_page(
        &self,
        api_key: &str,
        query: &TicketQuery,
        first: u32,
        after: Option<&str>,
    ) -> AppResult<TicketPage> {
        if api_key.trim().is_empty() {
            return Err(AppError::MissingField("tracker API key".to_string()));
        }

        let body = json!({
            "query": ISSUES_QUERY,
            "variables": {
                "filter": issue_filter(query),
                "first": first,
                "after": after,
            }
        });

        let response: GraphQlResponse = self
            .http
            .post_json(&self.api_url, &Auth::Raw(api_key.to_string()), &[], &body)
            .await?;

        if !response.errors.is_empty() {
            let message = response
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(AppError::external(SERVICE, message));
        }

        let connection = response
            .data
            .ok_or_else(|| AppError::external(SERVICE, "Response carried no data"))?
            .issues;

        debug!(
            nodes = connection.nodes.len(),
            has_next_page = connection.page_info.has_next_page,
            "Fetched issue page"
        );

        Ok(TicketPage {
            tickets: connection
                .nodes
                .into_iter()
                .map(|node| self.to_ticket(node))
                .collect(),
            has_next_page: connection.page_info.has_next_page,
            end_cursor: connection.page_info.end_cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_issue_filter_for_day_list() {
        let query = TicketQuery::labelled("Game Launch")
            .due_on(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
            .in_state("Ready");

        assert_eq!(
            issue_filter(&query),
            json!({
                "dueDate": { "eq": "2024-05-01" },
                "labels": { "name": { "eq": "Game Launch" } },
                "state": { "name": { "eq": "Ready" } }
            })
        );
    }

    #[test]
    fn test_issue_filter_with_excluded_states() {
        let query = TicketQuery {
            excluded_states: vec!["Done".to_string(), "Canceled".to_string()],
            ..TicketQuery::default()
        };
        assert_eq!(
            issue_filter(&query),
            json!({ "state": { "name": { "nin": ["Done", "Canceled"] } } })
        );
    }

    #[tokio::test]
    async fn test_fetch_page_parses_nodes_and_cursor() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/graphql")
            .match_header("authorization", "lin_api_key")
            .match_body(Matcher::PartialJson(json!({
                "variables": { "first": 2, "after": "cursor-1" }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data":{"issues":{
                    "nodes":[
                        {"id":"id-1","identifier":"GL-1","title":"Game A - Acme","url":"https://linear.app/team/issue/GL-1","dueDate":"2024-05-01","state":{"name":"Ready"}},
                        {"id":"id-2","identifier":"GL-2","title":"Game B - Zed","url":null,"dueDate":null,"state":null}
                    ],
                    "pageInfo":{"hasNextPage":true,"endCursor":"cursor-2"}}}}"#,
            )
            .create_async()
            .await;

        let client = LinearClient::new(
            &format!("{}/graphql", server.url()),
            "https://linear.app/issue/",
            5,
        )
        .unwrap();
        let page = client
            .fetch_page("lin_api_key", &TicketQuery::default(), 2, Some("cursor-1"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(page.has_next_page);
        assert_eq!(page.end_cursor.as_deref(), Some("cursor-2"));
        assert_eq!(page.tickets.len(), 2);

        let first = &page.tickets[0];
        assert_eq!(first.identifier, "GL-1");
        assert_eq!(first.state, "Ready");
        assert_eq!(first.due_date, NaiveDate::from_ymd_opt(2024, 5, 1));

        let second = &page.tickets[1];
        assert_eq!(second.url, "https://linear.app/issue/id-2");
        assert_eq!(second.state, "");
    }

    #[tokio::test]
    async fn test_graphql_errors_become_external_service() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":null,"errors":[{"message":"Authentication required"}]}"#)
            .create_async()
            .await;

        let client =
            LinearClient::new(&format!("{}/graphql", server.url()), "https://x", 5).unwrap();
        let err = client
            .fetch_page("bad", &TicketQuery::default(), 50, None)
            .await
            .unwrap_err();

        match err {
            AppError::ExternalService { service, message } => {
                assert_eq!(service, "Linear");
                assert_eq!(message, "Authentication required");
            }
            other => panic!("expected ExternalService, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_key_is_rejected_before_request() {
        let client = LinearClient::new("http://127.0.0.1:9/graphql", "https://x", 5).unwrap();
        let err = client
            .fetch_page("  ", &TicketQuery::default(), 50, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingField(_)));
    }
}
