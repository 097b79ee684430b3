//! Fetch workflow against mocked tracker and spreadsheet endpoints.

use std::sync::Arc;

use chrono::NaiveDate;
use gametools_core::{AppError, SessionContext, SheetsCredentials, UserKey};
use gametools_services::{
    FetchSettings, IndexStatus, LaunchFetcher, LinearClient, SheetsClient,
};
use mockito::Matcher;

const INDEX_PAGE: &str = r#"{"data":{"issues":{
  "nodes":[
    {"id":"a1","identifier":"GL-1","title":"Mystic Forest - Acme","url":"https://linear.app/t/issue/GL-1","dueDate":"2024-06-03","state":{"name":"Ready"}},
    {"id":"a2","identifier":"GL-2","title":"mystic forest!! - Zed","url":"https://linear.app/t/issue/GL-2","dueDate":null,"state":{"name":"Backlog"}},
    {"id":"a3","identifier":"GL-3","title":"Sky Racer - Zed","url":"https://linear.app/t/issue/GL-3","dueDate":null,"state":{"name":"Canceled"}}
  ],
  "pageInfo":{"hasNextPage":false,"endCursor":null}}}}"#;

const DAY_PAGE: &str = r#"{"data":{"issues":{
  "nodes":[
    {"id":"a1","identifier":"GL-1","title":"Mystic Forest - Acme","url":"https://linear.app/t/issue/GL-1","dueDate":"2024-06-03","state":{"name":"Ready"}}
  ],
  "pageInfo":{"hasNextPage":false,"endCursor":null}}}}"#;

const PROVIDERS: &str = r#"{"range":"Sheet1!A1:E3","majorDimension":"ROWS","values":[
  ["Provider Name","URL","Username","Password","Aliases"],
  ["Acme","http://acme.example","u1","p1","acme games"],
  ["Zed","http://zed.example","",""]
]}"#;

fn session() -> SessionContext {
    SessionContext::start(UserKey::new("ana", "lin_api_key", "Ready")).unwrap()
}

fn fetcher(server: &mockito::Server) -> LaunchFetcher {
    let tracker = LinearClient::new(
        &format!("{}/graphql", server.url()),
        "https://linear.app/issue",
        5,
    )
    .unwrap();
    let sheets = SheetsClient::new(
        &server.url(),
        "sheet-1",
        &SheetsCredentials::AccessToken("sheet-token".to_string()),
        5,
    )
    .unwrap();
    LaunchFetcher::new(Arc::new(tracker), Arc::new(sheets), FetchSettings::default())
}

#[tokio::test]
async fn fetch_flags_duplicate_and_finds_provider() {
    let mut server = mockito::Server::new_async().await;
    let index = server
        .mock("POST", "/graphql")
        .match_header("authorization", "lin_api_key")
        .match_body(Matcher::Regex(r#""filter":\{"labels""#.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(INDEX_PAGE)
        .create_async()
        .await;
    let day = server
        .mock("POST", "/graphql")
        .match_body(Matcher::Regex(r#""filter":\{"dueDate""#.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(DAY_PAGE)
        .create_async()
        .await;
    let providers = server
        .mock("GET", Matcher::Regex(r"^/spreadsheets/sheet-1/values/".to_string()))
        .match_header("authorization", "Bearer sheet-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PROVIDERS)
        .create_async()
        .await;

    let mut session = session();
    let outcome = fetcher(&server)
        .fetch(&mut session, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap())
        .await
        .unwrap();

    index.assert_async().await;
    day.assert_async().await;
    providers.assert_async().await;

    assert_eq!(outcome.index_status, IndexStatus::Complete);
    assert_eq!(outcome.reports.len(), 1);

    let report = &outcome.reports[0];
    assert_eq!(report.ticket.identifier, "GL-1");
    let dup_urls: Vec<_> = report.duplicates.iter().map(|d| d.url.as_str()).collect();
    assert_eq!(dup_urls, vec!["https://linear.app/t/issue/GL-2"]);
    assert_eq!(report.providers.len(), 1);
    assert_eq!(report.providers[0].username, "u1");

    assert_eq!(
        session.issue("Mystic Forest - Acme").map(|r| r.id.as_str()),
        Some("a1")
    );
}

#[tokio::test]
async fn tracker_outage_on_day_list_is_reported() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/graphql")
        .match_body(Matcher::Regex(r#""filter":\{"labels""#.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(INDEX_PAGE)
        .create_async()
        .await;
    server
        .mock("POST", "/graphql")
        .match_body(Matcher::Regex(r#""filter":\{"dueDate""#.to_string()))
        .with_status(503)
        .with_body("upstream unavailable")
        .create_async()
        .await;

    let err = fetcher(&server)
        .fetch(&mut session(), NaiveDate::from_ymd_opt(2024, 6, 3).unwrap())
        .await
        .unwrap_err();

    match err {
        AppError::ExternalService { service, message } => {
            assert_eq!(service, "Linear");
            assert!(message.contains("upstream unavailable"));
        }
        other => panic!("expected ExternalService, got {:?}", other),
    }
}
