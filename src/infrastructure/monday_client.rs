// monday.com GraphQL board source
use crate::application::board_source::{BoardSource, FetchError};
use crate::domain::normalizer::BoardColumn;
use crate::domain::order::{RawRecord, RawValue};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

const ITEM_FIELDS: &str = "cursor items { id name updated_at column_values { id text value } }";

const COLUMNS_QUERY: &str = "query($board_id: [ID!]) { boards(ids: $board_id) { columns { id title } } }";

#[derive(Debug, Clone)]
pub struct MondayClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
    api_version: Option<String>,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphQLError>>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct BoardsData {
    boards: Vec<BoardData>,
}

#[derive(Debug, Deserialize)]
struct BoardData {
    items_page: ItemsPage,
}

#[derive(Debug, Deserialize)]
struct ColumnsData {
    boards: Vec<BoardColumns>,
}

#[derive(Debug, Deserialize)]
struct BoardColumns {
    columns: Vec<BoardColumn>,
}

#[derive(Debug, Deserialize)]
struct NextPageData {
    next_items_page: ItemsPage,
}

#[derive(Debug, Deserialize)]
struct ItemsPage {
    cursor: Option<String>,
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    id: String,
    name: String,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    column_values: Vec<ColumnValue>,
}

#[derive(Debug, Deserialize)]
struct ColumnValue {
    id: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

impl From<Item> for RawRecord {
    fn from(item: Item) -> Self {
        let mut record = RawRecord::new(item.id, item.name);
        record.updated_at = item.updated_at;
        for cv in item.column_values {
            if let Some(value) = RawValue::resolve(cv.text.as_deref(), cv.value.as_deref()) {
                record.columns.insert(cv.id, value);
            }
        }
        record
    }
}

impl MondayClient {
    pub fn new(
        api_url: String,
        token: String,
        api_version: Option<String>,
        page_size: u32,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            api_version,
            page_size: page_size.clamp(1, 500),
        })
    }

    fn first_page_query(&self) -> String {
        format!(
            "query($board_id: [ID!], $limit: Int!) {{ boards(ids: $board_id) {{ items_page(limit: $limit) {{ {} }} }} }}",
            ITEM_FIELDS
        )
    }

    fn next_page_query(&self) -> String {
        format!(
            "query($cursor: String!, $limit: Int!) {{ next_items_page(cursor: $cursor, limit: $limit) {{ {} }} }}",
            ITEM_FIELDS
        )
    }

    async fn execute<T>(&self, query: &str, variables: serde_json::Value) -> Result<T, FetchError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut request = self
            .client
            .post(&self.api_url)
            .header("Authorization", &self.token)
            .header("Content-Type", "application/json")
            .json(&json!({ "query": query, "variables": variables }));
        if let Some(version) = &self.api_version {
            request = request.header("API-Version", version);
        }

        let response = request.send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(FetchError::Auth {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        decode_response(&body)
    }
}

fn decode_response<T>(body: &str) -> Result<T, FetchError>
where
    T: for<'de> Deserialize<'de>,
{
    let response: GraphQLResponse<T> =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
        let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
        return Err(FetchError::Api(messages.join("; ")));
    }
    if let Some(message) = response.error_message {
        return Err(FetchError::Api(message));
    }

    response
        .data
        .ok_or_else(|| FetchError::Decode("response has no data".to_string()))
}

#[async_trait]
impl BoardSource for MondayClient {
    async fn fetch_records(&self, board_id: &str) -> Result<Vec<RawRecord>, FetchError> {
        let started = Instant::now();

        let data: BoardsData = self
            .execute(
                &self.first_page_query(),
                json!({ "board_id": [board_id], "limit": self.page_size }),
            )
            .await?;
        let board = data
            .boards
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::BoardNotFound(board_id.to_string()))?;

        let mut records: Vec<RawRecord> = Vec::new();
        let mut page = board.items_page;
        let mut pages = 1;
        let mut previous_cursor: Option<String> = None;

        loop {
            records.extend(page.items.into_iter().map(RawRecord::from));
            let Some(cursor) = page.cursor else {
                break;
            };
            if previous_cursor.as_deref() == Some(cursor.as_str()) {
                return Err(FetchError::Api(format!(
                    "pagination returned cursor {} twice after {} page(s)",
                    cursor, pages
                )));
            }

            let next: NextPageData = self
                .execute(
                    &self.next_page_query(),
                    json!({ "cursor": cursor, "limit": self.page_size }),
                )
                .await?;
            page = next.next_items_page;
            previous_cursor = Some(cursor);
            pages += 1;
        }

        tracing::info!(
            "Fetched {} items from board {} in {} page(s) ({} ms)",
            records.len(),
            board_id,
            pages,
            started.elapsed().as_millis()
        );
        Ok(records)
    }

    async fn fetch_columns(&self, board_id: &str) -> Result<Vec<BoardColumn>, FetchError> {
        let data: ColumnsData = self
            .execute(COLUMNS_QUERY, json!({ "board_id": [board_id] }))
            .await?;
        data.boards
            .into_iter()
            .next()
            .map(|board| board.columns)
            .ok_or_else(|| FetchError::BoardNotFound(board_id.to_string()))
    }

    fn credential_fingerprint(&self) -> String {
        token_fingerprint(&self.token)
    }
}

/// Short SHA-256 prefix of a token, safe to use in cache keys and logs
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    /// What the local board API saw for one request
    #[derive(Debug, Clone)]
    struct SeenRequest {
        authorization: Option<String>,
        api_version: Option<String>,
        variables: Value,
    }

    /// Local stand-in for the board API: two pages of items plus column declarations
    #[derive(Default)]
    struct FakeApi {
        status: StatusCode,
        empty_board: bool,
        repeat_cursor: bool,
        requests: Mutex<Vec<SeenRequest>>,
    }

    fn item(id: &str, status: &str) -> Value {
        json!({
            "id": id,
            "name": format!("Order {id}"),
            "column_values": [{"id": "status", "text": status, "value": null}]
        })
    }

    async fn graphql(State(api): State<Arc<FakeApi>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
        api.requests.lock().unwrap().push(SeenRequest {
            authorization: header("authorization"),
            api_version: header("api-version"),
            variables: body["variables"].clone(),
        });

        if api.status != StatusCode::OK {
            return (api.status, Json(json!({"error_message": "nope"}))).into_response();
        }

        let query = body["query"].as_str().unwrap_or_default();
        let data = if api.empty_board {
            json!({"boards": []})
        } else if query.contains("columns {") {
            json!({"boards": [{"columns": [
                {"id": "name", "title": "Name"},
                {"id": "location_1", "title": "Location"}
            ]}]})
        } else if query.contains("next_items_page") {
            let cursor = if api.repeat_cursor { json!("c1") } else { Value::Null };
            json!({"next_items_page": {"cursor": cursor, "items": [item("3", "Pending")]}})
        } else {
            json!({"boards": [{"items_page": {
                "cursor": "c1",
                "items": [item("1", "Shipped"), item("2", "Shipped")]
            }}]})
        };
        Json(json!({ "data": data })).into_response()
    }

    async fn serve(api: FakeApi, api_version: Option<&str>) -> (Arc<FakeApi>, MondayClient) {
        let api = Arc::new(api);
        let app = Router::new().route("/v2", post(graphql)).with_state(api.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = MondayClient::new(
            format!("http://{addr}/v2/"),
            "secret-token".to_string(),
            api_version.map(str::to_string),
            2,
            Duration::from_secs(5),
        )
        .unwrap();
        (api, client)
    }

    #[test]
    fn test_decode_first_page() {
        let body = r#"{
            "data": {
                "boards": [{
                    "items_page": {
                        "cursor": "MSw5NzI4MDA5MDAsaV9YcmxJb0p1VEdYc1VWeGlxeF9kLDg4MiwzNXw0MTQ1NzU1MTE5",
                        "items": [{
                            "id": "1234567890",
                            "name": "Dental clinic",
                            "updated_at": "2024-03-05T10:30:00Z",
                            "column_values": [
                                {"id": "location", "text": "Toronto, ON", "value": "{\"lat\":\"43.65\",\"lng\":\"-79.38\",\"address\":\"Toronto, ON\"}"},
                                {"id": "order_value", "text": "1250", "value": "\"1250\""},
                                {"id": "status", "text": "Shipped", "value": "{\"index\":1}"},
                                {"id": "empty", "text": "", "value": null}
                            ]
                        }]
                    }
                }]
            }
        }"#;

        let data: BoardsData = decode_response(body).unwrap();
        let page = data.boards.into_iter().next().unwrap().items_page;
        assert!(page.cursor.is_some());

        let record = RawRecord::from(page.items.into_iter().next().unwrap());
        assert_eq!(record.id, "1234567890");
        assert_eq!(record.updated_at.as_deref(), Some("2024-03-05T10:30:00Z"));
        assert_eq!(record.columns.len(), 3);
        assert_eq!(
            record.columns["order_value"],
            RawValue::Text {
                text: "1250".to_string()
            }
        );
        assert_eq!(
            record.columns["location"],
            RawValue::Structured {
                json: json!({"lat": "43.65", "lng": "-79.38", "address": "Toronto, ON"}),
                text: Some("Toronto, ON".to_string()),
            }
        );
    }

    #[test]
    fn test_decode_next_page_without_cursor() {
        let body = r#"{"data": {"next_items_page": {"cursor": null, "items": []}}}"#;
        let data: NextPageData = decode_response(body).unwrap();
        assert!(data.next_items_page.cursor.is_none());
        assert!(data.next_items_page.items.is_empty());
    }

    #[test]
    fn test_decode_columns() {
        let body = r#"{"data": {"boards": [{"columns": [
            {"id": "name", "title": "Name", "type": "name"},
            {"id": "numbers", "title": "Order Value", "type": "numbers"}
        ]}]}}"#;
        let data: ColumnsData = decode_response(body).unwrap();
        let columns = &data.boards[0].columns;
        assert_eq!(columns.len(), 2);
        assert_eq!(
            columns[1],
            BoardColumn {
                id: "numbers".to_string(),
                title: "Order Value".to_string()
            }
        );
    }

    #[test]
    fn test_decode_graphql_errors() {
        let body = r#"{"errors": [{"message": "Field 'boards' doesn't exist"}, {"message": "second"}]}"#;
        let err = decode_response::<BoardsData>(body).unwrap_err();
        match err {
            FetchError::Api(message) => {
                assert_eq!(message, "Field 'boards' doesn't exist; second");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let body = r#"{"error_message": "User unauthorized to perform action", "status_code": 403}"#;
        assert!(matches!(decode_response::<BoardsData>(body), Err(FetchError::Api(_))));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(decode_response::<BoardsData>("<html>"), Err(FetchError::Decode(_))));
        assert!(matches!(decode_response::<BoardsData>("{}"), Err(FetchError::Decode(_))));
    }

    #[test]
    fn test_token_fingerprint_is_stable_and_opaque() {
        let fp = token_fingerprint("secret-token");
        assert_eq!(fp.len(), 16);
        assert_eq!(fp, token_fingerprint("secret-token"));
        assert_ne!(fp, token_fingerprint("other-token"));
        assert!(!fp.contains("secret"));
    }

    #[test]
    fn test_queries_request_column_values() {
        let client = MondayClient::new(
            "https://api.monday.com/v2/".to_string(),
            "token".to_string(),
            None,
            1000,
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(client.api_url, "https://api.monday.com/v2");
        assert_eq!(client.page_size, 500);
        assert!(client.first_page_query().contains("items_page(limit: $limit)"));
        assert!(client.next_page_query().contains("next_items_page(cursor: $cursor"));
        assert!(client.first_page_query().contains("column_values { id text value }"));
    }

    #[tokio::test]
    async fn test_fetch_follows_cursor_and_sends_headers() {
        let (api, client) = serve(FakeApi::default(), Some("2024-10")).await;

        let records = client.fetch_records("42").await.unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(
            records[2].columns["status"],
            RawValue::Text {
                text: "Pending".to_string()
            }
        );

        let requests = api.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 2);
        assert!(requests
            .iter()
            .all(|r| r.authorization.as_deref() == Some("secret-token")));
        assert!(requests.iter().all(|r| r.api_version.as_deref() == Some("2024-10")));
        assert_eq!(requests[0].variables, json!({"board_id": ["42"], "limit": 2}));
        assert_eq!(requests[1].variables, json!({"cursor": "c1", "limit": 2}));
    }

    #[tokio::test]
    async fn test_fetch_columns_from_board() {
        let (api, client) = serve(FakeApi::default(), None).await;

        let columns = client.fetch_columns("42").await.unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1].id, "location_1");
        assert_eq!(columns[1].title, "Location");

        let requests = api.requests.lock().unwrap().clone();
        assert_eq!(requests[0].api_version, None);
        assert_eq!(requests[0].variables, json!({"board_id": ["42"]}));
    }

    #[tokio::test]
    async fn test_empty_boards_is_board_not_found() {
        let api = FakeApi {
            empty_board: true,
            ..FakeApi::default()
        };
        let (_, client) = serve(api, None).await;

        let err = client.fetch_records("999").await.unwrap_err();
        assert!(matches!(err, FetchError::BoardNotFound(ref id) if id == "999"));
        let err = client.fetch_columns("999").await.unwrap_err();
        assert!(matches!(err, FetchError::BoardNotFound(_)));
    }

    #[tokio::test]
    async fn test_rejected_credentials_are_auth_errors() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let api = FakeApi {
                status,
                ..FakeApi::default()
            };
            let (_, client) = serve(api, None).await;

            let err = client.fetch_records("42").await.unwrap_err();
            assert!(
                matches!(err, FetchError::Auth { status: s } if s == status.as_u16()),
                "unexpected error for {status}: {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_other_statuses_are_http_errors() {
        let api = FakeApi {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            ..FakeApi::default()
        };
        let (_, client) = serve(api, None).await;

        match client.fetch_records("42").await.unwrap_err() {
            FetchError::Http { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("nope"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_repeated_cursor_stops_pagination() {
        let api = FakeApi {
            repeat_cursor: true,
            ..FakeApi::default()
        };
        let (api, client) = serve(api, None).await;

        match client.fetch_records("42").await.unwrap_err() {
            FetchError::Api(message) => assert!(message.contains("cursor c1 twice")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(api.requests.lock().unwrap().len(), 2);
    }
}
