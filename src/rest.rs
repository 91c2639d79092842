//! Thin HTTP wrapper over the store's REST dialect.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{GatewayError, RemoteError};

/// Query-string parameters in the store's filter dialect.
///
/// Pairs are kept in insertion order and repeated columns are all sent, so
/// `gte.` and `lte.` on the same column combine into a range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
  pairs: Vec<(String, String)>,
}

impl QueryParams {
  pub fn new() -> Self {
    Self::default()
  }

  /// Column projection; whitespace inside the projection is dropped.
  pub fn select(self, projection: &str) -> Self {
    let compact: String = projection.split_whitespace().collect();
    self.push("select", compact)
  }

  pub fn order(self, spec: &str) -> Self {
    self.push("order", spec)
  }

  pub fn limit(self, limit: u32) -> Self {
    self.push("limit", limit.to_string())
  }

  pub fn offset(self, offset: u64) -> Self {
    self.push("offset", offset.to_string())
  }

  pub fn eq(self, column: &str, value: impl AsRef<str>) -> Self {
    self.push(column, format!("eq.{}", value.as_ref()))
  }

  /// Case-insensitive substring match.
  pub fn ilike(self, column: &str, needle: impl AsRef<str>) -> Self {
    self.push(column, format!("ilike.%{}%", needle.as_ref()))
  }

  pub fn gte(self, column: &str, value: impl AsRef<str>) -> Self {
    self.push(column, format!("gte.{}", value.as_ref()))
  }

  pub fn lte(self, column: &str, value: impl AsRef<str>) -> Self {
    self.push(column, format!("lte.{}", value.as_ref()))
  }

  /// Disjunction of `column.op.value` conditions.
  pub fn or(self, conditions: &[String]) -> Self {
    self.push("or", format!("({})", conditions.join(",")))
  }

  pub fn push(mut self, key: &str, value: impl Into<String>) -> Self {
    self.pairs.push((key.to_string(), value.into()));
    self
  }

  pub fn pairs(&self) -> &[(String, String)] {
    &self.pairs
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self
      .pairs
      .iter()
      .find(|(k, _)| k == key)
      .map(|(_, v)| v.as_str())
  }
}

/// HTTP client bound to one store.
#[derive(Clone)]
pub struct RestClient {
  client: Client,
  base: Url,
  api_key: String,
}

impl RestClient {
  /// `project_url` is the store's root; requests go to `<root>/rest/v1/<table>`.
  pub fn new(project_url: &str, api_key: String) -> Result<Self, GatewayError> {
    let mut root = Url::parse(project_url)?;
    if !root.path().ends_with('/') {
      let path = format!("{}/", root.path());
      root.set_path(&path);
    }
    let base = root.join("rest/v1/")?;
    let client = Client::builder().user_agent(Self::user_agent()).build()?;
    Ok(Self {
      client,
      base,
      api_key,
    })
  }

  pub fn from_config(config: &Config) -> color_eyre::Result<Self> {
    let api_key = Config::get_api_key()?;
    Ok(Self::new(&config.store.url, api_key)?)
  }

  pub fn user_agent() -> &'static str {
    concat!("tripdeck/", env!("CARGO_PKG_VERSION"))
  }

  pub fn base(&self) -> &Url {
    &self.base
  }

  /// GET rows from `table`.
  pub async fn get<T: DeserializeOwned>(
    &self,
    table: &str,
    params: &QueryParams,
  ) -> Result<T, GatewayError> {
    let request = self.request(Method::GET, table, params)?;
    Self::send(request).await
  }

  /// Exact row count of `table` under `params`' filters.
  pub async fn count(&self, table: &str, params: &QueryParams) -> Result<u64, GatewayError> {
    let params = params.clone().select("count");
    let request = self.request_with(Method::GET, table, &params, "count=exact")?;
    let rows: Vec<Value> = Self::send(request).await?;
    Ok(rows.first().map(parse_count).unwrap_or(0))
  }

  /// POST `body`, returning the inserted representation.
  pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    table: &str,
    body: &B,
  ) -> Result<T, GatewayError> {
    let request = self
      .request(Method::POST, table, &QueryParams::new())?
      .json(body);
    Self::send(request).await
  }

  /// PATCH rows matching `params`, returning their new representation.
  pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    table: &str,
    params: &QueryParams,
    body: &B,
  ) -> Result<T, GatewayError> {
    let request = self.request(Method::PATCH, table, params)?.json(body);
    Self::send(request).await
  }

  /// DELETE rows matching `params`.
  pub async fn delete(&self, table: &str, params: &QueryParams) -> Result<(), GatewayError> {
    let request = self.request(Method::DELETE, table, params)?;
    let _: Value = Self::send(request).await?;
    Ok(())
  }

  fn request(
    &self,
    method: Method,
    table: &str,
    params: &QueryParams,
  ) -> Result<RequestBuilder, GatewayError> {
    self.request_with(method, table, params, "return=representation")
  }

  fn request_with(
    &self,
    method: Method,
    table: &str,
    params: &QueryParams,
    prefer: &'static str,
  ) -> Result<RequestBuilder, GatewayError> {
    let mut url = self.base.join(table)?;
    if !params.pairs().is_empty() {
      let mut query = url.query_pairs_mut();
      for (key, value) in params.pairs() {
        query.append_pair(key, value);
      }
    }
    debug!(method = %method, url = %url, "store request");
    Ok(self.client.request(method, url).headers(self.headers(prefer)))
  }

  fn headers(&self, prefer: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&self.api_key) {
      headers.insert("apikey", value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.api_key)) {
      headers.insert(AUTHORIZATION, value);
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert("Prefer", HeaderValue::from_static(prefer));
    headers
  }

  async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, GatewayError> {
    let response = request.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
      return Err(
        RemoteError {
          status: status.as_u16(),
          body: String::from_utf8_lossy(&bytes).into_owned(),
        }
        .into(),
      );
    }

    // Empty bodies (204, or DELETE without representation) read as no rows
    if status == StatusCode::NO_CONTENT || bytes.iter().all(u8::is_ascii_whitespace) {
      return Ok(serde_json::from_value(Value::Array(Vec::new()))?);
    }
    Ok(serde_json::from_slice(&bytes)?)
  }
}

/// `count` arrives as a number or a numeric string.
fn parse_count(row: &Value) -> u64 {
  match row.get("count") {
    Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
    Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
    _ => 0,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use httpmock::prelude::*;
  use serde_json::json;

  fn client(server: &MockServer) -> RestClient {
    RestClient::new(&server.base_url(), "anon-key".to_string()).unwrap()
  }

  #[test]
  fn test_params_dialect() {
    let params = QueryParams::new()
      .select("*,\n  users(id, full_name)")
      .eq("status", "draft")
      .ilike("destination_city", "ber")
      .gte("start_date", "2024-01-01")
      .lte("start_date", "2024-12-31")
      .or(&["title.ilike.%x%".to_string(), "description.ilike.%x%".to_string()]);

    assert_eq!(params.get("select"), Some("*,users(id,full_name)"));
    assert_eq!(params.get("status"), Some("eq.draft"));
    assert_eq!(params.get("destination_city"), Some("ilike.%ber%"));
    assert_eq!(params.get("or"), Some("(title.ilike.%x%,description.ilike.%x%)"));
    let bounds: Vec<&str> = params
      .pairs()
      .iter()
      .filter(|(k, _)| k == "start_date")
      .map(|(_, v)| v.as_str())
      .collect();
    assert_eq!(bounds, vec!["gte.2024-01-01", "lte.2024-12-31"]);
  }

  #[test]
  fn test_base_url_keeps_project_path() {
    let client = RestClient::new("https://example.com/proxy", "k".to_string()).unwrap();
    assert_eq!(client.base().as_str(), "https://example.com/proxy/rest/v1/");
  }

  #[test]
  fn test_parse_count_variants() {
    assert_eq!(parse_count(&json!({ "count": 25 })), 25);
    assert_eq!(parse_count(&json!({ "count": "7" })), 7);
    assert_eq!(parse_count(&json!({})), 0);
  }

  #[tokio::test]
  async fn test_get_sends_auth_headers() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when
          .method(GET)
          .path("/rest/v1/companies")
          .query_param("order", "name.asc")
          .header("apikey", "anon-key")
          .header("authorization", "Bearer anon-key")
          .header("prefer", "return=representation");
        then.status(200).json_body(json!([{ "id": "c-1" }]));
      })
      .await;

    let rows: Vec<Value> = client(&server)
      .get("companies", &QueryParams::new().order("name.asc"))
      .await
      .unwrap();

    mock.assert_async().await;
    assert_eq!(rows.len(), 1);
  }

  #[tokio::test]
  async fn test_count_requests_exact_count() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when
          .method(GET)
          .path("/rest/v1/trips")
          .query_param("select", "count")
          .query_param("status", "eq.draft")
          .header("prefer", "count=exact");
        then.status(200).json_body(json!([{ "count": 25 }]));
      })
      .await;

    let total = client(&server)
      .count("trips", &QueryParams::new().eq("status", "draft"))
      .await
      .unwrap();

    mock.assert_async().await;
    assert_eq!(total, 25);
  }

  #[tokio::test]
  async fn test_non_success_becomes_remote_error() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(GET).path("/rest/v1/trips");
        then.status(401).body("invalid api key");
      })
      .await;

    let err = client(&server)
      .get::<Vec<Value>>("trips", &QueryParams::new())
      .await
      .unwrap_err();

    match err {
      GatewayError::Remote(remote) => {
        assert_eq!(remote.status, 401);
        assert_eq!(remote.body, "invalid api key");
      }
      other => panic!("expected remote error, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn test_delete_accepts_no_content() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when
          .method(DELETE)
          .path("/rest/v1/trips")
          .query_param("id", "eq.t-1");
        then.status(204);
      })
      .await;

    client(&server)
      .delete("trips", &QueryParams::new().eq("id", "t-1"))
      .await
      .unwrap();
    mock.assert_async().await;
  }
}
