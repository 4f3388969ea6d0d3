//! Request descriptors and buffered responses
//!
//! A `RequestDescriptor` is plain data (method, path, query, JSON body,
//! extra headers) so it can sit in the pending queue and be replayed after a
//! refresh without holding on to a consumed `reqwest::RequestBuilder`.

use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{GatewayError, Result};

/// Everything needed to (re)build an outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `/transactions/7`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| GatewayError::InvalidRequest(format!("body is not JSON: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Append query parameters from a serializable filter struct.
    ///
    /// The value must serialize to a JSON object. `null` fields are skipped so
    /// `Option::None` filters never reach the backend; scalars are rendered
    /// with their JSON text (strings without quotes).
    pub fn with_query<T: Serialize + ?Sized>(mut self, params: &T) -> Result<Self> {
        let value = serde_json::to_value(params)
            .map_err(|e| GatewayError::InvalidRequest(format!("query is not serializable: {e}")))?;
        let serde_json::Value::Object(map) = value else {
            return Err(GatewayError::InvalidRequest(
                "query parameters must serialize to an object".into(),
            ));
        };
        for (key, value) in map {
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => self.query.push((key, s)),
                serde_json::Value::Bool(_) | serde_json::Value::Number(_) => {
                    self.query.push((key, value.to_string()))
                }
                other => {
                    return Err(GatewayError::InvalidRequest(format!(
                        "query parameter {key} must be a scalar, got {other}"
                    )));
                }
            }
        }
        Ok(self)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A fully read 2xx response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl ApiResponse {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| GatewayError::InvalidResponse(format!("decoding response body: {e}")))
    }

    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Filters {
        keyword: Option<String>,
        sort_by: Option<&'static str>,
        page: Option<u32>,
        limit: u32,
    }

    #[test]
    fn query_skips_none_and_renders_scalars() {
        let mut query = RequestDescriptor::get("/transactions")
            .with_query(&Filters {
                keyword: Some("rent".into()),
                sort_by: None,
                page: Some(2),
                limit: 10,
            })
            .unwrap()
            .query;
        query.sort();

        assert_eq!(
            query,
            vec![
                ("keyword".to_string(), "rent".to_string()),
                ("limit".to_string(), "10".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn query_rejects_non_object() {
        let err = RequestDescriptor::get("/x").with_query(&[1, 2]).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }

    #[test]
    fn query_rejects_nested_values() {
        let err = RequestDescriptor::get("/x")
            .with_query(&serde_json::json!({"range": {"from": 1}}))
            .unwrap_err();
        assert!(err.to_string().contains("range"), "got: {err}");
    }

    #[test]
    fn with_json_stores_body() {
        let request = RequestDescriptor::post("/goals")
            .with_json(&serde_json::json!({"name": "Emergency fund", "amount": 1000}))
            .unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body.unwrap()["amount"], 1000);
    }

    #[test]
    fn response_json_decodes_and_reports_errors() {
        let response = ApiResponse {
            status: 200,
            headers: HeaderMap::new(),
            body: r#"{"id": 3}"#.into(),
        };
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["id"], 3);

        let err = response.json::<Vec<u8>>().unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse(_)));
    }
}
