use reqwest::{header::HeaderMap, Method};
use serde_json::Value;

/// Ordered list of query parameters, already in wire form
pub type QueryParams = Vec<(String, String)>;

/// One REST call: what to send and where
#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: Method,
    pub url: String,
    pub params: Option<QueryParams>,
    pub body: Option<Value>,
}

impl RestRequest {
    pub fn new<S: Into<String>>(method: Method, url: S) -> Self {
        Self {
            method,
            url: url.into(),
            params: None,
            body: None,
        }
    }
    pub fn with_params(mut self, params: Option<QueryParams>) -> Self {
        self.params = params;
        self
    }
    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }
    /// Value of query parameter `name`, if any
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .as_ref()?
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Whole answer of server, not only body
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Value,
}

impl RestResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }
    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
