//! Typed description of one outbound HTTP call.

use http::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Request body, tagged by how it is encoded on the wire.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    None,
    /// `application/x-www-form-urlencoded` fields.
    Form(BTreeMap<String, String>),
    /// JSON document.
    Json(Value),
    /// Raw text sent as-is.
    Text(String),
}

impl RequestBody {
    pub fn is_none(&self) -> bool {
        matches!(self, RequestBody::None)
    }
}

/// Everything a transport needs to perform a request.
///
/// This is the single value handed to `HttpTransport::perform`; the
/// interceptor reads it to build the log record and then passes it on
/// untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: RequestBody,
    pub timeout: Option<Duration>,
}

impl OutboundRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            body: RequestBody::None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn form(mut self, fields: BTreeMap<String, String>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = RequestBody::Text(body.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_collects_all_parts() {
        let req = OutboundRequest::post("https://api.example.com/v1/charges")
            .header("Authorization", "Bearer sk_live_abc")
            .query("expand", "customer")
            .json(json!({"amount": 1200}))
            .timeout(Duration::from_secs(5));

        assert_eq!(req.method, Method::POST);
        assert_eq!(req.url, "https://api.example.com/v1/charges");
        assert_eq!(req.headers["Authorization"], "Bearer sk_live_abc");
        assert_eq!(req.query["expand"], "customer");
        assert_eq!(req.body, RequestBody::Json(json!({"amount": 1200})));
        assert_eq!(req.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn new_request_has_no_body() {
        let req = OutboundRequest::get("http://localhost/health");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
        assert!(req.query.is_empty());
        assert!(req.timeout.is_none());
    }

    #[test]
    fn last_body_setter_wins() {
        let req = OutboundRequest::post("http://localhost")
            .json(json!({"a": 1}))
            .text("raw");
        assert_eq!(req.body, RequestBody::Text("raw".into()));
    }
}
