use async_trait::async_trait;
use bytes::Bytes;
use egress_core::OutboundRequest;
use http::StatusCode;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read-only view of a response, used to build the log record.
pub trait ObservedResponse {
    fn status_code(&self) -> u16;

    /// Header names as received; repeated headers joined with `", "`.
    fn header_map(&self) -> BTreeMap<String, String>;

    fn body_bytes(&self) -> &[u8];
}

/// The single low-level entry point every outbound call goes through.
///
/// Higher-level helpers (`get`, `post_json`, ...) are built on top of
/// `perform`, so wrapping this one method is enough to observe everything.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    type Response: ObservedResponse + Send;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn perform(&self, request: OutboundRequest) -> Result<Self::Response, Self::Error>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    type Response = T::Response;
    type Error = T::Error;

    async fn perform(&self, request: OutboundRequest) -> Result<Self::Response, Self::Error> {
        (**self).perform(request).await
    }
}

/// Fully buffered HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: BTreeMap<String, String>, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// Body as text; invalid UTF-8 is replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl ObservedResponse for HttpResponse {
    fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    fn header_map(&self) -> BTreeMap<String, String> {
        self.headers.clone()
    }

    fn body_bytes(&self) -> &[u8] {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_decodes_json_body() {
        let resp = HttpResponse::new(StatusCode::OK, BTreeMap::new(), r#"{"id":7}"#);
        let v: serde_json::Value = resp.json().unwrap();
        assert_eq!(v["id"], 7);
        assert_eq!(resp.status_code(), 200);
    }

    #[test]
    fn response_text_is_lossy() {
        let resp = HttpResponse::new(StatusCode::OK, BTreeMap::new(), vec![b'o', b'k', 0xff]);
        assert_eq!(resp.text(), "ok\u{fffd}");
        assert!(resp.json::<serde_json::Value>().is_err());
    }
}
