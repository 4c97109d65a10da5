use crate::transport::{HttpResponse, HttpTransport};
use async_trait::async_trait;
use egress_core::config::ClientConfig;
use egress_core::{OutboundRequest, RequestBody};
use reqwest::header::HeaderMap;
use std::collections::BTreeMap;
use tracing::debug;

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
///
/// Responses are read to the end so the body can be both recorded and
/// returned.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self::from_client(builder.build()?))
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    type Response = HttpResponse;
    type Error = reqwest::Error;

    async fn perform(&self, request: OutboundRequest) -> Result<HttpResponse, reqwest::Error> {
        let OutboundRequest { method, url, headers, query, body, timeout } = request;

        let mut builder = self.client.request(method, url.as_str());
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        builder = match body {
            RequestBody::None => builder,
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Text(text) => builder.body(text),
        };
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = header_map(response.headers());
        let body = response.bytes().await?;
        debug!(%url, status = status.as_u16(), bytes = body.len(), "Response received");

        Ok(HttpResponse { status, headers, body })
    }
}

/// Flatten a `HeaderMap`, joining repeated headers with `", "`.
fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match out.get_mut(name.as_str()) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => {
                out.insert(name.as_str().to_string(), value);
            }
        }
    }
    out
}
