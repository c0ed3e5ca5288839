//! Authenticated HTTP transport for the embeddings service.
//!
//! Every call is blocking and single-shot: no retries, no backoff. A non-200
//! answer to a JSON request becomes `Error::Api` via
//! [`adv_core::error::api_error_from_body`].
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use adv_core::config::ClientSettings;
use adv_core::error::{api_error_from_body, Error, Result};

/// Fixed prefix between the endpoint and every resource path.
const API_PREFIX: &str = "adv";

pub struct AdvClient {
    http: Client,
    settings: ClientSettings,
}

impl AdvClient {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Absolute URL for a resource path such as `v1/embeddings`.
    pub fn url(&self, path: &str) -> String {
        join_url(self.settings.endpoint(), path)
    }

    pub fn get(&self, path: &str) -> Result<Option<Value>> {
        self.request::<()>(Method::GET, path, None)
    }

    pub fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Option<Value>> {
        self.request(Method::POST, path, Some(body))
    }

    pub fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Option<Value>> {
        self.request(Method::PUT, path, Some(body))
    }

    pub fn delete(&self, path: &str) -> Result<Option<Value>> {
        self.request::<()>(Method::DELETE, path, None)
    }

    /// Issue a JSON request. `Ok(None)` means the service answered 200 with
    /// an empty body.
    pub fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<Value>> {
        let url = self.url(path);
        debug!(%method, %url, "request");
        let mut req = self.http.request(method, &url).headers(self.default_headers()?);
        if let Some(body) = body {
            req = req.body(serde_json::to_vec(body)?);
        }
        handle_json_response(req.send()?)
    }

    /// PUT a raw payload. `headers` are merged over the defaults, so callers
    /// can replace the JSON content type. The response is returned untouched.
    pub fn send_bytes(&self, path: &str, data: Vec<u8>, headers: HeaderMap) -> Result<Response> {
        let url = self.url(path);
        let mut merged = self.default_headers()?;
        merged.extend(headers);
        debug!(%url, bytes = data.len(), "sending raw payload");
        Ok(self.http.put(&url).headers(merged).body(data).send()?)
    }

    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.settings.api_key()))
            .map_err(|e| Error::Config(format!("API key is not a valid header value: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }
}

fn handle_json_response(rsp: Response) -> Result<Option<Value>> {
    let status = rsp.status();
    if status != StatusCode::OK {
        return Err(error_from_response(rsp));
    }
    let body = rsp.bytes()?;
    if body.is_empty() {
        debug!(status = status.as_u16(), "empty response");
        return Ok(None);
    }
    let value: Value = serde_json::from_slice(&body)?;
    debug!(status = status.as_u16(), body = %value, "response");
    Ok(Some(value))
}

/// Consume a failed response and normalize it into `Error::Api`.
pub(crate) fn error_from_response(rsp: Response) -> Error {
    let status = rsp.status().as_u16();
    let err = match rsp.bytes() {
        Ok(body) => api_error_from_body(status, &body),
        Err(e) => return Error::Http(e),
    };
    warn!(status, error = %err, "request failed");
    err
}

fn join_url(endpoint: &str, path: &str) -> String {
    format!(
        "{}/{}/{}",
        endpoint.trim_end_matches('/'),
        API_PREFIX,
        path.trim_start_matches('/')
    )
}
