//! Per-request attribute bag and the extractor that builds it
//!
//! The extractor is a pure function of a captured [`RequestInfo`] and
//! [`ResponseInfo`]. The raw query string is never recorded since it
//! routinely carries tokens and other credentials.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request};
use axum::http::{HeaderMap, header};
use axum::response::Response;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::user_agent::parse_user_agent;
use crate::middleware::HandlerErrors;

pub const HTTP: &str = "http";
pub const HTTPS: &str = "https";
pub const HTTP_METHOD: &str = "http.request.method";
pub const HTTP_PATH: &str = "http.request.path";
pub const HTTP_REMOTE_ADDR: &str = "http.request.remoteAddr";
pub const HTTP_REQUEST_HOST: &str = "http.request.host";
pub const HTTP_REQUEST_START: &str = "http.request.start";
pub const HTTP_STATUS: &str = "http.response.status";
pub const HTTP_LATENCY: &str = "http.response.latency";
pub const TLS_VERSION: &str = "http.tls.serviceVersion";
pub const HTTP_SCHEME: &str = "http.scheme";

/// Value stored in a [`RequestAttributes`] bag.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Str(String),
    Int(i64),
    Timestamp(DateTime<Utc>),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Str(value) => f.write_str(value),
            AttributeValue::Int(value) => write!(f, "{value}"),
            AttributeValue::Timestamp(value) => {
                f.write_str(&value.to_rfc3339_opts(SecondsFormat::Micros, true))
            }
        }
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AttributeValue::Str(value) => serializer.serialize_str(value),
            AttributeValue::Int(value) => serializer.serialize_i64(*value),
            AttributeValue::Timestamp(_) => serializer.collect_str(self),
        }
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Str(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Str(value.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<u16> for AttributeValue {
    fn from(value: u16) -> Self {
        AttributeValue::Int(i64::from(value))
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(value: DateTime<Utc>) -> Self {
        AttributeValue::Timestamp(value)
    }
}

/// Ordered key/value attributes describing one request.
///
/// Inserting an existing key replaces its value in place, so merged bags keep
/// the position of the first writer and the value of the last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestAttributes {
    entries: Vec<(String, AttributeValue)>,
}

impl RequestAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn merge(&mut self, other: RequestAttributes) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for RequestAttributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl fmt::Display for RequestAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// TLS session details, inserted into request extensions by a TLS acceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsInfo {
    /// Wire protocol version, e.g. `0x0304` for TLS 1.3.
    pub version: u16,
}

/// Request-side data captured before the downstream handler runs.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: String,
    pub path: String,
    pub remote_addr: String,
    pub host: String,
    pub headers: HeaderMap,
    pub tls: Option<TlsInfo>,
    pub started_at: DateTime<Utc>,
    /// Trace context propagated by the tracing middleware, if it ran first.
    pub context: Option<opentelemetry::Context>,
}

impl RequestInfo {
    pub fn from_request(req: &Request) -> Self {
        let remote_addr = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_default();

        let host = req
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| req.uri().authority().map(|a| a.to_string()))
            .unwrap_or_default();

        Self {
            method: req.method().to_string(),
            path: req.uri().path().to_string(),
            remote_addr,
            host,
            headers: req.headers().clone(),
            tls: req.extensions().get::<TlsInfo>().copied(),
            started_at: Utc::now(),
            context: req.extensions().get::<opentelemetry::Context>().cloned(),
        }
    }

    pub fn user_agent(&self) -> &str {
        self.headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

/// Response-side data captured after the downstream handler returns.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseInfo {
    pub status: u16,
    pub elapsed: Duration,
    pub errors: Vec<String>,
}

impl ResponseInfo {
    pub fn from_response(response: &Response, elapsed: Duration) -> Self {
        Self {
            status: response.status().as_u16(),
            elapsed,
            errors: response
                .extensions()
                .get::<HandlerErrors>()
                .map(|errors| errors.messages().to_vec())
                .unwrap_or_default(),
        }
    }

    /// A 5xx status or any handler-recorded error.
    pub fn is_failure(&self) -> bool {
        self.status > 499 || !self.errors.is_empty()
    }
}

/// Format a latency in milliseconds with sub-millisecond precision.
pub fn format_latency(elapsed: Duration) -> String {
    format!("{:.6}ms", elapsed.as_secs_f64() * 1000.0)
}

/// Flatten headers into `http.<name>` attributes.
///
/// Names and values are lower-cased; repeated headers are joined with `", "`.
pub fn parse_headers(headers: &HeaderMap) -> RequestAttributes {
    let mut attributes = RequestAttributes::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        attributes.insert(
            format!("{HTTP}.{}", name.as_str()).to_lowercase(),
            joined.to_lowercase(),
        );
    }
    attributes
}

/// Build the full attribute bag for a finished request.
pub fn extract_attributes(request: &RequestInfo, response: &ResponseInfo) -> RequestAttributes {
    let mut attributes = RequestAttributes::new();
    attributes.insert(HTTP_METHOD, request.method.as_str());
    attributes.insert(HTTP_PATH, request.path.as_str());
    attributes.insert(HTTP_REMOTE_ADDR, request.remote_addr.as_str());
    attributes.insert(HTTP_STATUS, response.status);
    attributes.insert(HTTP_LATENCY, format_latency(response.elapsed));
    attributes.insert(HTTP_REQUEST_START, request.started_at);

    let scheme = match request.tls {
        Some(tls) => {
            attributes.insert(TLS_VERSION, tls.version);
            HTTPS
        }
        None => HTTP,
    };
    attributes.insert(HTTP_SCHEME, scheme);
    attributes.insert(HTTP_REQUEST_HOST, request.host.as_str());

    attributes.merge(parse_headers(&request.headers));
    attributes.merge(parse_user_agent(request.user_agent()));
    attributes
}
