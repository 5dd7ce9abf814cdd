use std::{collections::BTreeMap, future, net::SocketAddr};

use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::{
        header::{CONTENT_LENGTH, HOST, TRANSFER_ENCODING},
        request::Parts,
        HeaderMap,
    },
    middleware::Next,
    response::Response,
};
use bytes::BytesMut;
use http_body_util::{BodyExt, Full};
use serde::Serialize;
use tracing::{info, warn};

/// Everything worth knowing about an inbound request, for debugging.
///
/// Empty fields are left out of the rendered JSON; `remoteAddr` and
/// `requestURI` are always present.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSnapshot {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub method: String,
    #[serde(rename = "URL", skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub proto: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub proto_major: u8,
    #[serde(skip_serializing_if = "is_zero")]
    pub proto_minor: u8,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub body: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub content_length: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transfer_encoding: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub trailer: BTreeMap<String, Vec<String>>,
    pub remote_addr: String,
    #[serde(rename = "requestURI")]
    pub request_uri: String,
}

fn is_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

impl RequestSnapshot {
    /// Drains the request body into memory and hands back an equivalent
    /// request whose body (and trailers) can be read again.
    ///
    /// A read error stops the drain; whatever arrived before it is kept.
    pub async fn capture(req: Request) -> (Request, Self) {
        let (parts, mut body) = req.into_parts();
        let mut buf = BytesMut::new();
        let mut trailers: Option<HeaderMap> = None;
        while let Some(frame) = body.frame().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(err) => {
                    warn!("failed to read request body: {}", err);
                    break;
                }
            };
            match frame.into_data() {
                Ok(data) => buf.extend_from_slice(&data),
                Err(frame) => {
                    if let Ok(t) = frame.into_trailers() {
                        trailers.get_or_insert_with(HeaderMap::new).extend(t);
                    }
                }
            }
        }
        let bytes = buf.freeze();

        let snapshot = Self::from_parts(&parts, &bytes, trailers.as_ref());
        let body = match trailers {
            Some(trailers) => Body::new(
                Full::new(bytes).with_trailers(future::ready(Some(Ok(trailers)))),
            ),
            None => Body::from(bytes),
        };
        (Request::from_parts(parts, body), snapshot)
    }

    fn from_parts(parts: &Parts, body: &[u8], trailers: Option<&HeaderMap>) -> Self {
        let proto = format!("{:?}", parts.version);
        let (proto_major, proto_minor) = proto
            .strip_prefix("HTTP/")
            .and_then(|v| v.split_once('.'))
            .map(|(major, minor)| (major.parse().unwrap_or(0), minor.parse().unwrap_or(0)))
            .unwrap_or((0, 0));

        let host = parts
            .uri
            .authority()
            .map(|a| a.to_string())
            .or_else(|| header_str(&parts.headers, HOST.as_str()))
            .unwrap_or_default();

        let transfer_encoding = header_str(&parts.headers, TRANSFER_ENCODING.as_str())
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();

        let content_length = header_str(&parts.headers, CONTENT_LENGTH.as_str())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0);

        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_default();

        let headers = header_map(&parts.headers)
            .into_iter()
            .filter(|(name, _)| name != HOST.as_str() && name != TRANSFER_ENCODING.as_str())
            .collect();

        Self {
            method: parts.method.to_string(),
            url: parts.uri.to_string(),
            proto_major,
            proto_minor,
            proto,
            headers,
            body: String::from_utf8_lossy(body).into_owned(),
            content_length,
            transfer_encoding,
            host,
            trailer: trailers.map(header_map).unwrap_or_default(),
            remote_addr,
            request_uri: parts.uri.to_string(),
        }
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        map.entry(name.to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    map
}

/// Logs a [`RequestSnapshot`] as indented JSON, then forwards the request.
///
/// Not for production: bodies and headers may carry sensitive data.
pub async fn log_request(req: Request, next: Next) -> Response {
    let (req, snapshot) = RequestSnapshot::capture(req).await;
    match serde_json::to_string_pretty(&snapshot) {
        Ok(rendered) => info!("{}", rendered),
        Err(err) => warn!("failed to marshal request: {}", err),
    }
    next.run(req).await
}
