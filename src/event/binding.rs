//! HTTP protocol binding: structured JSON mode and binary (`ce-*` header) mode.

use std::collections::BTreeMap;

use axum::http::{header::CONTENT_TYPE, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::{value::RawValue, Value};

use super::{Event, EventBuilder, ExtensionValue, SpecVersion};
use crate::EventError;

const STRUCTURED_JSON: &str = "application/cloudevents+json";
const BATCH_JSON: &str = "application/cloudevents-batch+json";
const HEADER_PREFIX: &str = "ce-";

impl Event {
    /// Decodes an event from request headers and body.
    ///
    /// Structured mode is picked by content type; otherwise a
    /// `ce-specversion` header selects binary mode.
    pub fn from_http(headers: &HeaderMap, body: Bytes) -> Result<Self, EventError> {
        let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
        match content_type.map(media_type).as_deref() {
            Some(STRUCTURED_JSON) => from_structured(&body),
            Some(BATCH_JSON) => Err(EventError::BatchUnsupported),
            _ if headers.contains_key("ce-specversion") => from_binary(headers, content_type, body),
            _ => Err(EventError::UnknownEncoding),
        }
    }
}

fn from_structured(body: &[u8]) -> Result<Event, EventError> {
    let mut fields: BTreeMap<String, &RawValue> = serde_json::from_slice(body)?;
    // null means absent
    fields.retain(|_, raw| raw.get() != "null");

    let version = parse_version(take_string(&mut fields, "specversion")?)?;
    let mut builder = EventBuilder::default();
    builder.spec_version(version);

    if let Some(id) = take_string(&mut fields, "id")? {
        builder.id(id);
    }
    if let Some(source) = take_string(&mut fields, "source")? {
        builder.source(source);
    }
    if let Some(ty) = take_string(&mut fields, "type")? {
        builder.ty(ty);
    }
    if let Some(time) = take_string(&mut fields, "time")? {
        builder.time(parse_time(&time)?);
    }
    if let Some(subject) = take_string(&mut fields, "subject")? {
        builder.subject(subject);
    }
    let schema_key = match version {
        SpecVersion::V03 => "schemaurl",
        SpecVersion::V10 => "dataschema",
    };
    if let Some(schema) = take_string(&mut fields, schema_key)? {
        builder.data_schema(schema);
    }
    let content_type = take_string(&mut fields, "datacontenttype")?;
    if let Some(content_type) = &content_type {
        builder.data_content_type(content_type.as_str());
    }

    let base64_encoded = match version {
        SpecVersion::V03 => match take_string(&mut fields, "datacontentencoding")?.as_deref() {
            None => false,
            Some(enc) if enc.eq_ignore_ascii_case("base64") => true,
            Some(enc) => {
                return Err(EventError::invalid(
                    "datacontentencoding",
                    format!("unsupported encoding {enc}"),
                ))
            }
        },
        SpecVersion::V10 => false,
    };

    match (fields.remove("data"), fields.remove("data_base64")) {
        (Some(_), Some(_)) => {
            return Err(EventError::invalid(
                "data",
                "data and data_base64 are mutually exclusive",
            ))
        }
        (None, Some(raw)) => {
            let encoded = raw_string("data_base64", raw)?;
            builder.data(STANDARD.decode(encoded)?);
        }
        (Some(raw), None) => {
            builder.data(structured_data(raw, content_type.as_deref(), base64_encoded)?);
        }
        (None, None) => {}
    }

    for (name, raw) in fields {
        let value: Value = serde_json::from_str(raw.get())?;
        builder.extension(name.as_str(), extension_value(&name, value)?);
    }

    builder.build()
}

fn from_binary(
    headers: &HeaderMap,
    content_type: Option<&str>,
    body: Bytes,
) -> Result<Event, EventError> {
    let mut builder = EventBuilder::default();
    let mut version = None;

    for (name, value) in headers {
        let Some(attr) = name.as_str().strip_prefix(HEADER_PREFIX) else {
            continue;
        };
        let value = value
            .to_str()
            .map_err(|_| EventError::invalid(attr, "header value is not visible ASCII"))?;
        let value = urlencoding::decode(value)
            .map_err(|_| EventError::invalid(attr, "percent-encoding is not valid UTF-8"))?
            .into_owned();

        match attr {
            "specversion" => version = Some(parse_version(Some(value))?),
            "id" => {
                builder.id(value);
            }
            "source" => {
                builder.source(value);
            }
            "type" => {
                builder.ty(value);
            }
            "time" => {
                builder.time(parse_time(&value)?);
            }
            "subject" => {
                builder.subject(value);
            }
            "dataschema" | "schemaurl" => {
                builder.data_schema(value);
            }
            // carried by Content-Type in binary mode
            "datacontenttype" | "datacontentencoding" => {}
            _ => {
                builder.extension(attr, value);
            }
        }
    }

    builder.spec_version(version.ok_or(EventError::MissingAttribute("specversion"))?);
    if let Some(content_type) = content_type {
        builder.data_content_type(content_type);
    }
    if !body.is_empty() {
        builder.data(body);
    }
    builder.build()
}

fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn is_json(content_type: Option<&str>) -> bool {
    match content_type.map(media_type) {
        None => true,
        Some(mt) => mt == "application/json" || mt == "text/json" || mt.ends_with("+json"),
    }
}

fn parse_version(value: Option<String>) -> Result<SpecVersion, EventError> {
    let value = value.ok_or(EventError::MissingAttribute("specversion"))?;
    value
        .parse()
        .map_err(|_| EventError::UnsupportedSpecVersion(value))
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, EventError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EventError::invalid("time", e.to_string()))
}

fn take_string(
    fields: &mut BTreeMap<String, &RawValue>,
    name: &'static str,
) -> Result<Option<String>, EventError> {
    fields
        .remove(name)
        .map(|raw| raw_string(name, raw))
        .transpose()
}

fn raw_string(name: &str, raw: &RawValue) -> Result<String, EventError> {
    serde_json::from_str(raw.get()).map_err(|_| EventError::invalid(name, "expected a string"))
}

fn structured_data(
    raw: &RawValue,
    content_type: Option<&str>,
    base64_encoded: bool,
) -> Result<Vec<u8>, EventError> {
    if base64_encoded {
        return Ok(STANDARD.decode(raw_string("data", raw)?)?);
    }
    if !is_json(content_type) && raw.get().starts_with('"') {
        return Ok(raw_string("data", raw)?.into_bytes());
    }
    Ok(raw.get().as_bytes().to_vec())
}

fn extension_value(name: &str, value: Value) -> Result<ExtensionValue, EventError> {
    match value {
        Value::Bool(b) => Ok(b.into()),
        Value::String(s) => Ok(s.into()),
        Value::Number(n) => n
            .as_i64()
            .map(ExtensionValue::from)
            .ok_or_else(|| EventError::invalid(name, "numeric extensions must be integers")),
        _ => Err(EventError::invalid(
            name,
            "extension values must be a boolean, integer or string",
        )),
    }
}
