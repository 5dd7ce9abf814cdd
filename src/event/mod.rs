//! CloudEvents data model.
//!
//! An [`Event`] is only ever produced through [`EventBuilder::build`], which
//! checks the required context attributes and extension names, so any
//! `Event` in hand is valid and immutable.

mod binding;

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use derive_builder::Builder;
use derive_more::From;
use serde::{Serialize, Serializer};
use strum::{Display, EnumString};

use crate::EventError;

/// Context attribute names; extensions may not reuse them.
const RESERVED: &[&str] = &[
    "specversion",
    "id",
    "source",
    "type",
    "time",
    "datacontenttype",
    "dataschema",
    "subject",
    "data",
    "data_base64",
    "schemaurl",
    "datacontentencoding",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
pub enum SpecVersion {
    #[strum(serialize = "0.3")]
    V03,
    #[default]
    #[strum(serialize = "1.0")]
    V10,
}

/// Value of a producer-defined extension attribute.
#[derive(Debug, Clone, PartialEq, From)]
pub enum ExtensionValue {
    Boolean(bool),
    Integer(i64),
    String(String),
    Binary(Vec<u8>),
}

impl From<&str> for ExtensionValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i32> for ExtensionValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl Serialize for ExtensionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Boolean(v) => serializer.serialize_bool(*v),
            Self::Integer(v) => serializer.serialize_i64(*v),
            Self::String(v) => serializer.serialize_str(v),
            Self::Binary(v) => serializer.serialize_str(&STANDARD.encode(v)),
        }
    }
}

#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(build_fn(private, name = "_priv_build"))]
pub struct Event {
    #[builder(default)]
    spec_version: SpecVersion,
    #[builder(setter(into))]
    id: String,
    #[builder(setter(into))]
    source: String,
    #[builder(setter(into))]
    ty: String,
    #[builder(setter(into, strip_option), default)]
    time: Option<DateTime<Utc>>,
    #[builder(setter(into, strip_option), default)]
    data_content_type: Option<String>,
    #[builder(setter(into, strip_option), default)]
    data_schema: Option<String>,
    #[builder(setter(into, strip_option), default)]
    subject: Option<String>,
    #[builder(setter(into, strip_option), default)]
    data: Option<Bytes>,
    #[builder(setter(custom), default)]
    extensions: BTreeMap<String, ExtensionValue>,
}

impl Event {
    pub fn builder() -> EventBuilder {
        EventBuilder::default()
    }

    pub fn spec_version(&self) -> SpecVersion {
        self.spec_version
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ty(&self) -> &str {
        &self.ty
    }

    pub fn time(&self) -> Option<&DateTime<Utc>> {
        self.time.as_ref()
    }

    pub fn data_content_type(&self) -> Option<&str> {
        self.data_content_type.as_deref()
    }

    pub fn data_schema(&self) -> Option<&str> {
        self.data_schema.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Payload bytes exactly as they arrived on the wire.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn extensions(&self) -> &BTreeMap<String, ExtensionValue> {
        &self.extensions
    }
}

impl EventBuilder {
    pub fn build(&self) -> Result<Event, EventError> {
        let event = self._priv_build().map_err(|err| match err {
            EventBuilderError::UninitializedField(field) => {
                EventError::MissingAttribute(attribute_name(field))
            }
            EventBuilderError::ValidationError(reason) => EventError::invalid("event", reason),
        })?;

        for (name, value) in [
            ("id", &event.id),
            ("source", &event.source),
            ("type", &event.ty),
        ] {
            if value.is_empty() {
                return Err(EventError::MissingAttribute(name));
            }
        }
        for name in event.extensions.keys() {
            validate_extension_name(name)?;
        }
        Ok(event)
    }

    pub fn extension(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ExtensionValue>,
    ) -> &mut Self {
        self.extensions
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }
}

fn attribute_name(field: &'static str) -> &'static str {
    match field {
        "ty" => "type",
        "spec_version" => "specversion",
        other => other,
    }
}

fn validate_extension_name(name: &str) -> Result<(), EventError> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(EventError::invalid(
            name,
            "extension names must consist of ASCII letters and digits",
        ));
    }
    if RESERVED.contains(&name) {
        return Err(EventError::invalid(
            name,
            "extension name collides with a context attribute",
        ));
    }
    Ok(())
}
