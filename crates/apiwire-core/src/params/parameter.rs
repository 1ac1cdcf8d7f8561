//! Declared call parameters

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::http::body::FileStream;
use crate::{Error, Result};

/// Where a parameter lands in the outbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Template,
    Query,
    Header,
    Form,
    Body,
    AdditionalForms,
    AdditionalQuery,
    AdditionalHeaders,
}

impl ParameterLocation {
    /// Whether parameters at this location must carry a key
    pub fn requires_key(&self) -> bool {
        matches!(
            self,
            ParameterLocation::Template
                | ParameterLocation::Query
                | ParameterLocation::Header
                | ParameterLocation::Form
        )
    }

    fn is_additional(&self) -> bool {
        matches!(
            self,
            ParameterLocation::AdditionalForms
                | ParameterLocation::AdditionalQuery
                | ParameterLocation::AdditionalHeaders
        )
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterLocation::Template => "template",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Form => "form",
            ParameterLocation::Body => "body",
            ParameterLocation::AdditionalForms => "additional form",
            ParameterLocation::AdditionalQuery => "additional query",
            ParameterLocation::AdditionalHeaders => "additional header",
        };
        f.write_str(name)
    }
}

/// Raw value of a parameter
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParameterValue {
    #[default]
    Absent,
    Json(Value),
    /// A file handle; becomes a multipart part in a form or a stream body
    File(FileStream),
    Bytes(Vec<u8>),
    /// Pre-serialized XML document
    Xml(String),
}

impl ParameterValue {
    /// Serialize any `Serialize` value into a JSON parameter value
    pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(ParameterValue::Json(serde_json::to_value(value)?))
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        ParameterValue::Bytes(bytes.into())
    }

    /// Absent values and JSON `null` both count as missing
    pub fn is_missing(&self) -> bool {
        matches!(self, ParameterValue::Absent | ParameterValue::Json(Value::Null))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ParameterValue::Json(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Value> for ParameterValue {
    fn from(value: Value) -> Self {
        ParameterValue::Json(value)
    }
}

impl From<FileStream> for ParameterValue {
    fn from(file: FileStream) -> Self {
        ParameterValue::File(file)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Json(Value::String(value.to_string()))
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Json(Value::String(value))
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ParameterValue {
                fn from(value: $ty) -> Self {
                    ParameterValue::Json(Value::from(value))
                }
            }
        )*
    };
}

impl_from_scalar!(bool, i32, i64, u32, u64, f64);

impl<T: Into<ParameterValue>> From<Option<T>> for ParameterValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// Custom per-parameter serializer, applied to JSON values before placement
pub type ValueSerializer =
    Arc<dyn Fn(&Value) -> std::result::Result<Value, anyhow::Error> + Send + Sync>;

/// One declared parameter of a call
#[derive(Clone)]
pub struct Parameter {
    location: ParameterLocation,
    key: Option<String>,
    value: ParameterValue,
    required: bool,
    encode: bool,
    content_type: Option<String>,
    serializer: Option<ValueSerializer>,
}

impl Parameter {
    pub fn new(
        location: ParameterLocation,
        key: Option<String>,
        value: impl Into<ParameterValue>,
    ) -> Self {
        Self {
            location,
            key,
            value: value.into(),
            required: false,
            encode: true,
            content_type: None,
            serializer: None,
        }
    }

    pub fn template(key: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self::new(ParameterLocation::Template, Some(key.into()), value)
    }

    pub fn query(key: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self::new(ParameterLocation::Query, Some(key.into()), value)
    }

    pub fn header(key: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self::new(ParameterLocation::Header, Some(key.into()), value)
    }

    pub fn form(key: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self::new(ParameterLocation::Form, Some(key.into()), value)
    }

    /// A named body field; named body fields merge into one JSON object
    pub fn body(key: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self::new(ParameterLocation::Body, Some(key.into()), value)
    }

    /// The whole request body
    pub fn body_value(value: impl Into<ParameterValue>) -> Self {
        Self::new(ParameterLocation::Body, None, value)
    }

    pub fn xml_body(document: impl Into<String>) -> Self {
        Self::new(ParameterLocation::Body, None, ParameterValue::Xml(document.into()))
    }

    pub fn additional_query<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::new(ParameterLocation::AdditionalQuery, None, collect_object(entries))
    }

    pub fn additional_headers<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::new(ParameterLocation::AdditionalHeaders, None, collect_object(entries))
    }

    pub fn additional_forms<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::new(ParameterLocation::AdditionalForms, None, collect_object(entries))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Skip path-segment encoding for a template parameter
    pub fn unencoded(mut self) -> Self {
        self.encode = false;
        self
    }

    /// Content type of a multipart part or of the body
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn serializer<F>(mut self, serializer: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<Value, anyhow::Error> + Send + Sync + 'static,
    {
        self.serializer = Some(Arc::new(serializer));
        self
    }

    pub fn location(&self) -> ParameterLocation {
        self.location
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn value(&self) -> &ParameterValue {
        &self.value
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn encode(&self) -> bool {
        self.encode
    }

    pub fn part_content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Check the key and required-value constraints
    pub fn validate(&self) -> Result<()> {
        if self.key.is_none() && self.location.requires_key() {
            return Err(Error::Validation {
                field: self.location.to_string(),
                message: format!("Missing required `key` for type: `{}`", self.location),
            });
        }

        if self.required && self.value.is_missing() {
            let name = self.field_name();
            return Err(Error::Validation {
                field: name.to_string(),
                message: format!("Missing required {} field: `{}`", self.location, name),
            });
        }

        if self.location.is_additional()
            && !matches!(
                self.value,
                ParameterValue::Absent | ParameterValue::Json(Value::Object(_) | Value::Null)
            )
        {
            return Err(Error::Validation {
                field: self.location.to_string(),
                message: format!("{} parameters must be a map of entries", self.location),
            });
        }

        Ok(())
    }

    /// The value after the custom serializer, if any, has run
    pub fn resolved_value(&self) -> Result<ParameterValue> {
        match (&self.serializer, &self.value) {
            (Some(serializer), ParameterValue::Json(value)) => match serializer(value) {
                Ok(serialized) => Ok(ParameterValue::Json(serialized)),
                Err(cause) => {
                    let name = self.field_name();
                    Err(Error::Serialization {
                        field: Some(name.to_string()),
                        message: format!(
                            "Unable to serialize field: `{}`, Due to: `{}`",
                            name, cause
                        ),
                        source: Some(cause),
                    })
                }
            },
            _ => Ok(self.value.clone()),
        }
    }

    fn field_name(&self) -> &str {
        self.key.as_deref().unwrap_or("body")
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("location", &self.location)
            .field("key", &self.key)
            .field("value", &self.value)
            .field("required", &self.required)
            .field("encode", &self.encode)
            .field("content_type", &self.content_type)
            .field("serializer", &self.serializer.is_some())
            .finish()
    }
}

fn collect_object<I, K, V>(entries: I) -> Value
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    Value::Object(
        entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect(),
    )
}
