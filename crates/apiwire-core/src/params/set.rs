//! Ordered application of parameters onto the request state

use serde_json::{Map, Value};

use crate::http::body::{
    FileStream, MultipartPart, PartContent, RequestBody, APPLICATION_JSON, APPLICATION_XML,
    FORM_URLENCODED, OCTET_STREAM, TEXT_PLAIN,
};
use crate::http::request::TemplateValue;
use crate::params::parameter::{Parameter, ParameterLocation, ParameterValue};
use crate::params::serialization::{flatten_pairs, value_to_string, ArraySerialization};
use crate::request::parts::{FormField, FormValue, RequestParts};
use crate::{Error, Result};

/// Locations in the order they are applied
const APPLY_ORDER: [ParameterLocation; 7] = [
    ParameterLocation::Template,
    ParameterLocation::Query,
    ParameterLocation::AdditionalQuery,
    ParameterLocation::Header,
    ParameterLocation::AdditionalHeaders,
    ParameterLocation::Form,
    ParameterLocation::AdditionalForms,
];

/// The parameters declared for one call
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    parameters: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, parameter: Parameter) {
        self.parameters.push(parameter);
    }

    pub fn with(mut self, parameter: Parameter) -> Self {
        self.add(parameter);
        self
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    /// Fail on the first parameter with a missing key or required value
    pub fn validate(&self) -> Result<()> {
        self.parameters.iter().try_for_each(Parameter::validate)
    }

    /// Validate, then write every parameter into `parts`.
    ///
    /// Order: template, query, additional query, header, additional headers,
    /// form, additional forms, body. The form is folded into the body last.
    pub fn apply(&self, parts: &mut RequestParts, arrays: ArraySerialization) -> Result<()> {
        self.validate()?;

        for location in APPLY_ORDER {
            for parameter in self.parameters.iter().filter(|p| p.location() == location) {
                apply_one(parameter, parts)?;
            }
        }

        self.apply_body(parts)?;
        apply_form_body(parts, arrays)
    }

    fn apply_body(&self, parts: &mut RequestParts) -> Result<()> {
        let body_params: Vec<&Parameter> = self
            .parameters
            .iter()
            .filter(|p| p.location() == ParameterLocation::Body)
            .collect();

        if body_params.is_empty() {
            return Ok(());
        }

        let (keyed, unkeyed): (Vec<&Parameter>, Vec<&Parameter>) =
            body_params.into_iter().partition(|p| p.key().is_some());

        if unkeyed.len() > 1 || (!unkeyed.is_empty() && !keyed.is_empty()) {
            return Err(Error::configuration(
                "A request body is either one unnamed value or a set of named fields",
            ));
        }

        let value = if keyed.is_empty() {
            match unkeyed.first() {
                Some(parameter) => parameter.resolved_value()?,
                None => ParameterValue::Absent,
            }
        } else {
            let mut object = Map::new();
            for parameter in keyed {
                let key = parameter.key().unwrap_or_default().to_string();
                match parameter.resolved_value()? {
                    ParameterValue::Absent => {}
                    ParameterValue::Json(value) => {
                        object.insert(key, value);
                    }
                    _ => {
                        return Err(Error::Serialization {
                            field: Some(key.clone()),
                            message: format!(
                                "Unable to serialize field: `{}`, Due to: `binary content cannot be a named body field`",
                                key
                            ),
                            source: None,
                        })
                    }
                }
            }
            ParameterValue::Json(Value::Object(object))
        };

        let (body, default_type) = body_from_value(value, parts.headers.get("content-type"))?;
        parts.body = body;
        if let Some(content_type) = default_type {
            if parts.default_content_type {
                parts.headers.insert_if_absent("Content-Type", content_type);
            }
        }
        Ok(())
    }
}

impl FromIterator<Parameter> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        Self {
            parameters: iter.into_iter().collect(),
        }
    }
}

fn apply_one(parameter: &Parameter, parts: &mut RequestParts) -> Result<()> {
    let key = parameter.key().unwrap_or_default();
    let value = parameter.resolved_value()?;

    match parameter.location() {
        ParameterLocation::Template => {
            let value = match value {
                ParameterValue::Json(value) => value,
                _ => Value::Null,
            };
            parts.set_template(
                key,
                TemplateValue {
                    value,
                    encode: parameter.encode(),
                },
            );
        }
        ParameterLocation::Query => {
            if let ParameterValue::Json(value) = value {
                if !value.is_null() {
                    parts.set_explicit_query(key, value);
                }
            }
        }
        ParameterLocation::Header => {
            if let ParameterValue::Json(value) = value {
                if !value.is_null() {
                    parts.set_explicit_header(key, value_to_string(&value));
                }
            }
        }
        ParameterLocation::Form => {
            if let Some(form_value) = form_value(value) {
                parts.push_explicit_form(FormField {
                    key: key.to_string(),
                    value: form_value,
                    content_type: parameter.part_content_type().map(str::to_string),
                });
            }
        }
        ParameterLocation::AdditionalQuery => {
            for (name, value) in entries(value) {
                parts.merge_query(&name, value);
            }
        }
        ParameterLocation::AdditionalHeaders => {
            for (name, value) in entries(value) {
                parts.merge_header(&name, value_to_string(&value));
            }
        }
        ParameterLocation::AdditionalForms => {
            for (name, value) in entries(value) {
                parts.merge_form(FormField {
                    key: name,
                    value: FormValue::Value(value),
                    content_type: None,
                });
            }
        }
        ParameterLocation::Body => {}
    }
    Ok(())
}

fn entries(value: ParameterValue) -> Vec<(String, Value)> {
    match value {
        ParameterValue::Json(Value::Object(map)) => map
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect(),
        _ => Vec::new(),
    }
}

fn form_value(value: ParameterValue) -> Option<FormValue> {
    match value {
        ParameterValue::Absent | ParameterValue::Json(Value::Null) => None,
        ParameterValue::Json(value) => Some(FormValue::Value(value)),
        ParameterValue::File(file) => Some(FormValue::File(file)),
        ParameterValue::Bytes(bytes) => Some(FormValue::File(FileStream::new(bytes))),
        ParameterValue::Xml(text) => Some(FormValue::Value(Value::String(text))),
    }
}

/// Turn the resolved body value into a wire body and its default content type
fn body_from_value(
    value: ParameterValue,
    explicit_type: Option<&str>,
) -> Result<(RequestBody, Option<String>)> {
    let wants_json = explicit_type.is_some_and(|t| t.to_ascii_lowercase().contains("json"));

    Ok(match value {
        ParameterValue::Absent | ParameterValue::Json(Value::Null) => (RequestBody::Empty, None),
        ParameterValue::Bytes(bytes) => (RequestBody::Bytes(bytes), Some(OCTET_STREAM.to_string())),
        ParameterValue::File(file) => {
            let content_type = file.content_type().unwrap_or(OCTET_STREAM).to_string();
            (RequestBody::Stream(file), Some(content_type))
        }
        ParameterValue::Xml(text) => (RequestBody::Xml(text), Some(APPLICATION_XML.to_string())),
        ParameterValue::Json(Value::String(text)) if wants_json => (RequestBody::Json(text), None),
        ParameterValue::Json(Value::String(text)) => {
            (RequestBody::Text(text), Some(TEXT_PLAIN.to_string()))
        }
        ParameterValue::Json(value @ (Value::Object(_) | Value::Array(_))) => {
            let text = serde_json::to_string(&value)?;
            (RequestBody::Json(text), Some(APPLICATION_JSON.to_string()))
        }
        ParameterValue::Json(scalar) => (RequestBody::Text(scalar.to_string()), Some(TEXT_PLAIN.to_string())),
    })
}

/// Fold collected form fields into a url-encoded or multipart body
fn apply_form_body(parts: &mut RequestParts, arrays: ArraySerialization) -> Result<()> {
    if parts.form.is_empty() {
        return Ok(());
    }
    if !parts.body.is_empty() {
        return Err(Error::configuration(
            "A request cannot carry both form fields and a body",
        ));
    }

    let multipart = parts
        .form
        .iter()
        .any(|field| matches!(field.value, FormValue::File(_)) || field.content_type.is_some());

    let fields = std::mem::take(&mut parts.form);
    if multipart {
        let mut multipart_parts = Vec::with_capacity(fields.len());
        for field in fields {
            multipart_parts.push(multipart_part(field)?);
        }
        parts.body = RequestBody::Multipart(multipart_parts);
    } else {
        let values: Vec<(String, Value)> = fields
            .into_iter()
            .filter_map(|field| match field.value {
                FormValue::Value(value) => Some((field.key, value)),
                FormValue::File(_) => None,
            })
            .collect();
        parts.body = RequestBody::Form(flatten_pairs(&values, arrays));
        if parts.default_content_type {
            parts.headers.insert_if_absent("Content-Type", FORM_URLENCODED);
        }
    }
    Ok(())
}

fn multipart_part(field: FormField) -> Result<MultipartPart> {
    let (content, content_type) = match field.value {
        FormValue::File(file) => {
            let content_type = field
                .content_type
                .or_else(|| file.content_type().map(str::to_string))
                .unwrap_or_else(|| OCTET_STREAM.to_string());
            (PartContent::File(file), Some(content_type))
        }
        FormValue::Value(Value::String(text)) => (PartContent::Text(text), field.content_type),
        FormValue::Value(value @ (Value::Object(_) | Value::Array(_))) => (
            PartContent::Text(serde_json::to_string(&value)?),
            field.content_type.or_else(|| Some(APPLICATION_JSON.to_string())),
        ),
        FormValue::Value(scalar) => (PartContent::Text(scalar.to_string()), field.content_type),
    };
    Ok(MultipartPart {
        name: field.key,
        content,
        content_type,
    })
}
