//! Route input schemas and the binder that turns a matched request into a
//! JSON input value.
//!
//! A [`FieldSchema`] is an ordered list of [`FieldMeta`] computed once at
//! registration. At dispatch time a [`Binder`] walks it, pulls each value
//! from its location, converts it to the declared kind and produces one JSON
//! object keyed by field name. Path fields consume captured values
//! positionally, so the n-th path field receives the n-th dynamic segment.

use http::Request;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

use crate::router::{ParamVec, Route};

/// Where a field's raw value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldLocation {
    Path,
    Query,
    Header,
    Cookie,
    /// Whole request body
    Body,
    /// One key of an `application/x-www-form-urlencoded` body
    #[serde(alias = "formdata")]
    Form,
}

impl fmt::Display for FieldLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldLocation::Path => "path",
            FieldLocation::Query => "query",
            FieldLocation::Header => "header",
            FieldLocation::Cookie => "cookie",
            FieldLocation::Body => "body",
            FieldLocation::Form => "form",
        };
        write!(f, "{s}")
    }
}

/// Type a raw string value is converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    String,
    Integer,
    Unsigned,
    Float,
    Boolean,
    /// Parsed as a JSON document
    Json,
}

fn default_required() -> bool {
    true
}

/// One input field of a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub name: String,
    #[serde(rename = "in")]
    pub location: FieldLocation,
    #[serde(default)]
    pub kind: FieldKind,
    /// Fields are required unless marked otherwise
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl FieldMeta {
    #[must_use]
    pub fn new(name: impl Into<String>, location: FieldLocation, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            location,
            kind,
            required: true,
            description: String::new(),
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Ordered input fields of a route. Empty means the route takes no input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSchema {
    fields: Vec<FieldMeta>,
}

impl FieldSchema {
    #[must_use]
    pub fn new(fields: Vec<FieldMeta>) -> Self {
        Self { fields }
    }

    /// Append a field (builder style).
    #[must_use]
    pub fn field(mut self, meta: FieldMeta) -> Self {
        self.fields.push(meta);
        self
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields bound from path captures.
    #[must_use]
    pub fn path_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| f.location == FieldLocation::Path)
            .count()
    }
}

/// A field could not be bound. Surfaced to the client as 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindError {
    /// Offending field, empty when the failure is not tied to one
    pub field: String,
    pub message: String,
}

impl BindError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    fn missing(field: &str) -> Self {
        Self::new(field, format!("required field {field} not provided"))
    }

    fn unusable(field: &str, value: &str) -> Self {
        Self::new(
            field,
            format!("the value {value} cannot be used for field {field}"),
        )
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BindError {}

/// Materialises a route's input from the captured path values and the raw
/// request. Called exactly once per dispatched request, after the route has
/// been selected and before any middleware or handler runs.
pub trait Binder: Send + Sync {
    fn bind(
        &self,
        route: &Route,
        path_params: &ParamVec,
        request: &Request<Vec<u8>>,
    ) -> Result<Value, BindError>;
}

/// Default binder driven by the route's [`FieldSchema`].
///
/// - empty value on a required field: error
/// - empty value on an optional field: field omitted
/// - path values are always present; an empty wildcard capture binds as `""`
///   and fails conversion for non-string kinds
/// - conversion failure: error naming the value and the field
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaBinder;

impl Binder for SchemaBinder {
    fn bind(
        &self,
        route: &Route,
        path_params: &ParamVec,
        request: &Request<Vec<u8>>,
    ) -> Result<Value, BindError> {
        let schema = route.fields();
        let mut out = Map::with_capacity(schema.len());
        let mut captured = path_params.iter();
        let source = RequestSource::new(request);

        for field in schema.iter() {
            let raw = match field.location {
                FieldLocation::Path => match captured.next() {
                    Some((_, value)) => value.clone(),
                    None => {
                        return Err(BindError::new(
                            &field.name,
                            format!("not enough path values for field {}", field.name),
                        ))
                    }
                },
                FieldLocation::Query => source.query(&field.name),
                FieldLocation::Header => source.header(&field.name),
                FieldLocation::Cookie => source.cookie(&field.name),
                FieldLocation::Body => source.body(),
                FieldLocation::Form => source.form(&field.name),
            };

            // a captured path value is present even when a wildcard took an
            // empty remainder
            if raw.is_empty() && !matches!(field.location, FieldLocation::Path) {
                if field.required {
                    return Err(BindError::missing(&field.name));
                }
                continue;
            }
            out.insert(field.name.clone(), convert(field, &raw)?);
        }

        Ok(Value::Object(out))
    }
}

/// Convert one raw value to the field's declared kind.
pub fn convert(field: &FieldMeta, raw: &str) -> Result<Value, BindError> {
    let unusable = || BindError::unusable(&field.name, raw);
    match field.kind {
        FieldKind::String => Ok(Value::String(raw.to_string())),
        FieldKind::Integer => raw
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|_| unusable()),
        FieldKind::Unsigned => raw
            .parse::<u64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|_| unusable()),
        FieldKind::Float => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(unusable),
        FieldKind::Boolean => parse_bool(raw).map(Value::Bool).ok_or_else(unusable),
        FieldKind::Json => serde_json::from_str(raw).map_err(|_| unusable()),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Lazy accessors over the parts of a request the binder reads.
struct RequestSource<'a> {
    request: &'a Request<Vec<u8>>,
}

impl<'a> RequestSource<'a> {
    fn new(request: &'a Request<Vec<u8>>) -> Self {
        Self { request }
    }

    fn query(&self, name: &str) -> String {
        self.request
            .uri()
            .query()
            .map(|q| last_pair(q.as_bytes(), name))
            .unwrap_or_default()
    }

    fn header(&self, name: &str) -> String {
        self.request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_default()
    }

    fn cookie(&self, name: &str) -> String {
        self.request
            .headers()
            .get_all(http::header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.to_string())
            .unwrap_or_default()
    }

    fn body(&self) -> String {
        String::from_utf8_lossy(self.request.body()).into_owned()
    }

    fn form(&self, name: &str) -> String {
        last_pair(self.request.body(), name)
    }
}

/// Last value for `name` in a urlencoded string (`a=1&a=2` yields `2`).
fn last_pair(encoded: &[u8], name: &str) -> String {
    url::form_urlencoded::parse(encoded)
        .filter(|(k, _)| k == name)
        .last()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}
