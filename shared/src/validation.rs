//! Schema-driven coercion and validation of body, query and path parameters.
//!
//! Each route declares a [`RouteSchema`] with three independent surfaces.
//! Declared fields are coerced to their semantic type and defaulted; unknown
//! fields are dropped. Violations from all three surfaces are collected into
//! one [`Error::Validation`] in body, query, params order.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Number, Value};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::pipeline::{ApiRequest, ParsedInput, RawInput, Stage};
use crate::{Error, Result};

/// The semantic type a field is coerced to.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Text {
        min: Option<usize>,
        max: Option<usize>,
        trim: bool,
    },
    /// Validated and lowercased.
    Email,
    /// Canonical hyphenated form.
    Uuid,
    /// Accepts JSON integers and numeric strings.
    Integer { min: Option<i64>, max: Option<i64> },
    /// RFC 3339 or `YYYY-MM-DD`, normalised to an RFC 3339 UTC timestamp.
    Date,
    Object(Schema),
}

/// A declared field of one request surface.
#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    kind: FieldKind,
    optional: bool,
    nullable: bool,
    default: Option<Value>,
}

impl Field {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            optional: false,
            nullable: false,
            default: None,
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(
            name,
            FieldKind::Text {
                min: None,
                max: None,
                trim: false,
            },
        )
    }

    pub fn email(name: &'static str) -> Self {
        Self::new(name, FieldKind::Email)
    }

    pub fn uuid(name: &'static str) -> Self {
        Self::new(name, FieldKind::Uuid)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer { min: None, max: None })
    }

    pub fn date(name: &'static str) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub fn object(name: &'static str, schema: Schema) -> Self {
        Self::new(name, FieldKind::Object(schema))
    }

    /// Bound text length in characters. No-op for other kinds.
    pub fn length(mut self, min_len: usize, max_len: usize) -> Self {
        if let FieldKind::Text { min, max, .. } = &mut self.kind {
            *min = Some(min_len);
            *max = Some(max_len);
        }
        self
    }

    pub fn max_length(mut self, max_len: usize) -> Self {
        if let FieldKind::Text { max, .. } = &mut self.kind {
            *max = Some(max_len);
        }
        self
    }

    /// Strip surrounding whitespace before length checks.
    pub fn trim(mut self) -> Self {
        if let FieldKind::Text { trim, .. } = &mut self.kind {
            *trim = true;
        }
        self
    }

    /// Inclusive integer bounds. No-op for other kinds.
    pub fn range(mut self, lo: i64, hi: i64) -> Self {
        if let FieldKind::Integer { min, max } = &mut self.kind {
            *min = Some(lo);
            *max = Some(hi);
        }
        self
    }

    pub fn min(mut self, lo: i64) -> Self {
        if let FieldKind::Integer { min, .. } = &mut self.kind {
            *min = Some(lo);
        }
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Accept an explicit `null`.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Shape of one request surface.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<Field>,
    partial: bool,
    require_any: Option<&'static str>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// Every field becomes optional and defaults are not applied.
    pub fn partial(mut self) -> Self {
        self.partial = true;
        self
    }

    /// Fail with `message` when no declared field is present.
    pub fn require_any(mut self, message: &'static str) -> Self {
        self.require_any = Some(message);
        self
    }

    fn parse(&self, input: &Map<String, Value>, path: &str, errors: &mut Vec<String>) -> Map<String, Value> {
        let mut output = Map::new();

        for field in &self.fields {
            let field_path = format!("{}.{}", path, field.name);
            let value = input.get(field.name);

            match value {
                Some(Value::Null) if field.nullable => {
                    output.insert(field.name.to_string(), Value::Null);
                }
                None => {
                    if self.partial {
                        continue;
                    }
                    if let Some(default) = &field.default {
                        output.insert(field.name.to_string(), default.clone());
                    } else if !field.optional {
                        errors.push(format!("{}: Required", field_path));
                    }
                }
                Some(value) => match coerce(&field.kind, value, &field_path, errors) {
                    Ok(coerced) => {
                        output.insert(field.name.to_string(), coerced);
                    }
                    Err(message) => errors.push(format!("{}: {}", field_path, message)),
                },
            }
        }

        if let Some(message) = self.require_any {
            if output.is_empty() {
                errors.push(format!("{}: {}", path, message));
            }
        }

        output
    }
}

/// The three sub-schemas of a route; each defaults to empty.
#[derive(Debug, Clone, Default)]
pub struct RouteSchema {
    body: Schema,
    query: Schema,
    params: Schema,
}

impl RouteSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, schema: Schema) -> Self {
        self.body = schema;
        self
    }

    pub fn query(mut self, schema: Schema) -> Self {
        self.query = schema;
        self
    }

    pub fn params(mut self, schema: Schema) -> Self {
        self.params = schema;
        self
    }

    /// Parse all three surfaces, aggregating every violation.
    pub fn parse(&self, raw: &RawInput) -> Result<ParsedInput> {
        let mut errors = Vec::new();

        let body = match raw_body(raw.body.as_deref()) {
            Ok(fields) => self.body.parse(&fields, "body", &mut errors),
            Err(message) => {
                errors.push(format!("body: {}", message));
                Map::new()
            }
        };
        let query = self.query.parse(&string_map(&raw.query), "query", &mut errors);
        let params = self.params.parse(&string_map(&raw.params), "params", &mut errors);

        if errors.is_empty() {
            Ok(ParsedInput {
                body,
                query,
                params,
            })
        } else {
            Err(Error::Validation(errors))
        }
    }
}

/// Pipeline stage that replaces raw request surfaces with parsed ones.
pub struct ValidationGate {
    schema: RouteSchema,
}

impl ValidationGate {
    pub fn new(schema: RouteSchema) -> Self {
        Self { schema }
    }
}

impl Stage for ValidationGate {
    fn name(&self) -> &'static str {
        "validation_gate"
    }

    fn apply(&self, mut request: ApiRequest) -> Result<ApiRequest> {
        let raw = request
            .raw()
            .ok_or_else(|| Error::Internal("request surfaces were already validated".to_string()))?;
        let parsed = self.schema.parse(raw)?;
        request.replace_input(parsed);
        Ok(request)
    }
}

fn raw_body(body: Option<&[u8]>) -> std::result::Result<Map<String, Value>, String> {
    let Some(bytes) = body else {
        return Ok(Map::new());
    };

    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(format!("Expected object, received {}", type_name(&other))),
        Err(_) => Err("Malformed JSON".to_string()),
    }
}

fn string_map(values: &BTreeMap<String, String>) -> Map<String, Value> {
    values
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn coerce(
    kind: &FieldKind,
    value: &Value,
    path: &str,
    errors: &mut Vec<String>,
) -> std::result::Result<Value, String> {
    match kind {
        FieldKind::Text { min, max, trim } => {
            let text = expect_str(value)?;
            let text = if *trim { text.trim() } else { text };
            let len = text.chars().count();
            if let Some(min) = min {
                if len < *min {
                    return Err(format!("String must contain at least {} character(s)", min));
                }
            }
            if let Some(max) = max {
                if len > *max {
                    return Err(format!("String must contain at most {} character(s)", max));
                }
            }
            Ok(Value::String(text.to_string()))
        }
        FieldKind::Email => {
            let email = expect_str(value)?.to_string();
            if !email.validate_email() {
                return Err("Invalid email".to_string());
            }
            Ok(Value::String(email.to_lowercase()))
        }
        FieldKind::Uuid => {
            let id = Uuid::parse_str(expect_str(value)?).map_err(|_| "Invalid uuid".to_string())?;
            Ok(Value::String(id.to_string()))
        }
        FieldKind::Integer { min, max } => {
            let number = coerce_integer(value)?;
            if let Some(min) = min {
                if number < *min {
                    return Err(format!("Number must be greater than or equal to {}", min));
                }
            }
            if let Some(max) = max {
                if number > *max {
                    return Err(format!("Number must be less than or equal to {}", max));
                }
            }
            Ok(Value::Number(Number::from(number)))
        }
        FieldKind::Date => {
            if !matches!(value, Value::String(_) | Value::Number(_)) {
                return Err(format!("Expected date, received {}", type_name(value)));
            }
            let at = coerce_date(value).ok_or_else(|| "Invalid date".to_string())?;
            Ok(Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)))
        }
        FieldKind::Object(schema) => match value {
            Value::Object(fields) => Ok(Value::Object(schema.parse(fields, path, errors))),
            other => Err(format!("Expected object, received {}", type_name(other))),
        },
    }
}

fn expect_str(value: &Value) -> std::result::Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("Expected string, received {}", type_name(value)))
}

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

fn coerce_integer(value: &Value) -> std::result::Result<i64, String> {
    let (exact, approx) = match value {
        Value::Number(n) => (n.as_i64(), n.as_f64()),
        Value::String(s) => {
            let s = s.trim();
            let approx = if s.is_empty() { None } else { s.parse::<f64>().ok() };
            (s.parse::<i64>().ok(), approx)
        }
        _ => (None, None),
    };

    if let Some(number) = exact {
        return Ok(number);
    }

    // Not an exact i64: floats, exponent forms and out-of-range values.
    match approx.filter(|n| n.is_finite()) {
        None => Err(match value {
            Value::String(s) => format!("Expected integer, received \"{}\"", s),
            other => format!("Expected integer, received {}", type_name(other)),
        }),
        Some(number) if number.fract() != 0.0 => Err("Expected integer, received float".to_string()),
        Some(number) if number >= -TWO_POW_63 && number < TWO_POW_63 => Ok(number as i64),
        Some(_) => Err("Number is out of range".to_string()),
    }
}

fn coerce_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(at) = DateTime::parse_from_rfc3339(s) {
                return Some(at.with_timezone(&Utc));
            }
            let day = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
            Some(Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0)?))
        }
        Value::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single(),
        _ => None,
    }
}
