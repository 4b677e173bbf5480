//! Infers an MQL struct declaration from a JSON sample.
//!
//! Fields are emitted sorted by name. `null` fields are left out, nested
//! objects become `map`, and arrays take the kind of their last primitive
//! element (`any` when there is none).

use std::fmt;

use serde_json::{Map, Number, Value};

pub const STRUCT_NAME: &str = "change_me";

const INDENT: &str = "    ";

/// Shortest-form rendering switches to exponent notation outside
/// `1e-4 <= |x| < 1e6`.
const MIN_POSITIONAL_EXPONENT: i32 = -4;
const MAX_POSITIONAL_EXPONENT: i32 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferredKind {
    String,
    Int,
    Double,
    Bool,
    Map,
    Any,
    Array(Box<InferredKind>),
}

impl fmt::Display for InferredKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Int => f.write_str("int"),
            Self::Double => f.write_str("double"),
            Self::Bool => f.write_str("bool"),
            Self::Map => f.write_str("map"),
            Self::Any => f.write_str("any"),
            Self::Array(element) => write!(f, "{element}[]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredField {
    pub name: String,
    pub kind: InferredKind,
}

impl InferredField {
    fn declaration(&self) -> String {
        match &self.kind {
            InferredKind::Array(element) => format!("{element} {}[];", self.name),
            kind => format!("{kind} {};", self.name),
        }
    }
}

/// Parses `body` as a JSON object and renders the struct for it. Returns
/// `None` when the body is not a JSON object.
pub fn json_to_struct(body: &str) -> Option<String> {
    let object: Map<String, Value> = match serde_json::from_str(body) {
        Ok(object) => object,
        Err(err) => {
            log::debug!("comment is not a JSON object: {err}");
            return None;
        }
    };
    Some(render_struct(&infer_fields(&object)))
}

pub fn infer_fields(object: &Map<String, Value>) -> Vec<InferredField> {
    let mut fields: Vec<InferredField> = object
        .iter()
        .filter_map(|(name, value)| {
            infer_kind(value).map(|kind| InferredField {
                name: name.clone(),
                kind,
            })
        })
        .collect();
    fields.sort_by(|a, b| a.name.cmp(&b.name));
    fields
}

fn infer_kind(value: &Value) -> Option<InferredKind> {
    match value {
        Value::Object(_) => Some(InferredKind::Map),
        Value::Array(elements) => {
            let element = elements
                .iter()
                .filter_map(primitive_kind)
                .last()
                .unwrap_or(InferredKind::Any);
            Some(InferredKind::Array(Box::new(element)))
        }
        Value::Null => None,
        primitive => primitive_kind(primitive),
    }
}

fn primitive_kind(value: &Value) -> Option<InferredKind> {
    match value {
        Value::String(_) => Some(InferredKind::String),
        Value::Number(number) => Some(number_kind(number)),
        Value::Bool(_) => Some(InferredKind::Bool),
        _ => None,
    }
}

// Every JSON number is read as an f64. Whole-valued floats such as `2.0`
// render without a decimal point and count as `int`.
fn number_kind(number: &Number) -> InferredKind {
    match number.as_f64() {
        Some(value) if renders_with_decimal_point(value) => InferredKind::Double,
        _ => InferredKind::Int,
    }
}

/// Whether the shortest rendering of `value` contains a `.`: `1.5e+300`
/// does, `1e-07` and `1e+06` do not.
fn renders_with_decimal_point(value: f64) -> bool {
    let scientific = format!("{value:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return false;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if (MIN_POSITIONAL_EXPONENT..MAX_POSITIONAL_EXPONENT).contains(&exponent) {
        value.to_string().contains('.')
    } else {
        mantissa.contains('.')
    }
}

pub fn render_struct(fields: &[InferredField]) -> String {
    let mut out = format!("struct {STRUCT_NAME} {{\n");
    for field in fields {
        out.push_str(INDENT);
        out.push_str(&field.declaration());
        out.push('\n');
    }
    out.push_str("};");
    out
}
