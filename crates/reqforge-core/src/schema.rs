//! Canonical definition of the analysis output schema.
//!
//! [`ANALYSIS`] is the single description of the shape the model must
//! produce. It is rendered to the JSON-Schema wire format sent with every
//! generation request ([`SchemaNode::to_json_schema`]) and walked by the
//! response validator ([`SchemaNode::check`]). Field names match the serde
//! names of [`AnalysisResult`](crate::models::AnalysisResult).
//!
//! ```rust
//! use reqforge_core::schema::ANALYSIS;
//!
//! let wire = ANALYSIS.to_json_schema();
//! assert_eq!(wire["type"], "object");
//! assert_eq!(wire["required"].as_array().unwrap().len(), 6);
//! ```

use serde_json::{json, Map, Value};

/// A node of the output schema.
#[derive(Debug)]
pub enum SchemaNode {
    /// A JSON string.
    String,
    /// A JSON array whose items all match the inner node.
    Array(&'static SchemaNode),
    /// A JSON object with the listed properties.
    Object(&'static [Field]),
}

/// A named property of an object node.
#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    pub node: SchemaNode,
    pub required: bool,
}

const fn required(name: &'static str, node: SchemaNode) -> Field {
    Field {
        name,
        node,
        required: true,
    }
}

const fn optional(name: &'static str, node: SchemaNode) -> Field {
    Field {
        name,
        node,
        required: false,
    }
}

const STRING: SchemaNode = SchemaNode::String;

const SCREEN_OVERVIEW: &[Field] = &[
    required("screenName", SchemaNode::String),
    required("screenType", SchemaNode::String),
    required("primaryPurpose", SchemaNode::String),
    required("userRole", SchemaNode::String),
    optional("relationshipToPreviousScreens", SchemaNode::String),
];

/// The eight fields every requirements-matrix row must carry.
pub const REQUIREMENT_ROW: &[Field] = &[
    required("uiElement", SchemaNode::String),
    required("elementType", SchemaNode::String),
    required("behavior", SchemaNode::String),
    required("dataSource", SchemaNode::String),
    required("validationRules", SchemaNode::String),
    required("errorHandling", SchemaNode::String),
    required("businessRules", SchemaNode::String),
    required("notes", SchemaNode::String),
];

const REQUIREMENT_ROW_NODE: SchemaNode = SchemaNode::Object(REQUIREMENT_ROW);

/// Top-level properties of an analysis.
pub const ANALYSIS_FIELDS: &[Field] = &[
    required("screenOverview", SchemaNode::Object(SCREEN_OVERVIEW)),
    required("requirementsMatrix", SchemaNode::Array(&REQUIREMENT_ROW_NODE)),
    required("functionalRequirements", SchemaNode::Array(&STRING)),
    required("nonFunctionalRequirements", SchemaNode::Array(&STRING)),
    required("businessRules", SchemaNode::Array(&STRING)),
    required("assumptionsMade", SchemaNode::Array(&STRING)),
];

/// The analysis output schema.
pub static ANALYSIS: SchemaNode = SchemaNode::Object(ANALYSIS_FIELDS);

/// A structural mismatch between a JSON value and a [`SchemaNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// JSON-pointer-style location, `""` for the root.
    pub path: String,
    pub reason: String,
}

impl SchemaNode {
    /// Render this node in the JSON-Schema subset accepted by the generation
    /// backend (`type`, `properties`, `items`, `required`).
    pub fn to_json_schema(&self) -> Value {
        match self {
            SchemaNode::String => json!({ "type": "string" }),
            SchemaNode::Array(items) => json!({
                "type": "array",
                "items": items.to_json_schema(),
            }),
            SchemaNode::Object(fields) => {
                let mut properties = Map::new();
                for field in fields.iter() {
                    properties.insert(field.name.to_string(), field.node.to_json_schema());
                }
                let required: Vec<&str> = fields
                    .iter()
                    .filter(|f| f.required)
                    .map(|f| f.name)
                    .collect();
                json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                })
            }
        }
    }

    /// Check `value` against this node, returning the first mismatch found.
    ///
    /// No coercion is attempted: a string where an array is expected is a
    /// mismatch. Properties not named by the schema are ignored. An optional
    /// property may be absent or `null`.
    pub fn check(&self, value: &Value) -> Result<(), Mismatch> {
        self.check_at(value, "")
    }

    fn check_at(&self, value: &Value, path: &str) -> Result<(), Mismatch> {
        match self {
            SchemaNode::String => {
                if value.is_string() {
                    Ok(())
                } else {
                    Err(mismatch(path, format!("expected string, found {}", kind(value))))
                }
            }
            SchemaNode::Array(items) => {
                let array = value.as_array().ok_or_else(|| {
                    mismatch(path, format!("expected array, found {}", kind(value)))
                })?;
                for (i, item) in array.iter().enumerate() {
                    items.check_at(item, &format!("{}/{}", path, i))?;
                }
                Ok(())
            }
            SchemaNode::Object(fields) => {
                let object = value.as_object().ok_or_else(|| {
                    mismatch(path, format!("expected object, found {}", kind(value)))
                })?;
                for field in fields.iter() {
                    let field_path = format!("{}/{}", path, field.name);
                    match object.get(field.name) {
                        None if field.required => {
                            return Err(mismatch(
                                &field_path,
                                "missing required field".to_string(),
                            ))
                        }
                        Some(Value::Null) if !field.required => {}
                        None => {}
                        Some(v) => field.node.check_at(v, &field_path)?,
                    }
                }
                Ok(())
            }
        }
    }
}

fn mismatch(path: &str, reason: String) -> Mismatch {
    Mismatch {
        path: path.to_string(),
        reason,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
