//! Tool input schemas
//!
//! A small builder over the JSON Schema subset tools need: a flat object of
//! typed fields with optional defaults and enumerations.

use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl FieldKind {
    fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
        }
    }
}

/// One input field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub description: &'static str,
    pub required: bool,
    pub nullable: bool,
    pub default: Option<Value>,
    pub allowed: Vec<&'static str>,
}

impl FieldSpec {
    fn new(kind: FieldKind, description: &'static str) -> Self {
        Self {
            kind,
            description,
            required: false,
            nullable: false,
            default: None,
            allowed: Vec::new(),
        }
    }

    pub fn string(description: &'static str) -> Self {
        Self::new(FieldKind::String, description)
    }

    pub fn integer(description: &'static str) -> Self {
        Self::new(FieldKind::Integer, description)
    }

    pub fn number(description: &'static str) -> Self {
        Self::new(FieldKind::Number, description)
    }

    pub fn boolean(description: &'static str) -> Self {
        Self::new(FieldKind::Boolean, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Accept an explicit `null` in addition to the field's type.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn one_of(mut self, allowed: &[&'static str]) -> Self {
        self.allowed = allowed.to_vec();
        self
    }

    fn to_json(&self) -> Value {
        let mut property = Map::new();
        let kind = if self.nullable {
            json!([self.kind.as_str(), "null"])
        } else {
            json!(self.kind.as_str())
        };
        property.insert("type".to_string(), kind);
        property.insert("description".to_string(), json!(self.description));
        if !self.allowed.is_empty() {
            property.insert("enum".to_string(), json!(self.allowed));
        }
        if let Some(default) = &self.default {
            property.insert("default".to_string(), default.clone());
        }
        Value::Object(property)
    }
}

/// Object schema made of named fields, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSchema {
    fields: Vec<(&'static str, FieldSpec)>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, spec: FieldSpec) -> Self {
        self.fields.push((name, spec));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (*name, spec))
    }

    pub fn required_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, spec)| (name.to_string(), spec.to_json()))
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": self.required_fields(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_schema_shape() {
        let schema = InputSchema::new()
            .field("title", FieldSpec::string("Title of the work").required())
            .field("part_number", FieldSpec::integer("Part to read").nullable())
            .field(
                "category",
                FieldSpec::string("Category")
                    .one_of(&["poem", "essay", "all"])
                    .default_value(json!("all")),
            );

        let value = schema.to_json_schema();
        assert_eq!(value["type"], "object");
        assert_eq!(value["required"], json!(["title"]));
        assert_eq!(value["properties"]["part_number"]["type"], json!(["integer", "null"]));
        assert_eq!(value["properties"]["category"]["enum"], json!(["poem", "essay", "all"]));
        assert_eq!(value["properties"]["category"]["default"], "all");
        assert!(value["properties"]["title"].get("default").is_none());
    }

    #[test]
    fn test_empty_schema_has_no_required_fields() {
        let value = InputSchema::new().to_json_schema();
        assert_eq!(value["required"], json!([]));
        assert_eq!(value["properties"], json!({}));
    }
}
