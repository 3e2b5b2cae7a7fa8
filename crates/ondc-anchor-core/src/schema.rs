//! Schemas: declarative field definitions owned by a controller.
//!
//! A schema's identifier is derived from its canonical content and its
//! controller, so two identical definitions under one controller collide.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::address::{address_of, ContentId};
use crate::canonical::{canonical_bytes, SCHEMA_ID_DOMAIN};
use crate::crypto::{AccountId, Digest256};
use crate::error::ValidationError;
use crate::types::SchemaId;
use crate::value::{Content, Value};
use crate::{MAX_SCHEMA_FIELDS, MAX_SCHEMA_NAME_LEN};

/// The declared type of a schema property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Boolean,
    Bytes,
    Array,
    Object,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Bytes => "bytes",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }

    /// Whether a value structurally conforms to this type. Null conforms to
    /// nothing; optional fields are expressed by omission.
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldType::String, Value::Text(_))
                | (FieldType::Integer, Value::Integer(_))
                | (FieldType::Boolean, Value::Bool(_))
                | (FieldType::Bytes, Value::Bytes(_))
                | (FieldType::Array, Value::List(_))
                | (FieldType::Object, Value::Map(_))
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single property declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// A declarative schema definition, as loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub properties: BTreeMap<String, PropertyDefinition>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl SchemaDefinition {
    /// Parse a definition from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json).map_err(|e| ValidationError::MalformedSchema(e.to_string()))
    }

    /// Append `:<suffix>` to the name, making the definition unique per run.
    pub fn with_name_suffix(mut self, suffix: &str) -> Self {
        self.name = format!("{}:{}", self.name, suffix);
        self
    }

    fn check(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MalformedSchema("empty name".into()));
        }
        if self.name.len() > MAX_SCHEMA_NAME_LEN {
            return Err(ValidationError::MalformedSchema(format!(
                "name is {} bytes, max {}",
                self.name.len(),
                MAX_SCHEMA_NAME_LEN
            )));
        }
        if self.properties.is_empty() {
            return Err(ValidationError::MalformedSchema("no properties".into()));
        }
        if self.properties.len() > MAX_SCHEMA_FIELDS {
            return Err(ValidationError::MalformedSchema(format!(
                "{} properties, max {}",
                self.properties.len(),
                MAX_SCHEMA_FIELDS
            )));
        }
        if let Some(field) = self.properties.keys().find(|k| k.is_empty()) {
            return Err(ValidationError::MalformedSchema(format!(
                "empty property name `{field}`"
            )));
        }
        for field in &self.required {
            if !self.properties.contains_key(field) {
                return Err(ValidationError::MalformedSchema(format!(
                    "required field `{field}` is not a declared property"
                )));
            }
        }
        Ok(())
    }

    fn to_value(&self) -> Value {
        let properties = self
            .properties
            .iter()
            .map(|(name, prop)| {
                let mut decl = BTreeMap::new();
                decl.insert("type".to_owned(), Value::from(prop.field_type.as_str()));
                (name.clone(), Value::Map(decl))
            })
            .collect();

        let mut required: Vec<&String> = self.required.iter().collect();
        required.sort();
        required.dedup();

        let mut map = BTreeMap::new();
        map.insert("name".to_owned(), Value::from(self.name.as_str()));
        map.insert("description".to_owned(), Value::from(self.description.as_str()));
        map.insert("properties".to_owned(), Value::Map(properties));
        map.insert(
            "required".to_owned(),
            Value::List(required.into_iter().map(|f| Value::from(f.as_str())).collect()),
        );
        Value::Map(map)
    }
}

/// A schema bound to its controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    id: SchemaId,
    definition: SchemaDefinition,
    controller: AccountId,
}

impl Schema {
    /// Check the definition and bind it to a controller.
    pub fn new(definition: SchemaDefinition, controller: AccountId) -> Result<Self, ValidationError> {
        definition.check()?;
        let bytes = Self::encode(&definition, &controller);
        let id = SchemaId::from(Digest256::hash_with_domain(SCHEMA_ID_DOMAIN, &bytes));
        Ok(Self {
            id,
            definition,
            controller,
        })
    }

    fn encode(definition: &SchemaDefinition, controller: &AccountId) -> Vec<u8> {
        let mut map = BTreeMap::new();
        map.insert("schema".to_owned(), definition.to_value());
        map.insert("controller".to_owned(), Value::Bytes(controller.0.to_vec()));
        canonical_bytes(&Value::Map(map))
    }

    pub fn id(&self) -> SchemaId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &SchemaDefinition {
        &self.definition
    }

    pub fn controller(&self) -> AccountId {
        self.controller
    }

    /// Canonical bytes of the definition plus controller.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        Self::encode(&self.definition, &self.controller)
    }

    /// Content identifier of the canonical schema bytes.
    pub fn cid(&self) -> ContentId {
        address_of(&self.canonical_bytes())
    }

    /// Check that a payload structurally conforms to this schema.
    pub fn check_content(&self, content: &Content) -> Result<(), ValidationError> {
        for (field, value) in content {
            let decl = self
                .definition
                .properties
                .get(field)
                .ok_or_else(|| ValidationError::UnknownField(field.clone()))?;
            if !decl.field_type.accepts(value) {
                return Err(ValidationError::FieldTypeMismatch {
                    field: field.clone(),
                    expected: decl.field_type,
                    found: value.kind_name(),
                });
            }
        }
        if let Some(missing) = self
            .definition
            .required
            .iter()
            .find(|f| !content.contains_key(*f))
        {
            return Err(ValidationError::MissingField(missing.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFINITION: &str = r#"{
        "name": "Product",
        "description": "A catalogue item",
        "properties": {
            "name": { "type": "string" },
            "sku": { "type": "string" },
            "quantity": { "type": "integer" }
        },
        "required": ["name", "sku"]
    }"#;

    fn controller() -> AccountId {
        AccountId::from_bytes([1; 32])
    }

    fn schema() -> Schema {
        Schema::new(SchemaDefinition::from_json(DEFINITION).unwrap(), controller()).unwrap()
    }

    fn content(entries: &[(&str, Value)]) -> Content {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_identical_definitions_collide() {
        assert_eq!(schema().id(), schema().id());
    }

    #[test]
    fn test_controller_changes_id() {
        let def = SchemaDefinition::from_json(DEFINITION).unwrap();
        let other = Schema::new(def, AccountId::from_bytes([2; 32])).unwrap();
        assert_ne!(schema().id(), other.id());
    }

    #[test]
    fn test_name_suffix_changes_id() {
        let def = SchemaDefinition::from_json(DEFINITION)
            .unwrap()
            .with_name_suffix("6f1c");
        assert_eq!(def.name, "Product:6f1c");
        assert_ne!(Schema::new(def, controller()).unwrap().id(), schema().id());
    }

    #[test]
    fn test_required_order_does_not_matter() {
        let mut def = SchemaDefinition::from_json(DEFINITION).unwrap();
        def.required.reverse();
        assert_eq!(Schema::new(def, controller()).unwrap().id(), schema().id());
    }

    #[test]
    fn test_conforming_content() {
        let c = content(&[
            ("name", Value::from("TV")),
            ("sku", Value::from("x-1")),
            ("quantity", Value::Integer(2)),
        ]);
        schema().check_content(&c).unwrap();
    }

    #[test]
    fn test_unknown_field() {
        let c = content(&[
            ("name", Value::from("TV")),
            ("sku", Value::from("x-1")),
            ("colour", Value::from("red")),
        ]);
        assert_eq!(
            schema().check_content(&c),
            Err(ValidationError::UnknownField("colour".into()))
        );
    }

    #[test]
    fn test_missing_required_field() {
        let c = content(&[("name", Value::from("TV"))]);
        assert_eq!(
            schema().check_content(&c),
            Err(ValidationError::MissingField("sku".into()))
        );
    }

    #[test]
    fn test_type_mismatch() {
        let c = content(&[
            ("name", Value::from("TV")),
            ("sku", Value::Integer(9)),
        ]);
        assert!(matches!(
            schema().check_content(&c),
            Err(ValidationError::FieldTypeMismatch { ref field, .. }) if field == "sku"
        ));
    }

    #[test]
    fn test_malformed_definitions() {
        let undeclared_required = r#"{"name":"X","properties":{"a":{"type":"string"}},"required":["b"]}"#;
        let no_props = r#"{"name":"X","properties":{}}"#;
        let bad_type = r#"{"name":"X","properties":{"a":{"type":"float"}}}"#;

        let def = SchemaDefinition::from_json(undeclared_required).unwrap();
        assert!(Schema::new(def, controller()).is_err());

        let def = SchemaDefinition::from_json(no_props).unwrap();
        assert!(Schema::new(def, controller()).is_err());

        assert!(SchemaDefinition::from_json(bad_type).is_err());
    }

    #[test]
    fn test_name_too_long() {
        let mut def = SchemaDefinition::from_json(DEFINITION).unwrap();
        def.name = "n".repeat(MAX_SCHEMA_NAME_LEN + 1);
        assert!(matches!(
            Schema::new(def, controller()),
            Err(ValidationError::MalformedSchema(_))
        ));
    }
}
