//! Input and output contracts for registered operations
//!
//! An [`InputContract`] lists the named parameters an operation accepts, each
//! with a primitive type and a presence marker. Arguments are checked against
//! it before any handler runs; the checked map is handed over as
//! [`ValidatedArguments`] with defaults filled in.

use rmcp::ErrorData as McpError;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

/// Primitive JSON type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Boolean,
    Integer,
    Number,
    Object,
    Array,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Object => "object",
            FieldType::Array => "array",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Object => value.is_object(),
            FieldType::Array => value.is_array(),
        }
    }
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

#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    Required,
    Optional,
    /// Optional, filled with this value when absent
    Default(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: FieldType,
    pub presence: Presence,
    pub description: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ContractViolation {
    #[error("arguments must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("field `{field}` must be of type {expected}, got {found}")]
    WrongType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("arguments could not be decoded: {0}")]
    Decode(String),
}

impl From<ContractViolation> for McpError {
    fn from(violation: ContractViolation) -> Self {
        crate::error::invalid_params(format!("Invalid arguments: {}", violation))
    }
}

/// Declared parameters of an operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputContract {
    fields: Vec<FieldSpec>,
    allow_extra: bool,
}

impl InputContract {
    pub fn new() -> Self {
        Self::default()
    }

    fn field(
        mut self,
        name: &str,
        ty: FieldType,
        presence: Presence,
        description: &str,
    ) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            ty,
            presence,
            description: (!description.is_empty()).then(|| description.to_string()),
        });
        self
    }

    pub fn required(self, name: &str, ty: FieldType, description: &str) -> Self {
        self.field(name, ty, Presence::Required, description)
    }

    pub fn optional(self, name: &str, ty: FieldType, description: &str) -> Self {
        self.field(name, ty, Presence::Optional, description)
    }

    pub fn with_default(
        self,
        name: &str,
        ty: FieldType,
        default: Value,
        description: &str,
    ) -> Self {
        self.field(name, ty, Presence::Default(default), description)
    }

    /// Let unknown fields through to the handler instead of rejecting them.
    pub fn allow_extra(mut self) -> Self {
        self.allow_extra = true;
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Check `arguments` against the contract.
    ///
    /// Absent arguments are treated as an empty object. An explicit `null`
    /// for an optional field counts as absent.
    pub fn validate(&self, arguments: Option<Value>) -> Result<ValidatedArguments, ContractViolation> {
        let mut args = match arguments {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => return Err(ContractViolation::NotAnObject(type_name(&other))),
        };

        if !self.allow_extra {
            if let Some(unknown) = args
                .keys()
                .find(|key| !self.fields.iter().any(|f| &f.name == *key))
            {
                return Err(ContractViolation::UnknownField(unknown.clone()));
            }
        }

        for field in &self.fields {
            match args.get(&field.name) {
                Some(Value::Null) | None => {
                    args.remove(&field.name);
                    match &field.presence {
                        Presence::Required => {
                            return Err(ContractViolation::MissingField(field.name.clone()))
                        }
                        Presence::Default(value) => {
                            args.insert(field.name.clone(), value.clone());
                        }
                        Presence::Optional => {}
                    }
                }
                Some(value) if !field.ty.matches(value) => {
                    return Err(ContractViolation::WrongType {
                        field: field.name.clone(),
                        expected: field.ty.as_str(),
                        found: type_name(value),
                    });
                }
                Some(_) => {}
            }
        }

        Ok(ValidatedArguments(args))
    }

    /// Render as a JSON Schema object for tool discovery.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            let mut prop = Map::new();
            prop.insert("type".into(), json!(field.ty.as_str()));
            if let Some(description) = &field.description {
                prop.insert("description".into(), json!(description));
            }
            match &field.presence {
                Presence::Required => required.push(json!(field.name)),
                Presence::Default(value) => {
                    prop.insert("default".into(), value.clone());
                }
                Presence::Optional => {}
            }
            properties.insert(field.name.clone(), Value::Object(prop));
        }

        let mut schema = json!({
            "type": "object",
            "properties": properties,
            "additionalProperties": self.allow_extra,
        });
        if !required.is_empty() {
            schema["required"] = Value::Array(required);
        }
        schema
    }
}

/// Arguments that passed an [`InputContract`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedArguments(Map<String, Value>);

impl ValidatedArguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Decode into a typed parameter struct.
    pub fn parse<T: DeserializeOwned>(self) -> Result<T, ContractViolation> {
        serde_json::from_value(Value::Object(self.0))
            .map_err(|e| ContractViolation::Decode(e.to_string()))
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// Declared result shape of an operation, as JSON Schema
#[derive(Debug, Clone, PartialEq)]
pub struct OutputContract(Value);

impl OutputContract {
    pub fn of<T: JsonSchema>() -> Self {
        let schema = schemars::schema_for!(T);
        Self(serde_json::to_value(schema).unwrap_or_else(|_| json!({ "type": "object" })))
    }

    pub fn schema(&self) -> &Value {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_contract() -> InputContract {
        InputContract::new()
            .required("title", FieldType::String, "Task title")
            .with_default("completed", FieldType::Boolean, json!(false), "")
    }

    #[test]
    fn test_defaults_are_filled() {
        let args = create_contract()
            .validate(Some(json!({"title": "Buy milk"})))
            .unwrap();
        assert_eq!(args.get("completed"), Some(&json!(false)));
        assert_eq!(args.get("title"), Some(&json!("Buy milk")));
    }

    #[test]
    fn test_missing_required_field() {
        let err = create_contract().validate(None).unwrap_err();
        assert_eq!(err, ContractViolation::MissingField("title".into()));
    }

    #[test]
    fn test_wrong_primitive_type() {
        let err = create_contract()
            .validate(Some(json!({"title": "x", "completed": "yes"})))
            .unwrap_err();
        assert_eq!(
            err,
            ContractViolation::WrongType {
                field: "completed".into(),
                expected: "boolean",
                found: "string",
            }
        );
    }

    #[test]
    fn test_unknown_fields_rejected_unless_allowed() {
        let args = json!({"title": "x", "priority": 3});
        assert_eq!(
            create_contract().validate(Some(args.clone())).unwrap_err(),
            ContractViolation::UnknownField("priority".into())
        );

        let passed = create_contract().allow_extra().validate(Some(args)).unwrap();
        assert_eq!(passed.get("priority"), Some(&json!(3)));
    }

    #[test]
    fn test_non_object_arguments() {
        let err = create_contract().validate(Some(json!([1, 2]))).unwrap_err();
        assert_eq!(err, ContractViolation::NotAnObject("array"));
    }

    #[test]
    fn test_null_optional_counts_as_absent() {
        let contract = InputContract::new().optional("completed", FieldType::Boolean, "");
        let args = contract.validate(Some(json!({"completed": null}))).unwrap();
        assert!(args.get("completed").is_none());
    }

    #[test]
    fn test_integer_rejects_fraction() {
        let contract = InputContract::new().required("limit", FieldType::Integer, "");
        assert!(contract.validate(Some(json!({"limit": 2.5}))).is_err());
        assert!(contract.validate(Some(json!({"limit": 2}))).is_ok());
    }

    #[test]
    fn test_json_schema_rendering() {
        let schema = create_contract().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["title"]));
        assert_eq!(schema["properties"]["completed"]["default"], json!(false));
        assert_eq!(schema["properties"]["title"]["description"], "Task title");
        assert_eq!(schema["additionalProperties"], json!(false));
    }

    #[test]
    fn test_violation_maps_to_invalid_params() {
        let err: McpError = ContractViolation::MissingField("id".into()).into();
        assert_eq!(
            crate::error::ErrorKind::of(&err),
            crate::error::ErrorKind::InvalidArguments
        );
    }
}
