//! Instruction schemas
//!
//! A schema is the normalized list of operations an instruction set is made
//! of: a name, one result type and an ordered list of typed parameters per
//! operation. Types are opaque identifiers here; they are only compared
//! structurally. Schemas come either from an external extractor (as JSON)
//! or from a set declared with [`instruction_set!`](crate::instruction_set).

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::runtime::error::{SchemaError, SchemaResult};

pub mod shape;

pub use shape::{HandlerOperation, InterpreterShape, NodeShape, VariantShape};

/// Opaque reference to a type in the describing language
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(String);

impl TypeRef {
    /// Create a type reference
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// One typed, named parameter of an instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter type
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Parameter name
    pub name: String,
}

impl Parameter {
    /// Create a parameter from its type and name
    pub fn new(ty: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ty: TypeRef::new(ty),
            name: name.into(),
        }
    }
}

/// Schema entry for one instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionDescriptor {
    /// Instruction name, unique within the schema
    pub name: String,
    /// Declared result type
    pub result_type: TypeRef,
    /// Ordered parameters
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl InstructionDescriptor {
    /// Create a descriptor
    pub fn new(
        name: impl Into<String>,
        result_type: impl Into<String>,
        parameters: Vec<Parameter>,
    ) -> Self {
        Self {
            name: name.into(),
            result_type: TypeRef::new(result_type),
            parameters,
        }
    }

    fn validate(&self, position: usize) -> SchemaResult<()> {
        if self.name.trim().is_empty() {
            return Err(SchemaError::EmptyInstructionName(position));
        }
        if self.result_type.as_str().trim().is_empty() {
            return Err(SchemaError::EmptyResultType(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for (index, parameter) in self.parameters.iter().enumerate() {
            if parameter.name.trim().is_empty() || parameter.ty.as_str().trim().is_empty() {
                return Err(SchemaError::IncompleteParameter {
                    instruction: self.name.clone(),
                    position: index,
                });
            }
            if !seen.insert(parameter.name.as_str()) {
                return Err(SchemaError::DuplicateParameter {
                    instruction: self.name.clone(),
                    parameter: parameter.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Normalized description of an instruction set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Base name shared by the generated types
    pub base_name: String,
    /// Namespace the set lives in, if the source declared one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Instructions in declaration order
    pub instructions: Vec<InstructionDescriptor>,
}

impl Schema {
    /// Create a schema without a namespace
    pub fn new(base_name: impl Into<String>, instructions: Vec<InstructionDescriptor>) -> Self {
        Self {
            base_name: base_name.into(),
            namespace: None,
            instructions,
        }
    }

    /// Attach a namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Decode a schema from JSON and validate it
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        let schema: Schema =
            serde_json::from_str(json).map_err(|e| SchemaError::Decode(e.to_string()))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Encode the schema as pretty-printed JSON
    pub fn to_json_pretty(&self) -> SchemaResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SchemaError::Decode(e.to_string()))
    }

    /// Look up an instruction by name
    pub fn instruction(&self, name: &str) -> Option<&InstructionDescriptor> {
        self.instructions.iter().find(|i| i.name == name)
    }

    /// Check the schema invariants: non-empty names and types, unique
    /// instruction names, unique parameter names per instruction.
    pub fn validate(&self) -> SchemaResult<()> {
        if self.base_name.trim().is_empty() {
            return Err(SchemaError::EmptyBaseName);
        }

        let mut names = HashSet::new();
        for (position, instruction) in self.instructions.iter().enumerate() {
            instruction.validate(position)?;
            if !names.insert(instruction.name.as_str()) {
                return Err(SchemaError::DuplicateInstruction(instruction.name.clone()));
            }
        }
        Ok(())
    }
}
