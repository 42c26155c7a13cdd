//! Resolved interpreter shapes
//!
//! `InterpreterShape` is everything a textual renderer needs to emit the
//! instruction value model, the handler contract, the program node set, the
//! builder and the executor for one schema. It carries no semantics of its
//! own; the runtime in [`crate::runtime`] is the reference rendition.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Parameter, Schema, TypeRef};
use crate::runtime::error::{SchemaError, SchemaResult};

/// Program tree node kinds, in the order a renderer should declare them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeShape {
    /// Finished computation carrying its value
    Return,
    /// Deferred step producing the next node on demand
    Delay,
    /// Suspension point awaiting an instruction before resuming
    Await,
}

impl NodeShape {
    /// The closed node set
    pub const ALL: [NodeShape; 3] = [NodeShape::Return, NodeShape::Delay, NodeShape::Await];

    /// Field names carried by this node kind
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            NodeShape::Return => &["value"],
            NodeShape::Delay => &["thunk"],
            NodeShape::Await => &["instruction", "continuation"],
        }
    }
}

/// One instruction variant of the value model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantShape {
    /// Discriminant, unique within the set
    pub tag: usize,
    /// Variant name
    pub name: String,
    /// Result type the variant is parameterized by
    pub result_type: TypeRef,
    /// Immutable fields, one per parameter, in declaration order
    pub fields: Vec<Parameter>,
}

/// One operation of the handler contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerOperation {
    /// Variant the operation handles
    pub variant: String,
    /// Type of the result stored into the variant's cell
    pub result_type: TypeRef,
}

/// Fully resolved design for one schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpreterShape {
    /// Namespace carried over from the schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Name of the instruction base type
    pub base_name: String,
    /// Name of the handler contract
    pub handler: String,
    /// Name of the program tree type
    pub program: String,
    /// Name of the program builder
    pub builder: String,
    /// Name of the trampoline executor
    pub executor: String,
    /// Instruction variants in schema order
    pub variants: Vec<VariantShape>,
    /// Handler operations, one per variant and in the same order
    pub handler_operations: Vec<HandlerOperation>,
    /// Program tree node kinds
    pub nodes: Vec<NodeShape>,
}

impl InterpreterShape {
    /// Resolve the shape of `schema`, failing fast on any invariant violation.
    pub fn resolve(schema: &Schema) -> SchemaResult<Self> {
        schema.validate()?;

        let variants: Vec<VariantShape> = schema
            .instructions
            .iter()
            .enumerate()
            .map(|(tag, instruction)| VariantShape {
                tag,
                name: instruction.name.clone(),
                result_type: instruction.result_type.clone(),
                fields: instruction.parameters.clone(),
            })
            .collect();
        check_tags(&variants)?;

        let handler_operations = variants
            .iter()
            .map(|variant| HandlerOperation {
                variant: variant.name.clone(),
                result_type: variant.result_type.clone(),
            })
            .collect();

        let base = &schema.base_name;
        Ok(Self {
            namespace: schema.namespace.clone(),
            base_name: base.clone(),
            handler: format!("{}Handler", base),
            program: format!("{}Program", base),
            builder: format!("{}ProgramBuilder", base),
            executor: format!("{}ProgramExecutor", base),
            variants,
            handler_operations,
            nodes: NodeShape::ALL.to_vec(),
        })
    }

    /// Look up a variant by name
    pub fn variant(&self, name: &str) -> Option<&VariantShape> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// Encode the shape as pretty-printed JSON for a renderer
    pub fn to_json_pretty(&self) -> SchemaResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SchemaError::Decode(e.to_string()))
    }
}

fn check_tags(variants: &[VariantShape]) -> SchemaResult<()> {
    let mut seen: HashMap<usize, &str> = HashMap::new();
    for variant in variants {
        if let Some(first) = seen.insert(variant.tag, &variant.name) {
            return Err(SchemaError::DuplicateTag {
                tag: variant.tag,
                first: first.to_string(),
                second: variant.name.clone(),
            });
        }
    }
    Ok(())
}
