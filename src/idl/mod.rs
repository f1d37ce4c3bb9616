//! Interface specification model
//!
//! Reads the JSON document produced by the webidl2 parser and normalizes single
//! interfaces into the shape the binding classifier works on. Only interfaces
//! are exposed; dictionaries, enums and callbacks are kept in the raw table but
//! never returned by [`IdlSpec::get_type`].

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::core::error::{SpecError, SpecResult};

// ============================================================================
// Raw webidl2 document
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
struct RawDocument {
    #[serde(default, rename = "idlNames")]
    idl_names: BTreeMap<String, RawDefinition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawDefinition {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    inheritance: Option<String>,
    members: Vec<RawMember>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawMember {
    #[serde(rename = "type")]
    kind: String,
    name: Option<String>,
    special: Option<String>,
    readonly: bool,
    #[serde(rename = "idlType")]
    idl_type: Option<RawIdlType>,
    arguments: Vec<RawArgument>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawArgument {
    name: String,
    optional: bool,
    variadic: bool,
    #[serde(rename = "idlType")]
    idl_type: Option<RawIdlType>,
    default: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawIdlType {
    nullable: bool,
    union: bool,
    generic: String,
    #[serde(rename = "idlType")]
    idl_type: Option<RawTypeName>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawTypeName {
    Name(String),
    Nested(Vec<RawIdlType>),
}

// ============================================================================
// Normalized model
// ============================================================================

/// A named, possibly nullable type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    pub name: String,
    pub nullable: bool,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nullable: false,
        }
    }

    pub fn nullable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nullable: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnType {
    Undefined,
    Value(TypeDescriptor),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentType {
    Single(TypeDescriptor),
    Union(Vec<TypeDescriptor>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    /// `None` when the document carries no usable type.
    pub ty: Option<ArgumentType>,
    pub optional: bool,
    pub variadic: bool,
    /// Textual default from the specification, if any.
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationMember {
    /// `None` for anonymous special operations.
    pub name: Option<String>,
    pub special: Option<String>,
    pub return_type: Option<ReturnType>,
    pub arguments: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMember {
    pub name: String,
    pub special: Option<String>,
    pub readonly: bool,
    pub ty: Option<TypeDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Constructor(OperationMember),
    Operation(OperationMember),
    Attribute(AttributeMember),
}

impl Member {
    pub fn special(&self) -> Option<&str> {
        match self {
            Member::Constructor(op) | Member::Operation(op) => op.special.as_deref(),
            Member::Attribute(attr) => attr.special.as_deref(),
        }
    }

    pub fn is_static(&self) -> bool {
        self.special() == Some("static")
    }
}

/// One interface, normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec {
    pub name: String,
    pub parent: Option<String>,
    pub members: Vec<Member>,
}

// ============================================================================
// IdlSpec
// ============================================================================

/// A parsed interface specification.
#[derive(Debug, Clone, Default)]
pub struct IdlSpec {
    definitions: BTreeMap<String, RawDefinition>,
}

impl IdlSpec {
    pub fn from_json_str(content: &str) -> SpecResult<Self> {
        let document: RawDocument =
            serde_json::from_str(content).map_err(|e| SpecError::Parse(e.to_string()))?;
        tracing::debug!(
            target: "bindgen",
            "Parsed interface specification with {} definitions",
            document.idl_names.len()
        );
        Ok(Self {
            definitions: document.idl_names,
        })
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> SpecResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| SpecError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    /// Names of all interfaces, sorted.
    pub fn interface_names(&self) -> Vec<&str> {
        self.definitions
            .values()
            .filter(|d| is_interface(d))
            .map(|d| d.name.as_str())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.interface(name).is_some()
    }

    /// Looks up and normalizes one interface.
    pub fn get_type(&self, name: &str) -> SpecResult<InterfaceSpec> {
        let raw = self
            .interface(name)
            .ok_or_else(|| SpecError::UnknownType(name.to_string()))?;

        let mut members = Vec::with_capacity(raw.members.len());
        for member in &raw.members {
            match normalize_member(member) {
                Some(member) => members.push(member),
                None => tracing::debug!(
                    target: "bindgen",
                    "Dropping {} member {:?} of {}",
                    member.kind,
                    member.name,
                    name
                ),
            }
        }

        Ok(InterfaceSpec {
            name: name.to_string(),
            parent: raw.inheritance.clone().filter(|p| !p.is_empty()),
            members,
        })
    }

    /// `name` followed by its ancestors, nearest first.
    pub fn inheritance_chain(&self, name: &str) -> SpecResult<Vec<String>> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = self
            .interface(name)
            .ok_or_else(|| SpecError::UnknownType(name.to_string()))?;

        loop {
            if !visited.insert(current.name.as_str()) {
                return Err(SpecError::InheritanceCycle(current.name.clone()));
            }
            chain.push(current.name.clone());
            match current.inheritance.as_deref().filter(|p| !p.is_empty()) {
                None => return Ok(chain),
                Some(parent) => {
                    current = self.interface(parent).ok_or_else(|| SpecError::UnknownParent {
                        interface: current.name.clone(),
                        parent: parent.to_string(),
                    })?;
                }
            }
        }
    }

    fn interface(&self, name: &str) -> Option<&RawDefinition> {
        self.definitions.get(name).filter(|d| is_interface(d))
    }
}

fn is_interface(definition: &RawDefinition) -> bool {
    definition.kind == "interface"
}

fn normalize_special(special: &Option<String>) -> Option<String> {
    special.clone().filter(|s| !s.is_empty())
}

fn normalize_member(member: &RawMember) -> Option<Member> {
    match member.kind.as_str() {
        "constructor" => Some(Member::Constructor(normalize_operation(member))),
        "operation" => Some(Member::Operation(normalize_operation(member))),
        "attribute" => Some(Member::Attribute(AttributeMember {
            name: member.name.clone().unwrap_or_default(),
            special: normalize_special(&member.special),
            readonly: member.readonly,
            ty: member.idl_type.as_ref().and_then(single_type),
        })),
        _ => None,
    }
}

fn normalize_operation(member: &RawMember) -> OperationMember {
    OperationMember {
        name: member.name.clone().filter(|n| !n.is_empty()),
        special: normalize_special(&member.special),
        return_type: member.idl_type.as_ref().and_then(return_type),
        arguments: member.arguments.iter().map(normalize_argument).collect(),
    }
}

fn normalize_argument(argument: &RawArgument) -> Argument {
    Argument {
        name: argument.name.clone(),
        ty: argument.idl_type.as_ref().and_then(argument_type),
        optional: argument.optional,
        variadic: argument.variadic,
        default: default_text(&argument.default),
    }
}

fn return_type(raw: &RawIdlType) -> Option<ReturnType> {
    let ty = single_type(raw)?;
    match ty.name.as_str() {
        "undefined" | "void" => Some(ReturnType::Undefined),
        _ => Some(ReturnType::Value(ty)),
    }
}

fn argument_type(raw: &RawIdlType) -> Option<ArgumentType> {
    if raw.union {
        match &raw.idl_type {
            Some(RawTypeName::Nested(types)) => {
                let mut members = types.iter().map(single_type).collect::<Option<Vec<_>>>()?;
                if raw.nullable {
                    for member in &mut members {
                        member.nullable = true;
                    }
                }
                Some(ArgumentType::Union(members))
            }
            _ => None,
        }
    } else {
        single_type(raw).map(ArgumentType::Single)
    }
}

fn single_type(raw: &RawIdlType) -> Option<TypeDescriptor> {
    if raw.union {
        return None;
    }
    let name = match &raw.idl_type {
        Some(RawTypeName::Name(name)) if !name.is_empty() => name.clone(),
        Some(RawTypeName::Nested(inner)) => {
            let inner = inner
                .iter()
                .map(|t| single_type(t).map(|t| t.name))
                .collect::<Option<Vec<_>>>()?;
            if inner.is_empty() {
                return None;
            }
            inner.join(" ")
        }
        _ => return None,
    };
    let name = if raw.generic.is_empty() {
        name
    } else {
        format!("{} {}", raw.generic, name)
    };
    Some(TypeDescriptor {
        name,
        nullable: raw.nullable,
    })
}

fn default_text(value: &serde_json::Value) -> Option<String> {
    use serde_json::Value;
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => match map.get("type").and_then(Value::as_str) {
            Some("sequence") => Some("[]".to_string()),
            Some("dictionary") => Some("{}".to_string()),
            Some("null") => Some("null".to_string()),
            _ => map.get("value").and_then(default_text),
        },
        Value::Array(_) => Some("[]".to_string()),
    }
}
