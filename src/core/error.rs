//! Unified error handling
//!
//! Errors are layered by the phase in which they occur:
//!
//! - **Generation time** (`SpecError`, `GenerateError`, `BindgenError`): fatal for the
//!   interface being generated, never visible to running scripts.
//! - **Run time** (`BindingError`): the outcome of a single trampoline call. It is
//!   turned into a script exception at exactly one place, `scripting::boundary::throw`.
//! - **Host / context** (`ScriptError`): failures of the embedding API itself.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::scripting::ContextId;

/// Errors raised while reading the interface specification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Failed to parse interface specification: {0}")]
    Parse(String),

    #[error("Inheritance cycle detected at interface {0}")]
    InheritanceCycle(String),

    #[error("Interface {interface} inherits from unknown interface {parent}")]
    UnknownParent { interface: String, parent: String },
}

/// Errors raised while turning an interface into binding code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("Malformed member {interface}.{member}: {reason}")]
    MalformedMember {
        interface: String,
        member: String,
        reason: String,
    },

    #[error("Refusing to overwrite hand-written file: {0}")]
    WouldOverwrite(PathBuf),
}

/// Top level error of a generation run.
#[derive(Error, Debug)]
pub enum BindgenError {
    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Generation error: {0}")]
    Generate(#[from] GenerateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a failed call from script into the native model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    #[error("Missing arguments")]
    MissingArguments,

    #[error("Illegal Constructor")]
    IllegalConstructor,

    #[error("Illegal invocation")]
    IllegalInvocation,

    #[error("Not implemented: {interface}.{member}")]
    NotImplemented { interface: String, member: String },

    #[error("Invalid argument {index}: {reason}")]
    Decode { index: usize, reason: String },

    #[error("{0}")]
    Native(String),

    #[error("{}", join_messages(.0))]
    Joined(Vec<BindingError>),

    #[error("Unknown script context")]
    UnknownContext,

    #[error("Script error: {0}")]
    Script(String),
}

fn join_messages(errors: &[BindingError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl BindingError {
    pub fn native(message: impl Into<String>) -> Self {
        Self::Native(message.into())
    }

    pub fn not_implemented(interface: impl Into<String>, member: impl Into<String>) -> Self {
        Self::NotImplemented {
            interface: interface.into(),
            member: member.into(),
        }
    }

    /// Merges several errors into one. Returns `None` when there is nothing to merge.
    pub fn join(errors: impl IntoIterator<Item = BindingError>) -> Option<BindingError> {
        let mut errors: Vec<BindingError> = errors.into_iter().collect();
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Joined(errors)),
        }
    }
}

impl From<ScriptError> for BindingError {
    fn from(err: ScriptError) -> Self {
        match err {
            ScriptError::ContextDisposed | ScriptError::ContextNotFound(_) => Self::UnknownContext,
            ScriptError::NotNativeObject => Self::IllegalInvocation,
            other => Self::Script(other.to_string()),
        }
    }
}

impl From<rquickjs::Error> for BindingError {
    fn from(err: rquickjs::Error) -> Self {
        Self::Script(err.to_string())
    }
}

/// Errors of the script host and its contexts.
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Script engine error: {0}")]
    Engine(#[from] rquickjs::Error),

    #[error("Script runtime error: {0}")]
    Runtime(String),

    #[error("Invalid script binding: {0}")]
    InvalidBinding(String),

    #[error("Script context not found: {0}")]
    ContextNotFound(ContextId),

    #[error("Script context has been disposed")]
    ContextDisposed,

    #[error("Object is not backed by a native entity")]
    NotNativeObject,

    #[error("No template registered for interface {0}")]
    UnknownInterface(String),
}

pub type SpecResult<T> = Result<T, SpecError>;
pub type GenerateResult<T> = Result<T, GenerateError>;
pub type BindgenResult<T> = Result<T, BindgenError>;
pub type BindingResult<T> = Result<T, BindingError>;
pub type ScriptResult<T> = Result<T, ScriptError>;
