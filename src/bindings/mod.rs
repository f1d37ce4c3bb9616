//! Binding model
//!
//! Turns a normalized interface plus its customization into a [`WrapperSpec`]:
//!
//! ```text
//!   IdlSpec::get_type ──> InterfaceSpec ──┐
//!                                         ├──> create_wrapper_spec ──> WrapperSpec ──> codegen
//!   BindgenConfig ──> WrapperTypeSpec ────┘
//! ```

pub mod classify;
pub mod model;

pub use classify::create_wrapper_spec;
pub use model::{
    Attribute, Diagnostic, DiagnosticKind, Operation, OperationArgument, WrapperSpec,
};

use crate::config::WrapperTypeSpec;
use crate::core::error::BindgenResult;
use crate::idl::IdlSpec;

/// Looks up `config.type_name` in `spec` and classifies it.
pub fn wrapper_spec_for(
    spec: &IdlSpec,
    config: &WrapperTypeSpec,
    ignored_attribute_types: &[String],
) -> BindgenResult<WrapperSpec> {
    let interface = spec.get_type(&config.type_name)?;
    Ok(create_wrapper_spec(
        &interface,
        config,
        ignored_attribute_types,
    )?)
}
