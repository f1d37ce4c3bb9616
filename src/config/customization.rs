//! Per-interface customization
//!
//! Overrides applied on top of the interface specification before code is
//! generated: renaming the native types, marking members as hand-written or
//! unimplemented, and tuning argument handling.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ConfigError, ConfigResult};

const DEFAULT_RECEIVER: &str = "info";

/// Customization of one generated wrapper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrapperTypeSpec {
    /// Interface name as it appears in the specification.
    #[serde(rename = "name")]
    pub type_name: String,
    /// Native type the wrapper decodes `this` into. Defaults to the interface name.
    pub inner_type: Option<String>,
    /// Name of the generated wrapper type. Defaults to `<inner>Wrapper`.
    pub wrapper_type: Option<String>,
    /// Name of the call-info parameter in generated functions.
    pub receiver: Option<String>,
    /// Call the hand-written `custom_initializer` after building the template.
    pub run_custom_code: bool,
    /// Keyed by the member name used in the specification.
    pub methods: BTreeMap<String, MethodCustomization>,
}

impl WrapperTypeSpec {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn inner_type_name(&self) -> &str {
        self.inner_type.as_deref().unwrap_or(&self.type_name)
    }

    pub fn wrapper_type_name(&self) -> String {
        match &self.wrapper_type {
            Some(name) => name.clone(),
            None => format!("{}Wrapper", self.inner_type_name()),
        }
    }

    pub fn receiver_name(&self) -> &str {
        self.receiver.as_deref().unwrap_or(DEFAULT_RECEIVER)
    }

    /// Customization for `name`, or the default when none is configured.
    pub fn method_customization(&self, name: &str) -> MethodCustomization {
        self.methods.get(name).cloned().unwrap_or_default()
    }

    /// Mutable customization for `name`, created on first access.
    pub fn method(&mut self, name: &str) -> &mut MethodCustomization {
        self.methods.entry(name.to_string()).or_default()
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.type_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "interface entry without a name".to_string(),
            ));
        }
        let names = [
            Some(self.inner_type_name()),
            self.wrapper_type.as_deref(),
            Some(self.receiver_name()),
        ];
        for name in names.into_iter().flatten() {
            if !is_identifier(name) {
                return Err(ConfigError::ValidationError(format!(
                    "interface {}: `{}` is not a valid identifier",
                    self.type_name, name
                )));
            }
        }
        for (method, customization) in &self.methods {
            if let Some(encoder) = &customization.encoder {
                if !is_identifier(encoder) {
                    return Err(ConfigError::ValidationError(format!(
                        "interface {}: encoder `{}` of {} is not a valid identifier",
                        self.type_name, encoder, method
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Customization of one operation or attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodCustomization {
    /// Neither generated nor installed.
    pub ignored: bool,
    /// Installed, but every call fails with a not-implemented error.
    pub not_implemented: bool,
    /// Installed, with a hand-written body.
    pub custom_implementation: bool,
    /// The native method cannot fail.
    pub no_error: bool,
    /// Name of the converter used for the return value.
    pub encoder: Option<String>,
    pub arguments: BTreeMap<String, ArgumentCustomization>,
}

impl MethodCustomization {
    pub fn argument(&self, name: &str) -> ArgumentCustomization {
        self.arguments.get(name).cloned().unwrap_or_default()
    }

    pub fn argument_mut(&mut self, name: &str) -> &mut ArgumentCustomization {
        self.arguments.entry(name.to_string()).or_default()
    }

    /// Combines two customizations; flags are OR-ed, `self` wins on values.
    pub fn merged(&self, other: &MethodCustomization) -> MethodCustomization {
        let mut arguments = other.arguments.clone();
        arguments.extend(self.arguments.clone());
        MethodCustomization {
            ignored: self.ignored || other.ignored,
            not_implemented: self.not_implemented || other.not_implemented,
            custom_implementation: self.custom_implementation || other.custom_implementation,
            no_error: self.no_error || other.no_error,
            encoder: self.encoder.clone().or_else(|| other.encoder.clone()),
            arguments,
        }
    }
}

/// Customization of one argument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgumentCustomization {
    /// Treat the argument as required even when the specification marks it optional.
    pub required: bool,
    /// Substitute a default value when the argument is missing.
    pub has_default: bool,
    /// Name of the default provider. Implies `has_default`.
    pub default_value: Option<String>,
    /// Do not decode or pass the argument.
    pub ignored: bool,
}

impl ArgumentCustomization {
    pub fn uses_default(&self) -> bool {
        self.has_default || self.default_value.is_some()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
