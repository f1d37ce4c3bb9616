//! Binding model
//!
//! The classified, customization-merged view of one interface. This is what the
//! code generator renders; it no longer refers to the raw specification.

use crate::codegen::naming::{sanitize_ident, to_snake_case};
use crate::config::MethodCustomization;
use crate::idl::TypeDescriptor;

/// Types with a dedicated converter in `scripting::Converters`. Everything else
/// is an interface and goes through the entity converters.
const PRIMITIVE_TYPES: &[&str] = &[
    "DOMString",
    "USVString",
    "boolean",
    "byte",
    "octet",
    "short",
    "unsigned short",
    "long",
    "unsigned long",
    "long long",
    "unsigned long long",
    "float",
    "unrestricted float",
    "double",
    "unrestricted double",
    "any",
];

/// `decode_dom_string`, `to_nullable_entity`, `to_dom_string_sequence`, ...
pub fn converter_name(prefix: &str, ty: &TypeDescriptor) -> String {
    let nullable = if ty.nullable { "nullable_" } else { "" };
    let base = match ty.name.strip_prefix("sequence ") {
        Some(element) => format!("{}_sequence", element_converter(element)),
        None => element_converter(&ty.name),
    };
    format!("{}_{}{}", prefix, nullable, base)
}

fn element_converter(name: &str) -> String {
    if PRIMITIVE_TYPES.contains(&name) {
        to_snake_case(name)
    } else {
        "entity".to_string()
    }
}

/// One argument as the generated trampoline handles it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationArgument {
    pub name: String,
    /// Position in the script call.
    pub index: usize,
    /// Candidate types, tried in order.
    pub types: Vec<TypeDescriptor>,
    pub optional: bool,
    pub variadic: bool,
    /// Converter that supplies the value when the caller omits it.
    pub default: Option<String>,
    /// Neither decoded nor passed to native code.
    pub ignored: bool,
}

impl OperationArgument {
    pub fn uses_default(&self) -> bool {
        self.default.is_some()
    }

    /// Local variable holding the decoded value.
    pub fn variable_name(&self) -> String {
        sanitize_ident(&self.name)
    }

    /// Decoder function names, one per candidate type.
    pub fn decoders(&self) -> Vec<String> {
        self.types
            .iter()
            .map(|ty| converter_name("decode", ty))
            .collect()
    }
}

/// A callable member: constructor, operation, or attribute accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Name as installed on the prototype.
    pub name: String,
    pub return_type: Option<TypeDescriptor>,
    pub arguments: Vec<OperationArgument>,
    pub customization: MethodCustomization,
    pub not_implemented: bool,
    pub custom_implementation: bool,
    /// The native method returns a `Result`.
    pub has_error: bool,
}

impl Operation {
    pub fn has_result(&self) -> bool {
        self.return_type.is_some()
    }

    /// Converter for the return value: the configured override, else
    /// `to_[nullable_]<type>`, with interfaces mapped to `entity`.
    pub fn encoder(&self) -> Option<String> {
        if !self.has_result() {
            return None;
        }
        if let Some(encoder) = &self.customization.encoder {
            return Some(encoder.clone());
        }
        self.return_type.as_ref().map(|ty| converter_name("to", ty))
    }

    /// Snake-case name of the trampoline and of the native method.
    pub fn wrapper_method_name(&self) -> String {
        sanitize_ident(&self.name)
    }

    /// Arguments that take part in decoding and calling.
    pub fn call_arguments(&self) -> impl Iterator<Item = &OperationArgument> {
        self.arguments.iter().filter(|a| !a.ignored)
    }

    /// Whether any code is generated for this member.
    pub fn is_generated(&self) -> bool {
        !self.customization.ignored && !self.custom_implementation
    }
}

/// An attribute and its synthesized accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub getter: Operation,
    /// `None` for readonly attributes.
    pub setter: Option<Operation>,
}

impl Attribute {
    pub fn is_readonly(&self) -> bool {
        self.setter.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    DuplicateOperation,
    UnionArgument,
    SkippedMember,
}

/// A non-fatal finding reported while classifying an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub member: String,
    pub message: String,
}

/// Everything needed to generate the wrapper for one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperSpec {
    pub interface_name: String,
    pub inner_type_name: String,
    pub wrapper_type_name: String,
    pub receiver: String,
    pub run_custom_code: bool,
    pub inheritance: Option<String>,
    pub constructor: Option<Operation>,
    pub operations: Vec<Operation>,
    pub attributes: Vec<Attribute>,
    pub diagnostics: Vec<Diagnostic>,
}

impl WrapperSpec {
    /// Operations installed on the prototype.
    pub fn operations_to_install(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter().filter(|op| !op.customization.ignored)
    }

    /// Operations that get a generated trampoline body.
    pub fn operations_to_generate(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter().filter(|op| op.is_generated())
    }

    /// Getters and setters that get a generated body.
    pub fn accessors_to_generate(&self) -> impl Iterator<Item = &Operation> {
        self.attributes
            .iter()
            .flat_map(|attr| std::iter::once(&attr.getter).chain(attr.setter.as_ref()))
            .filter(|op| op.is_generated())
    }

    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operation(name: &str, return_type: Option<TypeDescriptor>) -> Operation {
        Operation {
            name: name.to_string(),
            return_type,
            arguments: Vec::new(),
            customization: MethodCustomization::default(),
            not_implemented: false,
            custom_implementation: false,
            has_error: true,
        }
    }

    #[test]
    fn test_encoder_defaults_to_type() {
        let op = operation("firstChild", Some(TypeDescriptor::nullable("Node")));
        assert_eq!(op.encoder().as_deref(), Some("to_nullable_entity"));
        let op = operation("nodeName", Some(TypeDescriptor::new("DOMString")));
        assert_eq!(op.encoder().as_deref(), Some("to_dom_string"));
        assert_eq!(operation("normalize", None).encoder(), None);
        let op = operation("childNodes", Some(TypeDescriptor::new("sequence Node")));
        assert_eq!(op.encoder().as_deref(), Some("to_entity_sequence"));
        let op = operation("length", Some(TypeDescriptor::new("unsigned long")));
        assert_eq!(op.encoder().as_deref(), Some("to_unsigned_long"));
    }

    #[test]
    fn test_sequence_converters_follow_element_type() {
        let names = TypeDescriptor::new("sequence DOMString");
        assert_eq!(converter_name("to", &names), "to_dom_string_sequence");
        let lengths = TypeDescriptor::nullable("sequence unsigned long");
        assert_eq!(
            converter_name("decode", &lengths),
            "decode_nullable_unsigned_long_sequence"
        );
        let nodes = TypeDescriptor::new("sequence Node");
        assert_eq!(converter_name("default", &nodes), "default_entity_sequence");
    }

    #[test]
    fn test_encoder_override() {
        let mut op = operation("nodeName", Some(TypeDescriptor::new("DOMString")));
        op.customization.encoder = Some("to_upper_string".to_string());
        assert_eq!(op.encoder().as_deref(), Some("to_upper_string"));
    }

    #[test]
    fn test_wrapper_method_name() {
        assert_eq!(operation("getElementById", None).wrapper_method_name(), "get_element_by_id");
        assert_eq!(operation("type", None).wrapper_method_name(), "type_");
    }

    #[test]
    fn test_argument_decoders() {
        let arg = OperationArgument {
            name: "options".to_string(),
            index: 1,
            types: vec![TypeDescriptor::new("boolean"), TypeDescriptor::nullable("Node")],
            optional: true,
            variadic: false,
            default: None,
            ignored: false,
        };
        assert_eq!(arg.decoders(), vec!["decode_boolean", "decode_nullable_entity"]);
    }
}
