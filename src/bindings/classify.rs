//! Member classification
//!
//! Partitions the members of one interface into constructor, operations and
//! attributes, merges the configured customization into each of them and
//! records non-fatal findings as diagnostics.

use std::collections::HashSet;

use crate::codegen::naming::{to_snake_case, upper_first};
use crate::config::{MethodCustomization, WrapperTypeSpec};
use crate::core::error::{GenerateError, GenerateResult};
use crate::idl::{
    Argument, ArgumentType, AttributeMember, InterfaceSpec, Member, OperationMember, ReturnType,
    TypeDescriptor,
};

use super::model::{
    converter_name, Attribute, Diagnostic, DiagnosticKind, Operation, OperationArgument, WrapperSpec,
};

/// Name of the synthesized setter argument.
const SETTER_ARGUMENT: &str = "val";

/// Builds the binding model for one interface.
///
/// Fails with [`GenerateError::MalformedMember`] when any member lacks type
/// information; nothing is produced for the interface in that case.
pub fn create_wrapper_spec(
    interface: &InterfaceSpec,
    config: &WrapperTypeSpec,
    ignored_attribute_types: &[String],
) -> GenerateResult<WrapperSpec> {
    let mut classifier = Classifier {
        interface,
        config,
        ignored_attribute_types,
        seen: HashSet::new(),
        constructor: None,
        operations: Vec::new(),
        attributes: Vec::new(),
        diagnostics: Vec::new(),
    };

    for member in &interface.members {
        if member.is_static() {
            continue;
        }
        match member {
            Member::Constructor(op) => classifier.constructor(op)?,
            Member::Operation(op) => classifier.operation(op)?,
            Member::Attribute(attr) => classifier.attribute(attr)?,
        }
    }

    tracing::debug!(
        target: "bindgen",
        "Classified {}: {} operations, {} attributes, constructor: {}",
        interface.name,
        classifier.operations.len(),
        classifier.attributes.len(),
        classifier.constructor.is_some()
    );

    Ok(WrapperSpec {
        interface_name: interface.name.clone(),
        inner_type_name: config.inner_type_name().to_string(),
        wrapper_type_name: config.wrapper_type_name(),
        receiver: config.receiver_name().to_string(),
        run_custom_code: config.run_custom_code,
        inheritance: interface.parent.clone(),
        constructor: classifier.constructor,
        operations: classifier.operations,
        attributes: classifier.attributes,
        diagnostics: classifier.diagnostics,
    })
}

/// `default_<type>` converter for an argument the caller left out. Sequences
/// use the element-typed name the converters are declared under.
fn default_provider(ty: &TypeDescriptor) -> String {
    if ty.name.starts_with("sequence ") {
        converter_name("default", &TypeDescriptor::new(ty.name.clone()))
    } else {
        format!("default_{}", to_snake_case(&ty.name))
    }
}

struct Classifier<'a> {
    interface: &'a InterfaceSpec,
    config: &'a WrapperTypeSpec,
    ignored_attribute_types: &'a [String],
    seen: HashSet<String>,
    constructor: Option<Operation>,
    operations: Vec<Operation>,
    attributes: Vec<Attribute>,
    diagnostics: Vec<Diagnostic>,
}

impl Classifier<'_> {
    fn constructor(&mut self, member: &OperationMember) -> GenerateResult<()> {
        if !self.first_occurrence("constructor") {
            return Ok(());
        }
        let customization = self.config.method_customization("constructor");
        let operation = self.build_operation("constructor", None, &member.arguments, customization)?;
        if !operation.customization.ignored {
            self.constructor = Some(operation);
        }
        Ok(())
    }

    fn operation(&mut self, member: &OperationMember) -> GenerateResult<()> {
        let Some(name) = member.name.as_deref() else {
            self.diagnose(
                DiagnosticKind::SkippedMember,
                member.special.as_deref().unwrap_or("<anonymous>"),
                "anonymous operation is not bound".to_string(),
            );
            return Ok(());
        };
        if !self.first_occurrence(name) {
            return Ok(());
        }
        let return_type = match &member.return_type {
            Some(ReturnType::Undefined) => None,
            Some(ReturnType::Value(ty)) => Some(ty.clone()),
            None => return Err(self.malformed(name, "missing return type")),
        };
        let customization = self.config.method_customization(name);
        let operation = self.build_operation(name, return_type, &member.arguments, customization)?;
        self.operations.push(operation);
        Ok(())
    }

    fn attribute(&mut self, member: &AttributeMember) -> GenerateResult<()> {
        let ty = member
            .ty
            .clone()
            .ok_or_else(|| self.malformed(&member.name, "missing attribute type"))?;
        if self.ignored_attribute_types.contains(&ty.name) {
            tracing::debug!(
                target: "bindgen",
                "Skipping {}.{} of ignored type {}",
                self.interface.name,
                member.name,
                ty.name
            );
            return Ok(());
        }
        let customization = self.config.method_customization(&member.name);
        if customization.ignored {
            return Ok(());
        }

        let getter = Operation {
            name: member.name.clone(),
            return_type: Some(ty.clone()),
            arguments: Vec::new(),
            not_implemented: customization.not_implemented,
            custom_implementation: customization.custom_implementation,
            has_error: !customization.no_error,
            customization: customization.clone(),
        };

        let setter = if member.readonly {
            None
        } else {
            let setter_name = format!("set{}", upper_first(&member.name));
            let setter_customization = self
                .config
                .method_customization(&setter_name)
                .merged(&customization);
            if setter_customization.ignored || !self.first_occurrence(&setter_name) {
                None
            } else {
                Some(Operation {
                    name: setter_name,
                    return_type: None,
                    arguments: vec![OperationArgument {
                        name: SETTER_ARGUMENT.to_string(),
                        index: 0,
                        types: vec![ty],
                        optional: false,
                        variadic: false,
                        default: None,
                        ignored: false,
                    }],
                    not_implemented: setter_customization.not_implemented,
                    custom_implementation: setter_customization.custom_implementation,
                    has_error: !setter_customization.no_error,
                    customization: setter_customization,
                })
            }
        };

        self.attributes.push(Attribute {
            name: member.name.clone(),
            getter,
            setter,
        });
        Ok(())
    }

    fn build_operation(
        &mut self,
        name: &str,
        return_type: Option<TypeDescriptor>,
        arguments: &[Argument],
        customization: MethodCustomization,
    ) -> GenerateResult<Operation> {
        let mut operation_arguments = Vec::with_capacity(arguments.len());
        for (index, argument) in arguments.iter().enumerate() {
            let ty = argument.ty.as_ref().ok_or_else(|| {
                self.malformed(name, &format!("argument `{}` has no type", argument.name))
            })?;
            let types = match ty {
                ArgumentType::Single(ty) => vec![ty.clone()],
                ArgumentType::Union(types) => {
                    self.diagnose(
                        DiagnosticKind::UnionArgument,
                        name,
                        format!(
                            "argument `{}` is a union; decoding tries each type in order",
                            argument.name
                        ),
                    );
                    types.clone()
                }
            };
            if types.is_empty() {
                return Err(self.malformed(
                    name,
                    &format!("argument `{}` has an empty union type", argument.name),
                ));
            }

            let argument_customization = customization.argument(&argument.name);
            let optional = (argument.optional || argument.variadic)
                && !argument_customization.required;
            // Required arguments never fall back to a default.
            let default = if !optional {
                None
            } else if let Some(provider) = &argument_customization.default_value {
                Some(provider.clone())
            } else if argument_customization.has_default {
                Some(default_provider(&types[0]))
            } else {
                None
            };

            operation_arguments.push(OperationArgument {
                name: argument.name.clone(),
                index,
                types,
                optional,
                variadic: argument.variadic,
                default,
                ignored: argument_customization.ignored,
            });
        }

        Ok(Operation {
            name: name.to_string(),
            return_type,
            arguments: operation_arguments,
            not_implemented: customization.not_implemented,
            custom_implementation: customization.custom_implementation,
            has_error: !customization.no_error,
            customization,
        })
    }

    /// Records `name` and reports whether it was new.
    fn first_occurrence(&mut self, name: &str) -> bool {
        if self.seen.insert(name.to_string()) {
            return true;
        }
        self.diagnose(
            DiagnosticKind::DuplicateOperation,
            name,
            "duplicate operation skipped; the first declaration is bound".to_string(),
        );
        false
    }

    fn diagnose(&mut self, kind: DiagnosticKind, member: &str, message: String) {
        match kind {
            DiagnosticKind::SkippedMember => tracing::debug!(
                target: "bindgen",
                "{}.{}: {}",
                self.interface.name,
                member,
                message
            ),
            _ => tracing::warn!(
                target: "bindgen",
                "{}.{}: {}",
                self.interface.name,
                member,
                message
            ),
        }
        self.diagnostics.push(Diagnostic {
            kind,
            member: member.to_string(),
            message,
        });
    }

    fn malformed(&self, member: &str, reason: &str) -> GenerateError {
        GenerateError::MalformedMember {
            interface: self.interface.name.clone(),
            member: member.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(name: &str) -> Option<ArgumentType> {
        Some(ArgumentType::Single(TypeDescriptor::new(name)))
    }

    fn argument(name: &str, type_name: &str, optional: bool) -> Argument {
        Argument {
            name: name.to_string(),
            ty: ty(type_name),
            optional,
            variadic: false,
            default: None,
        }
    }

    fn operation(name: &str, arguments: Vec<Argument>) -> Member {
        Member::Operation(OperationMember {
            name: Some(name.to_string()),
            special: None,
            return_type: Some(ReturnType::Undefined),
            arguments,
        })
    }

    fn attribute(name: &str, type_name: &str, readonly: bool) -> Member {
        Member::Attribute(AttributeMember {
            name: name.to_string(),
            special: None,
            readonly,
            ty: Some(TypeDescriptor::new(type_name)),
        })
    }

    fn interface(members: Vec<Member>) -> InterfaceSpec {
        InterfaceSpec {
            name: "Node".to_string(),
            parent: Some("EventTarget".to_string()),
            members,
        }
    }

    fn ignored_types() -> Vec<String> {
        vec!["EventHandler".to_string()]
    }

    #[test]
    fn test_duplicate_operation_first_wins() {
        let spec = interface(vec![
            operation("append", vec![argument("node", "Node", false)]),
            operation("append", vec![argument("text", "DOMString", false)]),
        ]);
        let wrapper =
            create_wrapper_spec(&spec, &WrapperTypeSpec::new("Node"), &ignored_types()).unwrap();
        assert_eq!(wrapper.operations.len(), 1);
        assert_eq!(wrapper.operations[0].arguments[0].name, "node");
        assert_eq!(
            wrapper
                .diagnostics_of(DiagnosticKind::DuplicateOperation)
                .count(),
            1
        );
    }

    #[test]
    fn test_static_members_are_skipped() {
        let spec = interface(vec![Member::Operation(OperationMember {
            name: Some("create".to_string()),
            special: Some("static".to_string()),
            return_type: Some(ReturnType::Undefined),
            arguments: Vec::new(),
        })]);
        let wrapper =
            create_wrapper_spec(&spec, &WrapperTypeSpec::new("Node"), &ignored_types()).unwrap();
        assert!(wrapper.operations.is_empty());
    }

    #[test]
    fn test_attribute_accessors() {
        let spec = interface(vec![
            attribute("nodeName", "DOMString", true),
            attribute("textContent", "DOMString", false),
            attribute("onclick", "EventHandler", false),
        ]);
        let wrapper =
            create_wrapper_spec(&spec, &WrapperTypeSpec::new("Node"), &ignored_types()).unwrap();
        assert_eq!(wrapper.attributes.len(), 2);

        let node_name = &wrapper.attributes[0];
        assert!(node_name.is_readonly());
        assert_eq!(node_name.getter.name, "nodeName");

        let text_content = &wrapper.attributes[1];
        let setter = text_content.setter.as_ref().unwrap();
        assert_eq!(setter.name, "setTextContent");
        assert_eq!(setter.arguments.len(), 1);
        assert!(!setter.arguments[0].optional);
        assert_eq!(setter.arguments[0].types, vec![TypeDescriptor::new("DOMString")]);
        assert!(!setter.has_result());
    }

    #[test]
    fn test_setter_customization_is_merged() {
        let mut config = WrapperTypeSpec::new("Node");
        config.method("textContent").no_error = true;
        config.method("setTextContent").not_implemented = true;
        let spec = interface(vec![attribute("textContent", "DOMString", false)]);

        let wrapper = create_wrapper_spec(&spec, &config, &ignored_types()).unwrap();
        let attr = &wrapper.attributes[0];
        assert!(!attr.getter.has_error);
        assert!(!attr.getter.not_implemented);
        let setter = attr.setter.as_ref().unwrap();
        assert!(setter.not_implemented);
        assert!(!setter.has_error);
    }

    #[test]
    fn test_argument_customization() {
        let mut config = WrapperTypeSpec::new("Node");
        {
            let method = config.method("cloneNode");
            method.argument_mut("deep").required = true;
            method.argument_mut("options").has_default = true;
            method.argument_mut("hint").ignored = true;
        }
        let spec = interface(vec![operation(
            "cloneNode",
            vec![
                argument("deep", "boolean", true),
                argument("options", "CloneOptions", true),
                argument("hint", "DOMString", true),
            ],
        )]);

        let wrapper = create_wrapper_spec(&spec, &config, &ignored_types()).unwrap();
        let args = &wrapper.operations[0].arguments;
        assert!(!args[0].optional);
        assert_eq!(args[1].default.as_deref(), Some("default_clone_options"));
        assert!(args[2].ignored);
        assert_eq!(wrapper.operations[0].call_arguments().count(), 2);
    }

    #[test]
    fn test_default_only_for_optional_arguments() {
        let mut config = WrapperTypeSpec::new("Node");
        {
            let method = config.method("setRange");
            method.argument_mut("start").has_default = true;
            method.argument_mut("end").has_default = true;
            method.argument_mut("names").has_default = true;
        }
        let spec = interface(vec![operation(
            "setRange",
            vec![
                argument("start", "unsigned long", false),
                argument("end", "unsigned long", true),
                argument("names", "sequence DOMString", true),
            ],
        )]);

        let wrapper = create_wrapper_spec(&spec, &config, &ignored_types()).unwrap();
        let args = &wrapper.operations[0].arguments;
        assert!(!args[0].optional);
        assert_eq!(args[0].default, None);
        assert_eq!(args[1].default.as_deref(), Some("default_unsigned_long"));
        assert_eq!(args[2].default.as_deref(), Some("default_dom_string_sequence"));
    }

    #[test]
    fn test_synthesized_setter_clashing_with_operation() {
        let spec = interface(vec![
            attribute("textContent", "DOMString", false),
            operation("setTextContent", vec![argument("text", "DOMString", false)]),
        ]);
        let wrapper =
            create_wrapper_spec(&spec, &WrapperTypeSpec::new("Node"), &ignored_types()).unwrap();
        assert!(wrapper.attributes[0].setter.is_some());
        assert!(wrapper.operations.is_empty());
        assert_eq!(
            wrapper
                .diagnostics_of(DiagnosticKind::DuplicateOperation)
                .count(),
            1
        );

        let spec = interface(vec![
            operation("setTextContent", vec![argument("text", "DOMString", false)]),
            attribute("textContent", "DOMString", false),
        ]);
        let wrapper =
            create_wrapper_spec(&spec, &WrapperTypeSpec::new("Node"), &ignored_types()).unwrap();
        assert_eq!(wrapper.operations.len(), 1);
        assert!(wrapper.attributes[0].is_readonly());
        assert_eq!(
            wrapper
                .diagnostics_of(DiagnosticKind::DuplicateOperation)
                .count(),
            1
        );
    }

    #[test]
    fn test_union_argument_diagnostic() {
        let spec = interface(vec![operation(
            "addEventListener",
            vec![Argument {
                name: "options".to_string(),
                ty: Some(ArgumentType::Union(vec![
                    TypeDescriptor::new("AddEventListenerOptions"),
                    TypeDescriptor::new("boolean"),
                ])),
                optional: true,
                variadic: false,
                default: None,
            }],
        )]);
        let wrapper =
            create_wrapper_spec(&spec, &WrapperTypeSpec::new("Node"), &ignored_types()).unwrap();
        assert_eq!(wrapper.operations[0].arguments[0].types.len(), 2);
        assert_eq!(
            wrapper.diagnostics_of(DiagnosticKind::UnionArgument).count(),
            1
        );
    }

    #[test]
    fn test_missing_type_aborts_interface() {
        let spec = interface(vec![
            operation("ok", Vec::new()),
            operation(
                "broken",
                vec![Argument {
                    name: "x".to_string(),
                    ty: None,
                    optional: false,
                    variadic: false,
                    default: None,
                }],
            ),
        ]);
        let err = create_wrapper_spec(&spec, &WrapperTypeSpec::new("Node"), &ignored_types())
            .unwrap_err();
        assert_eq!(
            err,
            GenerateError::MalformedMember {
                interface: "Node".to_string(),
                member: "broken".to_string(),
                reason: "argument `x` has no type".to_string(),
            }
        );
    }

    #[test]
    fn test_constructor_and_names() {
        let mut config = WrapperTypeSpec::new("Document");
        config.inner_type = Some("DomDocument".to_string());
        let spec = InterfaceSpec {
            name: "Document".to_string(),
            parent: Some("Node".to_string()),
            members: vec![Member::Constructor(OperationMember {
                name: None,
                special: None,
                return_type: None,
                arguments: Vec::new(),
            })],
        };
        let wrapper = create_wrapper_spec(&spec, &config, &ignored_types()).unwrap();
        assert_eq!(wrapper.constructor.as_ref().unwrap().name, "constructor");
        assert_eq!(wrapper.wrapper_type_name, "DomDocumentWrapper");
        assert_eq!(wrapper.inheritance.as_deref(), Some("Node"));
    }

    #[test]
    fn test_anonymous_operation_is_skipped() {
        let spec = interface(vec![Member::Operation(OperationMember {
            name: None,
            special: Some("getter".to_string()),
            return_type: Some(ReturnType::Value(TypeDescriptor::new("Node"))),
            arguments: vec![argument("index", "unsigned long", false)],
        })]);
        let wrapper =
            create_wrapper_spec(&spec, &WrapperTypeSpec::new("Node"), &ignored_types()).unwrap();
        assert!(wrapper.operations.is_empty());
        assert_eq!(wrapper.diagnostics_of(DiagnosticKind::SkippedMember).count(), 1);
    }
}
