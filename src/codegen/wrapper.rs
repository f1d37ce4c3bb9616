//! Wrapper generation
//!
//! Renders one [`WrapperSpec`] as a Rust module: the wrapper type, its template
//! factory and one trampoline per generated member.

use crate::bindings::{Operation, OperationArgument, WrapperSpec};

use super::ast::{Block, CodeWriter, FnDef, Stmt};
use super::naming::to_snake_case;
use super::GENERATED_MARKER;

const CONSTRUCTOR_TRAMPOLINE: &str = "construct";
const CREATE_INSTANCE: &str = "create_instance";

/// Source of the module for `spec`.
pub fn render_wrapper(spec: &WrapperSpec, imports: &[String]) -> String {
    let mut writer = CodeWriter::new();
    writer.line(GENERATED_MARKER);
    writer.blank();
    for import in imports {
        writer.line(&format!("use {};", import));
    }
    if !imports.is_empty() {
        writer.blank();
    }

    let wrapper = &spec.wrapper_type_name;
    writer.line(&format!("pub struct {};", wrapper));
    writer.blank();
    writer.line(&format!("impl Converters for {} {{}}", wrapper));
    writer.blank();

    writer.open(&format!("impl {}", wrapper));
    writer.function(&create_prototype(spec));
    if let Some(construct) = constructor(spec) {
        writer.blank();
        writer.function(&construct);
    }

    for op in spec.operations_to_generate() {
        writer.blank();
        writer.function(&operation(spec, op));
    }
    for accessor in spec.accessors_to_generate() {
        writer.blank();
        writer.function(&operation(spec, accessor));
    }
    writer.close();
    writer.finish()
}

fn create_prototype(spec: &WrapperSpec) -> FnDef {
    let mut body = Block::new();
    body.push(Stmt::Let {
        name: "mut constructor".to_string(),
        value: format!(
            "FunctionTemplate::new({:?}, Self::{})",
            spec.interface_name, CONSTRUCTOR_TRAMPOLINE
        ),
    });
    if let Some(parent) = &spec.inheritance {
        body.push(Stmt::expr(format!("constructor.inherits({:?})", parent)));
    }
    body.push(Stmt::expr("constructor.set_internal_field_count(1)"));

    let mut installs = Vec::new();
    for op in spec.operations_to_install() {
        installs.push(Stmt::expr(format!(
            "prototype.set({:?}, Self::{})",
            op.name,
            op.wrapper_method_name()
        )));
    }
    for attr in &spec.attributes {
        let (setter, attribute) = match &attr.setter {
            Some(setter) => (
                format!("Some(Self::{})", setter.wrapper_method_name()),
                "PropertyAttribute::None",
            ),
            None => ("None".to_string(), "PropertyAttribute::ReadOnly"),
        };
        installs.push(Stmt::expr(format!(
            "prototype.set_accessor_property({:?}, Self::{}, {}, {})",
            attr.name,
            attr.getter.wrapper_method_name(),
            setter,
            attribute
        )));
    }
    if !installs.is_empty() {
        body.push(Stmt::let_("prototype", "constructor.prototype_template_mut()"));
        body.extend(installs);
    }

    if spec.run_custom_code {
        body.push(Stmt::expr("Self::custom_initializer(&mut constructor)"));
    }
    body.push(Stmt::tail("constructor"));

    FnDef {
        visibility: Some("pub"),
        name: "create_prototype".to_string(),
        generics: None,
        params: Vec::new(),
        return_type: Some("FunctionTemplate".to_string()),
        body,
    }
}

/// `None` when the constructor is written by hand next to the generated module.
fn constructor(spec: &WrapperSpec) -> Option<FnDef> {
    let receiver = &spec.receiver;
    let Some(op) = &spec.constructor else {
        return Some(trampoline(
            CONSTRUCTOR_TRAMPOLINE,
            &format!("_{}", receiver),
            Block(vec![Stmt::tail("Err(BindingError::IllegalConstructor)")]),
        ));
    };
    if op.custom_implementation {
        return None;
    }
    if op.not_implemented {
        return Some(not_implemented(spec, op, CONSTRUCTOR_TRAMPOLINE));
    }

    let mut body = Block::new();
    body.extend(decode_arguments(op, receiver));
    body.push(Stmt::expr(format!("{}.require_context()?", receiver)));
    body.extend(arity_chain(op, |variant, args| {
        let name = variant_name(CREATE_INSTANCE, variant);
        let mut call_args = vec![receiver.clone()];
        call_args.extend(args);
        vec![Stmt::tail(format!(
            "Self::{}({})",
            name,
            call_args.join(", ")
        ))]
    }));
    Some(trampoline(CONSTRUCTOR_TRAMPOLINE, receiver, body))
}

fn operation(spec: &WrapperSpec, op: &Operation) -> FnDef {
    let name = op.wrapper_method_name();
    if op.not_implemented {
        return not_implemented(spec, op, &name);
    }

    let receiver = &spec.receiver;
    let mut body = Block::new();
    body.push(Stmt::let_(
        "instance",
        format!("{}.instance::<{}>()?", receiver, spec.inner_type_name),
    ));
    body.extend(decode_arguments(op, receiver));
    body.extend(arity_chain(op, |variant, args| {
        let method = variant_name(&name, variant);
        let call = format!("instance.{}({})", method, args.join(", "));
        let call = if op.has_error {
            format!("{}?", call)
        } else {
            call
        };
        match op.encoder() {
            Some(encoder) => vec![
                Stmt::let_("result", call),
                Stmt::tail(format!("Self::{}({}, result)", encoder, receiver)),
            ],
            None => vec![
                Stmt::expr(call),
                Stmt::tail(format!("Ok({}.undefined())", receiver)),
            ],
        }
    }));
    trampoline(&name, receiver, body)
}

fn not_implemented(spec: &WrapperSpec, op: &Operation, name: &str) -> FnDef {
    trampoline(
        name,
        &format!("_{}", spec.receiver),
        Block(vec![Stmt::tail(format!(
            "Err(BindingError::not_implemented({:?}, {:?}))",
            spec.interface_name, op.name
        ))]),
    )
}

fn trampoline(name: &str, receiver: &str, body: Block) -> FnDef {
    FnDef {
        visibility: None,
        name: name.to_string(),
        generics: Some("'js".to_string()),
        params: vec![format!("{}: &CallInfo<'js>", receiver)],
        return_type: Some("BindingResult<Value<'js>>".to_string()),
        body,
    }
}

fn decode_arguments(op: &Operation, receiver: &str) -> Vec<Stmt> {
    let args: Vec<&OperationArgument> = op.call_arguments().collect();
    if args.is_empty() {
        return Vec::new();
    }
    let mut stmts = vec![Stmt::let_(
        "args",
        format!("ArgumentHelper::new({})", receiver),
    )];
    for arg in args {
        let decoders = arg
            .decoders()
            .iter()
            .map(|d| format!("Self::{}", d))
            .collect::<Vec<_>>()
            .join(", ");
        let value = match &arg.default {
            Some(default) => format!(
                "args.decode_arg_or({}, Self::{}, &[{}])",
                arg.index, default, decoders
            ),
            None => format!("args.decode_arg({}, &[{}])", arg.index, decoders),
        };
        stmts.push(Stmt::let_(arg.variable_name(), value));
    }
    stmts
}

/// A call variant: how many leading arguments it receives and which optional
/// arguments contribute to its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant<'a> {
    pub arguments: Vec<&'a OperationArgument>,
    /// Minimum `args.count()` for the variant; `0` means unguarded.
    pub guard: usize,
}

/// The variants tried by a trampoline, longest first, and whether the chain
/// ends with a missing-arguments error.
pub fn arity_variants(op: &Operation) -> (Vec<Variant<'_>>, bool) {
    let args: Vec<&OperationArgument> = op.call_arguments().collect();
    let mut variants = Vec::new();

    for i in (0..=args.len()).rev() {
        let dropped_has_default = args.get(i).is_some_and(|a| a.uses_default());
        if !dropped_has_default {
            let prefix = args[..i].to_vec();
            let guard = prefix
                .iter()
                .rev()
                .find(|a| !a.uses_default())
                .map_or(0, |a| a.index + 1);
            variants.push(Variant {
                arguments: prefix,
                guard,
            });
            if guard == 0 {
                return (variants, false);
            }
        }
        if i > 0 {
            let last = args[i - 1];
            if !last.optional && !last.uses_default() {
                return (variants, true);
            }
        }
    }
    (variants, false)
}

fn arity_chain<F>(op: &Operation, call: F) -> Vec<Stmt>
where
    F: Fn(&Variant<'_>, Vec<String>) -> Vec<Stmt>,
{
    let (variants, missing_arguments) = arity_variants(op);
    let mut stmts = Vec::new();

    for variant in &variants {
        let mut body = Vec::new();
        if variant.arguments.len() > 1 {
            let errors = variant
                .arguments
                .iter()
                .map(|a| format!("{}.as_ref().err()", a.variable_name()))
                .collect::<Vec<_>>()
                .join(", ");
            body.push(Stmt::expr(format!("join_errors([{}])?", errors)));
        }
        let call_args = variant
            .arguments
            .iter()
            .map(|a| format!("{}?", a.variable_name()))
            .collect();
        body.extend(call(variant, call_args));

        if variant.guard == 0 {
            stmts.extend(body);
        } else {
            let body = body
                .into_iter()
                .map(|stmt| match stmt {
                    Stmt::Tail(expr) => Stmt::Return(expr),
                    other => other,
                })
                .collect();
            stmts.push(Stmt::if_(format!("args.count() >= {}", variant.guard), body));
        }
    }
    if missing_arguments {
        stmts.push(Stmt::tail("Err(BindingError::MissingArguments)"));
    }
    stmts
}

/// `base` plus the snake-case names of the optional arguments the variant takes.
fn variant_name(base: &str, variant: &Variant<'_>) -> String {
    let mut name = base.to_string();
    for arg in &variant.arguments {
        if arg.optional && !arg.uses_default() {
            name.push('_');
            name.push_str(&to_snake_case(&arg.name));
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MethodCustomization;
    use crate::idl::TypeDescriptor;
    use proptest::prelude::*;

    fn arg(name: &str, index: usize, optional: bool) -> OperationArgument {
        OperationArgument {
            name: name.to_string(),
            index,
            types: vec![TypeDescriptor::new("DOMString")],
            optional,
            variadic: false,
            default: None,
            ignored: false,
        }
    }

    fn op(name: &str, arguments: Vec<OperationArgument>) -> Operation {
        Operation {
            name: name.to_string(),
            return_type: None,
            arguments,
            customization: MethodCustomization::default(),
            not_implemented: false,
            custom_implementation: false,
            has_error: true,
        }
    }

    fn names(op: &Operation) -> Vec<(String, usize)> {
        arity_variants(op)
            .0
            .iter()
            .map(|v| (variant_name(&op.wrapper_method_name(), v), v.guard))
            .collect()
    }

    #[test]
    fn test_variants_for_optional_tail() {
        let op = op(
            "doIt",
            vec![arg("a", 0, false), arg("b", 1, true), arg("c", 2, true)],
        );
        assert_eq!(
            names(&op),
            vec![
                ("do_it_b_c".to_string(), 3),
                ("do_it_b".to_string(), 2),
                ("do_it".to_string(), 1),
            ]
        );
        assert!(arity_variants(&op).1);
    }

    #[test]
    fn test_all_optional_ends_unguarded() {
        let op = op("toggle", vec![arg("force", 0, true)]);
        assert_eq!(
            names(&op),
            vec![("toggle_force".to_string(), 1), ("toggle".to_string(), 0)]
        );
        assert!(!arity_variants(&op).1);
    }

    #[test]
    fn test_defaulted_argument_never_splits() {
        let mut options = arg("options", 1, true);
        options.default = Some("default_options".to_string());
        let op = op("listen", vec![arg("type", 0, false), options]);
        assert_eq!(names(&op), vec![("listen".to_string(), 1)]);
        assert!(arity_variants(&op).1);
    }

    #[test]
    fn test_no_arguments() {
        let op = op("normalize", Vec::new());
        assert_eq!(names(&op), vec![("normalize".to_string(), 0)]);
    }

    #[test]
    fn test_chain_renders_join_and_missing_arguments() {
        let op = op("insert", vec![arg("a", 0, false), arg("b", 1, true)]);
        let mut writer = CodeWriter::new();
        writer.block(&Block(arity_chain(&op, |variant, args| {
            vec![Stmt::tail(format!(
                "call_{}({})",
                variant.arguments.len(),
                args.join(", ")
            ))]
        })));
        let expected = "\
if args.count() >= 2 {
    join_errors([a.as_ref().err(), b.as_ref().err()])?;
    return call_2(a?, b?);
}
if args.count() >= 1 {
    return call_1(a?);
}
Err(BindingError::MissingArguments)
";
        assert_eq!(writer.finish(), expected);
    }

    proptest! {
        #[test]
        fn test_variant_shapes(required in 0usize..4, optional in 0usize..4) {
            let mut arguments = Vec::new();
            for i in 0..required + optional {
                arguments.push(arg(&format!("arg{}", i), i, i >= required));
            }
            let op = op("run", arguments);
            let (variants, missing) = arity_variants(&op);

            // one variant per optional argument plus the required prefix
            prop_assert_eq!(variants.len(), optional + 1);
            prop_assert_eq!(missing, required > 0);
            for (offset, variant) in variants.iter().enumerate() {
                let len = required + optional - offset;
                prop_assert_eq!(variant.arguments.len(), len);
                prop_assert_eq!(variant.guard, len);
            }
        }
    }
}
