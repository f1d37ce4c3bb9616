//! Engine boundary
//!
//! Every direct use of the QuickJS object model lives here: throwing
//! exceptions, defining properties, linking prototypes, internal slots and
//! realizing templates in a fresh context.

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use rquickjs::function::{Rest, This};
use rquickjs::{Ctx, Exception, FromJs, Function, Object, Persistent, Value};

use super::call::CallInfo;
use super::context::{ContextState, Scope};
use super::entity::ObjectId;
use super::template::{PropertyAttribute, TemplateTree, Trampoline};
use crate::core::error::{BindingError, ScriptError, ScriptResult};

const INTERNAL_SLOT_PREFIX: &str = "__internal_slot_";

/// Wraps a native constructor so that it can be called with `new`.
const CONSTRUCTOR_SHIM: &str =
    "(function (native) { return function () { return native.apply(this, arguments); }; })";

// ============================================================================
// Exceptions
// ============================================================================

/// Raises `error` as a script exception.
///
/// This is the only place where a [`BindingError`] becomes visible to scripts.
pub fn throw(ctx: &Ctx<'_>, error: BindingError) -> rquickjs::Error {
    tracing::debug!(target: "scripting", "Throwing to script: {}", error);
    let message = error.to_string();
    match error {
        BindingError::MissingArguments
        | BindingError::IllegalConstructor
        | BindingError::IllegalInvocation
        | BindingError::Decode { .. } => Exception::throw_type(ctx, &message),
        BindingError::NotImplemented { .. }
        | BindingError::Native(_)
        | BindingError::Joined(_) => Exception::throw_message(ctx, &message),
        BindingError::UnknownContext | BindingError::Script(_) => {
            Exception::throw_internal(ctx, &message)
        }
    }
}

/// Converts an engine error, picking up the pending exception if there is one.
pub fn script_error(ctx: &Ctx<'_>, error: rquickjs::Error) -> ScriptError {
    if !matches!(error, rquickjs::Error::Exception) {
        return ScriptError::Engine(error);
    }
    let exception = ctx.catch();
    let message = match exception.as_exception() {
        Some(exception) => {
            let name = exception
                .get::<_, String>("name")
                .unwrap_or_else(|_| "Error".to_string());
            match exception.message() {
                Some(message) => format!("{}: {}", name, message),
                None => name,
            }
        }
        None => call_global::<String>(ctx, "String", exception.clone())
            .unwrap_or_else(|_| "uncaught exception".to_string()),
    };
    ScriptError::Runtime(message)
}

// ============================================================================
// Object model helpers
// ============================================================================

/// Calls a global function such as `String` or `Number` with one argument.
pub fn call_global<'js, R: FromJs<'js>>(
    ctx: &Ctx<'js>,
    name: &str,
    value: Value<'js>,
) -> rquickjs::Result<R> {
    let function: Function = ctx.globals().get(name)?;
    function.call((value,))
}

fn object_static<'js>(ctx: &Ctx<'js>, name: &str) -> rquickjs::Result<Function<'js>> {
    let object: Object = ctx.globals().get("Object")?;
    object.get(name)
}

pub fn define_property<'js>(
    ctx: &Ctx<'js>,
    target: &Value<'js>,
    name: &str,
    descriptor: Object<'js>,
) -> rquickjs::Result<()> {
    object_static(ctx, "defineProperty")?.call::<_, Value>((target.clone(), name, descriptor))?;
    Ok(())
}

pub fn set_prototype<'js>(
    ctx: &Ctx<'js>,
    target: &Value<'js>,
    prototype: &Value<'js>,
) -> rquickjs::Result<()> {
    object_static(ctx, "setPrototypeOf")?.call::<_, Value>((target.clone(), prototype.clone()))?;
    Ok(())
}

/// Own enumerable string keys of `target`.
pub fn own_keys<'js>(ctx: &Ctx<'js>, target: &Value<'js>) -> rquickjs::Result<Vec<String>> {
    object_static(ctx, "keys")?.call((target.clone(),))
}

fn data_descriptor<'js>(
    ctx: &Ctx<'js>,
    value: Value<'js>,
    writable: bool,
    enumerable: bool,
) -> rquickjs::Result<Object<'js>> {
    let descriptor = Object::new(ctx.clone())?;
    descriptor.set("value", value)?;
    descriptor.set("writable", writable)?;
    descriptor.set("enumerable", enumerable)?;
    descriptor.set("configurable", writable)?;
    Ok(descriptor)
}

/// Writes the hidden slots of a fresh object. Slot 0 holds the entity id; the
/// slots can neither be changed nor enumerated afterwards.
pub fn write_internal_slots<'js>(
    ctx: &Ctx<'js>,
    object: &Object<'js>,
    count: usize,
    id: ObjectId,
) -> rquickjs::Result<()> {
    for slot in 0..count.max(1) {
        let value = if slot == 0 {
            Value::new_number(ctx.clone(), id.as_u64() as f64)
        } else {
            Value::new_undefined(ctx.clone())
        };
        let descriptor = data_descriptor(ctx, value, false, false)?;
        define_property(
            ctx,
            object.as_value(),
            &format!("{}{}", INTERNAL_SLOT_PREFIX, slot),
            descriptor,
        )?;
    }
    Ok(())
}

/// Entity id stored in slot 0 of `object`, if any.
pub fn read_internal_slot(object: &Object<'_>) -> Option<ObjectId> {
    let value: Value = object
        .get(format!("{}0", INTERNAL_SLOT_PREFIX).as_str())
        .ok()?;
    let raw = value.as_number()?;
    if raw.is_finite() && raw >= 1.0 && raw.fract() == 0.0 {
        Some(ObjectId::from_u64(raw as u64))
    } else {
        None
    }
}

// ============================================================================
// Callbacks
// ============================================================================

/// Wraps a trampoline in an engine function bound to one context.
///
/// The function only holds the context weakly; calls after disposal throw.
pub(crate) fn new_callback<'js>(
    ctx: &Ctx<'js>,
    state: Weak<ContextState>,
    trampoline: Trampoline,
) -> rquickjs::Result<Function<'js>> {
    Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, this: This<Value<'js>>, args: Rest<Value<'js>>| -> rquickjs::Result<Value<'js>> {
            let state = match state.upgrade() {
                Some(state) => state,
                None => return Err(throw(&ctx, BindingError::UnknownContext)),
            };
            let scope = Scope {
                ctx: ctx.clone(),
                state,
            };
            let info = CallInfo::new(scope, this.0, args.0);
            trampoline(&info).map_err(|err| throw(&ctx, err))
        },
    )
}

// ============================================================================
// Template realization
// ============================================================================

/// Creates the constructor and prototype of every template in `ctx` and
/// publishes the constructors as globals.
pub(crate) fn realize_templates<'js>(
    ctx: &Ctx<'js>,
    state: &Rc<ContextState>,
    templates: &TemplateTree,
) -> ScriptResult<HashMap<String, Persistent<Object<'static>>>> {
    let shim: Function = ctx
        .eval(CONSTRUCTOR_SHIM)
        .map_err(|err| script_error(ctx, err))?;
    let globals = ctx.globals();
    let mut prototypes: HashMap<String, Object<'js>> = HashMap::new();

    for template in templates.iter() {
        let prototype = Object::new(ctx.clone())?;
        if let Some(parent) = template.parent() {
            let parent_prototype = prototypes.get(parent).ok_or_else(|| {
                ScriptError::InvalidBinding(format!(
                    "prototype of {} realized before its parent {}",
                    template.name(),
                    parent
                ))
            })?;
            set_prototype(ctx, prototype.as_value(), parent_prototype.as_value())?;
        }

        let native = new_callback(ctx, Rc::downgrade(state), template.constructor())?;
        let constructor: Function = shim.call((native,))?;
        define_property(
            ctx,
            constructor.as_value(),
            "prototype",
            data_descriptor(ctx, prototype.clone().into_value(), false, false)?,
        )?;
        define_property(
            ctx,
            prototype.as_value(),
            "constructor",
            data_descriptor(ctx, constructor.clone().into_value(), true, false)?,
        )?;

        let members = template.prototype_template();
        for method in members.methods() {
            let function = new_callback(ctx, Rc::downgrade(state), method.callback)?;
            prototype.set(method.name.as_str(), function)?;
        }
        for accessor in members.accessors() {
            let descriptor = Object::new(ctx.clone())?;
            descriptor.set("get", new_callback(ctx, Rc::downgrade(state), accessor.getter)?)?;
            if let (Some(setter), PropertyAttribute::None) = (accessor.setter, accessor.attribute) {
                descriptor.set("set", new_callback(ctx, Rc::downgrade(state), setter)?)?;
            }
            descriptor.set("enumerable", true)?;
            descriptor.set("configurable", true)?;
            define_property(ctx, prototype.as_value(), &accessor.name, descriptor)?;
        }

        globals.set(template.name(), constructor)?;
        tracing::trace!(
            target: "scripting",
            "Realized template {} ({} methods, {} accessors)",
            template.name(),
            members.methods().len(),
            members.accessors().len()
        );
        prototypes.insert(template.name().to_string(), prototype);
    }

    Ok(prototypes
        .into_iter()
        .map(|(name, prototype)| (name, Persistent::save(ctx, prototype)))
        .collect())
}

/// Turns the global object into the handle of `root`.
pub(crate) fn install_root<'js>(
    scope: &Scope<'js>,
    root: &super::entity::EntityRef,
    binding_name: Option<&str>,
) -> ScriptResult<()> {
    let ctx = scope.ctx();
    let globals = ctx.globals();
    let interface = root.interface_name();
    let template = scope
        .state
        .templates
        .get(interface)
        .ok_or_else(|| ScriptError::UnknownInterface(interface.to_string()))?;
    let prototype = scope.prototype(interface)?;
    set_prototype(ctx, globals.as_value(), prototype.as_value())?;
    write_internal_slots(ctx, &globals, template.internal_field_count(), root.object_id())?;
    scope.remember(root.object_id(), root, &globals);
    if let Some(name) = binding_name {
        globals.set(name, globals.clone())?;
    }
    Ok(())
}
