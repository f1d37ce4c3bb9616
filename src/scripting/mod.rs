//! Script host and context runtime
//!
//! Runs generated bindings inside QuickJS:
//! - `host` - runtime ownership, context registry
//! - `context` - script contexts and the per-context identity cache
//! - `template` - interface templates and the validated template tree
//! - `call` - trampoline input and argument decoding
//! - `convert` - default value converters
//! - `entity` - the native side of every script object
//! - `boundary` - all direct use of the engine object model
//! - `value` - engine independent script values

pub mod boundary;
pub mod call;
pub mod context;
pub mod convert;
pub mod entity;
pub mod host;
pub mod template;
pub mod value;

pub use call::{join_errors, ArgumentHelper, CallInfo, Decoder};
pub use context::{ContextLifecycle, Scope, ScriptContext};
pub use convert::Converters;
pub use entity::{ancestor_of, downcast_entity, same_entity, Entity, EntityRef, ObjectId};
pub use host::{ContextId, GlobalFactory, ScriptHost, ScriptHostBuilder};
pub use template::{
    AccessorEntry, FunctionTemplate, MethodEntry, PropertyAttribute, PrototypeTemplate,
    TemplateTree, Trampoline,
};
pub use value::ScriptValue;

/// Everything generated binding code refers to.
pub mod prelude {
    pub use std::rc::Rc;

    pub use rquickjs::Value;

    pub use super::call::{join_errors, ArgumentHelper, CallInfo};
    pub use super::convert::Converters;
    pub use super::entity::{Entity, EntityRef};
    pub use super::template::{FunctionTemplate, PropertyAttribute, PrototypeTemplate};
    pub use super::value::ScriptValue;
    pub use crate::core::error::{BindingError, BindingResult};
}
