//! Script values detached from the engine
//!
//! Results of [`ScriptContext::run_script`](super::ScriptContext::run_script)
//! outlive the engine lock, so they are converted into [`ScriptValue`].

use std::collections::BTreeMap;
use std::fmt;

use rquickjs::{Array, Object, Value};

use super::boundary;
use super::context::Scope;
use super::entity::{same_entity, EntityRef};
use crate::core::error::ScriptResult;

/// Nesting depth after which objects and arrays are no longer expanded.
const MAX_DEPTH: usize = 8;

/// A script value
#[derive(Clone)]
pub enum ScriptValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<ScriptValue>),
    /// An object backed by a native entity of the evaluating context.
    Entity(EntityRef),
    Object(BTreeMap<String, ScriptValue>),
    /// Functions, symbols and anything nested too deeply, by type name.
    Other(String),
}

impl ScriptValue {
    pub(crate) fn from_js<'js>(scope: &Scope<'js>, value: &Value<'js>) -> Self {
        Self::convert(scope, value, 0)
    }

    fn convert<'js>(scope: &Scope<'js>, value: &Value<'js>, depth: usize) -> Self {
        if value.is_undefined() {
            return ScriptValue::Undefined;
        }
        if value.is_null() {
            return ScriptValue::Null;
        }
        if let Some(b) = value.as_bool() {
            return ScriptValue::Bool(b);
        }
        if let Some(n) = value.as_number() {
            return ScriptValue::Number(n);
        }
        if let Some(s) = value.as_string() {
            return match s.to_string() {
                Ok(s) => ScriptValue::String(s),
                Err(_) => ScriptValue::Other("string".to_string()),
            };
        }
        if value.is_function() {
            return ScriptValue::Other("function".to_string());
        }
        if depth >= MAX_DEPTH {
            return ScriptValue::Other(format!("{:?}", value.type_of()));
        }
        if let Some(array) = value.as_array() {
            let items = (0..array.len())
                .map(|i| match array.get::<Value<'js>>(i) {
                    Ok(item) => Self::convert(scope, &item, depth + 1),
                    Err(_) => ScriptValue::Undefined,
                })
                .collect();
            return ScriptValue::Array(items);
        }
        if let Some(object) = value.as_object() {
            if let Ok(entity) = scope.lookup_native_for(object) {
                return ScriptValue::Entity(entity);
            }
            return Self::convert_object(scope, object, depth);
        }
        ScriptValue::Other(format!("{:?}", value.type_of()))
    }

    fn convert_object<'js>(scope: &Scope<'js>, object: &Object<'js>, depth: usize) -> Self {
        let keys = match boundary::own_keys(scope.ctx(), object.as_value()) {
            Ok(keys) => keys,
            Err(_) => return ScriptValue::Other("object".to_string()),
        };
        let mut fields = BTreeMap::new();
        for key in keys {
            if let Ok(field) = object.get::<_, Value<'js>>(key.as_str()) {
                fields.insert(key, Self::convert(scope, &field, depth + 1));
            }
        }
        ScriptValue::Object(fields)
    }

    /// Converts back into an engine value of `scope`. Entities get their cached
    /// handle; `Other` values become `undefined`.
    pub fn to_js<'js>(&self, scope: &Scope<'js>) -> ScriptResult<Value<'js>> {
        let ctx = scope.ctx().clone();
        let value = match self {
            ScriptValue::Undefined | ScriptValue::Other(_) => Value::new_undefined(ctx),
            ScriptValue::Null => Value::new_null(ctx),
            ScriptValue::Bool(b) => Value::new_bool(ctx, *b),
            ScriptValue::Number(n) => Value::new_number(ctx, *n),
            ScriptValue::String(s) => rquickjs::String::from_str(ctx, s)?.into_value(),
            ScriptValue::Array(items) => {
                let array = Array::new(ctx)?;
                for (i, item) in items.iter().enumerate() {
                    array.set(i, item.to_js(scope)?)?;
                }
                array.into_value()
            }
            ScriptValue::Entity(entity) => scope.get_or_create_handle_for(entity)?.into_value(),
            ScriptValue::Object(fields) => {
                let object = Object::new(ctx)?;
                for (key, field) in fields {
                    object.set(key.as_str(), field.to_js(scope)?)?;
                }
                object.into_value()
            }
        };
        Ok(value)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, ScriptValue::Undefined)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScriptValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            ScriptValue::Entity(entity) => Some(entity),
            _ => None,
        }
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Undefined => write!(f, "Undefined"),
            ScriptValue::Null => write!(f, "Null"),
            ScriptValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            ScriptValue::Number(n) => f.debug_tuple("Number").field(n).finish(),
            ScriptValue::String(s) => f.debug_tuple("String").field(s).finish(),
            ScriptValue::Array(items) => f.debug_tuple("Array").field(items).finish(),
            ScriptValue::Entity(entity) => write!(
                f,
                "Entity({} {})",
                entity.interface_name(),
                entity.object_id()
            ),
            ScriptValue::Object(fields) => f.debug_tuple("Object").field(fields).finish(),
            ScriptValue::Other(kind) => f.debug_tuple("Other").field(kind).finish(),
        }
    }
}

impl PartialEq for ScriptValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScriptValue::Undefined, ScriptValue::Undefined) => true,
            (ScriptValue::Null, ScriptValue::Null) => true,
            (ScriptValue::Bool(a), ScriptValue::Bool(b)) => a == b,
            (ScriptValue::Number(a), ScriptValue::Number(b)) => a == b,
            (ScriptValue::String(a), ScriptValue::String(b)) => a == b,
            (ScriptValue::Array(a), ScriptValue::Array(b)) => a == b,
            (ScriptValue::Entity(a), ScriptValue::Entity(b)) => same_entity(a, b),
            (ScriptValue::Object(a), ScriptValue::Object(b)) => a == b,
            (ScriptValue::Other(a), ScriptValue::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::String(value.to_string())
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        ScriptValue::Number(value)
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Bool(value)
    }
}
