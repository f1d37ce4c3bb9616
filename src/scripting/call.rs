//! Call information handed to trampolines
//!
//! [`CallInfo`] is the only thing a generated trampoline sees: the receiver,
//! the arguments and the scope of the calling context.

use std::rc::Rc;

use rquickjs::{Ctx, Value};

use super::context::{Scope, ScriptContext};
use super::entity::{downcast_entity, Entity, EntityRef};
use crate::core::error::{BindingError, BindingResult};

/// Converts one script value into a native argument.
pub type Decoder<'js, T> = fn(&CallInfo<'js>, &Value<'js>) -> BindingResult<T>;

pub struct CallInfo<'js> {
    scope: Scope<'js>,
    this: Value<'js>,
    args: Vec<Value<'js>>,
}

impl<'js> CallInfo<'js> {
    pub fn new(scope: Scope<'js>, this: Value<'js>, args: Vec<Value<'js>>) -> Self {
        Self { scope, this, args }
    }

    pub fn ctx(&self) -> &Ctx<'js> {
        self.scope.ctx()
    }

    pub fn scope(&self) -> &Scope<'js> {
        &self.scope
    }

    pub fn this(&self) -> &Value<'js> {
        &self.this
    }

    /// Number of arguments the script passed.
    pub fn count(&self) -> usize {
        self.args.len()
    }

    pub fn arg(&self, index: usize) -> Option<&Value<'js>> {
        self.args.get(index)
    }

    /// The native entity behind `this`, viewed as a `T`.
    ///
    /// Fails with [`BindingError::IllegalInvocation`] when the receiver is not a
    /// native object of this context or not a `T`.
    pub fn instance<T: Entity>(&self) -> BindingResult<Rc<T>> {
        let object = self
            .this
            .as_object()
            .ok_or(BindingError::IllegalInvocation)?;
        let entity = self
            .scope
            .lookup_native_for(object)
            .map_err(|_| BindingError::IllegalInvocation)?;
        downcast_entity::<T>(&entity).ok_or(BindingError::IllegalInvocation)
    }

    /// The script object for `entity`, created on first use.
    pub fn wrap(&self, entity: EntityRef) -> BindingResult<Value<'js>> {
        let object = self.scope.get_or_create_handle_for(&entity)?;
        Ok(object.into_value())
    }

    pub fn wrap_nullable(&self, entity: Option<EntityRef>) -> BindingResult<Value<'js>> {
        match entity {
            Some(entity) => self.wrap(entity),
            None => Ok(Value::new_null(self.ctx().clone())),
        }
    }

    /// The context this call runs in; fails once the context is disposed.
    pub fn require_context(&self) -> BindingResult<ScriptContext> {
        self.scope.context().ok_or(BindingError::UnknownContext)
    }

    pub fn undefined(&self) -> Value<'js> {
        Value::new_undefined(self.ctx().clone())
    }
}

/// Positional argument decoding for one call.
pub struct ArgumentHelper<'a, 'js> {
    info: &'a CallInfo<'js>,
}

impl<'a, 'js> ArgumentHelper<'a, 'js> {
    pub fn new(info: &'a CallInfo<'js>) -> Self {
        Self { info }
    }

    pub fn count(&self) -> usize {
        self.info.count()
    }

    /// Decodes argument `index` with the first decoder that accepts it.
    ///
    /// An absent argument is decoded as `undefined`; the arity chain makes sure
    /// the result is only used when the caller supplied enough arguments.
    pub fn decode_arg<T>(&self, index: usize, decoders: &[Decoder<'js, T>]) -> BindingResult<T> {
        let value = match self.info.arg(index) {
            Some(value) => value.clone(),
            None => self.info.undefined(),
        };
        self.decode_value(index, &value, decoders)
    }

    /// Like [`decode_arg`](Self::decode_arg), but substitutes `default` when the
    /// argument is absent or `undefined`.
    pub fn decode_arg_or<T>(
        &self,
        index: usize,
        default: fn() -> T,
        decoders: &[Decoder<'js, T>],
    ) -> BindingResult<T> {
        match self.info.arg(index) {
            Some(value) if !value.is_undefined() => self.decode_value(index, value, decoders),
            _ => Ok(default()),
        }
    }

    fn decode_value<T>(
        &self,
        index: usize,
        value: &Value<'js>,
        decoders: &[Decoder<'js, T>],
    ) -> BindingResult<T> {
        let mut reasons = Vec::with_capacity(decoders.len());
        for decoder in decoders {
            match decoder(self.info, value) {
                Ok(decoded) => return Ok(decoded),
                Err(err) => reasons.push(err.to_string()),
            }
        }
        Err(BindingError::Decode {
            index,
            reason: if reasons.is_empty() {
                "no decoder".to_string()
            } else {
                reasons.join(" / ")
            },
        })
    }
}

/// Merges the errors of simultaneously decoded arguments.
///
/// Returns `Ok(())` when none failed, the error itself when one failed, and a
/// [`BindingError::Joined`] otherwise.
pub fn join_errors<'e>(
    errors: impl IntoIterator<Item = Option<&'e BindingError>>,
) -> BindingResult<()> {
    match BindingError::join(errors.into_iter().flatten().cloned()) {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
