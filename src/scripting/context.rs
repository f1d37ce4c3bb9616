//! Script contexts
//!
//! A [`ScriptContext`] is one isolated global environment inside the host's
//! runtime. It owns the identity cache that maps native entities to their
//! script objects: the same entity always yields the same object for as long
//! as the context lives.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use rquickjs::{Context, Ctx, Object, Persistent, Value};

use super::boundary;
use super::entity::{EntityRef, ObjectId};
use super::host::{ContextId, HostInner};
use super::template::TemplateTree;
use super::value::ScriptValue;
use crate::core::error::{ScriptError, ScriptResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextLifecycle {
    Created,
    Active,
    Disposed,
}

/// State shared between a context handle and the callbacks installed in it.
///
/// Callbacks hold it weakly. Field order matters: cached handles are dropped
/// before the engine context.
pub(crate) struct ContextState {
    pub(crate) id: ContextId,
    pub(crate) handles: RefCell<HashMap<ObjectId, Persistent<Object<'static>>>>,
    pub(crate) entities: RefCell<HashMap<ObjectId, EntityRef>>,
    pub(crate) prototypes: RefCell<HashMap<String, Persistent<Object<'static>>>>,
    pub(crate) root: RefCell<Option<EntityRef>>,
    pub(crate) templates: Rc<TemplateTree>,
    pub(crate) host: Weak<HostInner>,
    pub(crate) lifecycle: Cell<ContextLifecycle>,
    pub(crate) context: RefCell<Option<Context>>,
}

impl ContextState {
    pub(crate) fn new(
        id: ContextId,
        context: Context,
        templates: Rc<TemplateTree>,
        host: Weak<HostInner>,
    ) -> Self {
        Self {
            id,
            handles: RefCell::new(HashMap::new()),
            entities: RefCell::new(HashMap::new()),
            prototypes: RefCell::new(HashMap::new()),
            root: RefCell::new(None),
            templates,
            host,
            lifecycle: Cell::new(ContextLifecycle::Created),
            context: RefCell::new(Some(context)),
        }
    }

    fn is_disposed(&self) -> bool {
        self.lifecycle.get() == ContextLifecycle::Disposed
    }

    /// Releases every engine reference held by this context.
    fn release(&self) {
        self.lifecycle.set(ContextLifecycle::Disposed);
        let handles = std::mem::take(&mut *self.handles.borrow_mut());
        let prototypes = std::mem::take(&mut *self.prototypes.borrow_mut());
        drop(handles);
        drop(prototypes);
        self.entities.borrow_mut().clear();
        self.root.borrow_mut().take();
        let context = self.context.borrow_mut().take();
        drop(context);
    }
}

/// Handle to one script context. Cloning yields another handle to the same
/// context.
#[derive(Clone)]
pub struct ScriptContext {
    pub(crate) state: Rc<ContextState>,
}

impl ScriptContext {
    pub(crate) fn from_state(state: Rc<ContextState>) -> Self {
        Self { state }
    }

    pub fn id(&self) -> ContextId {
        self.state.id
    }

    pub fn lifecycle(&self) -> ContextLifecycle {
        self.state.lifecycle.get()
    }

    pub fn is_disposed(&self) -> bool {
        self.state.is_disposed()
    }

    /// The entity whose handle is the global object, if the host has one.
    pub fn root(&self) -> Option<EntityRef> {
        self.state.root.borrow().clone()
    }

    /// Number of entities that currently have a script object.
    pub fn cached_handle_count(&self) -> usize {
        self.state.handles.borrow().len()
    }

    /// Runs `f` inside the context.
    pub fn with<F, R>(&self, f: F) -> ScriptResult<R>
    where
        F: for<'js> FnOnce(&Scope<'js>) -> R,
    {
        if self.is_disposed() {
            return Err(ScriptError::ContextDisposed);
        }
        // cloned out so no borrow is held while scripts run
        let context = self
            .state
            .context
            .borrow()
            .clone()
            .ok_or(ScriptError::ContextDisposed)?;
        let state = self.state.clone();
        Ok(context.with(|ctx| {
            let scope = Scope { ctx, state };
            f(&scope)
        }))
    }

    /// Evaluates `source` and converts the completion value.
    pub fn run_script(&self, source: &str) -> ScriptResult<ScriptValue> {
        tracing::debug!(target: "scripting", "Running script in context {}", self.id());
        self.with(|scope| {
            let value = scope.eval(source)?;
            Ok(scope.to_script_value(&value))
        })?
    }

    /// Disposes the context: releases every cached handle and entity, drops the
    /// engine context and removes it from the host.
    pub fn dispose(&self) -> ScriptResult<()> {
        if self.is_disposed() {
            return Err(ScriptError::ContextDisposed);
        }
        let released = self.cached_handle_count();
        self.state.release();
        if let Some(host) = self.state.host.upgrade() {
            host.unregister(self.state.id);
        }
        tracing::debug!(
            target: "scripting",
            "Disposed context {} ({} cached handles released)",
            self.state.id,
            released
        );
        Ok(())
    }

    pub(crate) fn force_dispose(&self) {
        if !self.is_disposed() {
            self.state.release();
        }
    }
}

impl fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptContext")
            .field("id", &self.state.id)
            .field("lifecycle", &self.state.lifecycle.get())
            .finish()
    }
}

/// Access to a context while its engine lock is held.
#[derive(Clone)]
pub struct Scope<'js> {
    pub(crate) ctx: Ctx<'js>,
    pub(crate) state: Rc<ContextState>,
}

impl<'js> Scope<'js> {
    pub fn ctx(&self) -> &Ctx<'js> {
        &self.ctx
    }

    pub fn id(&self) -> ContextId {
        self.state.id
    }

    /// The context handle, or `None` once the context is disposed.
    pub fn context(&self) -> Option<ScriptContext> {
        if self.state.is_disposed() {
            None
        } else {
            Some(ScriptContext::from_state(self.state.clone()))
        }
    }

    pub fn globals(&self) -> Object<'js> {
        self.ctx.globals()
    }

    pub fn eval(&self, source: &str) -> ScriptResult<Value<'js>> {
        self.ensure_live()?;
        self.ctx
            .eval::<Value<'js>, _>(source)
            .map_err(|err| boundary::script_error(&self.ctx, err))
    }

    /// The script object for `entity`. Repeated calls return the same object.
    pub fn get_or_create_handle_for(&self, entity: &EntityRef) -> ScriptResult<Object<'js>> {
        self.ensure_live()?;
        let id = entity.object_id();
        let cached = self.state.handles.borrow().get(&id).cloned();
        if let Some(handle) = cached {
            return Ok(handle.restore(&self.ctx)?);
        }

        let interface = entity.interface_name();
        let template = self
            .state
            .templates
            .get(interface)
            .ok_or_else(|| ScriptError::UnknownInterface(interface.to_string()))?;
        let prototype = self.prototype(interface)?;

        let object = Object::new(self.ctx.clone())?;
        boundary::set_prototype(&self.ctx, object.as_value(), prototype.as_value())?;
        boundary::write_internal_slots(
            &self.ctx,
            &object,
            template.internal_field_count(),
            id,
        )?;
        self.remember(id, entity, &object);
        tracing::trace!(
            target: "scripting",
            "Created {} handle for entity {} in context {}",
            interface,
            id,
            self.state.id
        );
        Ok(object)
    }

    /// The native entity behind `object`.
    ///
    /// Only objects created by this context qualify: the id in internal slot 0
    /// must map to a cached handle that is `object` itself.
    pub fn lookup_native_for(&self, object: &Object<'js>) -> ScriptResult<EntityRef> {
        self.ensure_live()?;
        let id = boundary::read_internal_slot(object).ok_or(ScriptError::NotNativeObject)?;
        let cached = self.state.handles.borrow().get(&id).cloned();
        let handle = cached.ok_or(ScriptError::NotNativeObject)?;
        let handle = handle.restore(&self.ctx)?;
        if handle.as_value() != object.as_value() {
            return Err(ScriptError::NotNativeObject);
        }
        self.state
            .entities
            .borrow()
            .get(&id)
            .cloned()
            .ok_or(ScriptError::NotNativeObject)
    }

    /// The realized prototype object of `interface`.
    pub fn prototype(&self, interface: &str) -> ScriptResult<Object<'js>> {
        let cached = self.state.prototypes.borrow().get(interface).cloned();
        let prototype = cached.ok_or_else(|| ScriptError::UnknownInterface(interface.to_string()))?;
        Ok(prototype.restore(&self.ctx)?)
    }

    pub fn to_script_value(&self, value: &Value<'js>) -> ScriptValue {
        ScriptValue::from_js(self, value)
    }

    pub(crate) fn remember(&self, id: ObjectId, entity: &EntityRef, object: &Object<'js>) {
        let handle = Persistent::save(&self.ctx, object.clone());
        self.state.handles.borrow_mut().insert(id, handle);
        self.state.entities.borrow_mut().insert(id, entity.clone());
    }

    fn ensure_live(&self) -> ScriptResult<()> {
        if self.state.is_disposed() {
            Err(ScriptError::ContextDisposed)
        } else {
            Ok(())
        }
    }
}
