//! Script host
//!
//! The [`ScriptHost`] owns the engine runtime and the validated template tree.
//! It creates isolated [`ScriptContext`]s, keeps them in a registry keyed by
//! [`ContextId`], and tears everything down in a safe order when it goes away.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use rquickjs::{Context, Runtime};

use super::boundary;
use super::context::{ContextLifecycle, ContextState, Scope, ScriptContext};
use super::entity::EntityRef;
use super::template::{FunctionTemplate, TemplateTree};
use crate::config::ScriptHostConfig;
use crate::core::error::{ScriptError, ScriptResult};

/// Registry key of a script context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Creates the root entity of each new context.
pub type GlobalFactory = Rc<dyn Fn() -> EntityRef>;

#[derive(Clone)]
struct GlobalBinding {
    /// Global property that refers back to the global object (`window`).
    name: String,
    factory: GlobalFactory,
}

pub struct ScriptHostBuilder {
    config: ScriptHostConfig,
    templates: Vec<FunctionTemplate>,
    global: Option<GlobalBinding>,
}

impl ScriptHostBuilder {
    fn new() -> Self {
        Self {
            config: ScriptHostConfig::default(),
            templates: Vec::new(),
            global: None,
        }
    }

    pub fn with_config(mut self, config: &ScriptHostConfig) -> Self {
        self.config = config.clone();
        self
    }

    pub fn with_template(mut self, template: FunctionTemplate) -> Self {
        self.templates.push(template);
        self
    }

    pub fn with_templates(mut self, templates: impl IntoIterator<Item = FunctionTemplate>) -> Self {
        self.templates.extend(templates);
        self
    }

    /// Makes the global object of every context the handle of an entity
    /// produced by `factory`, reachable from scripts as `binding_name`.
    pub fn with_global<F>(mut self, binding_name: &str, factory: F) -> Self
    where
        F: Fn() -> EntityRef + 'static,
    {
        self.global = Some(GlobalBinding {
            name: binding_name.to_string(),
            factory: Rc::new(factory),
        });
        self
    }

    pub fn build(self) -> ScriptResult<ScriptHost> {
        let templates = TemplateTree::build(self.templates)?;
        if let Some(global) = &self.global {
            if global.name.is_empty() {
                return Err(ScriptError::InvalidBinding(
                    "global binding name must not be empty".to_string(),
                ));
            }
        }

        let runtime = Runtime::new()?;
        if let Some(limit) = self.config.memory_limit {
            runtime.set_memory_limit(limit);
        }
        if let Some(threshold) = self.config.gc_threshold {
            runtime.set_gc_threshold(threshold);
        }
        if let Some(size) = self.config.max_stack_size {
            runtime.set_max_stack_size(size);
        }

        tracing::info!(
            target: "scripting",
            "Script host created with {} interface templates",
            templates.len()
        );

        Ok(ScriptHost {
            inner: Rc::new(HostInner {
                contexts: RefCell::new(BTreeMap::new()),
                templates: Rc::new(templates),
                global: self.global,
                next_id: Cell::new(1),
                runtime,
            }),
        })
    }
}

/// Shared host state. Contexts refer to it weakly to unregister themselves.
///
/// `runtime` is declared last so it is dropped after every context.
pub(crate) struct HostInner {
    contexts: RefCell<BTreeMap<ContextId, ScriptContext>>,
    templates: Rc<TemplateTree>,
    global: Option<GlobalBinding>,
    next_id: Cell<u64>,
    runtime: Runtime,
}

impl HostInner {
    pub(crate) fn unregister(&self, id: ContextId) {
        self.contexts.borrow_mut().remove(&id);
    }

    fn dispose_all(&self) {
        let contexts = std::mem::take(&mut *self.contexts.borrow_mut());
        for context in contexts.values() {
            context.force_dispose();
        }
        if !contexts.is_empty() {
            tracing::debug!(
                target: "scripting",
                "Disposed {} remaining script contexts",
                contexts.len()
            );
        }
    }
}

impl Drop for HostInner {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

/// Owner of the script runtime and every context created in it.
///
/// The host is single-threaded: it and its contexts stay on the thread that
/// created them.
pub struct ScriptHost {
    inner: Rc<HostInner>,
}

impl ScriptHost {
    /// A host with default configuration for `templates`.
    pub fn new(templates: impl IntoIterator<Item = FunctionTemplate>) -> ScriptResult<Self> {
        Self::builder().with_templates(templates).build()
    }

    pub fn builder() -> ScriptHostBuilder {
        ScriptHostBuilder::new()
    }

    /// Creates a context with every template realized and, when the host has a
    /// global binding, a fresh root entity behind the global object.
    pub fn new_context(&self) -> ScriptResult<ScriptContext> {
        let inner = &self.inner;
        let id = ContextId(inner.next_id.get());
        inner.next_id.set(id.0 + 1);

        let context = Context::full(&inner.runtime)?;
        let state = Rc::new(ContextState::new(
            id,
            context.clone(),
            inner.templates.clone(),
            Rc::downgrade(inner),
        ));

        let setup = context.with(|ctx| -> ScriptResult<()> {
            let prototypes = boundary::realize_templates(&ctx, &state, &inner.templates)?;
            *state.prototypes.borrow_mut() = prototypes;

            if let Some(global) = &inner.global {
                let root = (global.factory)();
                let scope = Scope {
                    ctx: ctx.clone(),
                    state: state.clone(),
                };
                if let Err(err) = boundary::install_root(&scope, &root, Some(global.name.as_str())) {
                    tracing::warn!(
                        target: "scripting",
                        "Global object of context {} is not backed by {}: {}",
                        id,
                        root.interface_name(),
                        err
                    );
                }
                *state.root.borrow_mut() = Some(root);
            }
            Ok(())
        });

        let script_context = ScriptContext::from_state(state);
        if let Err(err) = setup {
            script_context.force_dispose();
            return Err(err);
        }
        script_context.state.lifecycle.set(ContextLifecycle::Active);
        inner
            .contexts
            .borrow_mut()
            .insert(id, script_context.clone());

        tracing::debug!(target: "scripting", "Created script context {}", id);
        Ok(script_context)
    }

    pub fn get_context(&self, id: ContextId) -> ScriptResult<ScriptContext> {
        self.inner
            .contexts
            .borrow()
            .get(&id)
            .cloned()
            .ok_or(ScriptError::ContextNotFound(id))
    }

    /// Like [`get_context`](Self::get_context) for ids that must be live.
    ///
    /// # Panics
    ///
    /// Panics when no live context has `id`; that is a bug in the caller.
    pub fn must_get_context(&self, id: ContextId) -> ScriptContext {
        match self.get_context(id) {
            Ok(context) => context,
            Err(err) => panic!("{}", err),
        }
    }

    /// Number of live contexts.
    pub fn context_count(&self) -> usize {
        self.inner.contexts.borrow().len()
    }

    pub fn context_ids(&self) -> Vec<ContextId> {
        self.inner.contexts.borrow().keys().copied().collect()
    }

    pub fn templates(&self) -> &TemplateTree {
        &self.inner.templates
    }

    /// Runs the engine's garbage collector.
    pub fn run_gc(&self) {
        self.inner.runtime.run_gc();
    }

    /// Disposes every live context and releases the runtime.
    pub fn dispose(self) {
        self.inner.dispose_all();
        tracing::debug!(target: "scripting", "Script host disposed");
    }
}

impl fmt::Debug for ScriptHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptHost")
            .field("templates", &self.inner.templates.len())
            .field("contexts", &self.context_ids())
            .finish()
    }
}
