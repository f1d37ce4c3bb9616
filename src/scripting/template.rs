//! Function and prototype templates
//!
//! A [`FunctionTemplate`] describes one interface independently of any script
//! context: its constructor trampoline, its parent, and what goes on its
//! prototype. The host turns the templates into a [`TemplateTree`] once and
//! realizes that tree in every new context.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use rquickjs::Value;

use super::call::CallInfo;
use crate::core::error::{BindingResult, ScriptError, ScriptResult};

/// Entry point of every generated member.
pub type Trampoline = for<'js> fn(&CallInfo<'js>) -> BindingResult<Value<'js>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyAttribute {
    None,
    ReadOnly,
}

#[derive(Clone)]
pub struct MethodEntry {
    pub name: String,
    pub callback: Trampoline,
}

#[derive(Clone)]
pub struct AccessorEntry {
    pub name: String,
    pub getter: Trampoline,
    pub setter: Option<Trampoline>,
    pub attribute: PropertyAttribute,
}

impl fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry").field("name", &self.name).finish()
    }
}

impl fmt::Debug for AccessorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorEntry")
            .field("name", &self.name)
            .field("writable", &self.setter.is_some())
            .field("attribute", &self.attribute)
            .finish()
    }
}

/// Members installed on an interface's prototype object.
#[derive(Debug, Clone, Default)]
pub struct PrototypeTemplate {
    methods: Vec<MethodEntry>,
    accessors: Vec<AccessorEntry>,
}

impl PrototypeTemplate {
    pub fn set(&mut self, name: &str, callback: Trampoline) {
        self.methods.push(MethodEntry {
            name: name.to_string(),
            callback,
        });
    }

    /// Installs an accessor. `ReadOnly` drops the setter even when one is given.
    pub fn set_accessor_property(
        &mut self,
        name: &str,
        getter: Trampoline,
        setter: Option<Trampoline>,
        attribute: PropertyAttribute,
    ) {
        let setter = match attribute {
            PropertyAttribute::ReadOnly => None,
            PropertyAttribute::None => setter,
        };
        self.accessors.push(AccessorEntry {
            name: name.to_string(),
            getter,
            setter,
            attribute,
        });
    }

    pub fn methods(&self) -> &[MethodEntry] {
        &self.methods
    }

    pub fn accessors(&self) -> &[AccessorEntry] {
        &self.accessors
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.name == name) || self.accessors.iter().any(|a| a.name == name)
    }
}

/// Template of one interface.
#[derive(Clone)]
pub struct FunctionTemplate {
    name: String,
    constructor: Trampoline,
    parent: Option<String>,
    internal_field_count: usize,
    prototype: PrototypeTemplate,
}

impl FunctionTemplate {
    pub fn new(name: &str, constructor: Trampoline) -> Self {
        Self {
            name: name.to_string(),
            constructor,
            parent: None,
            internal_field_count: 1,
            prototype: PrototypeTemplate::default(),
        }
    }

    /// Links this interface's prototype to the prototype of `parent`.
    pub fn inherits(&mut self, parent: &str) {
        self.parent = Some(parent.to_string());
    }

    /// Number of hidden slots on every instance. Slot 0 always holds the
    /// entity id, so the count never drops below one.
    pub fn set_internal_field_count(&mut self, count: usize) {
        self.internal_field_count = count.max(1);
    }

    pub fn prototype_template_mut(&mut self) -> &mut PrototypeTemplate {
        &mut self.prototype
    }

    pub fn prototype_template(&self) -> &PrototypeTemplate {
        &self.prototype
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn constructor(&self) -> Trampoline {
        self.constructor
    }

    pub fn internal_field_count(&self) -> usize {
        self.internal_field_count
    }
}

impl fmt::Debug for FunctionTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTemplate")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("internal_field_count", &self.internal_field_count)
            .field("prototype", &self.prototype)
            .finish()
    }
}

/// Validated set of templates, ordered so that parents come before children.
#[derive(Debug, Default)]
pub struct TemplateTree {
    ordered: Vec<FunctionTemplate>,
    index: HashMap<String, usize>,
}

impl TemplateTree {
    /// Checks names and parents and orders the templates by inheritance depth.
    ///
    /// Duplicate names, unknown parents and inheritance cycles are rejected.
    pub fn build(templates: Vec<FunctionTemplate>) -> ScriptResult<Self> {
        let mut by_name: BTreeMap<String, FunctionTemplate> = BTreeMap::new();
        for template in templates {
            let name = template.name.clone();
            if by_name.insert(name.clone(), template).is_some() {
                return Err(ScriptError::InvalidBinding(format!(
                    "interface {} is registered twice",
                    name
                )));
            }
        }

        let mut depths: Vec<(usize, String)> = Vec::with_capacity(by_name.len());
        for template in by_name.values() {
            depths.push((depth_of(template, &by_name)?, template.name.clone()));
        }
        // stable order: depth first, then name
        depths.sort();

        let mut ordered = Vec::with_capacity(depths.len());
        let mut index = HashMap::with_capacity(depths.len());
        for (_, name) in depths {
            if let Some(template) = by_name.remove(&name) {
                index.insert(name, ordered.len());
                ordered.push(template);
            }
        }
        Ok(Self { ordered, index })
    }

    pub fn get(&self, name: &str) -> Option<&FunctionTemplate> {
        self.index.get(name).map(|&i| &self.ordered[i])
    }

    /// Templates with every parent before its children.
    pub fn iter(&self) -> impl Iterator<Item = &FunctionTemplate> {
        self.ordered.iter()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

fn depth_of(
    template: &FunctionTemplate,
    templates: &BTreeMap<String, FunctionTemplate>,
) -> ScriptResult<usize> {
    let mut depth = 0;
    let mut current = template;
    while let Some(parent) = current.parent() {
        current = templates.get(parent).ok_or_else(|| {
            ScriptError::InvalidBinding(format!(
                "interface {} inherits from unregistered interface {}",
                current.name, parent
            ))
        })?;
        depth += 1;
        if depth > templates.len() {
            return Err(ScriptError::InvalidBinding(format!(
                "inheritance cycle through interface {}",
                template.name
            )));
        }
    }
    Ok(depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::BindingError;

    fn illegal<'js>(_info: &CallInfo<'js>) -> BindingResult<Value<'js>> {
        Err(BindingError::IllegalConstructor)
    }

    fn template(name: &str, parent: Option<&str>) -> FunctionTemplate {
        let mut template = FunctionTemplate::new(name, illegal);
        if let Some(parent) = parent {
            template.inherits(parent);
        }
        template
    }

    #[test]
    fn test_tree_orders_parents_first() {
        let tree = TemplateTree::build(vec![
            template("Element", Some("Node")),
            template("Node", Some("EventTarget")),
            template("EventTarget", None),
        ])
        .unwrap();
        let names: Vec<&str> = tree.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["EventTarget", "Node", "Element"]);
        assert_eq!(tree.get("Node").unwrap().parent(), Some("EventTarget"));
    }

    #[test]
    fn test_tree_rejects_duplicates() {
        let result = TemplateTree::build(vec![template("Node", None), template("Node", None)]);
        assert!(matches!(result, Err(ScriptError::InvalidBinding(_))));
    }

    #[test]
    fn test_tree_rejects_unknown_parent() {
        let result = TemplateTree::build(vec![template("Node", Some("EventTarget"))]);
        assert!(matches!(result, Err(ScriptError::InvalidBinding(_))));
    }

    #[test]
    fn test_tree_rejects_cycles() {
        let result = TemplateTree::build(vec![
            template("A", Some("B")),
            template("B", Some("A")),
        ]);
        assert!(matches!(result, Err(ScriptError::InvalidBinding(_))));
    }

    #[test]
    fn test_readonly_accessor_drops_setter() {
        let mut template = template("Node", None);
        let prototype = template.prototype_template_mut();
        prototype.set_accessor_property("nodeName", illegal, Some(illegal), PropertyAttribute::ReadOnly);
        prototype.set("normalize", illegal);
        assert!(template.prototype_template().accessors()[0].setter.is_none());
        assert!(template.prototype_template().has_member("normalize"));
    }

    #[test]
    fn test_internal_field_count_minimum() {
        let mut template = template("Node", None);
        template.set_internal_field_count(0);
        assert_eq!(template.internal_field_count(), 1);
    }
}
