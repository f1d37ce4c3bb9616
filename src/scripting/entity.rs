//! Native entities
//!
//! Anything exposed to scripts implements [`Entity`]. The script host only needs
//! a stable identity and the interface name; generated trampolines downcast to
//! the concrete type through [`downcast_entity`].

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide identity of a native entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Allocates a fresh id. Ids are never reused.
    pub fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub(crate) fn from_u64(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Conversion to `Rc<dyn Any>`, implemented for every `'static` type.
pub trait EntityAny: Any {
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Any> EntityAny for T {
    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// A native object that can be exposed to scripts.
///
/// Entities that extend another interface hold the parent part by composition
/// and hand it out from [`Entity::ancestor`]:
///
/// ```rust
/// use std::any::{Any, TypeId};
/// use std::rc::Rc;
/// use script_bindings::scripting::{ancestor_of, Entity, ObjectId};
///
/// struct Node { id: ObjectId }
/// impl Entity for Node {
///     fn object_id(&self) -> ObjectId { self.id }
///     fn interface_name(&self) -> &str { "Node" }
/// }
///
/// struct Element { id: ObjectId, node: Rc<Node> }
/// impl Entity for Element {
///     fn object_id(&self) -> ObjectId { self.id }
///     fn interface_name(&self) -> &str { "Element" }
///     fn ancestor(&self, ty: TypeId) -> Option<Rc<dyn Any>> {
///         ancestor_of(&self.node, ty)
///     }
/// }
/// ```
pub trait Entity: EntityAny {
    fn object_id(&self) -> ObjectId;

    /// Name of the interface whose prototype script objects get.
    fn interface_name(&self) -> &str;

    /// The part of this entity that implements the ancestor type `ty`.
    fn ancestor(&self, ty: TypeId) -> Option<Rc<dyn Any>> {
        let _ = ty;
        None
    }
}

pub type EntityRef = Rc<dyn Entity>;

/// Returns `part` if it is a `ty`, otherwise asks `part` for its own ancestors.
pub fn ancestor_of<T: Entity>(part: &Rc<T>, ty: TypeId) -> Option<Rc<dyn Any>> {
    if TypeId::of::<T>() == ty {
        let any: Rc<dyn Any> = part.clone();
        Some(any)
    } else {
        part.ancestor(ty)
    }
}

/// Views `entity` as a `T`, directly or through its ancestors.
pub fn downcast_entity<T: Entity>(entity: &EntityRef) -> Option<Rc<T>> {
    if let Ok(direct) = entity.clone().into_any().downcast::<T>() {
        return Some(direct);
    }
    entity
        .ancestor(TypeId::of::<T>())
        .and_then(|part| part.downcast::<T>().ok())
}

/// Compares two entities by identity.
pub fn same_entity(a: &EntityRef, b: &EntityRef) -> bool {
    a.object_id() == b.object_id()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EventTarget {
        id: ObjectId,
    }

    impl Entity for EventTarget {
        fn object_id(&self) -> ObjectId {
            self.id
        }
        fn interface_name(&self) -> &str {
            "EventTarget"
        }
    }

    struct Node {
        id: ObjectId,
        target: Rc<EventTarget>,
    }

    impl Entity for Node {
        fn object_id(&self) -> ObjectId {
            self.id
        }
        fn interface_name(&self) -> &str {
            "Node"
        }
        fn ancestor(&self, ty: TypeId) -> Option<Rc<dyn Any>> {
            ancestor_of(&self.target, ty)
        }
    }

    struct Element {
        id: ObjectId,
        node: Rc<Node>,
    }

    impl Entity for Element {
        fn object_id(&self) -> ObjectId {
            self.id
        }
        fn interface_name(&self) -> &str {
            "Element"
        }
        fn ancestor(&self, ty: TypeId) -> Option<Rc<dyn Any>> {
            ancestor_of(&self.node, ty)
        }
    }

    fn element() -> EntityRef {
        Rc::new(Element {
            id: ObjectId::next(),
            node: Rc::new(Node {
                id: ObjectId::next(),
                target: Rc::new(EventTarget {
                    id: ObjectId::next(),
                }),
            }),
        })
    }

    #[test]
    fn test_object_ids_are_unique() {
        let a = ObjectId::next();
        let b = ObjectId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_downcast_direct() {
        let entity = element();
        assert!(downcast_entity::<Element>(&entity).is_some());
    }

    #[test]
    fn test_downcast_through_ancestors() {
        let entity = element();
        assert!(downcast_entity::<Node>(&entity).is_some());
        assert!(downcast_entity::<EventTarget>(&entity).is_some());
    }

    #[test]
    fn test_downcast_unrelated_type_fails() {
        let target: EntityRef = Rc::new(EventTarget {
            id: ObjectId::next(),
        });
        assert!(downcast_entity::<Element>(&target).is_none());
    }
}
