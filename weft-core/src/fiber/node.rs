//! Fiber records
//!
//! This module defines the node type that lives in the fiber arena.

use std::fmt;

use crate::element::{Element, ElementType, Props};
use crate::host::NodeHandle;

slotmap::new_key_type! {
    /// Key of a fiber in the [`FiberArena`](super::FiberArena).
    ///
    /// Keys are generational: once a fiber is freed its key never resolves
    /// again, even if the slot is reused.
    pub struct FiberId;
}

/// The mutation a fiber requires relative to the last commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EffectTag {
    /// No pending effect. Fresh roots carry this, and every fiber returns to
    /// it once the committer has consumed its tag.
    #[default]
    None,

    /// The host node must be inserted into the parent's host node.
    Placement,

    /// The host node is reused; props must be diffed against the alternate.
    Update,

    /// The host node must be removed from its parent.
    Deletion,
}

impl fmt::Display for EffectTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EffectTag::None => "none",
            EffectTag::Placement => "placement",
            EffectTag::Update => "update",
            EffectTag::Deletion => "deletion",
        };
        f.write_str(name)
    }
}

/// One unit of reconciliation work.
///
/// A fiber mirrors one element of the virtual tree. Links to other fibers
/// are arena keys, so the structure holds no reference cycles.
#[derive(Debug, Clone)]
pub struct Fiber {
    /// Element type; `None` only for a root fiber.
    pub(crate) ty: Option<ElementType>,

    pub(crate) props: Props,

    /// Child elements not yet diffed. Emptied by the unit of work that
    /// processes this fiber.
    pub(crate) pending_children: Vec<Element>,

    pub(crate) host_node: Option<NodeHandle>,

    pub(crate) parent: Option<FiberId>,
    pub(crate) child: Option<FiberId>,
    pub(crate) sibling: Option<FiberId>,

    /// Counterpart in the previously committed tree.
    pub(crate) alternate: Option<FiberId>,

    pub(crate) effect_tag: EffectTag,
}

impl Fiber {
    /// A root fiber bound to a host container.
    pub(crate) fn root(container: NodeHandle, element: Element, alternate: Option<FiberId>) -> Self {
        Self {
            ty: None,
            props: Props::new(),
            pending_children: vec![element],
            host_node: Some(container),
            parent: None,
            child: None,
            sibling: None,
            alternate,
            effect_tag: EffectTag::None,
        }
    }

    /// A fiber that takes over the host node of `alternate`.
    pub(crate) fn update(
        element: Element,
        parent: FiberId,
        alternate: FiberId,
        host_node: Option<NodeHandle>,
    ) -> Self {
        let (ty, props, children) = element.into_parts();
        Self {
            ty: Some(ty),
            props,
            pending_children: children,
            host_node,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: Some(alternate),
            effect_tag: EffectTag::Update,
        }
    }

    /// A fiber for a newly inserted element. Its host node is created
    /// when the fiber is processed.
    pub(crate) fn placement(element: Element, parent: FiberId) -> Self {
        let (ty, props, children) = element.into_parts();
        Self {
            ty: Some(ty),
            props,
            pending_children: children,
            host_node: None,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: None,
            effect_tag: EffectTag::Placement,
        }
    }

    pub fn element_type(&self) -> Option<&ElementType> {
        self.ty.as_ref()
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn host_node(&self) -> Option<NodeHandle> {
        self.host_node
    }

    pub fn parent(&self) -> Option<FiberId> {
        self.parent
    }

    pub fn child(&self) -> Option<FiberId> {
        self.child
    }

    pub fn sibling(&self) -> Option<FiberId> {
        self.sibling
    }

    pub fn alternate(&self) -> Option<FiberId> {
        self.alternate
    }

    pub fn effect_tag(&self) -> EffectTag {
        self.effect_tag
    }

    pub fn is_root(&self) -> bool {
        self.ty.is_none()
    }

    /// Whether child elements are still waiting to be diffed.
    pub fn has_pending_children(&self) -> bool {
        !self.pending_children.is_empty()
    }

    /// Take the pending effect, leaving `EffectTag::None` behind.
    pub(crate) fn take_effect(&mut self) -> EffectTag {
        std::mem::take(&mut self.effect_tag)
    }
}
