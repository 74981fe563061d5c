//! Reconciler
//!
//! A unit of work processes exactly one fiber:
//!
//! 1. If the fiber has no host node yet, create one and write its props onto
//!    it (diffed against an empty baseline; text nodes get their text at
//!    creation).
//! 2. Diff the fiber's pending child elements against the children of its
//!    alternate, producing new child fibers and queueing deletions.
//!
//! Descendants are left for later units, which is what lets the scheduler
//! stop between any two fibers.
//!
//! # Matching
//!
//! Old and new children are matched by position only. At each index:
//!
//! | old child | new element | same type | result                         |
//! |-----------|-------------|-----------|--------------------------------|
//! | yes       | yes         | yes       | `Update`, host node reused     |
//! | yes       | yes         | no        | old `Deletion`, new `Placement`|
//! | no        | yes         | -         | `Placement`                    |
//! | yes       | no          | -         | `Deletion`                     |
//!
//! There are no keys, so moving an element within a list shows up as a
//! chain of deletions and placements rather than a move.

mod props;

pub use props::{
    apply_mutation, apply_patch, classify, diff_props, replay_patch, PropKind, PropMutation,
    PropPatch, EVENT_PREFIX,
};

use tracing::trace;

use crate::element::{Element, ElementType, Props, NODE_VALUE};
use crate::error::{EngineError, Result};
use crate::fiber::{EffectTag, Fiber, FiberArena, FiberId};
use crate::host::{HostAdapter, NodeHandle};
use crate::scheduler::Engine;

/// Diff the children of `wip` against `elements`.
///
/// New child fibers are linked under `wip` in element order. Old children
/// without a type-matching element at their index are tagged
/// [`EffectTag::Deletion`] and pushed onto `deletions`; they stay linked
/// in the old tree only.
pub fn reconcile_children(
    arena: &mut FiberArena,
    deletions: &mut Vec<FiberId>,
    wip: FiberId,
    elements: Vec<Element>,
) {
    let mut old = arena[wip]
        .alternate
        .and_then(|alternate| arena.get(alternate))
        .and_then(|alternate| alternate.child);
    let mut prev_sibling: Option<FiberId> = None;
    let mut elements = elements.into_iter();

    loop {
        let element = elements.next();
        if element.is_none() && old.is_none() {
            break;
        }

        let same_type = match (&element, old) {
            (Some(element), Some(old)) => {
                arena[old].ty.as_ref() == Some(element.element_type())
            }
            _ => false,
        };

        let new_fiber = match (element, old) {
            (Some(element), Some(old)) if same_type => {
                let host_node = arena[old].host_node;
                Some(arena.insert(Fiber::update(element, wip, old, host_node)))
            }
            (Some(element), _) => Some(arena.insert(Fiber::placement(element, wip))),
            (None, _) => None,
        };

        if let Some(old_id) = old {
            if !same_type {
                arena[old_id].effect_tag = EffectTag::Deletion;
                deletions.push(old_id);
            }
            old = arena[old_id].sibling;
        }

        if let Some(new_id) = new_fiber {
            match prev_sibling {
                None => arena[wip].child = Some(new_id),
                Some(prev) => arena[prev].sibling = Some(new_id),
            }
            prev_sibling = Some(new_id);
        }
    }
}

impl<H: HostAdapter> Engine<H> {
    /// Process one fiber and return the next one in pre-order.
    pub(crate) fn perform_unit_of_work(&mut self, id: FiberId) -> Result<Option<FiberId>> {
        if self.fibers[id].host_node.is_none() {
            let node = self.create_host_node(id)?;
            self.fibers[id].host_node = Some(node);
        }

        let elements = std::mem::take(&mut self.fibers[id].pending_children);
        trace!(fiber = ?id, children = elements.len(), "unit of work");
        reconcile_children(&mut self.fibers, &mut self.deletions, id, elements);

        Ok(self.fibers.next_in_preorder(id))
    }

    fn create_host_node(&mut self, id: FiberId) -> Result<NodeHandle> {
        let fiber = &self.fibers[id];
        let created = match &fiber.ty {
            Some(ElementType::Text) => {
                let text = fiber
                    .props
                    .get(NODE_VALUE)
                    .map(ToString::to_string)
                    .unwrap_or_default();
                self.host.create_text_node(&text)
            }
            Some(ElementType::Host(tag)) => self.host.create_node(tag),
            None => unreachable!("root fiber {id:?} has no host container"),
        };
        let node = created.map_err(|source| EngineError::CreateNode { fiber: id, source })?;

        // A text node is created with its text, so `nodeValue` is already set.
        let props = &self.fibers[id].props;
        let baseline = match (&self.fibers[id].ty, props.get(NODE_VALUE)) {
            (Some(ElementType::Text), Some(text)) => Props::new().with(NODE_VALUE, text.clone()),
            _ => Props::new(),
        };
        let patch = diff_props(&baseline, props);
        if let Err(source) = apply_patch(&mut self.host, node, &patch) {
            self.host.discard_node(node);
            return Err(EngineError::CreateNode { fiber: id, source });
        }
        Ok(node)
    }
}
