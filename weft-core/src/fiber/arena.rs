//! Fiber Arena
//!
//! All fibers of an engine, committed and in progress, live in one
//! generational slot map. Traversal helpers operate on keys only.

use std::ops::{Index, IndexMut};

use slotmap::SlotMap;

use super::node::{Fiber, FiberId};

/// Storage for fibers, indexed by [`FiberId`].
#[derive(Debug, Default)]
pub struct FiberArena {
    fibers: SlotMap<FiberId, Fiber>,
}

impl FiberArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            fibers: SlotMap::with_key(),
        }
    }

    pub(crate) fn insert(&mut self, fiber: Fiber) -> FiberId {
        self.fibers.insert(fiber)
    }

    /// Get a fiber. Returns `None` for keys of freed fibers.
    pub fn get(&self, id: FiberId) -> Option<&Fiber> {
        self.fibers.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber> {
        self.fibers.get_mut(id)
    }

    pub fn contains(&self, id: FiberId) -> bool {
        self.fibers.contains_key(id)
    }

    /// Number of live fibers.
    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fibers.is_empty()
    }

    /// Next fiber in pre-order after `id`: its first child, else its
    /// sibling, else the sibling of the nearest ancestor that has one.
    pub fn next_in_preorder(&self, id: FiberId) -> Option<FiberId> {
        let fiber = self.get(id)?;
        if fiber.child.is_some() {
            return fiber.child;
        }
        let mut current = Some(id);
        while let Some(cursor) = current {
            let fiber = self.get(cursor)?;
            if fiber.sibling.is_some() {
                return fiber.sibling;
            }
            current = fiber.parent;
        }
        None
    }

    /// Iterate over the direct children of `id`, in order.
    pub fn children(&self, id: FiberId) -> Children<'_> {
        Children {
            arena: self,
            next: self.get(id).and_then(|f| f.child),
        }
    }

    /// Keys of `root` and all its descendants, in pre-order.
    ///
    /// Siblings of `root` itself are not included.
    pub fn subtree(&self, root: FiberId) -> Vec<FiberId> {
        let mut out = Vec::new();
        if !self.contains(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            let mut children: Vec<FiberId> = self.children(id).collect();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Cut `id` out of its parent's child list, keeping its own subtree.
    pub(crate) fn unlink(&mut self, id: FiberId) {
        let Some(fiber) = self.fibers.get_mut(id) else {
            return;
        };
        let next = fiber.sibling.take();
        let Some(parent) = fiber.parent.take() else {
            return;
        };

        if self.fibers.get(parent).and_then(|p| p.child) == Some(id) {
            self[parent].child = next;
            return;
        }
        let previous = self.children(parent).find(|&c| self[c].sibling == Some(id));
        if let Some(previous) = previous {
            self[previous].sibling = next;
        }
    }

    /// Free `root` and all its descendants, returning the removed fibers in
    /// pre-order.
    pub(crate) fn remove_subtree(&mut self, root: FiberId) -> Vec<Fiber> {
        self.subtree(root)
            .into_iter()
            .filter_map(|id| self.fibers.remove(id))
            .collect()
    }
}

impl Index<FiberId> for FiberArena {
    type Output = Fiber;

    fn index(&self, id: FiberId) -> &Fiber {
        self.fibers
            .get(id)
            .unwrap_or_else(|| panic!("fiber {id:?} is not live in the arena"))
    }
}

impl IndexMut<FiberId> for FiberArena {
    fn index_mut(&mut self, id: FiberId) -> &mut Fiber {
        self.fibers
            .get_mut(id)
            .unwrap_or_else(|| panic!("fiber {id:?} is not live in the arena"))
    }
}

/// Iterator over the children of a fiber.
pub struct Children<'a> {
    arena: &'a FiberArena,
    next: Option<FiberId>,
}

impl Iterator for Children<'_> {
    type Item = FiberId;

    fn next(&mut self) -> Option<FiberId> {
        let id = self.next?;
        self.next = self.arena.get(id).and_then(|f| f.sibling);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::host::NodeHandle;

    /// root -> [a -> [a1, a2], b]
    fn build(arena: &mut FiberArena) -> [FiberId; 5] {
        let root = arena.insert(Fiber::root(NodeHandle::from_raw(1), Element::new("x"), None));
        let a = arena.insert(Fiber::placement(Element::new("a"), root));
        let b = arena.insert(Fiber::placement(Element::new("b"), root));
        let a1 = arena.insert(Fiber::placement(Element::new("a1"), a));
        let a2 = arena.insert(Fiber::placement(Element::new("a2"), a));
        arena[root].child = Some(a);
        arena[a].sibling = Some(b);
        arena[a].child = Some(a1);
        arena[a1].sibling = Some(a2);
        [root, a, b, a1, a2]
    }

    #[test]
    fn preorder_walks_child_then_sibling_then_ancestor_sibling() {
        let mut arena = FiberArena::new();
        let [root, a, b, a1, a2] = build(&mut arena);

        let mut order = vec![root];
        let mut cursor = root;
        while let Some(next) = arena.next_in_preorder(cursor) {
            order.push(next);
            cursor = next;
        }
        assert_eq!(order, vec![root, a, a1, a2, b]);
        assert_eq!(arena.subtree(root), order);
    }

    #[test]
    fn children_iterates_sibling_list() {
        let mut arena = FiberArena::new();
        let [root, a, b, a1, a2] = build(&mut arena);

        assert_eq!(arena.children(root).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(arena.children(a).collect::<Vec<_>>(), vec![a1, a2]);
        assert_eq!(arena.children(b).count(), 0);
    }

    #[test]
    fn subtree_excludes_siblings_of_root() {
        let mut arena = FiberArena::new();
        let [_, a, _, a1, a2] = build(&mut arena);
        assert_eq!(arena.subtree(a), vec![a, a1, a2]);
    }

    #[test]
    fn removed_keys_do_not_resolve() {
        let mut arena = FiberArena::new();
        let [root, a, b, a1, _] = build(&mut arena);

        let removed = arena.remove_subtree(a);
        assert_eq!(removed.len(), 3);
        assert!(!arena.contains(a1));
        assert!(arena.contains(b));
        assert_eq!(arena.len(), 2);

        // A new fiber may reuse the slot but never the key.
        let fresh = arena.insert(Fiber::placement(Element::new("c"), root));
        assert_ne!(fresh, a);
        assert!(arena.get(a).is_none());
    }

    #[test]
    fn unlink_splices_the_sibling_chain() {
        let mut arena = FiberArena::new();
        let [root, a, b, a1, a2] = build(&mut arena);

        arena.unlink(a1);
        assert_eq!(arena.children(a).collect::<Vec<_>>(), vec![a2]);
        assert_eq!(arena[a1].parent, None);

        arena.unlink(b);
        assert_eq!(arena.children(root).collect::<Vec<_>>(), vec![a]);
        assert_eq!(arena[a].sibling, None);

        // The unlinked fiber keeps its own children.
        arena.unlink(a);
        assert_eq!(arena[root].child, None);
        assert_eq!(arena.subtree(a), vec![a, a2]);
    }
}
