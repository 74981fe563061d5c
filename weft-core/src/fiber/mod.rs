//! Fiber Tree
//!
//! The fiber tree is the persistent work structure of the engine. Each fiber
//! corresponds to one element of the virtual tree and carries the host node
//! it controls.
//!
//! # Overview
//!
//! Children of a fiber form a singly linked list: the parent points at its
//! first child, each child points at its next sibling, and every child points
//! back at its parent. Pre-order traversal therefore needs no recursion and
//! can stop and resume at any fiber, which is what makes the work loop
//! interruptible.
//!
//! Two trees coexist while a pass is in flight:
//!
//! - the *current* tree, mirroring what the host shows, and
//! - the *work-in-progress* tree, built by the reconciler.
//!
//! Each work-in-progress fiber that reuses a host node points at its
//! counterpart in the current tree through `alternate`.
//!
//! # Design Decisions
//!
//! 1. Fibers live in an arena and refer to each other by key. Parent, child,
//!    sibling and alternate links are plain `Copy` values, so the tree holds
//!    no reference cycles and traversal stays O(1) per step.
//!
//! 2. Keys are generational. After a commit the previous tree is freed, and
//!    the `alternate` keys of the new tree simply stop resolving instead of
//!    dangling.

mod arena;
mod node;

pub use arena::{Children, FiberArena};
pub use node::{EffectTag, Fiber, FiberId};
