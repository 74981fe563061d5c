//! Host Adapter
//!
//! The engine never touches a platform UI tree directly. Everything it
//! needs from the host (creating nodes, writing attributes, wiring event
//! handlers, attaching and detaching children) goes through the
//! [`HostAdapter`] trait defined here.
//!
//! # Contract
//!
//! - Calls are synchronous. A call that returns `Ok` has taken effect.
//! - Node handles are opaque, copyable values minted by the host. The engine
//!   stores them in fibers and hands them back unchanged.
//! - A failing call aborts the current commit. The engine does not retry and
//!   does not roll back mutations that already succeeded.
//!
//! [`MemoryHost`] is a complete in-memory implementation used by the test
//! suite, the benchmarks, and headless embedders.

mod memory;

pub use memory::{HostCall, MemoryHost, MemoryNodeKind};

use thiserror::Error;

use crate::element::{EventHandler, PropValue};

/// Opaque reference to a node owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(u64);

impl NodeHandle {
    /// Wrap a raw host identifier.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw host identifier.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeHandle {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Errors reported by a host adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    /// The handle does not refer to a live host node.
    #[error("unknown host node: {0:?}")]
    UnknownNode(NodeHandle),

    /// `remove_child` was called with a node that is not a child of `parent`.
    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild {
        parent: NodeHandle,
        child: NodeHandle,
    },

    /// Text nodes cannot have children.
    #[error("text node {0:?} cannot have children")]
    TextNodeParent(NodeHandle),

    /// The host refused the operation for a platform-specific reason.
    #[error("host rejected operation: {0}")]
    Rejected(String),
}

/// Result type alias for host adapter calls.
pub type Result<T> = std::result::Result<T, HostError>;

/// An event delivered by the host to a registered handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event name without the `on` prefix, e.g. `input`.
    pub kind: String,

    /// The node the event was dispatched on.
    pub target: NodeHandle,

    /// Payload carried by the event (the current value of an input field,
    /// for example).
    pub value: Option<PropValue>,
}

impl Event {
    /// Create an event without a payload.
    pub fn new(kind: impl Into<String>, target: NodeHandle) -> Self {
        Self {
            kind: kind.into(),
            target,
            value: None,
        }
    }

    /// Attach a payload to the event.
    pub fn with_value(mut self, value: impl Into<PropValue>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Node creation and mutation primitives provided by a host platform.
pub trait HostAdapter {
    /// Create an element node with the given tag.
    fn create_node(&mut self, tag: &str) -> Result<NodeHandle>;

    /// Create a text node holding `text`.
    fn create_text_node(&mut self, text: &str) -> Result<NodeHandle>;

    /// Write an attribute (or the text of a text node, for `nodeValue`).
    fn set_attribute(&mut self, node: NodeHandle, key: &str, value: &PropValue) -> Result<()>;

    /// Reset an attribute to its empty value.
    fn clear_attribute(&mut self, node: NodeHandle, key: &str) -> Result<()>;

    /// Register `handler` for `event` on `node`.
    fn add_event_binding(
        &mut self,
        node: NodeHandle,
        event: &str,
        handler: &EventHandler,
    ) -> Result<()>;

    /// Unregister a previously registered handler.
    fn remove_event_binding(
        &mut self,
        node: NodeHandle,
        event: &str,
        handler: &EventHandler,
    ) -> Result<()>;

    /// Attach `child` as the last child of `parent`.
    fn append_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<()>;

    /// Detach `child` from `parent`.
    fn remove_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<()>;

    /// Release a node that was created but will never be attached, because
    /// the pass that created it was abandoned.
    fn discard_node(&mut self, _node: NodeHandle) {}
}

impl<T: HostAdapter + ?Sized> HostAdapter for Box<T> {
    fn create_node(&mut self, tag: &str) -> Result<NodeHandle> {
        (**self).create_node(tag)
    }

    fn create_text_node(&mut self, text: &str) -> Result<NodeHandle> {
        (**self).create_text_node(text)
    }

    fn set_attribute(&mut self, node: NodeHandle, key: &str, value: &PropValue) -> Result<()> {
        (**self).set_attribute(node, key, value)
    }

    fn clear_attribute(&mut self, node: NodeHandle, key: &str) -> Result<()> {
        (**self).clear_attribute(node, key)
    }

    fn add_event_binding(
        &mut self,
        node: NodeHandle,
        event: &str,
        handler: &EventHandler,
    ) -> Result<()> {
        (**self).add_event_binding(node, event, handler)
    }

    fn remove_event_binding(
        &mut self,
        node: NodeHandle,
        event: &str,
        handler: &EventHandler,
    ) -> Result<()> {
        (**self).remove_event_binding(node, event, handler)
    }

    fn append_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<()> {
        (**self).append_child(parent, child)
    }

    fn remove_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<()> {
        (**self).remove_child(parent, child)
    }

    fn discard_node(&mut self, node: NodeHandle) {
        (**self).discard_node(node)
    }
}
